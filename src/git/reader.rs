//! git::reader
//!
//! The read-only capability the simulation engine needs from a repository.
//!
//! [`ObjectReader`] is the seam between the engine and any git-object
//! backend. Implementors supply primitive lookups (name resolution, commit
//! reads, ancestry walks, tree deltas); revision suffixes, change
//! enumeration and the common-ancestor search are provided on top of them.
//!
//! Nothing here mutates the repository.

use super::revspec::{RevSpec, Step};
use super::GitError;
use crate::analysis::diff;
use crate::core::models::{ChangeKind, CommitInfo, FileChange};
use crate::core::types::{BranchName, Oid};
use std::collections::HashSet;

/// One file-level difference between two tree states, with raw contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeDelta {
    pub path: String,
    /// Source path when `kind` is [`ChangeKind::Renamed`].
    pub old_path: Option<String>,
    pub kind: ChangeKind,
    pub old_blob: Option<Oid>,
    pub new_blob: Option<Oid>,
    pub old_content: Option<Vec<u8>>,
    pub new_content: Option<Vec<u8>>,
    /// Either side is a binary blob.
    pub is_binary: bool,
}

/// Where HEAD points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadState {
    pub oid: Oid,
    /// Checked-out branch; `None` when detached.
    pub branch: Option<BranchName>,
}

/// Read-only access to commits, trees and refs.
pub trait ObjectReader {
    /// Resolve a bare name (no `~`/`^` suffix) to a commit id.
    ///
    /// Implementations try, in order: full hash, `HEAD`, full refname,
    /// `refs/heads/`, `refs/tags/`, `refs/remotes/`, and finally an
    /// abbreviated hash of at least 7 hex characters matching exactly one
    /// commit.
    ///
    /// # Errors
    ///
    /// - [`GitError::RefNotFound`] if nothing matches
    /// - [`GitError::AmbiguousReference`] if an abbreviation matches several
    ///   commits
    fn resolve_name(&self, name: &str) -> Result<Oid, GitError>;

    /// Read a commit by full hash.
    fn commit(&self, oid: &Oid) -> Result<CommitInfo, GitError>;

    /// Commits reachable from `include` but not from `exclude`.
    ///
    /// Topological order: every commit is yielded before any of its parents.
    fn walk(&self, include: &[Oid], exclude: &[Oid]) -> Result<Vec<CommitInfo>, GitError>;

    /// The first `limit` commits of [`ObjectReader::walk`].
    fn walk_limited(
        &self,
        include: &[Oid],
        exclude: &[Oid],
        limit: usize,
    ) -> Result<Vec<CommitInfo>, GitError> {
        let mut commits = self.walk(include, exclude)?;
        commits.truncate(limit);
        Ok(commits)
    }

    /// File deltas between two commits' trees; `old = None` means the
    /// empty tree.
    fn tree_deltas(&self, old: Option<&Oid>, new: &Oid) -> Result<Vec<TreeDelta>, GitError>;

    fn head(&self) -> Result<HeadState, GitError>;

    /// Local branches and their tips.
    fn branches(&self) -> Result<Vec<(BranchName, Oid)>, GitError>;

    /// Remote-tracking refs (`origin/main`, ...) and their tips.
    fn remote_tips(&self) -> Result<Vec<(String, Oid)>, GitError>;

    /// Tracked paths with staged or unstaged modifications.
    fn dirty_paths(&self) -> Result<Vec<String>, GitError>;

    /// Resolve a revision expression such as `main`, `abc1234`, `HEAD~2`
    /// or `feature^2`.
    fn resolve(&self, spec: &str) -> Result<CommitInfo, GitError> {
        let parsed = RevSpec::parse(spec)?;
        let mut current = self.commit(&self.resolve_name(parsed.base)?)?;

        for step in &parsed.steps {
            current = match *step {
                Step::Parent(0) => current,
                Step::Parent(n) => {
                    let parent = current.parents.get(n - 1).ok_or_else(|| {
                        GitError::InvalidRevision {
                            spec: spec.to_string(),
                            message: format!("{} has no parent {}", current.short(), n),
                        }
                    })?;
                    self.commit(parent)?
                }
                Step::Ancestor(n) => {
                    for _ in 0..n {
                        let parent = current.first_parent().ok_or_else(|| {
                            GitError::InvalidRevision {
                                spec: spec.to_string(),
                                message: format!("{} is a root commit", current.short()),
                            }
                        })?;
                        current = self.commit(parent)?;
                    }
                    current
                }
            };
        }

        Ok(current)
    }

    /// Structured changes between two commits (`old = None` for the
    /// empty tree).
    fn changes_between(&self, old: Option<&Oid>, new: &Oid) -> Result<Vec<FileChange>, GitError> {
        Ok(diff::file_changes(self.tree_deltas(old, new)?))
    }

    /// Changes a commit introduces relative to its first parent.
    fn changes_for(&self, oid: &Oid) -> Result<Vec<FileChange>, GitError> {
        let commit = self.commit(oid)?;
        self.changes_between(commit.first_parent(), oid)
    }

    /// Nearest common ancestor of two commits.
    ///
    /// Walks `b`'s history in topological order and returns the first commit
    /// that is also an ancestor of `a`; no descendant of it can be common,
    /// since it would have been yielded earlier. Both histories are read in
    /// full, so [`crate::git::Git`] answers this from libgit2 instead.
    fn merge_base(&self, a: &Oid, b: &Oid) -> Result<Option<Oid>, GitError> {
        if a == b {
            return Ok(Some(a.clone()));
        }
        let ours: HashSet<Oid> = self.walk(&[a.clone()], &[])?.into_iter().map(|c| c.oid).collect();
        Ok(self
            .walk(&[b.clone()], &[])?
            .into_iter()
            .map(|c| c.oid)
            .find(|oid| ours.contains(oid)))
    }

    /// Whether `ancestor` is reachable from `descendant` (inclusive).
    fn is_ancestor(&self, ancestor: &Oid, descendant: &Oid) -> Result<bool, GitError> {
        if ancestor == descendant {
            return Ok(true);
        }
        Ok(self
            .walk(&[descendant.clone()], &[])?
            .iter()
            .any(|c| &c.oid == ancestor))
    }
}
