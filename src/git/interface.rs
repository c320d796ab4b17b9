//! git::interface
//!
//! [`ObjectReader`] implementation over `git2`.
//!
//! This is the only file in the crate that talks to libgit2. Every call is a
//! read: the repository is opened, queried, and never written.
//!
//! # Error Handling
//!
//! libgit2 errors are normalized into [`GitError`] variants:
//! - [`GitError::NotARepo`]: Not inside a Git repository
//! - [`GitError::RefNotFound`]: Name resolves to nothing
//! - [`GitError::AmbiguousReference`]: Abbreviated hash matches several commits
//! - [`GitError::ObjectNotFound`]: Hash is well-formed but absent
//!
//! # Example
//!
//! ```ignore
//! use git_sim::git::{Git, ObjectReader};
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! let tip = git.resolve("main~1")?;
//! println!("main~1 is {}", tip.short());
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use thiserror::Error;

use super::reader::{HeadState, ObjectReader, TreeDelta};
use crate::core::models::{ChangeKind, CommitInfo, Signature};
use crate::core::types::{BranchName, Oid, TypeError};

/// Errors from Git object access.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not inside a Git repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was searched
        path: PathBuf,
    },

    /// Repository is bare (no working directory).
    #[error("bare repository not supported")]
    BareRepo,

    /// Name does not resolve to any commit.
    #[error("ref not found: {refname}")]
    RefNotFound {
        /// The name that was looked up
        refname: String,
    },

    /// Abbreviated hash matches more than one commit.
    #[error("ambiguous reference '{spec}' matches {} commits", candidates.len())]
    AmbiguousReference {
        /// The abbreviation as given
        spec: String,
        /// Every matching commit, sorted
        candidates: Vec<Oid>,
    },

    /// Revision suffix cannot be parsed or followed.
    #[error("invalid revision '{spec}': {message}")]
    InvalidRevision {
        /// The full revision expression
        spec: String,
        /// Description of the problem
        message: String,
    },

    /// Object not found in repository.
    #[error("object not found: {oid}")]
    ObjectNotFound {
        /// The OID that was not found
        oid: String,
    },

    /// Invalid object id format.
    #[error("invalid object id: {oid}")]
    InvalidOid {
        /// The invalid OID string
        oid: String,
    },

    /// Invalid ref name format.
    #[error("invalid ref name: {message}")]
    InvalidRefName {
        /// Description of the problem
        message: String,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl GitError {
    /// Create a GitError from a git2::Error with richer context.
    fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound | git2::ErrorCode::UnbornBranch => {
                if context.starts_with("refs/") || context == "HEAD" {
                    GitError::RefNotFound {
                        refname: context.to_string(),
                    }
                } else {
                    GitError::ObjectNotFound {
                        oid: context.to_string(),
                    }
                }
            }
            git2::ErrorCode::Ambiguous => GitError::AmbiguousReference {
                spec: context.to_string(),
                candidates: Vec::new(),
            },
            git2::ErrorCode::InvalidSpec => GitError::InvalidOid {
                oid: context.to_string(),
            },
            _ => GitError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }

    fn internal(err: git2::Error) -> Self {
        GitError::Internal {
            message: err.message().to_string(),
        }
    }
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidOid(msg) => GitError::InvalidOid { oid: msg },
            TypeError::InvalidBranchName(msg) => GitError::InvalidRefName { message: msg },
        }
    }
}

/// Read-only handle on a Git repository.
pub struct Git {
    /// The underlying git2 repository
    repo: git2::Repository,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl Git {
    /// Open a repository at the given path.
    ///
    /// Uses `git2::Repository::discover`, so `path` can be any directory
    /// within the repository.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if no repository is found
    /// - [`GitError::BareRepo`] if the repository has no working directory
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::discover(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;

        if repo.is_bare() {
            return Err(GitError::BareRepo);
        }

        Ok(Self { repo })
    }

    /// Working directory root.
    pub fn work_dir(&self) -> Result<&Path, GitError> {
        self.repo.workdir().ok_or(GitError::BareRepo)
    }

    // =========================================================================
    // Conversions
    // =========================================================================

    fn to_git2(oid: &Oid) -> Result<git2::Oid, GitError> {
        git2::Oid::from_str(oid.as_str()).map_err(|e| GitError::from_git2(e, oid.as_str()))
    }

    fn from_git2_oid(oid: git2::Oid) -> Result<Oid, GitError> {
        Oid::new(oid.to_string()).map_err(GitError::from)
    }

    fn signature(sig: &git2::Signature<'_>) -> Result<Signature, GitError> {
        let time: DateTime<Utc> = Utc
            .timestamp_opt(sig.when().seconds(), 0)
            .single()
            .ok_or_else(|| GitError::Internal {
                message: format!("commit timestamp out of range: {}", sig.when().seconds()),
            })?;
        Ok(Signature {
            name: String::from_utf8_lossy(sig.name_bytes()).into_owned(),
            email: String::from_utf8_lossy(sig.email_bytes()).into_owned(),
            time,
        })
    }

    fn commit_info(commit: &git2::Commit<'_>) -> Result<CommitInfo, GitError> {
        Ok(CommitInfo {
            oid: Self::from_git2_oid(commit.id())?,
            parents: commit
                .parent_ids()
                .map(Self::from_git2_oid)
                .collect::<Result<_, _>>()?,
            tree: Self::from_git2_oid(commit.tree_id())?,
            author: Self::signature(&commit.author())?,
            committer: Self::signature(&commit.committer())?,
            message: String::from_utf8_lossy(commit.message_bytes()).into_owned(),
        })
    }

    // =========================================================================
    // Name Resolution
    // =========================================================================

    fn peel_ref(&self, refname: &str) -> Result<Option<Oid>, GitError> {
        match self.repo.find_reference(refname) {
            Ok(reference) => {
                let commit = reference
                    .peel_to_commit()
                    .map_err(|e| GitError::from_git2(e, refname))?;
                Ok(Some(Self::from_git2_oid(commit.id())?))
            }
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) if e.code() == git2::ErrorCode::InvalidSpec => Ok(None),
            Err(e) => Err(GitError::from_git2(e, refname)),
        }
    }

    /// All commit ids whose hex form starts with `prefix`.
    fn commits_with_prefix(&self, prefix: &str) -> Result<Vec<Oid>, GitError> {
        let prefix = prefix.to_ascii_lowercase();
        let odb = self.repo.odb().map_err(GitError::internal)?;

        let mut matches = Vec::new();
        odb.foreach(|id| {
            if id.to_string().starts_with(&prefix) {
                if let Ok((_, git2::ObjectType::Commit)) = odb.read_header(*id) {
                    matches.push(*id);
                }
            }
            true
        })
        .map_err(GitError::internal)?;

        let mut oids = matches
            .into_iter()
            .map(Self::from_git2_oid)
            .collect::<Result<Vec<_>, _>>()?;
        oids.sort();
        oids.dedup();
        Ok(oids)
    }

    fn head_reference(&self) -> Result<git2::Reference<'_>, GitError> {
        self.repo.head().map_err(|e| GitError::from_git2(e, "HEAD"))
    }

    fn refs_with_prefix(&self, prefix: &str) -> Result<Vec<(String, Oid)>, GitError> {
        let refs = self
            .repo
            .references_glob(&format!("{}*", prefix))
            .map_err(GitError::internal)?;

        let mut entries = Vec::new();
        for reference in refs {
            let reference = reference.map_err(GitError::internal)?;
            let Some(name) = reference.name() else {
                continue;
            };
            if reference.kind() == Some(git2::ReferenceType::Symbolic) {
                continue;
            }
            let Ok(commit) = reference.peel_to_commit() else {
                continue;
            };
            let short = name.strip_prefix(prefix).unwrap_or(name).to_string();
            entries.push((short, Self::from_git2_oid(commit.id())?));
        }
        entries.sort();
        Ok(entries)
    }
}

impl ObjectReader for Git {
    fn resolve_name(&self, name: &str) -> Result<Oid, GitError> {
        if let Ok(full) = Oid::new(name) {
            let found = Self::to_git2(&full)
                .ok()
                .is_some_and(|id| self.repo.find_commit(id).is_ok());
            if found {
                return Ok(full);
            }
        }

        if name == "HEAD" {
            return Ok(self.head()?.oid);
        }

        if name.starts_with("refs/") {
            if let Some(oid) = self.peel_ref(name)? {
                return Ok(oid);
            }
        }

        for namespace in ["refs/heads/", "refs/tags/", "refs/remotes/"] {
            if let Some(oid) = self.peel_ref(&format!("{namespace}{name}"))? {
                return Ok(oid);
            }
        }

        if Oid::is_abbreviation(name) {
            let mut candidates = self.commits_with_prefix(name)?;
            match candidates.len() {
                0 => {}
                1 => return Ok(candidates.remove(0)),
                _ => {
                    return Err(GitError::AmbiguousReference {
                        spec: name.to_string(),
                        candidates,
                    })
                }
            }
        }

        Err(GitError::RefNotFound {
            refname: name.to_string(),
        })
    }

    fn commit(&self, oid: &Oid) -> Result<CommitInfo, GitError> {
        let commit = self
            .repo
            .find_commit(Self::to_git2(oid)?)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))?;
        Self::commit_info(&commit)
    }

    fn walk(&self, include: &[Oid], exclude: &[Oid]) -> Result<Vec<CommitInfo>, GitError> {
        self.revwalk(include, exclude, usize::MAX)
    }

    fn walk_limited(
        &self,
        include: &[Oid],
        exclude: &[Oid],
        limit: usize,
    ) -> Result<Vec<CommitInfo>, GitError> {
        self.revwalk(include, exclude, limit)
    }

    fn tree_deltas(&self, old: Option<&Oid>, new: &Oid) -> Result<Vec<TreeDelta>, GitError> {
        let old_tree = match old {
            Some(oid) => Some(
                self.repo
                    .find_commit(Self::to_git2(oid)?)
                    .and_then(|c| c.tree())
                    .map_err(|e| GitError::from_git2(e, oid.as_str()))?,
            ),
            None => None,
        };
        let new_tree = self
            .repo
            .find_commit(Self::to_git2(new)?)
            .and_then(|c| c.tree())
            .map_err(|e| GitError::from_git2(e, new.as_str()))?;

        let mut diff = self
            .repo
            .diff_tree_to_tree(old_tree.as_ref(), Some(&new_tree), None)
            .map_err(GitError::internal)?;
        let mut find = git2::DiffFindOptions::new();
        find.renames(true);
        diff.find_similar(Some(&mut find))
            .map_err(GitError::internal)?;

        let mut deltas = Vec::new();
        for delta in diff.deltas() {
            let kind = match delta.status() {
                git2::Delta::Added | git2::Delta::Copied => ChangeKind::Added,
                git2::Delta::Deleted => ChangeKind::Deleted,
                git2::Delta::Modified | git2::Delta::Typechange => ChangeKind::Modified,
                git2::Delta::Renamed => ChangeKind::Renamed,
                _ => continue,
            };
            let (old_file, new_file) = (delta.old_file(), delta.new_file());
            if old_file.mode() == git2::FileMode::Commit
                || new_file.mode() == git2::FileMode::Commit
            {
                tracing::debug!(path = ?new_file.path(), "skipping submodule entry");
                continue;
            }

            let old_side = self.blob_side(kind != ChangeKind::Added, old_file.id())?;
            let new_side = self.blob_side(kind != ChangeKind::Deleted, new_file.id())?;

            let path_of = |file: &git2::DiffFile<'_>| {
                file.path().map(|p| p.to_string_lossy().into_owned())
            };
            let new_path = path_of(&new_file);
            let old_path = path_of(&old_file);
            let Some(path) = new_path.clone().or_else(|| old_path.clone()) else {
                continue;
            };

            deltas.push(TreeDelta {
                path,
                old_path: if kind == ChangeKind::Renamed { old_path } else { None },
                kind,
                old_blob: old_side.as_ref().map(|s| s.0.clone()),
                new_blob: new_side.as_ref().map(|s| s.0.clone()),
                is_binary: old_side.as_ref().is_some_and(|s| s.2)
                    || new_side.as_ref().is_some_and(|s| s.2),
                old_content: old_side.map(|s| s.1),
                new_content: new_side.map(|s| s.1),
            });
        }
        Ok(deltas)
    }

    fn head(&self) -> Result<HeadState, GitError> {
        let head = self.head_reference()?;
        let commit = head
            .peel_to_commit()
            .map_err(|e| GitError::from_git2(e, "HEAD"))?;
        let branch = if head.is_branch() {
            head.shorthand().and_then(|name| BranchName::new(name).ok())
        } else {
            None
        };
        Ok(HeadState {
            oid: Self::from_git2_oid(commit.id())?,
            branch,
        })
    }

    fn branches(&self) -> Result<Vec<(BranchName, Oid)>, GitError> {
        Ok(self
            .refs_with_prefix("refs/heads/")?
            .into_iter()
            .filter_map(|(name, oid)| BranchName::new(name).ok().map(|b| (b, oid)))
            .collect())
    }

    fn remote_tips(&self) -> Result<Vec<(String, Oid)>, GitError> {
        self.refs_with_prefix("refs/remotes/")
    }

    fn dirty_paths(&self) -> Result<Vec<String>, GitError> {
        let mut opts = git2::StatusOptions::new();
        opts.include_untracked(false).include_ignored(false);

        let statuses = self
            .repo
            .statuses(Some(&mut opts))
            .map_err(GitError::internal)?;

        let mut paths: Vec<String> = statuses
            .iter()
            .filter(|entry| !entry.status().is_empty())
            .filter_map(|entry| entry.path().map(str::to_string))
            .collect();
        paths.sort();
        paths.dedup();
        Ok(paths)
    }

    fn is_ancestor(&self, ancestor: &Oid, descendant: &Oid) -> Result<bool, GitError> {
        if ancestor == descendant {
            return Ok(true);
        }
        self.repo
            .graph_descendant_of(Self::to_git2(descendant)?, Self::to_git2(ancestor)?)
            .map_err(GitError::internal)
    }

    fn merge_base(&self, a: &Oid, b: &Oid) -> Result<Option<Oid>, GitError> {
        match self.repo.merge_base(Self::to_git2(a)?, Self::to_git2(b)?) {
            Ok(base) => Self::from_git2_oid(base).map(Some),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::internal(e)),
        }
    }
}

impl Git {
    /// Topological walk yielding at most `limit` commits.
    fn revwalk(
        &self,
        include: &[Oid],
        exclude: &[Oid],
        limit: usize,
    ) -> Result<Vec<CommitInfo>, GitError> {
        let mut revwalk = self.repo.revwalk().map_err(GitError::internal)?;
        revwalk
            .set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::TIME)
            .map_err(GitError::internal)?;

        for oid in include {
            revwalk
                .push(Self::to_git2(oid)?)
                .map_err(|e| GitError::from_git2(e, oid.as_str()))?;
        }
        for oid in exclude {
            revwalk
                .hide(Self::to_git2(oid)?)
                .map_err(|e| GitError::from_git2(e, oid.as_str()))?;
        }

        let mut commits = Vec::new();
        for id in revwalk.take(limit) {
            let id = id.map_err(GitError::internal)?;
            let commit = self
                .repo
                .find_commit(id)
                .map_err(|e| GitError::from_git2(e, &id.to_string()))?;
            commits.push(Self::commit_info(&commit)?);
        }
        Ok(commits)
    }

    /// Blob id, content and binary flag for one side of a delta.
    fn blob_side(
        &self,
        present: bool,
        id: git2::Oid,
    ) -> Result<Option<(Oid, Vec<u8>, bool)>, GitError> {
        if !present || id.is_zero() {
            return Ok(None);
        }
        let blob = self
            .repo
            .find_blob(id)
            .map_err(|e| GitError::from_git2(e, &id.to_string()))?;
        Ok(Some((
            Self::from_git2_oid(id)?,
            blob.content().to_vec(),
            blob.is_binary(),
        )))
    }
}
