//! engine::context
//!
//! Per-call simulation context.
//!
//! [`SimContext`] wraps an [`ObjectReader`] with memoization that lasts for
//! one simulation call: resolved names, commit reads and per-commit change
//! sets are cached so the replay loop and graph builder do not re-read the
//! same objects. The context itself implements [`ObjectReader`], so it can
//! be handed anywhere a reader is expected.
//!
//! Caches are never shared between calls; build a fresh context for each.

use super::EngineOptions;
use crate::analysis::conflict::ConflictDetector;
use crate::analysis::graph_builder;
use crate::core::graph::CommitGraph;
use crate::core::models::{CommitInfo, FileChange};
use crate::core::types::{BranchName, Oid};
use crate::engine::SimError;
use crate::git::{GitError, HeadState, ObjectReader, TreeDelta};
use std::cell::RefCell;
use std::collections::HashMap;

/// Repository access and tunables for one simulation call.
pub struct SimContext<'r> {
    reader: &'r dyn ObjectReader,
    options: &'r EngineOptions,
    resolved: RefCell<HashMap<String, CommitInfo>>,
    commits: RefCell<HashMap<Oid, CommitInfo>>,
    changes: RefCell<HashMap<Oid, Vec<FileChange>>>,
}

impl<'r> SimContext<'r> {
    pub fn new(reader: &'r dyn ObjectReader, options: &'r EngineOptions) -> Self {
        Self {
            reader,
            options,
            resolved: RefCell::new(HashMap::new()),
            commits: RefCell::new(HashMap::new()),
            changes: RefCell::new(HashMap::new()),
        }
    }

    pub fn options(&self) -> &EngineOptions {
        self.options
    }

    pub fn detector(&self) -> ConflictDetector {
        ConflictDetector::new(self.options.adjacency_threshold)
    }

    /// Graph snapshot over `refs`, bounded by the configured budget.
    pub fn build_graph(&self, refs: &[&str]) -> Result<CommitGraph, SimError> {
        graph_builder::build(self, refs, self.options.max_graph_commits)
    }

    /// Branch-tip key for a ref as written by the user.
    pub fn label(&self, spec: &str) -> String {
        graph_builder::ref_label(spec, self.reader.head().ok().as_ref())
    }

    /// Whether `branch` counts as shared with collaborators.
    ///
    /// True when the branch is configured as shared, or when push detection
    /// is on and a remote-tracking ref can reach any of `commits`.
    pub fn is_shared(&self, branch: &str, commits: &[Oid]) -> Result<bool, SimError> {
        if self.options.shared_branches.contains(branch) {
            return Ok(true);
        }
        if !self.options.detect_pushed || commits.is_empty() {
            return Ok(false);
        }
        for (remote, tip) in self.reader.remote_tips()? {
            for commit in commits {
                if self.reader.is_ancestor(commit, &tip)? {
                    tracing::debug!(
                        %branch,
                        %remote,
                        commit = %commit,
                        "branch history is on a remote"
                    );
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}

impl ObjectReader for SimContext<'_> {
    fn resolve_name(&self, name: &str) -> Result<Oid, GitError> {
        self.reader.resolve_name(name)
    }

    fn commit(&self, oid: &Oid) -> Result<CommitInfo, GitError> {
        if let Some(hit) = self.commits.borrow().get(oid).cloned() {
            return Ok(hit);
        }
        let commit = self.reader.commit(oid)?;
        self.commits.borrow_mut().insert(oid.clone(), commit.clone());
        Ok(commit)
    }

    fn walk(&self, include: &[Oid], exclude: &[Oid]) -> Result<Vec<CommitInfo>, GitError> {
        self.reader.walk(include, exclude)
    }

    fn walk_limited(
        &self,
        include: &[Oid],
        exclude: &[Oid],
        limit: usize,
    ) -> Result<Vec<CommitInfo>, GitError> {
        self.reader.walk_limited(include, exclude, limit)
    }

    fn tree_deltas(&self, old: Option<&Oid>, new: &Oid) -> Result<Vec<TreeDelta>, GitError> {
        self.reader.tree_deltas(old, new)
    }

    fn head(&self) -> Result<HeadState, GitError> {
        self.reader.head()
    }

    fn branches(&self) -> Result<Vec<(BranchName, Oid)>, GitError> {
        self.reader.branches()
    }

    fn remote_tips(&self) -> Result<Vec<(String, Oid)>, GitError> {
        self.reader.remote_tips()
    }

    fn dirty_paths(&self) -> Result<Vec<String>, GitError> {
        self.reader.dirty_paths()
    }

    fn resolve(&self, spec: &str) -> Result<CommitInfo, GitError> {
        if let Some(hit) = self.resolved.borrow().get(spec).cloned() {
            return Ok(hit);
        }
        let commit = self.reader.resolve(spec)?;
        self.resolved
            .borrow_mut()
            .insert(spec.to_string(), commit.clone());
        Ok(commit)
    }

    fn changes_for(&self, oid: &Oid) -> Result<Vec<FileChange>, GitError> {
        if let Some(hit) = self.changes.borrow().get(oid).cloned() {
            return Ok(hit);
        }
        let commit = self.commit(oid)?;
        let changes = self.reader.changes_between(commit.first_parent(), oid)?;
        self.changes
            .borrow_mut()
            .insert(oid.clone(), changes.clone());
        Ok(changes)
    }

    fn merge_base(&self, a: &Oid, b: &Oid) -> Result<Option<Oid>, GitError> {
        self.reader.merge_base(a, b)
    }

    fn is_ancestor(&self, ancestor: &Oid, descendant: &Oid) -> Result<bool, GitError> {
        self.reader.is_ancestor(ancestor, descendant)
    }
}
