//! core::graph
//!
//! Commit graph snapshot used for before/after views of an operation.
//!
//! # Architecture
//!
//! The commit graph is a DAG where:
//! - Nodes are commits keyed by full hash
//! - Edges point from child to parent, in the child's parent order
//! - Branch tips and head are snapshots of where refs pointed at build time
//!
//! Graphs are bounded, so a walk may stop before reaching a root. Nodes whose
//! parents were cut off are recorded as *truncated*; they are boundary nodes,
//! not roots.
//!
//! # Invariants
//!
//! - Every edge's endpoints exist in the node map
//! - The edge set is acyclic
//! - Every node with a parent in the graph has that edge recorded
//! - Every branch tip and the head are nodes of the graph

use super::models::CommitInfo;
use super::types::Oid;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use thiserror::Error;

/// Integrity violations found by [`CommitGraph::verify`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    /// An edge mentions a commit that is not a node.
    #[error("edge {child} -> {parent} references a missing commit")]
    DanglingEdge { child: Oid, parent: Oid },

    /// Following parent edges from this commit returns to it.
    #[error("cycle detected at commit {oid}")]
    Cycle { oid: Oid },

    /// A node's parent is in the graph but the edge is not recorded.
    #[error("commit {oid} is missing its edge to parent {parent}")]
    MissingParentEdge { oid: Oid, parent: Oid },

    /// A branch tip or head points outside the graph.
    #[error("'{name}' points at {oid}, which is not in the graph")]
    DanglingPointer { name: String, oid: Oid },
}

/// A DAG snapshot of commits, parent edges, branch tips and head.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommitGraph {
    nodes: BTreeMap<Oid, CommitInfo>,
    edges: Vec<(Oid, Oid)>,
    branch_tips: BTreeMap<String, Oid>,
    head: Option<Oid>,
    #[serde(default)]
    truncated: BTreeSet<Oid>,
}

impl CommitGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from an arbitrary set of commits.
    ///
    /// Edges are recorded only where the parent is present.
    pub fn from_commits(commits: impl IntoIterator<Item = CommitInfo>) -> Self {
        let mut graph = Self::new();
        for commit in commits {
            graph.nodes.insert(commit.oid.clone(), commit);
        }
        graph.reindex();
        graph
    }

    /// Add (or replace) a commit and refresh edges.
    pub fn insert(&mut self, commit: CommitInfo) {
        self.nodes.insert(commit.oid.clone(), commit);
        self.reindex();
    }

    /// Re-derive edges and truncation markers from node parent lists.
    ///
    /// Edges are ordered by child hash, then by parent position.
    fn reindex(&mut self) {
        let mut edges = Vec::new();
        let mut truncated = BTreeSet::new();
        for (oid, commit) in &self.nodes {
            for parent in &commit.parents {
                if self.nodes.contains_key(parent) {
                    edges.push((oid.clone(), parent.clone()));
                } else {
                    truncated.insert(oid.clone());
                }
            }
        }
        self.edges = edges;
        self.truncated = truncated;
    }

    /// Point a branch at a commit.
    pub fn set_tip(&mut self, branch: impl Into<String>, oid: Oid) {
        self.branch_tips.insert(branch.into(), oid);
    }

    pub fn set_head(&mut self, oid: Oid) {
        self.head = Some(oid);
    }

    pub fn node(&self, oid: &Oid) -> Option<&CommitInfo> {
        self.nodes.get(oid)
    }

    pub fn contains(&self, oid: &Oid) -> bool {
        self.nodes.contains_key(oid)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &CommitInfo> {
        self.nodes.values()
    }

    pub fn oids(&self) -> impl Iterator<Item = &Oid> {
        self.nodes.keys()
    }

    pub fn edges(&self) -> &[(Oid, Oid)] {
        &self.edges
    }

    pub fn branch_tips(&self) -> &BTreeMap<String, Oid> {
        &self.branch_tips
    }

    pub fn tip(&self, branch: &str) -> Option<&Oid> {
        self.branch_tips.get(branch)
    }

    pub fn head(&self) -> Option<&Oid> {
        self.head.as_ref()
    }

    /// Nodes whose parents were cut off by the build bound.
    pub fn truncated(&self) -> &BTreeSet<Oid> {
        &self.truncated
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Parents of a commit that are present in the graph.
    pub fn parents(&self, oid: &Oid) -> Vec<&Oid> {
        self.edges
            .iter()
            .filter(|(child, _)| child == oid)
            .map(|(_, parent)| parent)
            .collect()
    }

    /// Children of a commit that are present in the graph.
    pub fn children(&self, oid: &Oid) -> Vec<&Oid> {
        self.edges
            .iter()
            .filter(|(_, parent)| parent == oid)
            .map(|(child, _)| child)
            .collect()
    }

    /// Check if the edge set contains a cycle.
    ///
    /// Returns `Some(oid)` for a commit from which a cycle is reachable.
    pub fn find_cycle(&self) -> Option<Oid> {
        let mut visited = HashSet::new();
        let mut path = HashSet::new();

        for oid in self.nodes.keys() {
            if self.has_cycle_from(oid, &mut visited, &mut path) {
                return Some(oid.clone());
            }
        }
        None
    }

    fn has_cycle_from<'a>(
        &'a self,
        oid: &'a Oid,
        visited: &mut HashSet<&'a Oid>,
        path: &mut HashSet<&'a Oid>,
    ) -> bool {
        if path.contains(oid) {
            return true;
        }
        if !visited.insert(oid) {
            return false;
        }
        path.insert(oid);

        for parent in self.parents(oid) {
            if self.has_cycle_from(parent, visited, path) {
                return true;
            }
        }

        path.remove(oid);
        false
    }

    /// Check every structural invariant.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn verify(&self) -> Result<(), GraphError> {
        for (child, parent) in &self.edges {
            if !self.contains(child) || !self.contains(parent) {
                return Err(GraphError::DanglingEdge {
                    child: child.clone(),
                    parent: parent.clone(),
                });
            }
        }

        for commit in self.nodes.values() {
            for parent in &commit.parents {
                let recorded = self
                    .edges
                    .iter()
                    .any(|(c, p)| c == &commit.oid && p == parent);
                if self.contains(parent) && !recorded {
                    return Err(GraphError::MissingParentEdge {
                        oid: commit.oid.clone(),
                        parent: parent.clone(),
                    });
                }
            }
        }

        if let Some(oid) = self.find_cycle() {
            return Err(GraphError::Cycle { oid });
        }

        let pointers = self
            .branch_tips
            .iter()
            .map(|(name, oid)| (name.as_str(), oid))
            .chain(self.head.iter().map(|oid| ("HEAD", oid)));
        for (name, oid) in pointers {
            if !self.contains(oid) {
                return Err(GraphError::DanglingPointer {
                    name: name.to_string(),
                    oid: oid.clone(),
                });
            }
        }

        Ok(())
    }

    /// All ancestors of a commit within the graph, nearest first.
    pub fn ancestors(&self, oid: &Oid) -> Vec<Oid> {
        let mut result = Vec::new();
        let mut seen = HashSet::new();
        let mut queue: VecDeque<&Oid> = self.parents(oid).into_iter().collect();

        while let Some(current) = queue.pop_front() {
            if seen.insert(current) {
                result.push(current.clone());
                queue.extend(self.parents(current));
            }
        }

        result
    }

    /// Check whether `ancestor` is reachable from `descendant` (inclusive).
    pub fn reaches(&self, descendant: &Oid, ancestor: &Oid) -> bool {
        descendant == ancestor || self.ancestors(descendant).contains(ancestor)
    }

    /// Order commits so every child precedes its parents.
    ///
    /// Ties are broken by hash for determinism.
    pub fn topological_order(&self) -> Vec<Oid> {
        let mut pending_children: BTreeMap<&Oid, usize> =
            self.nodes.keys().map(|oid| (oid, 0)).collect();
        for (_, parent) in &self.edges {
            if let Some(count) = pending_children.get_mut(parent) {
                *count += 1;
            }
        }

        let mut ready: BTreeSet<&Oid> = pending_children
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(oid, _)| *oid)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(oid) = ready.pop_first() {
            order.push(oid.clone());
            for parent in self.parents(oid) {
                if let Some(count) = pending_children.get_mut(parent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(parent);
                    }
                }
            }
        }

        order
    }

    /// Drop every node not reachable from a branch tip or head, plus any
    /// node in `keep`.
    pub fn retain_reachable(&mut self, keep: &[Oid]) {
        let mut live: HashSet<Oid> = HashSet::new();
        let mut queue: VecDeque<Oid> = self
            .branch_tips
            .values()
            .chain(self.head.iter())
            .chain(keep.iter())
            .cloned()
            .collect();

        while let Some(oid) = queue.pop_front() {
            if !live.insert(oid.clone()) {
                continue;
            }
            if let Some(commit) = self.nodes.get(&oid) {
                queue.extend(
                    commit
                        .parents
                        .iter()
                        .filter(|p| self.nodes.contains_key(*p))
                        .cloned(),
                );
            }
        }

        self.nodes.retain(|oid, _| live.contains(oid));
        self.reindex();
    }
}
