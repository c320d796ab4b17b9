//! analysis::graph_builder
//!
//! Bounded commit graph snapshots.
//!
//! [`build`] walks parent links breadth-first from every requested ref at
//! once, sharing one node budget across the whole graph. Each resolved ref
//! tip is always included; ancestors are added until the budget is spent.

use crate::core::graph::CommitGraph;
use crate::core::models::CommitInfo;
use crate::core::types::Oid;
use crate::engine::SimError;
use crate::git::{GitError, HeadState, ObjectReader};
use std::collections::{BTreeMap, HashSet, VecDeque};

/// Branch-tip key for a ref as the user wrote it.
///
/// `refs/heads/x` and `heads/x` become `x`; relative expressions keep their
/// spelling.
pub fn tip_name(spec: &str) -> &str {
    spec.strip_prefix("refs/heads/")
        .or_else(|| spec.strip_prefix("heads/"))
        .unwrap_or(spec)
}

/// Branch-tip key for `spec`, mapping `HEAD` to the checked-out branch.
pub fn ref_label(spec: &str, head: Option<&HeadState>) -> String {
    match (spec, head) {
        ("HEAD" | "@", Some(HeadState { branch: Some(branch), .. })) => branch.to_string(),
        _ => tip_name(spec).to_string(),
    }
}

/// Build a graph snapshot of at most `max_commits` commits reachable from
/// `refs`.
///
/// Refs that do not resolve are skipped with a warning. `HEAD` is recorded
/// as head when its commit is part of the snapshot; otherwise the first
/// resolved ref stands in for it.
///
/// # Errors
///
/// - [`SimError::EmptyRefSet`] if no ref resolves
/// - [`SimError::AmbiguousReference`] if a ref is an ambiguous abbreviation
pub fn build<R>(reader: &R, refs: &[&str], max_commits: usize) -> Result<CommitGraph, SimError>
where
    R: ObjectReader + ?Sized,
{
    let head = reader.head().ok();
    let mut tips: Vec<(String, CommitInfo)> = Vec::new();

    for spec in refs {
        match reader.resolve(spec) {
            Ok(commit) => tips.push((ref_label(spec, head.as_ref()), commit)),
            Err(GitError::RefNotFound { .. } | GitError::InvalidRevision { .. }) => {
                tracing::warn!(spec = %spec, "ref does not resolve; leaving it out of the graph");
            }
            Err(err) => return Err(err.into()),
        }
    }

    if tips.is_empty() {
        return Err(SimError::EmptyRefSet);
    }

    let budget = max_commits.max(1);
    let mut collected: BTreeMap<Oid, CommitInfo> = BTreeMap::new();
    let mut queue: VecDeque<Oid> = VecDeque::new();

    for (_, commit) in &tips {
        if !collected.contains_key(&commit.oid) {
            queue.push_back(commit.oid.clone());
            collected.insert(commit.oid.clone(), commit.clone());
        }
    }

    let mut seen: HashSet<Oid> = collected.keys().cloned().collect();
    'walk: while let Some(oid) = queue.pop_front() {
        let parents = match collected.get(&oid) {
            Some(commit) => commit.parents.clone(),
            None => continue,
        };
        for parent in parents {
            if collected.len() >= budget {
                break 'walk;
            }
            if seen.insert(parent.clone()) {
                let commit = reader.commit(&parent)?;
                collected.insert(parent.clone(), commit);
                queue.push_back(parent);
            }
        }
    }

    let mut graph = CommitGraph::from_commits(collected.into_values());
    let fallback_head = tips[0].1.oid.clone();
    for (name, commit) in tips {
        graph.set_tip(name, commit.oid);
    }
    match head {
        Some(state) if graph.contains(&state.oid) => graph.set_head(state.oid),
        _ => graph.set_head(fallback_head),
    }

    tracing::debug!(
        refs = refs.len(),
        nodes = graph.len(),
        truncated = graph.truncated().len(),
        "built commit graph"
    );
    Ok(graph)
}
