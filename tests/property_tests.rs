//! Property-based tests for diff analysis, conflict tiers and graph building.
//!
//! These tests use proptest to verify invariants hold across
//! randomly generated inputs.

use std::collections::{BTreeMap, HashSet};

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use proptest::sample::Index;

use git_sim::analysis::conflict::ConflictDetector;
use git_sim::analysis::diff::{analyze, apply, revert};
use git_sim::analysis::graph_builder;
use git_sim::core::models::{ChangeKind, CommitInfo, ConflictSeverity, FileChange, Signature};
use git_sim::core::types::{BranchName, Oid};
use git_sim::git::{GitError, HeadState, ObjectReader, TreeDelta};

/// Text built from a small line alphabet so diffs share plenty of lines.
fn text() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(vec!["a", "b", "c", "d", "e"]), 0..40)
        .prop_map(|lines| lines.into_iter().map(|l| format!("{l}\n")).collect())
}

proptest! {
    /// Hunks replay in both directions.
    #[test]
    fn diff_apply_and_revert(old in text(), new in text()) {
        let hunks = analyze(&old, &new);
        prop_assert_eq!(apply(&old, &hunks), new.clone());
        prop_assert_eq!(revert(&new, &hunks), old);
    }

    /// Hunks are sorted and never overlap.
    #[test]
    fn hunks_are_ordered(old in text(), new in text()) {
        let hunks = analyze(&old, &new);
        for pair in hunks.windows(2) {
            prop_assert!(pair[0].old_index + pair[0].removed.len() <= pair[1].old_index);
            prop_assert!(pair[0].new_index + pair[0].added.len() <= pair[1].new_index);
        }
    }

    /// Identical blobs produce no hunks.
    #[test]
    fn no_change_no_hunks(old in text()) {
        prop_assert!(analyze(&old, &old).is_empty());
    }
}

// =============================================================================
// Conflict tiers
// =============================================================================

const BASE_LINES: usize = 60;

fn base() -> String {
    (1..=BASE_LINES).map(|n| format!("line {n}\n")).collect()
}

/// A modification of `base()` rewriting line `at`.
fn edit(at: usize, tag: &str) -> FileChange {
    let base = base();
    let new: String = (1..=BASE_LINES)
        .map(|n| if n == at { format!("{tag} {n}\n") } else { format!("line {n}\n") })
        .collect();
    FileChange {
        path: "f.txt".into(),
        old_path: None,
        kind: ChangeKind::Modified,
        old_blob: None,
        new_blob: None,
        is_binary: false,
        hunks: analyze(&base, &new),
    }
}

fn worst(detector: &ConflictDetector, ours: usize, theirs: usize) -> Option<ConflictSeverity> {
    detector
        .detect(&[edit(ours, "ours")], &[edit(theirs, "theirs")])
        .iter()
        .map(|c| c.severity)
        .max()
}

proptest! {
    /// Moving two edits closer never lowers the predicted severity.
    #[test]
    fn severity_grows_as_edits_close_in(
        at in 1usize..20,
        gap in 1usize..30,
        threshold in 0usize..6,
    ) {
        let detector = ConflictDetector::new(threshold);
        let far = worst(&detector, at, at + gap);
        let near = worst(&detector, at, at + gap - 1);
        prop_assert!(near >= far, "gap {} gave {:?}, gap {} gave {:?}", gap - 1, near, gap, far);
    }

    /// Same line on both sides is always certain; any shared file is at
    /// least possible.
    #[test]
    fn tier_bounds(at in 1usize..=BASE_LINES, other in 1usize..=BASE_LINES) {
        let detector = ConflictDetector::default();
        prop_assert_eq!(worst(&detector, at, at), Some(ConflictSeverity::Certain));
        prop_assert!(worst(&detector, at, other).is_some());
    }

    /// Severity is symmetric in which side is "ours".
    #[test]
    fn tiers_are_symmetric(a in 1usize..=BASE_LINES, b in 1usize..=BASE_LINES) {
        let detector = ConflictDetector::default();
        prop_assert_eq!(worst(&detector, a, b), worst(&detector, b, a));
    }
}

// =============================================================================
// Graph building
// =============================================================================

fn oid(n: usize) -> Oid {
    Oid::new(format!("{n:040x}")).unwrap()
}

/// In-memory history where commit `n` only has parents below `n`.
struct Dag {
    commits: BTreeMap<Oid, CommitInfo>,
    index: BTreeMap<Oid, usize>,
}

impl Dag {
    fn new(parents: &[Vec<usize>]) -> Self {
        let sig = Signature {
            name: "Test".into(),
            email: "test@example.com".into(),
            time: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        };
        let mut commits = BTreeMap::new();
        let mut index = BTreeMap::new();
        for (n, parents) in parents.iter().enumerate() {
            commits.insert(
                oid(n),
                CommitInfo {
                    oid: oid(n),
                    parents: parents.iter().map(|p| oid(*p)).collect(),
                    tree: oid(0),
                    author: sig.clone(),
                    committer: sig.clone(),
                    message: format!("commit {n}\n"),
                },
            );
            index.insert(oid(n), n);
        }
        Self { commits, index }
    }

    fn reachable(&self, from: &[Oid]) -> HashSet<Oid> {
        let mut seen = HashSet::new();
        let mut stack: Vec<Oid> = from.to_vec();
        while let Some(oid) = stack.pop() {
            if seen.insert(oid.clone()) {
                stack.extend(self.commits[&oid].parents.iter().cloned());
            }
        }
        seen
    }
}

impl ObjectReader for Dag {
    fn resolve_name(&self, name: &str) -> Result<Oid, GitError> {
        name.strip_prefix('n')
            .and_then(|n| n.parse::<usize>().ok())
            .map(oid)
            .filter(|oid| self.commits.contains_key(oid))
            .ok_or_else(|| GitError::RefNotFound {
                refname: name.to_string(),
            })
    }

    fn commit(&self, oid: &Oid) -> Result<CommitInfo, GitError> {
        self.commits.get(oid).cloned().ok_or_else(|| GitError::ObjectNotFound {
            oid: oid.to_string(),
        })
    }

    fn walk(&self, include: &[Oid], exclude: &[Oid]) -> Result<Vec<CommitInfo>, GitError> {
        let hidden = self.reachable(exclude);
        let mut found: Vec<Oid> = self
            .reachable(include)
            .into_iter()
            .filter(|oid| !hidden.contains(oid))
            .collect();
        // Parents always have lower numbers, so descending order is topological.
        found.sort_by_key(|oid| std::cmp::Reverse(self.index[oid]));
        Ok(found.iter().map(|oid| self.commits[oid].clone()).collect())
    }

    fn tree_deltas(&self, _: Option<&Oid>, _: &Oid) -> Result<Vec<TreeDelta>, GitError> {
        Ok(Vec::new())
    }

    fn head(&self) -> Result<HeadState, GitError> {
        Err(GitError::RefNotFound {
            refname: "HEAD".into(),
        })
    }

    fn branches(&self) -> Result<Vec<(BranchName, Oid)>, GitError> {
        Ok(Vec::new())
    }

    fn remote_tips(&self) -> Result<Vec<(String, Oid)>, GitError> {
        Ok(Vec::new())
    }

    fn dirty_paths(&self) -> Result<Vec<String>, GitError> {
        Ok(Vec::new())
    }
}

/// Parent lists for a random DAG: commit 0 is the root, every other commit
/// has one or two parents with lower numbers.
fn dag_strategy() -> impl Strategy<Value = Vec<Vec<usize>>> {
    prop::collection::vec((any::<Index>(), prop::option::of(any::<Index>())), 0..30).prop_map(
        |picks| {
            let mut parents = vec![Vec::new()];
            for (n, (first, second)) in picks.into_iter().enumerate() {
                let n = n + 1;
                let mut list = vec![first.index(n)];
                if let Some(second) = second {
                    let p = second.index(n);
                    if p != list[0] {
                        list.push(p);
                    }
                }
                parents.push(list);
            }
            parents
        },
    )
}

proptest! {
    /// Bounded graphs always pass integrity checks and respect the budget.
    #[test]
    fn built_graphs_are_sound(
        parents in dag_strategy(),
        tips in prop::collection::vec(any::<Index>(), 1..4),
        budget in 1usize..40,
    ) {
        let dag = Dag::new(&parents);
        let names: Vec<String> = tips
            .iter()
            .map(|t| format!("n{}", t.index(parents.len())))
            .collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();

        let graph = graph_builder::build(&dag, &refs, budget).unwrap();

        prop_assert!(graph.verify().is_ok(), "{:?}", graph.verify());
        prop_assert!(graph.find_cycle().is_none());
        let distinct: HashSet<&str> = refs.iter().copied().collect();
        prop_assert!(graph.len() <= budget.max(distinct.len()));
        for name in &refs {
            let tip = dag.resolve_name(name).unwrap();
            prop_assert!(graph.contains(&tip));
            prop_assert_eq!(graph.tip(name), Some(&tip));
        }
        prop_assert!(graph.head().is_some());
    }

    /// With a budget covering the whole history nothing is truncated.
    #[test]
    fn unbounded_graph_has_every_ancestor(parents in dag_strategy()) {
        let dag = Dag::new(&parents);
        let last = format!("n{}", parents.len() - 1);

        let graph = graph_builder::build(&dag, &[last.as_str()], parents.len()).unwrap();

        let expected = dag.reachable(&[oid(parents.len() - 1)]);
        prop_assert_eq!(graph.len(), expected.len());
        prop_assert!(graph.truncated().is_empty());
    }

    /// The common ancestor found is reachable from both sides.
    #[test]
    fn merge_base_is_common(parents in dag_strategy(), a in any::<Index>(), b in any::<Index>()) {
        let dag = Dag::new(&parents);
        let (a, b) = (oid(a.index(parents.len())), oid(b.index(parents.len())));

        let base = dag.merge_base(&a, &b).unwrap();

        let base = base.expect("every commit descends from commit 0");
        prop_assert!(dag.is_ancestor(&base, &a).unwrap());
        prop_assert!(dag.is_ancestor(&base, &b).unwrap());
    }
}
