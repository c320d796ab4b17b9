//! engine::rebase
//!
//! Rebase simulation.
//!
//! The commits on `source` that `onto` lacks are replayed oldest first onto
//! the `onto` tip. Each replay is checked for conflicts against everything
//! the upstream side changed since the merge base. A commit's own change is
//! first carried back through the earlier replays so both sides are
//! positioned against the merge base; a commit never conflicts with its
//! own ancestors. Replayed commits get synthesized hashes, so the projected
//! graph never reuses a real object id.
//!
//! Commits whose patch is already upstream are skipped, as are merge
//! commits in the range (a plain rebase linearises them away).

use super::context::SimContext;
use super::{default_head, sort_conflicts, touched_paths, SimError, Simulator, Validation};
use crate::analysis::diff::{patch_id, reanchor};
use crate::analysis::safety::{assess, SafetyInput};
use crate::core::models::{
    CommitInfo, ConflictSeverity, FileChange, OperationStep, OperationType, SimulationResult,
    StepAction,
};
use crate::core::types::Oid;
use crate::git::ObjectReader;
use serde::Deserialize;
use std::collections::HashSet;

/// `git rebase <onto> [<source>]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RebaseSimulator {
    /// Branch being moved. Defaults to `HEAD`.
    #[serde(default = "default_head")]
    pub source: String,
    /// Upstream to replay onto.
    pub onto: String,
}

impl RebaseSimulator {
    pub fn new(source: impl Into<String>, onto: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            onto: onto.into(),
        }
    }
}

impl Simulator for RebaseSimulator {
    fn operation(&self) -> OperationType {
        OperationType::Rebase
    }

    fn validate(&self, ctx: &SimContext<'_>) -> Result<Validation, SimError> {
        let source = ctx.resolve(&self.source)?;
        let onto = ctx.resolve(&self.onto)?;
        let mut v = Validation::default();

        if source.oid == onto.oid {
            v.warn("source and target are the same commit; nothing to rebase");
            return Ok(v);
        }

        match ctx.merge_base(&source.oid, &onto.oid)? {
            None => v.error(format!(
                "no common ancestor between '{}' and '{}'",
                self.source, self.onto
            )),
            Some(base) if base == onto.oid => v.warn(format!(
                "'{}' is already based on '{}'; rebase would have no effect",
                self.source, self.onto
            )),
            Some(base) if base == source.oid => v.warn(format!(
                "'{}' is ahead of '{}'; the rebase only fast-forwards (consider git reset)",
                self.onto, self.source
            )),
            Some(_) => {}
        }
        Ok(v)
    }

    fn simulate(&self, ctx: &SimContext<'_>) -> Result<SimulationResult, SimError> {
        let source = ctx.resolve(&self.source)?;
        let onto = ctx.resolve(&self.onto)?;
        let base = ctx.merge_base(&source.oid, &onto.oid)?;
        let branch = ctx.label(&self.source);

        let before = ctx.build_graph(&[self.source.as_str(), self.onto.as_str()])?;
        let mut result = SimulationResult::new(OperationType::Rebase, before);
        result.source_ref = Some(self.source.clone());
        result.target_ref = Some(self.onto.clone());
        result.merge_base = base.clone();

        if base.as_ref() == Some(&onto.oid) {
            result.new_head = Some(source.oid.clone());
            result.changed_files = Vec::new();
            result.safety = assess(&OperationType::Rebase, &SafetyInput::default());
            return Ok(result);
        }

        let mut range = ctx.walk(&[source.oid.clone()], &[onto.oid.clone()])?;
        range.reverse();

        let upstream_changes = ctx.changes_between(base.as_ref(), &onto.oid)?;
        let (upstream_patches, patches_truncated) =
            upstream_patch_ids(ctx, &onto.oid, base.as_ref())?;
        if patches_truncated {
            result.warnings.push(format!(
                "only the newest {} upstream commits were checked for patches already applied",
                ctx.options().max_graph_commits
            ));
        }
        let detector = ctx.detector();
        tracing::debug!(
            branch = %branch,
            commits = range.len(),
            upstream_files = upstream_changes.len(),
            "replaying rebase range"
        );

        let mut tip = onto.oid.clone();
        let mut replayed: Vec<FileChange> = Vec::new();
        let mut replayed_commits: Vec<CommitInfo> = Vec::new();

        for (offset, commit) in range.iter().enumerate() {
            let index = offset + 1;

            if commit.is_merge() {
                result.warnings.push(format!(
                    "merge commit {} would be dropped; rebase linearises history",
                    commit.short()
                ));
                result.steps.push(skip_step(index, commit, "merge commit dropped"));
                continue;
            }

            let changes = ctx.changes_for(&commit.oid)?;
            if !changes.is_empty() && upstream_patches.contains(&patch_id(&changes)) {
                result.warnings.push(format!(
                    "{} '{}' is already upstream and would be skipped",
                    commit.short(),
                    commit.summary()
                ));
                result.steps.push(skip_step(index, commit, "patch already upstream"));
                continue;
            }

            let prior = match commit.first_parent() {
                Some(parent) if Some(parent) != base.as_ref() => {
                    ctx.changes_between(base.as_ref(), parent)?
                }
                _ => Vec::new(),
            };
            let conflicts = detector.detect(&upstream_changes, &reanchor(&changes, &prior));
            let halting = conflicts.iter().any(|c| c.severity == ConflictSeverity::Certain);

            let synthesized = Oid::synthesize("rebase", &tip, &commit.oid, index);
            result.steps.push(OperationStep {
                index,
                action: StepAction::Pick,
                original: commit.oid.clone(),
                synthesized: Some(synthesized.clone()),
                description: format!("pick {} {}", commit.short(), commit.summary()),
                conflicts: conflicts.clone(),
            });
            result.conflicts.extend(conflicts);
            result.rewritten_commits.push(commit.oid.clone());
            replayed_commits.push(CommitInfo {
                oid: synthesized.clone(),
                parents: vec![tip.clone()],
                ..commit.clone()
            });
            replayed.extend(changes);
            tip = synthesized;

            if halting && ctx.options().stop_on_first_conflict {
                result.partial = true;
                result.warnings.push(format!(
                    "replay would stop at {} with a certain conflict; later commits were not simulated",
                    commit.short()
                ));
                break;
            }
        }

        sort_conflicts(&mut result.conflicts);
        result.success = !result.has_certain_conflicts();
        result.changed_files = touched_paths(&replayed);
        result.new_head = Some(tip.clone());

        let head_follows = result.before.head() == Some(&source.oid);
        for commit in replayed_commits {
            result.after.insert(commit);
        }
        result.after.set_tip(branch.clone(), tip.clone());
        if head_follows {
            result.after.set_head(tip);
        }
        result.after.retain_reachable(&[]);

        let shared = ctx.is_shared(&branch, &result.rewritten_commits)?;
        result.safety = assess(
            &OperationType::Rebase,
            &SafetyInput {
                rewritten: &result.rewritten_commits,
                orphaned: &[],
                shared,
                has_conflicts: !result.conflicts.is_empty(),
                prior_tip: Some(&source.oid),
                branch: Some(branch.as_str()),
            },
        );

        Ok(result)
    }
}

/// Patch ids of the non-merge commits `onto` gained since `base`.
///
/// Only the newest `max_graph_commits` upstream commits are read; the flag is
/// set when older ones were left out.
fn upstream_patch_ids(
    ctx: &SimContext<'_>,
    onto: &Oid,
    base: Option<&Oid>,
) -> Result<(HashSet<String>, bool), SimError> {
    let limit = ctx.options().max_graph_commits;
    let exclude: Vec<Oid> = base.cloned().into_iter().collect();
    let mut upstream = ctx.walk_limited(&[onto.clone()], &exclude, limit.saturating_add(1))?;
    let truncated = upstream.len() > limit;
    upstream.truncate(limit);

    let mut ids = HashSet::new();
    for commit in upstream {
        if commit.is_merge() {
            continue;
        }
        let changes = ctx.changes_for(&commit.oid)?;
        if !changes.is_empty() {
            ids.insert(patch_id(&changes));
        }
    }
    Ok((ids, truncated))
}

pub(crate) fn skip_step(index: usize, commit: &CommitInfo, why: &str) -> OperationStep {
    OperationStep {
        index,
        action: StepAction::Skip,
        original: commit.oid.clone(),
        synthesized: None,
        description: format!("skip {} {} ({why})", commit.short(), commit.summary()),
        conflicts: Vec::new(),
    }
}
