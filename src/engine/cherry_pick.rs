//! engine::cherry_pick
//!
//! Cherry-pick simulation.
//!
//! Each commit is applied onto the running tip in order, like a one-commit
//! rebase step. The picked commit's own change (against its first parent, or
//! against the `-m` parent for a merge) is carried back to that parent's
//! common ancestor with the target and compared with what the target
//! changed since then, plus earlier picks that are not already in the
//! parent's history. Conflicts accumulate across all picks.

use super::context::SimContext;
use super::rebase::skip_step;
use super::{default_head, sort_conflicts, touched_paths, SimError, Simulator, Validation};
use crate::analysis::diff::reanchor;
use crate::analysis::safety::{assess, SafetyInput};
use crate::core::models::{
    CommitInfo, ConflictSeverity, FileChange, OperationStep, OperationType, SimulationResult,
    StepAction,
};
use crate::core::types::Oid;
use crate::git::ObjectReader;
use serde::Deserialize;

/// `git cherry-pick [-m <n>] <commit>...` onto `onto`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CherryPickSimulator {
    pub commits: Vec<String>,
    /// Branch receiving the picks. Defaults to `HEAD`.
    #[serde(default = "default_head", alias = "target")]
    pub onto: String,
    /// 1-based parent number to diff merge commits against.
    #[serde(default)]
    pub mainline: Option<usize>,
}

impl CherryPickSimulator {
    pub fn new<I, S>(commits: I, onto: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            commits: commits.into_iter().map(Into::into).collect(),
            onto: onto.into(),
            mainline: None,
        }
    }

    pub fn mainline(mut self, parent: usize) -> Self {
        self.mainline = Some(parent);
        self
    }

    /// The parent a pick is diffed against: `Ok(None)` for a root commit.
    fn pick_parent<'c>(&self, commit: &'c CommitInfo) -> Result<Option<&'c Oid>, String> {
        match (commit.is_merge(), self.mainline) {
            (true, None) => Err(format!(
                "{} is a merge commit; choose a parent with -m",
                commit.short()
            )),
            (true, Some(n)) => commit.parents.get(n.wrapping_sub(1)).map(Some).ok_or_else(|| {
                format!(
                    "{} has {} parents; -m {n} is out of range",
                    commit.short(),
                    commit.parents.len()
                )
            }),
            (false, _) => Ok(commit.first_parent()),
        }
    }

    /// Warning for a `-m` that has no effect on `commit`.
    fn ignored_mainline(&self, commit: &CommitInfo) -> Option<String> {
        match self.mainline {
            Some(n) if !commit.is_merge() => Some(format!(
                "-m {n} ignored for {}; it is not a merge commit",
                commit.short()
            )),
            _ => None,
        }
    }
}

impl Simulator for CherryPickSimulator {
    fn operation(&self) -> OperationType {
        OperationType::CherryPick
    }

    fn validate(&self, ctx: &SimContext<'_>) -> Result<Validation, SimError> {
        let onto = ctx.resolve(&self.onto)?;
        let mut v = Validation::default();

        if self.commits.is_empty() {
            v.error("no commits to cherry-pick");
        }
        for spec in &self.commits {
            let commit = ctx.resolve(spec)?;
            if let Err(problem) = self.pick_parent(&commit) {
                v.error(problem);
            }
            if let Some(warning) = self.ignored_mainline(&commit) {
                v.warn(warning);
            }
            if ctx.is_ancestor(&commit.oid, &onto.oid)? {
                v.warn(format!(
                    "{} is already in the history of '{}'",
                    commit.short(),
                    self.onto
                ));
            }
        }
        Ok(v)
    }

    fn simulate(&self, ctx: &SimContext<'_>) -> Result<SimulationResult, SimError> {
        let onto = ctx.resolve(&self.onto)?;
        let branch = ctx.label(&self.onto);

        let mut refs: Vec<&str> = vec![self.onto.as_str()];
        refs.extend(self.commits.iter().map(String::as_str));
        let before = ctx.build_graph(&refs)?;
        let mut result = SimulationResult::new(OperationType::CherryPick, before);
        result.source_ref = Some(self.commits.join(" "));
        result.target_ref = Some(self.onto.clone());
        let head_follows = result.before.head() == Some(&onto.oid);

        let detector = ctx.detector();
        let mut tip = onto.oid.clone();
        let mut picked: Vec<(Oid, Vec<FileChange>)> = Vec::new();
        let mut synthesized_commits: Vec<CommitInfo> = Vec::new();

        for (offset, spec) in self.commits.iter().enumerate() {
            let index = offset + 1;
            let commit = ctx.resolve(spec)?;

            if ctx.is_ancestor(&commit.oid, &onto.oid)? {
                result.warnings.push(format!(
                    "{} is already on '{branch}'; picking it would be empty",
                    commit.short()
                ));
                result.steps.push(skip_step(index, &commit, "already in target history"));
                continue;
            }

            result.warnings.extend(self.ignored_mainline(&commit));
            let parent = self.pick_parent(&commit).map_err(|message| SimError::ValidationFailed {
                errors: vec![message],
                warnings: Vec::new(),
            })?;
            let theirs = ctx.changes_between(parent, &commit.oid)?;
            let since = match parent {
                Some(parent) => ctx.merge_base(parent, &onto.oid)?,
                None => None,
            };
            let mut ours = ctx.changes_between(since.as_ref(), &onto.oid)?;
            let prior = match (since.as_ref(), parent) {
                (Some(since), Some(parent)) if since != parent => {
                    ctx.changes_between(Some(since), parent)?
                }
                _ => Vec::new(),
            };
            for (earlier, changes) in &picked {
                let in_history = match parent {
                    Some(parent) => ctx.is_ancestor(earlier, parent)?,
                    None => false,
                };
                if !in_history {
                    ours.extend(changes.iter().cloned());
                }
            }
            let conflicts = detector.detect(&ours, &reanchor(&theirs, &prior));
            let halting = conflicts.iter().any(|c| c.severity == ConflictSeverity::Certain);

            let synthesized = Oid::synthesize("cherry-pick", &tip, &commit.oid, index);
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
            synthesized_commits.push(CommitInfo {
                oid: synthesized.clone(),
                parents: vec![tip.clone()],
                ..commit.clone()
            });
            picked.push((commit.oid.clone(), theirs));
            tip = synthesized;

            if halting && ctx.options().stop_on_first_conflict {
                result.partial = true;
                result.warnings.push(format!(
                    "cherry-pick would stop at {} with a certain conflict; later commits were not simulated",
                    commit.short()
                ));
                break;
            }
        }

        sort_conflicts(&mut result.conflicts);
        result.success = !result.has_certain_conflicts();
        let picked: Vec<FileChange> = picked.into_iter().flat_map(|(_, changes)| changes).collect();
        result.changed_files = touched_paths(&picked);
        result.new_head = Some(tip.clone());

        for commit in synthesized_commits {
            result.after.insert(commit);
        }
        result.after.set_tip(branch.clone(), tip.clone());
        if head_follows {
            result.after.set_head(tip);
        }
        tracing::debug!(
            branch = %branch,
            picks = result.rewritten_commits.len(),
            "cherry-pick simulated"
        );

        let shared = ctx.is_shared(&branch, std::slice::from_ref(&onto.oid))?;
        result.safety = assess(
            &OperationType::CherryPick,
            &SafetyInput {
                rewritten: &result.rewritten_commits,
                shared,
                has_conflicts: !result.conflicts.is_empty(),
                prior_tip: Some(&onto.oid),
                branch: Some(branch.as_str()),
                ..Default::default()
            },
        );

        Ok(result)
    }
}
