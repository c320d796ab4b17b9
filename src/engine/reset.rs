//! engine::reset
//!
//! Reset simulation.
//!
//! The current branch tip moves to `target`. Commits on the branch that
//! `target` cannot reach leave the branch; those no other local branch
//! reaches become orphaned. Soft and mixed resets differ only in index
//! bookkeeping, reported as warnings. A hard reset also discards the
//! working tree's uncommitted changes.

use super::context::SimContext;
use super::{touched_paths, SimError, Simulator, Validation};
use crate::analysis::safety::{assess, SafetyInput};
use crate::core::models::{OperationType, ResetMode, SimulationResult};
use crate::core::types::Oid;
use crate::git::ObjectReader;
use serde::Deserialize;
use std::collections::{BTreeSet, HashSet};

/// `git reset [--soft|--mixed|--hard] <target>` of the current branch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResetSimulator {
    pub target: String,
    #[serde(default)]
    pub mode: ResetMode,
}

impl ResetSimulator {
    pub fn new(target: impl Into<String>, mode: ResetMode) -> Self {
        Self {
            target: target.into(),
            mode,
        }
    }
}

fn mode_note(mode: ResetMode) -> &'static str {
    match mode {
        ResetMode::Soft => "soft reset: changes from the dropped commits stay staged",
        ResetMode::Mixed => "mixed reset: changes are unstaged but kept in the working tree",
        ResetMode::Hard => "hard reset: all uncommitted changes will be lost",
    }
}

impl Simulator for ResetSimulator {
    fn operation(&self) -> OperationType {
        OperationType::Reset(self.mode)
    }

    fn validate(&self, ctx: &SimContext<'_>) -> Result<Validation, SimError> {
        let head = ctx.head()?;
        let target = ctx.resolve(&self.target)?;
        let mut v = Validation::default();

        if head.oid == target.oid {
            v.warn("already at the target commit; the branch would not move");
        } else {
            let leaving = ctx.walk(&[head.oid.clone()], &[target.oid.clone()])?.len();
            if leaving > 0 {
                v.warn(format!("{leaving} commit(s) would leave the branch"));
            }
        }
        v.warn(mode_note(self.mode));
        Ok(v)
    }

    fn simulate(&self, ctx: &SimContext<'_>) -> Result<SimulationResult, SimError> {
        let head = ctx.head()?;
        let target = ctx.resolve(&self.target)?;
        let branch = head
            .branch
            .as_ref()
            .map(|b| b.to_string())
            .unwrap_or_else(|| "HEAD".to_string());

        let before = ctx.build_graph(&["HEAD", self.target.as_str()])?;
        let operation = OperationType::Reset(self.mode);
        let mut result = SimulationResult::new(operation.clone(), before);
        result.source_ref = Some(branch.clone());
        result.target_ref = Some(self.target.clone());
        result.merge_base = ctx.merge_base(&head.oid, &target.oid)?;
        result.new_head = Some(target.oid.clone());

        let leaving: Vec<Oid> = ctx
            .walk(&[head.oid.clone()], &[target.oid.clone()])?
            .into_iter()
            .map(|c| c.oid)
            .collect();

        let other_tips: Vec<Oid> = ctx
            .branches()?
            .into_iter()
            .filter(|(name, _)| head.branch.as_ref() != Some(name))
            .map(|(_, oid)| oid)
            .collect();
        let kept: HashSet<Oid> = if other_tips.is_empty() || leaving.is_empty() {
            HashSet::new()
        } else {
            ctx.walk(&other_tips, &[target.oid.clone()])?
                .into_iter()
                .map(|c| c.oid)
                .collect()
        };
        result.orphaned_commits = leaving
            .iter()
            .filter(|oid| !kept.contains(*oid))
            .cloned()
            .collect();
        if !result.orphaned_commits.is_empty() {
            result.warnings.push(format!(
                "{} commit(s) would become unreachable from every branch",
                result.orphaned_commits.len()
            ));
        }

        let mut changed: BTreeSet<String> = if head.oid == target.oid {
            BTreeSet::new()
        } else {
            touched_paths(&ctx.changes_between(Some(&target.oid), &head.oid)?)
                .into_iter()
                .collect()
        };
        if self.mode == ResetMode::Hard {
            let dirty = ctx.dirty_paths()?;
            if !dirty.is_empty() {
                result.warnings.push(format!(
                    "uncommitted changes in {} file(s) would be discarded: {}",
                    dirty.len(),
                    dirty.join(", ")
                ));
            }
            changed.extend(dirty);
        }
        result.changed_files = changed.into_iter().collect();

        result.after.set_tip(branch.clone(), target.oid.clone());
        result.after.set_head(target.oid.clone());

        let exposure: &[Oid] = if leaving.is_empty() {
            std::slice::from_ref(&head.oid)
        } else {
            &leaving
        };
        let shared = ctx.is_shared(&branch, exposure)?;
        result.safety = assess(
            &operation,
            &SafetyInput {
                orphaned: &result.orphaned_commits,
                shared,
                prior_tip: Some(&head.oid),
                branch: Some(branch.as_str()),
                ..Default::default()
            },
        );

        Ok(result)
    }
}
