//! engine::merge
//!
//! Merge simulation.
//!
//! Three cases, decided from the merge base:
//!
//! - source already reachable from target: nothing to do
//! - target reachable from source and fast-forwards allowed: the target tip
//!   moves to the source commit, no commit is created
//! - otherwise: a three-way comparison of base->target against base->source
//!   through the conflict detector, and one synthesized two-parent merge
//!   commit

use super::context::SimContext;
use super::{default_head, sort_conflicts, touched_paths, SimError, Simulator, Validation};
use crate::analysis::safety::{assess, SafetyInput};
use crate::core::models::{
    CommitInfo, ConflictSeverity, OperationStep, OperationType, SimulationResult, StepAction,
};
use crate::core::types::Oid;
use crate::git::ObjectReader;
use serde::Deserialize;
use std::collections::HashSet;

/// `git merge [--no-ff] <source>` into `target`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MergeSimulator {
    /// Branch being merged in.
    pub source: String,
    /// Branch receiving the merge. Defaults to `HEAD`.
    #[serde(default = "default_head")]
    pub target: String,
    /// Always create a merge commit.
    #[serde(default)]
    pub no_ff: bool,
}

impl MergeSimulator {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            no_ff: false,
        }
    }

    pub fn no_ff(mut self, no_ff: bool) -> Self {
        self.no_ff = no_ff;
        self
    }
}

impl Simulator for MergeSimulator {
    fn operation(&self) -> OperationType {
        OperationType::Merge
    }

    fn validate(&self, ctx: &SimContext<'_>) -> Result<Validation, SimError> {
        let source = ctx.resolve(&self.source)?;
        let target = ctx.resolve(&self.target)?;
        let mut v = Validation::default();

        if source.oid == target.oid {
            v.warn("source and target are the same commit; nothing to merge");
            return Ok(v);
        }

        match ctx.merge_base(&source.oid, &target.oid)? {
            None => v.error(format!(
                "no common ancestor between '{}' and '{}'",
                self.source, self.target
            )),
            Some(base) if base == target.oid && self.no_ff => {
                v.warn(
                    "fast-forward is possible, but --no-ff was given; a merge commit will be created",
                )
            }
            Some(base) if base == target.oid => v.warn("this will be a fast-forward merge"),
            Some(base) if base == source.oid => v.warn(format!(
                "'{}' is already merged into '{}'",
                self.source, self.target
            )),
            Some(_) => {}
        }
        Ok(v)
    }

    fn simulate(&self, ctx: &SimContext<'_>) -> Result<SimulationResult, SimError> {
        let source = ctx.resolve(&self.source)?;
        let target = ctx.resolve(&self.target)?;
        let base = ctx.merge_base(&source.oid, &target.oid)?;
        let branch = ctx.label(&self.target);

        let before = ctx.build_graph(&[self.target.as_str(), self.source.as_str()])?;
        let mut result = SimulationResult::new(OperationType::Merge, before);
        result.source_ref = Some(self.source.clone());
        result.target_ref = Some(self.target.clone());
        result.merge_base = base.clone();
        let head_follows = result.before.head() == Some(&target.oid);

        if source.oid == target.oid || base.as_ref() == Some(&source.oid) {
            result.new_head = Some(target.oid.clone());
            result.safety = assess(&OperationType::Merge, &SafetyInput::default());
            return Ok(result);
        }

        if base.as_ref() == Some(&target.oid) && !self.no_ff {
            let changes = ctx.changes_between(Some(&target.oid), &source.oid)?;
            result.fast_forward = true;
            result.changed_files = touched_paths(&changes);
            result.new_head = Some(source.oid.clone());
            result.after.set_tip(branch.clone(), source.oid.clone());
            if head_follows {
                result.after.set_head(source.oid.clone());
            }
            result.warnings.push(format!(
                "'{branch}' would fast-forward to {}",
                source.short()
            ));
            result.safety = assess(
                &OperationType::Merge,
                &SafetyInput {
                    prior_tip: Some(&target.oid),
                    branch: Some(branch.as_str()),
                    ..Default::default()
                },
            );
            return Ok(result);
        }

        let ours = ctx.changes_between(base.as_ref(), &target.oid)?;
        let theirs = ctx.changes_between(base.as_ref(), &source.oid)?;
        let mut conflicts = ctx.detector().detect(&ours, &theirs);
        sort_conflicts(&mut conflicts);

        let conflicted: HashSet<&str> = conflicts.iter().map(|c| c.path.as_str()).collect();
        let clean: Vec<String> = touched_paths(ours.iter().chain(theirs.iter()))
            .into_iter()
            .filter(|p| !conflicted.contains(p.as_str()))
            .collect();
        if !clean.is_empty() {
            result.warnings.push(format!(
                "{} file(s) merge cleanly: {}",
                clean.len(),
                clean.join(", ")
            ));
        }

        let merge_oid = Oid::synthesize("merge", &target.oid, &source.oid, 0);
        let merge_commit = CommitInfo {
            oid: merge_oid.clone(),
            parents: vec![target.oid.clone(), source.oid.clone()],
            tree: target.tree.clone(),
            author: target.committer.clone(),
            committer: target.committer.clone(),
            message: format!("Merge branch '{}' into {branch}", self.source),
        };
        result.steps.push(OperationStep {
            index: 1,
            action: StepAction::Merge,
            original: source.oid.clone(),
            synthesized: Some(merge_oid.clone()),
            description: format!("merge {} into {branch}", source.short()),
            conflicts: conflicts.clone(),
        });

        result.after.insert(merge_commit);
        result.after.set_tip(branch.clone(), merge_oid.clone());
        if head_follows {
            result.after.set_head(merge_oid.clone());
        }

        result.success = !conflicts.iter().any(|c| c.severity == ConflictSeverity::Certain);
        result.changed_files = touched_paths(&theirs);
        result.new_head = Some(merge_oid);
        result.conflicts = conflicts;
        result.safety = assess(
            &OperationType::Merge,
            &SafetyInput {
                has_conflicts: !result.conflicts.is_empty(),
                prior_tip: Some(&target.oid),
                branch: Some(branch.as_str()),
                ..Default::default()
            },
        );

        Ok(result)
    }
}
