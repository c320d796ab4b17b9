//! analysis::safety
//!
//! Danger rating for a simulated operation.
//!
//! The rating is a fixed rule table over the operation kind, the commits it
//! rewrites or orphans, and whether the affected branch is shared. The first
//! matching rule wins:
//!
//! | Rule | Danger | Force push |
//! |------|--------|------------|
//! | hard reset, or any commit orphaned | CRITICAL if shared, else HIGH | no |
//! | rebase / cherry-pick rewriting commits | HIGH if shared, else MEDIUM | if shared |
//! | merge without conflicts | LOW | no |
//! | merge with conflicts, soft/mixed reset | MEDIUM | no |
//! | anything else | LOW | no |
//!
//! Every outcome is reversible through the reflog. Recovery steps are
//! populated whenever danger is MEDIUM or above.

use crate::core::models::{DangerLevel, OperationType, ResetMode, SafetyInfo};
use crate::core::types::Oid;

/// Inputs to [`assess`].
#[derive(Debug, Clone, Default)]
pub struct SafetyInput<'a> {
    pub rewritten: &'a [Oid],
    pub orphaned: &'a [Oid],
    /// The affected branch is shared with collaborators.
    pub shared: bool,
    /// The simulation predicted at least one conflict.
    pub has_conflicts: bool,
    /// Tip of the affected branch before the operation.
    pub prior_tip: Option<&'a Oid>,
    /// Affected branch name, if any.
    pub branch: Option<&'a str>,
}

/// Rate an operation.
///
/// # Example
///
/// ```
/// use git_sim::analysis::safety::{assess, SafetyInput};
/// use git_sim::core::models::{DangerLevel, OperationType, ResetMode};
///
/// let info = assess(&OperationType::Reset(ResetMode::Hard), &SafetyInput::default());
/// assert_eq!(info.danger, DangerLevel::High);
/// assert!(info.reversible);
/// assert!(!info.recovery_steps.is_empty());
/// ```
pub fn assess(operation: &OperationType, input: &SafetyInput<'_>) -> SafetyInfo {
    let mut reasons = Vec::new();
    let shared_reason = || {
        format!(
            "branch '{}' is shared with collaborators",
            input.branch.unwrap_or("HEAD")
        )
    };

    let hard_reset = matches!(operation, OperationType::Reset(ResetMode::Hard));
    let (danger, force_push) = if hard_reset || !input.orphaned.is_empty() {
        if hard_reset {
            reasons.push("hard reset discards uncommitted changes".to_string());
        }
        if !input.orphaned.is_empty() {
            reasons.push(format!(
                "{} commit(s) would become unreachable from every branch",
                input.orphaned.len()
            ));
        }
        if input.shared {
            reasons.push(shared_reason());
            (DangerLevel::Critical, false)
        } else {
            (DangerLevel::High, false)
        }
    } else {
        match operation {
            OperationType::Rebase | OperationType::CherryPick if !input.rewritten.is_empty() => {
                reasons.push(format!(
                    "{} commit(s) would be rewritten with new hashes",
                    input.rewritten.len()
                ));
                if input.shared {
                    reasons.push(shared_reason());
                    (DangerLevel::High, true)
                } else {
                    (DangerLevel::Medium, false)
                }
            }
            OperationType::Merge if input.has_conflicts => {
                reasons.push("merge is predicted to conflict".to_string());
                (DangerLevel::Medium, false)
            }
            OperationType::Merge => {
                reasons.push("merge only adds history".to_string());
                (DangerLevel::Low, false)
            }
            OperationType::Reset(mode) => {
                reasons.push(format!("{mode} reset moves the branch but keeps file changes"));
                (DangerLevel::Medium, false)
            }
            _ => {
                reasons.push("no existing history is rewritten".to_string());
                (DangerLevel::Low, false)
            }
        }
    };

    let recovery_steps = if danger >= DangerLevel::Medium {
        recovery_steps(operation, input, force_push)
    } else {
        Vec::new()
    };

    SafetyInfo {
        danger,
        reversible: true,
        force_push,
        recovery_steps,
        reasons,
    }
}

fn recovery_steps(
    operation: &OperationType,
    input: &SafetyInput<'_>,
    force_push: bool,
) -> Vec<String> {
    let prior = input
        .prior_tip
        .map(|oid| oid.short(Oid::MIN_ABBREV_LEN).to_string())
        .unwrap_or_else(|| "ORIG_HEAD".to_string());

    let mut steps = match operation {
        OperationType::Rebase => vec![
            "While the rebase is running: git rebase --abort".to_string(),
            format!("After it completes: git reset --hard {prior}"),
        ],
        OperationType::CherryPick => vec![
            "While the cherry-pick is running: git cherry-pick --abort".to_string(),
            format!("After it completes: git reset --hard {prior}"),
        ],
        OperationType::Merge => vec![
            "While conflicts are unresolved: git merge --abort".to_string(),
            format!("After committing: git reset --hard {prior}"),
        ],
        OperationType::Reset(mode) => {
            let mut steps = vec![
                format!("Find the previous tip with: git reflog (it was {prior})"),
                format!("Restore it with: git reset --{mode} {prior}"),
            ];
            if *mode == ResetMode::Hard {
                steps.insert(0, "Save uncommitted work first: git stash".to_string());
            }
            steps
        }
        OperationType::Extension(_) => {
            vec![format!("Restore the previous tip: git reset --hard {prior}")]
        }
    };

    if !input.orphaned.is_empty() {
        let listed: Vec<&str> = input
            .orphaned
            .iter()
            .take(5)
            .map(|oid| oid.short(Oid::MIN_ABBREV_LEN))
            .collect();
        steps.push(format!(
            "Unreachable commits stay in the reflog until garbage collection: {}",
            listed.join(", ")
        ));
    }
    if force_push {
        steps.push(
            "Coordinate with collaborators, then publish with: git push --force-with-lease"
                .to_string(),
        );
    }

    steps
}
