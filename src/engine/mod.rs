//! engine
//!
//! Simulates history-altering operations against a read-only repository.
//!
//! # Architecture
//!
//! Every simulation follows the same lifecycle:
//!
//! ```text
//! Request -> Pre-hooks -> Override hooks -> Validate -> Simulate -> Post-hooks
//! ```
//!
//! The four built-in operations are a closed set, [`Simulation`], with one
//! [`Simulator`] implementation per variant. Operations outside that set are
//! routed to registered [`hooks::SimulatorExtension`]s by the
//! [`dispatch`](dispatch::dispatch) entry point.
//!
//! # Invariants
//!
//! - Nothing in the engine writes to the repository
//! - A non-empty validation error list means `simulate` is never called
//! - Conflicts are data, never errors
//! - Per-call caches live in [`SimContext`] and die with it
//!
//! # Example
//!
//! ```ignore
//! use git_sim::engine::{dispatch::dispatch, request::OperationRequest, EngineOptions};
//! use git_sim::git::Git;
//!
//! let git = Git::open(Path::new("."))?;
//! let request = OperationRequest::parse("rebase main")?;
//! let result = dispatch(&git, &EngineOptions::default(), &request, &[], &[])?;
//! println!("{} conflicts, danger {}", result.conflicts.len(), result.safety.danger);
//! ```

pub mod cherry_pick;
pub mod context;
pub mod dispatch;
pub mod hooks;
pub mod merge;
pub mod rebase;
pub mod request;
pub mod reset;

pub use cherry_pick::CherryPickSimulator;
pub use context::SimContext;
pub use merge::MergeSimulator;
pub use rebase::RebaseSimulator;
pub use request::OperationRequest;
pub use reset::ResetSimulator;

use crate::core::models::{ConflictInfo, FileChange, OperationType, SimulationResult};
use crate::core::types::Oid;
use crate::git::GitError;
use serde::de::DeserializeOwned;
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;

/// Tunables for one simulation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Node budget for each graph snapshot.
    pub max_graph_commits: usize,
    /// Halt a replay at the first certain conflict.
    pub stop_on_first_conflict: bool,
    /// Largest line gap still reported as a likely conflict.
    pub adjacency_threshold: usize,
    /// Treat branches whose commits a remote-tracking ref can reach as shared.
    pub detect_pushed: bool,
    /// Branches always treated as shared.
    pub shared_branches: BTreeSet<String>,
}

impl EngineOptions {
    pub const DEFAULT_MAX_GRAPH_COMMITS: usize = 50;
    pub const DEFAULT_ADJACENCY_THRESHOLD: usize =
        crate::analysis::conflict::DEFAULT_ADJACENCY_THRESHOLD;
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_graph_commits: Self::DEFAULT_MAX_GRAPH_COMMITS,
            stop_on_first_conflict: false,
            adjacency_threshold: Self::DEFAULT_ADJACENCY_THRESHOLD,
            detect_pushed: true,
            shared_branches: BTreeSet::new(),
        }
    }
}

/// Errors from the simulation engine.
#[derive(Debug, Error)]
pub enum SimError {
    /// A ref or hash does not resolve.
    #[error("not found: {spec}")]
    NotFound { spec: String },

    /// An abbreviated hash matches several commits.
    #[error("ambiguous reference '{spec}' matches {} commits", candidates.len())]
    AmbiguousReference { spec: String, candidates: Vec<Oid> },

    /// Pre-flight checks failed; the simulation was not run.
    #[error("validation failed: {}", errors.join("; "))]
    ValidationFailed {
        errors: Vec<String>,
        warnings: Vec<String>,
    },

    /// A graph was requested for refs none of which resolve.
    #[error("no requested ref resolves to a commit")]
    EmptyRefSet,

    /// No simulator or extension handles the operation.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Parameters could not be decoded for the operation.
    #[error("invalid parameters for {operation}: {message}")]
    InvalidParams { operation: String, message: String },

    /// A hook failed.
    #[error("hook '{hook}' failed: {source}")]
    Hook {
        hook: String,
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// A simulator extension failed.
    #[error("extension failed: {source}")]
    Extension {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// Repository backend failure.
    #[error(transparent)]
    Git(GitError),
}

impl From<GitError> for SimError {
    fn from(err: GitError) -> Self {
        match err {
            GitError::RefNotFound { refname } => Self::NotFound { spec: refname },
            GitError::InvalidRevision { spec, message } => Self::NotFound {
                spec: format!("{spec} ({message})"),
            },
            GitError::ObjectNotFound { oid } => Self::NotFound { spec: oid },
            GitError::AmbiguousReference { spec, candidates } => {
                Self::AmbiguousReference { spec, candidates }
            }
            other => Self::Git(other),
        }
    }
}

/// Outcome of a simulator's pre-flight checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validation {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl Validation {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Convert a failed validation into [`SimError::ValidationFailed`].
    pub fn into_result(self) -> Result<Vec<String>, SimError> {
        if self.is_ok() {
            Ok(self.warnings)
        } else {
            Err(SimError::ValidationFailed {
                errors: self.errors,
                warnings: self.warnings,
            })
        }
    }
}

/// One operation-specific simulation algorithm.
///
/// Simulators are stateless across calls: all repository access and
/// memoization goes through the [`SimContext`] passed in.
pub trait Simulator {
    fn operation(&self) -> OperationType;

    /// Pre-flight checks. Resolution failures are returned as errors;
    /// problems with an otherwise resolvable request go in the error list.
    fn validate(&self, ctx: &SimContext<'_>) -> Result<Validation, SimError>;

    /// Produce the predicted outcome.
    ///
    /// Callers are expected to have run [`Simulator::validate`] first.
    fn simulate(&self, ctx: &SimContext<'_>) -> Result<SimulationResult, SimError>;

    /// Validate, then simulate. Validation warnings lead the result's
    /// warning list.
    fn run(&self, ctx: &SimContext<'_>) -> Result<SimulationResult, SimError> {
        let leading = self.validate(ctx)?.into_result()?;
        let mut result = self.simulate(ctx)?;
        let mut seen: HashSet<String> = HashSet::new();
        result.warnings = leading
            .into_iter()
            .chain(std::mem::take(&mut result.warnings))
            .filter(|w| seen.insert(w.clone()))
            .collect();
        Ok(result)
    }
}

/// The built-in operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Simulation {
    Rebase(RebaseSimulator),
    Merge(MergeSimulator),
    Reset(ResetSimulator),
    CherryPick(CherryPickSimulator),
}

impl Simulation {
    /// Decode a built-in simulation from an operation name and its params.
    ///
    /// Returns `Ok(None)` when `operation` is not built in.
    ///
    /// # Errors
    ///
    /// [`SimError::InvalidParams`] when a built-in operation's params do
    /// not decode.
    pub fn from_params(
        operation: &str,
        params: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Option<Self>, SimError> {
        let simulation = match request::normalize_operation(operation).as_str() {
            "rebase" => Self::Rebase(decode(operation, params)?),
            "merge" => Self::Merge(decode(operation, params)?),
            "reset" => Self::Reset(decode(operation, params)?),
            "cherry-pick" => Self::CherryPick(decode(operation, params)?),
            _ => return Ok(None),
        };
        Ok(Some(simulation))
    }

    fn inner(&self) -> &dyn Simulator {
        match self {
            Self::Rebase(s) => s,
            Self::Merge(s) => s,
            Self::Reset(s) => s,
            Self::CherryPick(s) => s,
        }
    }
}

impl Simulator for Simulation {
    fn operation(&self) -> OperationType {
        self.inner().operation()
    }

    fn validate(&self, ctx: &SimContext<'_>) -> Result<Validation, SimError> {
        self.inner().validate(ctx)
    }

    fn simulate(&self, ctx: &SimContext<'_>) -> Result<SimulationResult, SimError> {
        self.inner().simulate(ctx)
    }
}

fn decode<T: DeserializeOwned>(
    operation: &str,
    params: &serde_json::Map<String, serde_json::Value>,
) -> Result<T, SimError> {
    serde_json::from_value(serde_json::Value::Object(params.clone())).map_err(|e| {
        SimError::InvalidParams {
            operation: operation.to_string(),
            message: e.to_string(),
        }
    })
}

pub(crate) fn default_head() -> String {
    "HEAD".to_string()
}

/// Sorted, de-duplicated paths touched by `changes`, including rename
/// sources.
pub(crate) fn touched_paths<'a>(changes: impl IntoIterator<Item = &'a FileChange>) -> Vec<String> {
    let mut paths: BTreeSet<String> = BTreeSet::new();
    for change in changes {
        paths.insert(change.path.clone());
        if let Some(old) = &change.old_path {
            paths.insert(old.clone());
        }
    }
    paths.into_iter().collect()
}

/// Severity-descending, path-ascending conflict order.
pub(crate) fn sort_conflicts(conflicts: &mut [ConflictInfo]) {
    conflicts.sort_by(|a, b| b.severity.cmp(&a.severity).then_with(|| a.path.cmp(&b.path)));
}
