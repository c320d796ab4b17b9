//! engine::dispatch
//!
//! Routes an [`OperationRequest`] to a simulator with hooks around it.
//!
//! # Order
//!
//! 1. Route: a built-in operation, else the first extension whose
//!    `supports` accepts the name, else [`SimError::UnsupportedOperation`].
//! 2. Pre-hooks, in order. Each may return params merged key by key into
//!    the request; later hooks win.
//! 3. Override hooks, in order. The first to return a result replaces the
//!    simulator call.
//! 4. Otherwise validate then simulate (built-in), or call the extension.
//! 5. Post-hooks, in order, each receiving the previous hook's result.

use super::context::SimContext;
use super::hooks::{SimulationHook, SimulatorExtension};
use super::request::{normalize_operation, OperationRequest};
use super::{EngineOptions, SimError, Simulation, Simulator};
use crate::core::models::SimulationResult;
use crate::git::ObjectReader;

const BUILTINS: [&str; 4] = ["rebase", "merge", "reset", "cherry-pick"];

enum Route<'e> {
    Builtin,
    Extension(&'e dyn SimulatorExtension),
}

/// Run one simulation request.
///
/// # Errors
///
/// - [`SimError::UnsupportedOperation`] if nothing handles the operation
/// - [`SimError::InvalidParams`] if built-in params do not decode
/// - [`SimError::ValidationFailed`] if pre-flight checks fail
/// - [`SimError::Hook`] / [`SimError::Extension`] for failures in external code
/// - resolution errors from the simulator, unchanged
pub fn dispatch<'e>(
    reader: &dyn ObjectReader,
    options: &EngineOptions,
    request: &OperationRequest,
    hooks: &[&dyn SimulationHook],
    extensions: &[&'e dyn SimulatorExtension],
) -> Result<SimulationResult, SimError> {
    let mut request = request.clone();
    request.operation = normalize_operation(&request.operation);

    let route = if BUILTINS.contains(&request.operation.as_str()) {
        Route::Builtin
    } else {
        match extensions.iter().find(|e| e.supports(&request.operation)) {
            Some(ext) => Route::Extension(*ext),
            None => return Err(SimError::UnsupportedOperation(request.operation)),
        }
    };

    for hook in hooks {
        let update = hook.pre_simulate(&request).map_err(|e| hook_error(*hook, e))?;
        if let Some(update) = update {
            tracing::debug!(hook = hook.name(), keys = update.len(), "pre-hook updated params");
            request.params.extend(update);
        }
    }

    let mut overridden = None;
    for hook in hooks {
        if let Some(result) = hook
            .override_simulation(&request)
            .map_err(|e| hook_error(*hook, e))?
        {
            tracing::debug!(
                hook = hook.name(),
                operation = %request.operation,
                "simulation overridden"
            );
            overridden = Some(result);
            break;
        }
    }

    let mut result = match overridden {
        Some(result) => result,
        None => match route {
            Route::Builtin => {
                let simulation = Simulation::from_params(&request.operation, &request.params)?
                    .ok_or_else(|| SimError::UnsupportedOperation(request.operation.clone()))?;
                let ctx = SimContext::new(reader, options);
                simulation.run(&ctx)?
            }
            Route::Extension(ext) => {
                tracing::debug!(
                    extension = ext.name(),
                    operation = %request.operation,
                    "routing to extension"
                );
                ext.simulate(&request.params)
                    .map_err(|e| SimError::Extension { source: e.into() })?
            }
        },
    };

    for hook in hooks {
        result = hook
            .post_simulate(&request, result)
            .map_err(|e| hook_error(*hook, e))?;
    }

    Ok(result)
}

fn hook_error(hook: &dyn SimulationHook, err: anyhow::Error) -> SimError {
    tracing::warn!(hook = hook.name(), error = %err, "hook failed");
    SimError::Hook {
        hook: hook.name().to_string(),
        source: err.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::CommitGraph;
    use crate::core::models::{CommitInfo, OperationType};
    use crate::core::types::{BranchName, Oid};
    use crate::git::{GitError, HeadState, TreeDelta};
    use serde_json::{json, Map, Value};
    use std::cell::RefCell;

    /// A reader that must never be touched.
    struct Untouchable;

    impl ObjectReader for Untouchable {
        fn resolve_name(&self, name: &str) -> Result<Oid, GitError> {
            panic!("resolve_name({name}) called")
        }
        fn commit(&self, oid: &Oid) -> Result<CommitInfo, GitError> {
            panic!("commit({oid}) called")
        }
        fn walk(&self, _: &[Oid], _: &[Oid]) -> Result<Vec<CommitInfo>, GitError> {
            panic!("walk called")
        }
        fn tree_deltas(&self, _: Option<&Oid>, _: &Oid) -> Result<Vec<TreeDelta>, GitError> {
            panic!("tree_deltas called")
        }
        fn head(&self) -> Result<HeadState, GitError> {
            panic!("head called")
        }
        fn branches(&self) -> Result<Vec<(BranchName, Oid)>, GitError> {
            panic!("branches called")
        }
        fn remote_tips(&self) -> Result<Vec<(String, Oid)>, GitError> {
            panic!("remote_tips called")
        }
        fn dirty_paths(&self) -> Result<Vec<String>, GitError> {
            panic!("dirty_paths called")
        }
    }

    fn canned(operation: OperationType) -> SimulationResult {
        SimulationResult::new(operation, CommitGraph::new())
    }

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[derive(Default)]
    struct Recorder {
        seen: RefCell<Vec<Map<String, Value>>>,
    }

    impl SimulationHook for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }
        fn override_simulation(
            &self,
            request: &OperationRequest,
        ) -> anyhow::Result<Option<SimulationResult>> {
            self.seen.borrow_mut().push(request.params.clone());
            Ok(Some(canned(OperationType::Rebase)))
        }
    }

    struct SetParams(Value);

    impl SimulationHook for SetParams {
        fn pre_simulate(&self, _: &OperationRequest) -> anyhow::Result<Option<Map<String, Value>>> {
            Ok(Some(map(self.0.clone())))
        }
    }

    struct Warn(&'static str);

    impl SimulationHook for Warn {
        fn post_simulate(
            &self,
            _: &OperationRequest,
            mut result: SimulationResult,
        ) -> anyhow::Result<SimulationResult> {
            result.warnings.push(self.0.to_string());
            Ok(result)
        }
    }

    struct Failing;

    impl SimulationHook for Failing {
        fn name(&self) -> &str {
            "failing"
        }
        fn pre_simulate(&self, _: &OperationRequest) -> anyhow::Result<Option<Map<String, Value>>> {
            anyhow::bail!("boom")
        }
    }

    struct Bisect;

    impl SimulatorExtension for Bisect {
        fn supports(&self, operation: &str) -> bool {
            operation == "bisect"
        }
        fn simulate(&self, params: &Map<String, Value>) -> anyhow::Result<SimulationResult> {
            let mut result = canned(OperationType::Extension("bisect".into()));
            result.warnings.push(format!("{} params", params.len()));
            Ok(result)
        }
    }

    mod routing {
        use super::*;

        #[test]
        fn unknown_operation_is_unsupported() {
            let err = dispatch(
                &Untouchable,
                &EngineOptions::default(),
                &OperationRequest::new("bisect"),
                &[],
                &[],
            )
            .unwrap_err();
            assert!(matches!(err, SimError::UnsupportedOperation(op) if op == "bisect"));
        }

        #[test]
        fn extension_handles_new_operation() {
            let request = OperationRequest::new("Bisect").with_param("good", "v1.0");
            let result = dispatch(
                &Untouchable,
                &EngineOptions::default(),
                &request,
                &[],
                &[&Bisect],
            )
            .unwrap();
            assert_eq!(result.operation, OperationType::Extension("bisect".into()));
            assert_eq!(result.warnings, vec!["1 params".to_string()]);
        }

        #[test]
        fn bad_builtin_params() {
            let err = dispatch(
                &Untouchable,
                &EngineOptions::default(),
                &OperationRequest::new("merge"),
                &[],
                &[],
            )
            .unwrap_err();
            assert!(matches!(err, SimError::InvalidParams { .. }));
        }
    }

    mod hooks {
        use super::*;

        #[test]
        fn override_short_circuits_and_post_hooks_run() {
            let recorder = Recorder::default();
            let first = Warn("first");
            let second = Warn("second");
            let request = OperationRequest::new("rebase").with_param("onto", "main");

            let result = dispatch(
                &Untouchable,
                &EngineOptions::default(),
                &request,
                &[&recorder, &first, &second],
                &[],
            )
            .unwrap();

            assert_eq!(recorder.seen.borrow().len(), 1);
            assert_eq!(result.warnings, vec!["first".to_string(), "second".to_string()]);
        }

        #[test]
        fn pre_hooks_merge_last_writer_wins() {
            let a = SetParams(json!({"onto": "develop", "extra": 1}));
            let b = SetParams(json!({"onto": "release"}));
            let recorder = Recorder::default();
            let request = OperationRequest::new("rebase").with_param("onto", "main");

            dispatch(
                &Untouchable,
                &EngineOptions::default(),
                &request,
                &[&a, &b, &recorder],
                &[],
            )
            .unwrap();

            let seen = recorder.seen.borrow();
            assert_eq!(Value::Object(seen[0].clone()), json!({"onto": "release", "extra": 1}));
        }

        #[test]
        fn hook_failure_names_the_hook() {
            let err = dispatch(
                &Untouchable,
                &EngineOptions::default(),
                &OperationRequest::new("rebase").with_param("onto", "main"),
                &[&Failing],
                &[],
            )
            .unwrap_err();
            match err {
                SimError::Hook { hook, source } => {
                    assert_eq!(hook, "failing");
                    assert_eq!(source.to_string(), "boom");
                }
                other => panic!("expected hook error, got {other:?}"),
            }
        }
    }
}
