//! engine::hooks
//!
//! Extension points around a simulation.
//!
//! A [`SimulationHook`] can adjust a request's params before simulation,
//! replace the simulation outright, or transform its result afterwards. A
//! [`SimulatorExtension`] adds an operation the built-in set does not cover.
//!
//! Hooks are passed to the dispatcher as an explicit ordered slice for each
//! call; there is no global registry. All methods have pass-through defaults,
//! so a hook only implements the stages it cares about.
//!
//! Hook code reports failures with `anyhow`; the dispatcher wraps them in
//! [`SimError::Hook`](super::SimError::Hook) with the hook's name.

use super::request::OperationRequest;
use crate::core::models::SimulationResult;
use serde_json::{Map, Value};

/// Callbacks around one simulation.
pub trait SimulationHook {
    /// Name used in error reports and logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Return params to merge into the request; keys given here overwrite
    /// earlier values.
    fn pre_simulate(
        &self,
        _request: &OperationRequest,
    ) -> anyhow::Result<Option<Map<String, Value>>> {
        Ok(None)
    }

    /// Return a result to use instead of running the simulator.
    fn override_simulation(
        &self,
        _request: &OperationRequest,
    ) -> anyhow::Result<Option<SimulationResult>> {
        Ok(None)
    }

    /// Transform the running result.
    fn post_simulate(
        &self,
        _request: &OperationRequest,
        result: SimulationResult,
    ) -> anyhow::Result<SimulationResult> {
        Ok(result)
    }
}

/// A simulator for an operation outside the built-in set.
pub trait SimulatorExtension {
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Whether this extension handles `operation` (already normalised to
    /// lower case).
    fn supports(&self, operation: &str) -> bool;

    fn simulate(&self, params: &Map<String, Value>) -> anyhow::Result<SimulationResult>;
}
