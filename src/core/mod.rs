//! core
//!
//! Domain types and the data model shared by every layer.
//!
//! # Modules
//!
//! - [`types`] - Strong types: Oid, BranchName
//! - [`models`] - Commits, hunks, conflicts, safety ratings, results
//! - [`graph`] - Commit DAG snapshots and their integrity checks
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at construction
//! - Everything here serializes, so results can cross process boundaries
//! - No repository access

pub mod config;
pub mod graph;
pub mod models;
pub mod types;
