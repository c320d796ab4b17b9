//! analysis
//!
//! Pure analyses the simulators are built from.
//!
//! # Modules
//!
//! - [`diff`] - Line-level hunks, patch replay and patch ids
//! - [`conflict`] - Tiered conflict prediction between two change sets
//! - [`safety`] - Danger rating and recovery advice
//! - [`graph_builder`] - Bounded commit graph snapshots
//!
//! Only [`graph_builder`] touches a repository, and only through
//! [`ObjectReader`](crate::git::ObjectReader).

pub mod conflict;
pub mod diff;
pub mod graph_builder;
pub mod safety;
