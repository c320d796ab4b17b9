//! git-sim - preview history-altering git operations before running them
//!
//! Given a repository, git-sim predicts what a rebase, merge, reset or
//! cherry-pick would do: the commit graph before and after, the conflicts
//! it would likely hit (with a confidence tier for each), and how dangerous
//! the operation is to perform. The repository is never modified.
//!
//! # Architecture
//!
//! The codebase is layered, leaf first:
//!
//! - [`core`] - Domain types, data model, commit graph, configuration
//! - [`git`] - Single read-only interface to the repository
//! - [`analysis`] - Diff, conflict, safety and graph-building analyses
//! - [`engine`] - Simulators, hooks and the dispatcher
//!
//! # Correctness Invariants
//!
//! 1. No operation writes to the repository
//! 2. Every built graph is acyclic with no dangling edges
//! 3. Projected commits carry synthesized hashes that never collide with
//!    real objects
//! 4. Conflicts and partial replays are reported as data, never as errors
//!
//! # Example
//!
//! ```ignore
//! use git_sim::core::config::Config;
//! use git_sim::engine::{dispatch::dispatch, OperationRequest};
//! use git_sim::git::Git;
//!
//! let git = Git::open(Path::new("."))?;
//! let config = Config::load(Some(git.work_dir()?))?.config;
//! let request = OperationRequest::parse("merge feature --no-ff")?;
//! let result = dispatch(&git, &config.engine_options(), &request, &[], &[])?;
//! ```

pub mod analysis;
pub mod core;
pub mod engine;
pub mod git;
