//! git
//!
//! Read-only access to repository objects.
//!
//! # Architecture
//!
//! This module is the **only doorway** to Git. The engine depends on the
//! [`ObjectReader`] trait, never on `git2`; [`Git`] is the libgit2-backed
//! implementation. No other module should import `git2`.
//!
//! # Responsibilities
//!
//! - Repository discovery and opening
//! - Name and revision resolution (`main`, `abc1234`, `HEAD~2`, `feature^2`)
//! - Commit reads and topological ancestry walks
//! - Tree-to-tree deltas with blob contents
//! - Branch, remote-tracking and worktree status queries
//!
//! # Invariants
//!
//! - Nothing in this module writes to the repository
//! - All operations return strong types (Oid, BranchName)
//!
//! # Example
//!
//! ```ignore
//! use git_sim::git::{Git, ObjectReader};
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! let base = git.merge_base(&git.resolve("main")?.oid, &git.resolve("feature")?.oid)?;
//! ```

mod interface;
mod reader;
pub mod revspec;

pub use interface::{Git, GitError};
pub use reader::{HeadState, ObjectReader, TreeDelta};
