//! core::types
//!
//! Strong types for the identifiers the simulation engine passes around.
//!
//! # Types
//!
//! - [`Oid`] - Full commit/tree/blob identifier (hex SHA)
//! - [`BranchName`] - Validated local branch name
//!
//! Values are validated on construction, so an `Oid` in a graph is always a
//! full lowercase hash and never an abbreviation.
//!
//! # Examples
//!
//! ```
//! use git_sim::core::types::{BranchName, Oid};
//!
//! let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
//! assert_eq!(oid.short(7), "abc123d");
//!
//! assert!(BranchName::new("feature/login").is_ok());
//! assert!(BranchName::new("bad..name").is_err());
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid object id: {0}")]
    InvalidOid(String),
}

/// A full Git object identifier (SHA-1 or SHA-256), normalized to lowercase.
///
/// Ordering is lexicographic on the hex string, which gives graphs keyed by
/// `Oid` a deterministic iteration order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Length of a SHA-1 hex id. Synthesized ids use this width too.
    pub const SHA1_HEX_LEN: usize = 40;

    /// Minimum number of hex characters accepted as an abbreviated id.
    pub const MIN_ABBREV_LEN: usize = 7;

    /// Create a new validated object id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` unless the input is 40 or 64 hex chars.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        if oid.len() != Self::SHA1_HEX_LEN && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !is_hex(&oid) {
            return Err(TypeError::InvalidOid(
                "object id must be hexadecimal".into(),
            ));
        }
        Ok(Self(oid))
    }

    /// Derive a projected commit id for a node that only exists in a
    /// simulated after-graph.
    ///
    /// The id is the first 40 hex characters of
    /// `sha256("git-sim\0{tag}\0{parent}\0{original}\0{position}")`.
    /// The derivation is pure: the same inputs always give the same id, and
    /// the domain prefix keeps it out of the space of real object hashes
    /// (which are computed over a `commit <len>\0` header instead).
    ///
    /// # Example
    ///
    /// ```
    /// use git_sim::core::types::Oid;
    ///
    /// let parent = Oid::new("1111111111111111111111111111111111111111").unwrap();
    /// let original = Oid::new("2222222222222222222222222222222222222222").unwrap();
    ///
    /// let a = Oid::synthesize("rebase", &parent, &original, 0);
    /// let b = Oid::synthesize("rebase", &parent, &original, 0);
    /// assert_eq!(a, b);
    /// assert_ne!(a, Oid::synthesize("rebase", &parent, &original, 1));
    /// ```
    pub fn synthesize(tag: &str, parent: &Oid, original: &Oid, position: usize) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"git-sim\0");
        hasher.update(tag.as_bytes());
        hasher.update(b"\0");
        hasher.update(parent.as_str().as_bytes());
        hasher.update(b"\0");
        hasher.update(original.as_str().as_bytes());
        hasher.update(b"\0");
        hasher.update(position.to_string().as_bytes());

        let mut digest = hex::encode(hasher.finalize());
        digest.truncate(Self::SHA1_HEX_LEN);
        Self(digest)
    }

    /// Check whether `candidate` is shaped like an abbreviated id
    /// (at least [`Oid::MIN_ABBREV_LEN`] hex characters, at most a full id).
    pub fn is_abbreviation(candidate: &str) -> bool {
        candidate.len() >= Self::MIN_ABBREV_LEN && candidate.len() <= 64 && is_hex(candidate)
    }

    /// Get an abbreviated form of the id.
    ///
    /// Returns the full id if `len` exceeds its length.
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }

    /// Check whether this id starts with the given (case-insensitive) prefix.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.0.starts_with(&prefix.to_ascii_lowercase())
    }

    /// Get the object id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_hex(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_hexdigit())
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl AsRef<str> for Oid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated local branch name.
///
/// Follows the subset of `git check-ref-format` rules that matter for names
/// under `refs/heads/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if let Some(problem) = Self::problem(&name) {
            return Err(TypeError::InvalidBranchName(format!("'{name}' {problem}")));
        }
        Ok(Self(name))
    }

    /// Describe the first rule `name` breaks, if any.
    fn problem(name: &str) -> Option<&'static str> {
        const FORBIDDEN_SEQUENCES: [(&str, &str); 3] = [
            ("..", "contains '..'"),
            ("@{", "contains '@{'"),
            ("//", "contains '//'"),
        ];
        const FORBIDDEN_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];

        if name.is_empty() {
            return Some("is empty");
        }
        if name == "@" {
            return Some("is reserved");
        }
        if name.starts_with('-') {
            return Some("starts with '-'");
        }
        if name.ends_with('/') {
            return Some("ends with '/'");
        }
        if let Some((_, why)) = FORBIDDEN_SEQUENCES
            .iter()
            .find(|(needle, _)| name.contains(needle))
        {
            return Some(why);
        }
        if name
            .chars()
            .any(|c| FORBIDDEN_CHARS.contains(&c) || c.is_ascii_control())
        {
            return Some("contains a forbidden character");
        }
        if name
            .split('/')
            .any(|part| part.starts_with('.') || part.ends_with(".lock"))
        {
            return Some("has a component starting with '.' or ending with '.lock'");
        }
        None
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
