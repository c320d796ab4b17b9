//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Global Config
//!
//! Located at (in order of precedence):
//! 1. `$GIT_SIM_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/git-sim/config.toml`
//! 3. `~/.git-sim/config.toml`
//!
//! # Repo Config
//!
//! Located at `.git/git-sim/config.toml` (canonical).
//!
//! # Validation
//!
//! Values are validated after parsing (e.g. the graph bound must be
//! positive, shared branches must be valid branch names).

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::BranchName;

/// Global configuration (user scope).
///
/// # Example
///
/// ```toml
/// max_graph_commits = 100
/// stop_on_first_conflict = false
/// adjacency_threshold = 3
/// detect_pushed = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Upper bound on commits collected into one graph snapshot
    pub max_graph_commits: Option<usize>,

    /// Halt replay at the first certain conflict
    pub stop_on_first_conflict: Option<bool>,

    /// Largest line gap still reported as a likely conflict
    pub adjacency_threshold: Option<usize>,

    /// Treat branches with commits on a remote-tracking ref as shared
    pub detect_pushed: Option<bool>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_graph_bound(self.max_graph_commits)
    }
}

/// Repository configuration.
///
/// Every key of [`GlobalConfig`] may be overridden here.
///
/// # Example
///
/// ```toml
/// max_graph_commits = 30
/// shared_branches = ["main", "release/1.x"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RepoConfig {
    pub max_graph_commits: Option<usize>,

    pub stop_on_first_conflict: Option<bool>,

    pub adjacency_threshold: Option<usize>,

    pub detect_pushed: Option<bool>,

    /// Branches always treated as shared with collaborators
    pub shared_branches: Option<Vec<String>>,
}

impl RepoConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_graph_bound(self.max_graph_commits)?;

        for branch in self.shared_branches.iter().flatten() {
            BranchName::new(branch.as_str()).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid shared branch name: {}", e))
            })?;
        }

        Ok(())
    }
}

fn validate_graph_bound(value: Option<usize>) -> Result<(), ConfigError> {
    if value == Some(0) {
        return Err(ConfigError::InvalidValue(
            "max_graph_commits must be at least 1".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    mod global_config {
        use super::*;

        #[test]
        fn defaults() {
            let config = GlobalConfig::default();
            assert!(config.max_graph_commits.is_none());
            assert!(config.stop_on_first_conflict.is_none());
            assert!(config.validate().is_ok());
        }

        #[test]
        fn zero_graph_bound_rejected() {
            let config = GlobalConfig {
                max_graph_commits: Some(0),
                ..Default::default()
            };
            assert!(config.validate().is_err());
        }

        #[test]
        fn roundtrip() {
            let config = GlobalConfig {
                max_graph_commits: Some(80),
                stop_on_first_conflict: Some(true),
                adjacency_threshold: Some(5),
                detect_pushed: Some(false),
            };

            let toml = toml::to_string_pretty(&config).unwrap();
            let parsed: GlobalConfig = toml::from_str(&toml).unwrap();
            assert_eq!(config, parsed);
        }
    }

    mod repo_config {
        use super::*;

        #[test]
        fn valid_shared_branches() {
            let config = RepoConfig {
                shared_branches: Some(vec!["main".into(), "release/1.x".into()]),
                ..Default::default()
            };
            assert!(config.validate().is_ok());
        }

        #[test]
        fn invalid_shared_branch() {
            let config = RepoConfig {
                shared_branches: Some(vec!["bad..name".into()]),
                ..Default::default()
            };
            assert!(config.validate().is_err());
        }

        #[test]
        fn reject_unknown_fields() {
            let toml = r#"
                max_graph_commits = 10
                unknown_field = true
            "#;

            let result: Result<RepoConfig, _> = toml::from_str(toml);
            assert!(result.is_err());
        }

        #[test]
        fn global_file_cannot_carry_shared_branches() {
            let result: Result<GlobalConfig, _> = toml::from_str("shared_branches = [\"main\"]");
            assert!(result.is_err());
        }
    }
}
