//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! git-sim has two configuration scopes:
//! - **Global**: User-level defaults
//! - **Repo**: Repository-level overrides
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Repo config file
//! 4. Explicit [`EngineOptions`] built by the caller (not handled here)
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$GIT_SIM_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/git-sim/config.toml`
//! 3. `~/.git-sim/config.toml`
//!
//! # Repo Config Locations
//!
//! Searched in order:
//! 1. `.git/git-sim/config.toml` (canonical)
//! 2. `.git-sim.toml` in the worktree root (compatibility, warns)
//!
//! # Example
//!
//! ```no_run
//! use git_sim::core::config::Config;
//! use std::path::Path;
//!
//! let result = Config::load(Some(Path::new("/path/to/repo"))).unwrap();
//! let options = result.config.engine_options();
//! println!("graph bound: {}", options.max_graph_commits);
//! ```

pub mod schema;

pub use schema::{GlobalConfig, RepoConfig};

use crate::engine::EngineOptions;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Warnings generated during config loading.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    /// The warning message.
    pub message: String,
    /// The path that triggered the warning.
    pub path: PathBuf,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
    /// Any warnings generated during loading.
    pub warnings: Vec<ConfigWarning>,
}

/// Merged configuration from all sources.
///
/// Accessors apply precedence automatically: repo config overrides global
/// config, which overrides built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: GlobalConfig,
    /// Repository configuration (if in a repo)
    pub repo: Option<RepoConfig>,
    global_path: Option<PathBuf>,
    repo_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// If `repo_path` is provided, also loads repo-specific config.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed or hold
    /// invalid values. Missing config files are not an error.
    pub fn load(repo_path: Option<&Path>) -> Result<ConfigLoadResult, ConfigError> {
        Self::load_from(&Self::global_candidates(), repo_path)
    }

    /// Load configuration with an explicit list of global config locations.
    ///
    /// The first candidate that exists is read; the environment is not
    /// consulted.
    pub fn load_from(
        global_candidates: &[PathBuf],
        repo_path: Option<&Path>,
    ) -> Result<ConfigLoadResult, ConfigError> {
        let mut warnings = Vec::new();

        let (global, global_path) = match global_candidates.iter().find(|path| path.exists()) {
            Some(path) => (read_toml::<GlobalConfig>(path)?, Some(path.clone())),
            None => (GlobalConfig::default(), None),
        };

        let (repo, repo_path_found) = match repo_path {
            Some(path) => Self::load_repo(path, &mut warnings)?,
            None => (None, None),
        };

        global.validate()?;
        if let Some(ref r) = repo {
            r.validate()?;
        }

        tracing::debug!(
            global = ?global_path,
            repo = ?repo_path_found,
            "loaded configuration"
        );

        Ok(ConfigLoadResult {
            config: Config {
                global,
                repo,
                global_path,
                repo_path: repo_path_found,
            },
            warnings,
        })
    }

    /// Global config locations, most specific first.
    fn global_candidates() -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        if let Ok(path) = std::env::var("GIT_SIM_CONFIG") {
            candidates.push(PathBuf::from(path));
        }
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            candidates.push(PathBuf::from(xdg_home).join("git-sim/config.toml"));
        }
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join(".git-sim/config.toml"));
        }
        candidates
    }

    /// Load repository configuration from standard locations.
    fn load_repo(
        repo_path: &Path,
        warnings: &mut Vec<ConfigWarning>,
    ) -> Result<(Option<RepoConfig>, Option<PathBuf>), ConfigError> {
        let canonical = Self::repo_config_path(repo_path);
        if canonical.exists() {
            let config = read_toml(&canonical)?;
            return Ok((Some(config), Some(canonical)));
        }

        let compat = repo_path.join(".git-sim.toml");
        if compat.exists() {
            warnings.push(ConfigWarning {
                message: format!(
                    "Using deprecated config location. Please move to '{}'",
                    canonical.display()
                ),
                path: compat.clone(),
            });
            let config = read_toml(&compat)?;
            return Ok((Some(config), Some(compat)));
        }

        Ok((None, None))
    }

    /// Get the canonical path for repo config.
    ///
    /// Returns `.git/git-sim/config.toml` relative to the given repo path.
    pub fn repo_config_path(repo_path: &Path) -> PathBuf {
        repo_path.join(".git/git-sim/config.toml")
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    /// Commit bound for graph snapshots. Defaults to 50.
    pub fn max_graph_commits(&self) -> usize {
        self.repo
            .as_ref()
            .and_then(|r| r.max_graph_commits)
            .or(self.global.max_graph_commits)
            .unwrap_or(EngineOptions::DEFAULT_MAX_GRAPH_COMMITS)
    }

    /// Defaults to `false`: keep simulating after a certain conflict.
    pub fn stop_on_first_conflict(&self) -> bool {
        self.repo
            .as_ref()
            .and_then(|r| r.stop_on_first_conflict)
            .or(self.global.stop_on_first_conflict)
            .unwrap_or(false)
    }

    /// Defaults to 3 lines.
    pub fn adjacency_threshold(&self) -> usize {
        self.repo
            .as_ref()
            .and_then(|r| r.adjacency_threshold)
            .or(self.global.adjacency_threshold)
            .unwrap_or(EngineOptions::DEFAULT_ADJACENCY_THRESHOLD)
    }

    /// Defaults to `true`.
    pub fn detect_pushed(&self) -> bool {
        self.repo
            .as_ref()
            .and_then(|r| r.detect_pushed)
            .or(self.global.detect_pushed)
            .unwrap_or(true)
    }

    /// Branches configured as shared. Empty if not configured.
    pub fn shared_branches(&self) -> &[String] {
        self.repo
            .as_ref()
            .and_then(|r| r.shared_branches.as_deref())
            .unwrap_or(&[])
    }

    /// Project the merged configuration into engine options.
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            max_graph_commits: self.max_graph_commits(),
            stop_on_first_conflict: self.stop_on_first_conflict(),
            adjacency_threshold: self.adjacency_threshold(),
            detect_pushed: self.detect_pushed(),
            shared_branches: self.shared_branches().iter().cloned().collect(),
        }
    }

    /// Get the path to the loaded global config file.
    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    /// Get the path to the loaded repo config file.
    pub fn repo_config_loaded_from(&self) -> Option<&Path> {
        self.repo_path.as_deref()
    }
}

fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
