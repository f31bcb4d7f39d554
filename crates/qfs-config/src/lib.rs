//! # qfs-config
//!
//! Configuration for the queryfs front end.
//!
//! Loads configuration from:
//! 1. `~/.queryfs/config.toml` (global)
//! 2. `.queryfs.toml` (project-local, overrides global)
//! 3. `QUERYFS_*` environment variables (highest priority)
//!
//! The filesystem core itself consumes only a repository root path; this
//! layer exists for the process surface around it.

pub mod logging;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub repository: RepositoryConfig,
    pub logging: LoggingConfig,
}

/// Repository location.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Repository root directory; flags and arguments override this.
    pub root: Option<PathBuf>,
}

/// Logging verbosity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load config from the standard locations (project file relative to the
    /// current directory).
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new("."))
    }

    /// Load config for a specific working directory.
    /// Resolution order: global file, then project file, then env vars.
    pub fn load_from(working_dir: &Path) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                debug!(path = %global_path.display(), "loading global config");
                let contents = std::fs::read_to_string(&global_path)?;
                config = toml::from_str(&contents)?;
            }
        }

        let project_path = working_dir.join(".queryfs.toml");
        if project_path.exists() {
            debug!(path = %project_path.display(), "loading project config");
            let contents = std::fs::read_to_string(&project_path)?;
            let project: Config = toml::from_str(&contents)?;
            config.merge(project);
        }

        config.apply_env_overrides();
        Ok(config)
    }

    /// Global config path: `~/.queryfs/config.toml`.
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".queryfs/config.toml"))
    }

    /// Merge another config over this one; non-default values win.
    fn merge(&mut self, other: Config) {
        if other.repository.root.is_some() {
            self.repository.root = other.repository.root;
        }
        if other.logging != LoggingConfig::default() {
            self.logging = other.logging;
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(root) = std::env::var("QUERYFS_REPOSITORY") {
            self.repository.root = Some(PathBuf::from(root));
        }
        if let Ok(level) = std::env::var("QUERYFS_LOG") {
            self.logging.level = level;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Serialize env-var tests so parallel runs don't race
    static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    #[test]
    fn defaults_are_sensible() {
        let config = Config::default();
        assert!(config.repository.root.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
[repository]
root = "/srv/queryfs"
"#,
        )
        .unwrap();

        assert_eq!(config.repository.root, Some(PathBuf::from("/srv/queryfs")));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn toml_roundtrip_preserves_values() {
        let mut original = Config::default();
        original.repository.root = Some(PathBuf::from("/data/repo"));
        original.logging.level = "debug".to_string();

        let text = toml::to_string(&original).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();

        assert_eq!(parsed.repository.root, original.repository.root);
        assert_eq!(parsed.logging.level, original.logging.level);
    }

    #[test]
    fn project_file_overrides_global_defaults() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(".queryfs.toml"),
            "[logging]\nlevel = \"trace\"\n",
        )
        .unwrap();

        let _guard = ENV_LOCK.lock().unwrap();
        std::env::remove_var("QUERYFS_REPOSITORY");
        std::env::remove_var("QUERYFS_LOG");

        let config = Config::load_from(temp.path()).unwrap();
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn env_overrides_win() {
        let _guard = ENV_LOCK.lock().unwrap();
        let mut config = Config::default();

        std::env::set_var("QUERYFS_REPOSITORY", "/env/repo");
        std::env::set_var("QUERYFS_LOG", "warn");
        config.apply_env_overrides();
        std::env::remove_var("QUERYFS_REPOSITORY");
        std::env::remove_var("QUERYFS_LOG");

        assert_eq!(config.repository.root, Some(PathBuf::from("/env/repo")));
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let result: Result<Config, _> = toml::from_str("not { valid toml");
        assert!(result.is_err());
    }
}
