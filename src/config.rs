//! Configuration with layered resolution using figment.
//!
//! Resolution order (highest priority last):
//! 1. User config: `~/.config/quarry/config.toml` (XDG) or platform config dir
//! 2. Project config: `.quarry.toml`
//! 3. Environment variables: `QUARRY_*`, nested keys separated by `__`
//!    (e.g. `QUARRY_REPOSITORY__AUTO_VALIDATION=true`)
//!
//! Every setting has a default, so no file is required.
//!
//! ```toml
//! [repository]
//! auto_validation = true
//! default_page_size = 25
//!
//! [log]
//! level = "debug"
//!
//! [store]
//! fixtures = "fixtures/dev.json"
//! ```

use std::ops::Deref;
use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

use crate::criteria::DEFAULT_PAGE_SIZE;

/// Boxed wrapper for figment::Error to reduce Result size on the stack.
#[derive(Debug)]
pub struct ConfigError(Box<figment::Error>);

impl Deref for ConfigError {
    type Target = figment::Error;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl ConfigError {
    /// Unwraps the underlying figment error.
    pub fn into_inner(self) -> figment::Error {
        *self.0
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self(Box::new(err))
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub repository: RepositoryConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// Defaults applied to repositories built from configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryConfig {
    /// Validate payloads automatically on create and update.
    #[serde(default)]
    pub auto_validation: bool,
    /// Page size used when a paginated read gives none.
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            auto_validation: false,
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

/// Logging configuration for the binary.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// `tracing-subscriber` env-filter directive (e.g. "info", "quarry=debug").
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// In-memory store settings used by the CLI.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    /// JSON fixture file seeding the memory store.
    pub fixtures: Option<PathBuf>,
}

impl Config {
    /// Load config with layered resolution (user → project → env).
    pub fn load() -> Result<Self, ConfigError> {
        Self::figment().extract().map_err(ConfigError::from)
    }

    /// The layered figment `load` extracts from.
    pub fn figment() -> Figment {
        Figment::new()
            // Layer 1: User config (lowest priority)
            .merge(Toml::file(Self::user_config_path()))
            // Layer 2: Project config
            .merge(Toml::file(".quarry.toml"))
            // Layer 3: Environment variables (highest priority)
            .merge(Env::prefixed("QUARRY_").split("__"))
    }

    /// User config path: ~/.config/quarry/config.toml (XDG) or platform config dir.
    fn user_config_path() -> PathBuf {
        // Prefer XDG config location (~/.config) on all platforms
        if let Some(home) = dirs::home_dir() {
            let xdg_path = home.join(".config").join("quarry").join("config.toml");
            if xdg_path.exists() {
                return xdg_path;
            }
        }
        // Fall back to platform-specific config dir
        dirs::config_dir()
            .map(|p| p.join("quarry").join("config.toml"))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults_without_files() {
        Jail::expect_with(|_jail| {
            let config = Config::load().map_err(ConfigError::into_inner)?;
            assert!(!config.repository.auto_validation);
            assert_eq!(config.repository.default_page_size, 10);
            assert_eq!(config.log.level, "info");
            assert!(config.store.fixtures.is_none());
            Ok(())
        });
    }

    #[test]
    fn test_project_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                ".quarry.toml",
                r#"
                [repository]
                auto_validation = true
                default_page_size = 25

                [store]
                fixtures = "fixtures.json"
                "#,
            )?;

            let config = Config::load().map_err(ConfigError::into_inner)?;
            assert!(config.repository.auto_validation);
            assert_eq!(config.repository.default_page_size, 25);
            assert_eq!(config.store.fixtures, Some(PathBuf::from("fixtures.json")));
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_project_file() {
        Jail::expect_with(|jail| {
            jail.create_file(".quarry.toml", "[log]\nlevel = \"warn\"\n")?;
            jail.set_env("QUARRY_LOG__LEVEL", "debug");
            jail.set_env("QUARRY_REPOSITORY__DEFAULT_PAGE_SIZE", "50");

            let config = Config::load().map_err(ConfigError::into_inner)?;
            assert_eq!(config.log.level, "debug");
            assert_eq!(config.repository.default_page_size, 50);
            Ok(())
        });
    }

    #[test]
    fn test_invalid_value_is_config_error() {
        Jail::expect_with(|jail| {
            jail.create_file(".quarry.toml", "[repository]\ndefault_page_size = \"many\"\n")?;
            let err = Config::load().unwrap_err();
            assert!(err.to_string().contains("default_page_size"));
            Ok(())
        });
    }
}
