//! Configuration loading and typed config structures.
//!
//! The configuration lives in `simmer-config.yaml` next to the binary's
//! working directory. Every section and field has a default, so an empty
//! file (or no file at all) yields a working setup that matches the
//! original game's constants: 30 energy, one point per 5 seconds.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value is out of its allowed range.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// What is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration. Mirrors the structure of `simmer-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SimmerConfig {
    /// Where and under which keys state is persisted.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Energy pool parameters.
    #[serde(default)]
    pub energy: EnergyConfig,

    /// Session behavior and host polling.
    #[serde(default)]
    pub session: SessionConfig,

    /// Static data file locations.
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimmerConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment overrides are applied from the process environment:
    /// - `SIMMER_DATA_DIR` overrides `storage.data_dir`
    /// - `SIMMER_LOG` overrides `logging.level`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value fails validation.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, applying environment
    /// overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value fails validation.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Self::parse_with_env(yaml, |name| std::env::var(name).ok())
    }

    /// Parse configuration from a YAML string, resolving overrides through
    /// `lookup` instead of the process environment.
    ///
    /// # Errors
    ///
    /// Same as [`SimmerConfig::parse`].
    pub fn parse_with_env(
        yaml: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        // A blank document means all defaults.
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_env_overrides(lookup);
        config.validate()?;
        Ok(config)
    }

    /// Override selected values with environment variables when set.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup("SIMMER_DATA_DIR").filter(|v| !v.is_empty()) {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(level) = lookup("SIMMER_LOG").filter(|v| !v.is_empty()) {
            self.logging.level = level;
        }
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| {
            Err(ConfigError::Invalid {
                reason: reason.to_owned(),
            })
        };
        if self.energy.max == 0 {
            return invalid("energy.max must be at least 1");
        }
        if self.energy.regen_interval_secs == 0 {
            return invalid("energy.regen_interval_secs must be at least 1");
        }
        if self.session.poll_interval_ms == 0 {
            return invalid("session.poll_interval_ms must be at least 1");
        }
        for (field, key) in [
            ("storage.session_key", &self.storage.session_key),
            ("storage.inventory_key", &self.storage.inventory_key),
            ("storage.energy_key", &self.storage.energy_key),
        ] {
            if key.is_empty() {
                return Err(ConfigError::Invalid {
                    reason: format!("{field} must not be empty"),
                });
            }
        }
        Ok(())
    }
}

/// Persistence locations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the JSON save files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Key of the cooking session record.
    #[serde(default = "default_session_key")]
    pub session_key: String,

    /// Key of the inventory record.
    #[serde(default = "default_inventory_key")]
    pub inventory_key: String,

    /// Key of the energy record.
    #[serde(default = "default_energy_key")]
    pub energy_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            session_key: default_session_key(),
            inventory_key: default_inventory_key(),
            energy_key: default_energy_key(),
        }
    }
}

/// Energy pool parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct EnergyConfig {
    /// Maximum energy.
    #[serde(default = "default_energy_max")]
    pub max: u32,

    /// Seconds per regenerated point.
    #[serde(default = "default_regen_interval_secs")]
    pub regen_interval_secs: u32,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            max: default_energy_max(),
            regen_interval_secs: default_regen_interval_secs(),
        }
    }
}

/// How time spent paused affects the remaining cooking time on resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PausePolicy {
    /// Paused time is added back, capped at the recipe duration.
    #[default]
    Penalize,
    /// The timer resumes exactly where it stopped.
    Freeze,
}

/// Session behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SessionConfig {
    /// Resume arithmetic.
    #[serde(default)]
    pub pause_policy: PausePolicy,

    /// Host poll period in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pause_policy: PausePolicy::default(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// Static data file locations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CatalogConfig {
    /// Recipe catalog JSON.
    #[serde(default = "default_recipes_path")]
    pub recipes_path: PathBuf,

    /// Item catalog JSON.
    #[serde(default = "default_items_path")]
    pub items_path: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            recipes_path: default_recipes_path(),
            items_path: default_items_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error) or directive list.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("save")
}

fn default_session_key() -> String {
    "player_cooking".to_owned()
}

fn default_inventory_key() -> String {
    "player_inventory".to_owned()
}

fn default_energy_key() -> String {
    "player_energy".to_owned()
}

const fn default_energy_max() -> u32 {
    30
}

const fn default_regen_interval_secs() -> u32 {
    5
}

const fn default_poll_interval_ms() -> u64 {
    100
}

fn default_recipes_path() -> PathBuf {
    PathBuf::from("assets/recipes.json")
}

fn default_items_path() -> PathBuf {
    PathBuf::from("assets/items.json")
}

fn default_log_level() -> String {
    "info".to_owned()
}
