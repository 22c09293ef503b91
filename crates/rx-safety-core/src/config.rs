//! Engine configuration and logging setup.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Environment variable overriding the data directory.
pub const ENV_DATA_DIR: &str = "RX_SAFETY_DATA_DIR";

/// Environment variable overriding the alternative limit.
pub const ENV_MAX_ALTERNATIVES: &str = "RX_SAFETY_MAX_ALTERNATIVES";

pub const DEFAULT_DATA_DIR: &str = "data/processed";
pub const DEFAULT_REFERENCE_DB: &str = "reference.db";
pub const DEFAULT_VOCABULARY_FILE: &str = "canonical_drugs.json";
pub const DEFAULT_MAX_ALTERNATIVES: usize = 5;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("Invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Where the reference data lives and how results are bounded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding the ETL output
    pub data_dir: PathBuf,
    /// SQLite file name inside `data_dir`
    pub reference_db: String,
    /// Vocabulary JSON file name inside `data_dir`
    pub vocabulary_file: String,
    /// Upper bound on suggested alternatives
    pub max_alternatives: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            reference_db: DEFAULT_REFERENCE_DB.to_string(),
            vocabulary_file: DEFAULT_VOCABULARY_FILE.to_string(),
            max_alternatives: DEFAULT_MAX_ALTERNATIVES,
        }
    }
}

impl EngineConfig {
    /// Defaults for a given data directory.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Defaults overridden by `RX_SAFETY_DATA_DIR` and `RX_SAFETY_MAX_ALTERNATIVES`.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`EngineConfig::from_env`] with an injectable variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(dir) = lookup(ENV_DATA_DIR) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup(ENV_MAX_ALTERNATIVES) {
            config.max_alternatives =
                raw.trim()
                    .parse::<usize>()
                    .map_err(|_| ConfigError::InvalidEnv {
                        name: ENV_MAX_ALTERNATIVES,
                        value: raw.clone(),
                    })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_alternatives == 0 {
            return Err(ConfigError::Invalid(
                "max_alternatives must be at least 1".to_string(),
            ));
        }
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("data_dir is empty".to_string()));
        }
        Ok(())
    }

    pub fn reference_db_path(&self) -> PathBuf {
        self.data_dir.join(&self.reference_db)
    }

    pub fn vocabulary_path(&self) -> PathBuf {
        self.data_dir.join(&self.vocabulary_file)
    }
}

/// Filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "rx_safety_core=info"
}

/// Install a formatting subscriber. Safe to call more than once; only the
/// first call (or a host-installed subscriber) wins.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_log_filter())),
        )
        .try_init();
}
