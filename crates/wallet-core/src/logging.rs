use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::error::WalletError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

fn default_level() -> String {
    "info".to_string()
}

/// `[logging]` section of the engine config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directives used when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}

/// `RUST_LOG` when set, otherwise the configured level.
pub fn build_filter(level: &str) -> Result<EnvFilter, WalletError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| WalletError::Config(format!("log level '{level}': {e}"))),
    }
}

/// Installs the global `tracing` subscriber. Fails if one is already set.
pub fn init(config: &LoggingConfig) -> Result<(), WalletError> {
    let filter = build_filter(&config.level)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
    installed.map_err(|e| WalletError::Config(format!("logging init: {e}")))
}
