mod config;

pub use config::{
    Config, LimitsConfig, NotificationsConfig, PollingConfig, SourceConfig, SourceKind,
    StatusesConfig, SuppressionConfig,
};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/taskwatch[-dev]/` based on TASKWATCH_ENV.
///
/// Set TASKWATCH_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("TASKWATCH_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("taskwatch-dev")
    } else {
        base_dir.join("taskwatch")
    };

    std::fs::create_dir_all(&dir).map_err(ConfigError::DataDir)?;
    Ok(dir)
}
