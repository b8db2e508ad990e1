pub mod auth;
pub mod check;
pub mod config;
pub mod watch;

use std::path::{Path, PathBuf};
use taskwatch_core::error::ConfigError;
use taskwatch_core::Config;

/// `--config` if given, else the default location.
pub fn config_path(config: Option<&Path>) -> Result<PathBuf, ConfigError> {
    match config {
        Some(path) => Ok(path.to_path_buf()),
        None => Config::default_path(),
    }
}

pub fn load_config(config: Option<&Path>) -> Result<Config, ConfigError> {
    Config::load_from(&config_path(config)?)
}
