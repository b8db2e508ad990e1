//! Core error types for taskwatch-core.
//!
//! The lifecycle components (classifier, suppression store, window limiter,
//! controller) never fail: bad task data degrades to `Current`, capacity
//! rejection is a `false`, unknown task ids are no-ops. The errors below
//! belong to the outer layers: configuration, task sources, credentials.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for taskwatch-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Task source errors
    #[error("Task source error: {0}")]
    Source(#[from] SourceError),

    /// Credential store errors
    #[error("Credential store error: {0}")]
    Credentials(#[from] keyring::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Home directory could not be resolved
    #[error("Could not resolve the configuration directory: {0}")]
    DataDir(#[source] std::io::Error),
}

/// Errors raised while fetching tasks from the tracking service.
///
/// These never reach the lifecycle controller: the driver logs them and
/// skips the cycle.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Reading a local task dump failed
    #[error("Failed to read tasks from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The payload was not a JSON array of tasks
    #[error("Failed to decode task list: {0}")]
    Decode(#[from] serde_json::Error),

    /// Transport-level HTTP failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status
    #[error("Task service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// No endpoint configured for an HTTP source
    #[error("No task endpoint configured")]
    MissingEndpoint,

    /// Endpoint is not a valid absolute URL
    #[error("Invalid task endpoint '{endpoint}': {source}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
