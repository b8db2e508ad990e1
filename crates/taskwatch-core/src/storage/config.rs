//! TOML-based application configuration.
//!
//! Stores:
//! - Where tasks come from and whose tasks to watch
//! - Polling cadence
//! - Which urgency categories raise notifications
//! - Window caps and reshow delays
//!
//! Configuration is stored at `~/.config/taskwatch/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use super::data_dir;
use crate::classifier::{TaskClassifier, DEFAULT_TERMINAL_STATUSES};
use crate::error::{ConfigError, CoreError};
use crate::lifecycle::{CalendarZone, CategoryToggles};
use crate::notice::{NoticeOptions, DEFAULT_TITLE_LIMIT};
use crate::source::{FilteredSource, HttpTaskSource, JsonFileSource, RoleFilter, TaskSource};
use crate::suppression::ReshowPolicy;
use crate::task::Role;
use crate::window_limiter::WindowCaps;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    File,
    Http,
}

/// Task source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub kind: SourceKind,
    /// JSON task dump read by the `file` source.
    #[serde(default)]
    pub tasks_file: Option<String>,
    /// URL queried by the `http` source.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Watching user; unset means every task is relevant.
    #[serde(default, deserialize_with = "crate::task::lenient_opt_string")]
    pub user_id: Option<String>,
    #[serde(default = "default_true")]
    pub include_assignee: bool,
    #[serde(default = "default_true")]
    pub include_requester: bool,
    #[serde(default = "default_true")]
    pub include_reviewer: bool,
    /// Link shown with each notice; `{id}` is replaced by the task id.
    #[serde(default)]
    pub task_url_template: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Delay before retrying after a failed fetch.
    #[serde(default = "default_retry_secs")]
    pub retry_secs: u64,
    /// Sweep expired suppression records every N cycles.
    #[serde(default = "default_sweep_every")]
    pub sweep_every: u32,
}

/// Per-category notification switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub overdue: bool,
    #[serde(default = "default_true")]
    pub urgent: bool,
    #[serde(default = "default_true")]
    pub current: bool,
    #[serde(default = "default_title_limit")]
    pub title_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_global_cap")]
    pub global_cap: usize,
    #[serde(default = "default_per_category_cap")]
    pub per_category_cap: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusesConfig {
    /// Status labels that end a task's notifications. Case-insensitive.
    #[serde(default = "default_terminal_statuses")]
    pub terminal: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuppressionConfig {
    #[serde(default = "default_snooze_minutes")]
    pub snooze_minutes: u32,
    #[serde(default = "default_remind_later_minutes")]
    pub remind_later_minutes: u32,
    #[serde(default = "default_reshow_overdue_minutes")]
    pub reshow_overdue_minutes: u32,
    #[serde(default = "default_reshow_urgent_minutes")]
    pub reshow_urgent_minutes: u32,
    #[serde(default = "default_reshow_current_minutes")]
    pub reshow_current_minutes: u32,
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u32,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/taskwatch/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub statuses: StatusesConfig,
    #[serde(default)]
    pub suppression: SuppressionConfig,
    /// Offset east of UTC whose calendar defines "today". Unset: local zone.
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
}

// Default functions
fn default_true() -> bool {
    true
}
fn default_interval_secs() -> u64 {
    300
}
fn default_retry_secs() -> u64 {
    30
}
fn default_sweep_every() -> u32 {
    10
}
fn default_title_limit() -> usize {
    DEFAULT_TITLE_LIMIT
}
fn default_global_cap() -> usize {
    10
}
fn default_per_category_cap() -> usize {
    5
}
fn default_terminal_statuses() -> Vec<String> {
    DEFAULT_TERMINAL_STATUSES.iter().map(|s| s.to_string()).collect()
}
fn default_snooze_minutes() -> u32 {
    15
}
fn default_remind_later_minutes() -> u32 {
    60
}
fn default_reshow_overdue_minutes() -> u32 {
    5
}
fn default_reshow_urgent_minutes() -> u32 {
    15
}
fn default_reshow_current_minutes() -> u32 {
    30
}
fn default_retention_hours() -> u32 {
    24
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::File,
            tasks_file: None,
            endpoint: None,
            user_id: None,
            include_assignee: true,
            include_requester: true,
            include_reviewer: true,
            task_url_template: None,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            retry_secs: default_retry_secs(),
            sweep_every: default_sweep_every(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            overdue: true,
            urgent: true,
            current: true,
            title_limit: DEFAULT_TITLE_LIMIT,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            global_cap: default_global_cap(),
            per_category_cap: default_per_category_cap(),
        }
    }
}

impl Default for StatusesConfig {
    fn default() -> Self {
        Self {
            terminal: default_terminal_statuses(),
        }
    }
}

impl Default for SuppressionConfig {
    fn default() -> Self {
        Self {
            snooze_minutes: default_snooze_minutes(),
            remind_later_minutes: default_remind_later_minutes(),
            reshow_overdue_minutes: default_reshow_overdue_minutes(),
            reshow_urgent_minutes: default_reshow_urgent_minutes(),
            reshow_current_minutes: default_reshow_current_minutes(),
            retention_hours: default_retention_hours(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;
            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value
                        .parse::<bool>()
                        .map_err(|e| invalid(e.to_string()))?,
                ),
                serde_json::Value::Number(_) => {
                    if let Ok(n) = value.parse::<i64>() {
                        serde_json::Value::Number(n.into())
                    } else {
                        return Err(invalid(format!("cannot parse '{value}' as integer")));
                    }
                }
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                }
                // Unset optional: integers stay integers, anything else is text.
                serde_json::Value::Null => match value.parse::<i64>() {
                    Ok(n) => serde_json::Value::Number(n.into()),
                    Err(_) => serde_json::Value::String(value.into()),
                },
                serde_json::Value::String(_) => serde_json::Value::String(value.into()),
            };

            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    /// Default location, `<data_dir>/config.toml`.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if it is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or
    /// fails validation, or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_path()?)
    }

    /// Load from `path`, writing defaults there if it is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let cfg = match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str::<Config>(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                tracing::info!(path = %path.display(), "wrote default configuration");
                cfg
            }
            Err(e) => {
                return Err(ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })
            }
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::default_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key, in memory only.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value does not match the
    /// type of the existing value, or the result fails validation. On error
    /// the config is left unchanged.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Dot-path keys of every leaf value, sorted.
    pub fn keys(&self) -> Vec<String> {
        fn collect(prefix: &str, value: &serde_json::Value, out: &mut Vec<String>) {
            match value {
                serde_json::Value::Object(map) => {
                    for (k, v) in map {
                        let path = if prefix.is_empty() {
                            k.clone()
                        } else {
                            format!("{prefix}.{k}")
                        };
                        collect(&path, v, out);
                    }
                }
                _ => out.push(prefix.to_string()),
            }
        }

        let mut keys = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            collect("", &json, &mut keys);
        }
        keys.sort();
        keys
    }

    /// Reject values the lifecycle cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |key: &str, value: u64| {
            if value == 0 {
                Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: "must be greater than zero".to_string(),
                })
            } else {
                Ok(())
            }
        };
        positive("limits.global_cap", self.limits.global_cap as u64)?;
        positive("limits.per_category_cap", self.limits.per_category_cap as u64)?;
        positive("polling.interval_secs", self.polling.interval_secs)?;
        positive("polling.retry_secs", self.polling.retry_secs)?;
        positive("polling.sweep_every", u64::from(self.polling.sweep_every))?;

        if let Some(minutes) = self.utc_offset_minutes {
            if CalendarZone::from_offset_minutes(minutes).is_none() {
                return Err(ConfigError::InvalidValue {
                    key: "utc_offset_minutes".to_string(),
                    message: format!("{minutes} is outside -1439..=1439"),
                });
            }
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> StdDuration {
        StdDuration::from_secs(self.polling.interval_secs)
    }

    pub fn retry_delay(&self) -> StdDuration {
        StdDuration::from_secs(self.polling.retry_secs)
    }

    pub fn reshow_policy(&self) -> ReshowPolicy {
        let minutes = |m: u32| chrono::Duration::minutes(i64::from(m));
        let s = &self.suppression;
        ReshowPolicy {
            snooze: minutes(s.snooze_minutes),
            remind_later: minutes(s.remind_later_minutes),
            dismiss_overdue: minutes(s.reshow_overdue_minutes),
            dismiss_urgent: minutes(s.reshow_urgent_minutes),
            dismiss_current: minutes(s.reshow_current_minutes),
            retention: chrono::Duration::hours(i64::from(s.retention_hours)),
        }
    }

    pub fn window_caps(&self) -> WindowCaps {
        WindowCaps {
            global: self.limits.global_cap,
            per_category: self.limits.per_category_cap,
        }
    }

    pub fn toggles(&self) -> CategoryToggles {
        CategoryToggles {
            overdue: self.notifications.overdue,
            urgent: self.notifications.urgent,
            current: self.notifications.current,
        }
    }

    /// Out-of-range offsets fall back to the local zone; `validate` reports them.
    pub fn zone(&self) -> CalendarZone {
        self.utc_offset_minutes
            .and_then(CalendarZone::from_offset_minutes)
            .unwrap_or_default()
    }

    pub fn classifier(&self) -> TaskClassifier {
        TaskClassifier::new(self.statuses.terminal.iter())
    }

    pub fn role_filter(&self) -> RoleFilter {
        let Some(user_id) = self.source.user_id.as_deref().map(str::trim).filter(|s| !s.is_empty())
        else {
            return RoleFilter::everyone();
        };
        let roles = [
            (Role::Assignee, self.source.include_assignee),
            (Role::Requester, self.source.include_requester),
            (Role::Reviewer, self.source.include_reviewer),
        ]
        .into_iter()
        .filter_map(|(role, enabled)| enabled.then_some(role));
        RoleFilter::for_user(user_id, roles)
    }

    pub fn notice_options(&self) -> NoticeOptions {
        NoticeOptions {
            title_limit: self.notifications.title_limit,
            link_template: self
                .source
                .task_url_template
                .clone()
                .filter(|t| !t.trim().is_empty()),
        }
    }

    /// Build the configured task source, wrapped in the role filter.
    ///
    /// `token` is only used by the `http` source.
    pub fn task_source(&self, token: Option<String>) -> Result<Arc<dyn TaskSource>, CoreError> {
        let filter = self.role_filter();
        match self.source.kind {
            SourceKind::File => {
                let path = self
                    .source
                    .tasks_file
                    .as_deref()
                    .filter(|p| !p.trim().is_empty())
                    .ok_or_else(|| ConfigError::InvalidValue {
                        key: "source.tasks_file".to_string(),
                        message: "required when source.kind is \"file\"".to_string(),
                    })?;
                Ok(Arc::new(FilteredSource::new(JsonFileSource::new(path), filter)))
            }
            SourceKind::Http => {
                let endpoint = self.source.endpoint.as_deref().unwrap_or_default();
                let source = HttpTaskSource::new(endpoint, token)?;
                Ok(Arc::new(FilteredSource::new(source, filter)))
            }
        }
    }
}
