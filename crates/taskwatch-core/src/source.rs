//! Task sources.
//!
//! A source is a synchronous call returning the current task list. Failures
//! go back to the driver, which skips the cycle; they never reach the
//! lifecycle controller.

use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use url::Url;

use crate::error::SourceError;
use crate::task::{Role, Task};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Every task backend implements this trait.
pub trait TaskSource: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Fetch the tasks for the current cycle.
    fn fetch_tasks(&self) -> Result<Vec<Task>, SourceError>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Payload {
    List(Vec<serde_json::Value>),
    Wrapped { tasks: Vec<serde_json::Value> },
}

/// Decode a task list, either a bare JSON array or `{"tasks": [...]}`.
///
/// Records are decoded one by one; a malformed record is logged and skipped
/// so it cannot take the rest of the batch down with it.
pub fn decode_tasks(payload: &str) -> Result<Vec<Task>, SourceError> {
    let records = match serde_json::from_str::<Payload>(payload)? {
        Payload::List(records) | Payload::Wrapped { tasks: records } => records,
    };

    let mut tasks = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        match serde_json::from_value::<Task>(record) {
            Ok(task) => tasks.push(task),
            Err(err) => tracing::warn!(index, error = %err, "skipping malformed task record"),
        }
    }
    Ok(tasks)
}

/// Fetch once and report how many tasks came back. Used to confirm the
/// service is reachable and accepts the token before monitoring starts.
pub fn check_connection(source: &dyn TaskSource) -> Result<usize, SourceError> {
    match source.fetch_tasks() {
        Ok(tasks) => {
            tracing::info!(source = source.name(), count = tasks.len(), "task source reachable");
            Ok(tasks.len())
        }
        Err(err) => {
            tracing::warn!(source = source.name(), error = %err, "task source unreachable");
            Err(err)
        }
    }
}

/// Keep the first task for each id.
pub fn dedup_by_id(tasks: Vec<Task>) -> Vec<Task> {
    let mut seen = HashSet::new();
    tasks
        .into_iter()
        .filter(|task| seen.insert(task.id.clone()))
        .collect()
}

/// Tasks read from a JSON file on every fetch.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TaskSource for JsonFileSource {
    fn name(&self) -> &str {
        "file"
    }

    fn fetch_tasks(&self) -> Result<Vec<Task>, SourceError> {
        let payload = std::fs::read_to_string(&self.path).map_err(|source| SourceError::Io {
            path: self.path.clone(),
            source,
        })?;
        decode_tasks(&payload)
    }
}

/// Tasks fetched with a GET from an HTTP endpoint returning JSON.
#[derive(Debug, Clone)]
pub struct HttpTaskSource {
    endpoint: Url,
    token: Option<String>,
}

impl HttpTaskSource {
    pub fn new(endpoint: &str, token: Option<String>) -> Result<Self, SourceError> {
        if endpoint.trim().is_empty() {
            return Err(SourceError::MissingEndpoint);
        }
        let endpoint = Url::parse(endpoint.trim()).map_err(|source| SourceError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            source,
        })?;
        Ok(Self {
            endpoint,
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl TaskSource for HttpTaskSource {
    fn name(&self) -> &str {
        "http"
    }

    fn fetch_tasks(&self) -> Result<Vec<Task>, SourceError> {
        let client = Client::builder().timeout(HTTP_TIMEOUT).build()?;
        let mut request = client
            .get(self.endpoint.clone())
            .header(ACCEPT, "application/json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let resp = request.send()?;
        let status = resp.status();
        let body = resp.text()?;
        if !status.is_success() {
            let body: String = body.chars().take(500).collect();
            return Err(SourceError::Status {
                status: status.as_u16(),
                body,
            });
        }
        decode_tasks(&body)
    }
}

/// Fixed in-memory task list, replaceable between cycles.
#[derive(Debug, Default)]
pub struct StaticSource {
    tasks: Mutex<Vec<Task>>,
}

impl StaticSource {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
        }
    }

    pub fn replace(&self, tasks: Vec<Task>) {
        *self.tasks.lock().unwrap_or_else(PoisonError::into_inner) = tasks;
    }
}

impl TaskSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    fn fetch_tasks(&self) -> Result<Vec<Task>, SourceError> {
        Ok(self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}

/// Which role lists make a task relevant to the watching user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleFilter {
    /// `None` lets every task through.
    pub user_id: Option<String>,
    pub roles: Vec<Role>,
}

impl RoleFilter {
    pub fn everyone() -> Self {
        Self {
            user_id: None,
            roles: Role::ALL.to_vec(),
        }
    }

    pub fn for_user(user_id: impl Into<String>, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            roles: roles.into_iter().collect(),
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        match self.user_id.as_deref() {
            None => true,
            Some(user_id) => self.roles.iter().any(|&role| task.involves(user_id, role)),
        }
    }
}

/// Wraps a source with role filtering and id de-duplication.
pub struct FilteredSource<S> {
    inner: S,
    filter: RoleFilter,
}

impl<S: TaskSource> FilteredSource<S> {
    pub fn new(inner: S, filter: RoleFilter) -> Self {
        Self { inner, filter }
    }
}

impl<S: TaskSource> TaskSource for FilteredSource<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn fetch_tasks(&self) -> Result<Vec<Task>, SourceError> {
        let tasks = self.inner.fetch_tasks()?;
        let total = tasks.len();
        let selected: Vec<Task> = dedup_by_id(tasks)
            .into_iter()
            .filter(|task| self.filter.matches(task))
            .collect();
        tracing::debug!(source = self.name(), total, selected = selected.len(), "filtered tasks");
        Ok(selected)
    }
}
