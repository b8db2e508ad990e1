//! Task records as delivered by the tracking service.
//!
//! The core never mutates a [`Task`]. Every field the service may omit is an
//! `Option` or an empty list, so absent data is handled explicitly instead of
//! through default-returning lookups.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Opaque task identifier.
///
/// Services hand out either strings or integers; both decode to the same
/// textual id so `42` and `"42"` refer to one task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawId", into = "String")]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<TaskId> for String {
    fn from(id: TaskId) -> Self {
        id.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Integer(i64),
    Float(f64),
}

impl From<RawId> for TaskId {
    fn from(raw: RawId) -> Self {
        Self(raw.into_string())
    }
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Text(s) => s,
            RawId::Integer(n) => n.to_string(),
            RawId::Float(n) => n.to_string(),
        }
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(deserializer).map(RawId::into_string)
}

pub(crate) fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawId>::deserialize(deserializer)?.map(RawId::into_string))
}

/// Optional field; a value of the wrong shape decodes as absent.
fn lenient_opt<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(serde_json::from_value(Value::deserialize(deserializer)?).ok())
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_text(deserializer)?.unwrap_or_default())
}

/// Status as a plain label or as an object carrying a `name`.
fn lenient_status<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Object(map) => map.get("name").and_then(Value::as_str).map(str::to_string),
        _ => None,
    })
}

/// Role list as a bare array or wrapped as `{"users": [...]}`. Entries that
/// are not users are dropped.
fn lenient_users<'de, D>(deserializer: D) -> Result<Vec<UserRef>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("users") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

/// A person referenced by one of the task's role lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
}

impl UserRef {
    pub fn new(id: impl Into<String>, name: Option<&str>) -> Self {
        Self {
            id: id.into(),
            name: name.map(str::to_string),
        }
    }

    /// Name for display; falls back to the raw id.
    pub fn display_name(&self) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("ID:{}", self.id),
        }
    }
}

/// Relationship between the watching user and a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Assignee,
    Requester,
    Reviewer,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Assignee, Role::Requester, Role::Reviewer];
}

/// Structured due-date object. Services fill in whichever sub-fields they
/// have; none of them is guaranteed to parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueDate {
    #[serde(default, deserialize_with = "lenient_text")]
    pub datetime: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub date: Option<String>,
    #[serde(
        default,
        rename = "dateTimeUtcSeconds",
        deserialize_with = "lenient_text"
    )]
    pub epoch_seconds: Option<String>,
}

/// A unit of work tracked by the external service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    #[serde(default, deserialize_with = "lenient_name")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: Option<String>,
    /// Structured due date, checked before `end_date`.
    #[serde(default, alias = "endDateTime", deserialize_with = "lenient_opt")]
    pub due: Option<DueDate>,
    /// Legacy flat due-date string.
    #[serde(default, deserialize_with = "lenient_text")]
    pub end_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: Option<String>,
    /// Source-side overdue flag; wins over any date comparison.
    #[serde(default, deserialize_with = "lenient_opt")]
    pub overdue: Option<bool>,
    #[serde(default, deserialize_with = "lenient_users")]
    pub assignees: Vec<UserRef>,
    #[serde(default, deserialize_with = "lenient_users")]
    pub requesters: Vec<UserRef>,
    #[serde(default, deserialize_with = "lenient_users")]
    pub reviewers: Vec<UserRef>,
}

impl Task {
    pub fn new(id: impl Into<TaskId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            due: None,
            end_date: None,
            status: None,
            overdue: None,
            assignees: Vec::new(),
            requesters: Vec::new(),
            reviewers: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Set `due.date`.
    pub fn with_due_date(mut self, date: impl Into<String>) -> Self {
        self.due.get_or_insert_with(DueDate::default).date = Some(date.into());
        self
    }

    pub fn with_end_date(mut self, date: impl Into<String>) -> Self {
        self.end_date = Some(date.into());
        self
    }

    pub fn with_overdue_flag(mut self, overdue: bool) -> Self {
        self.overdue = Some(overdue);
        self
    }

    pub fn with_user(mut self, role: Role, user: UserRef) -> Self {
        match role {
            Role::Assignee => self.assignees.push(user),
            Role::Requester => self.requesters.push(user),
            Role::Reviewer => self.reviewers.push(user),
        }
        self
    }

    pub fn users(&self, role: Role) -> &[UserRef] {
        match role {
            Role::Assignee => &self.assignees,
            Role::Requester => &self.requesters,
            Role::Reviewer => &self.reviewers,
        }
    }

    /// Whether `user_id` appears in the given role list.
    pub fn involves(&self, user_id: &str, role: Role) -> bool {
        self.users(role).iter().any(|u| u.id == user_id)
    }
}
