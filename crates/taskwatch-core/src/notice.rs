//! Text shown on a notification surface.

use serde::{Deserialize, Serialize};

use crate::classifier::{extract_due_date, UrgencyCategory};
use crate::lifecycle::Notice;
use crate::suppression::UserAction;
use crate::task::{Role, Task, TaskId};

/// Toasts truncate long titles; keep the whole title under this many chars.
pub const DEFAULT_TITLE_LIMIT: usize = 45;

const TITLE_SEPARATOR: &str = ": ";
const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoticeOptions {
    pub title_limit: usize,
    /// URL with an `{id}` placeholder, e.g. `https://tracker.example/task/{id}/`.
    pub link_template: Option<String>,
}

impl Default for NoticeOptions {
    fn default() -> Self {
        Self {
            title_limit: DEFAULT_TITLE_LIMIT,
            link_template: None,
        }
    }
}

/// Rendered notice, ready for any surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoticeContent {
    pub task_id: TaskId,
    pub category: UrgencyCategory,
    pub title: String,
    pub body: String,
    pub link: Option<String>,
    /// Buttons to offer, in display order.
    pub actions: Vec<UserAction>,
}

impl NoticeContent {
    pub fn from_notice(notice: &Notice, options: &NoticeOptions) -> Self {
        let task = &notice.task;
        let category = notice.category;
        Self {
            task_id: task.id.clone(),
            category,
            title: compose_title(title_prefix(category), &task.name, options.title_limit),
            body: format!("Due: {}\nAssignees: {}", due_line(task), assignee_line(task)),
            link: options
                .link_template
                .as_deref()
                .map(|template| template.replace("{id}", task.id.as_str())),
            actions: available_actions(category),
        }
    }
}

pub fn title_prefix(category: UrgencyCategory) -> &'static str {
    match category {
        UrgencyCategory::Overdue => "OVERDUE",
        UrgencyCategory::Urgent => "URGENT",
        UrgencyCategory::Current => "TASK",
    }
}

pub fn available_actions(category: UrgencyCategory) -> Vec<UserAction> {
    let mut actions = Vec::with_capacity(4);
    if category.allows_snooze() {
        actions.push(UserAction::Snooze);
    }
    actions.extend([
        UserAction::RemindLater,
        UserAction::MarkDone,
        UserAction::DismissWithoutChoice,
    ]);
    actions
}

fn compose_title(prefix: &str, name: &str, limit: usize) -> String {
    let name = name.trim();
    let name = if name.is_empty() { "Untitled task" } else { name };

    let room = limit.saturating_sub(prefix.chars().count() + TITLE_SEPARATOR.len());
    let short_name = if room <= ELLIPSIS.len() {
        ELLIPSIS.to_string()
    } else if name.chars().count() > room {
        let kept: String = name.chars().take(room - ELLIPSIS.len()).collect();
        format!("{kept}{ELLIPSIS}")
    } else {
        name.to_string()
    };
    format!("{prefix}{TITLE_SEPARATOR}{short_name}")
}

fn due_line(task: &Task) -> String {
    if let Some(date) = extract_due_date(task) {
        return date.format("%d.%m.%Y").to_string();
    }
    let raw = task
        .due
        .as_ref()
        .and_then(|due| due.date.as_deref().or(due.datetime.as_deref()))
        .or(task.end_date.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty());
    raw.map_or_else(|| "not set".to_string(), str::to_string)
}

fn assignee_line(task: &Task) -> String {
    let names: Vec<String> = task
        .users(Role::Assignee)
        .iter()
        .map(|user| user.display_name())
        .collect();
    if names.is_empty() {
        "unassigned".to_string()
    } else {
        names.join(", ")
    }
}
