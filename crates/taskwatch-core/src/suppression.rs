//! Per-task suppression state.
//!
//! A record is written whenever a notification for a task closes, whatever
//! the reason. While the record is live the task is not shown again:
//!
//! - `snooze_until` in the future: suppressed until then, after which the
//!   record is dropped lazily by the next [`SuppressionStore::should_suppress`].
//! - `snooze_until` absent: acknowledged as done, suppressed until
//!   [`SuppressionStore::sweep`] purges the record.
//!
//! All state sits behind one mutex so a lookup-and-expire cannot interleave
//! with a concurrent action or sweep.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::classifier::UrgencyCategory;
use crate::task::TaskId;

/// Terminal interaction with a notification surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserAction {
    /// Short postponement.
    Snooze,
    /// Longer postponement.
    RemindLater,
    /// Acknowledged; stay quiet until the record ages out.
    MarkDone,
    /// Surface closed without picking any of the above.
    DismissWithoutChoice,
}

impl UserAction {
    pub const ALL: [UserAction; 4] = [
        UserAction::Snooze,
        UserAction::RemindLater,
        UserAction::MarkDone,
        UserAction::DismissWithoutChoice,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            UserAction::Snooze => "snooze",
            UserAction::RemindLater => "later",
            UserAction::MarkDone => "done",
            UserAction::DismissWithoutChoice => "close",
        }
    }

    /// Whether the user picked this action on purpose.
    pub fn is_explicit(self) -> bool {
        !matches!(self, UserAction::DismissWithoutChoice)
    }
}

impl fmt::Display for UserAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "snooze" => Ok(UserAction::Snooze),
            "later" | "remind_later" | "remind-later" => Ok(UserAction::RemindLater),
            "done" | "mark_done" | "mark-done" => Ok(UserAction::MarkDone),
            "close" | "dismiss" => Ok(UserAction::DismissWithoutChoice),
            other => Err(format!("unknown action: {other}")),
        }
    }
}

/// Suppression state for one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppressionRecord {
    /// When the notification was closed.
    pub closed_at: DateTime<Utc>,
    /// End of the suppression; `None` means acknowledged as done.
    pub snooze_until: Option<DateTime<Utc>>,
    /// Set when the record came from a dismiss rather than a button.
    pub auto_closed: bool,
}

impl SuppressionRecord {
    pub fn is_acknowledged(&self) -> bool {
        self.snooze_until.is_none()
    }

    pub fn is_snoozed_at(&self, now: DateTime<Utc>) -> bool {
        self.snooze_until.is_some_and(|until| now < until)
    }
}

/// Delays applied per action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReshowPolicy {
    pub snooze: Duration,
    pub remind_later: Duration,
    pub dismiss_overdue: Duration,
    pub dismiss_urgent: Duration,
    pub dismiss_current: Duration,
    /// Records older than this are purged by `sweep`, done or not.
    pub retention: Duration,
}

impl Default for ReshowPolicy {
    fn default() -> Self {
        Self {
            snooze: Duration::minutes(15),
            remind_later: Duration::hours(1),
            dismiss_overdue: Duration::minutes(5),
            dismiss_urgent: Duration::minutes(15),
            dismiss_current: Duration::minutes(30),
            retention: Duration::hours(24),
        }
    }
}

impl ReshowPolicy {
    /// Auto-reshow delay after a dismiss; overdue comes back soonest.
    pub fn dismiss_delay(&self, category: UrgencyCategory) -> Duration {
        match category {
            UrgencyCategory::Overdue => self.dismiss_overdue,
            UrgencyCategory::Urgent => self.dismiss_urgent,
            UrgencyCategory::Current => self.dismiss_current,
        }
    }

    /// End of suppression for `action` taken at `now`; `None` is indefinite.
    pub fn snooze_until(
        &self,
        action: UserAction,
        category: UrgencyCategory,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        match action {
            UserAction::Snooze => Some(now + self.snooze),
            UserAction::RemindLater => Some(now + self.remind_later),
            UserAction::MarkDone => None,
            UserAction::DismissWithoutChoice => Some(now + self.dismiss_delay(category)),
        }
    }
}

/// Snapshot counts of live records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppressionCounts {
    pub snoozed: usize,
    pub done: usize,
}

/// Thread-safe map of task id to [`SuppressionRecord`].
#[derive(Debug, Default)]
pub struct SuppressionStore {
    records: Mutex<HashMap<TaskId, SuppressionRecord>>,
    policy: ReshowPolicy,
}

impl SuppressionStore {
    pub fn new(policy: ReshowPolicy) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            policy,
        }
    }

    pub fn policy(&self) -> &ReshowPolicy {
        &self.policy
    }

    // A panic while holding the lock cannot leave a half-written record:
    // every mutation is a single insert or remove.
    fn records(&self) -> MutexGuard<'_, HashMap<TaskId, SuppressionRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a notification for `task_id` must stay hidden at `now`.
    ///
    /// An expired snooze is removed here and the task becomes eligible.
    pub fn should_suppress(&self, task_id: &TaskId, now: DateTime<Utc>) -> bool {
        let mut records = self.records();
        let Some(record) = records.get(task_id) else {
            return false;
        };

        match record.snooze_until {
            None => true,
            Some(until) if now < until => true,
            Some(_) => {
                records.remove(task_id);
                tracing::debug!(%task_id, "snooze expired");
                false
            }
        }
    }

    /// Store the outcome of a user action, replacing any previous record.
    ///
    /// `category` only matters for [`UserAction::DismissWithoutChoice`].
    pub fn record_action(
        &self,
        task_id: &TaskId,
        action: UserAction,
        category: UrgencyCategory,
        now: DateTime<Utc>,
    ) -> SuppressionRecord {
        let record = SuppressionRecord {
            closed_at: now,
            snooze_until: self.policy.snooze_until(action, category, now),
            auto_closed: !action.is_explicit(),
        };
        self.records().insert(task_id.clone(), record.clone());

        match record.snooze_until {
            Some(until) => tracing::info!(%task_id, %action, %until, "notification suppressed"),
            None => tracing::info!(%task_id, %action, "notification acknowledged"),
        }
        record
    }

    /// Drop every record closed more than the retention period ago.
    ///
    /// Returns the number of records removed.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let retention = self.policy.retention;
        let mut records = self.records();
        let before = records.len();
        records.retain(|task_id, record| {
            let keep = now - record.closed_at <= retention;
            if !keep {
                tracing::debug!(%task_id, "purging stale suppression record");
            }
            keep
        });
        let removed = before - records.len();
        if removed > 0 {
            tracing::info!(removed, "swept suppression records");
        }
        removed
    }

    pub fn get(&self, task_id: &TaskId) -> Option<SuppressionRecord> {
        self.records().get(task_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    /// Live snoozes and acknowledged records at `now`.
    pub fn counts(&self, now: DateTime<Utc>) -> SuppressionCounts {
        let records = self.records();
        SuppressionCounts {
            snoozed: records.values().filter(|r| r.is_snoozed_at(now)).count(),
            done: records.values().filter(|r| r.is_acknowledged()).count(),
        }
    }
}
