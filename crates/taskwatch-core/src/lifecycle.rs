//! Notification lifecycle controller.
//!
//! ## State Transitions (per task)
//!
//! ```text
//! Hidden -> (eligible) -> Shown -> (user action) -> Hidden + suppression record
//! ```
//!
//! [`LifecycleController::evaluate`] runs once per poll cycle and returns the
//! tasks that must be shown now; [`LifecycleController::resolve`] is called
//! once for every terminal interaction with a shown notification. Neither
//! performs I/O and neither can fail.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};

use crate::classifier::{Classification, TaskClassifier, UrgencyCategory};
use crate::suppression::{SuppressionStore, UserAction};
use crate::task::{Task, TaskId};
use crate::window_limiter::WindowLimiter;

/// Time zone whose calendar decides what "today" is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalendarZone {
    #[default]
    Local,
    Fixed(FixedOffset),
}

impl CalendarZone {
    pub fn utc() -> Self {
        CalendarZone::Fixed(Utc.fix())
    }

    /// `None` when the offset is out of range (over 24h).
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(minutes.checked_mul(60)?).map(CalendarZone::Fixed)
    }

    pub fn today(self, now: DateTime<Utc>) -> NaiveDate {
        match self {
            CalendarZone::Local => now.with_timezone(&Local).date_naive(),
            CalendarZone::Fixed(offset) => now.with_timezone(&offset).date_naive(),
        }
    }
}

/// Per-category on/off switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryToggles {
    pub overdue: bool,
    pub urgent: bool,
    pub current: bool,
}

impl Default for CategoryToggles {
    fn default() -> Self {
        Self {
            overdue: true,
            urgent: true,
            current: true,
        }
    }
}

impl CategoryToggles {
    pub fn is_enabled(&self, category: UrgencyCategory) -> bool {
        match category {
            UrgencyCategory::Overdue => self.overdue,
            UrgencyCategory::Urgent => self.urgent,
            UrgencyCategory::Current => self.current,
        }
    }
}

/// A task that must be shown now.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub task: Task,
    pub category: UrgencyCategory,
}

/// What happened to each task during one `evaluate` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleStats {
    pub considered: usize,
    pub missing_id: usize,
    pub excluded: usize,
    pub disabled: usize,
    pub suppressed: usize,
    pub capacity_rejected: usize,
    pub shown: usize,
}

/// Tasks per classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub overdue: usize,
    pub urgent: usize,
    pub current: usize,
    pub excluded: usize,
}

impl CategoryCounts {
    fn add(&mut self, classification: Classification) {
        match classification {
            Classification::Excluded => self.excluded += 1,
            Classification::Category(UrgencyCategory::Overdue) => self.overdue += 1,
            Classification::Category(UrgencyCategory::Urgent) => self.urgent += 1,
            Classification::Category(UrgencyCategory::Current) => self.current += 1,
        }
    }

    pub fn get(&self, category: UrgencyCategory) -> usize {
        match category {
            UrgencyCategory::Overdue => self.overdue,
            UrgencyCategory::Urgent => self.urgent,
            UrgencyCategory::Current => self.current,
        }
    }
}

/// Open windows and live suppressions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSummary {
    pub active: usize,
    pub snoozed: usize,
    pub done: usize,
}

pub struct LifecycleController {
    suppression: Arc<SuppressionStore>,
    windows: Arc<WindowLimiter>,
    classifier: TaskClassifier,
    toggles: CategoryToggles,
    zone: CalendarZone,
    /// Held for a whole `evaluate` and a whole `resolve`, so a task cannot be
    /// re-reserved between a resolve's record and its release.
    gate: Mutex<()>,
}

impl LifecycleController {
    pub fn new(
        suppression: Arc<SuppressionStore>,
        windows: Arc<WindowLimiter>,
        classifier: TaskClassifier,
    ) -> Self {
        Self {
            suppression,
            windows,
            classifier,
            toggles: CategoryToggles::default(),
            zone: CalendarZone::default(),
            gate: Mutex::new(()),
        }
    }

    pub fn with_toggles(mut self, toggles: CategoryToggles) -> Self {
        self.toggles = toggles;
        self
    }

    pub fn with_zone(mut self, zone: CalendarZone) -> Self {
        self.zone = zone;
        self
    }

    pub fn suppression(&self) -> &Arc<SuppressionStore> {
        &self.suppression
    }

    pub fn windows(&self) -> &Arc<WindowLimiter> {
        &self.windows
    }

    pub fn classifier(&self) -> &TaskClassifier {
        &self.classifier
    }

    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        self.zone.today(now)
    }

    /// Tasks to show at `now`, in input order.
    pub fn evaluate(&self, tasks: &[Task], now: DateTime<Utc>) -> Vec<Notice> {
        self.evaluate_with_stats(tasks, now).0
    }

    /// Like [`evaluate`](Self::evaluate), also reporting why tasks were skipped.
    pub fn evaluate_with_stats(&self, tasks: &[Task], now: DateTime<Utc>) -> (Vec<Notice>, CycleStats) {
        let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        let today = self.today(now);
        let mut stats = CycleStats::default();
        let mut notices = Vec::new();

        for task in tasks {
            stats.considered += 1;
            if task.id.is_empty() {
                tracing::warn!(name = %task.name, "skipping task without id");
                stats.missing_id += 1;
                continue;
            }

            let Some(category) = self.classifier.classify(task, today).category() else {
                stats.excluded += 1;
                continue;
            };
            if !self.toggles.is_enabled(category) {
                stats.disabled += 1;
                continue;
            }
            if self.suppression.should_suppress(&task.id, now) {
                stats.suppressed += 1;
                continue;
            }
            if !self.windows.try_reserve(&task.id, category, now) {
                stats.capacity_rejected += 1;
                continue;
            }

            tracing::debug!(task_id = %task.id, %category, "notice scheduled");
            notices.push(Notice {
                task: task.clone(),
                category,
            });
        }

        stats.shown = notices.len();
        (notices, stats)
    }

    /// Apply a terminal user action and close the task's window.
    ///
    /// The window's category picks the dismiss delay; without an open window
    /// the task is treated as `Current`.
    pub fn resolve(&self, task_id: &TaskId, action: UserAction, now: DateTime<Utc>) {
        let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        let category = self.windows.category_of(task_id).unwrap_or_else(|| {
            tracing::debug!(%task_id, "resolving task without an open window");
            UrgencyCategory::Current
        });
        self.suppression.record_action(task_id, action, category, now);
        self.windows.release(task_id);
    }

    /// Purge suppression records past retention.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        self.suppression.sweep(now)
    }

    pub fn summary(&self, now: DateTime<Utc>) -> NotificationSummary {
        let counts = self.suppression.counts(now);
        NotificationSummary {
            active: self.windows.open_count(),
            snoozed: counts.snoozed,
            done: counts.done,
        }
    }

    /// Classify without touching any state.
    pub fn categorize(&self, tasks: &[Task], now: DateTime<Utc>) -> CategoryCounts {
        let today = self.today(now);
        let mut counts = CategoryCounts::default();
        for task in tasks {
            counts.add(self.classifier.classify(task, today));
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window_limiter::WindowCaps;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 15, 9, 0, 0).unwrap()
    }

    fn controller() -> LifecycleController {
        LifecycleController::new(
            Arc::new(SuppressionStore::default()),
            Arc::new(WindowLimiter::default()),
            TaskClassifier::default(),
        )
        .with_zone(CalendarZone::utc())
    }

    fn ids(notices: &[Notice]) -> Vec<&str> {
        notices.iter().map(|n| n.task.id.as_str()).collect()
    }

    #[test]
    fn excluded_and_disabled_tasks_are_skipped() {
        let controller = controller().with_toggles(CategoryToggles {
            current: false,
            ..CategoryToggles::default()
        });
        let tasks = vec![
            Task::new("done", "a").with_status("Done"),
            Task::new("later", "b").with_due_date("2026-12-01"),
            Task::new("today", "c").with_due_date("2026-10-15"),
        ];

        let (notices, stats) = controller.evaluate_with_stats(&tasks, now());
        assert_eq!(ids(&notices), ["today"]);
        assert_eq!(stats.excluded, 1);
        assert_eq!(stats.disabled, 1);
        assert_eq!(stats.shown, 1);
    }

    #[test]
    fn second_evaluate_is_empty() {
        let controller = controller();
        let tasks = vec![Task::new("1", "a"), Task::new("2", "b").with_overdue_flag(true)];

        assert_eq!(controller.evaluate(&tasks, now()).len(), 2);
        let (notices, stats) = controller.evaluate_with_stats(&tasks, now());
        assert!(notices.is_empty());
        assert_eq!(stats.capacity_rejected, 2);
    }

    #[test]
    fn tasks_without_id_are_skipped_not_fatal() {
        let controller = controller();
        let tasks = vec![Task::new("", "nameless"), Task::new("2", "b")];

        let (notices, stats) = controller.evaluate_with_stats(&tasks, now());
        assert_eq!(ids(&notices), ["2"]);
        assert_eq!(stats.missing_id, 1);
    }

    #[test]
    fn resolve_releases_window_and_records_suppression() {
        let controller = controller();
        let tasks = vec![Task::new("1", "a").with_overdue_flag(true)];
        controller.evaluate(&tasks, now());

        controller.resolve(&TaskId::new("1"), UserAction::DismissWithoutChoice, now());

        assert!(!controller.windows().is_open(&TaskId::new("1")));
        let record = controller.suppression().get(&TaskId::new("1")).unwrap();
        // Overdue window: five minute reshow.
        assert_eq!(record.snooze_until, Some(now() + Duration::minutes(5)));
    }

    #[test]
    fn resolve_unknown_task_is_a_noop_for_windows() {
        let controller = controller();
        controller.resolve(&TaskId::new("ghost"), UserAction::DismissWithoutChoice, now());

        assert_eq!(controller.windows().open_count(), 0);
        let record = controller.suppression().get(&TaskId::new("ghost")).unwrap();
        assert_eq!(record.snooze_until, Some(now() + Duration::minutes(30)));
    }

    #[test]
    fn summary_counts_windows_and_suppressions() {
        let controller = LifecycleController::new(
            Arc::new(SuppressionStore::default()),
            Arc::new(WindowLimiter::new(WindowCaps {
                global: 10,
                per_category: 10,
            })),
            TaskClassifier::default(),
        )
        .with_zone(CalendarZone::utc());
        let tasks: Vec<_> = (0..4).map(|n| Task::new(n.to_string(), "t")).collect();
        controller.evaluate(&tasks, now());

        controller.resolve(&TaskId::new("0"), UserAction::Snooze, now());
        controller.resolve(&TaskId::new("1"), UserAction::MarkDone, now());

        assert_eq!(
            controller.summary(now()),
            NotificationSummary {
                active: 2,
                snoozed: 1,
                done: 1
            }
        );
    }

    #[test]
    fn categorize_counts_without_reserving() {
        let controller = controller();
        let tasks = vec![
            Task::new("1", "a").with_due_date("2026-10-01"),
            Task::new("2", "b").with_due_date("2026-10-16"),
            Task::new("3", "c"),
            Task::new("4", "d").with_status("Cancelled"),
        ];

        let counts = controller.categorize(&tasks, now());
        assert_eq!(
            counts,
            CategoryCounts {
                overdue: 1,
                urgent: 1,
                current: 1,
                excluded: 1
            }
        );
        assert_eq!(controller.windows().open_count(), 0);
    }

    #[test]
    fn today_follows_the_configured_zone() {
        let late = Utc.with_ymd_and_hms(2026, 10, 15, 22, 30, 0).unwrap();
        let east = CalendarZone::from_offset_minutes(180).unwrap();
        assert_eq!(east.today(late), NaiveDate::from_ymd_opt(2026, 10, 16).unwrap());
        assert_eq!(CalendarZone::utc().today(late), NaiveDate::from_ymd_opt(2026, 10, 15).unwrap());
        assert!(CalendarZone::from_offset_minutes(24 * 60).is_none());
    }
}
