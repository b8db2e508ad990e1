//! Caps on simultaneously displayed notifications.
//!
//! A reservation exists from the moment a notice is handed to the surface
//! until the surface reports a terminal action. At most one window per task,
//! at most `global` windows in total, at most `per_category` per category.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::classifier::UrgencyCategory;
use crate::task::TaskId;

/// Window caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowCaps {
    pub global: usize,
    pub per_category: usize,
}

impl Default for WindowCaps {
    fn default() -> Self {
        Self {
            global: 10,
            per_category: 5,
        }
    }
}

/// An open notification surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayedWindow {
    pub task_id: TaskId,
    pub category: UrgencyCategory,
    pub opened_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct WindowLimiter {
    windows: Mutex<HashMap<TaskId, DisplayedWindow>>,
    caps: WindowCaps,
}

impl WindowLimiter {
    pub fn new(caps: WindowCaps) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            caps,
        }
    }

    pub fn caps(&self) -> WindowCaps {
        self.caps
    }

    fn windows(&self) -> MutexGuard<'_, HashMap<TaskId, DisplayedWindow>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserve a window for `task_id`.
    ///
    /// Returns `false` when the task already has a window or either cap is
    /// reached; that is ordinary flow control, not an error.
    pub fn try_reserve(
        &self,
        task_id: &TaskId,
        category: UrgencyCategory,
        now: DateTime<Utc>,
    ) -> bool {
        let mut windows = self.windows();

        if windows.contains_key(task_id) {
            tracing::debug!(%task_id, "window already open");
            return false;
        }
        if windows.len() >= self.caps.global {
            tracing::debug!(%task_id, cap = self.caps.global, "global window cap reached");
            return false;
        }
        let in_category = windows.values().filter(|w| w.category == category).count();
        if in_category >= self.caps.per_category {
            tracing::debug!(%task_id, %category, cap = self.caps.per_category, "category window cap reached");
            return false;
        }

        windows.insert(
            task_id.clone(),
            DisplayedWindow {
                task_id: task_id.clone(),
                category,
                opened_at: now,
            },
        );
        true
    }

    /// Remove the window for `task_id`. Unknown ids are a no-op.
    ///
    /// Returns the released window, if there was one.
    pub fn release(&self, task_id: &TaskId) -> Option<DisplayedWindow> {
        self.windows().remove(task_id)
    }

    pub fn is_open(&self, task_id: &TaskId) -> bool {
        self.windows().contains_key(task_id)
    }

    pub fn category_of(&self, task_id: &TaskId) -> Option<UrgencyCategory> {
        self.windows().get(task_id).map(|w| w.category)
    }

    pub fn open_count(&self) -> usize {
        self.windows().len()
    }

    pub fn open_count_for(&self, category: UrgencyCategory) -> usize {
        self.windows()
            .values()
            .filter(|w| w.category == category)
            .count()
    }

    /// Open windows, oldest first.
    pub fn snapshot(&self) -> Vec<DisplayedWindow> {
        let mut windows: Vec<_> = self.windows().values().cloned().collect();
        windows.sort_by(|a, b| {
            a.opened_at
                .cmp(&b.opened_at)
                .then_with(|| a.task_id.cmp(&b.task_id))
        });
        windows
    }
}
