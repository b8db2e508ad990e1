//! Periodic polling loop.
//!
//! Every poll interval the driver fetches tasks on a blocking thread, runs
//! them through [`LifecycleController::evaluate`] and hands each notice to a
//! [`NotificationSurface`]. The surface reports user choices back over an
//! [`ActionSender`]; the driver resolves them as they arrive, in between
//! cycles.
//!
//! A failed fetch skips the cycle and schedules the next attempt after the
//! retry delay instead of the regular interval.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use crate::error::CoreError;
use crate::lifecycle::{CycleStats, LifecycleController};
use crate::notice::{NoticeContent, NoticeOptions};
use crate::source::TaskSource;
use crate::suppression::UserAction;
use crate::task::TaskId;

/// A terminal interaction with a shown notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionEvent {
    pub task_id: TaskId,
    pub action: UserAction,
}

impl ActionEvent {
    pub fn new(task_id: impl Into<TaskId>, action: UserAction) -> Self {
        Self {
            task_id: task_id.into(),
            action,
        }
    }
}

/// Channel end handed to surfaces for reporting user actions.
pub type ActionSender = mpsc::UnboundedSender<ActionEvent>;

/// Where notices are shown.
///
/// `present` is called from the driver's task and must not block; a surface
/// that waits for the user should keep the sender and report later.
pub trait NotificationSurface: Send + Sync {
    fn present(&self, content: &NoticeContent, actions: ActionSender);
}

/// Timing knobs for [`PollDriver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverSettings {
    pub poll_interval: Duration,
    pub retry_delay: Duration,
    /// Sweep the suppression store every N successful cycles.
    pub sweep_every: u32,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(300),
            retry_delay: Duration::from_secs(30),
            sweep_every: 10,
        }
    }
}

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct PollDriver {
    controller: Arc<LifecycleController>,
    source: Arc<dyn TaskSource>,
    surface: Arc<dyn NotificationSurface>,
    options: NoticeOptions,
    settings: DriverSettings,
    clock: Clock,
    actions_tx: ActionSender,
    actions_rx: Option<mpsc::UnboundedReceiver<ActionEvent>>,
}

impl PollDriver {
    pub fn new(
        controller: Arc<LifecycleController>,
        source: Arc<dyn TaskSource>,
        surface: Arc<dyn NotificationSurface>,
    ) -> Self {
        let (actions_tx, actions_rx) = mpsc::unbounded_channel();
        Self {
            controller,
            source,
            surface,
            options: NoticeOptions::default(),
            settings: DriverSettings::default(),
            clock: Arc::new(Utc::now),
            actions_tx,
            actions_rx: Some(actions_rx),
        }
    }

    pub fn with_settings(mut self, settings: DriverSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_notice_options(mut self, options: NoticeOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the wall clock, e.g. to drive the loop at a fixed instant.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    pub fn controller(&self) -> &Arc<LifecycleController> {
        &self.controller
    }

    pub fn settings(&self) -> DriverSettings {
        self.settings
    }

    /// Sender for actions reported outside of `present`.
    pub fn action_sender(&self) -> ActionSender {
        self.actions_tx.clone()
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Fetch, evaluate and present once.
    ///
    /// # Errors
    ///
    /// Returns the source's error when the fetch fails; nothing is evaluated
    /// in that case.
    pub async fn run_cycle(&self) -> Result<CycleStats, CoreError> {
        let source = Arc::clone(&self.source);
        let tasks = tokio::task::spawn_blocking(move || source.fetch_tasks())
            .await
            .map_err(|e| CoreError::Custom(format!("task fetch aborted: {e}")))??;

        let now = self.now();
        let counts = self.controller.categorize(&tasks, now);
        let (notices, stats) = self.controller.evaluate_with_stats(&tasks, now);
        tracing::info!(
            source = self.source.name(),
            fetched = tasks.len(),
            overdue = counts.overdue,
            urgent = counts.urgent,
            current = counts.current,
            excluded = counts.excluded,
            suppressed = stats.suppressed,
            capacity_rejected = stats.capacity_rejected,
            shown = stats.shown,
            "poll cycle complete"
        );

        for notice in &notices {
            let content = NoticeContent::from_notice(notice, &self.options);
            self.surface.present(&content, self.actions_tx.clone());
        }
        Ok(stats)
    }

    pub fn resolve(&self, event: &ActionEvent) {
        self.controller.resolve(&event.task_id, event.action, self.now());
    }

    /// Run until `shutdown` turns `true` or its sender is dropped.
    ///
    /// The first cycle starts immediately. Actions still queued at shutdown
    /// are resolved before returning.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let Some(mut actions_rx) = self.actions_rx.take() else {
            return;
        };
        let mut completed: u32 = 0;
        let mut next_cycle = Instant::now();

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                Some(event) = actions_rx.recv() => {
                    self.resolve(&event);
                }
                _ = tokio::time::sleep_until(next_cycle) => {
                    let delay = match self.run_cycle().await {
                        Ok(_) => {
                            completed = completed.wrapping_add(1);
                            if self.settings.sweep_every > 0 && completed % self.settings.sweep_every == 0 {
                                self.controller.sweep(self.now());
                            }
                            self.settings.poll_interval
                        }
                        Err(err) => {
                            tracing::warn!(
                                error = %err,
                                retry_in_secs = self.settings.retry_delay.as_secs_f64(),
                                "task fetch failed"
                            );
                            self.settings.retry_delay
                        }
                    };
                    next_cycle = Instant::now() + delay;
                }
            }
        }

        while let Ok(event) = actions_rx.try_recv() {
            self.resolve(&event);
        }
        tracing::info!("poll driver stopped");
    }
}
