//! # Taskwatch Core Library
//!
//! Core logic for taskwatch, a desktop reminder for tasks tracked in a remote
//! service. The CLI binary is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Classifier**: maps a task and today's date to an urgency category
//! - **Suppression**: per-task snooze / acknowledgement records
//! - **Window limiter**: global and per-category caps on open notifications
//! - **Lifecycle**: decides, once per poll cycle, which tasks to show
//! - **Driver**: tokio loop that polls a [`TaskSource`] and feeds a
//!   [`NotificationSurface`]
//! - **Storage**: TOML configuration
//!
//! ## Key Components
//!
//! - [`LifecycleController`]: evaluate / resolve / sweep
//! - [`PollDriver`]: periodic polling loop
//! - [`Config`]: application configuration

pub mod classifier;
pub mod credentials;
pub mod driver;
pub mod error;
pub mod lifecycle;
pub mod notice;
pub mod source;
pub mod storage;
pub mod suppression;
pub mod task;
pub mod window_limiter;

pub use classifier::{Classification, TaskClassifier, UrgencyCategory};
pub use driver::{ActionEvent, ActionSender, DriverSettings, NotificationSurface, PollDriver};
pub use error::{ConfigError, CoreError, SourceError};
pub use lifecycle::{
    CalendarZone, CategoryCounts, CategoryToggles, CycleStats, LifecycleController, Notice,
    NotificationSummary,
};
pub use notice::{NoticeContent, NoticeOptions};
pub use source::{
    check_connection, FilteredSource, HttpTaskSource, JsonFileSource, RoleFilter, StaticSource,
    TaskSource,
};
pub use storage::{Config, SourceKind};
pub use suppression::{ReshowPolicy, SuppressionRecord, SuppressionStore, UserAction};
pub use task::{DueDate, Role, Task, TaskId, UserRef};
pub use window_limiter::{DisplayedWindow, WindowCaps, WindowLimiter};
