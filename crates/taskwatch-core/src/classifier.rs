//! Urgency classification.
//!
//! A task is first checked against the terminal-status set, then against the
//! service's own overdue flag, and only then against its due date. Date
//! extraction walks a fixed list of candidate fields and a fixed table of
//! formats; anything that does not parse counts as "no due date", which
//! classifies as [`UrgencyCategory::Current`]. Classification cannot fail.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::task::Task;

/// Labels treated as closed when nothing else is configured.
pub const DEFAULT_TERMINAL_STATUSES: [&str; 4] = ["Done", "Cancelled", "Closed", "Completed"];

/// How pressing a task is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyCategory {
    /// Due date in the past, or flagged overdue by the service.
    Overdue,
    /// Due today or tomorrow.
    Urgent,
    /// Due later, or no usable due date.
    Current,
}

impl UrgencyCategory {
    pub const ALL: [UrgencyCategory; 3] = [
        UrgencyCategory::Overdue,
        UrgencyCategory::Urgent,
        UrgencyCategory::Current,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            UrgencyCategory::Overdue => "overdue",
            UrgencyCategory::Urgent => "urgent",
            UrgencyCategory::Current => "current",
        }
    }

    /// Short snoozes are only offered for pressing tasks.
    pub fn allows_snooze(self) -> bool {
        matches!(self, UrgencyCategory::Overdue | UrgencyCategory::Urgent)
    }
}

impl fmt::Display for UrgencyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UrgencyCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overdue" => Ok(UrgencyCategory::Overdue),
            "urgent" => Ok(UrgencyCategory::Urgent),
            "current" => Ok(UrgencyCategory::Current),
            other => Err(format!("unknown urgency category: {other}")),
        }
    }
}

/// Outcome of classifying one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// Status is terminal; the task never produces a notification.
    Excluded,
    Category(UrgencyCategory),
}

impl Classification {
    pub fn category(self) -> Option<UrgencyCategory> {
        match self {
            Classification::Excluded => None,
            Classification::Category(c) => Some(c),
        }
    }
}

/// Years below this come from `%Y` swallowing a two-digit year.
const MIN_PLAUSIBLE_YEAR: i32 = 1000;

/// One entry of the date-format table.
#[derive(Debug, Clone, Copy)]
enum DateFormat {
    /// Full RFC 3339 timestamp (`2026-10-15T18:00:00Z`).
    Rfc3339,
    /// Offset datetime without seconds; a trailing `Z` is read as `+00:00`.
    OffsetDateTime(&'static str),
    NaiveDateTime(&'static str),
    Date(&'static str),
    /// Unix seconds, all digits.
    EpochSeconds,
}

const DATE_FORMATS: &[DateFormat] = &[
    DateFormat::Rfc3339,
    DateFormat::OffsetDateTime("%Y-%m-%dT%H:%M%:z"),
    DateFormat::NaiveDateTime("%Y-%m-%dT%H:%M:%S%.f"),
    DateFormat::NaiveDateTime("%Y-%m-%dT%H:%M"),
    DateFormat::NaiveDateTime("%Y-%m-%d %H:%M:%S"),
    DateFormat::Date("%Y-%m-%d"),
    DateFormat::Date("%d-%m-%Y"),
    DateFormat::NaiveDateTime("%d-%m-%Y %H:%M"),
    DateFormat::Date("%d-%m-%y"),
    DateFormat::Date("%d.%m.%Y"),
    DateFormat::NaiveDateTime("%d.%m.%Y %H:%M"),
    DateFormat::Date("%d.%m.%y"),
    DateFormat::EpochSeconds,
];

impl DateFormat {
    fn parse(self, input: &str) -> Option<NaiveDate> {
        self.parse_raw(input)
            .filter(|date| date.year() >= MIN_PLAUSIBLE_YEAR)
    }

    fn parse_raw(self, input: &str) -> Option<NaiveDate> {
        match self {
            DateFormat::Rfc3339 => DateTime::parse_from_rfc3339(input)
                .ok()
                .map(|dt| dt.date_naive()),
            DateFormat::OffsetDateTime(pattern) => {
                let normalized = match input.strip_suffix('Z') {
                    Some(head) => format!("{head}+00:00"),
                    None => input.to_string(),
                };
                DateTime::parse_from_str(&normalized, pattern)
                    .ok()
                    .map(|dt| dt.date_naive())
            }
            DateFormat::NaiveDateTime(pattern) => NaiveDateTime::parse_from_str(input, pattern)
                .ok()
                .map(|dt| dt.date()),
            DateFormat::Date(pattern) => NaiveDate::parse_from_str(input, pattern).ok(),
            DateFormat::EpochSeconds => {
                if input.is_empty() || !input.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                let secs: i64 = input.parse().ok()?;
                DateTime::from_timestamp(secs, 0).map(|dt| dt.date_naive())
            }
        }
    }
}

/// Parse a single due-date string with the format table.
///
/// Returns `None` for empty or unrecognised input.
pub fn parse_due_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    DATE_FORMATS.iter().find_map(|format| format.parse(input))
}

/// Candidate due-date strings in priority order.
fn due_date_candidates(task: &Task) -> impl Iterator<Item = &str> {
    let structured = task.due.iter().flat_map(|due| {
        [
            due.datetime.as_deref(),
            due.date.as_deref(),
            due.epoch_seconds.as_deref(),
        ]
    });
    structured
        .chain(std::iter::once(task.end_date.as_deref()))
        .flatten()
}

/// First due date that parses, if any.
pub fn extract_due_date(task: &Task) -> Option<NaiveDate> {
    for candidate in due_date_candidates(task) {
        if let Some(date) = parse_due_date(candidate) {
            return Some(date);
        }
        if !candidate.trim().is_empty() {
            tracing::debug!(task_id = %task.id, value = candidate, "unparsable due date");
        }
    }
    None
}

/// Maps a task and the current calendar date to a [`Classification`].
#[derive(Debug, Clone)]
pub struct TaskClassifier {
    /// Lowercased, trimmed terminal labels.
    terminal_statuses: HashSet<String>,
}

impl Default for TaskClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_TERMINAL_STATUSES)
    }
}

impl TaskClassifier {
    pub fn new<I, S>(terminal_statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            terminal_statuses: terminal_statuses
                .into_iter()
                .map(|s| normalize_status(s.as_ref()))
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn is_terminal(&self, status: Option<&str>) -> bool {
        status
            .map(normalize_status)
            .is_some_and(|s| self.terminal_statuses.contains(&s))
    }

    /// Classify `task` relative to `today`.
    ///
    /// Urgent covers today and tomorrow by calendar date, not by elapsed
    /// hours.
    pub fn classify(&self, task: &Task, today: NaiveDate) -> Classification {
        if self.is_terminal(task.status.as_deref()) {
            return Classification::Excluded;
        }
        if task.overdue == Some(true) {
            return Classification::Category(UrgencyCategory::Overdue);
        }

        let Some(due) = extract_due_date(task) else {
            return Classification::Category(UrgencyCategory::Current);
        };

        let tomorrow = today.succ_opt().unwrap_or(today);
        let category = if due < today {
            UrgencyCategory::Overdue
        } else if due <= tomorrow {
            UrgencyCategory::Urgent
        } else {
            UrgencyCategory::Current
        };
        Classification::Category(category)
    }
}

fn normalize_status(status: &str) -> String {
    status.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::DueDate;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 15).unwrap()
    }

    fn classify(task: &Task) -> Classification {
        TaskClassifier::default().classify(task, today())
    }

    #[test]
    fn parses_every_supported_format() {
        let expected = NaiveDate::from_ymd_opt(2026, 10, 15).unwrap();
        for input in [
            "2026-10-15T18:00:00Z",
            "2026-10-15T18:00:00+03:00",
            "2026-10-15T18:00Z",
            "2026-10-15T18:00+03:00",
            "2026-10-15T18:00:00",
            "2026-10-15T18:00:00.250",
            "2026-10-15T18:00",
            "2026-10-15 18:00:00",
            "2026-10-15",
            "15-10-2026",
            "15-10-2026 18:00",
            "15-10-26",
            "15.10.2026",
            "15.10.2026 09:30",
            "15.10.26",
            "  15.10.2026  ",
        ] {
            assert_eq!(parse_due_date(input), Some(expected), "input: {input}");
        }
    }

    #[test]
    fn single_digit_day_parses() {
        assert_eq!(
            parse_due_date("5-10-2026"),
            NaiveDate::from_ymd_opt(2026, 10, 5)
        );
    }

    #[test]
    fn epoch_seconds_parse_as_utc_date() {
        // 2026-10-15T12:00:00Z
        assert_eq!(parse_due_date("1792065600"), Some(today()));
    }

    #[test]
    fn datetime_keeps_its_own_offset_date() {
        // 22:00 UTC on the 15th, but the 16th in the timestamp's own offset.
        assert_eq!(
            parse_due_date("2026-10-16T01:00:00+03:00"),
            NaiveDate::from_ymd_opt(2026, 10, 16)
        );
    }

    #[test]
    fn garbage_and_empty_input_yield_none() {
        for input in ["", "   ", "soon", "32-13-2026", "2026/10/15", "15-10", "-12"] {
            assert_eq!(parse_due_date(input), None, "input: {input}");
        }
    }

    #[test]
    fn two_digit_year_is_not_read_as_a_four_digit_year() {
        let date = parse_due_date("01-02-27").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2027, 2, 1).unwrap());
    }

    #[test]
    fn terminal_status_is_excluded_even_when_overdue() {
        let task = Task::new("1", "t")
            .with_status("Done")
            .with_overdue_flag(true)
            .with_due_date("2020-01-01");
        assert_eq!(classify(&task), Classification::Excluded);
    }

    #[test]
    fn terminal_status_match_ignores_case_and_padding() {
        let task = Task::new("1", "t").with_status("  cancelled ");
        assert_eq!(classify(&task), Classification::Excluded);
    }

    #[test]
    fn configured_terminal_labels_replace_defaults() {
        let classifier = TaskClassifier::new(["Выполненная", "Отменена"]);
        let closed = Task::new("1", "t").with_status("Выполненная");
        let done = Task::new("2", "t").with_status("Done");
        assert_eq!(classifier.classify(&closed, today()), Classification::Excluded);
        assert_eq!(
            classifier.classify(&done, today()),
            Classification::Category(UrgencyCategory::Current)
        );
    }

    #[test]
    fn overdue_flag_short_circuits_dates() {
        let task = Task::new("1", "t")
            .with_overdue_flag(true)
            .with_due_date("2030-01-01");
        assert_eq!(classify(&task), Classification::Category(UrgencyCategory::Overdue));
    }

    #[test]
    fn unset_overdue_flag_falls_back_to_dates() {
        let task = Task::new("1", "t")
            .with_overdue_flag(false)
            .with_due_date("2030-01-01");
        assert_eq!(classify(&task), Classification::Category(UrgencyCategory::Current));
    }

    #[test]
    fn date_boundaries() {
        let cases = [
            ("14-10-2026", UrgencyCategory::Overdue),
            ("15-10-2026", UrgencyCategory::Urgent),
            ("16-10-2026", UrgencyCategory::Urgent),
            ("17-10-2026", UrgencyCategory::Current),
        ];
        for (date, expected) in cases {
            let task = Task::new("1", "t").with_due_date(date);
            assert_eq!(classify(&task), Classification::Category(expected), "date: {date}");
        }
    }

    #[test]
    fn urgent_uses_calendar_date_not_elapsed_hours() {
        // Late tomorrow night is more than 24h away but still urgent.
        let mut task = Task::new("1", "t");
        task.due = Some(DueDate {
            datetime: Some("2026-10-16T23:59:00".into()),
            ..DueDate::default()
        });
        assert_eq!(classify(&task), Classification::Category(UrgencyCategory::Urgent));
    }

    #[test]
    fn unparsable_structured_fields_fall_through_to_legacy_field() {
        let mut task = Task::new("1", "t").with_end_date("2026-10-10");
        task.due = Some(DueDate {
            datetime: Some("not a date".into()),
            date: Some("".into()),
            epoch_seconds: None,
        });
        assert_eq!(classify(&task), Classification::Category(UrgencyCategory::Overdue));
    }

    #[test]
    fn structured_date_wins_over_legacy_field() {
        let task = Task::new("1", "t")
            .with_due_date("20-10-2026")
            .with_end_date("2026-10-10");
        assert_eq!(classify(&task), Classification::Category(UrgencyCategory::Current));
    }

    #[test]
    fn malformed_dates_default_to_current() {
        let task = Task::new("1", "t")
            .with_due_date("tomorrow-ish")
            .with_end_date("??");
        assert_eq!(classify(&task), Classification::Category(UrgencyCategory::Current));
    }

    #[test]
    fn unknown_status_without_date_is_current() {
        let task = Task::new("1", "t").with_status("Waiting for vendor");
        assert_eq!(classify(&task), Classification::Category(UrgencyCategory::Current));
    }

    #[test]
    fn category_round_trips_through_from_str() {
        for category in UrgencyCategory::ALL {
            assert_eq!(category.as_str().parse::<UrgencyCategory>(), Ok(category));
        }
        assert!("later".parse::<UrgencyCategory>().is_err());
    }

    #[test]
    fn snooze_offered_only_for_pressing_categories() {
        assert!(UrgencyCategory::Overdue.allows_snooze());
        assert!(UrgencyCategory::Urgent.allows_snooze());
        assert!(!UrgencyCategory::Current.allows_snooze());
    }
}
