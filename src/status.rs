//! Derived duty status and the clock it is computed against.
//!
//! A duty's status is never read from the stored record: it is recomputed from
//! its dates every time it is shown or filtered on, through [`DutyStatus::derive`].

use std::fmt;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Source of "today" for status derivation.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall clock in the local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock pinned to one day, for tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DutyStatus {
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
}

impl DutyStatus {
    pub const ALL: [DutyStatus; 3] = [
        DutyStatus::Pending,
        DutyStatus::InProgress,
        DutyStatus::Completed,
    ];

    /// Status of a duty on `today`.
    ///
    /// The end of the duty is `to_date`, falling back to `duty_date`; it is
    /// completed once that day is strictly in the past. Otherwise the duty is
    /// pending until its start (`from_date`, falling back to `duty_date`) and
    /// in progress from then on. A duty with no usable date is pending.
    pub fn derive(
        duty_date: Option<&str>,
        from_date: Option<&str>,
        to_date: Option<&str>,
        today: NaiveDate,
    ) -> DutyStatus {
        let duty_date = duty_date.and_then(parse_date);
        let end = to_date.and_then(parse_date).or(duty_date);
        let start = from_date.and_then(parse_date).or(duty_date);

        match (start, end) {
            (_, Some(end)) if end < today => DutyStatus::Completed,
            (Some(start), _) if start > today => DutyStatus::Pending,
            (None, None) => DutyStatus::Pending,
            _ => DutyStatus::InProgress,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DutyStatus::Pending => "Pending",
            DutyStatus::InProgress => "In Progress",
            DutyStatus::Completed => "Completed",
        }
    }

    /// Case-insensitive parse of a label, also accepting `in_progress`/`in-progress`.
    pub fn from_label(label: &str) -> Option<DutyStatus> {
        let normalized: String = label
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "pending" => Some(DutyStatus::Pending),
            "inprogress" => Some(DutyStatus::InProgress),
            "completed" => Some(DutyStatus::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for DutyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Calendar day of a wire date, ignoring any time of day.
///
/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps and offset-less
/// `YYYY-MM-DDTHH:MM:SS[.fff]`. Anything else yields `None`.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.date_naive());
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|ts| ts.date())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn completed_when_end_strictly_before_today() {
        let today = day("2024-06-10");
        assert_eq!(
            DutyStatus::derive(None, Some("2024-06-01"), Some("2024-06-09"), today),
            DutyStatus::Completed
        );
        // Ends today: still running.
        assert_eq!(
            DutyStatus::derive(None, Some("2024-06-01"), Some("2024-06-10"), today),
            DutyStatus::InProgress
        );
    }

    #[test]
    fn time_of_day_is_ignored() {
        let today = day("2024-06-10");
        assert_eq!(
            DutyStatus::derive(Some("2024-06-10T23:59:00.000Z"), None, None, today),
            DutyStatus::InProgress
        );
        assert_eq!(
            DutyStatus::derive(Some("2024-06-09T23:59:59"), None, None, today),
            DutyStatus::Completed
        );
    }

    #[test]
    fn pending_before_start() {
        let today = day("2024-06-10");
        assert_eq!(
            DutyStatus::derive(None, Some("2024-06-11"), Some("2024-06-20"), today),
            DutyStatus::Pending
        );
        assert_eq!(
            DutyStatus::derive(Some("2024-07-01"), None, None, today),
            DutyStatus::Pending
        );
    }

    #[test]
    fn missing_or_malformed_dates_are_pending() {
        let today = day("2024-06-10");
        assert_eq!(DutyStatus::derive(None, None, None, today), DutyStatus::Pending);
        assert_eq!(
            DutyStatus::derive(Some("soon"), None, Some(""), today),
            DutyStatus::Pending
        );
    }

    #[test]
    fn duty_date_backs_missing_range_end() {
        let today = day("2024-06-10");
        assert_eq!(
            DutyStatus::derive(Some("2024-06-05"), Some("2024-06-01"), None, today),
            DutyStatus::Completed
        );
    }

    #[test]
    fn labels_round_trip() {
        for status in DutyStatus::ALL {
            assert_eq!(DutyStatus::from_label(status.label()), Some(status));
        }
        assert_eq!(DutyStatus::from_label("in_progress"), Some(DutyStatus::InProgress));
        assert_eq!(DutyStatus::from_label("COMPLETED"), Some(DutyStatus::Completed));
        assert_eq!(DutyStatus::from_label("done"), None);
    }
}
