use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::serde_helpers::{deserialize_id, deserialize_string_or_number};
use super::{display_date, text};
use crate::record::Record;
use crate::status::DutyStatus;
use crate::validation::{check_badge, check_duty_dates, require_present, FieldError};

/// A duty assignment.
///
/// The API also stores a `status` field; it is kept in `extra` and sent back
/// untouched but never displayed. What users see is [`Duty::display_status`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Duty {
    #[serde(
        rename = "_id",
        default,
        deserialize_with = "deserialize_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub badge_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constable_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub police_station: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duty_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duty_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shift: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Duty {
    pub fn new(badge_number: impl Into<String>, police_station: impl Into<String>) -> Self {
        Self {
            badge_number: Some(badge_number.into()),
            police_station: Some(police_station.into()),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn on(mut self, duty_date: impl Into<String>) -> Self {
        self.duty_date = Some(duty_date.into());
        self
    }

    pub fn between(mut self, from_date: impl Into<String>, to_date: impl Into<String>) -> Self {
        self.from_date = Some(from_date.into());
        self.to_date = Some(to_date.into());
        self
    }

    pub fn display_status(&self, today: NaiveDate) -> DutyStatus {
        DutyStatus::derive(
            self.duty_date.as_deref(),
            self.from_date.as_deref(),
            self.to_date.as_deref(),
            today,
        )
    }

    fn dates(&self) -> String {
        match (&self.from_date, &self.to_date) {
            (Some(_), Some(_)) => format!(
                "{} to {}",
                display_date(&self.from_date),
                display_date(&self.to_date)
            ),
            _ => display_date(&self.duty_date),
        }
    }
}

impl Record for Duty {
    const COLLECTION: &'static str = "duties";
    const LABEL: &'static str = "duty";
    const SEARCH_FIELD: &'static str = "badgeNumber";
    const FILTER_FIELDS: &'static [&'static str] =
        &["policeStation", "dutyType", "shift", "status"];
    const COLUMNS: &'static [&'static str] =
        &["Badge", "Constable", "Station", "Type", "Shift", "Dates", "Status"];

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn field(&self, key: &str, today: NaiveDate) -> Option<String> {
        match key {
            "_id" | "id" => self.id.clone(),
            "badgeNumber" => self.badge_number.clone(),
            "constableName" => self.constable_name.clone(),
            "policeStation" => self.police_station.clone(),
            "dutyType" => self.duty_type.clone(),
            "location" => self.location.clone(),
            "dutyDate" => self.duty_date.clone(),
            "fromDate" => self.from_date.clone(),
            "toDate" => self.to_date.clone(),
            "shift" => self.shift.clone(),
            "status" => Some(self.display_status(today).label().to_string()),
            _ => None,
        }
    }

    fn row(&self, today: NaiveDate) -> Vec<String> {
        vec![
            text(&self.badge_number),
            text(&self.constable_name),
            text(&self.police_station),
            text(&self.duty_type),
            text(&self.shift),
            self.dates(),
            self.display_status(today).label().to_string(),
        ]
    }

    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_badge(&mut errors, "badgeNumber", self.badge_number.as_deref());
        require_present(&mut errors, "policeStation", self.police_station.as_deref());
        check_duty_dates(
            &mut errors,
            self.duty_date.as_deref(),
            self.from_date.as_deref(),
            self.to_date.as_deref(),
        );
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn stored_status_is_ignored() {
        let json = serde_json::json!({
            "_id": "d1",
            "badgeNumber": "B-1",
            "policeStation": "Central Station",
            "fromDate": "2024-03-01",
            "toDate": "2024-03-05",
            "status": "Pending",
        });
        let duty: Duty = serde_json::from_value(json).unwrap();
        let today = day(2024, 3, 10);
        assert_eq!(duty.field("status", today).as_deref(), Some("Completed"));
        assert_eq!(duty.row(today)[6], "Completed");
        // Stored value goes back to the server unchanged.
        assert_eq!(serde_json::to_value(&duty).unwrap()["status"], "Pending");
    }

    #[test]
    fn dates_column() {
        let today = day(2024, 3, 1);
        let ranged = Duty::new("B-1", "X").between("2024-03-01T00:00:00.000Z", "2024-03-05");
        assert_eq!(ranged.row(today)[5], "2024-03-01 to 2024-03-05");
        let single = Duty::new("B-1", "X").on("2024-03-02");
        assert_eq!(single.row(today)[5], "2024-03-02");
        assert_eq!(single.row(today)[6], "Pending");
    }
}
