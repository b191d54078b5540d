use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::serde_helpers::{deserialize_id, deserialize_string_or_number};
use super::text;
use crate::record::Record;
use crate::validation::{
    check_badge, check_image, check_phone, require_length, require_present, FieldError,
};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constable {
    #[serde(
        rename = "_id",
        default,
        deserialize_with = "deserialize_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub badge_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub police_station: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub phone: Option<String>,
    /// Photo as a base64 data URL, passed through as-is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Constable {
    pub fn new(
        name: impl Into<String>,
        badge_number: impl Into<String>,
        police_station: impl Into<String>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            badge_number: Some(badge_number.into()),
            police_station: Some(police_station.into()),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_rank(mut self, rank: impl Into<String>) -> Self {
        self.rank = Some(rank.into());
        self
    }
}

impl Record for Constable {
    const COLLECTION: &'static str = "constables";
    const LABEL: &'static str = "constable";
    const SEARCH_FIELD: &'static str = "name";
    const FILTER_FIELDS: &'static [&'static str] = &["policeStation", "rank", "category"];
    const COLUMNS: &'static [&'static str] =
        &["Name", "Badge", "Station", "Rank", "Category", "Phone", "Photo"];

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn field(&self, key: &str, _today: NaiveDate) -> Option<String> {
        match key {
            "_id" | "id" => self.id.clone(),
            "name" => self.name.clone(),
            "badgeNumber" => self.badge_number.clone(),
            "policeStation" => self.police_station.clone(),
            "rank" => self.rank.clone(),
            "category" => self.category.clone(),
            "phone" => self.phone.clone(),
            _ => None,
        }
    }

    fn row(&self, _today: NaiveDate) -> Vec<String> {
        let photo = if self.image.as_deref().is_some_and(|i| !i.is_empty()) {
            "yes"
        } else {
            "-"
        };
        vec![
            text(&self.name),
            text(&self.badge_number),
            text(&self.police_station),
            text(&self.rank),
            text(&self.category),
            text(&self.phone),
            photo.to_string(),
        ]
    }

    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        require_length(&mut errors, "name", self.name.as_deref(), 2, 100);
        check_badge(&mut errors, "badgeNumber", self.badge_number.as_deref());
        require_present(&mut errors, "policeStation", self.police_station.as_deref());
        check_phone(&mut errors, "phone", self.phone.as_deref());
        check_image(&mut errors, "image", self.image.as_deref());
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_payload_is_not_touched() {
        let image = "data:image/jpeg;base64,/9j/4AAQSkZJRgABAQ==";
        let json = serde_json::json!({
            "_id": "c1",
            "name": "R. Kumar",
            "badgeNumber": 4411,
            "policeStation": "Central Station",
            "image": image,
        });
        let constable: Constable = serde_json::from_value(json).unwrap();
        assert!(constable.validate().is_empty());
        assert_eq!(serde_json::to_value(&constable).unwrap()["image"], image);
    }

    #[test]
    fn filter_fields_resolve() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let c = Constable::new("A. Singh", "B-12", "North Station").with_rank("Head Constable");
        assert_eq!(c.field("rank", today).as_deref(), Some("Head Constable"));
        assert_eq!(c.field("category", today), None);
        assert_eq!(c.row(today).last().map(String::as_str), Some("-"));
    }
}
