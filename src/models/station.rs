use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::serde_helpers::{deserialize_id, deserialize_string_or_number};
use super::text;
use crate::record::Record;
use crate::validation::{check_phone, require_length, require_present, FieldError};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    #[serde(
        rename = "_id",
        default,
        deserialize_with = "deserialize_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub contact_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_charge: Option<String>,
    /// Fields this client does not model, sent back untouched on update.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Station {
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            location: Some(location.into()),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

impl Record for Station {
    const COLLECTION: &'static str = "stations";
    const LABEL: &'static str = "station";
    const SEARCH_FIELD: &'static str = "name";
    const FILTER_FIELDS: &'static [&'static str] = &["location"];
    const COLUMNS: &'static [&'static str] = &["Name", "Location", "Contact", "In charge"];

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn field(&self, key: &str, _today: NaiveDate) -> Option<String> {
        match key {
            "_id" | "id" => self.id.clone(),
            "name" => self.name.clone(),
            "location" => self.location.clone(),
            "contactNumber" => self.contact_number.clone(),
            "inCharge" => self.in_charge.clone(),
            _ => None,
        }
    }

    fn row(&self, _today: NaiveDate) -> Vec<String> {
        vec![
            text(&self.name),
            text(&self.location),
            text(&self.contact_number),
            text(&self.in_charge),
        ]
    }

    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        require_length(&mut errors, "name", self.name.as_deref(), 2, 100);
        require_present(&mut errors, "location", self.location.as_deref());
        check_phone(&mut errors, "contactNumber", self.contact_number.as_deref());
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_fields_survive_round_trip() {
        let json = r#"{"_id":"s1","name":"Central Station","location":"Ward 4","contactNumber":9876543210,"__v":0,"coordinates":[12.9,77.6]}"#;
        let station: Station = serde_json::from_str(json).unwrap();
        assert_eq!(station.contact_number.as_deref(), Some("9876543210"));
        assert_eq!(station.extra.get("__v"), Some(&Value::from(0)));

        let back = serde_json::to_value(&station).unwrap();
        assert_eq!(back["coordinates"], serde_json::json!([12.9, 77.6]));
        assert_eq!(back["_id"], "s1");
    }

    #[test]
    fn draft_omits_identifier() {
        let draft = Station::new("North Station", "Ward 9");
        let value = serde_json::to_value(&draft).unwrap();
        assert!(value.get("_id").is_none());
        assert!(draft.validate().is_empty());
    }

    #[test]
    fn missing_name_is_reported() {
        let errors = Station::default().validate();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["name", "location"]);
    }
}
