// Serde helpers for record fields the API sends in more than one JSON shape.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Deserializes an optional identifier from a string, a number, or a
/// Mongo-style `{"$oid": "..."}` object.
pub fn deserialize_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Object(map)) => match map.get("$oid") {
            Some(Value::String(s)) => Ok(Some(s.clone())),
            _ => Err(serde::de::Error::custom("identifier object without $oid")),
        },
        Some(other) => Err(serde::de::Error::custom(format!(
            "unsupported identifier: {other}"
        ))),
    }
}

/// Deserializes an optional text field that may arrive as a JSON number
/// (badge numbers, phone numbers).
pub fn deserialize_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TextFormat {
        Text(String),
        Number(serde_json::Number),
    }

    let value = Option::<TextFormat>::deserialize(deserializer)?;
    Ok(value.map(|v| match v {
        TextFormat::Text(s) => s,
        TextFormat::Number(n) => n.to_string(),
    }))
}
