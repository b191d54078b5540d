//! Client-side form checks run before any request is sent.
//!
//! Each entity collects its problems into a `Vec<FieldError>`; an empty vector
//! means the draft may be submitted. Errors carry the wire name of the field
//! so a form can render them inline next to the offending input.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;

use crate::status::parse_date;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.message)
    }
}

/// Required field whose trimmed length must fall within `min..=max` characters.
pub fn require_length(
    errors: &mut Vec<FieldError>,
    field: &'static str,
    value: Option<&str>,
    min: usize,
    max: usize,
) {
    match value.map(str::trim) {
        None | Some("") => errors.push(FieldError::new(field, "is required")),
        Some(v) => {
            let len = v.chars().count();
            if len < min || len > max {
                errors.push(FieldError::new(
                    field,
                    format!("must be between {min} and {max} characters"),
                ));
            }
        }
    }
}

pub fn require_present(errors: &mut Vec<FieldError>, field: &'static str, value: Option<&str>) {
    if value.map(str::trim).unwrap_or_default().is_empty() {
        errors.push(FieldError::new(field, "is required"));
    }
}

/// Optional phone number: 7-15 digits with an optional leading `+`.
pub fn check_phone(errors: &mut Vec<FieldError>, field: &'static str, value: Option<&str>) {
    let Some(v) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return;
    };
    let digits = v.strip_prefix('+').unwrap_or(v);
    let ok = (7..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit());
    if !ok {
        errors.push(FieldError::new(field, "must be 7 to 15 digits"));
    }
}

pub fn check_badge(errors: &mut Vec<FieldError>, field: &'static str, value: Option<&str>) {
    match value.map(str::trim) {
        None | Some("") => errors.push(FieldError::new(field, "is required")),
        Some(v) => {
            let ok = v.len() <= 20 && v.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
            if !ok {
                errors.push(FieldError::new(
                    field,
                    "must be at most 20 letters, digits or dashes",
                ));
            }
        }
    }
}

pub fn check_email(errors: &mut Vec<FieldError>, field: &'static str, value: Option<&str>) {
    match value.map(str::trim) {
        None | Some("") => errors.push(FieldError::new(field, "is required")),
        Some(v) if !is_email(v) => errors.push(FieldError::new(field, "is not a valid email")),
        Some(_) => {}
    }
}

/// `local@domain.tld` with no whitespace.
pub fn is_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

/// Optional `data:<mime>;base64,<payload>` image. The payload is decoded only
/// to check it, the stored value is left untouched.
pub fn check_image(errors: &mut Vec<FieldError>, field: &'static str, value: Option<&str>) {
    let Some(v) = value.filter(|v| !v.is_empty()) else {
        return;
    };
    let payload = v
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
        .filter(|(header, _)| header.ends_with(";base64"))
        .map(|(_, payload)| payload);

    match payload {
        Some(p) if STANDARD.decode(p.trim()).is_ok() => {}
        Some(_) => errors.push(FieldError::new(field, "is not valid base64")),
        None => errors.push(FieldError::new(field, "must be a base64 data URL")),
    }
}

/// Either a single duty date or a complete `from`..`to` range, all parseable,
/// with the range in order.
pub fn check_duty_dates(
    errors: &mut Vec<FieldError>,
    duty_date: Option<&str>,
    from_date: Option<&str>,
    to_date: Option<&str>,
) {
    fn present(v: Option<&str>) -> Option<&str> {
        v.map(str::trim).filter(|v| !v.is_empty())
    }
    let (duty_date, from_date, to_date) = (present(duty_date), present(from_date), present(to_date));

    if duty_date.is_none() && from_date.is_none() && to_date.is_none() {
        errors.push(FieldError::new("dutyDate", "or a from/to range is required"));
        return;
    }

    if let Some(d) = duty_date {
        if parse_date(d).is_none() {
            errors.push(FieldError::new("dutyDate", "is not a valid date"));
        }
    }

    match (from_date, to_date) {
        (None, None) => {}
        (Some(_), None) => errors.push(FieldError::new("toDate", "is required with fromDate")),
        (None, Some(_)) => errors.push(FieldError::new("fromDate", "is required with toDate")),
        (Some(from), Some(to)) => match (parse_date(from), parse_date(to)) {
            (Some(f), Some(t)) if f > t => {
                errors.push(FieldError::new("toDate", "must not be before fromDate"))
            }
            (Some(_), Some(_)) => {}
            (f, t) => {
                if f.is_none() {
                    errors.push(FieldError::new("fromDate", "is not a valid date"));
                }
                if t.is_none() {
                    errors.push(FieldError::new("toDate", "is not a valid date"));
                }
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_bounds() {
        let mut errors = Vec::new();
        require_length(&mut errors, "name", Some("A"), 2, 100);
        require_length(&mut errors, "name", None, 2, 100);
        require_length(&mut errors, "name", Some("Central"), 2, 100);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[1].message, "is required");
    }

    #[test]
    fn phone_rules() {
        let mut errors = Vec::new();
        check_phone(&mut errors, "phone", Some("+919876543210"));
        check_phone(&mut errors, "phone", None);
        check_phone(&mut errors, "phone", Some("12-34"));
        assert_eq!(errors, vec![FieldError::new("phone", "must be 7 to 15 digits")]);
    }

    #[test]
    fn email_shapes() {
        assert!(is_email("admin@police.gov.in"));
        assert!(!is_email("admin@police"));
        assert!(!is_email("@police.in"));
        assert!(!is_email("ad min@police.in"));
        assert!(!is_email("a@b@c.in"));
    }

    #[test]
    fn image_must_be_base64_data_url() {
        let mut errors = Vec::new();
        check_image(&mut errors, "image", Some("data:image/png;base64,aGVsbG8="));
        assert!(errors.is_empty());

        check_image(&mut errors, "image", Some("data:image/png;base64,@@@"));
        check_image(&mut errors, "image", Some("https://example.com/a.png"));
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[1].message, "must be a base64 data URL");
    }

    #[test]
    fn duty_range_order() {
        let mut errors = Vec::new();
        check_duty_dates(&mut errors, None, Some("2024-05-10"), Some("2024-05-01"));
        assert_eq!(errors, vec![FieldError::new("toDate", "must not be before fromDate")]);

        errors.clear();
        check_duty_dates(&mut errors, Some("2024-05-10"), None, None);
        assert!(errors.is_empty());

        errors.clear();
        check_duty_dates(&mut errors, None, None, None);
        assert_eq!(errors[0].field, "dutyDate");
    }
}
