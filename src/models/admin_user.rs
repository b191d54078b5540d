use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::serde_helpers::deserialize_id;
use super::text;
use crate::record::Record;
use crate::validation::{check_email, require_length, FieldError};

const PASSWORD_MASK: &str = "********";

/// Admin login credential as stored by the API.
#[derive(Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    #[serde(
        rename = "_id",
        default,
        deserialize_with = "deserialize_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl std::fmt::Debug for AdminUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminUser")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| PASSWORD_MASK))
            .field("role", &self.role)
            .finish()
    }
}

impl AdminUser {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            password: Some(password.into()),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

impl Record for AdminUser {
    const COLLECTION: &'static str = "admins";
    const LABEL: &'static str = "admin user";
    const SEARCH_FIELD: &'static str = "email";
    const FILTER_FIELDS: &'static [&'static str] = &["role"];
    const COLUMNS: &'static [&'static str] = &["Email", "Role", "Password"];

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn field(&self, key: &str, _today: NaiveDate) -> Option<String> {
        match key {
            "_id" | "id" => self.id.clone(),
            "email" => self.email.clone(),
            "role" => self.role.clone(),
            _ => None,
        }
    }

    fn row(&self, _today: NaiveDate) -> Vec<String> {
        vec![
            text(&self.email),
            text(&self.role),
            PASSWORD_MASK.to_string(),
        ]
    }

    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_email(&mut errors, "email", self.email.as_deref());
        require_length(&mut errors, "password", self.password.as_deref(), 6, 128);
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_never_rendered() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let admin = AdminUser::new("chief@police.gov.in", "hunter22");
        assert!(!admin.row(today).iter().any(|c| c.contains("hunter22")));
        assert!(!format!("{admin:?}").contains("hunter22"));
        assert_eq!(admin.field("password", today), None);
    }

    #[test]
    fn short_password_rejected() {
        let errors = AdminUser::new("chief@police.gov.in", "abc").validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "password");
    }
}
