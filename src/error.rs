use std::time::Duration;

use thiserror::Error;

use crate::validation::FieldError;

/// Failures talking to the REST backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network, DNS or TLS failure from the underlying HTTP client.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("server returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The body could not be decoded into the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// A collection name that matches none of the administered entities.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown entity {0:?} (expected stations, constables, duties or admins)")]
pub struct UnknownEntity(pub String);

/// Failures surfaced by a record list controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// The initial load failed; shown as a page-level message.
    #[error("failed to load {collection}: {source}")]
    Fetch {
        collection: &'static str,
        #[source]
        source: ApiError,
    },

    /// A create, update or delete was rejected or never reached the server.
    #[error("failed to {action} {label}: {source}")]
    Mutation {
        action: &'static str,
        label: &'static str,
        #[source]
        source: ApiError,
    },

    /// The server accepted a mutation but echoed back an unusable record.
    #[error("server response for {label} is missing an identifier")]
    MissingIdentifier { label: &'static str },

    #[error("validation failed: {}", format_field_errors(.0))]
    Validation(Vec<FieldError>),

    #[error("no pending action for record {id}")]
    NoPendingAction { id: String },

    #[error("an action is already in flight for record {id}")]
    ActionInFlight { id: String },

    #[error("controller was unmounted")]
    Cancelled,
}

impl ControllerError {
    /// Inline field errors for a failed validation, empty otherwise.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            ControllerError::Validation(errors) => errors,
            _ => &[],
        }
    }
}

fn format_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("not signed in")]
    NotSignedIn,

    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    #[error("session file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("session file is corrupt: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_display() {
        let err = ApiError::Status {
            status: 404,
            message: "Duty not found".to_string(),
        };
        assert_eq!(err.to_string(), "server returned HTTP 404: Duty not found");
    }

    #[test]
    fn validation_error_lists_fields() {
        let err = ControllerError::Validation(vec![
            FieldError::new("name", "is required"),
            FieldError::new("location", "is required"),
        ]);
        assert_eq!(
            err.to_string(),
            "validation failed: name is required; location is required"
        );
        assert_eq!(err.field_errors().len(), 2);
    }

    #[test]
    fn mutation_error_names_action() {
        let err = ControllerError::Mutation {
            action: "delete",
            label: "duty",
            source: ApiError::Timeout(Duration::from_secs(15)),
        };
        assert!(err.to_string().starts_with("failed to delete duty"));
        assert!(err.field_errors().is_empty());
    }
}
