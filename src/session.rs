//! Signed-in state used to gate commands and screens.
//!
//! [`LocalFlagSession`] only records which admin email last signed in, in a
//! small JSON file. It keeps honest users out of screens they have not opened
//! a session for; it is not an authentication mechanism. Call sites depend on
//! [`SessionGuard`] so a token-backed implementation can replace it.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::SessionError;
use crate::validation::is_email;

pub trait SessionGuard {
    /// Email of the signed-in admin, if any.
    fn current_user(&self) -> Result<Option<String>, SessionError>;

    fn sign_in(&mut self, email: &str) -> Result<(), SessionError>;

    fn sign_out(&mut self) -> Result<(), SessionError>;
}

/// Fails with `NotSignedIn` unless a session is open; returns its email.
pub fn require_session(guard: &dyn SessionGuard) -> Result<String, SessionError> {
    guard.current_user()?.ok_or(SessionError::NotSignedIn)
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionFlag {
    user_email: String,
}

#[derive(Debug, Clone)]
pub struct LocalFlagSession {
    path: PathBuf,
}

impl LocalFlagSession {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionGuard for LocalFlagSession {
    fn current_user(&self) -> Result<Option<String>, SessionError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(None);
        }
        let flag: SessionFlag = serde_json::from_str(&raw)?;
        Ok(Some(flag.user_email).filter(|e| !e.is_empty()))
    }

    fn sign_in(&mut self, email: &str) -> Result<(), SessionError> {
        let email = email.trim();
        if !is_email(email) {
            return Err(SessionError::InvalidEmail(email.to_string()));
        }
        let flag = SessionFlag {
            user_email: email.to_string(),
        };
        fs::write(&self.path, serde_json::to_string_pretty(&flag)?)?;
        info!(email, "signed in");
        Ok(())
    }

    fn sign_out(&mut self) -> Result<(), SessionError> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        info!("signed out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_in_and_out() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = LocalFlagSession::new(dir.path().join("session.json"));

        assert!(matches!(require_session(&session), Err(SessionError::NotSignedIn)));

        session.sign_in("chief@police.gov.in").unwrap();
        assert_eq!(require_session(&session).unwrap(), "chief@police.gov.in");

        let raw = fs::read_to_string(session.path()).unwrap();
        assert!(raw.contains("\"userEmail\""));

        session.sign_out().unwrap();
        assert_eq!(session.current_user().unwrap(), None);
        // Signing out twice is harmless.
        session.sign_out().unwrap();
    }

    #[test]
    fn rejects_bad_email() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = LocalFlagSession::new(dir.path().join("session.json"));
        assert!(matches!(
            session.sign_in("not-an-email"),
            Err(SessionError::InvalidEmail(_))
        ));
        assert!(!session.path().exists());
    }

    #[test]
    fn corrupt_flag_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{oops").unwrap();
        let session = LocalFlagSession::new(path);
        assert!(matches!(session.current_user(), Err(SessionError::Json(_))));
    }
}
