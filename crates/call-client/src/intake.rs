//! Join intake form.
//!
//! Collects a display name and a room URL. Validation only checks that both
//! are non-empty after trimming; creating the transport and joining belongs to
//! the shell.

use crate::errors::IntakeError;

use serde::{Deserialize, Serialize};

/// A validated request to join a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    pub user_name: String,
    pub url: String,
}

impl JoinRequest {
    /// Validate raw form values.
    pub fn new(user_name: &str, url: &str) -> Result<Self, IntakeError> {
        let user_name = user_name.trim();
        let url = url.trim();
        if user_name.is_empty() {
            return Err(IntakeError::MissingName);
        }
        if url.is_empty() {
            return Err(IntakeError::MissingUrl);
        }
        Ok(Self {
            user_name: user_name.to_string(),
            url: url.to_string(),
        })
    }
}

/// Form buffers for the pre-join screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinIntake {
    name: String,
    url: String,
}

impl JoinIntake {
    /// Create an empty form.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the display name buffer.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Set the room URL buffer.
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    /// Current display name buffer.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current room URL buffer.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Validate the form. On success the buffers are cleared.
    pub fn submit(&mut self) -> Result<JoinRequest, IntakeError> {
        let request = JoinRequest::new(&self.name, &self.url)?;
        self.reset();
        Ok(request)
    }

    /// Clear both buffers.
    pub fn reset(&mut self) {
        self.name.clear();
        self.url.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_trims_and_clears() {
        let mut intake = JoinIntake::new();
        intake.set_name("  Alice ");
        intake.set_url(" https://example.test/R1\n");

        let request = intake.submit().unwrap();

        assert_eq!(request.user_name, "Alice");
        assert_eq!(request.url, "https://example.test/R1");
        assert!(intake.name().is_empty());
        assert!(intake.url().is_empty());
    }

    #[test]
    fn test_missing_fields_keep_buffers() {
        let mut intake = JoinIntake::new();
        intake.set_name("   ");
        intake.set_url("https://example.test/R1");
        assert_eq!(intake.submit(), Err(IntakeError::MissingName));
        assert_eq!(intake.url(), "https://example.test/R1");

        intake.set_name("Alice");
        intake.set_url("");
        assert_eq!(intake.submit(), Err(IntakeError::MissingUrl));
        assert_eq!(intake.name(), "Alice");
    }
}
