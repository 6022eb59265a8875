//! Call client error types.
//!
//! Errors map to display-safe messages for the rendering layer. Transport
//! internals are logged but not shown to the user.

use thiserror::Error;

/// Errors reported by a [`CallTransport`](crate::transport::CallTransport).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The transport has already been destroyed.
    #[error("transport destroyed")]
    Destroyed,

    /// The operation requires a joined call.
    #[error("not in a call")]
    NotJoined,

    /// The transport rejected the request.
    #[error("transport rejected request: {0}")]
    Rejected(String),

    /// An application message payload could not be encoded.
    #[error("invalid app message payload: {0}")]
    InvalidPayload(String),
}

/// Join intake validation errors.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum IntakeError {
    /// Display name is empty after trimming.
    #[error("Display name is required")]
    MissingName,

    /// Room address is empty after trimming.
    #[error("Room URL is required")]
    MissingUrl,
}

/// Call client error type.
#[derive(Debug, Error)]
pub enum CallError {
    /// Transport operation failed.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Join intake rejected the form.
    #[error("Intake error: {0}")]
    Intake(#[from] IntakeError),

    /// A call is already in progress for this shell.
    #[error("A call is already active")]
    CallAlreadyActive,

    /// No call is in progress.
    #[error("No active call")]
    NoActiveCall,

    /// Internal error (actor channel failures).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CallError {
    /// Returns a display-safe message (no internal details).
    pub fn user_message(&self) -> String {
        match self {
            CallError::Intake(e) => e.to_string(),
            CallError::CallAlreadyActive => "You are already in a call".to_string(),
            CallError::NoActiveCall => "You are not in a call".to_string(),
            CallError::Transport(TransportError::NotJoined) => {
                "You are not in a call".to_string()
            }
            CallError::Transport(_) | CallError::Internal(_) => {
                "Something went wrong with the call".to_string()
            }
        }
    }
}
