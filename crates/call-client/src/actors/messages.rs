//! Message types for the call actor mailbox.
//!
//! Commands carry a `respond_to` oneshot when the caller needs the outcome.
//! Transport notifications do not travel through this mailbox; the actor
//! reads them from the transport's event stream.

use crate::errors::CallError;
use crate::synchronizer::CallSnapshot;

use tokio::sync::oneshot;

/// Commands sent to a `CallActor`.
#[derive(Debug)]
pub enum CallMessage {
    /// Flip the local camera.
    ToggleVideo {
        respond_to: oneshot::Sender<Result<bool, CallError>>,
    },

    /// Flip the local microphone.
    ToggleAudio {
        respond_to: oneshot::Sender<Result<bool, CallError>>,
    },

    /// Clear the error and ask the transport to leave.
    Leave {
        respond_to: oneshot::Sender<Result<(), CallError>>,
    },

    /// Replace the chat input buffer.
    SetChatInput { text: String },

    /// Send the chat input buffer.
    SendChat {
        respond_to: oneshot::Sender<Result<bool, CallError>>,
    },

    /// Key press in the chat input box.
    ChatKey {
        key: String,
        respond_to: oneshot::Sender<Result<bool, CallError>>,
    },

    /// Show or hide the chat panel.
    ToggleChat,

    /// Current rendering projection.
    GetState {
        respond_to: oneshot::Sender<CallSnapshot>,
    },
}

impl CallMessage {
    /// Command name for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            CallMessage::ToggleVideo { .. } => "toggle_video",
            CallMessage::ToggleAudio { .. } => "toggle_audio",
            CallMessage::Leave { .. } => "leave",
            CallMessage::SetChatInput { .. } => "set_chat_input",
            CallMessage::SendChat { .. } => "send_chat",
            CallMessage::ChatKey { .. } => "chat_key",
            CallMessage::ToggleChat => "toggle_chat",
            CallMessage::GetState { .. } => "get_state",
        }
    }
}
