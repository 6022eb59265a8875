//! In-call chat over the transport's application-message channel.
//!
//! Incoming messages are appended to an ordered [`ChatMessage`] log. The
//! transport never echoes a sender's own messages, so local submissions are
//! appended directly under a fixed label.

use crate::errors::TransportError;
use crate::observability::metrics;
use crate::transport::CallTransport;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Control message asking peers to replay chat history. Not a chat line.
pub const CHAT_HISTORY_REQUEST_EVENT: &str = "request-chat-history";

/// Wire payload of a chat line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPayload {
    pub message: String,
    pub name: String,
}

/// One entry of the chat log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub name: String,
    pub message: String,
    pub received_at: DateTime<Utc>,
}

/// Chat log plus the local input buffer.
#[derive(Debug)]
pub struct ChatSynchronizer {
    local_name: String,
    self_label: String,
    messages: Vec<ChatMessage>,
    input: String,
    open: bool,
}

impl ChatSynchronizer {
    /// `local_name` tags outgoing payloads; `self_label` is shown for them locally.
    #[must_use]
    pub fn new(local_name: impl Into<String>, self_label: impl Into<String>) -> Self {
        Self {
            local_name: local_name.into(),
            self_label: self_label.into(),
            messages: Vec::new(),
            input: String::new(),
            open: false,
        }
    }

    /// Chat log, oldest first.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Current input buffer.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Replace the input buffer.
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Whether the chat panel is shown.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Show or hide the chat panel.
    pub fn toggle_view(&mut self) {
        self.open = !self.open;
    }

    /// Drop the log and the input buffer (call ended).
    pub fn clear(&mut self) {
        self.messages.clear();
        self.input.clear();
    }

    /// Handle an incoming application message. Returns whether a line was appended.
    pub fn handle_app_message(&mut self, data: Option<&serde_json::Value>) -> bool {
        let Some(data) = data else {
            debug!(target: "call.chat", "App message without payload ignored");
            return false;
        };

        if data.get("event").and_then(serde_json::Value::as_str)
            == Some(CHAT_HISTORY_REQUEST_EVENT)
        {
            debug!(target: "call.chat", "Chat history request ignored");
            return false;
        }

        match serde_json::from_value::<ChatPayload>(data.clone()) {
            Ok(payload) => {
                self.messages.push(ChatMessage {
                    name: payload.name,
                    message: payload.message,
                    received_at: Utc::now(),
                });
                metrics::record_chat_message("inbound");
                true
            }
            Err(e) => {
                debug!(target: "call.chat", error = %e, "Malformed chat payload ignored");
                metrics::record_event_ignored("malformed_payload");
                false
            }
        }
    }

    /// Send the input buffer.
    ///
    /// Whitespace-only input is ignored without touching the transport. On
    /// success the line is appended under the self label and the buffer is
    /// cleared. Returns whether a message was sent.
    pub fn submit<T: CallTransport + ?Sized>(
        &mut self,
        transport: &mut T,
    ) -> Result<bool, TransportError> {
        let message = self.input.trim();
        if message.is_empty() {
            return Ok(false);
        }
        let message = message.to_string();

        let payload = ChatPayload {
            message: message.clone(),
            name: self.local_name.clone(),
        };
        let data = serde_json::to_value(&payload)
            .map_err(|e| TransportError::InvalidPayload(e.to_string()))?;

        if let Err(e) = transport.send_app_message(data) {
            warn!(target: "call.chat", error = %e, "Failed to send chat message");
            return Err(e);
        }

        self.messages.push(ChatMessage {
            name: self.self_label.clone(),
            message,
            received_at: Utc::now(),
        });
        self.input.clear();
        metrics::record_chat_message("outbound");
        Ok(true)
    }

    /// Keyboard handler for the input box: Enter submits.
    pub fn on_key<T: CallTransport + ?Sized>(
        &mut self,
        key: &str,
        transport: &mut T,
    ) -> Result<bool, TransportError> {
        if key == "Enter" {
            self.submit(transport)
        } else {
            Ok(false)
        }
    }
}
