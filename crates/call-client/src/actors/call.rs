//! `CallActor` - per-call actor that owns the synchronizer.
//!
//! Each `CallActor`:
//! - Owns the [`CallSynchronizer`] and through it the transport
//! - Applies transport notifications in delivery order
//! - Applies UI commands from its mailbox
//! - Releases the transport and signals "ended" when the call is over
//!
//! # Shutdown
//!
//! The loop exits on `left-meeting`, on cancellation, or when every handle
//! is dropped. In all cases the subscription is removed, the transport is
//! destroyed, and the ended token is cancelled.

use crate::config::Config;
use crate::errors::CallError;
use crate::intake::JoinRequest;
use crate::synchronizer::{CallSnapshot, CallSynchronizer, EventOutcome, SyncOptions};
use crate::transport::{CallTransport, EventStream};

use super::messages::CallMessage;
use super::metrics::MailboxMonitor;

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Handle to a `CallActor`.
#[derive(Clone, Debug)]
pub struct CallActorHandle {
    sender: mpsc::Sender<CallMessage>,
    cancel_token: CancellationToken,
    ended: CancellationToken,
    mailbox: Arc<MailboxMonitor>,
    call_id: String,
}

impl CallActorHandle {
    /// Identifier used in logs for this call.
    #[must_use]
    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    async fn send(&self, message: CallMessage) -> Result<(), CallError> {
        self.mailbox.record_enqueue();
        self.sender.send(message).await.map_err(|e| {
            self.mailbox.record_drop();
            CallError::Internal(format!("channel send failed: {e}"))
        })
    }

    async fn request<R>(
        &self,
        build: impl FnOnce(oneshot::Sender<R>) -> CallMessage,
    ) -> Result<R, CallError> {
        let (tx, rx) = oneshot::channel();
        self.send(build(tx)).await?;
        rx.await
            .map_err(|e| CallError::Internal(format!("response receive failed: {e}")))
    }

    /// Flip the local camera. `Ok(false)` before join.
    pub async fn toggle_video(&self) -> Result<bool, CallError> {
        self.request(|respond_to| CallMessage::ToggleVideo { respond_to })
            .await?
    }

    /// Flip the local microphone. `Ok(false)` before join.
    pub async fn toggle_audio(&self) -> Result<bool, CallError> {
        self.request(|respond_to| CallMessage::ToggleAudio { respond_to })
            .await?
    }

    /// Ask the transport to leave. Teardown follows on `left-meeting`.
    pub async fn leave(&self) -> Result<(), CallError> {
        self.request(|respond_to| CallMessage::Leave { respond_to })
            .await?
    }

    /// Replace the chat input buffer.
    pub async fn set_chat_input(&self, text: impl Into<String>) -> Result<(), CallError> {
        self.send(CallMessage::SetChatInput { text: text.into() })
            .await
    }

    /// Send the chat input buffer. Returns whether a message was sent.
    pub async fn send_chat(&self) -> Result<bool, CallError> {
        self.request(|respond_to| CallMessage::SendChat { respond_to })
            .await?
    }

    /// Forward a key press from the chat input box; Enter sends.
    pub async fn chat_key(&self, key: impl Into<String>) -> Result<bool, CallError> {
        let key = key.into();
        self.request(|respond_to| CallMessage::ChatKey { key, respond_to })
            .await?
    }

    /// Show or hide the chat panel.
    pub async fn toggle_chat(&self) -> Result<(), CallError> {
        self.send(CallMessage::ToggleChat).await
    }

    /// Get the current rendering projection.
    pub async fn get_state(&self) -> Result<CallSnapshot, CallError> {
        self.request(|respond_to| CallMessage::GetState { respond_to })
            .await
    }

    /// Cancel the call actor. The transport is released without leaving.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Whether the call actor has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Whether the actor has stopped and released the transport.
    #[must_use]
    pub fn has_ended(&self) -> bool {
        self.ended.is_cancelled()
    }

    /// Wait until the actor has stopped and released the transport.
    pub async fn ended(&self) {
        self.ended.cancelled().await;
    }
}

/// The call actor implementation.
pub struct CallActor<T: CallTransport> {
    call_id: String,
    sync: CallSynchronizer<T>,
    receiver: mpsc::Receiver<CallMessage>,
    events: EventStream,
    cancel_token: CancellationToken,
    ended: CancellationToken,
    mailbox: Arc<MailboxMonitor>,
}

impl<T: CallTransport> CallActor<T> {
    /// Subscribe to `transport`, start the join, and spawn the actor task.
    ///
    /// A failed join releases the transport and nothing is spawned.
    ///
    /// # Arguments
    ///
    /// * `transport` - Fresh transport for this call
    /// * `request` - Validated join request
    /// * `config` - Mailbox capacity and synchronizer settings
    /// * `cancel_token` - Cancellation token (child of the shell's token)
    pub fn spawn(
        transport: T,
        request: JoinRequest,
        config: &Config,
        cancel_token: CancellationToken,
    ) -> Result<(CallActorHandle, JoinHandle<()>), CallError> {
        let call_id = Uuid::new_v4().to_string();
        let (event_sink, events) = mpsc::unbounded_channel();
        let mut sync =
            CallSynchronizer::new(transport, event_sink, request, SyncOptions::from(config));
        sync.join()?;

        let (sender, receiver) = mpsc::channel(config.mailbox_capacity);
        let mailbox = Arc::new(MailboxMonitor::new(&call_id, config.mailbox_capacity));
        let ended = CancellationToken::new();

        let actor = Self {
            call_id: call_id.clone(),
            sync,
            receiver,
            events,
            cancel_token: cancel_token.clone(),
            ended: ended.clone(),
            mailbox: Arc::clone(&mailbox),
        };

        let task_handle = tokio::spawn(actor.run());

        let handle = CallActorHandle {
            sender,
            cancel_token,
            ended,
            mailbox,
            call_id,
        };

        Ok((handle, task_handle))
    }

    /// Run the actor loop.
    #[instrument(skip_all, name = "call.actor", fields(call_id = %self.call_id))]
    async fn run(mut self) {
        info!(target: "call.actor", call_id = %self.call_id, "CallActor started");

        loop {
            tokio::select! {
                // Notifications delivered before a command are applied before it.
                biased;

                () = self.cancel_token.cancelled() => {
                    info!(
                        target: "call.actor",
                        call_id = %self.call_id,
                        "CallActor received cancellation signal"
                    );
                    break;
                }

                event = self.events.recv() => {
                    match event {
                        Some(event) => {
                            if self.sync.handle_event(event) == EventOutcome::CallEnded {
                                info!(target: "call.actor", call_id = %self.call_id, "Call ended");
                                break;
                            }
                        }
                        None => {
                            info!(
                                target: "call.actor",
                                call_id = %self.call_id,
                                "Transport event stream closed, exiting"
                            );
                            break;
                        }
                    }
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => {
                            self.handle_message(message);
                            self.mailbox.record_dequeue();
                        }
                        None => {
                            info!(
                                target: "call.actor",
                                call_id = %self.call_id,
                                "CallActor channel closed, exiting"
                            );
                            break;
                        }
                    }
                }
            }
        }

        self.sync.release();
        self.ended.cancel();

        info!(
            target: "call.actor",
            call_id = %self.call_id,
            messages_processed = self.mailbox.messages_processed(),
            peak_mailbox_depth = self.mailbox.peak_depth(),
            "CallActor stopped"
        );
    }

    /// Handle a single command.
    fn handle_message(&mut self, message: CallMessage) {
        debug!(target: "call.actor", command = message.name(), "Handling command");
        match message {
            CallMessage::ToggleVideo { respond_to } => {
                let result = self.sync.toggle_video().map_err(CallError::from);
                let _ = respond_to.send(result);
            }

            CallMessage::ToggleAudio { respond_to } => {
                let result = self.sync.toggle_audio().map_err(CallError::from);
                let _ = respond_to.send(result);
            }

            CallMessage::Leave { respond_to } => {
                let result = self.sync.request_leave().map_err(CallError::from);
                let _ = respond_to.send(result);
            }

            CallMessage::SetChatInput { text } => {
                self.sync.set_chat_input(text);
            }

            CallMessage::SendChat { respond_to } => {
                let result = self.sync.send_chat().map_err(CallError::from);
                let _ = respond_to.send(result);
            }

            CallMessage::ChatKey { key, respond_to } => {
                let result = self.sync.chat_key(&key).map_err(CallError::from);
                let _ = respond_to.send(result);
            }

            CallMessage::ToggleChat => {
                self.sync.toggle_chat();
            }

            CallMessage::GetState { respond_to } => {
                let _ = respond_to.send(self.sync.snapshot());
            }
        }
    }
}
