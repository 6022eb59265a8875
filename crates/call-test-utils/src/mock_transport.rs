//! Mock call transport.
//!
//! Unlike the loopback transport, the mock never emits anything on its own:
//! `join` and `leave` are only recorded, and the test delivers
//! `joined-meeting` / `left-meeting` itself with [`MockTransport::emit`].
//! Clones share state, so a test keeps one clone as a probe after moving the
//! other into the code under test.
//!
//! # Example
//!
//! ```rust,ignore
//! use call_test_utils::MockTransport;
//!
//! let transport = MockTransport::builder()
//!     .access(AccessState::Unknown)
//!     .reject_app_messages()
//!     .build();
//! ```

use call_client::errors::TransportError;
use call_client::intake::JoinRequest;
use call_client::transport::{
    AccessLevel, AccessState, CallEvent, CallTransport, EventSink, SubscriptionId,
    TransportFactory,
};
use std::sync::{Arc, Mutex, MutexGuard};

/// A command received by the mock, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCommand {
    Subscribe(SubscriptionId),
    Unsubscribe(SubscriptionId),
    Join(JoinRequest),
    Leave,
    Destroy,
    SetLocalVideo(bool),
    SetLocalAudio(bool),
    SendAppMessage(serde_json::Value),
}

#[derive(Debug)]
struct MockState {
    commands: Vec<TransportCommand>,
    sinks: Vec<(SubscriptionId, EventSink)>,
    next_subscription: u64,
    local_video: bool,
    local_audio: bool,
    access: AccessState,
    reject_join: bool,
    reject_app_messages: bool,
}

/// Mock transport for testing. See the module docs.
#[derive(Debug, Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl MockTransport {
    /// Create a new MockTransport builder.
    #[must_use]
    pub fn builder() -> MockTransportBuilder {
        MockTransportBuilder::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().expect("mock transport lock poisoned")
    }

    /// Deliver a notification to every current subscriber.
    pub fn emit(&self, event: CallEvent) {
        let state = self.lock();
        for (_, sink) in &state.sinks {
            let _ = sink.send(event.clone());
        }
    }

    /// All commands received so far.
    #[must_use]
    pub fn commands(&self) -> Vec<TransportCommand> {
        self.lock().commands.clone()
    }

    /// Number of recorded commands matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&TransportCommand) -> bool) -> usize {
        self.lock().commands.iter().filter(|c| predicate(c)).count()
    }

    /// Number of `destroy` calls.
    #[must_use]
    pub fn destroy_count(&self) -> usize {
        self.count(|c| matches!(c, TransportCommand::Destroy))
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.lock().sinks.len()
    }

    /// Application messages sent, oldest first.
    #[must_use]
    pub fn sent_messages(&self) -> Vec<serde_json::Value> {
        self.lock()
            .commands
            .iter()
            .filter_map(|c| match c {
                TransportCommand::SendAppMessage(data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    /// Local camera and microphone commands, in call order.
    #[must_use]
    pub fn media_commands(&self) -> Vec<TransportCommand> {
        self.lock()
            .commands
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    TransportCommand::SetLocalVideo(_) | TransportCommand::SetLocalAudio(_)
                )
            })
            .cloned()
            .collect()
    }

    /// Change the flag returned by `local_video` without recording a command.
    pub fn set_reported_video(&self, enabled: bool) {
        self.lock().local_video = enabled;
    }
}

impl CallTransport for MockTransport {
    fn subscribe(&mut self, sink: EventSink) -> SubscriptionId {
        let mut state = self.lock();
        let id = SubscriptionId(state.next_subscription);
        state.next_subscription += 1;
        state.sinks.push((id, sink));
        state.commands.push(TransportCommand::Subscribe(id));
        id
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        let mut state = self.lock();
        state.sinks.retain(|(sub, _)| *sub != id);
        state.commands.push(TransportCommand::Unsubscribe(id));
    }

    fn join(&mut self, request: &JoinRequest) -> Result<(), TransportError> {
        let mut state = self.lock();
        state.commands.push(TransportCommand::Join(request.clone()));
        if state.reject_join {
            return Err(TransportError::Rejected("room not found".to_string()));
        }
        Ok(())
    }

    fn leave(&mut self) -> Result<(), TransportError> {
        self.lock().commands.push(TransportCommand::Leave);
        Ok(())
    }

    fn destroy(&mut self) -> Result<(), TransportError> {
        let mut state = self.lock();
        state.commands.push(TransportCommand::Destroy);
        state.sinks.clear();
        Ok(())
    }

    fn local_video(&self) -> bool {
        self.lock().local_video
    }

    fn local_audio(&self) -> bool {
        self.lock().local_audio
    }

    fn set_local_video(&mut self, enabled: bool) -> Result<(), TransportError> {
        let mut state = self.lock();
        state.commands.push(TransportCommand::SetLocalVideo(enabled));
        state.local_video = enabled;
        Ok(())
    }

    fn set_local_audio(&mut self, enabled: bool) -> Result<(), TransportError> {
        let mut state = self.lock();
        state.commands.push(TransportCommand::SetLocalAudio(enabled));
        state.local_audio = enabled;
        Ok(())
    }

    fn send_app_message(&mut self, data: serde_json::Value) -> Result<(), TransportError> {
        let mut state = self.lock();
        if state.reject_app_messages {
            return Err(TransportError::Rejected("app message rejected".to_string()));
        }
        state.commands.push(TransportCommand::SendAppMessage(data));
        Ok(())
    }

    fn access_state(&self) -> AccessState {
        self.lock().access
    }
}

/// Builder for MockTransport configuration.
#[derive(Debug)]
pub struct MockTransportBuilder {
    local_video: bool,
    local_audio: bool,
    access: AccessState,
    reject_join: bool,
    reject_app_messages: bool,
}

impl Default for MockTransportBuilder {
    fn default() -> Self {
        Self {
            local_video: true,
            local_audio: true,
            access: AccessState::Known {
                level: AccessLevel::Full,
            },
            reject_join: false,
            reject_app_messages: false,
        }
    }
}

impl MockTransportBuilder {
    /// Initial camera flag reported by the transport.
    #[must_use]
    pub fn local_video(mut self, enabled: bool) -> Self {
        self.local_video = enabled;
        self
    }

    /// Initial microphone flag reported by the transport.
    #[must_use]
    pub fn local_audio(mut self, enabled: bool) -> Self {
        self.local_audio = enabled;
        self
    }

    /// Access state reported after join.
    #[must_use]
    pub fn access(mut self, access: AccessState) -> Self {
        self.access = access;
        self
    }

    /// Make `join` fail.
    #[must_use]
    pub fn reject_join(mut self) -> Self {
        self.reject_join = true;
        self
    }

    /// Make `send_app_message` fail.
    #[must_use]
    pub fn reject_app_messages(mut self) -> Self {
        self.reject_app_messages = true;
        self
    }

    /// Build the MockTransport.
    #[must_use]
    pub fn build(self) -> MockTransport {
        MockTransport {
            state: Arc::new(Mutex::new(MockState {
                commands: Vec::new(),
                sinks: Vec::new(),
                next_subscription: 1,
                local_video: self.local_video,
                local_audio: self.local_audio,
                access: self.access,
                reject_join: self.reject_join,
                reject_app_messages: self.reject_app_messages,
            })),
        }
    }
}

/// Factory handing out clones of one prepared [`MockTransport`].
#[derive(Debug, Clone, Default)]
pub struct MockTransportFactory {
    transport: MockTransport,
    created: Arc<Mutex<usize>>,
}

impl MockTransportFactory {
    /// Factory that hands out clones of `transport`.
    #[must_use]
    pub fn new(transport: MockTransport) -> Self {
        Self {
            transport,
            created: Arc::new(Mutex::new(0)),
        }
    }

    /// Probe sharing state with every transport this factory creates.
    #[must_use]
    pub fn probe(&self) -> MockTransport {
        self.transport.clone()
    }

    /// Number of transports created.
    #[must_use]
    pub fn created(&self) -> usize {
        *self.created.lock().expect("factory lock poisoned")
    }
}

impl TransportFactory for MockTransportFactory {
    type Transport = MockTransport;

    fn create(&self) -> MockTransport {
        *self.created.lock().expect("factory lock poisoned") += 1;
        self.transport.clone()
    }
}
