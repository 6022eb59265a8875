//! Participant view-model synchronizer.
//!
//! [`CallSynchronizer`] owns everything scoped to one call: the injected
//! transport, the event subscription, the participant collection, the stream
//! registry and the chat log. It is plain synchronous state. Serialization of
//! notifications and intents is the job of the actor that owns it.
//!
//! # Early track notifications
//!
//! Track notifications can arrive before `joined-meeting`. What happens to
//! them is fixed by [`EarlyTrackPolicy`]: `Drop` discards them, `Replay`
//! queues them (bounded, oldest evicted first) and applies them in delivery
//! order right after the local participant is inserted.

use crate::chat::{ChatMessage, ChatSynchronizer};
use crate::config::{Config, EarlyTrackPolicy};
use crate::errors::TransportError;
use crate::intake::JoinRequest;
use crate::media::{StreamId, StreamRegistry};
use crate::observability::metrics;
use crate::participants::{ParticipantCollection, ParticipantView};
use crate::transport::{
    AccessState, CallEvent, CallTransport, EventSink, ParticipantId, ParticipantRecord,
    SubscriptionId, TrackKind,
};

use serde::Serialize;
use std::collections::VecDeque;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Whether the local user has completed joining.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallSessionState {
    NotJoined,
    Joined,
}

/// Result of applying one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// The call is still running.
    Continue,
    /// The local user left; the transport has been released.
    CallEnded,
}

/// Synchronizer settings taken from [`Config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub early_track_policy: EarlyTrackPolicy,
    pub early_track_queue_limit: usize,
    pub self_chat_label: String,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for SyncOptions {
    fn from(config: &Config) -> Self {
        Self {
            early_track_policy: config.early_track_policy,
            early_track_queue_limit: config.early_track_queue_limit,
            self_chat_label: config.self_chat_label.clone(),
        }
    }
}

/// One tile of the rendered grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TileSnapshot {
    #[serde(flatten)]
    pub view: ParticipantView,
    pub video_stream: Option<StreamId>,
    pub audio_stream: Option<StreamId>,
}

/// Read-only projection of call state for the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallSnapshot {
    pub state: CallSessionState,
    /// `false` surfaces the "room is not public" warning.
    pub is_public: bool,
    /// Fatal transport error, shown with a reset action.
    pub error: Option<String>,
    /// Tiles in display order.
    pub participants: Vec<TileSnapshot>,
    pub chat: Vec<ChatMessage>,
    pub chat_open: bool,
    pub chat_input: String,
}

impl CallSnapshot {
    /// Whether the local user has joined.
    #[must_use]
    pub fn joined(&self) -> bool {
        self.state == CallSessionState::Joined
    }

    /// Find a tile by participant id.
    #[must_use]
    pub fn participant(&self, id: &str) -> Option<&TileSnapshot> {
        self.participants.iter().find(|t| t.view.id.as_str() == id)
    }
}

/// State of one call. See the module docs.
#[derive(Debug)]
pub struct CallSynchronizer<T: CallTransport> {
    transport: Option<T>,
    subscription: Option<SubscriptionId>,
    request: JoinRequest,
    state: CallSessionState,
    participants: ParticipantCollection,
    streams: StreamRegistry,
    chat: ChatSynchronizer,
    error: Option<String>,
    is_public: bool,
    early_tracks: VecDeque<(ParticipantRecord, TrackKind)>,
    options: SyncOptions,
}

impl<T: CallTransport> CallSynchronizer<T> {
    /// Take ownership of `transport` and subscribe `sink` to its notifications.
    pub fn new(mut transport: T, sink: EventSink, request: JoinRequest, options: SyncOptions) -> Self {
        let subscription = transport.subscribe(sink);
        let chat = ChatSynchronizer::new(request.user_name.clone(), options.self_chat_label.clone());
        Self {
            transport: Some(transport),
            subscription: Some(subscription),
            request,
            state: CallSessionState::NotJoined,
            participants: ParticipantCollection::new(),
            streams: StreamRegistry::new(),
            chat,
            error: None,
            is_public: true,
            early_tracks: VecDeque::new(),
            options,
        }
    }

    /// Current session state.
    #[must_use]
    pub fn state(&self) -> CallSessionState {
        self.state
    }

    /// Participant views for this call.
    #[must_use]
    pub fn participants(&self) -> &ParticipantCollection {
        &self.participants
    }

    /// Stream wrappers backing the participant tiles.
    #[must_use]
    pub fn streams(&self) -> &StreamRegistry {
        &self.streams
    }

    /// Fatal transport error, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether the room was reported public on join.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.is_public
    }

    /// Whether the transport has been released.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.transport.is_none()
    }

    fn transport_mut(&mut self) -> Result<&mut T, TransportError> {
        self.transport.as_mut().ok_or(TransportError::Destroyed)
    }

    /// Start joining the requested room. Completion arrives as `joined-meeting`.
    pub fn join(&mut self) -> Result<(), TransportError> {
        let request = self.request.clone();
        let result = self.transport_mut()?.join(&request);
        match &result {
            Ok(()) => info!(
                target: "call.sync",
                user_name = %request.user_name,
                url = %request.url,
                "Joining call"
            ),
            Err(e) => warn!(target: "call.sync", error = %e, "Join request failed"),
        }
        result
    }

    /// Apply one transport notification.
    pub fn handle_event(&mut self, event: CallEvent) -> EventOutcome {
        let name = event.name();
        let started = Instant::now();
        metrics::record_event(name);

        let outcome = match event {
            CallEvent::JoinedMeeting { local } => {
                self.on_joined_meeting(local);
                EventOutcome::Continue
            }
            CallEvent::ParticipantJoined { participant } => {
                self.on_participant_joined(participant);
                EventOutcome::Continue
            }
            CallEvent::ParticipantUpdated { participant } => {
                self.on_participant_updated(participant);
                EventOutcome::Continue
            }
            CallEvent::TrackStarted { participant, kind }
            | CallEvent::TrackStopped { participant, kind } => {
                self.on_track_changed(participant, kind);
                EventOutcome::Continue
            }
            CallEvent::ParticipantLeft { participant } => {
                self.on_participant_left(participant);
                EventOutcome::Continue
            }
            CallEvent::Error { message } => {
                self.on_fatal_error(message);
                EventOutcome::Continue
            }
            CallEvent::AppMessage { data, from } => {
                if self.chat.handle_app_message(data.as_ref()) {
                    debug!(target: "call.sync", from = ?from, "Chat message appended");
                }
                EventOutcome::Continue
            }
            CallEvent::LeftMeeting => self.on_left_meeting(),
        };

        if outcome == EventOutcome::Continue {
            let changes = self.streams.reconcile(&self.participants);
            if !changes.is_empty() {
                debug!(
                    target: "call.sync",
                    created = changes.created,
                    replaced = changes.replaced,
                    dropped_streams = changes.dropped_streams,
                    dropped_tiles = changes.dropped_tiles,
                    "Streams reconciled"
                );
            }
        }
        metrics::set_participants_active(self.participants.len());
        metrics::record_event_latency(name, started.elapsed());
        outcome
    }

    fn on_joined_meeting(&mut self, local: Option<ParticipantRecord>) {
        self.state = CallSessionState::Joined;

        let access = self
            .transport
            .as_ref()
            .map(CallTransport::access_state)
            .unwrap_or(AccessState::Unknown);
        self.is_public = access.is_public();
        if !self.is_public {
            warn!(target: "call.sync", access = ?access, "Room is not public");
        }

        match local {
            Some(record) => {
                info!(
                    target: "call.sync",
                    participant_id = %record.session_id,
                    "Joined call"
                );
                self.participants.upsert(&record);
            }
            None => {
                debug!(target: "call.sync", "joined-meeting without local participant");
                metrics::record_event_ignored("missing_payload");
            }
        }

        let queued = std::mem::take(&mut self.early_tracks);
        if !queued.is_empty() {
            debug!(target: "call.sync", count = queued.len(), "Replaying early track updates");
        }
        for (record, kind) in queued {
            self.apply_track(&record, kind);
        }
    }

    fn on_participant_joined(&mut self, participant: Option<ParticipantRecord>) {
        let Some(record) = participant else {
            debug!(target: "call.sync", "participant-joined without payload ignored");
            metrics::record_event_ignored("missing_payload");
            return;
        };
        debug!(
            target: "call.sync",
            participant_id = %record.session_id,
            "Participant joined"
        );
        self.discard_early_tracks(&record.session_id);
        self.participants.upsert(&record);
    }

    fn on_participant_updated(&mut self, participant: Option<ParticipantRecord>) {
        let Some(record) = participant else {
            metrics::record_event_ignored("missing_payload");
            return;
        };
        match self.participants.get_mut(&record.session_id) {
            Some(view) => {
                if view.user_name != record.user_name {
                    view.user_name = record.user_name;
                }
            }
            None => metrics::record_event_ignored("unknown_participant"),
        }
    }

    fn on_track_changed(&mut self, participant: Option<ParticipantRecord>, kind: TrackKind) {
        let Some(record) = participant else {
            debug!(target: "call.sync", kind = kind.as_str(), "Track update without payload ignored");
            metrics::record_event_ignored("missing_payload");
            return;
        };

        if self.state != CallSessionState::Joined {
            match self.options.early_track_policy {
                EarlyTrackPolicy::Drop => {
                    debug!(
                        target: "call.sync",
                        participant_id = %record.session_id,
                        kind = kind.as_str(),
                        "Track update before join dropped"
                    );
                    metrics::record_event_ignored("not_joined");
                }
                EarlyTrackPolicy::Replay => {
                    let limit = self.options.early_track_queue_limit;
                    if limit == 0 {
                        metrics::record_event_ignored("queue_full");
                        return;
                    }
                    while self.early_tracks.len() >= limit {
                        self.early_tracks.pop_front();
                        metrics::record_event_ignored("queue_full");
                    }
                    self.early_tracks.push_back((record, kind));
                }
            }
            return;
        }

        self.apply_track(&record, kind);
    }

    /// Drop queued pre-join track updates superseded by a later membership change.
    fn discard_early_tracks(&mut self, id: &ParticipantId) {
        let before = self.early_tracks.len();
        self.early_tracks.retain(|(queued, _)| queued.session_id != *id);
        let discarded = before - self.early_tracks.len();
        if discarded > 0 {
            debug!(
                target: "call.sync",
                participant_id = %id,
                discarded,
                "Superseded early track updates discarded"
            );
        }
    }

    fn apply_track(&mut self, record: &ParticipantRecord, kind: TrackKind) {
        match self.participants.get_mut(&record.session_id) {
            Some(view) => {
                if view.apply_track(record, kind) {
                    debug!(
                        target: "call.sync",
                        participant_id = %record.session_id,
                        kind = kind.as_str(),
                        ready = view.is_ready(kind),
                        "Track updated"
                    );
                }
            }
            None => {
                debug!(
                    target: "call.sync",
                    participant_id = %record.session_id,
                    "Track update for unknown participant ignored"
                );
                metrics::record_event_ignored("unknown_participant");
            }
        }
    }

    fn on_participant_left(&mut self, participant: Option<ParticipantRecord>) {
        let Some(record) = participant else {
            metrics::record_event_ignored("missing_payload");
            return;
        };
        self.discard_early_tracks(&record.session_id);
        if self.participants.remove(&record.session_id) {
            debug!(
                target: "call.sync",
                participant_id = %record.session_id,
                "Participant left"
            );
        }
    }

    fn on_fatal_error(&mut self, message: Option<String>) {
        match message {
            Some(message) => {
                warn!(target: "call.sync", error = %message, "Transport reported an error");
                self.error = Some(message);
            }
            None => {
                debug!(target: "call.sync", "error event without message ignored");
                metrics::record_event_ignored("missing_payload");
            }
        }
    }

    fn on_left_meeting(&mut self) -> EventOutcome {
        self.state = CallSessionState::NotJoined;
        self.release();
        self.participants.clear();
        self.streams.clear();
        self.chat.clear();
        self.early_tracks.clear();
        EventOutcome::CallEnded
    }

    /// Unsubscribe and destroy the transport. Safe to call more than once.
    pub fn release(&mut self) {
        let Some(mut transport) = self.transport.take() else {
            return;
        };
        if let Some(subscription) = self.subscription.take() {
            transport.unsubscribe(subscription);
        }
        if let Err(e) = transport.destroy() {
            warn!(target: "call.sync", error = %e, "Transport destroy failed");
        }
        info!(target: "call.sync", "Call transport released");
    }

    /// Clear the error and ask the transport to leave.
    pub fn request_leave(&mut self) -> Result<(), TransportError> {
        self.error = None;
        metrics::record_intent("leave");
        if let Err(e) = self.transport_mut()?.leave() {
            warn!(target: "call.sync", error = %e, "Leave request failed");
            return Err(e);
        }
        Ok(())
    }

    /// Flip the local camera. Returns whether the transport was instructed.
    pub fn toggle_video(&mut self) -> Result<bool, TransportError> {
        self.toggle_local(TrackKind::Video)
    }

    /// Flip the local microphone. Returns whether the transport was instructed.
    pub fn toggle_audio(&mut self) -> Result<bool, TransportError> {
        self.toggle_local(TrackKind::Audio)
    }

    fn toggle_local(&mut self, kind: TrackKind) -> Result<bool, TransportError> {
        if self.state != CallSessionState::Joined {
            debug!(target: "call.sync", kind = kind.as_str(), "Toggle before join ignored");
            return Ok(false);
        }
        let transport = self.transport_mut()?;
        // The transport's flag is authoritative; no optimistic local flip.
        let result = match kind {
            TrackKind::Video => {
                let enabled = transport.local_video();
                transport.set_local_video(!enabled)
            }
            TrackKind::Audio => {
                let enabled = transport.local_audio();
                transport.set_local_audio(!enabled)
            }
        };
        if let Err(e) = result {
            warn!(target: "call.sync", kind = kind.as_str(), error = %e, "Media toggle failed");
            return Err(e);
        }
        metrics::record_intent(match kind {
            TrackKind::Video => "toggle_video",
            TrackKind::Audio => "toggle_audio",
        });
        Ok(true)
    }

    /// Replace the chat input buffer.
    pub fn set_chat_input(&mut self, text: impl Into<String>) {
        self.chat.set_input(text);
    }

    /// Send the chat input buffer. Returns whether a message was sent.
    pub fn send_chat(&mut self) -> Result<bool, TransportError> {
        let transport = self.transport.as_mut().ok_or(TransportError::Destroyed)?;
        let sent = self.chat.submit(transport)?;
        if sent {
            metrics::record_intent("chat");
        }
        Ok(sent)
    }

    /// Key press in the chat input box.
    pub fn chat_key(&mut self, key: &str) -> Result<bool, TransportError> {
        let transport = self.transport.as_mut().ok_or(TransportError::Destroyed)?;
        let sent = self.chat.on_key(key, transport)?;
        if sent {
            metrics::record_intent("chat");
        }
        Ok(sent)
    }

    /// Show or hide the chat panel.
    pub fn toggle_chat(&mut self) {
        self.chat.toggle_view();
    }

    /// Current rendering projection.
    #[must_use]
    pub fn snapshot(&self) -> CallSnapshot {
        let participants = self
            .participants
            .ordered()
            .into_iter()
            .map(|view| {
                let tile = self.streams.get(&view.id);
                TileSnapshot {
                    view: view.clone(),
                    video_stream: tile
                        .and_then(|t| t.get(TrackKind::Video))
                        .map(|s| s.id()),
                    audio_stream: tile
                        .and_then(|t| t.get(TrackKind::Audio))
                        .map(|s| s.id()),
                }
            })
            .collect();

        CallSnapshot {
            state: self.state,
            is_public: self.is_public,
            error: self.error.clone(),
            participants,
            chat: self.chat.messages().to_vec(),
            chat_open: self.chat.is_open(),
            chat_input: self.chat.input().to_string(),
        }
    }
}

impl<T: CallTransport> Drop for CallSynchronizer<T> {
    fn drop(&mut self) {
        self.release();
    }
}
