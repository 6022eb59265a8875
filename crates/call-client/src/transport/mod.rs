//! Call transport capability.
//!
//! The real-time video SDK is opaque to this crate. Everything the state layer
//! needs from it is listed here:
//!
//! - [`CallTransport`] - imperative operations (join, leave, media toggles,
//!   application messages) plus event subscription
//! - [`CallEvent`] - the closed set of notifications the state layer consumes
//! - Participant and track records as reported by the transport
//!
//! Transports are injected at construction (see [`TransportFactory`]); there is
//! no ambient call instance.

pub mod loopback;

use crate::errors::TransportError;
use crate::intake::JoinRequest;

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;

pub use loopback::{LoopbackFactory, LoopbackRemote, LoopbackTransport};

/// Stable session identifier of a call participant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    /// Borrow the raw id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identity of a raw media track. Two handles with the same id are the same track.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub String);

impl From<&str> for TrackId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Media kind of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
}

impl TrackKind {
    /// Lowercase kind name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            TrackKind::Video => "video",
            TrackKind::Audio => "audio",
        }
    }
}

/// Opaque handle to a raw media track owned by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaTrack {
    pub id: TrackId,
    pub kind: TrackKind,
}

impl MediaTrack {
    /// Build a handle for track `id`.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            id: TrackId(id.into()),
            kind,
        }
    }
}

/// Track lifecycle state as reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackState {
    Playable,
    Loading,
    Sendable,
    Interrupted,
    Blocked,
    Off,
    /// Any state string this crate does not know about.
    #[serde(other)]
    Unknown,
}

impl TrackState {
    /// Whether media in this state should be rendered.
    ///
    /// `Loading` counts as ready: it becomes playable momentarily, and showing
    /// the placeholder in between causes a visible flash.
    #[must_use]
    pub const fn is_ready(self) -> bool {
        matches!(self, TrackState::Playable | TrackState::Loading)
    }
}

/// Per-kind track descriptor on a participant record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackDescriptor {
    pub state: TrackState,
    #[serde(default)]
    pub persistent_track: Option<MediaTrack>,
}

/// Both track descriptors of a participant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantTracks {
    #[serde(default)]
    pub video: Option<TrackDescriptor>,
    #[serde(default)]
    pub audio: Option<TrackDescriptor>,
}

impl ParticipantTracks {
    /// Descriptor for `kind`, if reported.
    #[must_use]
    pub fn get(&self, kind: TrackKind) -> Option<&TrackDescriptor> {
        match kind {
            TrackKind::Video => self.video.as_ref(),
            TrackKind::Audio => self.audio.as_ref(),
        }
    }
}

/// Participant record as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRecord {
    pub session_id: ParticipantId,
    pub user_name: String,
    #[serde(default)]
    pub local: bool,
    #[serde(default)]
    pub tracks: ParticipantTracks,
}

/// Room access level granted to the local user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Full,
    Lobby,
    None,
}

/// Room access state reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "access", rename_all = "lowercase")]
pub enum AccessState {
    Unknown,
    Known { level: AccessLevel },
}

impl AccessState {
    /// A room counts as public only when access is known and fully granted.
    #[must_use]
    pub fn is_public(&self) -> bool {
        matches!(
            self,
            AccessState::Known {
                level: AccessLevel::Full
            }
        )
    }
}

/// Notifications consumed by the state layer.
///
/// Payloads are optional because the transport may deliver an event without
/// one; such events are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum CallEvent {
    /// The local user finished joining.
    JoinedMeeting {
        #[serde(default)]
        local: Option<ParticipantRecord>,
    },
    /// A remote participant joined.
    ParticipantJoined {
        #[serde(default)]
        participant: Option<ParticipantRecord>,
    },
    /// A participant's record changed.
    ParticipantUpdated {
        #[serde(default)]
        participant: Option<ParticipantRecord>,
    },
    /// A participant's track started.
    TrackStarted {
        #[serde(default)]
        participant: Option<ParticipantRecord>,
        kind: TrackKind,
    },
    /// A participant's track stopped.
    TrackStopped {
        #[serde(default)]
        participant: Option<ParticipantRecord>,
        kind: TrackKind,
    },
    /// A participant left.
    ParticipantLeft {
        #[serde(default)]
        participant: Option<ParticipantRecord>,
    },
    /// The local user left the call.
    LeftMeeting,
    /// Fatal transport error.
    Error {
        #[serde(default)]
        message: Option<String>,
    },
    /// Generic application message from another participant.
    AppMessage {
        #[serde(default)]
        data: Option<serde_json::Value>,
        #[serde(default)]
        from: Option<ParticipantId>,
    },
}

impl CallEvent {
    /// Event name, used for logging and metric labels.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            CallEvent::JoinedMeeting { .. } => "joined-meeting",
            CallEvent::ParticipantJoined { .. } => "participant-joined",
            CallEvent::ParticipantUpdated { .. } => "participant-updated",
            CallEvent::TrackStarted { .. } => "track-started",
            CallEvent::TrackStopped { .. } => "track-stopped",
            CallEvent::ParticipantLeft { .. } => "participant-left",
            CallEvent::LeftMeeting => "left-meeting",
            CallEvent::Error { .. } => "error",
            CallEvent::AppMessage { .. } => "app-message",
        }
    }
}

/// Channel a transport delivers notifications into.
pub type EventSink = mpsc::UnboundedSender<CallEvent>;

/// Receiving end of an [`EventSink`].
pub type EventStream = mpsc::UnboundedReceiver<CallEvent>;

/// Handle returned by [`CallTransport::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// The call transport capability.
///
/// Operations are fire-and-forget: completion arrives later as a
/// [`CallEvent`] on the subscribed sink, never as a return value.
pub trait CallTransport: Send + 'static {
    /// Register a sink for all notifications.
    fn subscribe(&mut self, sink: EventSink) -> SubscriptionId;

    /// Remove a previously registered sink. Unknown ids are ignored.
    fn unsubscribe(&mut self, id: SubscriptionId);

    /// Start joining a room.
    fn join(&mut self, request: &JoinRequest) -> Result<(), TransportError>;

    /// Start leaving the current room.
    fn leave(&mut self) -> Result<(), TransportError>;

    /// Release all transport resources. Must be idempotent.
    fn destroy(&mut self) -> Result<(), TransportError>;

    /// Whether the local camera is currently enabled.
    fn local_video(&self) -> bool;

    /// Whether the local microphone is currently enabled.
    fn local_audio(&self) -> bool;

    fn set_local_video(&mut self, enabled: bool) -> Result<(), TransportError>;

    fn set_local_audio(&mut self, enabled: bool) -> Result<(), TransportError>;

    /// Send a payload on the application-message channel to all other participants.
    fn send_app_message(&mut self, data: serde_json::Value) -> Result<(), TransportError>;

    fn access_state(&self) -> AccessState;
}

/// Creates a fresh transport for each call.
pub trait TransportFactory: Send + Sync + 'static {
    type Transport: CallTransport;

    fn create(&self) -> Self::Transport;
}
