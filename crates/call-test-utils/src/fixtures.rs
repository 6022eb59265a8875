//! Pre-configured test data fixtures.
//!
//! Provides:
//! - [`TestParticipant`], a builder for transport participant records
//! - Constructors for every [`CallEvent`] kind

use call_client::transport::{
    CallEvent, MediaTrack, ParticipantId, ParticipantRecord, ParticipantTracks, TrackDescriptor,
    TrackKind, TrackState,
};
use serde_json::json;

/// Test participant fixture.
#[derive(Debug, Clone)]
pub struct TestParticipant {
    session_id: String,
    user_name: String,
    local: bool,
    video: Option<TrackDescriptor>,
    audio: Option<TrackDescriptor>,
}

impl TestParticipant {
    /// Participant with no tracks; the display name defaults to the id.
    #[must_use]
    pub fn new(session_id: impl Into<String>) -> Self {
        let session_id = session_id.into();
        Self {
            user_name: session_id.clone(),
            session_id,
            local: false,
            video: None,
            audio: None,
        }
    }

    #[must_use]
    pub fn name(mut self, user_name: impl Into<String>) -> Self {
        self.user_name = user_name.into();
        self
    }

    /// Mark as the local participant.
    #[must_use]
    pub fn local(mut self) -> Self {
        self.local = true;
        self
    }

    /// Set a track descriptor. `track_id` of `None` means no handle.
    #[must_use]
    pub fn track(mut self, kind: TrackKind, state: TrackState, track_id: Option<&str>) -> Self {
        let descriptor = TrackDescriptor {
            state,
            persistent_track: track_id.map(|id| MediaTrack::new(id, kind)),
        };
        match kind {
            TrackKind::Video => self.video = Some(descriptor),
            TrackKind::Audio => self.audio = Some(descriptor),
        }
        self
    }

    #[must_use]
    pub fn video_playable(self, track_id: &str) -> Self {
        self.track(TrackKind::Video, TrackState::Playable, Some(track_id))
    }

    #[must_use]
    pub fn audio_playable(self, track_id: &str) -> Self {
        self.track(TrackKind::Audio, TrackState::Playable, Some(track_id))
    }

    /// Video reported off with no handle.
    #[must_use]
    pub fn video_off(self) -> Self {
        self.track(TrackKind::Video, TrackState::Off, None)
    }

    #[must_use]
    pub fn id(&self) -> ParticipantId {
        ParticipantId(self.session_id.clone())
    }

    #[must_use]
    pub fn build(&self) -> ParticipantRecord {
        ParticipantRecord {
            session_id: self.id(),
            user_name: self.user_name.clone(),
            local: self.local,
            tracks: ParticipantTracks {
                video: self.video.clone(),
                audio: self.audio.clone(),
            },
        }
    }
}

#[must_use]
pub fn joined_meeting(local: ParticipantRecord) -> CallEvent {
    CallEvent::JoinedMeeting { local: Some(local) }
}

#[must_use]
pub fn participant_joined(participant: ParticipantRecord) -> CallEvent {
    CallEvent::ParticipantJoined {
        participant: Some(participant),
    }
}

#[must_use]
pub fn participant_updated(participant: ParticipantRecord) -> CallEvent {
    CallEvent::ParticipantUpdated {
        participant: Some(participant),
    }
}

#[must_use]
pub fn track_started(participant: ParticipantRecord, kind: TrackKind) -> CallEvent {
    CallEvent::TrackStarted {
        participant: Some(participant),
        kind,
    }
}

#[must_use]
pub fn track_stopped(participant: ParticipantRecord, kind: TrackKind) -> CallEvent {
    CallEvent::TrackStopped {
        participant: Some(participant),
        kind,
    }
}

/// `participant-left` carrying only the id and name.
#[must_use]
pub fn participant_left(participant: &TestParticipant) -> CallEvent {
    CallEvent::ParticipantLeft {
        participant: Some(ParticipantRecord {
            tracks: ParticipantTracks::default(),
            ..participant.build()
        }),
    }
}

#[must_use]
pub fn fatal_error(message: &str) -> CallEvent {
    CallEvent::Error {
        message: Some(message.to_string()),
    }
}

/// A chat line from a remote participant.
#[must_use]
pub fn chat_message(from: &str, name: &str, message: &str) -> CallEvent {
    CallEvent::AppMessage {
        data: Some(json!({ "message": message, "name": name })),
        from: Some(ParticipantId::from(from)),
    }
}

/// The chat-history control message.
#[must_use]
pub fn chat_history_request(from: &str) -> CallEvent {
    CallEvent::AppMessage {
        data: Some(json!({ "event": "request-chat-history" })),
        from: Some(ParticipantId::from(from)),
    }
}
