//! In-process loopback transport.
//!
//! Stands in for the real SDK in the replay harness and in integration tests.
//! Joining and leaving complete immediately by emitting the corresponding
//! events; local media toggles emit track events for the local participant
//! with a fresh track handle each time media is re-enabled. Remote events are
//! injected through a [`LoopbackRemote`].

use super::{
    AccessLevel, AccessState, CallEvent, CallTransport, EventSink, MediaTrack, ParticipantId,
    ParticipantRecord, ParticipantTracks, SubscriptionId, TrackDescriptor, TrackKind, TrackState,
    TransportFactory,
};
use crate::errors::TransportError;
use crate::intake::JoinRequest;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[derive(Debug)]
struct LoopbackState {
    sinks: Vec<(SubscriptionId, EventSink)>,
    next_subscription: u64,
    local_id: ParticipantId,
    user_name: String,
    joined: bool,
    destroyed: bool,
    video_enabled: bool,
    audio_enabled: bool,
    video_generation: u32,
    audio_generation: u32,
    access: AccessState,
    sent_messages: Vec<serde_json::Value>,
}

impl LoopbackState {
    fn emit(&mut self, event: &CallEvent) {
        // Drop sinks whose receiver is gone.
        self.sinks.retain(|(_, sink)| sink.send(event.clone()).is_ok());
    }

    fn local_track(&self, kind: TrackKind) -> TrackDescriptor {
        let (enabled, generation) = match kind {
            TrackKind::Video => (self.video_enabled, self.video_generation),
            TrackKind::Audio => (self.audio_enabled, self.audio_generation),
        };
        if enabled {
            TrackDescriptor {
                state: TrackState::Playable,
                persistent_track: Some(MediaTrack::new(
                    format!("{}-{}-{generation}", self.local_id, kind.as_str()),
                    kind,
                )),
            }
        } else {
            TrackDescriptor {
                state: TrackState::Off,
                persistent_track: None,
            }
        }
    }

    fn local_record(&self) -> ParticipantRecord {
        ParticipantRecord {
            session_id: self.local_id.clone(),
            user_name: self.user_name.clone(),
            local: true,
            tracks: ParticipantTracks {
                video: Some(self.local_track(TrackKind::Video)),
                audio: Some(self.local_track(TrackKind::Audio)),
            },
        }
    }

    fn ensure_usable(&self) -> Result<(), TransportError> {
        if self.destroyed {
            Err(TransportError::Destroyed)
        } else {
            Ok(())
        }
    }

    fn set_local(&mut self, kind: TrackKind, enabled: bool) -> Result<(), TransportError> {
        self.ensure_usable()?;
        let current = match kind {
            TrackKind::Video => &mut self.video_enabled,
            TrackKind::Audio => &mut self.audio_enabled,
        };
        if *current == enabled {
            return Ok(());
        }
        *current = enabled;
        if enabled {
            match kind {
                TrackKind::Video => self.video_generation += 1,
                TrackKind::Audio => self.audio_generation += 1,
            }
        }

        if self.joined {
            let participant = Some(self.local_record());
            let event = if enabled {
                CallEvent::TrackStarted { participant, kind }
            } else {
                CallEvent::TrackStopped { participant, kind }
            };
            self.emit(&event);
        }
        Ok(())
    }
}

/// Loopback transport. See the module docs.
#[derive(Debug)]
pub struct LoopbackTransport {
    state: Arc<Mutex<LoopbackState>>,
}

/// Injects remote-side events into a [`LoopbackTransport`] and inspects what it sent.
#[derive(Debug, Clone)]
pub struct LoopbackRemote {
    state: Arc<Mutex<LoopbackState>>,
}

fn lock(state: &Mutex<LoopbackState>) -> MutexGuard<'_, LoopbackState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl LoopbackTransport {
    /// Create a loopback transport with camera and microphone enabled and a public room.
    #[must_use]
    pub fn new(local_id: impl Into<String>) -> (Self, LoopbackRemote) {
        let state = Arc::new(Mutex::new(LoopbackState {
            sinks: Vec::new(),
            next_subscription: 1,
            local_id: ParticipantId(local_id.into()),
            user_name: String::new(),
            joined: false,
            destroyed: false,
            video_enabled: true,
            audio_enabled: true,
            video_generation: 1,
            audio_generation: 1,
            access: AccessState::Known {
                level: AccessLevel::Full,
            },
            sent_messages: Vec::new(),
        }));
        let remote = LoopbackRemote {
            state: Arc::clone(&state),
        };
        (Self { state }, remote)
    }

    /// Override the access state reported after joining.
    #[must_use]
    pub fn with_access(self, access: AccessState) -> Self {
        lock(&self.state).access = access;
        self
    }
}

impl LoopbackRemote {
    /// Deliver an event to every subscriber as if it came from the network.
    pub fn inject(&self, event: CallEvent) {
        lock(&self.state).emit(&event);
    }

    /// Application messages sent by the local user, oldest first.
    #[must_use]
    pub fn sent_messages(&self) -> Vec<serde_json::Value> {
        lock(&self.state).sent_messages.clone()
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        lock(&self.state).sinks.len()
    }

    /// Whether `destroy` has been called.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        lock(&self.state).destroyed
    }
}

impl CallTransport for LoopbackTransport {
    fn subscribe(&mut self, sink: EventSink) -> SubscriptionId {
        let mut state = lock(&self.state);
        let id = SubscriptionId(state.next_subscription);
        state.next_subscription += 1;
        state.sinks.push((id, sink));
        id
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        lock(&self.state).sinks.retain(|(sub, _)| *sub != id);
    }

    fn join(&mut self, request: &JoinRequest) -> Result<(), TransportError> {
        let mut state = lock(&self.state);
        state.ensure_usable()?;
        if state.joined {
            return Err(TransportError::Rejected("already joined".to_string()));
        }
        debug!(target: "call.transport.loopback", url = %request.url, "Loopback join");
        state.user_name = request.user_name.clone();
        state.joined = true;
        let local = Some(state.local_record());
        state.emit(&CallEvent::JoinedMeeting { local });
        Ok(())
    }

    fn leave(&mut self) -> Result<(), TransportError> {
        let mut state = lock(&self.state);
        state.ensure_usable()?;
        if !state.joined {
            return Err(TransportError::NotJoined);
        }
        state.joined = false;
        state.emit(&CallEvent::LeftMeeting);
        Ok(())
    }

    fn destroy(&mut self) -> Result<(), TransportError> {
        let mut state = lock(&self.state);
        state.joined = false;
        state.destroyed = true;
        state.sinks.clear();
        Ok(())
    }

    fn local_video(&self) -> bool {
        lock(&self.state).video_enabled
    }

    fn local_audio(&self) -> bool {
        lock(&self.state).audio_enabled
    }

    fn set_local_video(&mut self, enabled: bool) -> Result<(), TransportError> {
        lock(&self.state).set_local(TrackKind::Video, enabled)
    }

    fn set_local_audio(&mut self, enabled: bool) -> Result<(), TransportError> {
        lock(&self.state).set_local(TrackKind::Audio, enabled)
    }

    fn send_app_message(&mut self, data: serde_json::Value) -> Result<(), TransportError> {
        let mut state = lock(&self.state);
        state.ensure_usable()?;
        if !state.joined {
            return Err(TransportError::NotJoined);
        }
        // The sender never receives its own app messages.
        state.sent_messages.push(data);
        Ok(())
    }

    fn access_state(&self) -> AccessState {
        lock(&self.state).access
    }
}

/// Factory producing loopback transports that share one [`LoopbackRemote`] slot.
///
/// The remote of the most recently created transport is kept so a harness can
/// inject events into the active call.
#[derive(Debug, Default)]
pub struct LoopbackFactory {
    local_id: String,
    last_remote: Mutex<Option<LoopbackRemote>>,
}

impl LoopbackFactory {
    #[must_use]
    pub fn new(local_id: impl Into<String>) -> Self {
        Self {
            local_id: local_id.into(),
            last_remote: Mutex::new(None),
        }
    }

    /// Remote handle for the most recently created transport.
    #[must_use]
    pub fn remote(&self) -> Option<LoopbackRemote> {
        self.last_remote
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TransportFactory for LoopbackFactory {
    type Transport = LoopbackTransport;

    fn create(&self) -> LoopbackTransport {
        let (transport, remote) = LoopbackTransport::new(self.local_id.clone());
        *self
            .last_remote
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(remote);
        transport
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn request() -> JoinRequest {
        JoinRequest {
            user_name: "Alice".to_string(),
            url: "https://example.test/R1".to_string(),
        }
    }

    #[test]
    fn test_join_emits_joined_meeting_with_local_record() {
        let (mut transport, _remote) = LoopbackTransport::new("alice");
        let (tx, mut rx) = mpsc::unbounded_channel();
        transport.subscribe(tx);

        transport.join(&request()).unwrap();

        match rx.try_recv().unwrap() {
            CallEvent::JoinedMeeting { local: Some(local) } => {
                assert!(local.local);
                assert_eq!(local.user_name, "Alice");
                let video = local.tracks.video.unwrap();
                assert_eq!(video.state, TrackState::Playable);
                assert!(video.persistent_track.is_some());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_reenabling_video_produces_new_track_identity() {
        let (mut transport, _remote) = LoopbackTransport::new("alice");
        let (tx, mut rx) = mpsc::unbounded_channel();
        transport.subscribe(tx);
        transport.join(&request()).unwrap();
        let _ = rx.try_recv();

        transport.set_local_video(false).unwrap();
        transport.set_local_video(true).unwrap();

        let stopped = rx.try_recv().unwrap();
        assert!(matches!(stopped, CallEvent::TrackStopped { kind: TrackKind::Video, .. }));

        match rx.try_recv().unwrap() {
            CallEvent::TrackStarted {
                participant: Some(p),
                kind: TrackKind::Video,
            } => {
                let track = p.tracks.video.unwrap().persistent_track.unwrap();
                assert_eq!(track.id.0, "alice-video-2");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_unsubscribe_and_destroy_stop_delivery() {
        let (mut transport, remote) = LoopbackTransport::new("alice");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = transport.subscribe(tx);
        assert_eq!(remote.subscriber_count(), 1);

        transport.unsubscribe(id);
        transport.join(&request()).unwrap();
        assert!(rx.try_recv().is_err());

        transport.destroy().unwrap();
        transport.destroy().unwrap();
        assert!(remote.is_destroyed());
        assert_eq!(transport.leave(), Err(TransportError::Destroyed));
    }

    #[test]
    fn test_app_messages_are_not_echoed() {
        let (mut transport, remote) = LoopbackTransport::new("alice");
        let (tx, mut rx) = mpsc::unbounded_channel();
        transport.subscribe(tx);
        transport.join(&request()).unwrap();
        let _ = rx.try_recv();

        transport
            .send_app_message(serde_json::json!({ "message": "hi", "name": "Alice" }))
            .unwrap();

        assert!(rx.try_recv().is_err());
        assert_eq!(remote.sent_messages().len(), 1);
    }
}
