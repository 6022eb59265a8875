//! Playable stream wrappers for participant tiles.
//!
//! The rendering layer plays a [`PlayableStream`], never a raw track. A stream
//! is created the first time a participant has a handle for a kind. When the
//! handle later changes, the old track is detached and the new one attached to
//! the same stream, so its [`StreamId`] stays stable and consuming views do not
//! re-mount.

use crate::participants::ParticipantCollection;
use crate::transport::{MediaTrack, ParticipantId, TrackKind};

use serde::Serialize;
use std::collections::HashMap;
use tracing::trace;
use uuid::Uuid;

/// Identity of a playable stream wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct StreamId(pub Uuid);

impl StreamId {
    /// Fresh random stream id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StreamId {
    fn default() -> Self {
        Self::new()
    }
}

/// A stream wrapper holding at most one attached track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayableStream {
    id: StreamId,
    kind: TrackKind,
    track: Option<MediaTrack>,
}

impl PlayableStream {
    /// Build a stream with `track` attached.
    #[must_use]
    pub fn new(track: MediaTrack) -> Self {
        Self {
            id: StreamId::new(),
            kind: track.kind,
            track: Some(track),
        }
    }

    /// Stable identity of this stream.
    #[must_use]
    pub fn id(&self) -> StreamId {
        self.id
    }

    /// Media kind carried by this stream.
    #[must_use]
    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    /// The currently attached track.
    #[must_use]
    pub fn track(&self) -> Option<&MediaTrack> {
        self.track.as_ref()
    }

    /// Detach the current track and attach `track` in its place.
    ///
    /// Returns the detached track, if any.
    pub fn replace_track(&mut self, track: MediaTrack) -> Option<MediaTrack> {
        self.track.replace(track)
    }
}

/// Streams backing one participant tile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileStreams {
    pub video: Option<PlayableStream>,
    pub audio: Option<PlayableStream>,
}

impl TileStreams {
    /// Stream for `kind`, if created.
    #[must_use]
    pub fn get(&self, kind: TrackKind) -> Option<&PlayableStream> {
        match kind {
            TrackKind::Video => self.video.as_ref(),
            TrackKind::Audio => self.audio.as_ref(),
        }
    }

    fn slot_mut(&mut self, kind: TrackKind) -> &mut Option<PlayableStream> {
        match kind {
            TrackKind::Video => &mut self.video,
            TrackKind::Audio => &mut self.audio,
        }
    }
}

/// What a reconcile pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamChanges {
    pub created: usize,
    pub replaced: usize,
    /// Streams dropped because the view no longer holds a handle for the kind.
    pub dropped_streams: usize,
    pub dropped_tiles: usize,
}

impl StreamChanges {
    /// Whether the pass changed nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.created == 0
            && self.replaced == 0
            && self.dropped_streams == 0
            && self.dropped_tiles == 0
    }
}

/// Per-participant stream wrappers, kept in step with a [`ParticipantCollection`].
#[derive(Debug, Default)]
pub struct StreamRegistry {
    tiles: HashMap<ParticipantId, TileStreams>,
}

impl StreamRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Streams of one participant tile.
    #[must_use]
    pub fn get(&self, id: &ParticipantId) -> Option<&TileStreams> {
        self.tiles.get(id)
    }

    /// Number of tiles with streams.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Whether no tile has streams.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Drop every stream.
    pub fn clear(&mut self) {
        self.tiles.clear();
    }

    /// Bring streams in line with the stored track handles of `participants`.
    pub fn reconcile(&mut self, participants: &ParticipantCollection) -> StreamChanges {
        let mut changes = StreamChanges::default();

        let before = self.tiles.len();
        self.tiles.retain(|id, _| participants.contains(id));
        changes.dropped_tiles = before - self.tiles.len();

        for view in participants.iter() {
            let tile = self.tiles.entry(view.id.clone()).or_default();
            for kind in [TrackKind::Video, TrackKind::Audio] {
                let slot = tile.slot_mut(kind);
                let Some(track) = view.track(kind) else {
                    if let Some(stream) = slot.take() {
                        trace!(
                            target: "call.media",
                            participant_id = %view.id,
                            kind = kind.as_str(),
                            detached = ?stream.track().map(|t| &t.id),
                            "Dropped stream without handle"
                        );
                        changes.dropped_streams += 1;
                    }
                    continue;
                };
                if let Some(stream) = slot.as_mut() {
                    if stream.track().map(|t| &t.id) != Some(&track.id) {
                        let detached = stream.replace_track(track.clone());
                        trace!(
                            target: "call.media",
                            participant_id = %view.id,
                            kind = kind.as_str(),
                            detached = ?detached.map(|t| t.id),
                            "Replaced track in stream"
                        );
                        changes.replaced += 1;
                    }
                } else {
                    *slot = Some(PlayableStream::new(track.clone()));
                    changes.created += 1;
                }
            }
        }

        changes
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::transport::{
        ParticipantRecord, ParticipantTracks, TrackDescriptor, TrackState,
    };

    fn record(id: &str, video: Option<&str>, audio: Option<&str>) -> ParticipantRecord {
        let descriptor = |track: Option<&str>, kind| {
            track.map(|t| TrackDescriptor {
                state: TrackState::Playable,
                persistent_track: Some(MediaTrack::new(t, kind)),
            })
        };
        ParticipantRecord {
            session_id: ParticipantId::from(id),
            user_name: id.to_string(),
            local: false,
            tracks: ParticipantTracks {
                video: descriptor(video, TrackKind::Video),
                audio: descriptor(audio, TrackKind::Audio),
            },
        }
    }

    #[test]
    fn test_reconcile_creates_streams_for_handles() {
        let mut participants = ParticipantCollection::new();
        participants.upsert(&record("bob", Some("v1"), None));

        let mut registry = StreamRegistry::new();
        let changes = registry.reconcile(&participants);

        assert_eq!(changes.created, 1);
        let tile = registry.get(&ParticipantId::from("bob")).unwrap();
        assert_eq!(tile.video.as_ref().unwrap().track().unwrap().id.0, "v1");
        assert!(tile.audio.is_none());
    }

    #[test]
    fn test_replacement_keeps_stream_identity() {
        let mut participants = ParticipantCollection::new();
        participants.upsert(&record("bob", Some("v1"), Some("a1")));
        let mut registry = StreamRegistry::new();
        registry.reconcile(&participants);
        let original = registry
            .get(&ParticipantId::from("bob"))
            .unwrap()
            .get(TrackKind::Video)
            .unwrap()
            .id();

        let restarted = record("bob", Some("v2"), Some("a1"));
        participants
            .get_mut(&ParticipantId::from("bob"))
            .unwrap()
            .apply_track(&restarted, TrackKind::Video);
        let changes = registry.reconcile(&participants);

        assert_eq!(changes.replaced, 1);
        assert_eq!(changes.created, 0);
        let stream = registry
            .get(&ParticipantId::from("bob"))
            .unwrap()
            .get(TrackKind::Video)
            .unwrap();
        assert_eq!(stream.id(), original);
        assert_eq!(stream.track().unwrap().id.0, "v2");
    }

    #[test]
    fn test_unchanged_handles_do_nothing() {
        let mut participants = ParticipantCollection::new();
        participants.upsert(&record("bob", Some("v1"), Some("a1")));
        let mut registry = StreamRegistry::new();
        registry.reconcile(&participants);

        assert!(registry.reconcile(&participants).is_empty());
    }

    #[test]
    fn test_stream_dropped_when_view_loses_handle() {
        let mut participants = ParticipantCollection::new();
        participants.upsert(&record("bob", Some("v1"), Some("a1")));
        let mut registry = StreamRegistry::new();
        registry.reconcile(&participants);

        // A repeated join rebuilds the view without a video handle.
        participants.upsert(&record("bob", None, Some("a1")));
        let changes = registry.reconcile(&participants);

        assert_eq!(changes.dropped_streams, 1);
        assert_eq!(changes.dropped_tiles, 0);
        let tile = registry.get(&ParticipantId::from("bob")).unwrap();
        assert!(tile.video.is_none());
        assert_eq!(tile.audio.as_ref().unwrap().track().unwrap().id.0, "a1");
    }

    #[test]
    fn test_removed_participant_streams_are_dropped() {
        let mut participants = ParticipantCollection::new();
        participants.upsert(&record("bob", Some("v1"), None));
        participants.upsert(&record("carol", None, Some("a9")));
        let mut registry = StreamRegistry::new();
        registry.reconcile(&participants);

        participants.remove(&ParticipantId::from("bob"));
        let changes = registry.reconcile(&participants);

        assert_eq!(changes.dropped_tiles, 1);
        assert!(registry.get(&ParticipantId::from("bob")).is_none());
        assert!(registry.get(&ParticipantId::from("carol")).is_some());
    }
}
