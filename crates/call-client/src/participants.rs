//! Participant view-models.
//!
//! A [`ParticipantView`] is the local projection of one transport participant:
//! display name, local flag, and per-kind readiness plus the track handle the
//! rendering layer should play. [`ParticipantCollection`] keys views by
//! session id and is the single source of truth for the tile grid.

use crate::transport::{MediaTrack, ParticipantId, ParticipantRecord, TrackKind};

use serde::Serialize;
use std::collections::HashMap;

/// Rendering projection of a call participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantView {
    pub id: ParticipantId,
    pub user_name: String,
    pub local: bool,
    pub video_ready: bool,
    pub audio_ready: bool,
    pub video_track: Option<MediaTrack>,
    pub audio_track: Option<MediaTrack>,
}

/// Readiness classification for one track kind of a record.
///
/// A track is ready when the transport holds a handle for it and reports it
/// playable or loading.
fn classify(record: &ParticipantRecord, kind: TrackKind) -> (bool, Option<MediaTrack>) {
    match record.tracks.get(kind) {
        Some(descriptor) => {
            let track = descriptor.persistent_track.clone();
            let ready = track.is_some() && descriptor.state.is_ready();
            (ready, track)
        }
        None => (false, None),
    }
}

impl ParticipantView {
    /// Build a view from a transport record.
    #[must_use]
    pub fn from_record(record: &ParticipantRecord) -> Self {
        let (video_ready, video_track) = classify(record, TrackKind::Video);
        let (audio_ready, audio_track) = classify(record, TrackKind::Audio);
        Self {
            id: record.session_id.clone(),
            user_name: record.user_name.clone(),
            local: record.local,
            video_ready,
            audio_ready,
            video_track,
            audio_track,
        }
    }

    /// Whether media of `kind` should be rendered.
    #[must_use]
    pub fn is_ready(&self, kind: TrackKind) -> bool {
        match kind {
            TrackKind::Video => self.video_ready,
            TrackKind::Audio => self.audio_ready,
        }
    }

    /// Stored handle for `kind`, if any.
    #[must_use]
    pub fn track(&self, kind: TrackKind) -> Option<&MediaTrack> {
        match kind {
            TrackKind::Video => self.video_track.as_ref(),
            TrackKind::Audio => self.audio_track.as_ref(),
        }
    }

    fn slots_mut(&mut self, kind: TrackKind) -> (&mut bool, &mut Option<MediaTrack>) {
        match kind {
            TrackKind::Video => (&mut self.video_ready, &mut self.video_track),
            TrackKind::Audio => (&mut self.audio_ready, &mut self.audio_track),
        }
    }

    /// Re-evaluate one track kind against a fresh record.
    ///
    /// The readiness flag follows the record. The stored handle is replaced
    /// only when the new state is ready and the handle identity differs; a
    /// stopped track keeps its last handle so a later restart of the same track
    /// does not rebuild the stream. Returns whether anything changed.
    pub fn apply_track(&mut self, record: &ParticipantRecord, kind: TrackKind) -> bool {
        let (ready, track) = classify(record, kind);
        let (stored_ready, stored_track) = self.slots_mut(kind);
        let mut changed = false;

        if *stored_ready != ready {
            *stored_ready = ready;
            changed = true;
        }

        if ready {
            let new_id = track.as_ref().map(|t| &t.id);
            let old_id = stored_track.as_ref().map(|t| &t.id);
            if new_id != old_id {
                *stored_track = track;
                changed = true;
            }
        }

        changed
    }
}

/// Participant views keyed by session id.
#[derive(Debug, Default)]
pub struct ParticipantCollection {
    views: HashMap<ParticipantId, ParticipantView>,
}

impl ParticipantCollection {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the view for a record.
    pub fn upsert(&mut self, record: &ParticipantRecord) {
        self.views
            .insert(record.session_id.clone(), ParticipantView::from_record(record));
    }

    /// Remove a view. Returns whether it was present.
    pub fn remove(&mut self, id: &ParticipantId) -> bool {
        self.views.remove(id).is_some()
    }

    /// Get a view by session id.
    #[must_use]
    pub fn get(&self, id: &ParticipantId) -> Option<&ParticipantView> {
        self.views.get(id)
    }

    /// Get a mutable view by session id.
    pub fn get_mut(&mut self, id: &ParticipantId) -> Option<&mut ParticipantView> {
        self.views.get_mut(id)
    }

    /// Whether a view exists for `id`.
    #[must_use]
    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.views.contains_key(id)
    }

    /// Number of views.
    #[must_use]
    pub fn len(&self) -> usize {
        self.views.len()
    }

    /// Whether the collection holds no views.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Remove every view.
    pub fn clear(&mut self) {
        self.views.clear();
    }

    /// Views in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &ParticipantView> {
        self.views.values()
    }

    /// Views in display order: local participant first, then by name, then by id.
    #[must_use]
    pub fn ordered(&self) -> Vec<&ParticipantView> {
        let mut views: Vec<&ParticipantView> = self.views.values().collect();
        views.sort_by(|a, b| {
            b.local
                .cmp(&a.local)
                .then_with(|| a.user_name.cmp(&b.user_name))
                .then_with(|| a.id.cmp(&b.id))
        });
        views
    }
}
