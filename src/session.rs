//! # Session Updater
//!
//! Folds what happens during a listening run back into the session record:
//!
//! - every dispatched track is pushed onto the front of `lastTrackIds`
//! - every like/skip adds the track's tags to `likedTags`/`skippedTags`
//! - every client event is appended to the `userEvents` log
//!
//! Each write is one document update. Two updates racing on the same
//! session are last-write-wins per field; nothing here locks.

use crate::error::{Result, WaveError};
use crate::models::{EventKind, Feedback, Mood, Session, Track, UserEvent, ANONYMOUS_UID};
use crate::store::{collections, encode, DocumentStore, Fields};
use chrono::Utc;
use log::{debug, info, warn};
use serde_json::{json, Value};
use std::sync::Arc;

/// Bounds on the per-session lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    pub history_cap: usize,
    pub tag_cap: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            history_cap: 20,
            tag_cap: 50,
        }
    }
}

/// Prepend `track_id` to `history` and keep at most `cap` entries.
#[must_use]
pub fn push_recent(history: &[String], track_id: &str, cap: usize) -> Vec<String> {
    std::iter::once(track_id.to_string())
        .chain(history.iter().cloned())
        .take(cap)
        .collect()
}

/// Union of `existing` and `tags`, first occurrence wins, truncated to
/// `cap`. Once full, new tags are the ones left out.
#[must_use]
pub fn merge_tags(existing: &[String], tags: &[String], cap: usize) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(existing.len() + tags.len());
    for tag in existing.iter().chain(tags) {
        if !merged.contains(tag) {
            merged.push(tag.clone());
        }
    }
    merged.truncate(cap);
    merged
}

#[derive(Clone)]
pub struct SessionUpdater {
    store: Arc<dyn DocumentStore>,
    limits: SessionLimits,
}

impl SessionUpdater {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_limits(store, SessionLimits::default())
    }

    pub fn with_limits(store: Arc<dyn DocumentStore>, limits: SessionLimits) -> Self {
        Self { store, limits }
    }

    #[must_use]
    pub fn limits(&self) -> SessionLimits {
        self.limits
    }

    /// Create a session for `mood` and return its id.
    pub fn start(&self, mood: Mood, uid: Option<String>) -> Result<String> {
        let session = Session::new(mood, uid, Utc::now());
        let id = self.store.add(collections::SESSIONS, encode(&session)?)?;
        info!("Started {mood} session {id} for {}", session.uid);
        Ok(id)
    }

    /// Record that `track_id` was dispatched to the session.
    ///
    /// # Errors
    ///
    /// `NotFound` when the session does not exist.
    pub fn record_played(&self, session_id: &str, track_id: &str) -> Result<()> {
        let session = self.load_session(session_id)?;
        let history = push_recent(&session.last_track_ids, track_id, self.limits.history_cap);
        debug!("Session {session_id} history now {} entries", history.len());

        self.write(session_id, "lastTrackIds", history)
    }

    /// Fold a like or skip of `track_id` into the session's tag sets.
    ///
    /// A track without tags (or unknown to the catalog) changes nothing.
    /// Likes and skips write separate fields; a tag may sit in both.
    pub fn record_feedback(&self, session_id: &str, track_id: &str, feedback: Feedback) -> Result<()> {
        let tags = self.track_tags(track_id)?;
        if tags.is_empty() {
            debug!("Track {track_id} has no tags, nothing to fold");
            return Ok(());
        }

        let session = self.load_session(session_id)?;
        let existing = match feedback {
            Feedback::Like => &session.liked_tags,
            Feedback::Skip => &session.skipped_tags,
        };
        let merged = merge_tags(existing, &tags, self.limits.tag_cap);

        self.write(session_id, feedback.field(), merged)
    }

    /// Append an event to the log and fold like/skip into preferences.
    ///
    /// A failed preference fold is logged and swallowed so it never fails
    /// the event append it follows.
    pub fn record_event(
        &self,
        session_id: &str,
        track_id: &str,
        kind: EventKind,
        uid: Option<String>,
    ) -> Result<String> {
        let event = UserEvent {
            uid: uid.unwrap_or_else(|| ANONYMOUS_UID.to_string()),
            track_id: track_id.to_string(),
            kind,
            session_id: session_id.to_string(),
            created_at: Utc::now(),
        };
        let event_id = self.store.add(collections::USER_EVENTS, encode(&event)?)?;

        if let Some(feedback) = kind.feedback() {
            if let Err(err) = self.record_feedback(session_id, track_id, feedback) {
                warn!("Failed to fold {feedback:?} for track {track_id} into session {session_id}: {err}");
            }
        }
        Ok(event_id)
    }

    fn load_session(&self, session_id: &str) -> Result<Session> {
        self.store
            .get(collections::SESSIONS, session_id)?
            .ok_or_else(|| WaveError::NotFound(format!("session {session_id}")))?
            .decode()
            .map_err(WaveError::from)
    }

    fn track_tags(&self, track_id: &str) -> Result<Vec<String>> {
        let Some(doc) = self.store.get(collections::TRACKS, track_id)? else {
            return Ok(Vec::new());
        };
        match doc.decode::<Track>() {
            Ok(track) => Ok(track.tags),
            Err(err) => {
                warn!("Track {track_id} is malformed, folding no tags: {err}");
                Ok(Vec::new())
            }
        }
    }

    fn write(&self, session_id: &str, field: &str, values: Vec<String>) -> Result<()> {
        let mut fields = Fields::new();
        fields.insert(field.to_string(), json!(values));
        fields.insert("updatedAt".to_string(), Value::String(Utc::now().to_rfc3339()));
        self.store.update(collections::SESSIONS, session_id, fields)?;
        Ok(())
    }
}
