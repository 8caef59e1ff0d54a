//! # Wave Track Selector
//!
//! Picks the next track of a session's endless wave:
//!
//! 1. load the session's history and tag preferences (empty when the
//!    session record or its fields are missing)
//! 2. fetch the catalog for the requested mood
//! 3. keep tracks that were not played recently and whose file exists
//! 4. score them by tag affinity and pick (see [`crate::algorithm`])
//! 5. when history exhausted the catalog, fall back to every file-present
//!    track of the mood, repeats allowed, unscored
//!
//! Selection never writes. Recording the dispatched track is the job of
//! [`crate::session::SessionUpdater::record_played`].

use crate::algorithm::{self, ScoringContext, TagPreferences};
use crate::error::Result;
use crate::library::FilePresence;
use crate::models::{Mood, Session, Track};
use crate::store::{collections, DocumentStore, Filter};
use log::{debug, info, warn};
use rand::Rng;
use std::sync::Arc;

/// Next-track selector over an injected store and file-presence check.
#[derive(Clone)]
pub struct TrackSelector {
    store: Arc<dyn DocumentStore>,
    presence: Arc<dyn FilePresence>,
    scoring: ScoringContext,
}

impl TrackSelector {
    pub fn new(store: Arc<dyn DocumentStore>, presence: Arc<dyn FilePresence>) -> Self {
        Self::with_scoring(store, presence, ScoringContext::default())
    }

    pub fn with_scoring(
        store: Arc<dyn DocumentStore>,
        presence: Arc<dyn FilePresence>,
        scoring: ScoringContext,
    ) -> Self {
        Self {
            store,
            presence,
            scoring,
        }
    }

    /// Select the next track for `session_id` within `mood`.
    ///
    /// `Ok(None)` means the mood has no playable track; it is not an
    /// error.
    ///
    /// # Errors
    ///
    /// Store read failures only.
    pub fn select_next<R: Rng + ?Sized>(
        &self,
        session_id: &str,
        mood: Mood,
        rng: &mut R,
    ) -> Result<Option<Track>> {
        let session = self.load_session(session_id)?;
        if session.mood.is_some_and(|stored| stored != mood) {
            debug!("Session {session_id} started as {:?}, selecting for {mood}", session.mood);
        }

        let catalog = self.load_catalog(mood)?;
        debug!("{} catalog tracks for {mood}", catalog.len());
        if catalog.is_empty() {
            warn!("No tracks in catalog for mood {mood}");
            return Ok(None);
        }

        let present: Vec<Track> = catalog
            .into_iter()
            .filter(|track| self.has_backing_file(track))
            .collect();

        let eligible: Vec<Track> = present
            .iter()
            .filter(|track| !session.last_track_ids.contains(&track.id))
            .cloned()
            .collect();
        debug!("{} eligible of {} file-present tracks for {mood}", eligible.len(), present.len());

        if !eligible.is_empty() {
            let prefs = TagPreferences {
                liked: &session.liked_tags,
                skipped: &session.skipped_tags,
            };
            return Ok(algorithm::choose_track(&eligible, prefs, &self.scoring, rng).cloned());
        }

        if present.is_empty() {
            warn!("No tracks with existing files for mood {mood}");
            return Ok(None);
        }

        info!(
            "History exhausted mood {mood} for session {session_id}, repeating from {} tracks",
            present.len()
        );
        Ok(algorithm::choose_uniform(&present, rng).cloned())
    }

    fn load_session(&self, session_id: &str) -> Result<Session> {
        let session = match self.store.get(collections::SESSIONS, session_id)? {
            Some(doc) => doc.decode().unwrap_or_else(|err| {
                warn!("Session {session_id} is malformed, using empty preferences: {err}");
                Session::default()
            }),
            None => {
                debug!("Session {session_id} not found, using empty preferences");
                Session::default()
            }
        };
        Ok(session)
    }

    fn load_catalog(&self, mood: Mood) -> Result<Vec<Track>> {
        let docs = self
            .store
            .query(collections::TRACKS, &[Filter::eq("mood", mood.as_str())])?;

        Ok(docs
            .into_iter()
            .filter_map(|doc| match doc.decode::<Track>() {
                Ok(track) => Some(track),
                Err(err) => {
                    warn!("Skipping malformed track {}: {err}", doc.id);
                    None
                }
            })
            .collect())
    }

    fn has_backing_file(&self, track: &Track) -> bool {
        match track.file_path.as_deref() {
            None | Some("") => {
                warn!("Track {} has no filePath, skipping", track.id);
                false
            }
            Some(file_path) if !self.presence.exists(file_path) => {
                warn!("Audio file not found, skipping trackId={}, filePath={file_path}", track.id);
                false
            }
            Some(_) => true,
        }
    }
}
