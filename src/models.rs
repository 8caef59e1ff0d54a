//! Catalog and session records.
//!
//! These are the typed views of the documents kept in the `tracks`,
//! `sessions` and `userEvents` collections. Every field the store may lack
//! has a serde default, so partially written records still decode.

use crate::error::WaveError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Uid recorded for sessions and events without an authenticated user.
pub const ANONYMOUS_UID: &str = "anon";

/// Playlist category partitioning the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Focus,
    Chill,
    Sleep,
    Ambient,
}

impl Mood {
    pub const ALL: [Mood; 4] = [Mood::Focus, Mood::Chill, Mood::Sleep, Mood::Ambient];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Mood::Focus => "focus",
            Mood::Chill => "chill",
            Mood::Sleep => "sleep",
            Mood::Ambient => "ambient",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mood {
    type Err = WaveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mood::ALL
            .into_iter()
            .find(|mood| mood.as_str() == s)
            .ok_or_else(|| WaveError::Validation(format!("unknown mood '{s}'")))
    }
}

/// A catalog entry backed by an audio file under the audio root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    #[serde(default)]
    pub id: String,
    pub mood: Mood,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub duration_sec: u32,
    /// Mood-namespaced relative path, `"<mood>/<file>"`.
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Per-listening-run state: recent history and tag preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub id: String,
    #[serde(default = "anonymous")]
    pub uid: String,
    #[serde(default)]
    pub mood: Option<Mood>,
    /// Newest first.
    #[serde(default)]
    pub last_track_ids: Vec<String>,
    #[serde(default)]
    pub liked_tags: Vec<String>,
    #[serde(default)]
    pub skipped_tags: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Session {
    /// A fresh session record as written by `POST /session/start`.
    #[must_use]
    pub fn new(mood: Mood, uid: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: String::new(),
            uid: uid.unwrap_or_else(anonymous),
            mood: Some(mood),
            last_track_ids: Vec::new(),
            liked_tags: Vec::new(),
            skipped_tags: Vec::new(),
            created_at: Some(now),
            updated_at: Some(now),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self {
            id: String::new(),
            uid: anonymous(),
            mood: None,
            last_track_ids: Vec::new(),
            liked_tags: Vec::new(),
            skipped_tags: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }
}

fn anonymous() -> String {
    ANONYMOUS_UID.to_string()
}

/// Kind of a client-reported listening event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Play,
    Like,
    Skip,
}

impl EventKind {
    /// The preference fold this event triggers, if any.
    #[must_use]
    pub const fn feedback(self) -> Option<Feedback> {
        match self {
            EventKind::Play => None,
            EventKind::Like => Some(Feedback::Like),
            EventKind::Skip => Some(Feedback::Skip),
        }
    }
}

impl FromStr for EventKind {
    type Err = WaveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "play" => Ok(EventKind::Play),
            "like" => Ok(EventKind::Like),
            "skip" => Ok(EventKind::Skip),
            other => Err(WaveError::Validation(format!("unknown event type '{other}'"))),
        }
    }
}

/// Implicit feedback folded into a session's tag preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    Like,
    Skip,
}

impl Feedback {
    /// Session field holding the tag set this feedback extends.
    #[must_use]
    pub const fn field(self) -> &'static str {
        match self {
            Feedback::Like => "likedTags",
            Feedback::Skip => "skippedTags",
        }
    }
}

/// Append-only record of one listening event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEvent {
    pub uid: String,
    pub track_id: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub session_id: String,
    pub created_at: DateTime<Utc>,
}
