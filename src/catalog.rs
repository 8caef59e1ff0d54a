//! # Catalog Import
//!
//! Populates the `tracks` collection from the audio root. Each mood owns a
//! directory directly under the root; every supported audio file inside it
//! (one level, no recursion) becomes one track keyed by `(filePath, mood)`.
//!
//! Re-running the import refreshes existing records instead of duplicating
//! them, so it is safe to run after every batch of new files.

use crate::error::Result;
use crate::library::AudioRoot;
use crate::models::{Mood, Track};
use crate::store::{collections, encode, DocumentStore, Filter};
use chrono::Utc;
use log::{debug, info, warn};
use walkdir::WalkDir;

/// File extensions picked up by the scan, lowercase.
pub const AUDIO_EXTENSIONS: [&str; 4] = ["mp3", "wav", "m4a", "ogg"];

/// An audio file found under a mood directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFile {
    pub mood: Mood,
    pub file_name: String,
    /// `"<mood>/<file_name>"`, relative to the audio root.
    pub file_path: String,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub created: usize,
    pub updated: usize,
}

fn is_audio_file(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| AUDIO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// List the audio files of every mood directory, sorted by name per mood.
///
/// Missing mood directories and unreadable entries are skipped with a
/// warning.
#[must_use]
pub fn scan_audio_root(root: &AudioRoot) -> Vec<AudioFile> {
    let mut files = Vec::new();

    for mood in Mood::ALL {
        let dir = root.path().join(mood.as_str());
        if !dir.is_dir() {
            warn!("Directory not found, skipping: {}", dir.display());
            continue;
        }

        let before = files.len();
        let entries = WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!("Failed to read entry in {}: {err}", dir.display());
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file());

        for entry in entries {
            let Some(file_name) = entry.file_name().to_str() else {
                warn!("Skipping non UTF-8 file name in {}", dir.display());
                continue;
            };
            if !is_audio_file(file_name) {
                debug!("Skipping non-audio file {file_name}");
                continue;
            }
            files.push(AudioFile {
                mood,
                file_name: file_name.to_string(),
                file_path: format!("{mood}/{file_name}"),
            });
        }
        info!("Found {} audio files for {mood}", files.len() - before);
    }

    files
}

/// Upsert one track per file. Existing tracks keep their id and
/// `createdAt`; everything else is rewritten.
pub fn import(store: &dyn DocumentStore, files: &[AudioFile]) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();

    for file in files {
        let track = Track {
            id: String::new(),
            mood: file.mood,
            tags: vec![file.mood.to_string()],
            duration_sec: 0,
            file_path: Some(file.file_path.clone()),
            prompt: format!("Auto-imported: {}", file.file_name),
            created_at: Some(Utc::now()),
        };

        let existing = store.query(
            collections::TRACKS,
            &[
                Filter::eq("filePath", file.file_path.as_str()),
                Filter::eq("mood", file.mood.as_str()),
            ],
        )?;

        match existing.first() {
            Some(doc) => {
                let mut fields = encode(&track)?;
                fields.remove("createdAt");
                store.update(collections::TRACKS, &doc.id, fields)?;
                debug!("Updated {} ({})", file.file_path, doc.id);
                summary.updated += 1;
            }
            None => {
                let id = store.add(collections::TRACKS, encode(&track)?)?;
                debug!("Created {} ({id})", file.file_path);
                summary.created += 1;
            }
        }
    }

    info!("Import done: {} created, {} updated", summary.created, summary.updated);
    Ok(summary)
}

/// Catalog tracks, optionally restricted to one mood, in insertion order.
pub fn list_tracks(store: &dyn DocumentStore, mood: Option<Mood>) -> Result<Vec<Track>> {
    let filters: Vec<Filter> = mood.map(|m| Filter::eq("mood", m.as_str())).into_iter().collect();
    let docs = store.query(collections::TRACKS, &filters)?;

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
