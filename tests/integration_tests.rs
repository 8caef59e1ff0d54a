//! # Integration Tests for Playflon
//!
//! End-to-end tests over the SQLite store and real audio files in a
//! temporary directory: catalog import, session waves, feedback, the HTTP
//! handlers and the CLI binary.

use anyhow::Result;
use playflon::catalog;
use playflon::library::AudioRoot;
use playflon::models::{EventKind, Mood, Session};
use playflon::session::SessionUpdater;
use playflon::store::{collections, DocumentStore, SqliteStore};
use playflon::wave::TrackSelector;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Test helper: an audio root with `count` one-kilobyte files per listed
/// mood, imported into a fresh SQLite store.
fn create_library(moods: &[(Mood, usize)]) -> Result<(TempDir, Arc<SqliteStore>, Arc<AudioRoot>)> {
    let temp_dir = TempDir::new()?;
    let audio_dir = temp_dir.path().join("audio");

    for &(mood, count) in moods {
        let mood_dir = audio_dir.join(mood.as_str());
        fs::create_dir_all(&mood_dir)?;
        for i in 0..count {
            fs::write(mood_dir.join(format!("track{i:02}.mp3")), vec![0u8; 1024])?;
        }
    }
    fs::create_dir_all(&audio_dir)?;

    let store = Arc::new(SqliteStore::open(temp_dir.path().join("wave.db"))?);
    let audio = Arc::new(AudioRoot::new(&audio_dir)?);
    catalog::import(store.as_ref(), &catalog::scan_audio_root(&audio))?;

    Ok((temp_dir, store, audio))
}

fn load_session(store: &SqliteStore, id: &str) -> Result<Session> {
    let doc = store
        .get(collections::SESSIONS, id)?
        .ok_or_else(|| anyhow::anyhow!("session {id} missing"))?;
    Ok(doc.decode()?)
}

#[cfg(test)]
mod wave_integration_tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_wave_avoids_recent_history() -> Result<()> {
        let (_dir, store, audio) = create_library(&[(Mood::Focus, 30)])?;
        let updater = SessionUpdater::new(store.clone());
        let selector = TrackSelector::new(store.clone(), audio.clone());
        let session = updater.start(Mood::Focus, None)?;
        let mut rng = StdRng::seed_from_u64(42);

        let mut played: Vec<String> = Vec::new();
        for _ in 0..60 {
            let track = selector
                .select_next(&session, Mood::Focus, &mut rng)?
                .ok_or_else(|| anyhow::anyhow!("no track"))?;
            let recent: Vec<&String> = played.iter().rev().take(20).collect();
            assert!(!recent.contains(&&track.id), "{} repeated within 20 plays", track.id);

            updater.record_played(&session, &track.id)?;
            played.push(track.id);
        }

        let history = load_session(&store, &session)?.last_track_ids;
        assert_eq!(history.len(), 20);
        let expected: Vec<String> = played.iter().rev().take(20).cloned().collect();
        assert_eq!(history, expected);
        Ok(())
    }

    #[test]
    fn test_small_catalog_keeps_playing() -> Result<()> {
        let (_dir, store, audio) = create_library(&[(Mood::Sleep, 3)])?;
        let updater = SessionUpdater::new(store.clone());
        let selector = TrackSelector::new(store.clone(), audio.clone());
        let session = updater.start(Mood::Sleep, None)?;
        let mut rng = StdRng::seed_from_u64(7);

        let mut seen = HashSet::new();
        for _ in 0..10 {
            let track = selector
                .select_next(&session, Mood::Sleep, &mut rng)?
                .ok_or_else(|| anyhow::anyhow!("wave stopped"))?;
            updater.record_played(&session, &track.id)?;
            seen.insert(track.id);
        }
        assert_eq!(seen.len(), 3);
        Ok(())
    }

    #[test]
    fn test_deleted_file_is_never_dispatched() -> Result<()> {
        let (dir, store, audio) = create_library(&[(Mood::Chill, 2)])?;
        fs::remove_file(dir.path().join("audio/chill/track00.mp3"))?;
        let selector = TrackSelector::new(store.clone(), audio.clone());
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..20 {
            let track = selector
                .select_next("any-session", Mood::Chill, &mut rng)?
                .ok_or_else(|| anyhow::anyhow!("no track"))?;
            assert_eq!(track.file_path.as_deref(), Some("chill/track01.mp3"));
        }
        Ok(())
    }

    #[test]
    fn test_empty_mood_yields_nothing() -> Result<()> {
        let (_dir, store, audio) = create_library(&[(Mood::Focus, 2)])?;
        let selector = TrackSelector::new(store.clone(), audio.clone());
        let mut rng = StdRng::seed_from_u64(1);

        assert!(selector.select_next("s", Mood::Ambient, &mut rng)?.is_none());
        Ok(())
    }
}

#[cfg(test)]
mod feedback_integration_tests {
    use super::*;
    use playflon::models::Track;
    use playflon::store::Filter;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn tag_track(store: &SqliteStore, file_path: &str, tags: &[&str]) -> Result<String> {
        let docs = store.query(collections::TRACKS, &[Filter::eq("filePath", file_path)])?;
        let doc = docs.first().ok_or_else(|| anyhow::anyhow!("{file_path} not imported"))?;
        let mut fields = playflon::store::Fields::new();
        fields.insert("tags".to_string(), serde_json::json!(tags));
        store.update(collections::TRACKS, &doc.id, fields)?;
        Ok(doc.id.clone())
    }

    #[test]
    fn test_like_steers_the_wave() -> Result<()> {
        let (_dir, store, audio) = create_library(&[(Mood::Focus, 6)])?;
        let piano = tag_track(&store, "focus/track03.mp3", &["piano"])?;
        let updater = SessionUpdater::new(store.clone());
        let selector = TrackSelector::new(store.clone(), audio.clone());
        let session = updater.start(Mood::Focus, Some("listener".to_string()))?;

        updater.record_event(&session, &piano, EventKind::Like, Some("listener".to_string()))?;
        assert_eq!(load_session(&store, &session)?.liked_tags, vec!["piano"]);

        let mut rng = StdRng::seed_from_u64(3);
        let track: Track = selector
            .select_next(&session, Mood::Focus, &mut rng)?
            .ok_or_else(|| anyhow::anyhow!("no track"))?;
        assert_eq!(track.id, piano, "the only liked track is the only positive score");
        Ok(())
    }

    #[test]
    fn test_events_are_logged_in_order() -> Result<()> {
        let (_dir, store, _audio) = create_library(&[(Mood::Focus, 1)])?;
        let updater = SessionUpdater::new(store.clone());
        let session = updater.start(Mood::Focus, None)?;

        for kind in [EventKind::Play, EventKind::Skip, EventKind::Like] {
            updater.record_event(&session, "track", kind, None)?;
        }

        let kinds: Vec<EventKind> = store
            .query(collections::USER_EVENTS, &[])?
            .iter()
            .map(|doc| doc.decode::<playflon::models::UserEvent>().map(|e| e.kind))
            .collect::<Result<_, _>>()?;
        assert_eq!(kinds, vec![EventKind::Play, EventKind::Skip, EventKind::Like]);
        Ok(())
    }
}

#[cfg(test)]
mod catalog_integration_tests {
    use super::*;

    #[test]
    fn test_rescan_is_idempotent() -> Result<()> {
        let (_dir, store, audio) = create_library(&[(Mood::Focus, 2), (Mood::Ambient, 1)])?;

        let summary = catalog::import(store.as_ref(), &catalog::scan_audio_root(&audio))?;
        assert_eq!(summary.created, 0);
        assert_eq!(summary.updated, 3);
        assert_eq!(catalog::list_tracks(store.as_ref(), None)?.len(), 3);
        Ok(())
    }

    #[test]
    fn test_store_survives_reopen() -> Result<()> {
        let (dir, store, _audio) = create_library(&[(Mood::Chill, 2)])?;
        drop(store);

        let reopened = SqliteStore::open(dir.path().join("wave.db"))?;
        assert_eq!(catalog::list_tracks(&reopened, Some(Mood::Chill))?.len(), 2);
        Ok(())
    }
}

#[cfg(test)]
mod http_integration_tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::extract::{Path as UrlPath, Query, State};
    use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
    use axum::response::IntoResponse;
    use axum::Json;
    use playflon::algorithm::ScoringContext;
    use playflon::server::{self, AppState, NextParams};
    use playflon::session::SessionLimits;

    fn app_state(store: Arc<SqliteStore>, audio_dir: &Path) -> Result<AppState> {
        Ok(AppState::new(
            store,
            AudioRoot::new(audio_dir)?,
            ScoringContext::default(),
            SessionLimits::default(),
        ))
    }

    #[tokio::test]
    async fn test_next_then_stream_range() -> Result<()> {
        let (dir, store, _audio) = create_library(&[(Mood::Focus, 1)])?;
        let state = app_state(store.clone(), &dir.path().join("audio"))?;
        let updater = SessionUpdater::new(store.clone());
        let session = updater.start(Mood::Focus, None)?;

        let params = Query(NextParams {
            session_id: Some(session.clone()),
            mood: Some("focus".to_string()),
        });
        let Json(next) = server::wave_next(State(state.clone()), Ok(params)).await?;
        let track = next.track.ok_or_else(|| anyhow::anyhow!("no track"))?;
        assert_eq!(next.stream_url, Some(format!("/stream/{}", track.id)));
        assert_eq!(load_session(&store, &session)?.last_track_ids, vec![track.id.clone()]);

        let mut headers = HeaderMap::new();
        headers.insert(header::RANGE, HeaderValue::from_static("bytes=0-99"));
        let response = server::stream_track(State(state.clone()), UrlPath(track.id), headers).await?;
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 0-99/1024");
        assert_eq!(response.headers()[header::ACCEPT_RANGES], "bytes");
        assert_eq!(to_bytes(response.into_body(), usize::MAX).await?.len(), 100);
        Ok(())
    }

    #[tokio::test]
    async fn test_traversal_is_rejected_before_disk() -> Result<()> {
        let (dir, store, _audio) = create_library(&[(Mood::Focus, 1)])?;
        fs::write(dir.path().join("secret.mp3"), b"secret")?;
        let state = app_state(store, &dir.path().join("audio"))?;

        let err = server::audio_file(
            State(state),
            UrlPath(("focus".to_string(), "../../secret.mp3".to_string())),
            HeaderMap::new(),
        )
        .await
        .err()
        .ok_or_else(|| anyhow::anyhow!("traversal was served"))?;
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn test_bad_range_is_416() -> Result<()> {
        let (dir, store, _audio) = create_library(&[(Mood::Ambient, 1)])?;
        let state = app_state(store, &dir.path().join("audio"))?;
        let mut headers = HeaderMap::new();
        headers.insert(header::RANGE, HeaderValue::from_static("bytes=5000-"));

        let err = server::audio_file(
            State(state),
            UrlPath(("ambient".to_string(), "track00.mp3".to_string())),
            headers,
        )
        .await
        .err()
        .ok_or_else(|| anyhow::anyhow!("range was served"))?;
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes */1024");
        Ok(())
    }
}

#[cfg(test)]
mod cli_tests {
    use super::*;
    use std::process::Command;

    fn playflon() -> Command {
        Command::new(env!("CARGO_BIN_EXE_playflon"))
    }

    #[test]
    fn test_cli_help_displays_correctly() {
        let output = playflon().arg("--help").output().expect("Failed to run help command");
        let stdout = String::from_utf8_lossy(&output.stdout);

        assert!(output.status.success());
        assert!(stdout.contains("serve"));
        assert!(stdout.contains("scan"));
        assert!(stdout.contains("completion"));
    }

    #[test]
    fn test_completion_generation() {
        let output = playflon()
            .args(["completion", "bash"])
            .output()
            .expect("Failed to run completion command");

        assert!(output.status.success());
        assert!(String::from_utf8_lossy(&output.stdout).contains("playflon"));
    }

    #[test]
    fn test_scan_then_list() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let audio_dir = temp_dir.path().join("audio");
        fs::create_dir_all(audio_dir.join("chill"))?;
        fs::write(audio_dir.join("chill/dusk.mp3"), b"ID3")?;
        let db = temp_dir.path().join("wave.db");

        let scan = playflon()
            .arg("scan")
            .arg("--audio-root")
            .arg(&audio_dir)
            .arg("--db")
            .arg(&db)
            .output()?;
        assert!(scan.status.success(), "{}", String::from_utf8_lossy(&scan.stderr));
        assert!(String::from_utf8_lossy(&scan.stdout).contains("1 created"));

        let list = playflon().args(["list", "--mood", "chill", "--db"]).arg(&db).output()?;
        let stdout = String::from_utf8_lossy(&list.stdout);
        assert!(list.status.success());
        assert!(stdout.contains("chill/dusk.mp3"));
        assert!(stdout.contains("1 tracks"));
        Ok(())
    }

    #[test]
    fn test_serve_rejects_missing_audio_root() {
        let output = playflon()
            .args(["serve", "--audio-root", "/definitely/not/here", "--port", "0"])
            .output()
            .expect("Failed to run serve command");

        assert!(!output.status.success());
        assert!(String::from_utf8_lossy(&output.stderr).contains("does not exist"));
    }
}
