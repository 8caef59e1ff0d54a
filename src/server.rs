//! # HTTP Server
//!
//! Thin axum layer over the wave engine:
//!
//! - `POST /session/start`        - create a listening session
//! - `GET  /wave/next`            - select, record and return the next track
//! - `POST /events`               - log play/like/skip and fold feedback
//! - `GET  /stream/{trackId}`     - range-stream a catalog track
//! - `GET  /audio/{mood}/{file}`  - range-stream a file straight from disk
//! - `GET  /health`, `GET /`      - liveness and service info
//!
//! Store access is synchronous, so engine calls run on the blocking pool.

use crate::algorithm::ScoringContext;
use crate::error::{Result, WaveError};
use crate::library::{check_filename, AudioRoot};
use crate::models::{EventKind, Mood, Track};
use crate::session::{SessionLimits, SessionUpdater};
use crate::store::{collections, DocumentStore};
use crate::stream;
use crate::wave::TrackSelector;
use anyhow::Context;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;

/// Reason reported by `/wave/next` when the mood has nothing playable.
pub const NO_TRACKS: &str = "NO_TRACKS";

/// Shared handler state. Cloned per request; everything inside is `Arc`.
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn DocumentStore>,
    audio: Arc<AudioRoot>,
    selector: TrackSelector,
    updater: SessionUpdater,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        audio: AudioRoot,
        scoring: ScoringContext,
        limits: SessionLimits,
    ) -> Self {
        let audio = Arc::new(audio);
        Self {
            selector: TrackSelector::with_scoring(store.clone(), audio.clone(), scoring),
            updater: SessionUpdater::with_limits(store.clone(), limits),
            store,
            audio,
        }
    }
}

impl IntoResponse for WaveError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!("Request failed: {self}");
        }
        let body = Json(json!({ "error": self.to_string() }));

        match self {
            WaveError::RangeNotSatisfiable { file_size } => (
                status,
                [
                    (header::CONTENT_RANGE, format!("bytes */{file_size}")),
                    (header::ACCEPT_RANGES, "bytes".to_string()),
                ],
                body,
            )
                .into_response(),
            _ => (status, body).into_response(),
        }
    }
}

/// Run a synchronous engine call on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| WaveError::Io(std::io::Error::other(err)))?
}

fn required(value: Option<String>, name: &str) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| WaveError::Validation(format!("{name} is required")))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextParams {
    pub session_id: Option<String>,
    pub mood: Option<String>,
}

/// Public view of a dispatched track.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackView {
    pub id: String,
    pub mood: Mood,
    pub tags: Vec<String>,
    pub duration_sec: u32,
}

impl From<Track> for TrackView {
    fn from(track: Track) -> Self {
        Self {
            id: track.id,
            mood: track.mood,
            tags: track.tags,
            duration_sec: track.duration_sec,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NextResponse {
    pub track: Option<TrackView>,
    pub stream_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

pub async fn wave_next(
    State(state): State<AppState>,
    params: std::result::Result<Query<NextParams>, QueryRejection>,
) -> Result<Json<NextResponse>> {
    let Query(params) = params.map_err(|err| WaveError::Validation(err.body_text()))?;
    let session_id = required(params.session_id, "sessionId")?;
    let mood: Mood = required(params.mood, "mood")?.parse()?;

    let track = blocking(move || {
        let track = state.selector.select_next(&session_id, mood, &mut rand::thread_rng())?;
        if let Some(track) = &track {
            state.updater.record_played(&session_id, &track.id)?;
        }
        Ok(track)
    })
    .await?;

    Ok(Json(match track {
        Some(track) => {
            info!("Dispatching track {} ({mood})", track.id);
            NextResponse {
                stream_url: Some(format!("/stream/{}", track.id)),
                track: Some(track.into()),
                reason: None,
            }
        }
        None => NextResponse {
            track: None,
            stream_url: None,
            reason: Some(NO_TRACKS.to_string()),
        },
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBody {
    pub session_id: Option<String>,
    pub track_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub uid: Option<String>,
}

pub async fn post_event(
    State(state): State<AppState>,
    body: std::result::Result<Json<EventBody>, JsonRejection>,
) -> Result<Json<serde_json::Value>> {
    let Json(body) = body.map_err(|err| WaveError::Validation(err.body_text()))?;
    let session_id = required(body.session_id, "sessionId")?;
    let track_id = required(body.track_id, "trackId")?;
    let kind: EventKind = required(body.kind, "type")?.parse()?;
    let uid = body.uid.filter(|uid| !uid.is_empty());

    blocking(move || state.updater.record_event(&session_id, &track_id, kind, uid)).await?;
    Ok(Json(json!({ "ok": true })))
}

#[derive(Debug, Deserialize)]
pub struct StartBody {
    pub mood: Option<String>,
    pub uid: Option<String>,
}

pub async fn start_session(
    State(state): State<AppState>,
    body: std::result::Result<Json<StartBody>, JsonRejection>,
) -> Result<Json<serde_json::Value>> {
    let Json(body) = body.map_err(|err| WaveError::Validation(err.body_text()))?;
    let mood: Mood = required(body.mood, "mood")?.parse()?;
    let uid = body.uid.filter(|uid| !uid.is_empty());

    let session_id = blocking(move || state.updater.start(mood, uid)).await?;
    Ok(Json(json!({ "sessionId": session_id })))
}

fn range_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::RANGE).and_then(|value| value.to_str().ok())
}

pub async fn stream_track(
    State(state): State<AppState>,
    Path(track_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response> {
    let store = state.store.clone();
    let lookup_id = track_id.clone();
    let doc = blocking(move || Ok(store.get(collections::TRACKS, &lookup_id)?))
        .await?
        .ok_or_else(|| WaveError::NotFound(format!("track {track_id}")))?;
    let track: Track = doc.decode()?;

    let Some(file_path) = track.file_path.filter(|p| !p.is_empty()) else {
        warn!("Track {track_id} has no filePath");
        return Err(WaveError::NotFound(format!("file for track {track_id}")));
    };
    let path = state.audio.resolve(&file_path)?;

    stream::serve_file(&path, range_header(&headers)).await.inspect_err(|err| {
        if matches!(err, WaveError::NotFound(_)) {
            warn!("Audio file not found: {} for trackId={track_id}", path.display());
        }
    })
}

pub async fn audio_file(
    State(state): State<AppState>,
    Path((mood, filename)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response> {
    let mood: Mood = mood.parse()?;
    check_filename(&filename)?;
    let path = state.audio.resolve_static(mood, &filename)?;

    stream::serve_file(&path, range_header(&headers)).await
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "timestamp": Utc::now().to_rfc3339() }))
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "service": "Playflon API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/health",
            "session": "/session/start",
            "wave": "/wave/next",
            "stream": "/stream/{trackId}",
            "audio": "/audio/{mood}/{filename}",
            "events": "/events",
        }
    }))
}

/// All routes bound to `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/session/start", post(start_session))
        .route("/wave/next", get(wave_next))
        .route("/events", post(post_event))
        .route("/stream/{track_id}", get(stream_track))
        .route("/audio/{mood}/{filename}", get(audio_file))
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    info!("Playflon listening on http://{addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {err}");
            }
            info!("Shutting down");
        })
        .await
        .context("Server error")?;
    Ok(())
}
