//! # Range Streamer
//!
//! Serves an audio file over HTTP, whole (`200`) or as one byte range
//! (`206`) when the request carries `Range: bytes=<start>-<end>?`.
//!
//! Both audio endpoints end up here with an absolute path that is already
//! anchored under the audio root. A file that vanished between selection
//! and streaming is a plain `404`, not a server error.

use crate::error::{Result, WaveError};
use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use log::debug;
use std::io::{ErrorKind, SeekFrom};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

/// Audio never changes once written, so clients may cache it for a year.
pub const CACHE_CONTROL: &str = "public, max-age=31536000";

const DEFAULT_CONTENT_TYPE: &str = "audio/mpeg";
const CHUNK_SIZE: usize = 128 * 1024;

/// Inclusive byte range within a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered; never zero.
    #[must_use]
    pub const fn length(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Parse a `Range` header against a file of `file_size` bytes.
///
/// Only `bytes=<start>-<end>?` is understood; for multi-range headers the
/// first range is used. `end` defaults to, and is clamped at, the last
/// byte of the file.
///
/// # Errors
///
/// `RangeNotSatisfiable` for other units, suffix ranges, non-numeric
/// bounds, `start` past the end of the file, or `end < start`.
pub fn parse_range(header: &str, file_size: u64) -> Result<ByteRange> {
    let unsatisfiable = || WaveError::RangeNotSatisfiable { file_size };

    let ranges = header.trim().strip_prefix("bytes=").ok_or_else(unsatisfiable)?;
    let first = ranges.split(',').next().unwrap_or_default().trim();
    let (start, end) = first.split_once('-').ok_or_else(unsatisfiable)?;

    let start: u64 = start.trim().parse().map_err(|_| unsatisfiable())?;
    let last = file_size.checked_sub(1).ok_or_else(unsatisfiable)?;
    let end = match end.trim() {
        "" => last,
        end => end.parse::<u64>().map_err(|_| unsatisfiable())?.min(last),
    };

    if start > last || end < start {
        return Err(unsatisfiable());
    }
    Ok(ByteRange { start, end })
}

/// MIME type by file extension, `audio/mpeg` when unknown.
#[must_use]
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("ogg") => "audio/ogg",
        Some("m4a") => "audio/mp4",
        Some("flac") => "audio/flac",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

fn not_found_or_io(path: &Path, err: std::io::Error) -> WaveError {
    if err.kind() == ErrorKind::NotFound {
        WaveError::NotFound(format!("audio file {}", path.display()))
    } else {
        WaveError::Io(err)
    }
}

/// Build the full or partial response for the file at `path`.
///
/// # Errors
///
/// `NotFound` when the file is absent, `RangeNotSatisfiable` for a bad
/// range, `Io` for any other filesystem failure.
pub async fn serve_file(path: &Path, range_header: Option<&str>) -> Result<Response> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|err| not_found_or_io(path, err))?;
    if !metadata.is_file() {
        return Err(WaveError::NotFound(format!("audio file {}", path.display())));
    }
    let file_size = metadata.len();
    let range = range_header
        .map(|header| parse_range(header, file_size))
        .transpose()?;

    let mut file = File::open(path).await.map_err(|err| not_found_or_io(path, err))?;
    let content_type = content_type_for(path);

    match range {
        Some(range) => {
            debug!("Streaming bytes {}-{}/{file_size} of {}", range.start, range.end, path.display());
            file.seek(SeekFrom::Start(range.start)).await?;
            let body = Body::from_stream(ReaderStream::with_capacity(file.take(range.length()), CHUNK_SIZE));

            Ok((
                StatusCode::PARTIAL_CONTENT,
                [
                    (header::CONTENT_TYPE, content_type.to_string()),
                    (header::ACCEPT_RANGES, "bytes".to_string()),
                    (
                        header::CONTENT_RANGE,
                        format!("bytes {}-{}/{file_size}", range.start, range.end),
                    ),
                    (header::CONTENT_LENGTH, range.length().to_string()),
                    (header::CACHE_CONTROL, CACHE_CONTROL.to_string()),
                ],
                body,
            )
                .into_response())
        }
        None => {
            debug!("Streaming all {file_size} bytes of {}", path.display());
            let body = Body::from_stream(ReaderStream::with_capacity(file, CHUNK_SIZE));

            Ok((
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, content_type.to_string()),
                    (header::ACCEPT_RANGES, "bytes".to_string()),
                    (header::CONTENT_LENGTH, file_size.to_string()),
                    (header::CACHE_CONTROL, CACHE_CONTROL.to_string()),
                ],
                body,
            )
                .into_response())
        }
    }
}
