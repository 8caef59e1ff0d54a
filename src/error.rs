//! Error taxonomy shared by the selector, the session updater and the
//! streamer.
//!
//! Binary-level code keeps using `anyhow`; everything that can end up as an
//! HTTP status goes through [`WaveError`].

use crate::store::StoreError;
use thiserror::Error;

pub type Result<T, E = WaveError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum WaveError {
    /// Bad or missing request input. Never retried.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Session, track or audio file absent.
    #[error("{0} not found")]
    NotFound(String),

    #[error("requested range not satisfiable for {file_size} byte file")]
    RangeNotSatisfiable { file_size: u64 },

    #[error("store failure: {0}")]
    Store(#[source] StoreError),

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StoreError> for WaveError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DocumentNotFound { collection, id } => {
                WaveError::NotFound(format!("{collection}/{id}"))
            }
            other => WaveError::Store(other),
        }
    }
}

impl WaveError {
    /// HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            WaveError::Validation(_) => 400,
            WaveError::NotFound(_) => 404,
            WaveError::RangeNotSatisfiable { .. } => 416,
            WaveError::Store(_) | WaveError::Io(_) => 500,
        }
    }
}
