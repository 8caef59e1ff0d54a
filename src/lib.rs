//! Endless mood "waves" over a local audio library.
//!
//! A listening session asks for one track at a time. Each pick avoids the
//! session's recent history, leans towards tags the listener liked and away
//! from tags they skipped, and is streamed from disk with HTTP range
//! support so clients can seek.
//!
//! Core modules:
//! - [`wave`] - next-track selection for a session
//! - [`algorithm`] - tag-affinity scoring and the weighted pick
//! - [`session`] - history and preference updates, event log
//! - [`stream`] - byte-range parsing and partial-content responses
//! - [`store`] - document store interface, SQLite and in-memory backends
//!
//! ### Supporting Modules
//!
//! - [`server`] - axum routes over the modules above
//! - [`catalog`] - import of the audio root into the track catalog
//! - [`library`] - audio root path resolution and file presence
//! - [`models`] - typed track, session and event records
//! - [`config`] - runtime configuration and data directory management
//! - [`cli`] - command-line interface definitions with clap integration
//! - [`completion`] - shell completion generation
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use playflon::library::AudioRoot;
//! use playflon::models::Mood;
//! use playflon::session::SessionUpdater;
//! use playflon::store::SqliteStore;
//! use playflon::wave::TrackSelector;
//! use std::sync::Arc;
//!
//! let store = Arc::new(SqliteStore::open("wave.db")?);
//! let audio = Arc::new(AudioRoot::new("/srv/audio")?);
//! playflon::catalog::import(store.as_ref(), &playflon::catalog::scan_audio_root(&audio))?;
//!
//! let updater = SessionUpdater::new(store.clone());
//! let selector = TrackSelector::new(store.clone(), audio.clone());
//!
//! let session = updater.start(Mood::Focus, None)?;
//! if let Some(track) = selector.select_next(&session, Mood::Focus, &mut rand::thread_rng())? {
//!     updater.record_played(&session, &track.id)?;
//!     println!("Now playing {}", track.id);
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod algorithm;
pub mod catalog;
pub mod cli;
pub mod completion;
pub mod config;
pub mod error;
pub mod library;
pub mod models;
pub mod server;
pub mod session;
pub mod store;
pub mod stream;
pub mod wave;

pub use error::{Result, WaveError};
