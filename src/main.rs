//! # Playflon
//!
//! Binary entry point. Every subcommand maps onto one library call:
//!
//! ```bash
//! # Import the audio root into the catalog
//! playflon scan --audio-root /srv/audio
//!
//! # Run the service
//! playflon serve --audio-root /srv/audio --port 3001
//!
//! # Inspect the catalog
//! playflon list --mood focus
//! ```
//!
//! Logging is controlled via `RUST_LOG`, e.g.
//! `RUST_LOG=playflon::wave=debug playflon serve`.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use log::info;
use playflon::library::{AudioRoot, FilePresence};
use playflon::server::{self, AppState};
use playflon::store::{DocumentStore, SqliteStore};
use playflon::{catalog, cli, completion, config};
use std::path::PathBuf;
use std::sync::Arc;

fn open_store(db: Option<PathBuf>) -> Result<Arc<SqliteStore>> {
    let db_path = config::resolve_db_path(db)?;
    let store = SqliteStore::open(&db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;
    Ok(Arc::new(store))
}

fn open_audio_root(path: &std::path::Path) -> Result<AudioRoot> {
    let root = config::resolve_audio_root(path)?;
    AudioRoot::new(&root).with_context(|| format!("Invalid audio root {}", root.display()))
}

fn main() -> Result<()> {
    env_logger::init();

    let args = cli::Args::parse();

    match args.command {
        cli::Command::Serve {
            audio_root,
            host,
            port,
            db,
        } => {
            let config = config::RuntimeConfig::new(&audio_root, db, host, port)?;
            info!("Audio root: {}", config.audio_root.display());
            info!("Database: {}", config.db_path.display());

            let store: Arc<dyn DocumentStore> = open_store(Some(config.db_path.clone()))?;
            let state = AppState::new(
                store,
                AudioRoot::new(&config.audio_root)?,
                config.scoring,
                config.limits,
            );

            let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
            runtime.block_on(server::serve(config.bind, state))?;
        }
        cli::Command::Scan { audio_root, db } => {
            let audio = open_audio_root(&audio_root)?;
            let store = open_store(db)?;
            info!("Scanning {}", audio.path().display());

            let files = catalog::scan_audio_root(&audio);
            let summary = catalog::import(store.as_ref(), &files)?;
            println!(
                "Imported {} files: {} created, {} updated",
                files.len(),
                summary.created,
                summary.updated
            );
        }
        cli::Command::List {
            mood,
            audio_root,
            db,
        } => {
            let store = open_store(db)?;
            let audio = audio_root.as_deref().map(open_audio_root).transpose()?;
            let tracks = catalog::list_tracks(store.as_ref(), mood)?;

            for track in &tracks {
                let file_path = track.file_path.as_deref().unwrap_or("-");
                let presence = match (&audio, track.file_path.as_deref()) {
                    (Some(audio), Some(path)) if audio.exists(path) => " ",
                    (Some(_), _) => "!",
                    (None, _) => " ",
                };
                println!(
                    "{presence} {:<32} {:<8} {:<40} [{}]",
                    track.id,
                    track.mood.as_str(),
                    file_path,
                    track.tags.join(", ")
                );
            }
            println!("{} tracks", tracks.len());
        }
        cli::Command::Completion { shell } => {
            let mut cmd = cli::Args::command();
            completion::generate_completions(completion::shell_to_completion_shell(&shell), &mut cmd);
        }
    }

    Ok(())
}
