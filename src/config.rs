//! # Configuration Module
//!
//! Resolves where things live: the audio root the service streams from,
//! the SQLite database file and the address to bind.
//!
//! ## Data Storage
//!
//! Unless `--db`/`PLAYFLON_DB_PATH` says otherwise, the database lives in
//! the platform-standard data directory:
//! - Linux: `~/.local/share/playflon/wave.db`
//! - macOS: `~/Library/Application Support/playflon/wave.db`
//! - Windows: `%APPDATA%\playflon\wave.db`

use crate::algorithm::ScoringContext;
use crate::session::SessionLimits;
use anyhow::{bail, Context, Result};
use path_absolutize::Absolutize;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "playflon";
const DB_FILE: &str = "wave.db";

/// Returns the playflon data directory, creating it if needed.
///
/// # Errors
///
/// Fails when the platform has no data directory or it cannot be created.
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system data directory. Pass --db or set PLAYFLON_DB_PATH."
        )
    })?;

    let app_dir = data_dir.join(APP_DIR);
    fs::create_dir_all(&app_dir).with_context(|| {
        format!(
            "Failed to create data directory at {}. Please check file permissions.",
            app_dir.display()
        )
    })?;

    Ok(app_dir)
}

/// Returns the default database file path inside [`get_data_dir`].
pub fn get_db_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join(DB_FILE))
}

/// Use `explicit` when given, the platform default otherwise.
pub fn resolve_db_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => get_db_path(),
    }
}

/// Make `path` absolute and check it is an existing directory.
pub fn resolve_audio_root(path: &Path) -> Result<PathBuf> {
    let root = path
        .absolutize()
        .with_context(|| format!("Invalid audio root {}", path.display()))?
        .into_owned();

    if !root.exists() {
        bail!("Audio root {} does not exist", root.display());
    }
    if !root.is_dir() {
        bail!("Audio root {} is not a directory", root.display());
    }
    Ok(root)
}

/// Everything `serve` needs, resolved and validated.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub audio_root: PathBuf,
    pub db_path: PathBuf,
    pub bind: SocketAddr,
    pub limits: SessionLimits,
    pub scoring: ScoringContext,
}

impl RuntimeConfig {
    /// Resolve the CLI/environment inputs, with default caps and weights.
    pub fn new(audio_root: &Path, db_path: Option<PathBuf>, host: IpAddr, port: u16) -> Result<Self> {
        Ok(Self {
            audio_root: resolve_audio_root(audio_root)?,
            db_path: resolve_db_path(db_path)?,
            bind: SocketAddr::new(host, port),
            limits: SessionLimits::default(),
            scoring: ScoringContext::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use tempfile::TempDir;

    #[test]
    fn test_explicit_db_path_wins() {
        let path = PathBuf::from("/tmp/custom.db");
        assert_eq!(resolve_db_path(Some(path.clone())).unwrap(), path);
    }

    #[test]
    fn test_default_db_path_structure() {
        // Skip on machines without a data directory.
        let Ok(path) = get_db_path() else { return };

        assert!(path.is_absolute());
        assert_eq!(path.file_name().unwrap(), DB_FILE);
        let parent = path.parent().expect("database path has a parent");
        assert_eq!(parent.file_name().unwrap(), APP_DIR);
        assert!(parent.is_dir());
    }

    #[test]
    fn test_audio_root_must_be_existing_directory() {
        let dir = TempDir::new().unwrap();
        assert_eq!(resolve_audio_root(dir.path()).unwrap(), dir.path());

        let missing = dir.path().join("missing");
        let err = resolve_audio_root(&missing).unwrap_err();
        assert!(err.to_string().contains("does not exist"));

        let file = dir.path().join("file.mp3");
        fs::write(&file, b"").unwrap();
        let err = resolve_audio_root(&file).unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }

    #[test]
    fn test_runtime_config() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("wave.db");
        let config = RuntimeConfig::new(dir.path(), Some(db.clone()), IpAddr::V4(Ipv4Addr::LOCALHOST), 3001).unwrap();

        assert!(config.audio_root.is_absolute());
        assert_eq!(config.db_path, db);
        assert_eq!(config.bind.to_string(), "127.0.0.1:3001");
        assert_eq!(config.limits.history_cap, 20);
        assert_eq!(config.limits.tag_cap, 50);
        assert_eq!(config.scoring.top_pool, 3);
    }
}
