//! # Audio Library Root
//!
//! Every audio file the service touches lives under one configured root
//! directory. Track records store mood-namespaced relative paths
//! (`"focus/rain.mp3"`); this module turns those into absolute paths and
//! refuses anything that would leave the root.
//!
//! [`FilePresence`] is the seam the track selector uses to ask whether a
//! track's backing file exists, so tests can answer without a disk.

use crate::error::{Result, WaveError};
use crate::models::Mood;
use log::warn;
use path_absolutize::Absolutize;
use std::path::{Component, Path, PathBuf};

/// Answers whether a track's backing audio file is currently present.
pub trait FilePresence: Send + Sync {
    fn exists(&self, file_path: &str) -> bool;
}

/// The configured audio root directory.
#[derive(Debug, Clone)]
pub struct AudioRoot {
    root: PathBuf,
}

impl AudioRoot {
    /// Wrap `root`, made absolute against the current directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().absolutize()?.into_owned();
        Ok(Self { root })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Resolve a stored `"<mood>/<file>"` path to an absolute path under
    /// the root.
    ///
    /// # Errors
    ///
    /// `Validation` for empty, absolute or parent-relative paths.
    pub fn resolve(&self, file_path: &str) -> Result<PathBuf> {
        let relative = Path::new(file_path);
        if file_path.is_empty() {
            return Err(WaveError::Validation("empty file path".to_string()));
        }
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes || file_path.contains('\\') {
            return Err(WaveError::Validation(format!(
                "file path '{file_path}' escapes the audio root"
            )));
        }
        Ok(self.root.join(relative))
    }

    /// Resolve the `/audio/{mood}/{filename}` pair. The filename is checked
    /// before any filesystem access.
    pub fn resolve_static(&self, mood: Mood, filename: &str) -> Result<PathBuf> {
        check_filename(filename)?;
        Ok(self.root.join(mood.as_str()).join(filename))
    }
}

impl FilePresence for AudioRoot {
    fn exists(&self, file_path: &str) -> bool {
        match self.resolve(file_path) {
            Ok(path) => path.is_file(),
            Err(err) => {
                warn!("Rejecting track file path: {err}");
                false
            }
        }
    }
}

/// Reject bare filenames carrying traversal sequences or separators.
pub fn check_filename(filename: &str) -> Result<()> {
    if filename.is_empty()
        || filename.contains("..")
        || filename.contains('/')
        || filename.contains('\\')
    {
        return Err(WaveError::Validation(format!("invalid file name '{filename}'")));
    }
    Ok(())
}
