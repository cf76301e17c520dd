//! Directory-backed source lookup using Tokio

use async_trait::async_trait;
use bridge_traits::{
    catalog::{SourceLookup, Track},
    error::{BridgeError, Result},
};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Source lookup backed by a local library directory.
///
/// - Local sources: the track's local filename resolved inside `library_dir`
///   via `tokio::fs`
/// - Remote sources: an in-memory table from remote reference to URI,
///   populated by the host (e.g. from share records fetched at startup)
pub struct DirectorySourceLookup {
    library_dir: PathBuf,
    remote_sources: HashMap<String, String>,
}

impl DirectorySourceLookup {
    /// Create a lookup rooted at the platform audio directory
    pub fn new() -> Self {
        let library_dir = dirs::audio_dir()
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("Music")
            })
            .join("music-platform");

        Self::with_library_dir(library_dir)
    }

    /// Create a lookup rooted at a custom directory
    pub fn with_library_dir(library_dir: impl Into<PathBuf>) -> Self {
        Self {
            library_dir: library_dir.into(),
            remote_sources: HashMap::new(),
        }
    }

    /// Register the URI a remote reference resolves to
    pub fn with_remote(mut self, remote_ref: impl Into<String>, uri: impl Into<String>) -> Self {
        self.remote_sources.insert(remote_ref.into(), uri.into());
        self
    }

    pub fn library_dir(&self) -> &Path {
        &self.library_dir
    }

    /// Only bare file names are looked up; anything that could escape the
    /// library directory is treated as absent.
    fn is_bare_file_name(filename: &str) -> bool {
        let mut components = Path::new(filename).components();
        matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        )
    }
}

impl Default for DirectorySourceLookup {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceLookup for DirectorySourceLookup {
    async fn resolve_remote_source(&self, track: &Track) -> Result<Option<String>> {
        let Some(remote_ref) = track.remote_ref() else {
            return Ok(None);
        };

        let uri = self.remote_sources.get(remote_ref).cloned();
        debug!(track_id = %track.id(), found = uri.is_some(), "Remote lookup");
        Ok(uri)
    }

    async fn resolve_local_source(&self, track: &Track) -> Result<Option<String>> {
        let Some(filename) = track.local_filename() else {
            return Ok(None);
        };

        if !Self::is_bare_file_name(filename) {
            debug!(track_id = %track.id(), "Rejected local filename with path components");
            return Ok(None);
        }

        let candidate = self.library_dir.join(filename);
        let exists = fs::try_exists(&candidate).await.map_err(BridgeError::Io)?;
        debug!(track_id = %track.id(), file = filename, exists, "Local lookup");

        if !exists {
            return Ok(None);
        }

        Ok(Some(candidate.to_string_lossy().into_owned()))
    }
}
