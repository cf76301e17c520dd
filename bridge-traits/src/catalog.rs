//! Track model and catalog lookup bridge.
//!
//! The playback core never talks to storage backends or share-record services
//! directly. Instead the host resolves where a track's audio lives through
//! [`SourceLookup`], and the core validates whatever comes back.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::Result;

/// Stable identity of a playable item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TrackId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Identity and metadata for a playable item, independent of where its audio lives.
///
/// Fields are only set during construction; a `Track` never changes once it
/// has been handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    id: TrackId,
    title: String,
    artist: String,
    nominal_duration: Duration,
    remote_ref: Option<String>,
    local_filename: Option<String>,
    artwork: Option<String>,
}

impl Track {
    /// Create a track with the declared duration used until a backend reports
    /// an authoritative one.
    pub fn new(
        id: impl Into<TrackId>,
        title: impl Into<String>,
        artist: impl Into<String>,
        nominal_duration: Duration,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            nominal_duration,
            remote_ref: None,
            local_filename: None,
            artwork: None,
        }
    }

    /// Attach the reference the catalog uses to locate a remote copy.
    pub fn with_remote_ref(mut self, remote_ref: impl Into<String>) -> Self {
        self.remote_ref = Some(remote_ref.into());
        self
    }

    /// Attach the file name of a locally bundled copy.
    pub fn with_local_filename(mut self, filename: impl Into<String>) -> Self {
        self.local_filename = Some(filename.into());
        self
    }

    /// Attach an artwork reference surfaced to now-playing presenters.
    pub fn with_artwork(mut self, artwork: impl Into<String>) -> Self {
        self.artwork = Some(artwork.into());
        self
    }

    pub fn id(&self) -> &TrackId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn artist(&self) -> &str {
        &self.artist
    }

    pub fn nominal_duration(&self) -> Duration {
        self.nominal_duration
    }

    pub fn remote_ref(&self) -> Option<&str> {
        self.remote_ref.as_deref()
    }

    pub fn local_filename(&self) -> Option<&str> {
        self.local_filename.as_deref()
    }

    pub fn artwork(&self) -> Option<&str> {
        self.artwork.as_deref()
    }

    /// Returns `true` when the track declares at least one place its audio may live.
    pub fn has_source_reference(&self) -> bool {
        self.remote_ref.is_some() || self.local_filename.is_some()
    }

    /// Identity comparison; metadata differences are ignored.
    pub fn is_same(&self, other: &Track) -> bool {
        self.id == other.id
    }
}

/// Catalog lookup bridge.
///
/// Implementations may hit the network (share records, signed storage URLs)
/// or the local bundle. Returned strings are untrusted: the core validates
/// scheme, extension and host before using them.
///
/// # Errors
///
/// Lookup failures are reported as [`BridgeError`](crate::error::BridgeError).
/// The core treats any error the same as "no source".
#[async_trait::async_trait]
pub trait SourceLookup: Send + Sync {
    /// Resolve the track's remote reference to a URI.
    async fn resolve_remote_source(&self, track: &Track) -> Result<Option<String>>;

    /// Locate a local copy named by the track's local filename.
    async fn resolve_local_source(&self, track: &Track) -> Result<Option<String>>;
}
