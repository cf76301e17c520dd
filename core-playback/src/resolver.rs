//! # Source Resolution
//!
//! Turns a [`Track`] into an ordered list of playable candidates.
//!
//! The host's [`SourceLookup`] is asked for the remote and local locations
//! concurrently. Whatever comes back is untrusted:
//!
//! - Remote URIs need an `http`/`https` scheme and either an allowed file
//!   extension or a trusted host (exact or subdomain match).
//! - Local URIs need an allowed extension. The trusted-host exception does
//!   not apply.
//!
//! Each lookup runs under its own deadline (`remote_lookup_timeout`,
//! `local_lookup_timeout`); a lookup that does not finish in time counts as
//! "no source" of that kind for this attempt.

use bridge_traits::{SourceLookup, Track};
use core_runtime::logging::{redact_uri, strip_path};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::PlaybackConfig;
use crate::error::{PlaybackError, Result};
use crate::types::BackendKind;

/// Where a candidate's audio lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    Remote,
    Local,
}

/// A validated location that may supply playable audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCandidate {
    pub kind: CandidateKind,
    pub uri: Url,
}

impl SourceCandidate {
    /// Backend able to play this candidate.
    pub fn backend_kind(&self) -> BackendKind {
        match self.kind {
            CandidateKind::Remote => BackendKind::Streaming,
            CandidateKind::Local => BackendKind::LocalFile,
        }
    }

    /// URI safe to put in logs.
    pub fn redacted(&self) -> String {
        match self.kind {
            CandidateKind::Remote => redact_uri(self.uri.as_str()),
            CandidateKind::Local => strip_path(self.uri.path()).to_string(),
        }
    }
}

/// Produces ordered source candidates for a track. Remote precedes local.
pub struct SourceResolver {
    lookup: Arc<dyn SourceLookup>,
    config: Arc<PlaybackConfig>,
}

impl SourceResolver {
    pub fn new(lookup: Arc<dyn SourceLookup>, config: Arc<PlaybackConfig>) -> Self {
        Self { lookup, config }
    }

    /// Resolve all candidates for `track`.
    ///
    /// Never fails: lookup errors, timeouts and rejected URIs are logged and
    /// the corresponding candidate is omitted.
    #[instrument(skip(self, track), fields(track_id = %track.id()))]
    pub async fn resolve(&self, track: &Track) -> Vec<SourceCandidate> {
        if !track.has_source_reference() {
            return Vec::new();
        }

        let (remote, local) = tokio::join!(self.lookup_remote(track), self.lookup_local(track));

        let candidates: Vec<SourceCandidate> = remote.into_iter().chain(local).collect();
        debug!(count = candidates.len(), "Resolved source candidates");
        candidates
    }

    async fn lookup_remote(&self, track: &Track) -> Option<SourceCandidate> {
        track.remote_ref()?;

        let lookup = self.lookup.resolve_remote_source(track);
        let raw = match tokio::time::timeout(self.config.remote_lookup_timeout, lookup).await {
            Ok(Ok(Some(raw))) => raw,
            Ok(Ok(None)) => return None,
            Ok(Err(e)) => {
                warn!(error = %e, "Remote source lookup failed");
                return None;
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.config.remote_lookup_timeout.as_millis() as u64,
                    "Remote source lookup timed out"
                );
                return None;
            }
        };

        match self.validate_remote(&raw) {
            Ok(uri) => Some(SourceCandidate {
                kind: CandidateKind::Remote,
                uri,
            }),
            Err(e) => {
                warn!(uri = %redact_uri(&raw), error = %e, "Rejected remote source");
                None
            }
        }
    }

    async fn lookup_local(&self, track: &Track) -> Option<SourceCandidate> {
        track.local_filename()?;

        let lookup = self.lookup.resolve_local_source(track);
        let raw = match tokio::time::timeout(self.config.local_lookup_timeout, lookup).await {
            Ok(Ok(Some(raw))) => raw,
            Ok(Ok(None)) => return None,
            Ok(Err(e)) => {
                warn!(error = %e, "Local source lookup failed");
                return None;
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.config.local_lookup_timeout.as_millis() as u64,
                    "Local source lookup timed out"
                );
                return None;
            }
        };

        match self.validate_local(&raw) {
            Ok(uri) => Some(SourceCandidate {
                kind: CandidateKind::Local,
                uri,
            }),
            Err(e) => {
                warn!(file = %strip_path(&raw), error = %e, "Rejected local source");
                None
            }
        }
    }

    /// Validate a remote URI: http(s), plus an allowed extension or a trusted host.
    pub fn validate_remote(&self, raw: &str) -> Result<Url> {
        let uri = Url::parse(raw).map_err(|e| PlaybackError::InvalidSource(e.to_string()))?;

        if !matches!(uri.scheme(), "http" | "https") {
            return Err(PlaybackError::InvalidSource(format!(
                "unsupported scheme '{}'",
                uri.scheme()
            )));
        }

        let extension_ok = extension_of(&uri)
            .map(|ext| self.config.is_allowed_extension(ext))
            .unwrap_or(false);
        let host_ok = uri
            .host_str()
            .map(|host| self.config.is_trusted_host(host))
            .unwrap_or(false);

        if extension_ok || host_ok {
            Ok(uri)
        } else {
            Err(PlaybackError::InvalidSource(
                "no allowed extension and host is not trusted".to_string(),
            ))
        }
    }

    /// Validate a local URI: a `file://` URL or an absolute path with an allowed extension.
    pub fn validate_local(&self, raw: &str) -> Result<Url> {
        let uri = if Path::new(raw).is_absolute() {
            Url::from_file_path(raw)
                .map_err(|_| PlaybackError::InvalidSource("not a valid file path".to_string()))?
        } else {
            let uri = Url::parse(raw).map_err(|e| PlaybackError::InvalidSource(e.to_string()))?;
            if uri.scheme() != "file" {
                return Err(PlaybackError::InvalidSource(format!(
                    "local source must use file scheme, got '{}'",
                    uri.scheme()
                )));
            }
            uri
        };

        match extension_of(&uri) {
            Some(ext) if self.config.is_allowed_extension(ext) => Ok(uri),
            _ => Err(PlaybackError::InvalidSource(
                "file extension is not allowed".to_string(),
            )),
        }
    }
}

/// Extension of the last path segment, without the dot.
fn extension_of(uri: &Url) -> Option<&str> {
    let segment = uri.path_segments()?.last()?;
    let (stem, ext) = segment.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}
