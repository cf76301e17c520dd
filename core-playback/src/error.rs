//! # Playback Error Types
//!
//! Two layers of errors:
//!
//! - [`PlaybackFault`]: diagnostic faults that the engine always recovers from
//!   by degrading to simulated playback. The most recent one is kept in the
//!   session as `last_error`.
//! - [`PlaybackError`]: errors returned to API callers.

use std::time::Duration;
use thiserror::Error;

use crate::types::BackendKind;

/// Recoverable playback faults.
///
/// None of these stop playback; they are advisory once recorded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackFault {
    /// The resolver produced no usable candidate for a track that declared a source.
    #[error("No playable source available")]
    SourceUnavailable,

    /// A candidate failed before it became ready.
    #[error("{backend} backend failed to load: {reason}")]
    BackendLoadFailed { backend: BackendKind, reason: String },

    /// The active backend failed after it became ready.
    #[error("{backend} backend failed during playback: {reason}")]
    BackendPlaybackFailed { backend: BackendKind, reason: String },

    /// A remote load did not become ready before the deadline.
    #[error("Backend did not become ready within {0:?}")]
    WatchdogTimeout(Duration),
}

impl PlaybackFault {
    /// Returns `true` if this fault moves the session onto the simulated timeline.
    ///
    /// A load failure only falls back once no candidates remain, so it is not
    /// a trigger by itself.
    pub fn is_fallback_trigger(&self) -> bool {
        matches!(
            self,
            PlaybackFault::SourceUnavailable
                | PlaybackFault::BackendPlaybackFailed { .. }
                | PlaybackFault::WatchdogTimeout(_)
        )
    }

    /// Returns `true` if this fault points at connectivity rather than the file.
    pub fn is_network_error(&self) -> bool {
        match self {
            PlaybackFault::WatchdogTimeout(_) => true,
            PlaybackFault::BackendLoadFailed { backend, .. }
            | PlaybackFault::BackendPlaybackFailed { backend, .. } => {
                *backend == BackendKind::Streaming
            }
            PlaybackFault::SourceUnavailable => false,
        }
    }
}

/// Errors returned by the playback API.
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// A recoverable fault surfaced to a caller (e.g. from a backend call).
    #[error(transparent)]
    Fault(#[from] PlaybackFault),

    /// A resolved URI failed validation.
    #[error("Invalid source: {0}")]
    InvalidSource(String),

    /// The engine actor has shut down.
    #[error("Playback engine is closed")]
    EngineClosed,

    /// Playback configuration was rejected.
    #[error("Invalid playback configuration: {0}")]
    Config(String),

    /// Host bridge error.
    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::BridgeError),

    /// Runtime (config/logging) error.
    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Returns `true` if this error is due to network issues.
    pub fn is_network_error(&self) -> bool {
        match self {
            PlaybackError::Fault(fault) => fault.is_network_error(),
            PlaybackError::Bridge(bridge_traits::BridgeError::Timeout(_)) => true,
            _ => false,
        }
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
