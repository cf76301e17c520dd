//! # Playback Types
//!
//! Observable session state published by the engine.

use bridge_traits::Track;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::PlaybackFault;

/// Which timeline is driving the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Network stream player.
    Streaming,
    /// Local file player.
    LocalFile,
    /// Audio-less synthetic timeline.
    Simulated,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Streaming => "streaming",
            BackendKind::LocalFile => "local_file",
            BackendKind::Simulated => "simulated",
        }
    }

    /// Returns `true` for backends that drive real audio output.
    pub fn is_real(&self) -> bool {
        !matches!(self, BackendKind::Simulated)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Externally visible phase of the playback state machine.
///
/// A paused simulation is `Paused(Simulated)`; a running one is `Simulating`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackPhase {
    #[default]
    Idle,
    Resolving,
    Loading(BackendKind),
    Playing(BackendKind),
    Paused(BackendKind),
    Simulating,
    Ended,
}

impl PlaybackPhase {
    /// Returns `true` while a track is advancing (real or simulated).
    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackPhase::Playing(_) | PlaybackPhase::Simulating)
    }

    /// Returns `true` before the session has settled on a timeline.
    pub fn is_pending(&self) -> bool {
        matches!(self, PlaybackPhase::Resolving | PlaybackPhase::Loading(_))
    }

    /// Returns `true` when a progress tick source should be running.
    pub fn is_active(&self) -> bool {
        !matches!(self, PlaybackPhase::Idle | PlaybackPhase::Ended)
    }
}

/// UI-observable progress.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Progress {
    pub position: Duration,
    pub duration: Duration,
    /// `position / duration` in `[0.0, 1.0]`; zero when the duration is zero.
    pub proportion: f64,
}

impl Progress {
    pub fn new(position: Duration, duration: Duration) -> Self {
        let position = position.min(duration);
        let proportion = if duration.is_zero() {
            0.0
        } else {
            (position.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0)
        };
        Self {
            position,
            duration,
            proportion,
        }
    }
}

/// Immutable view of the current session.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionSnapshot {
    pub track: Option<Track>,
    pub phase: PlaybackPhase,
    pub backend: Option<BackendKind>,
    pub position: Duration,
    pub duration: Duration,
    pub proportion: f64,
    pub is_playing: bool,
    pub is_buffering: bool,
    pub last_error: Option<PlaybackFault>,
}

impl SessionSnapshot {
    pub fn progress(&self) -> Progress {
        Progress::new(self.position, self.duration)
    }

    /// Id of the current track, if any.
    pub fn track_id(&self) -> Option<&str> {
        self.track.as_ref().map(|track| track.id().as_str())
    }
}
