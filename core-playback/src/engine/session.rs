//! The live session owned by the engine actor.

use bridge_traits::{NowPlayingInfo, Track};
use std::time::Duration;

use crate::error::PlaybackFault;
use crate::events::{BackendTicket, Epoch};
use crate::types::{BackendKind, PlaybackPhase, Progress, SessionSnapshot};

#[derive(Debug, Clone)]
pub(crate) struct Session {
    pub track: Track,
    pub epoch: Epoch,
    pub phase: PlaybackPhase,
    position: Duration,
    duration: Duration,
    /// Set by the first `DurationKnown`; later reports are ignored.
    pub duration_confirmed: bool,
    pub is_buffering: bool,
    pub last_error: Option<PlaybackFault>,
    /// Backend instance currently loading or active.
    pub ticket: Option<BackendTicket>,
}

impl Session {
    pub fn new(track: Track, epoch: Epoch) -> Self {
        let duration = track.nominal_duration();
        Self {
            track,
            epoch,
            phase: PlaybackPhase::Resolving,
            position: Duration::ZERO,
            duration,
            duration_confirmed: false,
            is_buffering: false,
            last_error: None,
            ticket: None,
        }
    }

    pub fn position(&self) -> Duration {
        self.position
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Set the position, clamped into `[0, duration]`.
    pub fn set_position(&mut self, position: Duration) {
        self.position = position.min(self.duration);
    }

    /// Replace the duration and re-clamp the position.
    pub fn set_duration(&mut self, duration: Duration) {
        self.duration = duration;
        self.position = self.position.min(duration);
    }

    pub fn at_end(&self) -> bool {
        self.position >= self.duration
    }

    pub fn backend_kind(&self) -> Option<BackendKind> {
        match self.phase {
            PlaybackPhase::Loading(kind)
            | PlaybackPhase::Playing(kind)
            | PlaybackPhase::Paused(kind) => Some(kind),
            PlaybackPhase::Simulating => Some(BackendKind::Simulated),
            PlaybackPhase::Idle | PlaybackPhase::Resolving | PlaybackPhase::Ended => None,
        }
    }

    /// `true` while a real (non-simulated) backend is playing or paused.
    pub fn has_active_backend(&self) -> bool {
        matches!(
            self.phase,
            PlaybackPhase::Playing(kind) | PlaybackPhase::Paused(kind) if kind.is_real()
        )
    }

    pub fn track_id(&self) -> String {
        self.track.id().to_string()
    }

    pub fn position_ms(&self) -> u64 {
        self.position.as_millis() as u64
    }

    pub fn now_playing(&self) -> NowPlayingInfo {
        NowPlayingInfo {
            title: self.track.title().to_string(),
            artist: self.track.artist().to_string(),
            duration: self.duration,
            position: self.position,
            rate: if self.phase.is_playing() { 1.0 } else { 0.0 },
            artwork: self.track.artwork().map(str::to_string),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let progress = Progress::new(self.position, self.duration);
        SessionSnapshot {
            track: Some(self.track.clone()),
            phase: self.phase,
            backend: self.backend_kind(),
            position: progress.position,
            duration: progress.duration,
            proportion: progress.proportion,
            is_playing: self.phase.is_playing(),
            is_buffering: self.is_buffering,
            last_error: self.last_error.clone(),
        }
    }
}
