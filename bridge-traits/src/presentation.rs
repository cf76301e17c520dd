//! Now-playing presentation and telemetry bridges.
//!
//! Both collaborators sit outside the playback state machine. The core calls
//! them from a relay task, so a slow or failing implementation can never
//! stall or alter playback.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::Result;

/// Snapshot handed to the system "now playing" surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NowPlayingInfo {
    pub title: String,
    pub artist: String,
    pub duration: Duration,
    pub position: Duration,
    /// 1.0 while playing, 0.0 while paused or ended.
    pub rate: f32,
    pub artwork: Option<String>,
}

/// System-level now-playing presentation (lock screen, media keys, tray).
#[async_trait::async_trait]
pub trait NowPlayingPublisher: Send + Sync {
    async fn publish(&self, info: NowPlayingInfo) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}

/// Transition notices for telemetry and haptics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "notice")]
pub enum PlaybackNotice {
    Started {
        track_id: String,
        /// Backend label, e.g. `"streaming"` or `"simulated"`.
        backend: String,
    },
    Paused {
        track_id: String,
        position_ms: u64,
    },
    Resumed {
        track_id: String,
        position_ms: u64,
    },
    /// Playback degraded to the simulated timeline.
    FellBack {
        track_id: String,
        reason: String,
    },
    Completed {
        track_id: String,
    },
    Stopped {
        track_id: String,
    },
}

impl PlaybackNotice {
    pub fn track_id(&self) -> &str {
        match self {
            PlaybackNotice::Started { track_id, .. }
            | PlaybackNotice::Paused { track_id, .. }
            | PlaybackNotice::Resumed { track_id, .. }
            | PlaybackNotice::FellBack { track_id, .. }
            | PlaybackNotice::Completed { track_id }
            | PlaybackNotice::Stopped { track_id } => track_id,
        }
    }
}

/// Fire-and-forget telemetry sink.
///
/// Implementations must not block; hand the notice off and return.
pub trait TelemetrySink: Send + Sync {
    fn notify(&self, notice: PlaybackNotice);
}

/// Publisher that discards everything.
#[derive(Debug, Clone, Default)]
pub struct SilentNowPlaying;

#[async_trait::async_trait]
impl NowPlayingPublisher for SilentNowPlaying {
    async fn publish(&self, _info: NowPlayingInfo) -> Result<()> {
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        Ok(())
    }
}

/// Telemetry sink that discards everything.
#[derive(Debug, Clone, Default)]
pub struct SilentTelemetry;

impl TelemetrySink for SilentTelemetry {
    fn notify(&self, _notice: PlaybackNotice) {}
}
