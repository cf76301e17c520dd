//! Tracing-backed presentation and telemetry
//!
//! Desktop builds have no lock-screen surface by default; these
//! implementations record what would have been presented.

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    presentation::{NowPlayingInfo, NowPlayingPublisher, PlaybackNotice, TelemetrySink},
};
use tracing::{debug, info};

/// Now-playing publisher that logs each update
#[derive(Debug, Clone, Default)]
pub struct TracingNowPlaying;

#[async_trait]
impl NowPlayingPublisher for TracingNowPlaying {
    async fn publish(&self, info: NowPlayingInfo) -> Result<()> {
        info!(
            title = %info.title,
            artist = %info.artist,
            position_ms = info.position.as_millis() as u64,
            duration_ms = info.duration.as_millis() as u64,
            rate = info.rate,
            "Now playing"
        );
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        info!("Now playing cleared");
        Ok(())
    }
}

/// Telemetry sink that logs notices at debug level
#[derive(Debug, Clone, Default)]
pub struct TracingTelemetry;

impl TelemetrySink for TracingTelemetry {
    fn notify(&self, notice: PlaybackNotice) {
        debug!(track_id = notice.track_id(), ?notice, "Playback notice");
    }
}
