//! Network streaming backend.
//!
//! `load` only submits the URL. Readiness and duration arrive later through
//! the observer, possibly in either order, and a stalled stream may never
//! report ready at all; the engine arms a watchdog for that case.

use bridge_traits::{BridgeError, StreamPlayer};
use core_runtime::logging::redact_uri;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use super::{BackendEmitter, PlaybackBackend, SignalForwarder};
use crate::error::{PlaybackFault, Result};
use crate::types::BackendKind;

pub struct StreamingAdapter {
    player: Box<dyn StreamPlayer>,
    emitter: BackendEmitter,
    released: bool,
}

impl StreamingAdapter {
    pub(crate) fn new(player: Box<dyn StreamPlayer>, emitter: BackendEmitter) -> Self {
        Self {
            player,
            emitter,
            released: false,
        }
    }

    fn playback_failed(e: BridgeError) -> PlaybackFault {
        PlaybackFault::BackendPlaybackFailed {
            backend: BackendKind::Streaming,
            reason: e.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl PlaybackBackend for StreamingAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::Streaming
    }

    #[instrument(skip(self, uri), fields(uri = %redact_uri(uri.as_str())))]
    async fn load(&mut self, uri: &Url) -> Result<()> {
        let observer = SignalForwarder::new(self.emitter.clone());
        self.player
            .open(uri.as_str(), observer)
            .await
            .map_err(|e| PlaybackFault::BackendLoadFailed {
                backend: BackendKind::Streaming,
                reason: e.to_string(),
            })?;
        debug!("Stream submitted");
        Ok(())
    }

    async fn play(&self) -> Result<()> {
        self.player.play().await.map_err(Self::playback_failed)?;
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.player.pause().await.map_err(Self::playback_failed)?;
        Ok(())
    }

    async fn seek(&self, to: Duration) -> Result<()> {
        self.player.seek(to).await.map_err(Self::playback_failed)?;
        Ok(())
    }

    async fn position(&self) -> Result<Duration> {
        Ok(self
            .player
            .current_time()
            .await
            .map_err(Self::playback_failed)?)
    }

    fn detach(&self) {
        self.emitter.close();
    }

    async fn dispose(&mut self) {
        self.detach();
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = self.player.release().await {
            debug!(error = %e, "Stream player release failed");
        }
    }
}
