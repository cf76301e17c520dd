//! Local file backend.
//!
//! Opening a file is synchronous from the engine's point of view: when
//! `open` returns, the duration is known and the file is playable, so `load`
//! emits `DurationKnown` followed by `Ready` straight away.

use bridge_traits::{BridgeError, FilePlayer};
use core_runtime::logging::strip_path;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use super::{BackendEmitter, PlaybackBackend, SignalForwarder};
use crate::error::{PlaybackFault, Result};
use crate::events::BackendEvent;
use crate::types::BackendKind;

pub struct LocalFileAdapter {
    player: Box<dyn FilePlayer>,
    emitter: BackendEmitter,
    released: bool,
}

impl LocalFileAdapter {
    pub(crate) fn new(player: Box<dyn FilePlayer>, emitter: BackendEmitter) -> Self {
        Self {
            player,
            emitter,
            released: false,
        }
    }

    fn load_failed(reason: impl Into<String>) -> PlaybackFault {
        PlaybackFault::BackendLoadFailed {
            backend: BackendKind::LocalFile,
            reason: reason.into(),
        }
    }

    fn playback_failed(e: BridgeError) -> PlaybackFault {
        PlaybackFault::BackendPlaybackFailed {
            backend: BackendKind::LocalFile,
            reason: e.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl PlaybackBackend for LocalFileAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::LocalFile
    }

    #[instrument(skip(self, uri), fields(file = %strip_path(uri.path())))]
    async fn load(&mut self, uri: &Url) -> Result<()> {
        let path = uri
            .to_file_path()
            .map_err(|_| Self::load_failed("not a local file URI"))?;

        let observer = SignalForwarder::new(self.emitter.clone());
        let duration = self
            .player
            .open(&path, observer)
            .await
            .map_err(|e| Self::load_failed(e.to_string()))?;

        debug!(duration_ms = duration.as_millis() as u64, "File opened");
        self.emitter.emit(BackendEvent::DurationKnown(duration));
        self.emitter.emit(BackendEvent::Ready);
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
            debug!(error = %e, "File player release failed");
        }
    }
}
