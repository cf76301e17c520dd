//! # Playback Backends
//!
//! Uniform contract over the heterogeneous native players.
//!
//! ## Architecture
//!
//! ```text
//! native player ──PlayerSignal──> SignalForwarder ──BackendEvent──> BackendEmitter
//!                                                                        │
//!                                             (gate closed on dispose)   ▼
//!                                                             engine internal channel
//! ```
//!
//! Native players call their observer from arbitrary threads, possibly after
//! release. The [`BackendEmitter`] is the single exit point for backend events;
//! once [`PlaybackBackend::detach`] has closed it, nothing more is enqueued.
//!
//! The engine never awaits `load` or `dispose` on its own loop: loads run on
//! a spawned task and report back with their ticket, and releases are
//! detached.

mod local;
mod streaming;

pub use local::LocalFileAdapter;
pub use streaming::StreamingAdapter;

use bridge_traits::{PlayerFactory, PlayerObserver, PlayerSignal};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use url::Url;

use crate::error::{PlaybackFault, Result};
use crate::events::{BackendEvent, BackendTicket, EngineMessage};
use crate::types::BackendKind;

/// Load/play/pause/seek/position contract shared by every real backend.
///
/// Events (`Ready`, `Failed`, `DurationKnown`, `EndOfTrack`, position samples)
/// are delivered out of band through the engine channel, never as return values.
#[async_trait::async_trait]
pub trait PlaybackBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Start acquiring the source. Returning `Ok` only means the request was
    /// accepted; readiness is signalled with a `Ready` event.
    async fn load(&mut self, uri: &Url) -> Result<()>;

    async fn play(&self) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    async fn seek(&self, to: Duration) -> Result<()>;

    /// Authoritative position from the native player.
    async fn position(&self) -> Result<Duration>;

    /// Stop event delivery. Takes effect before returning.
    fn detach(&self);

    /// Detach, then release the native player. Idempotent.
    async fn dispose(&mut self);
}

/// Gate between a backend instance and the engine's internal channel.
#[derive(Clone)]
pub(crate) struct BackendEmitter {
    sender: Arc<Mutex<Option<UnboundedSender<EngineMessage>>>>,
    ticket: BackendTicket,
}

impl BackendEmitter {
    pub(crate) fn new(sender: UnboundedSender<EngineMessage>, ticket: BackendTicket) -> Self {
        Self {
            sender: Arc::new(Mutex::new(Some(sender))),
            ticket,
        }
    }

    /// Enqueue `event`. Returns `false` once the gate is closed.
    pub(crate) fn emit(&self, event: BackendEvent) -> bool {
        let guard = self.sender.lock();
        match guard.as_ref() {
            Some(sender) => sender
                .send(EngineMessage::Backend {
                    ticket: self.ticket,
                    event,
                })
                .is_ok(),
            None => false,
        }
    }

    /// Close the gate. Holding the lock guarantees no `emit` is mid-send.
    pub(crate) fn close(&self) {
        self.sender.lock().take();
    }

    #[cfg(test)]
    pub(crate) fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }

    pub(crate) fn ticket(&self) -> BackendTicket {
        self.ticket
    }
}

/// Observer handed to native players; translates their signals into backend events.
pub(crate) struct SignalForwarder {
    emitter: BackendEmitter,
}

impl SignalForwarder {
    pub(crate) fn new(emitter: BackendEmitter) -> Arc<Self> {
        Arc::new(Self { emitter })
    }
}

impl PlayerObserver for SignalForwarder {
    fn on_signal(&self, signal: PlayerSignal) {
        let event = match signal {
            PlayerSignal::ReadyToPlay => BackendEvent::Ready,
            PlayerSignal::DurationResolved(duration) => BackendEvent::DurationKnown(duration),
            PlayerSignal::TimeUpdate(position) => BackendEvent::Tick(position),
            PlayerSignal::Buffering(buffering) => BackendEvent::Buffering(buffering),
            PlayerSignal::PlayedToEnd => BackendEvent::EndOfTrack,
            PlayerSignal::Failed(reason) => BackendEvent::Failed(reason),
        };
        if !self.emitter.emit(event) {
            tracing::trace!(
                epoch = self.emitter.ticket().epoch.value(),
                "Dropped signal from disposed backend"
            );
        }
    }
}

/// Create the backend for `kind` from the host's player factory.
pub(crate) fn create_backend(
    players: &dyn PlayerFactory,
    kind: BackendKind,
    emitter: BackendEmitter,
) -> Result<Box<dyn PlaybackBackend>> {
    let load_failed = |reason: String| PlaybackFault::BackendLoadFailed {
        backend: kind,
        reason,
    };

    match kind {
        BackendKind::Streaming => {
            let player = players
                .stream_player()
                .map_err(|e| load_failed(e.to_string()))?;
            Ok(Box::new(StreamingAdapter::new(player, emitter)))
        }
        BackendKind::LocalFile => {
            let player = players
                .file_player()
                .map_err(|e| load_failed(e.to_string()))?;
            Ok(Box::new(LocalFileAdapter::new(player, emitter)))
        }
        BackendKind::Simulated => Err(load_failed(
            "simulated playback has no native backend".to_string(),
        )
        .into()),
    }
}
