//! # Playback Engine
//!
//! Public handle to the playback state machine.
//!
//! ## Architecture
//!
//! ```text
//!  PlaybackEngine (handle, Clone)
//!        │  bounded command channel (+ oneshot ack)
//!        ▼
//!  ┌──────────────┐  unbounded internal channel  ┌──────────────────────────┐
//!  │ EngineActor  │<─────────────────────────────┤ resolver task            │
//!  │ (owns state) │<─────────────────────────────┤ backend emitters         │
//!  │              │<─────────────────────────────┤ tick source / watchdog   │
//!  └──────┬───────┘                              └──────────────────────────┘
//!         │ watch: SessionSnapshot    broadcast: CoreEvent    relay: now playing
//!         ▼
//!     observers
//! ```
//!
//! Every method resolves after the actor has applied the command, so
//! [`PlaybackEngine::snapshot`] reflects it immediately afterwards.
//!
//! ## Usage
//!
//! ```ignore
//! use core_playback::{PlaybackConfig, PlaybackEngine};
//!
//! let engine = PlaybackEngine::new(&core_config, PlaybackConfig::default())?;
//! engine.play(track.clone()).await?;
//! engine.seek(42.0).await?;
//! engine.play(track).await?; // same track: toggles pause
//! ```

mod actor;
mod session;

use bridge_traits::Track;
use core_runtime::config::CoreConfig;
use core_runtime::events::{EventBus, EventStream};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::info;

use crate::config::PlaybackConfig;
use crate::error::{PlaybackError, Result};
use crate::now_playing::NowPlayingRelay;
use crate::resolver::SourceResolver;
use crate::types::SessionSnapshot;
use actor::{Action, Command, EngineActor};

/// Cloneable handle to a running playback engine.
///
/// The engine shuts down when [`shutdown`](Self::shutdown) is called or when
/// the last handle is dropped.
#[derive(Clone)]
pub struct PlaybackEngine {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
    events: EventBus,
}

impl PlaybackEngine {
    /// Spawn the engine actor on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::Config` if `config` fails validation and
    /// `PlaybackError::Runtime` if `core` does.
    pub fn new(core: &CoreConfig, config: PlaybackConfig) -> Result<Self> {
        config.validate().map_err(PlaybackError::Config)?;
        core.validate()?;

        let config = Arc::new(config);
        let events = EventBus::new(core.event_buffer_size);
        let (command_tx, command_rx) = mpsc::channel(config.command_buffer);
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::default());

        let resolver = Arc::new(SourceResolver::new(
            Arc::clone(&core.source_lookup),
            Arc::clone(&config),
        ));
        let relay = NowPlayingRelay::spawn(
            Arc::clone(&core.now_playing),
            Arc::clone(&core.telemetry),
            core.features.publish_now_playing,
        );

        let actor = EngineActor::new(
            Arc::clone(&config),
            core.features,
            resolver,
            Arc::clone(&core.players),
            relay,
            events.clone(),
            snapshot_tx,
            internal_tx,
        );
        tokio::spawn(actor.run(command_rx, internal_rx));

        info!(
            tick_ms = config.tick_interval.as_millis() as u64,
            watchdog_ms = config.watchdog_deadline.as_millis() as u64,
            "Playback engine initialized"
        );

        Ok(Self {
            commands: command_tx,
            snapshots: snapshot_rx,
            events,
        })
    }

    /// Play `track`.
    ///
    /// Requesting the current track toggles between playing and paused; it
    /// never restarts it, except after it has ended.
    pub async fn play(&self, track: Track) -> Result<()> {
        self.send(Action::Play(track)).await
    }

    /// Pause the current track. No-op unless playing.
    pub async fn pause(&self) -> Result<()> {
        self.send(Action::Pause).await
    }

    /// Resume the current track. No-op unless paused.
    pub async fn resume(&self) -> Result<()> {
        self.send(Action::Resume).await
    }

    /// Pause if playing, resume if paused.
    pub async fn toggle(&self) -> Result<()> {
        self.send(Action::Toggle).await
    }

    /// Seek to `seconds`. Negative or NaN values seek to the start; values
    /// past the end clamp to the duration.
    pub async fn seek(&self, seconds: f64) -> Result<()> {
        let target = if seconds.is_nan() || seconds <= 0.0 {
            Duration::ZERO
        } else {
            Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
        };
        self.seek_to(target).await
    }

    pub async fn seek_to(&self, position: Duration) -> Result<()> {
        self.send(Action::Seek(position)).await
    }

    /// Stop playback and clear the session.
    pub async fn stop(&self) -> Result<()> {
        self.send(Action::Stop).await
    }

    /// Tear everything down and stop the actor. Later calls return
    /// [`PlaybackError::EngineClosed`].
    pub async fn shutdown(&self) -> Result<()> {
        self.send(Action::Shutdown).await
    }

    /// Latest published session state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Watch channel of session snapshots.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Stream of playback and source events.
    pub fn events(&self) -> EventStream {
        EventStream::new(self.events.subscribe())
    }

    async fn send(&self, action: Action) -> Result<()> {
        let (ack, done) = oneshot::channel();
        self.commands
            .send(Command { action, ack })
            .await
            .map_err(|_| PlaybackError::EngineClosed)?;
        done.await.map_err(|_| PlaybackError::EngineClosed)
    }
}

impl std::fmt::Debug for PlaybackEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackEngine")
            .field("snapshot", &*self.snapshots.borrow())
            .finish()
    }
}
