//! Native player bridge traits.
//!
//! Hosts wrap their platform players (network item players, file players)
//! behind these primitives. The core adapts them into one uniform backend
//! contract with epoch-tagged event delivery, so implementations here only
//! need to report what the native player observes.
//!
//! Native players are free to call their observer from any thread and at any
//! time, including after [`release`](StreamPlayer::release) has returned. The
//! core filters such late deliveries.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;

/// Observation reported by a native player.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerSignal {
    /// The item is buffered enough to start playback.
    ReadyToPlay,
    /// The player determined the true duration of the item.
    DurationResolved(Duration),
    /// Periodic position sample from the native time observer.
    TimeUpdate(Duration),
    /// Playback stalled waiting for data (`true`) or recovered (`false`).
    Buffering(bool),
    /// Playback reached the end of the item.
    PlayedToEnd,
    /// Loading or playback failed.
    Failed(String),
}

/// Callback object handed to a native player.
pub trait PlayerObserver: Send + Sync {
    fn on_signal(&self, signal: PlayerSignal);
}

/// Network-backed player.
///
/// `open` only submits the item; readiness, duration and failures arrive
/// through the observer. A stalled stream may never report `ReadyToPlay`.
#[async_trait::async_trait]
pub trait StreamPlayer: Send + Sync {
    /// Submit a remote item for loading.
    async fn open(&self, url: &str, observer: Arc<dyn PlayerObserver>) -> Result<()>;

    async fn play(&self) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    async fn seek(&self, position: Duration) -> Result<()>;

    /// Current playback position as reported by the native player.
    async fn current_time(&self) -> Result<Duration>;

    /// Stop playback and release native resources.
    async fn release(&self) -> Result<()>;
}

/// Local file player.
///
/// Opening is synchronous from the caller's perspective: when `open`
/// succeeds the file is playable and its duration is known.
#[async_trait::async_trait]
pub trait FilePlayer: Send + Sync {
    /// Open a local file, returning its duration.
    async fn open(&self, path: &Path, observer: Arc<dyn PlayerObserver>) -> Result<Duration>;

    async fn play(&self) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    async fn seek(&self, position: Duration) -> Result<()>;

    async fn current_time(&self) -> Result<Duration>;

    async fn release(&self) -> Result<()>;
}

/// Creates a fresh native player for each backend instance.
pub trait PlayerFactory: Send + Sync {
    fn stream_player(&self) -> Result<Box<dyn StreamPlayer>>;

    fn file_player(&self) -> Result<Box<dyn FilePlayer>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        signals: Mutex<Vec<PlayerSignal>>,
    }

    impl PlayerObserver for Recorder {
        fn on_signal(&self, signal: PlayerSignal) {
            self.signals.lock().unwrap().push(signal);
        }
    }

    #[test]
    fn observer_is_object_safe() {
        let recorder = Arc::new(Recorder::default());
        let observer: Arc<dyn PlayerObserver> = recorder.clone();

        observer.on_signal(PlayerSignal::DurationResolved(Duration::from_secs(3)));
        observer.on_signal(PlayerSignal::ReadyToPlay);

        let signals = recorder.signals.lock().unwrap();
        assert_eq!(
            *signals,
            vec![
                PlayerSignal::DurationResolved(Duration::from_secs(3)),
                PlayerSignal::ReadyToPlay
            ]
        );
    }
}
