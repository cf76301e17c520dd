//! Shared fakes for engine integration tests.
//!
//! Native players are hand-written fakes rather than mocks: tests need to
//! deliver callbacks at chosen times, including after release.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    BridgeError, FilePlayer, NowPlayingInfo, NowPlayingPublisher, PlayerFactory, PlayerObserver,
    PlayerSignal, SourceLookup, StreamPlayer, Track,
};
use core_playback::{PlaybackConfig, PlaybackEngine, PlaybackPhase, SessionSnapshot};
use std::future::pending;
use core_runtime::config::CoreConfig;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const REMOTE_URL: &str = "https://cdn.example.com/audio/song.mp3";
pub const LOCAL_PATH: &str = "/music/song.mp3";

// ============================================================================
// Tracks
// ============================================================================

pub fn simulated_track(id: &str, secs: u64) -> Track {
    Track::new(id, format!("Track {}", id), "Artist", Duration::from_secs(secs))
}

pub fn remote_track(id: &str, secs: u64) -> Track {
    simulated_track(id, secs).with_remote_ref(format!("share/{}", id))
}

pub fn remote_and_local_track(id: &str, secs: u64) -> Track {
    remote_track(id, secs).with_local_filename("song.mp3")
}

// ============================================================================
// Source lookup
// ============================================================================

#[derive(Clone, Default)]
pub struct StaticLookup {
    pub remote: Option<String>,
    pub local: Option<String>,
}

impl StaticLookup {
    pub fn remote() -> Self {
        Self {
            remote: Some(REMOTE_URL.to_string()),
            local: None,
        }
    }

    pub fn remote_and_local() -> Self {
        Self {
            remote: Some(REMOTE_URL.to_string()),
            local: Some(LOCAL_PATH.to_string()),
        }
    }

    pub fn nothing() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SourceLookup for StaticLookup {
    async fn resolve_remote_source(&self, _track: &Track) -> BridgeResult<Option<String>> {
        Ok(self.remote.clone())
    }

    async fn resolve_local_source(&self, _track: &Track) -> BridgeResult<Option<String>> {
        Ok(self.local.clone())
    }
}

/// Local lookups that never answer.
pub struct StalledLocalLookup {
    pub remote: Option<String>,
}

#[async_trait]
impl SourceLookup for StalledLocalLookup {
    async fn resolve_remote_source(&self, _track: &Track) -> BridgeResult<Option<String>> {
        Ok(self.remote.clone())
    }

    async fn resolve_local_source(&self, _track: &Track) -> BridgeResult<Option<String>> {
        pending().await
    }
}

/// Remote lookups resolve to a per-track URL; one chosen track answers late.
#[derive(Clone)]
pub struct DelayedLookup {
    slow_track: String,
    delay: Duration,
    slow_answers: Arc<AtomicUsize>,
}

impl DelayedLookup {
    pub fn new(slow_track: &str, delay: Duration) -> Self {
        Self {
            slow_track: slow_track.to_string(),
            delay,
            slow_answers: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn url_for(id: &str) -> String {
        format!("https://cdn.example.com/audio/{}.mp3", id)
    }

    /// How many lookups for the slow track ran to completion.
    pub fn slow_answers(&self) -> usize {
        self.slow_answers.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceLookup for DelayedLookup {
    async fn resolve_remote_source(&self, track: &Track) -> BridgeResult<Option<String>> {
        if track.id().as_str() == self.slow_track {
            tokio::time::sleep(self.delay).await;
            self.slow_answers.fetch_add(1, Ordering::SeqCst);
        }
        Ok(Some(Self::url_for(track.id().as_str())))
    }

    async fn resolve_local_source(&self, _track: &Track) -> BridgeResult<Option<String>> {
        Ok(None)
    }
}

// ============================================================================
// Native players
// ============================================================================

/// State shared by every player a [`FakePlayers`] factory hands out.
pub struct PlayerShared {
    pub stream_observers: Mutex<Vec<Arc<dyn PlayerObserver>>>,
    pub file_observers: Mutex<Vec<Arc<dyn PlayerObserver>>>,
    pub opened: Mutex<Vec<String>>,
    pub calls: Mutex<Vec<String>>,
    pub position: Mutex<Duration>,
    pub file_duration: Mutex<Duration>,
    pub released: AtomicUsize,
    pub fail_stream_open: AtomicBool,
    pub fail_file_open: AtomicBool,
    pub fail_position: AtomicBool,
    pub fail_controls: AtomicBool,
    /// Stream `open` never returns.
    pub stall_stream_open: AtomicBool,
    /// play/pause/seek never return.
    pub stall_controls: AtomicBool,
}

impl Default for PlayerShared {
    fn default() -> Self {
        Self {
            stream_observers: Mutex::new(Vec::new()),
            file_observers: Mutex::new(Vec::new()),
            opened: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            position: Mutex::new(Duration::ZERO),
            file_duration: Mutex::new(Duration::from_secs(200)),
            released: AtomicUsize::new(0),
            fail_stream_open: AtomicBool::new(false),
            fail_file_open: AtomicBool::new(false),
            fail_position: AtomicBool::new(false),
            fail_controls: AtomicBool::new(false),
            stall_stream_open: AtomicBool::new(false),
            stall_controls: AtomicBool::new(false),
        }
    }
}

impl PlayerShared {
    async fn record(&self, call: String) -> BridgeResult<()> {
        self.calls.lock().unwrap().push(call);
        if self.stall_controls.load(Ordering::SeqCst) {
            pending::<()>().await;
        }
        if self.fail_controls.load(Ordering::SeqCst) {
            Err(BridgeError::OperationFailed("output device lost".to_string()))
        } else {
            Ok(())
        }
    }

    fn current_time(&self) -> BridgeResult<Duration> {
        if self.fail_position.load(Ordering::SeqCst) {
            Err(BridgeError::NotAvailable("time observer detached".to_string()))
        } else {
            Ok(*self.position.lock().unwrap())
        }
    }
}

#[derive(Default)]
pub struct FakePlayers {
    pub shared: Arc<PlayerShared>,
}

impl FakePlayers {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Deliver `signal` through the observer of the `index`-th stream player,
    /// once that player has been opened.
    ///
    /// Works after release too, like a late native callback.
    pub async fn signal_stream(&self, index: usize, signal: PlayerSignal) {
        observer_at(&self.shared.stream_observers, index)
            .await
            .on_signal(signal);
    }

    pub async fn signal_file(&self, index: usize, signal: PlayerSignal) {
        observer_at(&self.shared.file_observers, index)
            .await
            .on_signal(signal);
    }

    pub fn stream_count(&self) -> usize {
        self.shared.stream_observers.lock().unwrap().len()
    }

    /// Wait until `count` stream players have been opened, then let the
    /// engine take in the load results.
    pub async fn wait_for_streams(&self, count: usize) {
        observer_at(&self.shared.stream_observers, count - 1).await;
        settle().await;
    }

    pub fn set_position(&self, position: Duration) {
        *self.shared.position.lock().unwrap() = position;
    }

    pub fn calls(&self) -> Vec<String> {
        self.shared.calls.lock().unwrap().clone()
    }

    pub fn released(&self) -> usize {
        self.shared.released.load(Ordering::SeqCst)
    }
}

/// Loads run on their own task; yield until the `index`-th player is open.
async fn observer_at(
    observers: &Mutex<Vec<Arc<dyn PlayerObserver>>>,
    index: usize,
) -> Arc<dyn PlayerObserver> {
    for _ in 0..1_000 {
        let observer = observers.lock().unwrap().get(index).cloned();
        if let Some(observer) = observer {
            return observer;
        }
        tokio::task::yield_now().await;
    }
    panic!("player {} was never opened", index);
}

impl PlayerFactory for FakePlayers {
    fn stream_player(&self) -> BridgeResult<Box<dyn StreamPlayer>> {
        Ok(Box::new(FakeStreamPlayer {
            shared: Arc::clone(&self.shared),
        }))
    }

    fn file_player(&self) -> BridgeResult<Box<dyn FilePlayer>> {
        Ok(Box::new(FakeFilePlayer {
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct FakeStreamPlayer {
    shared: Arc<PlayerShared>,
}

#[async_trait]
impl StreamPlayer for FakeStreamPlayer {
    async fn open(&self, url: &str, observer: Arc<dyn PlayerObserver>) -> BridgeResult<()> {
        self.shared.opened.lock().unwrap().push(url.to_string());
        if self.shared.fail_stream_open.load(Ordering::SeqCst) {
            return Err(BridgeError::OperationFailed("host unreachable".to_string()));
        }
        if self.shared.stall_stream_open.load(Ordering::SeqCst) {
            pending::<()>().await;
        }
        self.shared.stream_observers.lock().unwrap().push(observer);
        Ok(())
    }

    async fn play(&self) -> BridgeResult<()> {
        self.shared.record("play".to_string()).await
    }

    async fn pause(&self) -> BridgeResult<()> {
        self.shared.record("pause".to_string()).await
    }

    async fn seek(&self, position: Duration) -> BridgeResult<()> {
        *self.shared.position.lock().unwrap() = position;
        self.shared.record(format!("seek:{}", position.as_millis())).await
    }

    async fn current_time(&self) -> BridgeResult<Duration> {
        self.shared.current_time()
    }

    async fn release(&self) -> BridgeResult<()> {
        self.shared.released.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FakeFilePlayer {
    shared: Arc<PlayerShared>,
}

#[async_trait]
impl FilePlayer for FakeFilePlayer {
    async fn open(&self, path: &Path, observer: Arc<dyn PlayerObserver>) -> BridgeResult<Duration> {
        self.shared
            .opened
            .lock()
            .unwrap()
            .push(path.display().to_string());
        if self.shared.fail_file_open.load(Ordering::SeqCst) {
            return Err(BridgeError::NotAvailable("file is locked".to_string()));
        }
        self.shared.file_observers.lock().unwrap().push(observer);
        Ok(*self.shared.file_duration.lock().unwrap())
    }

    async fn play(&self) -> BridgeResult<()> {
        self.shared.record("play".to_string()).await
    }

    async fn pause(&self) -> BridgeResult<()> {
        self.shared.record("pause".to_string()).await
    }

    async fn seek(&self, position: Duration) -> BridgeResult<()> {
        *self.shared.position.lock().unwrap() = position;
        self.shared.record(format!("seek:{}", position.as_millis())).await
    }

    async fn current_time(&self) -> BridgeResult<Duration> {
        self.shared.current_time()
    }

    async fn release(&self) -> BridgeResult<()> {
        self.shared.released.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Now playing
// ============================================================================

#[derive(Default)]
pub struct RecordingPublisher {
    pub published: Mutex<Vec<NowPlayingInfo>>,
    pub clears: AtomicUsize,
}

#[async_trait]
impl NowPlayingPublisher for RecordingPublisher {
    async fn publish(&self, info: NowPlayingInfo) -> BridgeResult<()> {
        self.published.lock().unwrap().push(info);
        Ok(())
    }

    async fn clear(&self) -> BridgeResult<()> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Publisher whose calls never return.
pub struct HangingPublisher;

#[async_trait]
impl NowPlayingPublisher for HangingPublisher {
    async fn publish(&self, _info: NowPlayingInfo) -> BridgeResult<()> {
        pending().await
    }

    async fn clear(&self) -> BridgeResult<()> {
        pending().await
    }
}

impl RecordingPublisher {
    pub fn rates(&self) -> Vec<f32> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|info| info.rate)
            .collect()
    }
}

// ============================================================================
// Engine helpers
// ============================================================================

pub fn engine(lookup: impl SourceLookup + 'static, players: &Arc<FakePlayers>) -> PlaybackEngine {
    let core = CoreConfig::builder()
        .source_lookup(Arc::new(lookup))
        .players(players.clone())
        .build()
        .unwrap();
    PlaybackEngine::new(&core, PlaybackConfig::default()).unwrap()
}

pub fn engine_with_core(core: CoreConfig) -> PlaybackEngine {
    PlaybackEngine::new(&core, PlaybackConfig::default()).unwrap()
}

/// Wait (in virtual time) until a snapshot satisfies `predicate`.
pub async fn wait_until<F>(engine: &PlaybackEngine, predicate: F) -> SessionSnapshot
where
    F: FnMut(&SessionSnapshot) -> bool,
{
    let mut snapshots = engine.subscribe();
    let result = tokio::time::timeout(Duration::from_secs(120), snapshots.wait_for(predicate))
        .await
        .expect("timed out waiting for snapshot")
        .expect("engine closed");
    let snapshot = result.clone();
    snapshot
}

pub async fn wait_for_phase(engine: &PlaybackEngine, phase: PlaybackPhase) -> SessionSnapshot {
    wait_until(engine, |snapshot| snapshot.phase == phase).await
}

/// Let spawned tasks (relay, emitters) drain without advancing virtual time meaningfully.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
