//! # Simulated Playback Example
//!
//! Plays one track that has no audio source and one whose stream never
//! becomes ready, printing session snapshots and engine events as the engine
//! falls back to the simulated timeline.
//!
//! Run with: `cargo run --example simulated_playback --package core-playback`

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    BridgeError, FilePlayer, LogLevel, PlayerFactory, PlayerObserver, SourceLookup, StreamPlayer,
    Track,
};
use core_playback::{PlaybackConfig, PlaybackEngine, PlaybackPhase};
use core_runtime::config::CoreConfig;
use core_runtime::logging::{init_logging, LoggingConfig};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Host bridges
// ============================================================================

/// Resolves every remote reference to the same demo URL.
struct DemoLookup;

#[async_trait]
impl SourceLookup for DemoLookup {
    async fn resolve_remote_source(&self, _track: &Track) -> BridgeResult<Option<String>> {
        Ok(Some("https://cdn.example.com/demo/stalled.mp3".to_string()))
    }

    async fn resolve_local_source(&self, _track: &Track) -> BridgeResult<Option<String>> {
        Ok(None)
    }
}

/// Stream player that accepts items but never reports readiness.
struct StalledStream;

#[async_trait]
impl StreamPlayer for StalledStream {
    async fn open(&self, url: &str, _observer: Arc<dyn PlayerObserver>) -> BridgeResult<()> {
        println!("  [player] opening {}", url);
        Ok(())
    }

    async fn play(&self) -> BridgeResult<()> {
        Ok(())
    }

    async fn pause(&self) -> BridgeResult<()> {
        Ok(())
    }

    async fn seek(&self, _position: Duration) -> BridgeResult<()> {
        Ok(())
    }

    async fn current_time(&self) -> BridgeResult<Duration> {
        Ok(Duration::ZERO)
    }

    async fn release(&self) -> BridgeResult<()> {
        println!("  [player] released");
        Ok(())
    }
}

struct DemoPlayers;

impl PlayerFactory for DemoPlayers {
    fn stream_player(&self) -> BridgeResult<Box<dyn StreamPlayer>> {
        Ok(Box::new(StalledStream))
    }

    fn file_player(&self) -> BridgeResult<Box<dyn FilePlayer>> {
        Err(BridgeError::NotAvailable(
            "no local files in this demo".to_string(),
        ))
    }
}

// ============================================================================
// Demo
// ============================================================================

async fn print_until_ended(engine: &PlaybackEngine) {
    let mut snapshots = engine.subscribe();
    let mut last_second = None;
    loop {
        let snapshot = snapshots.borrow_and_update().clone();
        let second = snapshot.position.as_secs();
        if last_second != Some((second, snapshot.phase)) {
            println!(
                "  {:?} {:>3}s / {}s ({:.0}%)",
                snapshot.phase,
                second,
                snapshot.duration.as_secs(),
                snapshot.proportion * 100.0
            );
            last_second = Some((second, snapshot.phase));
        }
        if snapshot.phase == PlaybackPhase::Ended || snapshots.changed().await.is_err() {
            break;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(
        LoggingConfig::default()
            .with_level(LogLevel::Warn)
            .with_filter("core_playback=info"),
    )?;

    let core = CoreConfig::builder()
        .source_lookup(Arc::new(DemoLookup))
        .players(Arc::new(DemoPlayers))
        .build()?;
    let engine = PlaybackEngine::new(&core, PlaybackConfig::responsive())?;

    let mut events = engine.events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            println!("  [event] {}", event.description());
        }
    });

    println!("Track without a source:");
    let offline = Track::new("demo-1", "Offline Sketch", "Demo Artist", Duration::from_secs(3));
    engine.play(offline).await?;
    print_until_ended(&engine).await;

    println!("\nTrack whose stream stalls:");
    let stalled = Track::new("demo-2", "Stalled Stream", "Demo Artist", Duration::from_secs(8))
        .with_remote_ref("share/demo-2");
    engine.play(stalled).await?;
    print_until_ended(&engine).await;

    if let Some(fault) = engine.snapshot().last_error {
        println!("\nLast fault: {}", fault);
    }

    engine.shutdown().await?;
    Ok(())
}
