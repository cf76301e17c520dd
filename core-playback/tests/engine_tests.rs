//! Playback engine scenario tests.
//!
//! These tests verify:
//! - Tracks without sources play on the simulated timeline immediately
//! - Remote streams become Playing on readiness and keep position when the
//!   authoritative duration arrives
//! - Mid-stream failures continue from the last known position
//! - A stalled remote load falls back within the watchdog deadline, even
//!   when the native `open` never returns
//! - Stalled source lookups cannot hold a session in `Resolving`
//! - Events and lookups from superseded sessions never touch the current one
//! - Simulated end-of-track detection lands within one tick
//!
//! All tests run on paused tokio time, so durations are virtual.

mod support;

use bridge_traits::PlayerSignal;
use core_playback::{BackendKind, PlaybackConfig, PlaybackError, PlaybackFault, PlaybackPhase};
use core_runtime::events::{CoreEvent, PlaybackEvent, SourceEvent};
use std::sync::atomic::Ordering;
use std::time::Duration;
use support::*;
use tokio::time::{sleep, Instant};

const TICK: Duration = Duration::from_millis(100);

#[tokio::test(start_paused = true)]
async fn test_track_without_sources_simulates_immediately() {
    let players = FakePlayers::new();
    let engine = engine(StaticLookup::nothing(), &players);

    engine.play(simulated_track("a", 180)).await.unwrap();

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.phase, PlaybackPhase::Simulating);
    assert_eq!(snapshot.backend, Some(BackendKind::Simulated));
    assert_eq!(snapshot.duration, Duration::from_secs(180));
    assert_eq!(snapshot.position, Duration::ZERO);
    assert!(snapshot.is_playing);
    assert!(snapshot.last_error.is_none());
    assert_eq!(players.stream_count(), 0);

    sleep(Duration::from_secs(5)).await;
    let position = engine.snapshot().position;
    assert!(position >= Duration::from_secs(5) - TICK && position <= Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn test_stream_ready_then_authoritative_duration() {
    let players = FakePlayers::new();
    let engine = engine(StaticLookup::remote(), &players);

    engine.play(remote_track("a", 180)).await.unwrap();
    wait_for_phase(&engine, PlaybackPhase::Loading(BackendKind::Streaming)).await;
    players.wait_for_streams(1).await;
    assert_eq!(
        players.shared.opened.lock().unwrap().as_slice(),
        &[REMOTE_URL.to_string()]
    );

    sleep(Duration::from_secs(2)).await;
    players.signal_stream(0, PlayerSignal::ReadyToPlay).await;
    let snapshot = wait_for_phase(&engine, PlaybackPhase::Playing(BackendKind::Streaming)).await;
    assert!(snapshot.is_playing);
    assert_eq!(players.calls(), vec!["play".to_string()]);

    players.set_position(Duration::from_secs(30));
    wait_until(&engine, |s| s.position == Duration::from_secs(30)).await;

    players.signal_stream(0, PlayerSignal::DurationResolved(Duration::from_secs(200))).await;
    let snapshot = wait_until(&engine, |s| s.duration == Duration::from_secs(200)).await;
    assert_eq!(snapshot.position, Duration::from_secs(30));
    assert_eq!(snapshot.phase, PlaybackPhase::Playing(BackendKind::Streaming));
}

#[tokio::test(start_paused = true)]
async fn test_midstream_failure_continues_from_last_position() {
    let players = FakePlayers::new();
    let engine = engine(StaticLookup::remote(), &players);

    engine.play(remote_track("a", 180)).await.unwrap();
    wait_for_phase(&engine, PlaybackPhase::Loading(BackendKind::Streaming)).await;
    players.signal_stream(0, PlayerSignal::ReadyToPlay).await;
    wait_for_phase(&engine, PlaybackPhase::Playing(BackendKind::Streaming)).await;

    players.set_position(Duration::from_secs(50));
    wait_until(&engine, |s| s.position == Duration::from_secs(50)).await;

    players.signal_stream(0, PlayerSignal::Failed("connection reset".to_string())).await;
    let snapshot = wait_for_phase(&engine, PlaybackPhase::Simulating).await;
    assert_eq!(snapshot.position, Duration::from_secs(50));
    assert!(snapshot.is_playing);
    assert!(matches!(
        snapshot.last_error,
        Some(PlaybackFault::BackendPlaybackFailed {
            backend: BackendKind::Streaming,
            ..
        })
    ));
    settle().await;
    assert_eq!(players.released(), 1);

    sleep(Duration::from_secs(1)).await;
    let position = engine.snapshot().position;
    assert!(position >= Duration::from_secs(51) - TICK && position <= Duration::from_secs(51));
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_loading_ignores_late_ready() {
    let players = FakePlayers::new();
    let engine = engine(StaticLookup::remote(), &players);

    engine.play(remote_track("a", 180)).await.unwrap();
    wait_for_phase(&engine, PlaybackPhase::Loading(BackendKind::Streaming)).await;
    players.wait_for_streams(1).await;

    engine.stop().await.unwrap();
    let snapshot = engine.snapshot();
    assert_eq!(snapshot.phase, PlaybackPhase::Idle);
    assert!(snapshot.track.is_none());
    settle().await;
    assert_eq!(players.released(), 1);

    players.signal_stream(0, PlayerSignal::ReadyToPlay).await;
    sleep(Duration::from_secs(1)).await;
    assert_eq!(engine.snapshot().phase, PlaybackPhase::Idle);

    // The watchdog was disarmed along with the backend.
    sleep(Duration::from_secs(15)).await;
    assert_eq!(engine.snapshot().phase, PlaybackPhase::Idle);
    assert!(players.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_playing_the_current_track_toggles_pause() {
    let players = FakePlayers::new();
    let engine = engine(StaticLookup::remote(), &players);
    let track = remote_track("a", 180);

    engine.play(track.clone()).await.unwrap();
    wait_for_phase(&engine, PlaybackPhase::Loading(BackendKind::Streaming)).await;
    players.signal_stream(0, PlayerSignal::ReadyToPlay).await;
    wait_for_phase(&engine, PlaybackPhase::Playing(BackendKind::Streaming)).await;
    players.set_position(Duration::from_secs(12));
    wait_until(&engine, |s| s.position == Duration::from_secs(12)).await;

    engine.play(track.clone()).await.unwrap();
    let snapshot = engine.snapshot();
    assert_eq!(snapshot.phase, PlaybackPhase::Paused(BackendKind::Streaming));
    assert_eq!(snapshot.position, Duration::from_secs(12));
    assert!(!snapshot.is_playing);

    engine.play(track).await.unwrap();
    assert_eq!(
        engine.snapshot().phase,
        PlaybackPhase::Playing(BackendKind::Streaming)
    );
    assert_eq!(players.calls(), vec!["play", "pause", "play"]);
    assert_eq!(players.stream_count(), 1, "no reload on toggle");
}

#[tokio::test(start_paused = true)]
async fn test_stalled_stream_falls_back_within_deadline() {
    let players = FakePlayers::new();
    let engine = engine(StaticLookup::remote(), &players);

    engine.play(remote_track("a", 180)).await.unwrap();
    wait_for_phase(&engine, PlaybackPhase::Loading(BackendKind::Streaming)).await;
    let loading_at = Instant::now();

    sleep(Duration::from_millis(9_900)).await;
    assert_eq!(
        engine.snapshot().phase,
        PlaybackPhase::Loading(BackendKind::Streaming)
    );

    let snapshot = wait_for_phase(&engine, PlaybackPhase::Simulating).await;
    assert!(loading_at.elapsed() <= Duration::from_secs(10) + TICK);
    assert_eq!(
        snapshot.last_error,
        Some(PlaybackFault::WatchdogTimeout(Duration::from_secs(10)))
    );
    settle().await;
    assert_eq!(players.released(), 1);

    // A Ready from the abandoned stream changes nothing.
    players.signal_stream(0, PlayerSignal::ReadyToPlay).await;
    sleep(TICK * 3).await;
    assert_eq!(engine.snapshot().phase, PlaybackPhase::Simulating);
}

#[tokio::test(start_paused = true)]
async fn test_hanging_stream_open_still_falls_back() {
    let players = FakePlayers::new();
    players.shared.stall_stream_open.store(true, Ordering::SeqCst);
    let engine = engine(StaticLookup::remote(), &players);

    engine.play(remote_track("a", 180)).await.unwrap();
    wait_for_phase(&engine, PlaybackPhase::Loading(BackendKind::Streaming)).await;
    let loading_at = Instant::now();

    // Commands are still served while `open` is outstanding.
    tokio::time::timeout(TICK, engine.seek(20.0))
        .await
        .expect("seek blocked behind a pending open")
        .unwrap();
    assert_eq!(engine.snapshot().position, Duration::from_secs(20));

    let snapshot = wait_for_phase(&engine, PlaybackPhase::Simulating).await;
    assert!(loading_at.elapsed() <= Duration::from_secs(10) + TICK);
    assert_eq!(
        snapshot.last_error,
        Some(PlaybackFault::WatchdogTimeout(Duration::from_secs(10)))
    );
    assert_eq!(snapshot.position, Duration::from_secs(20));
    assert_eq!(players.shared.opened.lock().unwrap().len(), 1);

    tokio::time::timeout(TICK, engine.stop())
        .await
        .expect("stop was not acknowledged")
        .unwrap();
    assert_eq!(engine.snapshot().phase, PlaybackPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_hanging_open_is_acknowledged() {
    let players = FakePlayers::new();
    players.shared.stall_stream_open.store(true, Ordering::SeqCst);
    let engine = engine(StaticLookup::remote(), &players);

    engine.play(remote_track("a", 180)).await.unwrap();
    wait_for_phase(&engine, PlaybackPhase::Loading(BackendKind::Streaming)).await;
    settle().await;

    tokio::time::timeout(TICK, engine.stop())
        .await
        .expect("stop was not acknowledged")
        .unwrap();
    assert_eq!(engine.snapshot().phase, PlaybackPhase::Idle);

    // The abandoned load never resurfaces, not even through the watchdog.
    sleep(Duration::from_secs(15)).await;
    assert_eq!(engine.snapshot().phase, PlaybackPhase::Idle);
    assert!(players.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_stalled_local_lookup_cannot_block_resolution() {
    let players = FakePlayers::new();
    let engine = engine(StalledLocalLookup { remote: None }, &players);
    let started = Instant::now();

    engine
        .play(remote_and_local_track("a", 180))
        .await
        .unwrap();
    assert_eq!(engine.snapshot().phase, PlaybackPhase::Resolving);

    let snapshot = wait_for_phase(&engine, PlaybackPhase::Simulating).await;
    assert!(started.elapsed() <= PlaybackConfig::default().local_lookup_timeout + TICK);
    assert_eq!(snapshot.last_error, Some(PlaybackFault::SourceUnavailable));
    assert!(snapshot.is_playing);
}

#[tokio::test(start_paused = true)]
async fn test_switch_during_resolution_ignores_the_old_lookup() {
    let players = FakePlayers::new();
    let lookup = DelayedLookup::new("a", Duration::from_secs(2));
    let engine = engine(lookup.clone(), &players);
    let mut load_events = engine.events().filter(|event| {
        matches!(event, CoreEvent::Source(SourceEvent::LoadStarted { .. }))
    });

    engine.play(remote_track("a", 180)).await.unwrap();
    assert_eq!(engine.snapshot().phase, PlaybackPhase::Resolving);

    engine.play(remote_track("b", 240)).await.unwrap();
    wait_until(&engine, |s| {
        s.track_id() == Some("b") && s.phase == PlaybackPhase::Loading(BackendKind::Streaming)
    })
    .await;
    players.wait_for_streams(1).await;

    // Well past the moment A's lookup would have answered.
    sleep(Duration::from_secs(5)).await;
    assert_eq!(lookup.slow_answers(), 0, "superseded lookup kept running");

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.track_id(), Some("b"));
    assert_eq!(snapshot.phase, PlaybackPhase::Loading(BackendKind::Streaming));
    assert_eq!(snapshot.duration, Duration::from_secs(240));
    assert_eq!(
        players.shared.opened.lock().unwrap().as_slice(),
        &[DelayedLookup::url_for("b")]
    );

    let mut loads = Vec::new();
    while let Some(Ok(event)) = load_events.try_recv() {
        if let CoreEvent::Source(SourceEvent::LoadStarted { track_id, .. }) = event {
            loads.push(track_id);
        }
    }
    assert_eq!(loads, vec!["b".to_string()]);

    players.signal_stream(0, PlayerSignal::ReadyToPlay).await;
    let snapshot = wait_for_phase(&engine, PlaybackPhase::Playing(BackendKind::Streaming)).await;
    assert_eq!(snapshot.track_id(), Some("b"));
}

#[tokio::test(start_paused = true)]
async fn test_superseded_backend_events_are_discarded() {
    let players = FakePlayers::new();
    let engine = engine(StaticLookup::remote(), &players);

    engine.play(remote_track("a", 180)).await.unwrap();
    wait_for_phase(&engine, PlaybackPhase::Loading(BackendKind::Streaming)).await;
    players.wait_for_streams(1).await;

    engine.play(remote_track("b", 240)).await.unwrap();
    wait_until(&engine, |s| {
        s.track_id() == Some("b") && s.phase == PlaybackPhase::Loading(BackendKind::Streaming)
    })
    .await;
    players.wait_for_streams(2).await;

    players.signal_stream(0, PlayerSignal::ReadyToPlay).await;
    players.signal_stream(0, PlayerSignal::DurationResolved(Duration::from_secs(1))).await;
    players.signal_stream(0, PlayerSignal::PlayedToEnd).await;
    sleep(TICK * 5).await;
    let snapshot = engine.snapshot();
    assert_eq!(snapshot.track_id(), Some("b"));
    assert_eq!(snapshot.phase, PlaybackPhase::Loading(BackendKind::Streaming));
    assert_eq!(snapshot.duration, Duration::from_secs(240));

    players.signal_stream(1, PlayerSignal::ReadyToPlay).await;
    let snapshot = wait_for_phase(&engine, PlaybackPhase::Playing(BackendKind::Streaming)).await;
    assert_eq!(snapshot.track_id(), Some("b"));
}

#[tokio::test(start_paused = true)]
async fn test_simulated_track_ends_within_one_tick() {
    let players = FakePlayers::new();
    let engine = engine(StaticLookup::nothing(), &players);
    let started = Instant::now();

    engine.play(simulated_track("short", 3)).await.unwrap();

    sleep(Duration::from_millis(2_950)).await;
    assert_eq!(engine.snapshot().phase, PlaybackPhase::Simulating);

    let snapshot = wait_for_phase(&engine, PlaybackPhase::Ended).await;
    assert!(started.elapsed() <= Duration::from_secs(3) + TICK);
    assert_eq!(snapshot.position, Duration::ZERO);
    assert!(!snapshot.is_playing);
    assert_eq!(snapshot.track_id(), Some("short"));
}

#[tokio::test(start_paused = true)]
async fn test_seek_is_clamped_to_track_bounds() {
    let players = FakePlayers::new();
    let engine = engine(StaticLookup::nothing(), &players);

    engine.play(simulated_track("a", 180)).await.unwrap();
    sleep(Duration::from_secs(2)).await;

    engine.seek(-5.0).await.unwrap();
    assert_eq!(engine.snapshot().position, Duration::ZERO);

    engine.seek(42.5).await.unwrap();
    assert_eq!(engine.snapshot().position, Duration::from_millis(42_500));

    engine.seek(f64::NAN).await.unwrap();
    assert_eq!(engine.snapshot().position, Duration::ZERO);

    engine.seek(280.0).await.unwrap();
    let snapshot = engine.snapshot();
    assert_eq!(snapshot.position, Duration::from_secs(180));
    assert_eq!(snapshot.phase, PlaybackPhase::Simulating);

    // The next tick notices the end.
    wait_for_phase(&engine, PlaybackPhase::Ended).await;
}

#[tokio::test(start_paused = true)]
async fn test_remote_load_failure_tries_local_copy() {
    let players = FakePlayers::new();
    let engine = engine(StaticLookup::remote_and_local(), &players);

    engine
        .play(remote_and_local_track("a", 180))
        .await
        .unwrap();
    wait_for_phase(&engine, PlaybackPhase::Loading(BackendKind::Streaming)).await;

    players.signal_stream(0, PlayerSignal::Failed("HTTP 404".to_string())).await;
    let snapshot = wait_for_phase(&engine, PlaybackPhase::Playing(BackendKind::LocalFile)).await;
    assert_eq!(snapshot.duration, Duration::from_secs(200));
    assert_eq!(
        snapshot.last_error,
        Some(PlaybackFault::BackendLoadFailed {
            backend: BackendKind::Streaming,
            reason: "HTTP 404".to_string(),
        })
    );
    assert_eq!(
        players.shared.opened.lock().unwrap().as_slice(),
        &[REMOTE_URL.to_string(), LOCAL_PATH.to_string()]
    );

    // Local loads are not watched.
    sleep(Duration::from_secs(15)).await;
    assert_eq!(
        engine.snapshot().phase,
        PlaybackPhase::Playing(BackendKind::LocalFile)
    );
}

#[tokio::test(start_paused = true)]
async fn test_all_candidates_failing_falls_back() {
    let players = FakePlayers::new();
    players.shared.fail_stream_open.store(true, Ordering::SeqCst);
    players.shared.fail_file_open.store(true, Ordering::SeqCst);
    let engine = engine(StaticLookup::remote_and_local(), &players);

    engine
        .play(remote_and_local_track("a", 180))
        .await
        .unwrap();
    let snapshot = wait_for_phase(&engine, PlaybackPhase::Simulating).await;

    assert!(matches!(
        snapshot.last_error,
        Some(PlaybackFault::BackendLoadFailed {
            backend: BackendKind::LocalFile,
            ..
        })
    ));
    assert_eq!(snapshot.position, Duration::ZERO);
    assert_eq!(players.shared.opened.lock().unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_unresolvable_source_is_recorded() {
    let players = FakePlayers::new();
    let engine = engine(StaticLookup::nothing(), &players);

    engine.play(remote_track("a", 180)).await.unwrap();
    let snapshot = wait_for_phase(&engine, PlaybackPhase::Simulating).await;

    assert_eq!(snapshot.last_error, Some(PlaybackFault::SourceUnavailable));
    assert_eq!(players.stream_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_lifecycle_events_are_broadcast() {
    let players = FakePlayers::new();
    let engine = engine(StaticLookup::nothing(), &players);
    let mut events = engine.events();

    engine.play(simulated_track("a", 180)).await.unwrap();
    engine.pause().await.unwrap();
    engine.stop().await.unwrap();

    let mut received = Vec::new();
    while let Some(Ok(event)) = events.try_recv() {
        received.push(event);
    }

    assert!(matches!(
        received.as_slice(),
        [
            CoreEvent::Source(SourceEvent::Resolved {
                remote: false,
                local: false,
                ..
            }),
            CoreEvent::Playback(PlaybackEvent::Started { .. }),
            CoreEvent::Playback(PlaybackEvent::Paused { .. }),
            CoreEvent::Playback(PlaybackEvent::Stopped { .. }),
        ]
    ));
    if let CoreEvent::Playback(PlaybackEvent::Started { backend, .. }) = &received[1] {
        assert_eq!(backend, "simulated");
    }
}

#[tokio::test(start_paused = true)]
async fn test_commands_after_shutdown_fail() {
    let players = FakePlayers::new();
    let engine = engine(StaticLookup::remote(), &players);

    engine.play(remote_track("a", 180)).await.unwrap();
    wait_for_phase(&engine, PlaybackPhase::Loading(BackendKind::Streaming)).await;
    players.wait_for_streams(1).await;

    engine.shutdown().await.unwrap();
    settle().await;
    assert_eq!(players.released(), 1);
    assert_eq!(engine.snapshot().phase, PlaybackPhase::Idle);

    let result = engine.play(simulated_track("b", 10)).await;
    assert!(matches!(result, Err(PlaybackError::EngineClosed)));
    assert!(matches!(
        engine.pause().await,
        Err(PlaybackError::EngineClosed)
    ));
}
