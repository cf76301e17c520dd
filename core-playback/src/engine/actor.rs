//! The engine actor: the only writer of playback state.
//!
//! Commands and internal messages are handled one at a time on this task.
//! After each one the actor publishes a fresh [`SessionSnapshot`].
//!
//! Host player calls never block the loop: `load` runs on its own task and
//! reports back as [`EngineMessage::Loaded`], releases are detached, and
//! control calls run under `control_timeout`.

use bridge_traits::{BridgeError, PlaybackNotice, PlayerFactory, Track};
use core_runtime::config::FeatureFlags;
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent, SourceEvent};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};

use super::session::Session;
use crate::backend::{create_backend, BackendEmitter, PlaybackBackend};
use crate::config::PlaybackConfig;
use crate::error::{PlaybackError, PlaybackFault};
use crate::events::{BackendEvent, BackendTicket, EngineMessage, Epoch, LoadedBackend};
use crate::now_playing::NowPlayingRelay;
use crate::progress::ProgressSynchronizer;
use crate::resolver::{CandidateKind, SourceCandidate, SourceResolver};
use crate::simulated::SimulatedClock;
use crate::types::{BackendKind, PlaybackPhase, SessionSnapshot};
use crate::watchdog::FallbackWatchdog;

/// User command with its completion acknowledgement.
pub(crate) struct Command {
    pub action: Action,
    pub ack: oneshot::Sender<()>,
}

/// A `load` running off the actor loop.
struct PendingLoad {
    ticket: BackendTicket,
    emitter: BackendEmitter,
    task: JoinHandle<()>,
    /// `Ready` arrived before `load` returned.
    ready: bool,
}

#[derive(Debug)]
pub(crate) enum Action {
    Play(Track),
    Pause,
    Resume,
    Toggle,
    Seek(Duration),
    Stop,
    Shutdown,
}

pub(crate) struct EngineActor {
    config: Arc<PlaybackConfig>,
    features: FeatureFlags,
    resolver: Arc<SourceResolver>,
    players: Arc<dyn PlayerFactory>,
    relay: NowPlayingRelay,
    events: EventBus,
    snapshots: watch::Sender<SessionSnapshot>,
    internal: mpsc::UnboundedSender<EngineMessage>,

    epoch: Epoch,
    session: Option<Session>,
    backend: Option<Box<dyn PlaybackBackend>>,
    loading: Option<PendingLoad>,
    candidates: VecDeque<SourceCandidate>,
    attempt: u32,
    clock: SimulatedClock,
    progress: ProgressSynchronizer,
    watchdog: FallbackWatchdog,
    resolving: Option<JoinHandle<()>>,
}

impl EngineActor {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        config: Arc<PlaybackConfig>,
        features: FeatureFlags,
        resolver: Arc<SourceResolver>,
        players: Arc<dyn PlayerFactory>,
        relay: NowPlayingRelay,
        events: EventBus,
        snapshots: watch::Sender<SessionSnapshot>,
        internal: mpsc::UnboundedSender<EngineMessage>,
    ) -> Self {
        Self {
            config,
            features,
            resolver,
            players,
            relay,
            events,
            snapshots,
            internal,
            epoch: Epoch::default(),
            session: None,
            backend: None,
            loading: None,
            candidates: VecDeque::new(),
            attempt: 0,
            clock: SimulatedClock::new(Duration::ZERO),
            progress: ProgressSynchronizer::new(),
            watchdog: FallbackWatchdog::new(),
            resolving: None,
        }
    }

    /// Run until shutdown or until every handle is dropped.
    ///
    /// Commands are polled first so user intent always wins over queued
    /// automatic transitions.
    pub(crate) async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut internal: mpsc::UnboundedReceiver<EngineMessage>,
    ) {
        debug!("Playback engine started");
        loop {
            tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Some(Command { action: Action::Shutdown, ack }) => {
                        self.shutdown().await;
                        self.publish_snapshot();
                        let _ = ack.send(());
                        break;
                    }
                    Some(Command { action, ack }) => {
                        self.handle_action(action).await;
                        self.publish_snapshot();
                        let _ = ack.send(());
                    }
                    None => {
                        self.shutdown().await;
                        break;
                    }
                },

                Some(message) = internal.recv() => {
                    self.handle_message(message).await;
                    self.publish_snapshot();
                }
            }
        }

        // Loads that finished while shutting down still hold a native player.
        internal.close();
        while let Ok(message) = internal.try_recv() {
            if let EngineMessage::Loaded { backend, .. } = message {
                release_detached(backend.0);
            }
        }
        debug!("Playback engine stopped");
    }

    // ========================================================================
    // Commands
    // ========================================================================

    async fn handle_action(&mut self, action: Action) {
        match action {
            Action::Play(track) => self.play(track).await,
            Action::Pause => self.pause().await,
            Action::Resume => self.resume().await,
            Action::Toggle => {
                let phase = self.phase();
                if phase.is_playing() {
                    self.pause().await;
                } else if matches!(phase, PlaybackPhase::Paused(_)) {
                    self.resume().await;
                }
            }
            Action::Seek(to) => self.seek(to).await,
            Action::Stop => self.stop().await,
            Action::Shutdown => self.shutdown().await,
        }
    }

    #[instrument(skip(self, track), fields(track_id = %track.id()))]
    async fn play(&mut self, track: Track) {
        if let Some(session) = &self.session {
            if session.track.is_same(&track) {
                match session.phase {
                    PlaybackPhase::Playing(_) | PlaybackPhase::Simulating => {
                        self.pause().await;
                        return;
                    }
                    PlaybackPhase::Paused(_) => {
                        self.resume().await;
                        return;
                    }
                    PlaybackPhase::Resolving | PlaybackPhase::Loading(_) => {
                        debug!("Track already starting");
                        return;
                    }
                    PlaybackPhase::Idle | PlaybackPhase::Ended => {}
                }
            }
        }

        self.start_session(track).await;
    }

    async fn start_session(&mut self, track: Track) {
        self.end_current_for_switch().await;

        self.epoch = self.epoch.next();
        self.attempt = 0;
        let epoch = self.epoch;
        info!(epoch = epoch.value(), title = %track.title(), "Starting session");

        self.session = Some(Session::new(track.clone(), epoch));
        self.progress
            .start(epoch, self.config.tick_interval, self.internal.clone());

        if !track.has_source_reference() {
            self.emit(CoreEvent::Source(SourceEvent::Resolved {
                track_id: track.id().to_string(),
                remote: false,
                local: false,
            }));
            self.enter_simulation(true).await;
            return;
        }

        let resolver = Arc::clone(&self.resolver);
        let sender = self.internal.clone();
        self.resolving = Some(tokio::spawn(async move {
            let candidates = resolver.resolve(&track).await;
            let _ = sender.send(EngineMessage::Resolved { epoch, candidates });
        }));
    }

    async fn pause(&mut self) {
        let Some(phase) = self.session.as_ref().map(|s| s.phase) else {
            return;
        };

        match phase {
            PlaybackPhase::Playing(kind) => {
                let limit = self.config.control_timeout;
                let result = match &self.backend {
                    Some(backend) => bounded(limit, backend.pause()).await,
                    None => Ok(()),
                };
                if let Err(e) = result {
                    self.backend_call_failed(kind, e, false).await;
                    return;
                }
                if let Some(Ok(position)) = self.read_backend_position().await {
                    if let Some(session) = self.session.as_mut() {
                        session.set_position(position);
                    }
                }
                self.set_phase(PlaybackPhase::Paused(kind));
            }
            PlaybackPhase::Simulating => {
                self.clock.pause();
                let position = self.clock.position();
                if let Some(session) = self.session.as_mut() {
                    session.set_position(position);
                }
                self.set_phase(PlaybackPhase::Paused(BackendKind::Simulated));
            }
            _ => {
                trace!(?phase, "Pause ignored");
                return;
            }
        }

        if let Some(session) = &self.session {
            info!(position_ms = session.position_ms(), "Paused");
            self.emit(CoreEvent::Playback(PlaybackEvent::Paused {
                track_id: session.track_id(),
                position_ms: session.position_ms(),
            }));
            self.relay.notify(PlaybackNotice::Paused {
                track_id: session.track_id(),
                position_ms: session.position_ms(),
            });
            self.relay.publish(session.now_playing());
        }
    }

    async fn resume(&mut self) {
        let Some(phase) = self.session.as_ref().map(|s| s.phase) else {
            return;
        };

        match phase {
            PlaybackPhase::Paused(BackendKind::Simulated) => {
                self.clock.resume();
                self.set_phase(PlaybackPhase::Simulating);
            }
            PlaybackPhase::Paused(kind) => {
                let limit = self.config.control_timeout;
                let result = match &self.backend {
                    Some(backend) => bounded(limit, backend.play()).await,
                    None => Ok(()),
                };
                if let Err(e) = result {
                    self.backend_call_failed(kind, e, true).await;
                    return;
                }
                self.set_phase(PlaybackPhase::Playing(kind));
            }
            _ => {
                trace!(?phase, "Resume ignored");
                return;
            }
        }

        if let Some(session) = &self.session {
            info!(position_ms = session.position_ms(), "Resumed");
            self.emit(CoreEvent::Playback(PlaybackEvent::Resumed {
                track_id: session.track_id(),
                position_ms: session.position_ms(),
            }));
            self.relay.notify(PlaybackNotice::Resumed {
                track_id: session.track_id(),
                position_ms: session.position_ms(),
            });
            self.relay.publish(session.now_playing());
        }
    }

    async fn seek(&mut self, to: Duration) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let target = to.min(session.duration());
        let phase = session.phase;

        match phase {
            PlaybackPhase::Idle | PlaybackPhase::Ended => {
                trace!(?phase, "Seek ignored");
                return;
            }
            PlaybackPhase::Resolving | PlaybackPhase::Loading(_) => {
                // Applied on Ready, or used as the simulated start.
                session.set_position(target);
                debug!(position_ms = session.position_ms(), "Seek deferred until ready");
                return;
            }
            PlaybackPhase::Simulating | PlaybackPhase::Paused(BackendKind::Simulated) => {
                session.set_position(target);
                self.clock.seek(target);
            }
            PlaybackPhase::Playing(kind) | PlaybackPhase::Paused(kind) => {
                session.set_position(target);
                let limit = self.config.control_timeout;
                let result = match &self.backend {
                    Some(backend) => bounded(limit, backend.seek(target)).await,
                    None => Ok(()),
                };
                if let Err(e) = result {
                    self.backend_call_failed(kind, e, phase.is_playing()).await;
                    return;
                }
            }
        }

        if let Some(session) = &self.session {
            debug!(position_ms = session.position_ms(), "Seeked");
            self.relay.publish(session.now_playing());
        }
    }

    async fn stop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        self.teardown().await;
        self.epoch = self.epoch.next();

        info!(track_id = %session.track.id(), "Stopped");
        self.emit(CoreEvent::Playback(PlaybackEvent::Stopped {
            track_id: session.track_id(),
        }));
        self.relay.notify(PlaybackNotice::Stopped {
            track_id: session.track_id(),
        });
        self.relay.clear();
    }

    async fn shutdown(&mut self) {
        if self.session.is_some() {
            self.stop().await;
        } else {
            self.teardown().await;
            self.relay.clear();
        }

        let limit = self.config.control_timeout;
        if tokio::time::timeout(limit, self.relay.flush()).await.is_err() {
            warn!(timeout_ms = limit.as_millis() as u64, "Now-playing relay did not drain before shutdown");
        }
    }

    // ========================================================================
    // Internal messages
    // ========================================================================

    async fn handle_message(&mut self, message: EngineMessage) {
        match message {
            EngineMessage::Resolved { epoch, candidates } => {
                self.on_resolved(epoch, candidates).await
            }
            EngineMessage::Loaded {
                ticket,
                backend,
                result,
            } => self.on_loaded(ticket, backend, result).await,
            EngineMessage::Backend { ticket, event } => self.on_backend_event(ticket, event).await,
            EngineMessage::WatchdogExpired { ticket } => self.on_watchdog(ticket).await,
            EngineMessage::Tick { epoch } => self.on_tick(epoch).await,
        }
    }

    async fn on_resolved(&mut self, epoch: Epoch, candidates: Vec<SourceCandidate>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.epoch != epoch || session.phase != PlaybackPhase::Resolving {
            trace!(epoch = epoch.value(), "Discarding stale resolution");
            return;
        }
        self.resolving = None;

        let track_id = session.track_id();
        self.emit(CoreEvent::Source(SourceEvent::Resolved {
            track_id,
            remote: candidates.iter().any(|c| c.kind == CandidateKind::Remote),
            local: candidates.iter().any(|c| c.kind == CandidateKind::Local),
        }));

        if candidates.is_empty() {
            self.fail(PlaybackFault::SourceUnavailable, true).await;
            return;
        }

        self.candidates = candidates.into();
        self.load_next_candidate().await;
    }

    /// Start loading the next candidate, or fall back to simulation once none
    /// are left. The load itself runs on its own task.
    async fn load_next_candidate(&mut self) {
        while let Some(candidate) = self.candidates.pop_front() {
            let Some(session) = self.session.as_mut() else {
                return;
            };

            self.attempt += 1;
            let ticket = BackendTicket {
                epoch: self.epoch,
                attempt: self.attempt,
            };
            let kind = candidate.backend_kind();
            session.phase = PlaybackPhase::Loading(kind);
            session.ticket = Some(ticket);
            session.is_buffering = false;
            let track_id = session.track_id();

            info!(backend = %kind, attempt = ticket.attempt, source = %candidate.redacted(), "Loading candidate");
            self.emit(CoreEvent::Source(SourceEvent::LoadStarted {
                track_id,
                backend: kind.to_string(),
                attempt: ticket.attempt,
            }));

            let emitter = BackendEmitter::new(self.internal.clone(), ticket);
            let mut backend = match create_backend(self.players.as_ref(), kind, emitter.clone()) {
                Ok(backend) => backend,
                Err(e) => {
                    self.load_failed(kind, e.to_string());
                    continue;
                }
            };

            if candidate.kind == CandidateKind::Remote {
                self.watchdog
                    .arm(ticket, self.config.watchdog_deadline, self.internal.clone());
            }

            // Local opens have no watchdog; bound them directly.
            let bound = (candidate.kind == CandidateKind::Local).then_some(self.config.watchdog_deadline);
            let sender = self.internal.clone();
            let task = tokio::spawn(async move {
                let load = backend.load(&candidate.uri);
                let result = match bound {
                    Some(limit) => bounded(limit, load).await,
                    None => load.await,
                };
                let _ = sender.send(EngineMessage::Loaded {
                    ticket,
                    backend: LoadedBackend(backend),
                    result,
                });
            });
            self.loading = Some(PendingLoad {
                ticket,
                emitter,
                task,
                ready: false,
            });
            return;
        }

        self.enter_simulation(true).await;
    }

    fn load_failed(&mut self, kind: BackendKind, reason: String) {
        warn!(backend = %kind, %reason, "Candidate failed to load");
        if let Some(session) = self.session.as_mut() {
            session.ticket = None;
            let track_id = session.track_id();
            self.record_fault(PlaybackFault::BackendLoadFailed {
                backend: kind,
                reason: reason.clone(),
            });
            self.emit(CoreEvent::Source(SourceEvent::LoadFailed {
                track_id,
                backend: kind.to_string(),
                reason,
            }));
        }
    }

    async fn on_loaded(
        &mut self,
        ticket: BackendTicket,
        backend: LoadedBackend,
        result: Result<(), PlaybackError>,
    ) {
        let LoadedBackend(backend) = backend;
        let pending = match self.loading.take() {
            Some(pending) if pending.ticket == ticket => pending,
            other => {
                self.loading = other;
                trace!(epoch = ticket.epoch.value(), attempt = ticket.attempt, "Discarding stale load result");
                release_detached(backend);
                return;
            }
        };

        let kind = backend.kind();
        match result {
            Ok(()) => {
                debug!(backend = %kind, attempt = ticket.attempt, "Load accepted");
                self.backend = Some(backend);
                if pending.ready {
                    self.on_ready(kind).await;
                }
            }
            Err(e) => {
                self.watchdog.disarm();
                release_detached(backend);
                self.load_failed(kind, failure_reason(e));
                self.load_next_candidate().await;
            }
        }
    }

    async fn on_backend_event(&mut self, ticket: BackendTicket, event: BackendEvent) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.ticket != Some(ticket) {
            trace!(epoch = ticket.epoch.value(), attempt = ticket.attempt, ?event, "Discarding stale backend event");
            return;
        }
        let phase = session.phase;

        match event {
            BackendEvent::Ready => {
                if let PlaybackPhase::Loading(kind) = phase {
                    match self.loading.as_mut() {
                        Some(pending) if pending.ticket == ticket => {
                            trace!("Ready before load returned");
                            pending.ready = true;
                        }
                        _ => self.on_ready(kind).await,
                    }
                }
            }
            BackendEvent::Failed(reason) => match phase {
                PlaybackPhase::Loading(kind) => {
                    self.cancel_load();
                    self.watchdog.disarm();
                    self.dispose_backend();
                    self.load_failed(kind, reason);
                    self.load_next_candidate().await;
                }
                PlaybackPhase::Playing(kind) | PlaybackPhase::Paused(kind) => {
                    warn!(backend = %kind, %reason, "Backend failed during playback");
                    let fault = PlaybackFault::BackendPlaybackFailed {
                        backend: kind,
                        reason,
                    };
                    self.fail(fault, phase.is_playing()).await;
                }
                _ => {}
            },
            BackendEvent::DurationKnown(duration) => self.on_duration_known(duration).await,
            BackendEvent::EndOfTrack => {
                if matches!(phase, PlaybackPhase::Playing(_) | PlaybackPhase::Paused(_)) {
                    self.end_session().await;
                }
            }
            BackendEvent::Tick(position) => {
                if session.has_active_backend() {
                    session.set_position(position);
                }
            }
            BackendEvent::Buffering(buffering) => {
                session.is_buffering = buffering;
            }
        }
    }

    async fn on_ready(&mut self, kind: BackendKind) {
        self.watchdog.disarm();

        let pending = self
            .session
            .as_ref()
            .map(|s| s.position())
            .unwrap_or_default();

        let limit = self.config.control_timeout;
        let result = match &self.backend {
            Some(backend) => {
                let seeked = if pending.is_zero() {
                    Ok(())
                } else {
                    bounded(limit, backend.seek(pending)).await
                };
                match seeked {
                    Ok(()) => bounded(limit, backend.play()).await,
                    Err(e) => Err(e),
                }
            }
            None => Ok(()),
        };

        // Ready counts as reaching playback; a failure here is mid-stream.
        self.set_phase(PlaybackPhase::Playing(kind));
        if let Err(e) = result {
            self.backend_call_failed(kind, e, true).await;
            return;
        }

        if let Some(session) = &self.session {
            info!(backend = %kind, "Playing");
            self.emit(CoreEvent::Playback(PlaybackEvent::Started {
                track_id: session.track_id(),
                title: session.track.title().to_string(),
                backend: kind.to_string(),
            }));
            self.relay.notify(PlaybackNotice::Started {
                track_id: session.track_id(),
                backend: kind.to_string(),
            });
            self.relay.publish(session.now_playing());
        }
    }

    async fn on_duration_known(&mut self, duration: Duration) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.duration_confirmed {
            debug!(duration_ms = duration.as_millis() as u64, "Ignoring repeated duration report");
            return;
        }

        session.duration_confirmed = true;
        session.set_duration(duration);
        debug!(duration_ms = duration.as_millis() as u64, "Authoritative duration");

        let track_id = session.track_id();
        let ends = session.at_end()
            && matches!(session.phase, PlaybackPhase::Playing(_) | PlaybackPhase::Paused(_));
        let info = session.now_playing();

        self.emit(CoreEvent::Playback(PlaybackEvent::DurationChanged {
            track_id,
            duration_ms: duration.as_millis() as u64,
        }));

        if ends {
            self.end_session().await;
        } else {
            self.relay.publish(info);
        }
    }

    async fn on_watchdog(&mut self, ticket: BackendTicket) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        if session.ticket != Some(ticket) || !matches!(session.phase, PlaybackPhase::Loading(_)) {
            trace!(epoch = ticket.epoch.value(), "Discarding stale watchdog expiry");
            return;
        }

        let deadline = self.config.watchdog_deadline;
        warn!(deadline_ms = deadline.as_millis() as u64, "Backend not ready before deadline");
        self.emit(CoreEvent::Source(SourceEvent::WatchdogExpired {
            track_id: session.track_id(),
            deadline_ms: deadline.as_millis() as u64,
        }));
        self.fail(PlaybackFault::WatchdogTimeout(deadline), true).await;
    }

    async fn on_tick(&mut self, epoch: Epoch) {
        let Some(phase) = self
            .session
            .as_ref()
            .filter(|s| s.epoch == epoch)
            .map(|s| s.phase)
        else {
            return;
        };

        match phase {
            PlaybackPhase::Playing(kind) if kind.is_real() => {
                match self.read_backend_position().await {
                    Some(Ok(position)) => {
                        if let Some(session) = self.session.as_mut() {
                            session.set_position(position);
                        }
                    }
                    Some(Err(e)) => trace!(error = %e, "Position read failed; keeping last value"),
                    None => {}
                }
            }
            PlaybackPhase::Simulating => {
                let position = self.clock.position();
                let reached_end = self.clock.reached_end();
                if let Some(session) = self.session.as_mut() {
                    session.set_position(position);
                }
                if reached_end {
                    self.end_session().await;
                    return;
                }
            }
            _ => return,
        }

        if self.features.position_events {
            if let Some(session) = &self.session {
                self.emit(CoreEvent::Playback(PlaybackEvent::PositionChanged {
                    track_id: session.track_id(),
                    position_ms: session.position_ms(),
                    duration_ms: session.duration().as_millis() as u64,
                }));
            }
        }
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Record `fault` and, if it ends real playback, move onto the simulated
    /// timeline from the last known position.
    ///
    /// A failed session never stays failed; the fault is kept in `last_error`.
    async fn fail(&mut self, fault: PlaybackFault, running: bool) {
        let fall_back = fault.is_fallback_trigger();
        self.record_fault(fault);
        if fall_back {
            self.enter_simulation(running).await;
        }
    }

    async fn enter_simulation(&mut self, running: bool) {
        self.cancel_load();
        self.watchdog.disarm();
        self.dispose_backend();
        self.candidates.clear();

        let Some(session) = self.session.as_mut() else {
            return;
        };
        let was_started = !session.phase.is_pending();
        session.ticket = None;
        session.is_buffering = false;
        session.phase = if running {
            PlaybackPhase::Simulating
        } else {
            PlaybackPhase::Paused(BackendKind::Simulated)
        };

        self.clock = SimulatedClock::new(session.duration());
        self.clock.start(session.position(), running);

        let track_id = session.track_id();
        let fault = session.last_error.clone();
        let position_ms = session.position_ms();
        let info = session.now_playing();
        let title = session.track.title().to_string();
        let at_end = session.at_end();

        info!(position_ms, running, "Simulating playback");
        if !was_started {
            self.emit(CoreEvent::Playback(PlaybackEvent::Started {
                track_id: track_id.clone(),
                title,
                backend: BackendKind::Simulated.to_string(),
            }));
            self.relay.notify(PlaybackNotice::Started {
                track_id: track_id.clone(),
                backend: BackendKind::Simulated.to_string(),
            });
        }
        if let Some(fault) = fault {
            self.emit(CoreEvent::Playback(PlaybackEvent::FellBack {
                track_id: track_id.clone(),
                reason: fault.to_string(),
                position_ms,
            }));
            self.emit(CoreEvent::Playback(PlaybackEvent::Error {
                track_id: Some(track_id.clone()),
                message: fault.to_string(),
                recoverable: true,
            }));
            self.relay.notify(PlaybackNotice::FellBack {
                track_id,
                reason: fault.to_string(),
            });
        }
        self.relay.publish(info);

        if running && at_end {
            self.end_session().await;
        }
    }

    /// Natural end: release everything but keep the session observable.
    async fn end_session(&mut self) {
        self.teardown().await;

        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.phase = PlaybackPhase::Ended;
        session.ticket = None;
        session.is_buffering = false;
        session.set_position(Duration::ZERO);

        info!(track_id = %session.track.id(), "Track completed");
        let track_id = session.track_id();
        let info = session.now_playing();
        self.emit(CoreEvent::Playback(PlaybackEvent::Completed {
            track_id: track_id.clone(),
        }));
        self.relay.notify(PlaybackNotice::Completed { track_id });
        self.relay.publish(info);
    }

    /// Tear down the current session before a track switch.
    async fn end_current_for_switch(&mut self) {
        let Some(previous) = self.session.take() else {
            return;
        };
        self.teardown().await;
        if previous.phase != PlaybackPhase::Ended {
            debug!(track_id = %previous.track.id(), "Abandoning session");
            self.emit(CoreEvent::Playback(PlaybackEvent::Stopped {
                track_id: previous.track_id(),
            }));
            self.relay.notify(PlaybackNotice::Stopped {
                track_id: previous.track_id(),
            });
        }
    }

    /// Control call on the active backend failed: record it and fall back.
    async fn backend_call_failed(&mut self, kind: BackendKind, error: PlaybackError, running: bool) {
        let network = error.is_network_error();
        let reason = failure_reason(error);
        warn!(backend = %kind, %reason, network, "Backend control call failed");
        let fault = PlaybackFault::BackendPlaybackFailed {
            backend: kind,
            reason,
        };
        self.fail(fault, running).await;
    }

    /// Dispose the backend and cancel every timer and task. Idempotent.
    async fn teardown(&mut self) {
        if let Some(handle) = self.resolving.take() {
            handle.abort();
        }
        self.cancel_load();
        self.watchdog.disarm();
        self.progress.stop();
        self.clock.stop();
        self.candidates.clear();
        self.dispose_backend();
    }

    /// Abandon an in-flight load. A task still inside `open` drops its native
    /// player unreleased; a result already queued is released by `on_loaded`.
    fn cancel_load(&mut self) {
        if let Some(pending) = self.loading.take() {
            debug!(attempt = pending.ticket.attempt, "Cancelling in-flight load");
            pending.emitter.close();
            pending.task.abort();
        }
    }

    fn dispose_backend(&mut self) {
        if let Some(backend) = self.backend.take() {
            debug!(backend = %backend.kind(), "Disposing backend");
            release_detached(backend);
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Position reads share the tick's budget: a read slower than one tick
    /// counts as failed.
    async fn read_backend_position(&self) -> Option<Result<Duration, PlaybackError>> {
        match &self.backend {
            Some(backend) => Some(bounded(self.config.tick_interval, backend.position()).await),
            None => None,
        }
    }

    fn phase(&self) -> PlaybackPhase {
        self.session
            .as_ref()
            .map(|s| s.phase)
            .unwrap_or(PlaybackPhase::Idle)
    }

    fn set_phase(&mut self, phase: PlaybackPhase) {
        if let Some(session) = self.session.as_mut() {
            session.phase = phase;
        }
    }

    fn record_fault(&mut self, fault: PlaybackFault) {
        debug!(%fault, network = fault.is_network_error(), "Recording fault");
        if let Some(session) = self.session.as_mut() {
            session.last_error = Some(fault);
        }
    }

    fn emit(&self, event: CoreEvent) {
        // No subscribers is not an error for playback.
        let _ = self.events.emit(event);
    }

    fn publish_snapshot(&self) {
        let snapshot = self
            .session
            .as_ref()
            .map(Session::snapshot)
            .unwrap_or_default();
        self.snapshots.send_if_modified(|current| {
            if *current != snapshot {
                *current = snapshot;
                true
            } else {
                false
            }
        });
    }
}

/// Close the backend's event gate now and release the native player on its own task.
fn release_detached(mut backend: Box<dyn PlaybackBackend>) {
    backend.detach();
    tokio::spawn(async move { backend.dispose().await });
}

async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, PlaybackError>>,
) -> Result<T, PlaybackError> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(BridgeError::Timeout(limit).into()),
    }
}

fn failure_reason(error: PlaybackError) -> String {
    match error {
        PlaybackError::Fault(PlaybackFault::BackendLoadFailed { reason, .. })
        | PlaybackError::Fault(PlaybackFault::BackendPlaybackFailed { reason, .. }) => reason,
        other => other.to_string(),
    }
}
