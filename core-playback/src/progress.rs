//! # Progress Synchronizer
//!
//! The single periodic tick of a session. Each tick posts `Tick { epoch }`
//! to the engine, which then re-reads the authoritative position: the real
//! backend's `position()` when one is active, the simulated clock otherwise.

use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::events::{EngineMessage, Epoch};

/// Owns at most one running tick task.
#[derive(Default)]
pub(crate) struct ProgressSynchronizer {
    running: Option<(Epoch, CancellationToken, JoinHandle<()>)>,
}

impl ProgressSynchronizer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Start ticking for `epoch`, replacing any previous tick source.
    ///
    /// The first tick arrives one `period` after this call.
    pub(crate) fn start(
        &mut self,
        epoch: Epoch,
        period: Duration,
        sender: UnboundedSender<EngineMessage>,
    ) {
        self.stop();

        let token = CancellationToken::new();
        let child = token.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = ticker.tick() => {
                        if sender.send(EngineMessage::Tick { epoch }).is_err() {
                            break;
                        }
                    }
                }
            }
            trace!(epoch = epoch.value(), "Tick source stopped");
        });

        self.running = Some((epoch, token, handle));
    }

    /// Cancel the tick source. Idempotent.
    pub(crate) fn stop(&mut self) {
        if let Some((_, token, handle)) = self.running.take() {
            token.cancel();
            handle.abort();
        }
    }

    #[cfg(test)]
    /// Epoch of the running tick source, if any.
    pub(crate) fn epoch(&self) -> Option<Epoch> {
        self.running.as_ref().map(|(epoch, _, _)| *epoch)
    }

    #[cfg(test)]
    pub(crate) fn is_running(&self) -> bool {
        self.running.is_some()
    }
}

impl Drop for ProgressSynchronizer {
    fn drop(&mut self) {
        self.stop();
    }
}
