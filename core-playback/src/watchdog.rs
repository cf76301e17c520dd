//! # Fallback Watchdog
//!
//! Deadline armed while a remote candidate is loading. On expiry it posts
//! `WatchdogExpired { ticket }`; the engine only acts on it if the ticket
//! still names the loading backend.

use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::events::{BackendTicket, EngineMessage};

#[derive(Default)]
pub(crate) struct FallbackWatchdog {
    armed: Option<(BackendTicket, CancellationToken, JoinHandle<()>)>,
}

impl FallbackWatchdog {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Arm for `ticket`, replacing any previous deadline.
    pub(crate) fn arm(
        &mut self,
        ticket: BackendTicket,
        deadline: Duration,
        sender: UnboundedSender<EngineMessage>,
    ) {
        self.disarm();

        let token = CancellationToken::new();
        let child = token.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = child.cancelled() => {}
                _ = tokio::time::sleep(deadline) => {
                    let _ = sender.send(EngineMessage::WatchdogExpired { ticket });
                }
            }
        });

        self.armed = Some((ticket, token, handle));
    }

    /// Cancel the pending deadline. Idempotent.
    pub(crate) fn disarm(&mut self) {
        if let Some((_, token, handle)) = self.armed.take() {
            token.cancel();
            handle.abort();
        }
    }

    #[cfg(test)]
    pub(crate) fn armed_for(&self) -> Option<BackendTicket> {
        self.armed.as_ref().map(|(ticket, _, _)| *ticket)
    }
}

impl Drop for FallbackWatchdog {
    fn drop(&mut self) {
        self.disarm();
    }
}
