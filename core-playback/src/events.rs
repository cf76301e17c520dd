//! Internal messages delivered to the engine actor.
//!
//! Everything asynchronous (resolution, backend loads, native player
//! callbacks, ticks, watchdog expiry) is marshalled into an [`EngineMessage`] tagged with the
//! epoch it was issued under. The actor drops any message whose tag no longer
//! matches the live session.

use std::fmt;
use std::time::Duration;

use crate::backend::PlaybackBackend;
use crate::error::Result;
use crate::resolver::SourceCandidate;

/// Session generation counter. Strictly increasing per engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub(crate) struct Epoch(u64);

impl Epoch {
    pub(crate) fn next(self) -> Self {
        Epoch(self.0 + 1)
    }

    pub(crate) fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies one backend instance: the session epoch plus the candidate attempt.
///
/// Two candidates loaded within one session get different tickets, so a late
/// callback from the first cannot be mistaken for the second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BackendTicket {
    pub epoch: Epoch,
    pub attempt: u32,
}

/// Typed event from a backend adapter.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum BackendEvent {
    Ready,
    Failed(String),
    DurationKnown(Duration),
    EndOfTrack,
    /// Authoritative position sample pushed by the native player.
    Tick(Duration),
    /// Advisory buffering state.
    Buffering(bool),
}

/// Backend handed back by a finished load task.
pub(crate) struct LoadedBackend(pub Box<dyn PlaybackBackend>);

impl fmt::Debug for LoadedBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LoadedBackend").field(&self.0.kind()).finish()
    }
}

#[derive(Debug)]
pub(crate) enum EngineMessage {
    Resolved {
        epoch: Epoch,
        candidates: Vec<SourceCandidate>,
    },
    /// `load` returned; the backend travels back to the actor with its result.
    Loaded {
        ticket: BackendTicket,
        backend: LoadedBackend,
        result: Result<()>,
    },
    Backend {
        ticket: BackendTicket,
        event: BackendEvent,
    },
    WatchdogExpired {
        ticket: BackendTicket,
    },
    Tick {
        epoch: Epoch,
    },
}
