//! # Simulated Clock
//!
//! Audio-less timeline used when no real backend is available.
//!
//! The clock is a pure time model over [`tokio::time::Instant`]: it owns no
//! task and emits nothing by itself. The progress tick asks it for the
//! current position and whether the end has been reached, so a session
//! always has exactly one tick source.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq)]
enum ClockState {
    Stopped,
    Paused,
    Running { anchor: Instant },
}

/// Extrapolates a playback position from elapsed wall time.
#[derive(Debug, Clone)]
pub struct SimulatedClock {
    duration: Duration,
    /// Position at the moment `state` last changed.
    base: Duration,
    state: ClockState,
}

impl SimulatedClock {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            base: Duration::ZERO,
            state: ClockState::Stopped,
        }
    }

    /// Start (or restart) from `from`, optionally paused.
    pub fn start(&mut self, from: Duration, running: bool) {
        self.base = from.min(self.duration);
        self.state = if running {
            ClockState::Running {
                anchor: Instant::now(),
            }
        } else {
            ClockState::Paused
        };
    }

    /// Freeze the position. No-op unless running.
    pub fn pause(&mut self) {
        if let ClockState::Running { .. } = self.state {
            self.base = self.position();
            self.state = ClockState::Paused;
        }
    }

    /// Continue from the frozen position. No-op unless paused.
    pub fn resume(&mut self) {
        if self.state == ClockState::Paused {
            self.state = ClockState::Running {
                anchor: Instant::now(),
            };
        }
    }

    /// Jump to `to`, clamped to the duration, keeping the running state.
    pub fn seek(&mut self, to: Duration) {
        self.base = to.min(self.duration);
        if let ClockState::Running { .. } = self.state {
            self.state = ClockState::Running {
                anchor: Instant::now(),
            };
        }
    }

    /// Current extrapolated position, never past the duration.
    pub fn position(&self) -> Duration {
        let position = match self.state {
            ClockState::Running { anchor } => self.base + anchor.elapsed(),
            ClockState::Paused | ClockState::Stopped => self.base,
        };
        position.min(self.duration)
    }

    /// `true` on the first observation at or past the duration.
    ///
    /// A stopped clock never reports the end.
    pub fn reached_end(&self) -> bool {
        match self.state {
            ClockState::Stopped => false,
            _ => self.position() >= self.duration,
        }
    }

    /// Make the clock inert.
    pub fn stop(&mut self) {
        self.base = self.position();
        self.state = ClockState::Stopped;
    }
}
