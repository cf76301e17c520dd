//! # Playback Engine Module
//!
//! Plays a single track by resolving it to a remote or local source, driving
//! the matching native backend, and falling back to a simulated timeline
//! whenever no source is available or the active backend fails or stalls.
//!
//! ## Overview
//!
//! This module handles:
//! - Source resolution and validation (`resolver`)
//! - Uniform streaming and local-file backends over host players (`backend`)
//! - The simulated clock, progress tick and fallback watchdog
//! - The serialized playback state machine (`engine`)
//! - Now-playing and telemetry relay to the host
//!
//! ## Quick start
//!
//! ```ignore
//! use core_playback::{PlaybackConfig, PlaybackEngine};
//! use core_runtime::config::CoreConfig;
//!
//! let core = CoreConfig::builder()
//!     .source_lookup(lookup)
//!     .players(players)
//!     .build()?;
//! let engine = PlaybackEngine::new(&core, PlaybackConfig::default())?;
//!
//! engine.play(track).await?;
//! let mut snapshots = engine.subscribe();
//! snapshots.changed().await?;
//! println!("{:?}", snapshots.borrow().phase);
//! ```

pub mod backend;
pub mod config;
pub mod engine;
pub mod error;
mod events;
mod now_playing;
mod progress;
pub mod resolver;
pub mod simulated;
pub mod types;
mod watchdog;

pub use config::PlaybackConfig;
pub use engine::PlaybackEngine;
pub use error::{PlaybackError, PlaybackFault, Result};
pub use resolver::{CandidateKind, SourceCandidate, SourceResolver};
pub use simulated::SimulatedClock;
pub use types::{BackendKind, PlaybackPhase, Progress, SessionSnapshot};
