//! # Host Bridge Traits
//!
//! Contracts between the playback core and the host application.
//!
//! ## Overview
//!
//! The playback engine owns its state machine but depends on the host for
//! everything platform specific: where a track's audio lives, which native
//! players exist, how "now playing" is presented and where telemetry goes.
//! Each of those capabilities is a trait in this crate, injected into the core
//! at construction time.
//!
//! ## Traits
//!
//! ### Catalog
//! - [`SourceLookup`](catalog::SourceLookup) - Resolve a track to remote and local URIs
//!
//! ### Native Players
//! - [`StreamPlayer`](playback::StreamPlayer) - Network item player
//! - [`FilePlayer`](playback::FilePlayer) - Local file player
//! - [`PlayerFactory`](playback::PlayerFactory) - Fresh player per backend instance
//! - [`PlayerObserver`](playback::PlayerObserver) - Callback object native players report to
//!
//! ### Presentation
//! - [`NowPlayingPublisher`](presentation::NowPlayingPublisher) - System now-playing surface
//! - [`TelemetrySink`](presentation::TelemetrySink) - Fire-and-forget transition notices
//!
//! ### Utilities
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Capability | Desktop default (`bridge-desktop`) | Required |
//! |------------|-----------------------------------|----------|
//! | `SourceLookup` | `DirectorySourceLookup` | yes |
//! | `PlayerFactory` | none | yes |
//! | `NowPlayingPublisher` | `TracingNowPlaying` | no |
//! | `TelemetrySink` | `TracingTelemetry` | no |
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). The core never
//! surfaces a bridge failure as fatal: lookup errors mean "no source", player
//! errors trigger the simulated fallback and presenter errors are logged.
//!
//! ## Thread Safety
//!
//! Every trait requires `Send + Sync`; the core shares implementations across
//! tasks behind `Arc`.

pub mod catalog;
pub mod error;
pub mod logging;
pub mod playback;
pub mod presentation;

pub use error::BridgeError;

pub use catalog::{SourceLookup, Track, TrackId};
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use playback::{FilePlayer, PlayerFactory, PlayerObserver, PlayerSignal, StreamPlayer};
pub use presentation::{
    NowPlayingInfo, NowPlayingPublisher, PlaybackNotice, SilentNowPlaying, SilentTelemetry,
    TelemetrySink,
};
