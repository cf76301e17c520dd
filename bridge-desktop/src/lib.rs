//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `SourceLookup` using a library directory and `tokio::fs`
//! - `NowPlayingPublisher` and `TelemetrySink` that log through `tracing`
//!
//! Native players are not provided here; desktop hosts inject a
//! `PlayerFactory` wrapping whatever audio output they ship with.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{DirectorySourceLookup, TracingNowPlaying};
//!
//! let lookup = DirectorySourceLookup::with_library_dir("/srv/music")
//!     .with_remote("share/abc", "https://cdn.example.com/abc.mp3");
//! let presenter = TracingNowPlaying;
//! ```

mod filesystem;
mod presentation;

pub use filesystem::DirectorySourceLookup;
pub use presentation::{TracingNowPlaying, TracingTelemetry};
