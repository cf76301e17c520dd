//! # Core Configuration Module
//!
//! Provides configuration management for the playback core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds the host collaborators and settings the playback engine
//! needs. It enforces fail-fast validation so a host learns about a missing
//! bridge at startup instead of at the first `play()`.
//!
//! ## Required Dependencies
//!
//! - `SourceLookup` - Resolves a track's remote and local references
//!   (desktop default: `DirectorySourceLookup`)
//! - `PlayerFactory` - Creates native stream and file players (always required)
//!
//! ## Optional Dependencies
//!
//! - `NowPlayingPublisher` - System media-session surface
//! - `TelemetrySink` - Fire-and-forget playback notices
//!
//! Missing optional collaborators fall back to silent implementations, or to
//! the tracing-backed desktop ones when the `desktop-shims` feature is enabled.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .source_lookup(Arc::new(MyLookup))
//!     .players(Arc::new(MyPlayers))
//!     .position_events(true)
//!     .build()
//!     .expect("Failed to build config");
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // No player factory: fails with an actionable CapabilityMissing error
//! let config = CoreConfig::builder()
//!     .build()
//!     .expect("Should fail - missing required bridges");
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{NowPlayingPublisher, PlayerFactory, SourceLookup, TelemetrySink};
use std::sync::Arc;

/// Core configuration for the playback core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Resolves track references to URIs (required)
    pub source_lookup: Arc<dyn SourceLookup>,

    /// Native player factory (required)
    pub players: Arc<dyn PlayerFactory>,

    /// Now-playing surface (silent when not provided)
    pub now_playing: Arc<dyn NowPlayingPublisher>,

    /// Telemetry sink (silent when not provided)
    pub telemetry: Arc<dyn TelemetrySink>,

    /// Capacity of the broadcast event bus
    pub event_buffer_size: usize,

    /// Feature flags
    pub features: FeatureFlags,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("source_lookup", &"SourceLookup { ... }")
            .field("players", &"PlayerFactory { ... }")
            .field("now_playing", &"NowPlayingPublisher { ... }")
            .field("telemetry", &"TelemetrySink { ... }")
            .field("event_buffer_size", &self.event_buffer_size)
            .field("features", &self.features)
            .finish()
    }
}

/// Feature flags control optional functionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Push now-playing updates to the host surface
    pub publish_now_playing: bool,

    /// Emit `PlaybackEvent::PositionChanged` on every tick
    pub position_events: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            publish_now_playing: true,
            position_events: false,
        }
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > 10_000 {
            return Err(Error::Config(
                "Event buffer size exceeds maximum of 10,000 events".to_string(),
            ));
        }

        Ok(())
    }
}

fn player_factory_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "PlayerFactory".to_string(),
        message: "PlayerFactory implementation is required to create native players. \
                 Desktop: wrap your audio output (e.g. rodio, gstreamer) in a PlayerFactory. \
                 Mobile: inject the AVPlayer/ExoPlayer bridge. \
                 Tests: use a fake factory whose players never become ready."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn source_lookup_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "SourceLookup".to_string(),
        message: "SourceLookup implementation is required to resolve track references. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default DirectorySourceLookup. \
                 Mobile: inject a lookup backed by the app's download and share-link stores."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_source_lookup() -> Result<Arc<dyn SourceLookup>> {
    use bridge_desktop::DirectorySourceLookup;

    let lookup: Arc<dyn SourceLookup> = Arc::new(DirectorySourceLookup::new());
    Ok(lookup)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_source_lookup() -> Result<Arc<dyn SourceLookup>> {
    Err(source_lookup_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_now_playing() -> Arc<dyn NowPlayingPublisher> {
    Arc::new(bridge_desktop::TracingNowPlaying)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_now_playing() -> Arc<dyn NowPlayingPublisher> {
    Arc::new(bridge_traits::SilentNowPlaying)
}

#[cfg(feature = "desktop-shims")]
fn provide_default_telemetry() -> Arc<dyn TelemetrySink> {
    Arc::new(bridge_desktop::TracingTelemetry)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_telemetry() -> Arc<dyn TelemetrySink> {
    Arc::new(bridge_traits::SilentTelemetry)
}

/// Builder for constructing a [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    source_lookup: Option<Arc<dyn SourceLookup>>,
    players: Option<Arc<dyn PlayerFactory>>,
    now_playing: Option<Arc<dyn NowPlayingPublisher>>,
    telemetry: Option<Arc<dyn TelemetrySink>>,
    event_buffer_size: Option<usize>,
    features: FeatureFlags,
}

impl CoreConfigBuilder {
    /// Sets the source lookup used to resolve track references.
    pub fn source_lookup(mut self, lookup: Arc<dyn SourceLookup>) -> Self {
        self.source_lookup = Some(lookup);
        self
    }

    /// Sets the native player factory.
    pub fn players(mut self, players: Arc<dyn PlayerFactory>) -> Self {
        self.players = Some(players);
        self
    }

    pub fn now_playing(mut self, publisher: Arc<dyn NowPlayingPublisher>) -> Self {
        self.now_playing = Some(publisher);
        self
    }

    pub fn telemetry(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = Some(sink);
        self
    }

    /// Sets the event bus capacity (default: 100).
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn publish_now_playing(mut self, enabled: bool) -> Self {
        self.features.publish_now_playing = enabled;
        self
    }

    pub fn position_events(mut self, enabled: bool) -> Self {
        self.features.position_events = enabled;
        self
    }

    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Builds the `CoreConfig`, validating all required fields.
    ///
    /// # Errors
    ///
    /// Returns `Error::CapabilityMissing` when the player factory is absent,
    /// or the source lookup is absent without `desktop-shims`. Returns
    /// `Error::Config` when validation fails.
    pub fn build(self) -> Result<CoreConfig> {
        let players = self.players.ok_or_else(player_factory_missing_error)?;

        let source_lookup = match self.source_lookup {
            Some(lookup) => lookup,
            None => provide_default_source_lookup()?,
        };

        let now_playing = self
            .now_playing
            .unwrap_or_else(provide_default_now_playing);
        let telemetry = self.telemetry.unwrap_or_else(provide_default_telemetry);

        let config = CoreConfig {
            source_lookup,
            players,
            now_playing,
            telemetry,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            features: self.features,
        };

        config.validate()?;
        Ok(config)
    }
}
