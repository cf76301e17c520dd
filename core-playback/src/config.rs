//! # Playback Configuration
//!
//! Timing and validation knobs for the playback engine.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Playback engine configuration.
///
/// Controls the progress tick, the fallback deadline for remote loads, and
/// which sources the resolver accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Period of the progress tick.
    ///
    /// Also the resolution of simulated end-of-track detection.
    ///
    /// Default: 100 ms.
    #[serde(default = "default_tick_interval")]
    pub tick_interval: Duration,

    /// How long a remote candidate may stay loading before playback falls
    /// back to the simulated timeline.
    ///
    /// Default: 10 seconds.
    #[serde(default = "default_watchdog_deadline")]
    pub watchdog_deadline: Duration,

    /// Upper bound on the host's remote source lookup. A lookup that takes
    /// longer is treated as "no remote source".
    ///
    /// Default: 3 seconds.
    #[serde(default = "default_remote_lookup_timeout")]
    pub remote_lookup_timeout: Duration,

    /// Upper bound on the host's local bundle lookup.
    ///
    /// Default: 2 seconds.
    #[serde(default = "default_local_lookup_timeout")]
    pub local_lookup_timeout: Duration,

    /// Upper bound on a single control call (play, pause, seek) into a native
    /// player, and on flushing the now-playing relay at shutdown. A call that
    /// takes longer counts as a backend failure.
    ///
    /// Default: 2 seconds.
    #[serde(default = "default_control_timeout")]
    pub control_timeout: Duration,

    /// Lower-case file extensions accepted for remote and local URIs.
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,

    /// Hosts whose URIs are accepted without a recognised extension.
    ///
    /// Subdomains of a listed host match too. Never applied to local files.
    #[serde(default = "default_trusted_hosts")]
    pub trusted_hosts: Vec<String>,

    /// Capacity of the engine's command channel.
    ///
    /// Default: 32.
    #[serde(default = "default_command_buffer")]
    pub command_buffer: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_interval: default_tick_interval(),
            watchdog_deadline: default_watchdog_deadline(),
            remote_lookup_timeout: default_remote_lookup_timeout(),
            local_lookup_timeout: default_local_lookup_timeout(),
            control_timeout: default_control_timeout(),
            allowed_extensions: default_allowed_extensions(),
            trusted_hosts: default_trusted_hosts(),
            command_buffer: default_command_buffer(),
        }
    }
}

impl PlaybackConfig {
    /// Create a configuration that gives up on slow sources quickly.
    ///
    /// - Short watchdog (5s)
    /// - Fast tick (50ms)
    /// - Short lookup timeout (1s)
    pub fn responsive() -> Self {
        Self {
            tick_interval: Duration::from_millis(50),
            watchdog_deadline: Duration::from_secs(5),
            remote_lookup_timeout: Duration::from_secs(1),
            ..Default::default()
        }
    }

    /// Create a configuration for slow or metered networks.
    ///
    /// - Long watchdog (20s)
    /// - Relaxed tick (250ms)
    /// - Long lookup timeout (8s)
    pub fn patient() -> Self {
        Self {
            tick_interval: Duration::from_millis(250),
            watchdog_deadline: Duration::from_secs(20),
            remote_lookup_timeout: Duration::from_secs(8),
            ..Default::default()
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.tick_interval.is_zero() {
            return Err("tick_interval must be > 0".to_string());
        }

        if self.watchdog_deadline.is_zero() {
            return Err("watchdog_deadline must be > 0".to_string());
        }

        if self.watchdog_deadline < self.tick_interval {
            return Err("watchdog_deadline cannot be shorter than tick_interval".to_string());
        }

        if self.remote_lookup_timeout.is_zero() {
            return Err("remote_lookup_timeout must be > 0".to_string());
        }

        if self.local_lookup_timeout.is_zero() {
            return Err("local_lookup_timeout must be > 0".to_string());
        }

        if self.control_timeout.is_zero() {
            return Err("control_timeout must be > 0".to_string());
        }

        if self.allowed_extensions.is_empty() {
            return Err("allowed_extensions cannot be empty".to_string());
        }

        if self.command_buffer == 0 {
            return Err("command_buffer must be > 0".to_string());
        }

        Ok(())
    }

    /// Returns `true` if `ext` is in the allow-list (case-insensitive).
    pub fn is_allowed_extension(&self, ext: &str) -> bool {
        self.allowed_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ext))
    }

    /// Returns `true` if `host` is a trusted host or a subdomain of one.
    pub fn is_trusted_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.trusted_hosts.iter().any(|trusted| {
            let trusted = trusted.to_ascii_lowercase();
            host == trusted || host.ends_with(&format!(".{}", trusted))
        })
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_tick_interval() -> Duration {
    Duration::from_millis(100)
}

fn default_watchdog_deadline() -> Duration {
    Duration::from_secs(10)
}

fn default_remote_lookup_timeout() -> Duration {
    Duration::from_secs(3)
}

fn default_local_lookup_timeout() -> Duration {
    Duration::from_secs(2)
}

fn default_control_timeout() -> Duration {
    Duration::from_secs(2)
}

fn default_allowed_extensions() -> Vec<String> {
    ["mp3", "m4a", "wav", "aiff", "flac", "ogg"]
        .iter()
        .map(|ext| ext.to_string())
        .collect()
}

fn default_trusted_hosts() -> Vec<String> {
    vec![
        "firebasestorage.googleapis.com".to_string(),
        "storage.googleapis.com".to_string(),
    ]
}

fn default_command_buffer() -> usize {
    32
}
