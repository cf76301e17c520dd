//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the playback core:
//! - Logging and tracing infrastructure
//! - Configuration management (host collaborators and feature flags)
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the playback engine depends on.
//! It establishes the logging conventions, the fail-fast wiring of host
//! bridges, and the event broadcasting mechanism used throughout the system.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
