//! Workspace placeholder crate.
//!
//! This crate exposes the playback engine and its runtime behind one
//! dependency. Host applications can depend on `mpc-playback` and toggle
//! `desktop-shims` without wiring each crate individually.

pub use core_playback as playback;
pub use core_runtime as runtime;
