//! # Motif
//!
//! A line-oriented live-coding tool for MIDI: build short note patterns, reshape
//! them with transforms and play them to a MIDI output port in the background
//! while the prompt stays responsive.
//!
//! ## Modules
//!
//! - `commands`: the command table, argument parsing and the typed handlers
//!   that run each command against the session and player.
//! - `midi`: wire messages, port selection and the [`midi::OutputSink`]
//!   abstraction over a real MIDI port or an in-memory recorder.
//! - `playback`: the [`playback::Player`] and its timing worker thread.
//! - `repl`: the interactive prompt and the script runner.
//!
//! Patterns, notes, transforms and session state live in `motif-core`.

pub mod commands;
pub mod midi;
pub mod playback;
pub mod repl;

pub use crate::commands::{create_registry, Command, CommandContext, CommandResult};
pub use crate::midi::{MemorySink, MidiOutputSink, OutputSink, PortSelector};
pub use crate::playback::{PlaybackError, Player};
