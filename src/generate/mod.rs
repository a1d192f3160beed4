//! # Generation Module
//!
//! Turn a [`Score`](crate::score::Score) into per-instrument note events.
//!
//! ## Purpose
//! The engine walks the Score for every repeat, lays the style's
//! [`PatternTemplate`](crate::patterns::PatternTemplate) over each chord and
//! resolves bass and comping rules against the concrete chord. The result is
//! an [`EventSet`] with absolute tick positions, ready for the MIDI encoder.
//!
//! ## Sub-modules
//! - `types` - EventSet, Track, NoteEvent and Instrument definitions
//! - `voicing` - Chord-tone resolution (bass tones, walking, comping voicings)
//! - `engine` - Main generation loop and overlap resolution
//!
//! ## Entry Point
//! [`generate()`] - Score plus settings to EventSet
//!
//! ## Guarantees
//! - Deterministic: identical inputs give identical events in identical order
//! - Every note-off is strictly later than its note-on
//! - The same note never sounds twice at once on one channel
//! - Velocities are scaled by the instrument's volume and clamped to 0..=127;
//!   notes that scale to 0 are dropped
//! - Bass and comping notes end with their chord; everything ends with the
//!   final repeat
//!
//! ## Related Modules
//! - `patterns` - Style templates
//! - `midi` - Serializes the EventSet

mod engine;
mod types;
mod voicing;


pub use engine::generate;
pub use types::{EventSet, Instrument, NoteEvent, Track, TICKS_PER_QUARTER};
pub use voicing::{bass_note, bass_root, comp_notes, BASS_OCTAVE_BASE, COMP_OCTAVE_BASE};
