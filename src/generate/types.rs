//! Generated event type definitions
//!
//! This module defines the absolute-time events produced by the engine and
//! consumed by the MIDI encoder.

use serde::Serialize;

use crate::patterns::Style;
use crate::score::TimeSignature;

/// Tick resolution of a quarter note.
pub const TICKS_PER_QUARTER: u32 = 480;

/// Accompaniment instruments, in track order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Instrument {
    Drums,
    Bass,
    Piano,
}

impl Instrument {
    pub const ALL: [Instrument; 3] = [Instrument::Drums, Instrument::Bass, Instrument::Piano];

    /// MIDI channel (0-based). Drums use the General MIDI percussion channel.
    pub const fn channel(self) -> u8 {
        match self {
            Instrument::Drums => 9,
            Instrument::Bass => 0,
            Instrument::Piano => 1,
        }
    }

    /// General MIDI program, or `None` for percussion.
    pub const fn program(self) -> Option<u8> {
        match self {
            Instrument::Drums => None,
            // Acoustic Bass
            Instrument::Bass => Some(32),
            // Acoustic Grand Piano
            Instrument::Piano => Some(0),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Instrument::Drums => "Drums",
            Instrument::Bass => "Bass",
            Instrument::Piano => "Piano",
        }
    }
}

/// A single note with absolute timing.
///
/// `off_tick` is always `tick + duration` and strictly later than `tick`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteEvent {
    pub tick: u64,
    pub channel: u8,
    pub note: u8,
    pub velocity: u8,
    pub duration: u64,
    pub off_tick: u64,
}

impl NoteEvent {
    pub fn new(tick: u64, channel: u8, note: u8, velocity: u8, duration: u64) -> Self {
        Self {
            tick,
            channel,
            note,
            velocity,
            duration,
            off_tick: tick + duration,
        }
    }

    /// Move the note-off earlier, keeping `duration` in step.
    pub(crate) fn end_at(&mut self, off_tick: u64) {
        if off_tick < self.off_tick {
            self.off_tick = off_tick.max(self.tick);
            self.duration = self.off_tick - self.tick;
        }
    }
}

/// All events for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub instrument: Instrument,
    pub events: Vec<NoteEvent>,
}

/// The output of the generation engine.
///
/// # Fields
/// - `ticks_per_quarter`: Resolution used for every tick value
/// - `ticks_per_beat`: Ticks in one beat of the time signature
/// - `total_ticks`: Length of the whole performance, all repeats included
/// - `tracks`: One per enabled instrument, in [`Instrument::ALL`] order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSet {
    pub style: Style,
    pub tempo_bpm: f64,
    pub time_signature: TimeSignature,
    pub ticks_per_quarter: u32,
    pub ticks_per_beat: u32,
    pub total_ticks: u64,
    pub tracks: Vec<Track>,
}

impl EventSet {
    pub fn track(&self, instrument: Instrument) -> Option<&Track> {
        self.tracks.iter().find(|t| t.instrument == instrument)
    }

    /// Every event of every track.
    pub fn events(&self) -> impl Iterator<Item = &NoteEvent> {
        self.tracks.iter().flat_map(|t| t.events.iter())
    }

    pub fn note_count(&self) -> usize {
        self.tracks.iter().map(|t| t.events.len()).sum()
    }
}
