//! # MIDI Encoder
//!
//! Serializes an [`EventSet`] into a Standard MIDI File (format 1).
//!
//! ## Layout
//! - Header: parallel (multi-track) format, [`TICKS_PER_QUARTER`] ticks per quarter note
//! - Track 0: conductor track with the time-signature and tempo meta events
//! - One track per generated instrument, named after it, with a program
//!   change for pitched instruments
//!
//! Within a track, events are ordered by tick; at the same tick every
//! note-off comes before any note-on. Every track ends with an end-of-track
//! meta event. Variable-length delta times are written by `midly`.
//!
//! ## Example
//! ```rust
//! use accomp::config::AccompanimentConfig;
//! use accomp::{encode, generate, parse};
//!
//! let score = parse("| C | G7 |").unwrap();
//! let config = AccompanimentConfig::new("bossa");
//! let events = generate(&score, &config).unwrap();
//! let bytes = encode(&events, score.time_signature(), config.tempo).unwrap();
//!
//! assert_eq!(&bytes[0..4], b"MThd");
//! ```

use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};

use crate::error::AccompError;
use crate::generate::{EventSet, Track, TICKS_PER_QUARTER};
use crate::score::TimeSignature;

/// Largest value a delta time can hold.
const MAX_DELTA: u64 = 0x0FFF_FFFF;

/// Largest microseconds-per-quarter value a tempo event can hold.
const MAX_TEMPO: u32 = 0xFF_FFFF;

/// Microseconds per quarter note for a tempo in beats per minute.
///
/// # Errors
/// [`AccompError::InvalidTempo`] if `tempo_bpm` is not a positive number.
pub fn microseconds_per_quarter(tempo_bpm: f64) -> Result<u32, AccompError> {
    if !tempo_bpm.is_finite() || tempo_bpm <= 0.0 {
        return Err(AccompError::InvalidTempo(tempo_bpm));
    }
    let micros = (60_000_000.0 / tempo_bpm).round();
    Ok(micros.clamp(1.0, MAX_TEMPO as f64) as u32)
}

/// One note boundary before delta encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Boundary {
    tick: u64,
    /// 0 for note-off, 1 for note-on, so offs sort first
    order: u8,
    note: u8,
    velocity: u8,
}

fn delta(from: u64, to: u64) -> u28 {
    u28::new(to.saturating_sub(from).min(MAX_DELTA) as u32)
}

fn meta(delta: u28, message: MetaMessage<'static>) -> TrackEvent<'static> {
    TrackEvent {
        delta,
        kind: TrackEventKind::Meta(message),
    }
}

fn conductor_track(
    time_signature: TimeSignature,
    tempo: u32,
    total_ticks: u64,
) -> Vec<TrackEvent<'static>> {
    // Denominator is written as a power of two
    let denominator = time_signature.beat_unit.trailing_zeros() as u8;
    vec![
        meta(
            u28::new(0),
            MetaMessage::TimeSignature(time_signature.beats, denominator, 24, 8),
        ),
        meta(u28::new(0), MetaMessage::Tempo(u24::new(tempo))),
        meta(delta(0, total_ticks), MetaMessage::EndOfTrack),
    ]
}

fn instrument_track(track: &Track, total_ticks: u64) -> Vec<TrackEvent<'static>> {
    let instrument = track.instrument;
    let channel = u4::new(instrument.channel());
    let mut events = vec![meta(
        u28::new(0),
        MetaMessage::TrackName(instrument.name().as_bytes()),
    )];

    if let Some(program) = instrument.program() {
        events.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Midi {
                channel,
                message: MidiMessage::ProgramChange {
                    program: u7::new(program),
                },
            },
        });
    }

    let mut boundaries: Vec<Boundary> = Vec::with_capacity(track.events.len() * 2);
    for event in &track.events {
        boundaries.push(Boundary {
            tick: event.tick,
            order: 1,
            note: event.note,
            velocity: event.velocity,
        });
        boundaries.push(Boundary {
            tick: event.off_tick,
            order: 0,
            note: event.note,
            velocity: 0,
        });
    }
    boundaries.sort();

    let mut last_tick = 0;
    for boundary in boundaries {
        let key = u7::new(boundary.note.min(127));
        let message = if boundary.order == 0 {
            MidiMessage::NoteOff {
                key,
                vel: u7::new(0),
            }
        } else {
            MidiMessage::NoteOn {
                key,
                vel: u7::new(boundary.velocity.min(127)),
            }
        };
        events.push(TrackEvent {
            delta: delta(last_tick, boundary.tick),
            kind: TrackEventKind::Midi { channel, message },
        });
        last_tick = boundary.tick;
    }

    events.push(meta(
        delta(last_tick, total_ticks.max(last_tick)),
        MetaMessage::EndOfTrack,
    ));
    events
}

/// Serialize an EventSet into Standard MIDI File bytes.
///
/// `time_signature` and `tempo_bpm` go into the conductor track; the tick
/// values are taken from `events` unchanged. Encoding the same input twice
/// gives byte-identical output.
///
/// # Errors
/// - [`AccompError::InvalidTempo`] if `tempo_bpm <= 0`
/// - [`AccompError::Encode`] if writing the buffer fails
pub fn encode(
    events: &EventSet,
    time_signature: TimeSignature,
    tempo_bpm: f64,
) -> Result<Vec<u8>, AccompError> {
    let tempo = microseconds_per_quarter(tempo_bpm)?;

    let mut smf = Smf::new(Header::new(
        Format::Parallel,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER as u16)),
    ));
    smf.tracks
        .push(conductor_track(time_signature, tempo, events.total_ticks));
    for track in &events.tracks {
        smf.tracks.push(instrument_track(track, events.total_ticks));
    }

    let mut buffer = Vec::new();
    smf.write_std(&mut buffer)?;
    Ok(buffer)
}
