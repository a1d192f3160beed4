//! Accompaniment generation engine
//!
//! Walks the Score entry by entry for every repeat and instantiates the
//! style template against each chord, producing absolute-tick events.

use num_traits::Zero;

use crate::chord::Chord;
use crate::config::AccompanimentConfig;
use crate::error::AccompError;
use crate::patterns::{PatternTemplate, Rule};
use crate::score::{Beats, Entry, Score};

use super::types::{EventSet, Instrument, NoteEvent, Track, TICKS_PER_QUARTER};
use super::voicing::{bass_note, comp_notes};

fn to_ticks(beats: Beats, ticks_per_beat: u32) -> u64 {
    let ticks = (beats * Beats::from_integer(ticks_per_beat as i64)).round().to_integer();
    ticks.max(0) as u64
}

/// Scale a template velocity, clamped to 0..=127.
pub(crate) fn scale_velocity(velocity: u8, scalar: f64) -> u8 {
    let scaled = (velocity as f64 * scalar).round();
    if scaled.is_nan() {
        0
    } else {
        scaled.clamp(0.0, 127.0) as u8
    }
}

/// Raw events collected per instrument before overlaps are resolved.
struct Collector<'a> {
    config: &'a AccompanimentConfig,
    ticks_per_beat: u32,
    drums: Vec<NoteEvent>,
    bass: Vec<NoteEvent>,
    piano: Vec<NoteEvent>,
}

impl<'a> Collector<'a> {
    fn new(config: &'a AccompanimentConfig, ticks_per_beat: u32) -> Self {
        Self {
            config,
            ticks_per_beat,
            drums: Vec::new(),
            bass: Vec::new(),
            piano: Vec::new(),
        }
    }

    fn push(
        &mut self,
        instrument: Instrument,
        notes: &[u8],
        start: Beats,
        end: Beats,
        velocity: u8,
    ) {
        let scalar = match instrument {
            Instrument::Drums => self.config.volumes.drums,
            Instrument::Bass => self.config.volumes.bass,
            Instrument::Piano => self.config.volumes.piano,
        };
        let velocity = scale_velocity(velocity, scalar);
        let tick = to_ticks(start, self.ticks_per_beat);
        let off_tick = to_ticks(end, self.ticks_per_beat);
        if velocity == 0 || off_tick <= tick {
            return;
        }

        let events = match instrument {
            Instrument::Drums => &mut self.drums,
            Instrument::Bass => &mut self.bass,
            Instrument::Piano => &mut self.piano,
        };
        for &note in notes {
            events.push(NoteEvent::new(
                tick,
                instrument.channel(),
                note,
                velocity,
                off_tick - tick,
            ));
        }
    }

    /// Instantiate every rule of `template` that starts inside `entry`.
    ///
    /// The template is laid out once per bar of the score's time signature,
    /// starting at the entry's own start.
    fn emit_entry(
        &mut self,
        template: &PatternTemplate,
        bar_length: Beats,
        cursor: Beats,
        entry: &Entry,
        next: &Chord,
    ) {
        let toggles = self.config.instruments;
        let entry_end = cursor + entry.duration;
        let mut bar_start = Beats::zero();

        while bar_start < entry.duration {
            for rule in template.rules() {
                if rule.offset() >= bar_length {
                    continue;
                }
                let offset = bar_start + template.feel.place(rule.offset());
                if offset >= entry.duration {
                    continue;
                }
                let start = cursor + offset;
                let end = start + rule.length();

                match rule {
                    Rule::Drum(hit) => {
                        if toggles.drums {
                            let notes = [hit.voice.note()];
                            self.push(Instrument::Drums, &notes, start, end, hit.velocity);
                        }
                    }
                    Rule::Bass(note) => {
                        if toggles.bass {
                            let notes = [bass_note(&entry.chord, next, note.tone)];
                            let end = end.min(entry_end);
                            self.push(Instrument::Bass, &notes, start, end, note.velocity);
                        }
                    }
                    Rule::Comp(hit) => {
                        if toggles.piano {
                            let notes = comp_notes(&entry.chord, hit.voicing);
                            let end = end.min(entry_end);
                            self.push(Instrument::Piano, &notes, start, end, hit.velocity);
                        }
                    }
                }
            }
            bar_start += bar_length;
        }
    }

    fn into_tracks(self, total_ticks: u64) -> Vec<Track> {
        let toggles = self.config.instruments;
        let mut tracks = Vec::new();
        if toggles.drums {
            tracks.push(finish_track(Instrument::Drums, self.drums, total_ticks));
        }
        if toggles.bass {
            tracks.push(finish_track(Instrument::Bass, self.bass, total_ticks));
        }
        if toggles.piano {
            tracks.push(finish_track(Instrument::Piano, self.piano, total_ticks));
        }
        tracks
    }
}

/// Sort, merge and de-overlap one instrument's events.
///
/// - Events are ordered by tick, then note, then loudest first
/// - Hits of the same note at the same tick merge into the loudest (longest on ties)
/// - A note still sounding when the same note starts again is cut there
/// - Nothing sounds past `total_ticks`
fn finish_track(instrument: Instrument, mut events: Vec<NoteEvent>, total_ticks: u64) -> Track {
    events.sort_by(|a, b| {
        a.tick
            .cmp(&b.tick)
            .then(a.note.cmp(&b.note))
            .then(b.velocity.cmp(&a.velocity))
            .then(b.duration.cmp(&a.duration))
    });
    events.dedup_by(|later, kept| later.tick == kept.tick && later.note == kept.note);

    let mut open: [Option<usize>; 128] = [None; 128];
    for i in 0..events.len() {
        let note = events[i].note as usize;
        if let Some(prev) = open[note] {
            let tick = events[i].tick;
            events[prev].end_at(tick);
        }
        open[note] = Some(i);
    }

    for event in events.iter_mut() {
        event.end_at(total_ticks);
    }
    events.retain(|e| e.off_tick > e.tick);

    Track { instrument, events }
}

/// Generate accompaniment events for a Score.
///
/// The style, tempo, repeats, instrument toggles and volume scalars all come
/// from `config`. Unknown style names play as swing.
///
/// # Errors
/// - [`AccompError::InvalidRepeats`] if `config.repeats < 1`
/// - [`AccompError::InvalidTempo`] if `config.tempo <= 0`
///
/// # Example
/// ```rust
/// use accomp::config::AccompanimentConfig;
/// use accomp::generate::{generate, Instrument};
/// use accomp::parse;
///
/// let score = parse("| C | Am | F | G |").unwrap();
/// let events = generate(&score, &AccompanimentConfig::new("rock")).unwrap();
///
/// assert_eq!(events.tracks.len(), 3);
/// assert_eq!(events.total_ticks, 4 * 4 * 480);
/// let bass = events.track(Instrument::Bass).unwrap();
/// assert_eq!(bass.events[0].note % 12, 0);
/// ```
pub fn generate(score: &Score, config: &AccompanimentConfig) -> Result<EventSet, AccompError> {
    config.validate()?;

    let style = config.resolved_style();
    let template = style.template();
    let time_signature = score.time_signature();
    let ticks_per_beat = time_signature.ticks_per_beat(TICKS_PER_QUARTER);
    let bar_length = time_signature.bar_length();

    let entries = score.entries();
    let mut collector = Collector::new(config, ticks_per_beat);
    let mut cursor = Beats::zero();

    for _ in 0..config.repeats {
        for (i, entry) in entries.iter().enumerate() {
            // The last chord walks back to the top of the form
            let next = &entries[(i + 1) % entries.len()].chord;
            collector.emit_entry(template, bar_length, cursor, entry, next);
            cursor += entry.duration;
        }
    }

    let total_ticks = to_ticks(cursor, ticks_per_beat);
    Ok(EventSet {
        style,
        tempo_bpm: config.tempo,
        time_signature,
        ticks_per_quarter: TICKS_PER_QUARTER,
        ticks_per_beat,
        total_ticks,
        tracks: collector.into_tracks(total_ticks),
    })
}
