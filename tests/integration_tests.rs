//! Integration tests for the accompaniment compiler
//!
//! Tests the full pipeline from chart text to Standard MIDI File bytes.

use std::collections::HashMap;

use accomp::config::{AccompanimentConfig, VolumeScalars};
use accomp::generate::Instrument;
use accomp::score::{ensure_score, Metadata};
use accomp::{compile, encode, generate, parse, parse_chord, Beats, Chord, Quality};
use midly::num::u24;
use midly::{MetaMessage, MidiMessage, Smf, TrackEventKind};

/// Absolute-tick note boundaries of one track: (tick, is_on, channel, key, velocity).
fn note_events(track: &[midly::TrackEvent]) -> Vec<(u64, bool, u8, u8, u8)> {
    let mut tick = 0u64;
    let mut out = Vec::new();
    for event in track {
        tick += event.delta.as_int() as u64;
        if let TrackEventKind::Midi { channel, message } = event.kind {
            match message {
                MidiMessage::NoteOn { key, vel } => {
                    out.push((tick, true, channel.as_int(), key.as_int(), vel.as_int()))
                }
                MidiMessage::NoteOff { key, vel } => {
                    out.push((tick, false, channel.as_int(), key.as_int(), vel.as_int()))
                }
                _ => {}
            }
        }
    }
    out
}

/// Every note-on has exactly one later note-off and no note is opened twice.
fn assert_notes_paired(bytes: &[u8]) {
    let smf = Smf::parse(bytes).unwrap();
    for track in &smf.tracks {
        let mut open: HashMap<(u8, u8), u64> = HashMap::new();
        for (tick, is_on, channel, key, _) in note_events(track) {
            if is_on {
                assert!(
                    open.insert((channel, key), tick).is_none(),
                    "note {} on channel {} opened twice at tick {}",
                    key,
                    channel,
                    tick
                );
            } else {
                let start = open.remove(&(channel, key));
                assert!(start.is_some(), "note-off without note-on at tick {}", tick);
                assert!(start.unwrap() < tick);
            }
        }
        assert!(open.is_empty(), "notes left sounding: {:?}", open);
    }
}

#[test]
fn test_rock_progression_end_to_end() {
    let score = parse("| C | Am | F | G |").unwrap();
    assert_eq!(score.len(), 4);
    assert!(score.iter().all(|e| e.duration == Beats::from_integer(4)));
    assert_eq!(score.time_signature().to_string(), "4/4");

    let config = AccompanimentConfig::new("rock").with_tempo(120.0);
    let events = generate(&score, &config).unwrap();

    let bass = events.track(Instrument::Bass).unwrap();
    assert_eq!(bass.events[0].note % 12, 0);
    for bar in 0..4u64 {
        let start = bar * 1920;
        let end = start + 1920;
        for track in &events.tracks {
            assert!(
                track.events.iter().any(|e| e.tick >= start && e.tick < end),
                "{} silent in bar {}",
                track.instrument.name(),
                bar + 1
            );
        }
    }

    let bytes = encode(&events, score.time_signature(), config.tempo).unwrap();
    assert_eq!(&bytes[0..4], b"MThd");
    assert_eq!(&bytes[14..18], b"MTrk");

    let smf = Smf::parse(&bytes).unwrap();
    // Conductor plus drums, bass and piano
    assert_eq!(smf.tracks.len(), 4);
    assert!(smf.tracks[0]
        .iter()
        .any(|e| e.kind == TrackEventKind::Meta(MetaMessage::Tempo(u24::new(500_000)))));
    assert_notes_paired(&bytes);
}

#[test]
fn test_compile_matches_manual_pipeline() {
    let source = "| Dm7 G7 | C^7 |";
    let config = AccompanimentConfig::new("swing").with_tempo(160.0);

    let score = parse(source).unwrap();
    let events = generate(&score, &config).unwrap();
    let manual = encode(&events, score.time_signature(), config.tempo).unwrap();

    assert_eq!(compile(source, &config).unwrap(), manual);
}

#[test]
fn test_repeat_sign_inherits_previous_bar() {
    let score = parse("| Dm7 | G7 | % |").unwrap();
    assert_eq!(score.len(), 3);
    assert_eq!(score.entries()[2].chord, score.entries()[1].chord);
    assert_eq!(score.entries()[2].chord.to_string(), "G7");
}

#[test]
fn test_half_diminished_normalization() {
    let chord = parse_chord("Cm7b5").unwrap();
    assert_eq!(chord.root.pitch_class(), 0);
    assert_eq!(chord.quality, Quality::HalfDiminished);
    assert!(chord.extensions.is_empty());
    assert!(chord.bass.is_none());
}

#[test]
fn test_normalization_is_idempotent() {
    let spellings = [
        "C", "Cm", "C-", "Cmin", "C7", "Cmaj7", "CΔ7", "C^7", "Cm7", "C-7", "Cmin7", "Cm7b5",
        "Cø7", "Ch7", "Cdim", "Co", "Cdim7", "Co7", "Caug", "C+", "Csus", "Csus4", "Csus2",
        "C9", "C13", "C7b9", "C7#11", "Cmaj9", "Cm11", "C6", "Cm6", "Cadd9", "C7alt", "Bb7/Ab",
        "F#m7b5", "Ebmaj7#11", "G7sus4", "Db^7/F", "A-7(b5)", "E7#9", "C+7", "C(#11)", "C(b9)",
        "C(b5)", "C(b13)/E", "C7(b)9",
    ];
    for spelling in spellings {
        let once = parse_chord(spelling).unwrap();
        let twice: Chord = once.to_string().parse().unwrap();
        assert_eq!(once, twice, "{} -> {}", spelling, once);
        assert_eq!(once.to_string(), twice.to_string());
    }
}

#[test]
fn test_bar_count_survives_parsing() {
    let charts = [
        ("| C | F | G | C |", 4),
        ("| Dm7 G7 | C^7 | Em7 A7 Dm7 | G7 |", 4),
        ("| C | % | F G | % |", 4),
        ("C F G C Am", 5),
    ];
    for (chart, bars) in charts {
        let score = parse(chart).unwrap();
        assert_eq!(score.bars().len(), bars, "{}", chart);
    }
}

#[test]
fn test_single_bar_with_repeats() {
    let score = parse("| C |").unwrap();
    assert_eq!(score.len(), 1);

    let config = AccompanimentConfig::new("swing").with_repeats(3);
    let events = generate(&score, &config).unwrap();
    assert_eq!(events.total_ticks, 3 * 1920);

    // Notes at the repeat boundary do not overlap
    for track in &events.tracks {
        for (i, a) in track.events.iter().enumerate() {
            for b in &track.events[i + 1..] {
                if a.note == b.note {
                    assert!(b.tick >= a.off_tick);
                }
            }
        }
    }

    let bytes = encode(&events, score.time_signature(), config.tempo).unwrap();
    assert_notes_paired(&bytes);
}

#[test]
fn test_output_is_deterministic() {
    let source = "| F7 | Bb7 | F7 | Cm7 F7 | Bb7 | Bdim7 | F7 | D7 | Gm7 | C7 | F7 D7 | Gm7 C7 |";
    for style in ["swing", "bossa", "funk", "ballad", "latin", "blues"] {
        let config = AccompanimentConfig::new(style).with_repeats(2);
        assert_eq!(
            compile(source, &config).unwrap(),
            compile(source, &config).unwrap(),
            "{}",
            style
        );
    }
}

#[test]
fn test_velocity_bounds_after_scaling() {
    let config = AccompanimentConfig::new("funk").with_volumes(VolumeScalars {
        drums: 3.0,
        bass: -2.0,
        piano: 1.0,
    });
    let bytes = compile("| E7 | A7 |", &config).unwrap();
    let smf = Smf::parse(&bytes).unwrap();

    for track in &smf.tracks {
        for (_, is_on, channel, _, velocity) in note_events(track) {
            if is_on {
                assert!(velocity >= 1 && velocity <= 127);
                // The bass scales to zero and never plays
                assert_ne!(channel, Instrument::Bass.channel());
            }
        }
    }
    assert_notes_paired(&bytes);
}

#[test]
fn test_empty_and_bad_input() {
    let config = AccompanimentConfig::default();
    assert!(matches!(
        compile("| |", &config),
        Err(accomp::AccompError::EmptyProgression)
    ));
    match compile("| C | Hmaj7 |", &config) {
        Err(accomp::AccompError::UnparsableChord { token, .. }) => assert_eq!(token, "Hmaj7"),
        other => panic!("unexpected: {:?}", other),
    }
    assert!(matches!(
        compile("| C |", &config.clone().with_repeats(0)),
        Err(accomp::AccompError::InvalidRepeats(0))
    ));
    assert!(matches!(
        compile("| C |", &config.with_tempo(0.0)),
        Err(accomp::AccompError::InvalidTempo(_))
    ));
}

#[test]
fn test_unknown_style_falls_back() {
    let chart = "| C | G7 |";
    let unknown = compile(chart, &AccompanimentConfig::new("zydeco")).unwrap();
    let swing = compile(chart, &AccompanimentConfig::new("swing")).unwrap();
    assert_eq!(unknown, swing);
}

#[test]
fn test_ireal_link_to_midi() {
    let url = "irealbook://Blue%20Bossa=Dorham%20Kenny=Bossa%20Nova=C-=n=\
               {*AT44C-7 |F-7 |Dh7 |G7b9 |C-7 |x |Ebh7 |Ab7 Z";
    let config = AccompanimentConfig::new("bossa");
    let bytes = compile(url, &config).unwrap();
    assert_notes_paired(&bytes);

    let score = ensure_score(url, Metadata::default()).unwrap();
    assert_eq!(score.title(), "Blue Bossa");
    let events = generate(&score, &config).unwrap();
    assert_eq!(events.total_ticks, 7 * 1920);
}

#[test]
fn test_waltz_time_signature_in_file() {
    let source = r#"---
title: Someday
time-signature: 3/4
---
| Bb^7 | G7 | C-7 | F7 |
"#;
    let bytes = compile(source, &AccompanimentConfig::new("waltz")).unwrap();
    let smf = Smf::parse(&bytes).unwrap();
    assert!(smf.tracks[0]
        .iter()
        .any(|e| e.kind == TrackEventKind::Meta(MetaMessage::TimeSignature(3, 2, 24, 8))));
    assert_notes_paired(&bytes);
}

#[test]
fn test_json_serialization_of_events() {
    let events = generate(&parse("| C |").unwrap(), &AccompanimentConfig::new("rock")).unwrap();
    let json = serde_json::to_value(&events).unwrap();

    assert_eq!(json["style"], "rock");
    assert_eq!(json["ticksPerQuarter"], 480);
    assert_eq!(json["totalTicks"], 1920);
    assert_eq!(json["tracks"][0]["instrument"], "drums");
    assert!(json["tracks"][1]["events"][0]["offTick"].is_u64());
}
