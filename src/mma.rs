//! Script output for the external groove generator.
//!
//! [`to_mma_script`] renders a Score and its generation settings as an MMA
//! (Musical MIDI Accompaniment) script. The crate never runs MMA itself; an
//! [`ExternalGenerator`](crate::api::ExternalGenerator) implementation can
//! hand this script to it.

use crate::chord::{Chord, Quality};
use crate::config::AccompanimentConfig;
use crate::patterns::Style;
use crate::score::Score;

/// Convert a Score to an MMA script
pub fn to_mma_script(score: &Score, config: &AccompanimentConfig) -> String {
    let metadata = score.metadata();
    let mut script = String::new();

    // Header
    script.push_str("// Generated by accomp\n");
    script.push_str(&format!("// {}\n", metadata.title));
    if let Some(composer) = &metadata.composer {
        script.push_str(&format!("// {}\n", composer));
    }
    script.push('\n');

    script.push_str(&format!("Tempo {}\n", config.tempo));
    script.push_str(&format!("TimeSig {}\n", metadata.time_signature));
    if let Some(key) = &metadata.key {
        let mode = if key.minor { "Minor" } else { "Major" };
        script.push_str(&format!("KeySig {} {}\n", key.tonic, mode));
    }
    script.push('\n');

    script.push_str(&format!("Groove {}\n", groove_name(config.resolved_style())));
    script.push('\n');

    // Volume adjustments, enabled instruments only
    let toggles = config.instruments;
    let volumes = config.volumes;
    let levels = [
        ("Drum", toggles.drums, volumes.drums),
        ("Bass", toggles.bass, volumes.bass),
        ("Chord", toggles.piano, volumes.piano),
    ];
    let mut any_volume = false;
    for (track, enabled, volume) in levels {
        if enabled {
            script.push_str(&format!("{}Volume {}\n", track, percent(volume)));
            any_volume = true;
        }
    }
    if any_volume {
        script.push('\n');
    }

    // Numbered bars
    for (i, bar) in score.bars().iter().enumerate() {
        let chords: Vec<String> = bar.iter().map(|entry| mma_chord(&entry.chord)).collect();
        script.push_str(&format!("{} {}\n", i + 1, chords.join(" ")));
    }

    if config.repeats > 1 {
        script.push('\n');
        script.push_str(&format!("Repeat {}\n", config.repeats));
    }

    script
}

/// MMA library groove for a style.
pub fn groove_name(style: Style) -> &'static str {
    match style {
        Style::Swing => "Swing",
        Style::Bossa => "BossaNova",
        Style::Rock => "Rock",
        Style::Funk => "Funk",
        Style::Ballad => "Ballad",
        Style::Latin => "Latin",
        Style::Waltz => "Waltz",
        Style::Blues => "Blues",
    }
}

fn percent(volume: f64) -> i64 {
    let value = (volume * 100.0).round();
    if value.is_nan() {
        0
    } else {
        value.max(0.0) as i64
    }
}

/// Spell a chord the way MMA reads it (`Cm7`, `Cmaj7`, `Cm7b5`, `Cdim7`).
pub fn mma_chord(chord: &Chord) -> String {
    let first = chord.extensions.first().map(String::as_str);
    let compact = match (chord.quality, first) {
        (Quality::Major7, Some(n @ ("9" | "11" | "13"))) => Some(format!("maj{}", n)),
        (Quality::Minor7, Some(n @ ("9" | "11" | "13"))) => Some(format!("m{}", n)),
        (Quality::Dominant7, Some(n @ ("9" | "11" | "13"))) => Some(n.to_string()),
        (Quality::Suspended4, Some(n @ ("7" | "9"))) => Some(format!("{}sus4", n)),
        (Quality::Augmented, Some("7")) => Some("aug7".to_string()),
        _ => None,
    };
    let (quality, absorbed) = match compact {
        Some(spelling) => (spelling, 1),
        None => (quality_name(chord.quality).to_string(), 0),
    };

    let rest = chord.extensions[absorbed..].concat();
    // Bare extensions on a major triad would read as part of the root or as
    // a dominant chord
    let ambiguous = quality.is_empty()
        && (rest.starts_with(|c: char| matches!(c, 'b' | '#' | '♭' | '♯' | '-' | '+'))
            || ["7", "9", "11", "13"].iter().any(|n| rest.starts_with(n)));

    let mut symbol = format!("{}{}", chord.root, quality);
    if ambiguous {
        symbol.push('(');
        symbol.push_str(&rest);
        symbol.push(')');
    } else {
        symbol.push_str(&rest);
    }
    if let Some(bass) = &chord.bass {
        symbol.push('/');
        symbol.push_str(&bass.to_string());
    }
    symbol
}

fn quality_name(quality: Quality) -> &'static str {
    match quality {
        Quality::Major => "",
        Quality::Minor => "m",
        Quality::Dominant7 => "7",
        Quality::Major7 => "maj7",
        Quality::Minor7 => "m7",
        Quality::Diminished => "dim",
        Quality::Diminished7 => "dim7",
        Quality::HalfDiminished => "m7b5",
        Quality::Augmented => "aug",
        Quality::Suspended4 => "sus4",
        Quality::Suspended2 => "sus2",
    }
}
