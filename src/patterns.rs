//! # Pattern Library
//!
//! Static, read-only style templates. A [`PatternTemplate`] describes one bar
//! of drums, bass and comping for a style, independent of any chord.
//!
//! ## Rule kinds
//! Every rule is one variant of [`Rule`]:
//! - [`DrumHit`]: a percussion voice at an offset, with velocity and length
//! - [`BassNote`]: a [`ToneSelector`] resolved against the chord at generation time
//! - [`CompHit`]: a [`Voicing`] of the chord at an offset
//!
//! ## Timing
//! Offsets and lengths are stored in twelfths of a beat so that straight
//! eighths, sixteenths and triplets are all exact. Templates with
//! [`Feel::Swing`] are written straight; the engine moves every offset that
//! falls on an off-beat eighth (`x.5`) to the triplet position `x + 2/3`.
//!
//! ## Lookup
//! [`lookup`] never fails: unknown style names fall back to swing. Use
//! [`Style::from_name`] to find out whether a name is known.
//!
//! ```rust
//! use accomp::patterns::{lookup, Style};
//!
//! assert_eq!(lookup("bossa").style, Style::Bossa);
//! assert_eq!(lookup("polka").style, Style::Swing);
//! assert_eq!(Style::from_name("polka"), None);
//! ```

use std::fmt;

use serde::Serialize;

use crate::score::Beats;

/// Subdivisions per beat used by template offsets and lengths.
pub const TWELFTHS_PER_BEAT: i64 = 12;

/// General MIDI percussion voices used by the templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DrumVoice {
    Kick,
    SideStick,
    Snare,
    ClosedHiHat,
    PedalHiHat,
    LowTom,
    OpenHiHat,
    MidTom,
    Crash,
    HighTom,
    Ride,
    RideBell,
    Cowbell,
    Shaker,
    Claves,
}

impl DrumVoice {
    /// Fixed General MIDI note number on the percussion channel.
    pub const fn note(self) -> u8 {
        match self {
            DrumVoice::Kick => 36,
            DrumVoice::SideStick => 37,
            DrumVoice::Snare => 38,
            DrumVoice::ClosedHiHat => 42,
            DrumVoice::PedalHiHat => 44,
            DrumVoice::LowTom => 45,
            DrumVoice::OpenHiHat => 46,
            DrumVoice::MidTom => 47,
            DrumVoice::Crash => 49,
            DrumVoice::HighTom => 50,
            DrumVoice::Ride => 51,
            DrumVoice::RideBell => 53,
            DrumVoice::Cowbell => 56,
            DrumVoice::Shaker => 70,
            DrumVoice::Claves => 75,
        }
    }

    pub const ALL: [DrumVoice; 15] = [
        DrumVoice::Kick,
        DrumVoice::SideStick,
        DrumVoice::Snare,
        DrumVoice::ClosedHiHat,
        DrumVoice::PedalHiHat,
        DrumVoice::LowTom,
        DrumVoice::OpenHiHat,
        DrumVoice::MidTom,
        DrumVoice::Crash,
        DrumVoice::HighTom,
        DrumVoice::Ride,
        DrumVoice::RideBell,
        DrumVoice::Cowbell,
        DrumVoice::Shaker,
        DrumVoice::Claves,
    ];
}

/// Which chord tone a bass note plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ToneSelector {
    Root,
    Third,
    Fifth,
    /// Perfect fourth above the root
    Fourth,
    /// Major sixth above the root
    Sixth,
    /// A semitone before the next chord's root, on the side we walk from
    Approach,
    /// N-th chord tone above (or below) the root, walking toward the next root
    WalkStep(u8),
}

/// Which chord tones a comping hit stacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Voicing {
    /// Root, third, fifth, seventh and extensions
    Full,
    /// Root and seventh (fifth when the chord has no seventh)
    Shell,
    /// Root, third and fifth
    Triad,
    /// A single tone of the full voicing, counted from the bottom and wrapping
    Tone(usize),
}

/// Rhythmic feel of a style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Feel {
    Straight,
    /// Off-beat eighths are delayed to the last triplet of the beat
    Swing,
}

impl Feel {
    /// Place a straight offset according to the feel.
    pub fn place(self, offset: Beats) -> Beats {
        match self {
            Feel::Straight => offset,
            Feel::Swing if offset.fract() == Beats::new(1, 2) => {
                offset.trunc() + Beats::new(2, 3)
            }
            Feel::Swing => offset,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrumHit {
    pub voice: DrumVoice,
    pub at: u16,
    pub velocity: u8,
    pub length: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BassNote {
    pub at: u16,
    pub length: u16,
    pub tone: ToneSelector,
    pub velocity: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompHit {
    pub at: u16,
    pub length: u16,
    pub velocity: u8,
    pub voicing: Voicing,
}

/// One template rule. The engine matches these exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Drum(DrumHit),
    Bass(BassNote),
    Comp(CompHit),
}

impl Rule {
    /// Offset from the start of the bar.
    pub fn offset(&self) -> Beats {
        let at = match self {
            Rule::Drum(hit) => hit.at,
            Rule::Bass(note) => note.at,
            Rule::Comp(hit) => hit.at,
        };
        Beats::new(at as i64, TWELFTHS_PER_BEAT)
    }

    pub fn length(&self) -> Beats {
        let length = match self {
            Rule::Drum(hit) => hit.length,
            Rule::Bass(note) => note.length,
            Rule::Comp(hit) => hit.length,
        };
        Beats::new(length as i64, TWELFTHS_PER_BEAT)
    }

    pub fn velocity(&self) -> u8 {
        match self {
            Rule::Drum(hit) => hit.velocity,
            Rule::Bass(note) => note.velocity,
            Rule::Comp(hit) => hit.velocity,
        }
    }
}

/// One bar of drums, bass and comping for a style.
#[derive(Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternTemplate {
    pub style: Style,
    pub feel: Feel,
    pub beats_per_bar: u8,
    pub drums: &'static [DrumHit],
    pub bass: &'static [BassNote],
    pub comping: &'static [CompHit],
}

impl PatternTemplate {
    /// All rules: drums first, then bass, then comping, each in table order.
    pub fn rules(&self) -> impl Iterator<Item = Rule> + '_ {
        self.drums
            .iter()
            .copied()
            .map(Rule::Drum)
            .chain(self.bass.iter().copied().map(Rule::Bass))
            .chain(self.comping.iter().copied().map(Rule::Comp))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Style {
    #[default]
    Swing,
    Bossa,
    Rock,
    Funk,
    Ballad,
    Latin,
    Waltz,
    Blues,
}

impl Style {
    pub const ALL: [Style; 8] = [
        Style::Swing,
        Style::Bossa,
        Style::Rock,
        Style::Funk,
        Style::Ballad,
        Style::Latin,
        Style::Waltz,
        Style::Blues,
    ];

    /// Case-insensitive lookup of a style name.
    pub fn from_name(name: &str) -> Option<Style> {
        match name.trim().to_ascii_lowercase().as_str() {
            "swing" | "jazz" => Some(Style::Swing),
            "bossa" | "bossa nova" | "bossanova" => Some(Style::Bossa),
            "rock" => Some(Style::Rock),
            "funk" => Some(Style::Funk),
            "ballad" => Some(Style::Ballad),
            "latin" => Some(Style::Latin),
            "waltz" => Some(Style::Waltz),
            "blues" | "shuffle" => Some(Style::Blues),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Style::Swing => "swing",
            Style::Bossa => "bossa",
            Style::Rock => "rock",
            Style::Funk => "funk",
            Style::Ballad => "ballad",
            Style::Latin => "latin",
            Style::Waltz => "waltz",
            Style::Blues => "blues",
        }
    }

    pub fn template(self) -> &'static PatternTemplate {
        match self {
            Style::Swing => &SWING,
            Style::Bossa => &BOSSA,
            Style::Rock => &ROCK,
            Style::Funk => &FUNK,
            Style::Ballad => &BALLAD,
            Style::Latin => &LATIN,
            Style::Waltz => &WALTZ,
            Style::Blues => &BLUES,
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Template for a style name. Unknown names get the swing template.
pub fn lookup(style: &str) -> &'static PatternTemplate {
    Style::from_name(style).unwrap_or_default().template()
}

use DrumVoice::*;

const DRUM_LENGTH: u16 = 3;

const fn drum(voice: DrumVoice, at: u16, velocity: u8) -> DrumHit {
    DrumHit {
        voice,
        at,
        velocity,
        length: DRUM_LENGTH,
    }
}

const fn bass(at: u16, tone: ToneSelector, length: u16, velocity: u8) -> BassNote {
    BassNote {
        at,
        length,
        tone,
        velocity,
    }
}

const fn comp(at: u16, length: u16, velocity: u8, voicing: Voicing) -> CompHit {
    CompHit {
        at,
        length,
        velocity,
        voicing,
    }
}

// Offsets and lengths below are in twelfths of a beat:
// 12 = one beat, 6 = an eighth, 3 = a sixteenth, 8 = two triplets.

static SWING: PatternTemplate = PatternTemplate {
    style: Style::Swing,
    feel: Feel::Swing,
    beats_per_bar: 4,
    drums: &[
        drum(Ride, 0, 90),
        drum(Ride, 12, 70),
        drum(Ride, 18, 55),
        drum(Ride, 24, 85),
        drum(Ride, 36, 70),
        drum(Ride, 42, 55),
        drum(PedalHiHat, 12, 80),
        drum(PedalHiHat, 36, 80),
    ],
    bass: &[
        bass(0, ToneSelector::Root, 11, 100),
        bass(12, ToneSelector::WalkStep(1), 11, 90),
        bass(24, ToneSelector::WalkStep(2), 11, 95),
        bass(36, ToneSelector::Approach, 11, 85),
    ],
    comping: &[
        comp(18, 5, 75, Voicing::Full),
        comp(42, 5, 80, Voicing::Shell),
    ],
};

static BOSSA: PatternTemplate = PatternTemplate {
    style: Style::Bossa,
    feel: Feel::Straight,
    beats_per_bar: 4,
    drums: &[
        drum(SideStick, 0, 70),
        drum(SideStick, 24, 65),
        drum(ClosedHiHat, 0, 60),
        drum(ClosedHiHat, 6, 40),
        drum(ClosedHiHat, 12, 50),
        drum(ClosedHiHat, 18, 40),
        drum(ClosedHiHat, 24, 60),
        drum(ClosedHiHat, 30, 40),
        drum(ClosedHiHat, 36, 50),
        drum(ClosedHiHat, 42, 40),
        drum(Kick, 0, 80),
        drum(Kick, 18, 70),
        drum(Kick, 36, 75),
    ],
    bass: &[
        bass(0, ToneSelector::Root, 16, 90),
        bass(18, ToneSelector::Fifth, 10, 75),
        bass(30, ToneSelector::Root, 16, 85),
    ],
    comping: &[
        comp(0, 4, 70, Voicing::Full),
        comp(18, 4, 65, Voicing::Full),
        comp(30, 4, 70, Voicing::Full),
        comp(42, 4, 60, Voicing::Full),
    ],
};

static ROCK: PatternTemplate = PatternTemplate {
    style: Style::Rock,
    feel: Feel::Straight,
    beats_per_bar: 4,
    drums: &[
        drum(Kick, 0, 110),
        drum(Kick, 24, 105),
        drum(Snare, 12, 100),
        drum(Snare, 36, 100),
        drum(ClosedHiHat, 0, 80),
        drum(ClosedHiHat, 6, 60),
        drum(ClosedHiHat, 12, 80),
        drum(ClosedHiHat, 18, 60),
        drum(ClosedHiHat, 24, 80),
        drum(ClosedHiHat, 30, 60),
        drum(ClosedHiHat, 36, 80),
        drum(ClosedHiHat, 42, 60),
    ],
    bass: &[
        bass(0, ToneSelector::Root, 11, 100),
        bass(12, ToneSelector::Root, 11, 90),
        bass(24, ToneSelector::Root, 11, 100),
        bass(36, ToneSelector::Root, 11, 90),
    ],
    comping: &[
        comp(0, 11, 90, Voicing::Triad),
        comp(12, 11, 80, Voicing::Triad),
        comp(24, 11, 90, Voicing::Triad),
        comp(36, 11, 80, Voicing::Triad),
    ],
};

static FUNK: PatternTemplate = PatternTemplate {
    style: Style::Funk,
    feel: Feel::Straight,
    beats_per_bar: 4,
    drums: &[
        drum(Kick, 0, 110),
        drum(Kick, 9, 85),
        drum(Kick, 18, 90),
        drum(Kick, 30, 100),
        drum(Kick, 39, 80),
        drum(Snare, 6, 40),
        drum(Snare, 12, 105),
        drum(Snare, 27, 35),
        drum(Snare, 36, 105),
        drum(Snare, 45, 45),
        drum(ClosedHiHat, 0, 75),
        drum(ClosedHiHat, 3, 50),
        drum(ClosedHiHat, 6, 65),
        drum(ClosedHiHat, 9, 50),
        drum(OpenHiHat, 12, 80),
        drum(ClosedHiHat, 15, 50),
        drum(ClosedHiHat, 18, 65),
        drum(ClosedHiHat, 21, 50),
        drum(ClosedHiHat, 24, 75),
        drum(ClosedHiHat, 27, 50),
        drum(ClosedHiHat, 30, 65),
        drum(ClosedHiHat, 33, 50),
        drum(OpenHiHat, 36, 80),
        drum(ClosedHiHat, 39, 50),
        drum(ClosedHiHat, 42, 65),
        drum(ClosedHiHat, 45, 50),
    ],
    bass: &[
        bass(0, ToneSelector::Root, 5, 110),
        bass(9, ToneSelector::Root, 2, 80),
        bass(15, ToneSelector::Fifth, 4, 90),
        bass(21, ToneSelector::Root, 2, 75),
        bass(30, ToneSelector::Root, 5, 100),
        bass(36, ToneSelector::Fourth, 4, 85),
        bass(42, ToneSelector::Fifth, 4, 80),
    ],
    comping: &[
        comp(6, 2, 85, Voicing::Shell),
        comp(15, 2, 70, Voicing::Shell),
        comp(30, 2, 80, Voicing::Shell),
        comp(39, 2, 70, Voicing::Shell),
    ],
};

static BALLAD: PatternTemplate = PatternTemplate {
    style: Style::Ballad,
    feel: Feel::Straight,
    beats_per_bar: 4,
    drums: &[
        drum(Kick, 0, 70),
        drum(SideStick, 24, 60),
        drum(ClosedHiHat, 0, 50),
        drum(ClosedHiHat, 12, 40),
        drum(ClosedHiHat, 24, 50),
        drum(ClosedHiHat, 36, 40),
    ],
    bass: &[
        bass(0, ToneSelector::Root, 24, 80),
        bass(24, ToneSelector::Fifth, 24, 70),
    ],
    comping: &[
        comp(0, 10, 60, Voicing::Tone(0)),
        comp(6, 10, 55, Voicing::Tone(1)),
        comp(12, 10, 50, Voicing::Tone(2)),
        comp(18, 10, 55, Voicing::Tone(3)),
        comp(24, 10, 60, Voicing::Tone(0)),
        comp(30, 10, 55, Voicing::Tone(1)),
        comp(36, 10, 50, Voicing::Tone(2)),
        comp(42, 10, 55, Voicing::Tone(3)),
    ],
};

static LATIN: PatternTemplate = PatternTemplate {
    style: Style::Latin,
    feel: Feel::Straight,
    beats_per_bar: 4,
    drums: &[
        // Son clave 3-2
        drum(Claves, 0, 90),
        drum(Claves, 9, 85),
        drum(Claves, 18, 80),
        drum(Claves, 30, 90),
        drum(Claves, 42, 85),
        drum(Kick, 0, 90),
        drum(Kick, 30, 85),
        drum(Cowbell, 0, 70),
        drum(Cowbell, 6, 55),
        drum(Cowbell, 12, 65),
        drum(Cowbell, 18, 55),
        drum(Cowbell, 24, 70),
        drum(Cowbell, 30, 55),
        drum(Cowbell, 36, 65),
        drum(Cowbell, 42, 55),
    ],
    bass: &[
        bass(0, ToneSelector::Root, 5, 95),
        bass(6, ToneSelector::Fifth, 5, 80),
        bass(18, ToneSelector::Root, 5, 90),
        bass(24, ToneSelector::Fifth, 5, 85),
        bass(30, ToneSelector::Root, 5, 90),
        bass(42, ToneSelector::Fourth, 5, 80),
    ],
    comping: &[
        comp(0, 5, 80, Voicing::Full),
        comp(18, 5, 70, Voicing::Full),
        comp(30, 5, 75, Voicing::Full),
        comp(36, 5, 70, Voicing::Full),
    ],
};

static WALTZ: PatternTemplate = PatternTemplate {
    style: Style::Waltz,
    feel: Feel::Straight,
    beats_per_bar: 3,
    drums: &[
        drum(Kick, 0, 90),
        drum(ClosedHiHat, 12, 60),
        drum(ClosedHiHat, 24, 60),
    ],
    bass: &[
        bass(0, ToneSelector::Root, 11, 95),
        bass(12, ToneSelector::Third, 11, 75),
        bass(24, ToneSelector::Fifth, 11, 75),
    ],
    comping: &[
        comp(12, 10, 65, Voicing::Triad),
        comp(24, 10, 60, Voicing::Triad),
    ],
};

static BLUES: PatternTemplate = PatternTemplate {
    style: Style::Blues,
    feel: Feel::Swing,
    beats_per_bar: 4,
    drums: &[
        drum(Kick, 0, 95),
        drum(ClosedHiHat, 0, 80),
        drum(ClosedHiHat, 8, 60),
        drum(ClosedHiHat, 12, 75),
        drum(Snare, 12, 90),
        drum(ClosedHiHat, 20, 60),
        drum(Kick, 24, 90),
        drum(ClosedHiHat, 24, 80),
        drum(ClosedHiHat, 32, 60),
        drum(ClosedHiHat, 36, 75),
        drum(Snare, 36, 90),
        drum(ClosedHiHat, 44, 60),
    ],
    bass: &[
        bass(0, ToneSelector::Root, 7, 95),
        bass(8, ToneSelector::Root, 4, 80),
        bass(12, ToneSelector::Fifth, 7, 90),
        bass(20, ToneSelector::Fifth, 4, 75),
        bass(24, ToneSelector::Root, 7, 95),
        bass(32, ToneSelector::Root, 4, 80),
        bass(36, ToneSelector::Fifth, 7, 90),
        bass(44, ToneSelector::Sixth, 4, 75),
    ],
    comping: &[
        comp(12, 6, 80, Voicing::Full),
        comp(36, 6, 80, Voicing::Full),
    ],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_style_round_trips_by_name() {
        for style in Style::ALL {
            assert_eq!(Style::from_name(style.name()), Some(style));
            assert_eq!(lookup(style.name()).style, style);
        }
    }

    #[test]
    fn test_unknown_style_falls_back_to_swing() {
        assert_eq!(lookup("zydeco").style, Style::Swing);
        assert_eq!(lookup("").style, Style::Swing);
        assert_eq!(lookup("BOSSA").style, Style::Bossa);
    }

    #[test]
    fn test_rules_lie_within_the_bar() {
        for style in Style::ALL {
            let template = style.template();
            let bar = Beats::from_integer(template.beats_per_bar as i64);
            for rule in template.rules() {
                assert!(rule.offset() >= Beats::from_integer(0), "{:?}", rule);
                assert!(rule.offset() < bar, "{} rule {:?} outside the bar", style, rule);
                assert!(rule.length() > Beats::from_integer(0), "{:?}", rule);
            }
        }
    }

    #[test]
    fn test_every_style_has_all_three_rule_kinds() {
        for style in Style::ALL {
            let template = style.template();
            assert!(!template.drums.is_empty(), "{} has no drums", style);
            assert!(!template.bass.is_empty(), "{} has no bass", style);
            assert!(!template.comping.is_empty(), "{} has no comping", style);
        }
    }

    #[test]
    fn test_drum_notes_are_general_midi() {
        assert_eq!(DrumVoice::Kick.note(), 36);
        assert_eq!(DrumVoice::Snare.note(), 38);
        assert_eq!(DrumVoice::ClosedHiHat.note(), 42);
        assert_eq!(DrumVoice::Ride.note(), 51);
        for voice in DrumVoice::ALL {
            assert!((35..=81).contains(&voice.note()), "{:?}", voice);
        }
    }

    #[test]
    fn test_swing_feel_moves_offbeat_eighths() {
        assert_eq!(Feel::Swing.place(Beats::new(3, 2)), Beats::new(5, 3));
        assert_eq!(Feel::Swing.place(Beats::from_integer(2)), Beats::from_integer(2));
        assert_eq!(Feel::Swing.place(Beats::new(1, 4)), Beats::new(1, 4));
        assert_eq!(Feel::Straight.place(Beats::new(3, 2)), Beats::new(3, 2));
    }

    #[test]
    fn test_rule_order_is_drums_bass_comping() {
        let rules: Vec<Rule> = lookup("rock").rules().collect();
        assert!(matches!(rules.first(), Some(Rule::Drum(_))));
        assert!(matches!(rules.last(), Some(Rule::Comp(_))));
        assert_eq!(rules.len(), 12 + 4 + 4);
    }
}
