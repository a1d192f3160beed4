//! # Chord Symbol Normalizer
//!
//! Turns any supported chord spelling (`Cm7b5`, `Bb^7`, `F#-9`, `Gsus4/C`,
//! `Ebø7`, ...) into a [`Chord`]: a root, exactly one [`Quality`], an ordered
//! list of extension/alteration tokens and an optional slash bass.
//!
//! ## Grammar
//! ```text
//! chord  := root quality? extension* ("/" bass)?
//! root   := [A-G] ("#" | "♯" | "b" | "♭" | "♭♭")?
//! bass   := root
//! ```
//!
//! ## Quality resolution
//! Quality aliases are matched longest-first from a table sorted once on first
//! use. Some aliases carry implied extensions, so `maj9` is a major-7 chord
//! with a `9` and `7sus4` is a suspended chord with a `7`. When nothing
//! matches the chord is major.
//!
//! ## Extensions
//! Whatever follows the quality is split greedily into known tokens (`9`,
//! `b9`, `#11`, `add9`, `no3`, `alt`, ...). Characters that do not start a
//! known token are gathered verbatim into a single token and kept, but are
//! never read as a quality. `(`, `)` and `,` only separate tokens.
//!
//! ## Canonical display
//! `Display` prints iReal-style shorthand (`C-7`, `C^7`, `Ch7`, `Co7`, `C+`,
//! `Csus`). Printing and parsing again yields the same chord:
//!
//! ```rust
//! use accomp::chord::{Chord, Quality};
//!
//! let chord: Chord = "Cm7b5".parse().unwrap();
//! assert_eq!(chord.quality, Quality::HalfDiminished);
//! assert!(chord.extensions.is_empty());
//! assert_eq!(chord.to_string(), "Ch7");
//! assert_eq!(chord.to_string().parse::<Chord>().unwrap(), chord);
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::Serialize;

use crate::error::AccompError;

/// Note letters A through G
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Letter {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Letter {
    fn from_char(c: char) -> Option<Self> {
        match c {
            'C' => Some(Letter::C),
            'D' => Some(Letter::D),
            'E' => Some(Letter::E),
            'F' => Some(Letter::F),
            'G' => Some(Letter::G),
            'A' => Some(Letter::A),
            'B' => Some(Letter::B),
            _ => None,
        }
    }

    fn semitone(self) -> i8 {
        match self {
            Letter::C => 0,
            Letter::D => 2,
            Letter::E => 4,
            Letter::F => 5,
            Letter::G => 7,
            Letter::A => 9,
            Letter::B => 11,
        }
    }

    fn as_char(self) -> char {
        match self {
            Letter::C => 'C',
            Letter::D => 'D',
            Letter::E => 'E',
            Letter::F => 'F',
            Letter::G => 'G',
            Letter::A => 'A',
            Letter::B => 'B',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Accidental {
    #[default]
    Natural,
    Sharp,
    Flat,
    DoubleFlat,
}

impl Accidental {
    fn offset(self) -> i8 {
        match self {
            Accidental::Natural => 0,
            Accidental::Sharp => 1,
            Accidental::Flat => -1,
            Accidental::DoubleFlat => -2,
        }
    }
}

/// A spelled note: letter plus accidental, as written in the chart.
///
/// The spelling is kept for display; all arithmetic goes through
/// [`Note::pitch_class`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Note {
    pub letter: Letter,
    pub accidental: Accidental,
}

impl Note {
    pub fn new(letter: Letter, accidental: Accidental) -> Self {
        Self { letter, accidental }
    }

    /// Pitch class 0-11, C = 0.
    pub fn pitch_class(&self) -> u8 {
        (self.letter.semitone() + self.accidental.offset()).rem_euclid(12) as u8
    }

    /// Read a note from the start of `s`, returning it and the number of
    /// bytes consumed.
    ///
    /// ```
    /// use accomp::chord::Note;
    ///
    /// let (note, used) = Note::parse_prefix("Bb7").unwrap();
    /// assert_eq!(note.pitch_class(), 10);
    /// assert_eq!(used, 2);
    /// assert!(Note::parse_prefix("H7").is_none());
    /// ```
    pub fn parse_prefix(s: &str) -> Option<(Note, usize)> {
        let first = s.chars().next()?;
        let letter = Letter::from_char(first)?;
        let rest = &s[first.len_utf8()..];

        let (accidental, used) = if rest.starts_with("♭♭") {
            (Accidental::DoubleFlat, "♭♭".len())
        } else if let Some(c) = rest.chars().next() {
            match c {
                '#' | '♯' => (Accidental::Sharp, c.len_utf8()),
                'b' | '♭' => (Accidental::Flat, c.len_utf8()),
                _ => (Accidental::Natural, 0),
            }
        } else {
            (Accidental::Natural, 0)
        };

        Some((Note::new(letter, accidental), first.len_utf8() + used))
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let acc = match self.accidental {
            Accidental::Natural => "",
            Accidental::Sharp => "#",
            Accidental::Flat => "b",
            Accidental::DoubleFlat => "♭♭",
        };
        write!(f, "{}{}", self.letter.as_char(), acc)
    }
}

impl FromStr for Note {
    type Err = AccompError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match Note::parse_prefix(trimmed) {
            Some((note, used)) if used == trimmed.len() => Ok(note),
            _ => Err(AccompError::chord(trimmed, "not a note name (A-G with optional #/b)")),
        }
    }
}

/// Chord quality. Every chord resolves to exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Quality {
    Major,
    Minor,
    Dominant7,
    Major7,
    Minor7,
    Diminished,
    Diminished7,
    HalfDiminished,
    Augmented,
    Suspended4,
    Suspended2,
}

impl Quality {
    /// Minor-family qualities take a minor third.
    pub fn is_minor_family(self) -> bool {
        matches!(
            self,
            Quality::Minor
                | Quality::Minor7
                | Quality::Diminished
                | Quality::Diminished7
                | Quality::HalfDiminished
        )
    }

    /// Semitones from the root to the third (the suspended tone for sus chords).
    pub fn third(self) -> u8 {
        match self {
            Quality::Suspended4 => 5,
            Quality::Suspended2 => 2,
            q if q.is_minor_family() => 3,
            _ => 4,
        }
    }

    /// Semitones from the root to the fifth.
    pub fn fifth(self) -> u8 {
        match self {
            Quality::Diminished | Quality::Diminished7 | Quality::HalfDiminished => 6,
            Quality::Augmented => 8,
            _ => 7,
        }
    }

    /// Semitones from the root to the seventh, for qualities that imply one.
    pub fn seventh(self) -> Option<u8> {
        match self {
            Quality::Dominant7 | Quality::Minor7 | Quality::HalfDiminished => Some(10),
            Quality::Major7 => Some(11),
            Quality::Diminished7 => Some(9),
            _ => None,
        }
    }

    /// Canonical lead-sheet spelling.
    pub fn symbol(self) -> &'static str {
        match self {
            Quality::Major => "",
            Quality::Minor => "-",
            Quality::Dominant7 => "7",
            Quality::Major7 => "^7",
            Quality::Minor7 => "-7",
            Quality::Diminished => "o",
            Quality::Diminished7 => "o7",
            Quality::HalfDiminished => "h7",
            Quality::Augmented => "+",
            Quality::Suspended4 => "sus",
            Quality::Suspended2 => "sus2",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Alias {
    spelling: &'static str,
    quality: Quality,
    implied: &'static [&'static str],
}

const fn alias(spelling: &'static str, quality: Quality) -> Alias {
    Alias { spelling, quality, implied: &[] }
}

const fn alias_with(
    spelling: &'static str,
    quality: Quality,
    implied: &'static [&'static str],
) -> Alias {
    Alias { spelling, quality, implied }
}

const ALIASES: &[Alias] = &[
    // Major seventh
    alias("maj7", Quality::Major7),
    alias("Maj7", Quality::Major7),
    alias("MA7", Quality::Major7),
    alias("ma7", Quality::Major7),
    alias("M7", Quality::Major7),
    alias("^7", Quality::Major7),
    alias("Δ7", Quality::Major7),
    alias("^", Quality::Major7),
    alias("Δ", Quality::Major7),
    alias_with("maj9", Quality::Major7, &["9"]),
    alias_with("maj11", Quality::Major7, &["11"]),
    alias_with("maj13", Quality::Major7, &["13"]),
    alias_with("M9", Quality::Major7, &["9"]),
    alias_with("^9", Quality::Major7, &["9"]),
    alias_with("^11", Quality::Major7, &["11"]),
    alias_with("^13", Quality::Major7, &["13"]),
    alias_with("Δ9", Quality::Major7, &["9"]),
    // Half diminished
    alias("m7b5", Quality::HalfDiminished),
    alias("-7b5", Quality::HalfDiminished),
    alias("min7b5", Quality::HalfDiminished),
    alias("mi7b5", Quality::HalfDiminished),
    alias("h7", Quality::HalfDiminished),
    alias("h", Quality::HalfDiminished),
    alias("ø7", Quality::HalfDiminished),
    alias("ø", Quality::HalfDiminished),
    alias("Ø7", Quality::HalfDiminished),
    alias("Ø", Quality::HalfDiminished),
    // Minor seventh
    alias("m7", Quality::Minor7),
    alias("-7", Quality::Minor7),
    alias("min7", Quality::Minor7),
    alias("mi7", Quality::Minor7),
    alias_with("m9", Quality::Minor7, &["9"]),
    alias_with("-9", Quality::Minor7, &["9"]),
    alias_with("min9", Quality::Minor7, &["9"]),
    alias_with("m11", Quality::Minor7, &["11"]),
    alias_with("-11", Quality::Minor7, &["11"]),
    alias_with("min11", Quality::Minor7, &["11"]),
    alias_with("m13", Quality::Minor7, &["13"]),
    alias_with("-13", Quality::Minor7, &["13"]),
    // Diminished
    alias("dim7", Quality::Diminished7),
    alias("o7", Quality::Diminished7),
    alias("°7", Quality::Diminished7),
    alias("dim", Quality::Diminished),
    alias("o", Quality::Diminished),
    alias("°", Quality::Diminished),
    // Augmented
    alias("aug", Quality::Augmented),
    alias("+", Quality::Augmented),
    alias_with("aug7", Quality::Augmented, &["7"]),
    alias_with("+7", Quality::Augmented, &["7"]),
    // Suspended
    alias("sus4", Quality::Suspended4),
    alias("sus", Quality::Suspended4),
    alias("sus2", Quality::Suspended2),
    alias_with("7sus4", Quality::Suspended4, &["7"]),
    alias_with("7sus", Quality::Suspended4, &["7"]),
    alias_with("9sus4", Quality::Suspended4, &["9"]),
    alias_with("9sus", Quality::Suspended4, &["9"]),
    // Dominant
    alias("7", Quality::Dominant7),
    alias_with("9", Quality::Dominant7, &["9"]),
    alias_with("11", Quality::Dominant7, &["11"]),
    alias_with("13", Quality::Dominant7, &["13"]),
    // Minor and major triads
    alias("min", Quality::Minor),
    alias("mi", Quality::Minor),
    alias("m", Quality::Minor),
    alias("-", Quality::Minor),
    alias("maj", Quality::Major),
    alias("M", Quality::Major),
];

fn alias_table() -> &'static [Alias] {
    static TABLE: OnceLock<Vec<Alias>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = ALIASES.to_vec();
        table.sort_by(|a, b| b.spelling.len().cmp(&a.spelling.len()));
        table
    })
}

/// Longest quality alias that prefixes `s`.
fn match_alias(s: &str) -> Option<&'static Alias> {
    alias_table().iter().find(|a| s.starts_with(a.spelling))
}

// Ordered longest first.
const EXTENSION_TOKENS: &[&str] = &[
    "omit3", "omit5", "add13", "add11", "add9", "add4", "add2", "maj7", "sus4", "sus2", "sus",
    "no3", "no5", "alt", "b13", "#11", "+11", "Δ7", "^7", "M7", "b9", "#9", "+9", "-9", "b5",
    "#5", "+5", "-5", "13", "11", "9", "7", "6", "5", "4", "2",
];

fn tokenize_extensions(s: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut unknown = String::new();
    let mut rest = s;

    while let Some(c) = rest.chars().next() {
        if matches!(c, '(' | ')' | ',' | ' ') {
            if !unknown.is_empty() {
                tokens.push(std::mem::take(&mut unknown));
            }
            rest = &rest[c.len_utf8()..];
            continue;
        }
        match EXTENSION_TOKENS.iter().find(|t| rest.starts_with(**t)) {
            Some(token) => {
                if !unknown.is_empty() {
                    tokens.push(std::mem::take(&mut unknown));
                }
                tokens.push(token.to_string());
                rest = &rest[token.len()..];
            }
            None => {
                unknown.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }
    if !unknown.is_empty() {
        tokens.push(unknown);
    }
    tokens
}

/// Semitones above the root for an extension or alteration token.
///
/// Tokens that do not name a pitch (`alt`, `no3`, `sus4`, unknown text)
/// return `None`.
pub fn extension_interval(token: &str) -> Option<u8> {
    match token {
        "2" | "9" | "add2" | "add9" => Some(14),
        "b9" | "-9" => Some(13),
        "#9" | "+9" => Some(15),
        "4" | "11" | "add4" | "add11" => Some(17),
        "#11" | "+11" => Some(18),
        "13" | "add13" => Some(21),
        "b13" => Some(20),
        "6" => Some(9),
        "7" => Some(10),
        "^7" | "maj7" | "M7" | "Δ7" => Some(11),
        "b5" | "-5" => Some(6),
        "#5" | "+5" => Some(8),
        "5" => Some(7),
        _ => None,
    }
}

/// A canonical chord.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Chord {
    pub root: Note,
    pub quality: Quality,
    pub extensions: Vec<String>,
    pub bass: Option<Note>,
}

impl Chord {
    pub fn new(root: Note, quality: Quality) -> Self {
        Self {
            root,
            quality,
            extensions: Vec::new(),
            bass: None,
        }
    }

    pub fn has_extension(&self, token: &str) -> bool {
        self.extensions.iter().any(|e| e == token)
    }

    /// Semitones from the root to the third, honouring `sus` tokens.
    pub fn third(&self) -> u8 {
        if self.has_extension("sus4") || self.has_extension("sus") {
            5
        } else if self.has_extension("sus2") {
            2
        } else {
            self.quality.third()
        }
    }

    /// Semitones from the root to the fifth, honouring `b5`/`#5` alterations.
    pub fn fifth(&self) -> u8 {
        if self.has_extension("b5") || self.has_extension("-5") {
            6
        } else if self.has_extension("#5") || self.has_extension("+5") {
            8
        } else {
            self.quality.fifth()
        }
    }

    /// Semitones from the root to the seventh, if the chord has one.
    pub fn seventh(&self) -> Option<u8> {
        self.quality.seventh().or_else(|| {
            self.extensions
                .iter()
                .find_map(|e| match e.as_str() {
                    "7" => Some(10),
                    "^7" | "maj7" | "M7" | "Δ7" => Some(11),
                    _ => None,
                })
        })
    }

    /// Chord tones as semitone offsets from the root, in stacking order:
    /// root, third, fifth, seventh, then extensions. Pitch-class duplicates
    /// are left in; voicing removes them.
    pub fn intervals(&self) -> Vec<u8> {
        let mut tones = vec![0];
        if !self.has_extension("no3") && !self.has_extension("omit3") {
            tones.push(self.third());
        }
        if !self.has_extension("no5") && !self.has_extension("omit5") {
            tones.push(self.fifth());
        }
        if let Some(seventh) = self.seventh() {
            tones.push(seventh);
        }
        tones.extend(self.extensions.iter().filter_map(|e| extension_interval(e)));
        tones
    }

    /// Spelling for the quality plus the extensions it absorbs, e.g. `-9`
    /// for a minor-seventh chord whose first extension is `9`.
    fn quality_spelling(&self) -> (&'static str, usize) {
        let first = self.extensions.first().map(String::as_str);
        let compact = match (self.quality, first) {
            (Quality::Major7, Some("9")) => Some("^9"),
            (Quality::Major7, Some("11")) => Some("^11"),
            (Quality::Major7, Some("13")) => Some("^13"),
            (Quality::Minor7, Some("9")) => Some("-9"),
            (Quality::Minor7, Some("11")) => Some("-11"),
            (Quality::Minor7, Some("13")) => Some("-13"),
            (Quality::Dominant7, Some("9")) => Some("9"),
            (Quality::Dominant7, Some("11")) => Some("11"),
            (Quality::Dominant7, Some("13")) => Some("13"),
            (Quality::Suspended4, Some("7")) => Some("7sus"),
            (Quality::Suspended4, Some("9")) => Some("9sus"),
            (Quality::Augmented, Some("7")) => Some("+7"),
            _ => None,
        };
        match compact {
            Some(spelling) => (spelling, 1),
            None => (self.quality.symbol(), 0),
        }
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (spelling, absorbed) = self.quality_spelling();
        let tail = &self.extensions[absorbed..];
        let rest = tail.concat();

        // Parenthesize the extensions when they would otherwise be read back
        // as part of a longer quality alias, or as an accidental on the root.
        let joined = format!("{}{}", spelling, rest);
        let swallowed = !rest.is_empty()
            && match_alias(&joined).map_or(0, |a| a.spelling.len()) != spelling.len();
        let on_root = spelling.is_empty()
            && rest.starts_with(|c: char| matches!(c, 'b' | '#' | '♭' | '♯'));
        // Adjacent tokens that run together need explicit separators
        let merged = tokenize_extensions(&rest).as_slice() != tail;

        write!(f, "{}{}", self.root, spelling)?;
        if merged {
            write!(f, "({})", tail.join(","))?;
        } else if swallowed || on_root {
            write!(f, "({})", rest)?;
        } else {
            write!(f, "{}", rest)?;
        }
        if let Some(bass) = &self.bass {
            write!(f, "/{}", bass)?;
        }
        Ok(())
    }
}

impl FromStr for Chord {
    type Err = AccompError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_chord(s)
    }
}

/// Normalize a chord token into a [`Chord`].
///
/// Fails with [`AccompError::UnparsableChord`] when the root (or a slash
/// bass) is not a note. Anything else is accepted; unknown trailing text is
/// kept verbatim in `extensions`.
///
/// ```
/// use accomp::chord::{parse_chord, Quality};
///
/// let chord = parse_chord("Ebmaj9/G").unwrap();
/// assert_eq!(chord.root.pitch_class(), 3);
/// assert_eq!(chord.quality, Quality::Major7);
/// assert_eq!(chord.extensions, vec!["9"]);
/// assert_eq!(chord.bass.unwrap().pitch_class(), 7);
/// ```
pub fn parse_chord(token: &str) -> Result<Chord, AccompError> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return Err(AccompError::chord(trimmed, "empty chord symbol"));
    }

    let (root, used) = Note::parse_prefix(trimmed)
        .ok_or_else(|| AccompError::chord(trimmed, "root must be a letter A-G"))?;
    let rest = &trimmed[used..];

    let (body, bass) = match rest.rfind('/') {
        Some(idx) => {
            let after = &rest[idx + 1..];
            match Note::parse_prefix(after) {
                Some((bass, n)) if n == after.len() => (rest[..idx].to_string(), Some(bass)),
                // 6/9 style stacked extensions
                _ if !after.is_empty() && after.chars().all(|c| c.is_ascii_digit()) => {
                    (format!("{}{}", &rest[..idx], after), None)
                }
                _ => {
                    return Err(AccompError::chord(
                        trimmed,
                        format!("slash bass '{}' is not a note", after),
                    ))
                }
            }
        }
        None => (rest.to_string(), None),
    };

    let (quality, mut extensions, remainder) = match match_alias(&body) {
        Some(a) => (
            a.quality,
            a.implied.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
            &body[a.spelling.len()..],
        ),
        None => (Quality::Major, Vec::new(), body.as_str()),
    };
    extensions.extend(tokenize_extensions(remainder));

    Ok(Chord {
        root,
        quality,
        extensions,
        bass,
    })
}
