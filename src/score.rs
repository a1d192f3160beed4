//! # Score
//!
//! The canonical, immutable chord progression: an ordered, non-empty list of
//! [`Entry`] values (chord plus duration in beats) and [`Metadata`].
//!
//! ## Construction
//! A Score is built once through one of the coercion paths and never mutated
//! afterwards. Style, tempo and repeats are generation settings and are
//! supplied separately.
//!
//! - [`Score::from_string`] - bar-delimited chart text (with optional frontmatter)
//! - [`Score::from_ireal_url`] / [`Score::from_ireal_payload`] - iReal Pro input
//! - [`Score::from_pairs`] - `(chord, beats)` pairs
//! - [`Score::from_chords`] - chord symbols, one per bar
//! - [`Score::from_bars`] - already split bars
//! - [`ensure_score`] - any of the above through [`ChartInput`]
//!
//! ## Example
//! ```rust
//! use accomp::score::{ensure_score, Beats, Metadata};
//!
//! let score = ensure_score("| C Am | F G |", Metadata::default()).unwrap();
//! assert_eq!(score.len(), 4);
//! assert_eq!(score.entries()[0].duration, Beats::from_integer(2));
//! assert_eq!(score.bars().len(), 2);
//! ```

use std::fmt;
use std::str::FromStr;

use num_rational::Ratio;
use num_traits::Zero;
use serde::Serialize;

use crate::chord::{parse_chord, Chord, Note};
use crate::error::AccompError;
use crate::ireal::{self, IrealPayload};
use crate::parser;

/// Durations and positions, counted in beats of the time signature.
pub type Beats = Ratio<i64>;

/// Time signature (e.g., 4/4, 3/4, 6/8)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSignature {
    pub beats: u8,
    pub beat_unit: u8,
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self {
            beats: 4,
            beat_unit: 4,
        }
    }
}

impl TimeSignature {
    /// Build a time signature. The beat unit must be a power of two up to 64.
    pub fn new(beats: u8, beat_unit: u8) -> Result<Self, AccompError> {
        if beats == 0 {
            return Err(AccompError::MetadataError(
                "time signature must have at least one beat per bar".to_string(),
            ));
        }
        if !beat_unit.is_power_of_two() || beat_unit > 64 {
            return Err(AccompError::MetadataError(format!(
                "time signature beat unit {} is not a power of two up to 64",
                beat_unit
            )));
        }
        Ok(Self { beats, beat_unit })
    }

    /// Length of one bar in beats.
    pub fn bar_length(&self) -> Beats {
        Beats::from_integer(self.beats as i64)
    }

    /// Ticks in one beat given the resolution of a quarter note.
    pub fn ticks_per_beat(&self, ticks_per_quarter: u32) -> u32 {
        ticks_per_quarter * 4 / self.beat_unit as u32
    }
}

impl FromStr for TimeSignature {
    type Err = AccompError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('/').collect();
        if parts.len() != 2 {
            return Err(AccompError::MetadataError(format!(
                "Invalid time signature: {}",
                s
            )));
        }

        let beats = parts[0].trim().parse().map_err(|_| {
            AccompError::MetadataError(format!("Invalid time signature beats: {}", s))
        })?;
        let beat_unit = parts[1].trim().parse().map_err(|_| {
            AccompError::MetadataError(format!("Invalid time signature beat unit: {}", s))
        })?;

        TimeSignature::new(beats, beat_unit)
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.beats, self.beat_unit)
    }
}

/// Key of the tune: a tonic and a mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Key {
    pub tonic: Note,
    pub minor: bool,
}

impl Key {
    pub fn pitch_class(&self) -> u8 {
        self.tonic.pitch_class()
    }
}

impl FromStr for Key {
    type Err = AccompError;

    /// Accepts `C`, `Bb`, `F#m`, `A-`, `Eb minor`, `G major`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (tonic, used) = Note::parse_prefix(trimmed)
            .ok_or_else(|| AccompError::MetadataError(format!("Invalid key: {}", s)))?;

        let minor = match trimmed[used..].trim().to_ascii_lowercase().as_str() {
            "" | "maj" | "major" => false,
            "m" | "-" | "min" | "minor" => true,
            _ => return Err(AccompError::MetadataError(format!("Invalid key: {}", s))),
        };
        Ok(Key { tonic, minor })
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.tonic, if self.minor { "m" } else { "" })
    }
}

/// Descriptive data carried alongside the progression.
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    pub title: String,
    pub composer: Option<String>,
    pub key: Option<Key>,
    pub time_signature: TimeSignature,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            title: "Untitled".to_string(),
            composer: None,
            key: None,
            time_signature: TimeSignature::default(),
        }
    }
}

/// One chord held for a positive number of beats.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub chord: Chord,
    pub duration: Beats,
}

impl Entry {
    pub fn new(chord: Chord, duration: Beats) -> Self {
        Self { chord, duration }
    }
}

/// An ordered, non-empty chord progression plus metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    metadata: Metadata,
    entries: Vec<Entry>,
}

impl Score {
    /// Build a Score from finished entries.
    ///
    /// Fails with [`AccompError::EmptyProgression`] when `entries` is empty and
    /// with [`AccompError::InvalidDuration`] when any duration is not positive.
    pub fn new(metadata: Metadata, entries: Vec<Entry>) -> Result<Self, AccompError> {
        if entries.is_empty() {
            return Err(AccompError::EmptyProgression);
        }
        if let Some(bad) = entries.iter().find(|e| e.duration <= Beats::zero()) {
            return Err(AccompError::InvalidDuration(bad.chord.to_string()));
        }
        Ok(Self { metadata, entries })
    }

    /// Parse bar-delimited chart text. See [`crate::parser`].
    pub fn from_string(text: &str) -> Result<Self, AccompError> {
        parser::parse(text)
    }

    /// Read a plain `irealb://` / `irealbook://` link. See [`crate::ireal`].
    pub fn from_ireal_url(url: &str) -> Result<Self, AccompError> {
        ireal::parse_url(url)
    }

    /// Build from a payload already decoded by an external iReal decoder.
    pub fn from_ireal_payload(payload: &IrealPayload) -> Result<Self, AccompError> {
        ireal::score_from_payload(payload)
    }

    /// Build from `(chord, beats)` pairs. Pairs whose duration is not positive
    /// are skipped.
    pub fn from_pairs<S: AsRef<str>>(
        pairs: impl IntoIterator<Item = (S, Beats)>,
        metadata: Metadata,
    ) -> Result<Self, AccompError> {
        let mut entries = Vec::new();
        for (symbol, duration) in pairs {
            if duration <= Beats::zero() {
                continue;
            }
            entries.push(Entry::new(parse_chord(symbol.as_ref())?, duration));
        }
        Score::new(metadata, entries)
    }

    /// Build from chord symbols, each lasting one full bar.
    pub fn from_chords<S: AsRef<str>>(
        chords: impl IntoIterator<Item = S>,
        metadata: Metadata,
    ) -> Result<Self, AccompError> {
        let bars: Vec<Vec<S>> = chords.into_iter().map(|c| vec![c]).collect();
        Score::from_bars(bars, metadata)
    }

    /// Build from bars of chord symbols. Chords in a bar share it evenly, and
    /// `%` repeats the previous bar (alone) or the previous chord (next to
    /// other chords).
    pub fn from_bars<B, S>(
        bars: impl IntoIterator<Item = B>,
        metadata: Metadata,
    ) -> Result<Self, AccompError>
    where
        B: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let bars: Vec<Vec<String>> = bars
            .into_iter()
            .map(|bar| bar.into_iter().map(|s| s.as_ref().to_string()).collect())
            .collect();
        let entries = parser::entries_from_bars(&bars, &metadata.time_signature)?;
        Score::new(metadata, entries)
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn title(&self) -> &str {
        &self.metadata.title
    }

    pub fn time_signature(&self) -> TimeSignature {
        self.metadata.time_signature
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false for a constructed Score.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all entry durations.
    pub fn total_beats(&self) -> Beats {
        self.entries
            .iter()
            .fold(Beats::zero(), |acc, e| acc + e.duration)
    }

    /// Regroup the entries into bars by cumulative duration. An entry belongs
    /// to the bar in which it starts; a trailing partial bar counts as a bar.
    pub fn bars(&self) -> Vec<&[Entry]> {
        let bar_length = self.metadata.time_signature.bar_length();
        let mut bars = Vec::new();
        let mut bar_start = 0;
        let mut current_bar = 0i64;
        let mut position = Beats::zero();

        for (i, entry) in self.entries.iter().enumerate() {
            let bar = (position / bar_length).floor().to_integer();
            if bar != current_bar {
                if i > bar_start {
                    bars.push(&self.entries[bar_start..i]);
                }
                bar_start = i;
                current_bar = bar;
            }
            position += entry.duration;
        }
        bars.push(&self.entries[bar_start..]);
        bars
    }
}

impl<'a> IntoIterator for &'a Score {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// The input shapes accepted by [`ensure_score`].
#[derive(Debug, Clone)]
pub enum ChartInput {
    /// Chart text, or an `irealb://` / `irealbook://` link.
    Text(String),
    Pairs(Vec<(String, Beats)>),
    Chords(Vec<String>),
    Bars(Vec<Vec<String>>),
    Ireal(IrealPayload),
    Score(Score),
}

impl From<&str> for ChartInput {
    fn from(s: &str) -> Self {
        ChartInput::Text(s.to_string())
    }
}

impl From<String> for ChartInput {
    fn from(s: String) -> Self {
        ChartInput::Text(s)
    }
}

impl From<Vec<(&str, Beats)>> for ChartInput {
    fn from(pairs: Vec<(&str, Beats)>) -> Self {
        ChartInput::Pairs(pairs.into_iter().map(|(c, b)| (c.to_string(), b)).collect())
    }
}

impl From<Vec<(String, Beats)>> for ChartInput {
    fn from(pairs: Vec<(String, Beats)>) -> Self {
        ChartInput::Pairs(pairs)
    }
}

impl From<Vec<&str>> for ChartInput {
    fn from(chords: Vec<&str>) -> Self {
        ChartInput::Chords(chords.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for ChartInput {
    fn from(chords: Vec<String>) -> Self {
        ChartInput::Chords(chords)
    }
}

impl From<Vec<Vec<&str>>> for ChartInput {
    fn from(bars: Vec<Vec<&str>>) -> Self {
        ChartInput::Bars(
            bars.into_iter()
                .map(|bar| bar.into_iter().map(str::to_string).collect())
                .collect(),
        )
    }
}

impl From<Vec<Vec<String>>> for ChartInput {
    fn from(bars: Vec<Vec<String>>) -> Self {
        ChartInput::Bars(bars)
    }
}

impl From<IrealPayload> for ChartInput {
    fn from(payload: IrealPayload) -> Self {
        ChartInput::Ireal(payload)
    }
}

impl From<Score> for ChartInput {
    fn from(score: Score) -> Self {
        ChartInput::Score(score)
    }
}

/// Coerce any supported input shape into a [`Score`].
///
/// `defaults` supplies the metadata for inputs that carry none. Chart text
/// frontmatter overrides it field by field; iReal input brings its own, and
/// an existing Score is returned unchanged.
///
/// ```
/// use accomp::score::{ensure_score, Beats, Metadata};
///
/// let pairs = vec![("F#m7b5", Beats::from_integer(4)), ("B7", Beats::from_integer(4))];
/// let score = ensure_score(pairs, Metadata::default()).unwrap();
/// assert_eq!(score.entries()[0].chord.to_string(), "F#h7");
///
/// let bars = vec![vec!["Dm7", "G7"], vec!["C^7"]];
/// let score = ensure_score(bars, Metadata::default()).unwrap();
/// assert_eq!(score.len(), 3);
/// ```
pub fn ensure_score(
    input: impl Into<ChartInput>,
    defaults: Metadata,
) -> Result<Score, AccompError> {
    match input.into() {
        ChartInput::Score(score) => Ok(score),
        ChartInput::Text(text) => {
            let trimmed = text.trim();
            if ireal::is_ireal_url(trimmed) {
                Score::from_ireal_url(trimmed)
            } else {
                parser::parse_with_defaults(trimmed, defaults)
            }
        }
        ChartInput::Pairs(pairs) => Score::from_pairs(pairs, defaults),
        ChartInput::Chords(chords) => Score::from_chords(chords, defaults),
        ChartInput::Bars(bars) => Score::from_bars(bars, defaults),
        ChartInput::Ireal(payload) => Score::from_ireal_payload(&payload),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chord::Quality;

    fn beats(n: i64) -> Beats {
        Beats::from_integer(n)
    }

    #[test]
    fn test_time_signature_parsing() {
        let ts: TimeSignature = "3/4".parse().unwrap();
        assert_eq!(ts, TimeSignature { beats: 3, beat_unit: 4 });
        assert_eq!(ts.bar_length(), beats(3));
        assert_eq!(ts.ticks_per_beat(480), 480);

        let ts: TimeSignature = "6/8".parse().unwrap();
        assert_eq!(ts.ticks_per_beat(480), 240);

        assert!("4".parse::<TimeSignature>().is_err());
        assert!("4/3".parse::<TimeSignature>().is_err());
        assert!("0/4".parse::<TimeSignature>().is_err());
    }

    #[test]
    fn test_time_signature_error_messages() {
        let err = "four".parse::<TimeSignature>().unwrap_err();
        assert_eq!(err.to_string(), "Invalid metadata: Invalid time signature: four");

        let err = "x/4".parse::<TimeSignature>().unwrap_err();
        assert_eq!(err.to_string(), "Invalid metadata: Invalid time signature beats: x/4");
    }

    #[test]
    fn test_key_parsing() {
        let key: Key = "Bb".parse().unwrap();
        assert_eq!(key.pitch_class(), 10);
        assert!(!key.minor);

        let key: Key = "F#m".parse().unwrap();
        assert_eq!(key.pitch_class(), 6);
        assert!(key.minor);
        assert_eq!(key.to_string(), "F#m");

        assert!("Eb minor".parse::<Key>().unwrap().minor);
        assert!("H".parse::<Key>().is_err());
        assert!("Cdorian".parse::<Key>().is_err());
    }

    #[test]
    fn test_empty_score_is_rejected() {
        let result = Score::new(Metadata::default(), Vec::new());
        assert!(matches!(result, Err(AccompError::EmptyProgression)));
    }

    #[test]
    fn test_non_positive_duration_is_rejected() {
        let entry = Entry::new(parse_chord("C").unwrap(), beats(0));
        let result = Score::new(Metadata::default(), vec![entry]);
        assert!(matches!(result, Err(AccompError::InvalidDuration(_))));
    }

    #[test]
    fn test_pairs_skip_non_positive_durations() {
        let score = Score::from_pairs(
            vec![("C", beats(4)), ("D", beats(0)), ("E", beats(-2)), ("F", beats(2))],
            Metadata::default(),
        )
        .unwrap();
        assert_eq!(score.len(), 2);
        assert_eq!(score.total_beats(), beats(6));
    }

    #[test]
    fn test_pairs_all_skipped_is_empty() {
        let result = Score::from_pairs(vec![("C", beats(0))], Metadata::default());
        assert!(matches!(result, Err(AccompError::EmptyProgression)));
    }

    #[test]
    fn test_from_chords_one_bar_each() {
        let meta = Metadata {
            time_signature: TimeSignature::new(3, 4).unwrap(),
            ..Metadata::default()
        };
        let score = Score::from_chords(["C", "F", "G7"], meta).unwrap();
        assert_eq!(score.len(), 3);
        assert!(score.iter().all(|e| e.duration == beats(3)));
        assert_eq!(score.entries()[2].chord.quality, Quality::Dominant7);
    }

    #[test]
    fn test_from_bars_splits_evenly() {
        let score = Score::from_bars(
            vec![vec!["C", "A-", "D-"], vec!["G7"]],
            Metadata::default(),
        )
        .unwrap();
        assert_eq!(score.len(), 4);
        assert_eq!(score.entries()[0].duration, Beats::new(4, 3));
        assert_eq!(score.entries()[3].duration, beats(4));
    }

    #[test]
    fn test_bars_regrouping() {
        let score = Score::from_pairs(
            vec![("C", beats(2)), ("F", beats(2)), ("G", beats(4)), ("C", beats(2))],
            Metadata::default(),
        )
        .unwrap();
        let bars = score.bars();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].len(), 2);
        assert_eq!(bars[1].len(), 1);
        assert_eq!(bars[2].len(), 1);
    }

    #[test]
    fn test_bars_regrouping_long_entry() {
        // A chord held over two bars still starts in the first one
        let score = Score::from_pairs(
            vec![("C", beats(8)), ("G", beats(4))],
            Metadata::default(),
        )
        .unwrap();
        assert_eq!(score.bars().len(), 2);
    }

    #[test]
    fn test_ensure_score_passes_scores_through() {
        let score = ensure_score("| C | G |", Metadata::default()).unwrap();
        let same = ensure_score(score.clone(), Metadata::default()).unwrap();
        assert_eq!(score, same);
    }

    #[test]
    fn test_ensure_score_applies_defaults() {
        let meta = Metadata {
            title: "Blues in F".to_string(),
            ..Metadata::default()
        };
        let score = ensure_score("F7 Bb7 F7 F7", meta).unwrap();
        assert_eq!(score.title(), "Blues in F");
        assert_eq!(score.len(), 4);
    }

    #[test]
    fn test_score_iteration() {
        let score = ensure_score("| C | Am | F | G |", Metadata::default()).unwrap();
        let names: Vec<String> = (&score).into_iter().map(|e| e.chord.to_string()).collect();
        assert_eq!(names, vec!["C", "A-", "F", "G"]);
        assert!(!score.is_empty());
    }
}
