//! # Parser Module
//!
//! Turns chord-chart text into a [`Score`].
//!
//! ## Purpose
//! The parser is the first stage of the pipeline. It reads an optional YAML
//! frontmatter block, tokenizes the chart with the [`Lexer`], groups the
//! tokens into bars and resolves repeat signs, then hands the finished
//! entries to [`Score::new`].
//!
//! ## Chart Syntax
//! - `|` separates bars; `||`, `|:` and `:|` are read as plain barlines
//! - Whitespace separates chords inside a bar; a line break also ends a bar
//! - N chords in a bar of B beats each last B/N beats
//! - A bar holding only `%` (or `x`) repeats the previous bar's chords
//! - `%` next to other chords repeats the previous chord
//! - Text without any `|` is read as one chord per bar
//! - `//` starts a comment that runs to the end of the line
//!
//! ## Frontmatter
//! ```text
//! ---
//! title: Autumn Leaves
//! composer: Joseph Kosma
//! key: G
//! time-signature: 4/4
//! ---
//! ```
//!
//! ## Entry Point
//! `parse(source: &str) -> Result<Score, AccompError>`
//!
//! ## Example
//! ```rust
//! use accomp::parse;
//!
//! let source = r#"---
//! title: Rhythm Bridge
//! ---
//! | D7 | % | G7 | % |
//! "#;
//!
//! let score = parse(source).unwrap();
//! assert_eq!(score.title(), "Rhythm Bridge");
//! assert_eq!(score.len(), 4);
//! assert_eq!(score.entries()[1].chord, score.entries()[0].chord);
//! ```
//!
//! ## Related Modules
//! - `lexer` - Provides tokens to parse
//! - `chord` - Normalizes every chord token
//! - `score` - Holds the result

use serde::Deserialize;

use crate::chord::{parse_chord, Chord};
use crate::error::AccompError;
use crate::lexer::{Lexer, LocatedToken, Token};
use crate::score::{Beats, Entry, Key, Metadata, Score, TimeSignature};

/// Raw frontmatter for YAML deserialization
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case")]
struct RawMetadata {
    title: Option<String>,
    composer: Option<String>,
    key: Option<String>,
    time_signature: Option<String>,
}

/// One chord slot in a bar, before repeat signs are resolved.
#[derive(Debug, Clone)]
enum Slot {
    Chord(Chord),
    Repeat { line: usize, column: usize },
}

/// Parse chart text with default metadata.
pub fn parse(source: &str) -> Result<Score, AccompError> {
    parse_with_defaults(source, Metadata::default())
}

/// Parse chart text. Frontmatter fields override the matching `defaults`.
pub fn parse_with_defaults(source: &str, defaults: Metadata) -> Result<Score, AccompError> {
    let (metadata_content, body) = extract_metadata(source);
    let metadata = match metadata_content {
        Some(content) => apply_frontmatter(&content, defaults)?,
        None => defaults,
    };

    let tokens = Lexer::new(&body).tokenize();
    let bars = group_bars(&tokens)?;
    let entries = resolve_bars(bars, &metadata.time_signature)?;
    Score::new(metadata, entries)
}

/// Resolve already split bars of chord symbols into entries.
pub(crate) fn entries_from_bars(
    bars: &[Vec<String>],
    time_signature: &TimeSignature,
) -> Result<Vec<Entry>, AccompError> {
    let mut slots = Vec::with_capacity(bars.len());
    for bar in bars {
        let mut bar_slots = Vec::with_capacity(bar.len());
        for symbol in bar {
            let symbol = symbol.trim();
            if symbol == "%" || symbol == "x" {
                bar_slots.push(Slot::Repeat { line: 0, column: 0 });
            } else {
                bar_slots.push(Slot::Chord(parse_chord(symbol)?));
            }
        }
        slots.push(bar_slots);
    }
    resolve_bars(slots, time_signature)
}

/// Split the source into frontmatter content and the remaining chart.
///
/// Frontmatter lines are blanked rather than removed so that token positions
/// still match the original source.
pub(crate) fn extract_metadata(source: &str) -> (Option<String>, String) {
    let lines: Vec<&str> = source.lines().collect();

    let mut start_idx = None;
    let mut end_idx = None;

    for (i, line) in lines.iter().enumerate() {
        if line.trim() == "---" {
            if start_idx.is_none() {
                start_idx = Some(i);
            } else {
                end_idx = Some(i);
                break;
            }
        }
    }

    match (start_idx, end_idx) {
        (Some(start), Some(end)) => {
            let metadata_content = lines[start + 1..end].join("\n");
            let remaining: Vec<&str> = lines
                .iter()
                .enumerate()
                .map(|(i, line)| if (start..=end).contains(&i) { "" } else { *line })
                .collect();
            (Some(metadata_content), remaining.join("\n"))
        }
        _ => (None, source.to_string()),
    }
}

fn apply_frontmatter(content: &str, defaults: Metadata) -> Result<Metadata, AccompError> {
    if content.trim().is_empty() {
        return Ok(defaults);
    }
    let raw: RawMetadata =
        serde_yaml::from_str(content).map_err(|e| AccompError::MetadataError(e.to_string()))?;

    let key = match &raw.key {
        Some(k) => Some(k.parse::<Key>()?),
        None => defaults.key,
    };
    let time_signature = match &raw.time_signature {
        Some(ts) => ts.parse::<TimeSignature>()?,
        None => defaults.time_signature,
    };

    Ok(Metadata {
        title: raw.title.unwrap_or(defaults.title),
        composer: raw.composer.or(defaults.composer),
        key,
        time_signature,
    })
}

/// Group tokens into bars of slots, normalizing every chord on the way.
fn group_bars(tokens: &[LocatedToken]) -> Result<Vec<Vec<Slot>>, AccompError> {
    let has_barlines = tokens.iter().any(|t| t.token == Token::BarLine);
    let mut bars = Vec::new();
    let mut current = Vec::new();

    for located in tokens {
        let slot = match &located.token {
            Token::BarLine | Token::Newline => {
                if !current.is_empty() {
                    bars.push(std::mem::take(&mut current));
                }
                continue;
            }
            Token::Repeat => Slot::Repeat {
                line: located.line,
                column: located.column,
            },
            Token::Chord(text) => Slot::Chord(parse_located_chord(text, located)?),
        };

        if has_barlines {
            current.push(slot);
        } else {
            bars.push(vec![slot]);
        }
    }
    if !current.is_empty() {
        bars.push(current);
    }
    Ok(bars)
}

fn parse_located_chord(text: &str, located: &LocatedToken) -> Result<Chord, AccompError> {
    parse_chord(text).map_err(|e| match e {
        AccompError::UnparsableChord { token, reason } => AccompError::UnparsableChord {
            token,
            reason: format!("{} (line {}, column {})", reason, located.line, located.column),
        },
        other => other,
    })
}

fn repeat_error(line: usize, column: usize, reason: &str) -> AccompError {
    if line == 0 {
        AccompError::chord("%", reason)
    } else {
        AccompError::chord("%", format!("{} (line {}, column {})", reason, line, column))
    }
}

/// Resolve repeat signs and split each bar evenly among its chords.
fn resolve_bars(
    bars: Vec<Vec<Slot>>,
    time_signature: &TimeSignature,
) -> Result<Vec<Entry>, AccompError> {
    let bar_length = time_signature.bar_length();
    let mut entries = Vec::new();
    let mut previous_bar: Option<Vec<Chord>> = None;
    let mut previous_chord: Option<Chord> = None;

    for bar in bars {
        if bar.is_empty() {
            continue;
        }

        let whole_bar_repeat = match bar.as_slice() {
            [Slot::Repeat { line, column }] => Some((*line, *column)),
            _ => None,
        };

        let chords = match whole_bar_repeat {
            Some((line, column)) => previous_bar.clone().ok_or_else(|| {
                repeat_error(line, column, "repeat sign with no previous bar")
            })?,
            None => {
                let mut chords = Vec::with_capacity(bar.len());
                for slot in bar {
                    let chord = match slot {
                        Slot::Chord(chord) => chord,
                        Slot::Repeat { line, column } => previous_chord
                            .clone()
                            .ok_or_else(|| {
                                repeat_error(line, column, "repeat sign with no previous chord")
                            })?,
                    };
                    previous_chord = Some(chord.clone());
                    chords.push(chord);
                }
                chords
            }
        };

        let duration = bar_length / Beats::from_integer(chords.len() as i64);
        entries.extend(chords.iter().cloned().map(|c| Entry::new(c, duration)));
        previous_chord = chords.last().cloned();
        previous_bar = Some(chords);
    }

    Ok(entries)
}
