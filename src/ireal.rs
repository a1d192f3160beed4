//! # iReal Pro Input
//!
//! Two ways into a [`Score`] from iReal Pro material:
//!
//! - [`IrealPayload`]: a tune already decoded by an external iReal decoder into
//!   chord/duration pairs plus header fields. This is the main path.
//! - [`parse_url`]: a best-effort reader for plain `irealbook://` and
//!   `irealb://` links whose chord data is not scrambled. Scrambled data
//!   (marked by `1r34LbKcu7`) is rejected with
//!   [`AccompError::InvalidIrealUrl`]; unscrambling it is left to an external
//!   decoder.
//!
//! ## Link layout
//! After the scheme and percent-decoding, fields are separated by `=`:
//! `title=composer=style=key=n=chords`. In the chord data, structural
//! markers (`{ } [ ] Z Y Q S`), section labels (`*A`), endings (`N1`),
//! comments (`<...>`) and alternate chords (`(...)`) are dropped; `T44`
//! sets the time signature. Every remaining chord lasts one bar.

use std::sync::OnceLock;

use regex::Regex;

use crate::chord::parse_chord;
use crate::error::AccompError;
use crate::score::{Beats, Entry, Key, Metadata, Score, TimeSignature};

const SCRAMBLED_MARKER: &str = "1r34LbKcu7";

/// Cell contents that are not chords: no-chord, repeat and size markers.
const NON_CHORD_TOKENS: &[&str] = &["n", "x", "r", "%", "p", "s", "l", "W"];

/// A tune decoded by an external iReal Pro decoder.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IrealPayload {
    pub title: String,
    pub composer: Option<String>,
    pub key: Option<String>,
    /// `"4/4"`-style; defaults to 4/4.
    pub time_signature: Option<String>,
    pub chords: Vec<(String, Beats)>,
}

/// Whether `s` looks like an iReal Pro link.
pub fn is_ireal_url(s: &str) -> bool {
    s.starts_with("irealbook://") || s.starts_with("irealb://")
}

/// Build a Score from a pre-decoded payload.
///
/// Pairs with a non-positive duration are skipped, like
/// [`Score::from_pairs`]. An unreadable key is ignored.
pub fn score_from_payload(payload: &IrealPayload) -> Result<Score, AccompError> {
    let time_signature = match &payload.time_signature {
        Some(ts) => ts.parse::<TimeSignature>()?,
        None => TimeSignature::default(),
    };
    let metadata = Metadata {
        title: non_empty(&payload.title).unwrap_or_else(|| "Untitled".to_string()),
        composer: payload.composer.as_deref().and_then(non_empty),
        key: payload.key.as_deref().and_then(|k| k.parse::<Key>().ok()),
        time_signature,
    };
    Score::from_pairs(payload.chords.iter().cloned(), metadata)
}

/// Read a plain (unscrambled) iReal Pro link.
///
/// ```
/// use accomp::ireal::parse_url;
///
/// let url = "irealbook://Blue%20Bossa=Dorham%20Kenny=Bossa%20Nova=C-=n=\
///            {*AT44C-7 |F-7 |Dh7 |G7b9 |C-7 |x |Ebh7 |Ab7 Z";
/// let score = parse_url(url).unwrap();
/// assert_eq!(score.title(), "Blue Bossa");
/// assert_eq!(score.len(), 7);
/// assert_eq!(score.entries()[3].chord.to_string(), "G7b9");
/// ```
pub fn parse_url(url: &str) -> Result<Score, AccompError> {
    let raw = url
        .strip_prefix("irealbook://")
        .or_else(|| url.strip_prefix("irealb://"))
        .ok_or_else(|| AccompError::InvalidIrealUrl("missing irealbook:// scheme".to_string()))?;

    let decoded = percent_decode(raw)?;
    if decoded.contains(SCRAMBLED_MARKER) {
        return Err(AccompError::InvalidIrealUrl(
            "chord data is scrambled and needs an external decoder".to_string(),
        ));
    }

    let parts: Vec<&str> = decoded.split('=').collect();
    if parts.len() < 6 {
        return Err(AccompError::InvalidIrealUrl(format!(
            "expected at least 6 '=' separated fields, found {}",
            parts.len()
        )));
    }

    let data = parts[5];
    let time_signature = read_time_signature(data)?;
    let metadata = Metadata {
        title: non_empty(parts[0]).unwrap_or_else(|| "Untitled".to_string()),
        composer: non_empty(parts[1]),
        key: parts[3].parse::<Key>().ok(),
        time_signature,
    };

    let bar_length = time_signature.bar_length();
    let mut entries = Vec::new();
    for token in chord_tokens(data)? {
        entries.push(Entry::new(parse_chord(&token)?, bar_length));
    }
    Score::new(metadata, entries)
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

struct Regexes {
    time_signature: Regex,
    markers: Regex,
    separators: Regex,
}

impl Regexes {
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            time_signature: Regex::new(r"T(\d)(\d)")?,
            markers: Regex::new(r"T\d\d|\*[A-Za-z]|N\d|<[^>]*>|\([^)]*\)|[{}\[\]ZYQS]")?,
            separators: Regex::new(r"[|,\s]+")?,
        })
    }
}

fn regexes() -> Result<&'static Regexes, AccompError> {
    static REGEXES: OnceLock<Option<Regexes>> = OnceLock::new();
    REGEXES
        .get_or_init(|| Regexes::new().ok())
        .as_ref()
        .ok_or_else(|| AccompError::InvalidIrealUrl("chord data patterns failed to compile".to_string()))
}

fn read_time_signature(data: &str) -> Result<TimeSignature, AccompError> {
    let Some(caps) = regexes()?.time_signature.captures(data) else {
        return Ok(TimeSignature::default());
    };
    let (upper, lower) = (&caps[1], &caps[2]);
    // T12 is 12/8
    let (beats, unit) = if upper == "1" && lower == "2" {
        (12, 8)
    } else {
        (
            upper.parse().unwrap_or(4),
            lower.parse().unwrap_or(4),
        )
    };
    TimeSignature::new(beats, unit)
        .map_err(|_| AccompError::InvalidIrealUrl(format!("bad time signature T{}{}", upper, lower)))
}

fn chord_tokens(data: &str) -> Result<Vec<String>, AccompError> {
    let regexes = regexes()?;
    let cleaned = regexes.markers.replace_all(data, " ");
    let tokens = regexes
        .separators
        .split(&cleaned)
        .filter(|t| !t.is_empty() && !NON_CHORD_TOKENS.contains(t))
        .map(|t| {
            // Small/large chord size prefixes
            match t.strip_prefix('s').or_else(|| t.strip_prefix('l')) {
                Some(rest) if rest.starts_with(|c: char| ('A'..='G').contains(&c)) => rest,
                _ => t,
            }
        })
        .filter(|t| t.starts_with(|c: char| ('A'..='G').contains(&c)))
        .map(str::to_string)
        .collect();
    Ok(tokens)
}

fn percent_decode(s: &str) -> Result<String, AccompError> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok());
            match hex {
                Some(b) => {
                    out.push(b);
                    i += 3;
                    continue;
                }
                // A bare % is the iReal repeat sign
                None => out.push(b'%'),
            }
        } else {
            out.push(bytes[i]);
        }
        i += 1;
    }
    String::from_utf8(out)
        .map_err(|_| AccompError::InvalidIrealUrl("link is not valid UTF-8".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chord::Quality;

    #[test]
    fn test_url_detection() {
        assert!(is_ireal_url("irealbook://Song=A=B=C=n=C"));
        assert!(is_ireal_url("irealb://abc"));
        assert!(!is_ireal_url("| C | G |"));
    }

    #[test]
    fn test_parse_plain_url() {
        let url = "irealbook://Autumn%20Leaves=Kosma%20Joseph=Medium%20Swing=G-=n=\
                   [T44A-7 D7 |G^7 C^7 |F#h7 B7b9 |E-6 n Z";
        let score = parse_url(url).unwrap();
        assert_eq!(score.title(), "Autumn Leaves");
        assert_eq!(score.metadata().composer.as_deref(), Some("Kosma Joseph"));
        let key = score.metadata().key.unwrap();
        assert_eq!(key.pitch_class(), 7);
        assert!(key.minor);

        let names: Vec<String> = score.iter().map(|e| e.chord.to_string()).collect();
        assert_eq!(names, vec!["A-7", "D7", "G^7", "C^7", "F#h7", "B7b9", "E-6"]);
        assert!(score.iter().all(|e| e.duration == Beats::from_integer(4)));
        assert_eq!(score.entries()[4].chord.quality, Quality::HalfDiminished);
    }

    #[test]
    fn test_time_signature_marker() {
        let url = "irealbook://Waltz=Someone=Jazz%20Waltz=F=n=[T34F^7 |G-7 |C7 |F^7 Z";
        let score = parse_url(url).unwrap();
        assert_eq!(score.time_signature(), TimeSignature { beats: 3, beat_unit: 4 });
        assert_eq!(score.len(), 4);
        assert!(score.iter().all(|e| e.duration == Beats::from_integer(3)));
    }

    #[test]
    fn test_markers_and_comments_are_stripped() {
        let url = "irealbook://T=C=S=C=n={*AT44C^7 <Fine> |N1D-7 G7 }|N2sG7sus (Db7) Z";
        let score = parse_url(url).unwrap();
        let names: Vec<String> = score.iter().map(|e| e.chord.to_string()).collect();
        assert_eq!(names, vec!["C^7", "D-7", "G7", "G7sus"]);
    }

    #[test]
    fn test_scrambled_url_is_rejected() {
        let url = "irealb://%54%68%65=Composer==Medium%20Swing=C=n=1r34LbKcu7L%23%7C4tZ";
        assert!(matches!(parse_url(url), Err(AccompError::InvalidIrealUrl(_))));
    }

    #[test]
    fn test_short_url_is_rejected() {
        assert!(matches!(
            parse_url("irealbook://Title=Composer"),
            Err(AccompError::InvalidIrealUrl(_))
        ));
        assert!(matches!(parse_url("http://x"), Err(AccompError::InvalidIrealUrl(_))));
    }

    #[test]
    fn test_url_without_chords_is_empty() {
        let result = parse_url("irealbook://T=C=S=C=n=[T44 n | x Z");
        assert!(matches!(result, Err(AccompError::EmptyProgression)));
    }

    #[test]
    fn test_payload() {
        let payload = IrealPayload {
            title: "So What".to_string(),
            composer: Some("Davis Miles".to_string()),
            key: Some("D-".to_string()),
            time_signature: None,
            chords: vec![
                ("D-7".to_string(), Beats::from_integer(32)),
                ("Eb-7".to_string(), Beats::from_integer(16)),
                ("D-7".to_string(), Beats::from_integer(0)),
            ],
        };
        let score = score_from_payload(&payload).unwrap();
        assert_eq!(score.title(), "So What");
        assert_eq!(score.len(), 2);
        assert_eq!(score.bars().len(), 2);
        assert_eq!(score.total_beats(), Beats::from_integer(48));
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("A%20B").unwrap(), "A B");
        assert_eq!(percent_decode("C % D").unwrap(), "C % D");
        assert_eq!(percent_decode("%7C").unwrap(), "|");
    }
}
