//! # Error Types
//!
//! This module defines all error types for the accompaniment compiler.
//!
//! Every stage reports failures through [`AccompError`]. Errors are never
//! recovered internally: a failure in the parser, the engine or the encoder
//! aborts the whole pipeline call and is handed back unchanged.
//!
//! ## Error Types
//! - `UnparsableChord` - A chord token whose root (or slash bass) is not a note
//! - `EmptyProgression` - Parsing produced no chord entries at all
//! - `InvalidDuration` - A Score entry with a non-positive duration
//! - `InvalidRepeats` / `InvalidTempo` - Out-of-range generation settings
//! - `MetadataError` - Bad frontmatter, time signature or YAML config
//! - `InvalidIrealUrl` - An iReal link that cannot be read without an external decoder
//! - `Backend` - Failure reported by an injected external generator
//! - `Encode` - I/O failure while serializing the MIDI buffer
//!
//! Unknown style names are deliberately *not* an error: they resolve to the
//! default style (see [`crate::patterns::lookup`]).
//!
//! ## Usage
//! ```rust
//! use accomp::{parse, AccompError};
//!
//! match parse("| C | Xm7 |") {
//!     Err(AccompError::UnparsableChord { token, .. }) => assert_eq!(token, "Xm7"),
//!     other => panic!("unexpected: {:?}", other),
//! }
//! ```

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AccompError {
    /// A chord token could not be read.
    ///
    /// The offending token is kept verbatim for diagnostics.
    ///
    /// # Example
    /// ```
    /// # use accomp::AccompError;
    /// let err = AccompError::UnparsableChord {
    ///     token: "H7".to_string(),
    ///     reason: "root must be a letter A-G".to_string(),
    /// };
    /// assert_eq!(err.to_string(), "Unparsable chord 'H7': root must be a letter A-G");
    /// ```
    #[error("Unparsable chord '{token}': {reason}")]
    UnparsableChord { token: String, reason: String },

    /// The progression contained no chords.
    #[error("Progression contains no chords")]
    EmptyProgression,

    /// A Score entry was given a zero or negative duration.
    #[error("Invalid duration for chord '{0}': must be a positive number of beats")]
    InvalidDuration(String),

    /// Repeats must be at least 1.
    #[error("Invalid repeat count: {0} (must be at least 1)")]
    InvalidRepeats(u32),

    /// Tempo must be a positive number of beats per minute.
    #[error("Invalid tempo: {0} BPM (must be greater than 0)")]
    InvalidTempo(f64),

    /// Invalid metadata error.
    ///
    /// Occurs when YAML frontmatter or a YAML config is malformed, or when a
    /// time signature cannot be represented.
    ///
    /// # Example
    /// ```
    /// # use accomp::{AccompError, TimeSignature};
    /// let err = "four".parse::<TimeSignature>().unwrap_err();
    /// assert!(matches!(err, AccompError::MetadataError(_)));
    /// assert_eq!(err.to_string(), "Invalid metadata: Invalid time signature: four");
    /// ```
    #[error("Invalid metadata: {0}")]
    MetadataError(String),

    #[error("Invalid iReal Pro URL: {0}")]
    InvalidIrealUrl(String),

    /// An external generator injected through [`crate::Backend::External`] failed.
    #[error("External backend failed: {0}")]
    Backend(String),

    #[error("MIDI encoding failed: {0}")]
    Encode(#[from] std::io::Error),
}

impl AccompError {
    pub(crate) fn chord(token: &str, reason: impl Into<String>) -> Self {
        AccompError::UnparsableChord {
            token: token.to_string(),
            reason: reason.into(),
        }
    }
}
