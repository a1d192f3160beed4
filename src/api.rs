//! Pipeline entry points and backend selection.
//!
//! The built-in engine is one of two interchangeable MIDI producers. The
//! other is an external groove generator that the caller wraps in an
//! [`ExternalGenerator`] and passes in as [`Backend::External`]. Probing for
//! the external tool and choosing a backend is left to the caller.

use crate::config::AccompanimentConfig;
use crate::error::AccompError;
use crate::generate::{generate, EventSet};
use crate::midi::encode;
use crate::score::{ensure_score, ChartInput, Metadata, Score};

/// An out-of-process MIDI producer.
///
/// Implementations report their own failures as [`AccompError::Backend`].
pub trait ExternalGenerator {
    /// Short name used in diagnostics.
    fn name(&self) -> &str;

    /// Produce Standard MIDI File bytes for `score` with `config`.
    fn render(&self, score: &Score, config: &AccompanimentConfig) -> Result<Vec<u8>, AccompError>;
}

/// Which producer renders the MIDI.
#[derive(Clone, Copy, Default)]
pub enum Backend<'a> {
    #[default]
    Builtin,
    External(&'a dyn ExternalGenerator),
}

impl std::fmt::Debug for Backend<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Builtin => write!(f, "Builtin"),
            Backend::External(generator) => write!(f, "External({})", generator.name()),
        }
    }
}

/// Render a Score to MIDI bytes with the chosen backend.
///
/// Settings are validated before either backend runs.
pub fn render_midi(
    score: &Score,
    config: &AccompanimentConfig,
    backend: Backend<'_>,
) -> Result<Vec<u8>, AccompError> {
    config.validate()?;
    match backend {
        Backend::Builtin => {
            let events = generate(score, config)?;
            encode(&events, score.time_signature(), config.tempo)
        }
        Backend::External(generator) => generator.render(score, config),
    }
}

/// Build a Score from any supported input and generate its events.
pub fn compile_events(
    input: impl Into<ChartInput>,
    config: &AccompanimentConfig,
) -> Result<EventSet, AccompError> {
    let score = ensure_score(input, Metadata::default())?;
    generate(&score, config)
}

/// Compile chart text (or an iReal link) straight to MIDI bytes.
/// This is the main entry point for the library.
///
/// ```rust
/// use accomp::compile;
/// use accomp::config::AccompanimentConfig;
///
/// let bytes = compile("| C | Am | F | G |", &AccompanimentConfig::new("rock")).unwrap();
/// assert_eq!(&bytes[0..4], b"MThd");
/// ```
pub fn compile(source: &str, config: &AccompanimentConfig) -> Result<Vec<u8>, AccompError> {
    let score = ensure_score(source, Metadata::default())?;
    render_midi(&score, config, Backend::Builtin)
}
