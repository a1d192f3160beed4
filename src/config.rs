//! # Configuration
//!
//! Generation settings, kept apart from the [`Score`](crate::score::Score):
//! style, tempo, repeats, which instruments play and how loud.
//!
//! Settings can be built in code or loaded from YAML with kebab-case keys.
//! Every key is optional:
//!
//! ```yaml
//! style: bossa
//! tempo: 140
//! repeats: 2
//! instruments:
//!   drums: true
//!   bass: true
//!   piano: false
//! volumes:
//!   drums: 0.8
//!   bass: 0.9
//!   piano: 0.7
//! ```
//!
//! ## Example
//! ```rust
//! use accomp::config::AccompanimentConfig;
//!
//! let config = AccompanimentConfig::from_yaml("style: rock\ntempo: 96").unwrap();
//! assert_eq!(config.style, "rock");
//! assert_eq!(config.tempo, 96.0);
//! assert_eq!(config.repeats, 1);
//! assert!(config.instruments.piano);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::AccompError;
use crate::patterns::Style;

/// Which instruments are generated.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct InstrumentToggles {
    pub drums: bool,
    pub bass: bool,
    pub piano: bool,
}

impl Default for InstrumentToggles {
    fn default() -> Self {
        Self {
            drums: true,
            bass: true,
            piano: true,
        }
    }
}

/// Velocity multipliers per instrument. Scaled velocities are clamped to
/// the MIDI range, so any value is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct VolumeScalars {
    pub drums: f64,
    pub bass: f64,
    pub piano: f64,
}

impl Default for VolumeScalars {
    fn default() -> Self {
        Self {
            drums: 0.8,
            bass: 0.9,
            piano: 0.7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct AccompanimentConfig {
    /// Style name; unknown names play as swing.
    pub style: String,
    /// Beats per minute
    pub tempo: f64,
    /// Passes over the whole form
    pub repeats: u32,
    pub instruments: InstrumentToggles,
    pub volumes: VolumeScalars,
}

impl Default for AccompanimentConfig {
    fn default() -> Self {
        Self {
            style: Style::default().name().to_string(),
            tempo: 120.0,
            repeats: 1,
            instruments: InstrumentToggles::default(),
            volumes: VolumeScalars::default(),
        }
    }
}

impl AccompanimentConfig {
    pub fn new(style: &str) -> Self {
        Self {
            style: style.to_string(),
            ..Self::default()
        }
    }

    pub fn with_tempo(mut self, tempo: f64) -> Self {
        self.tempo = tempo;
        self
    }

    pub fn with_repeats(mut self, repeats: u32) -> Self {
        self.repeats = repeats;
        self
    }

    pub fn with_instruments(mut self, instruments: InstrumentToggles) -> Self {
        self.instruments = instruments;
        self
    }

    pub fn with_volumes(mut self, volumes: VolumeScalars) -> Self {
        self.volumes = volumes;
        self
    }

    /// Load settings from YAML. Missing keys take their defaults.
    pub fn from_yaml(source: &str) -> Result<Self, AccompError> {
        if source.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(source).map_err(|e| AccompError::MetadataError(e.to_string()))
    }

    /// Check tempo and repeats.
    pub fn validate(&self) -> Result<(), AccompError> {
        if !self.tempo.is_finite() || self.tempo <= 0.0 {
            return Err(AccompError::InvalidTempo(self.tempo));
        }
        if self.repeats < 1 {
            return Err(AccompError::InvalidRepeats(self.repeats));
        }
        Ok(())
    }

    /// The style that will actually play.
    pub fn resolved_style(&self) -> Style {
        Style::from_name(&self.style).unwrap_or_default()
    }

    /// Whether the style name is one of the known styles.
    pub fn is_known_style(&self) -> bool {
        Style::from_name(&self.style).is_some()
    }
}
