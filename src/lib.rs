pub mod api;
pub mod chord;
pub mod config;
pub mod error;
pub mod generate;
pub mod ireal;
pub mod lexer;
pub mod midi;
pub mod mma;
pub mod parser;
pub mod patterns;
pub mod score;

pub use api::{compile, compile_events, render_midi, Backend, ExternalGenerator};
pub use chord::{parse_chord, Chord, Quality};
pub use config::AccompanimentConfig;
pub use error::*;
pub use generate::{generate, EventSet};
pub use midi::encode;
pub use mma::to_mma_script;
pub use parser::parse;
pub use patterns::{lookup, Style};
pub use score::{ensure_score, Beats, Score, TimeSignature};
