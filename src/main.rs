//! accomp CLI - compile a chord chart to an accompaniment MIDI file.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;

use accomp::config::AccompanimentConfig;
use accomp::score::{ensure_score, Metadata, Score};
use accomp::{generate, render_midi, to_mma_script, Backend};

/// Chord chart to accompaniment MIDI
#[derive(Parser, Debug)]
#[command(name = "accomp")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compile lead-sheet chord charts to drum, bass and piano MIDI", long_about = None)]
struct Args {
    /// Chart text such as "| Dm7 G7 | C^7 |", or an irealb:// link
    #[arg(value_name = "CHART", conflicts_with = "file")]
    chart: Option<String>,

    /// Read the chart from a file
    #[arg(short, long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// YAML settings file (style, tempo, repeats, instruments, volumes)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Style: swing, bossa, rock, funk, ballad, latin, waltz or blues
    #[arg(short, long)]
    style: Option<String>,

    /// Tempo in beats per minute
    #[arg(short, long)]
    tempo: Option<f64>,

    /// Passes over the whole form
    #[arg(short, long)]
    repeats: Option<u32>,

    #[arg(long)]
    no_drums: bool,

    #[arg(long)]
    no_bass: bool,

    #[arg(long)]
    no_piano: bool,

    /// Write the MIDI file here
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Write an MMA script for the external groove generator instead of MIDI
    #[arg(long, value_name = "FILE")]
    mma: Option<PathBuf>,

    /// Print the generated events as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = Args::parse();
    let source = read_chart(&args)?;
    let config = load_config(&args)?;
    log::debug!("Settings: {:?}", config);

    if !config.is_known_style() {
        log::warn!(
            "Unknown style '{}', playing {} instead",
            config.style,
            config.resolved_style()
        );
    }

    let score = ensure_score(source.as_str(), Metadata::default())
        .context("Failed to read chord chart")?;
    log::info!(
        "{}: {} chords in {} bars ({})",
        score.title(),
        score.len(),
        score.bars().len(),
        score.time_signature()
    );

    if let Some(path) = &args.mma {
        let script = to_mma_script(&score, &config);
        fs::write(path, script)
            .with_context(|| format!("Failed to write MMA script to {}", path.display()))?;
        log::info!("Wrote MMA script to {}", path.display());
        return Ok(());
    }

    if args.json {
        let events = generate(&score, &config)?;
        println!("{}", serde_json::to_string_pretty(&events)?);
    }

    match &args.output {
        Some(path) => {
            let bytes = render_midi(&score, &config, Backend::Builtin)?;
            fs::write(path, &bytes)
                .with_context(|| format!("Failed to write MIDI to {}", path.display()))?;
            log::info!("Wrote {} bytes of MIDI to {}", bytes.len(), path.display());
        }
        None if !args.json => print_summary(&score, &config)?,
        None => {}
    }

    Ok(())
}

fn read_chart(args: &Args) -> Result<String> {
    match (&args.chart, &args.file) {
        (Some(chart), _) => Ok(chart.clone()),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read chart file {}", path.display())),
        (None, None) => anyhow::bail!("No chart given: pass chart text or --file <FILE>"),
    }
}

/// Config file first, then command-line overrides.
fn load_config(args: &Args) -> Result<AccompanimentConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let yaml = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            AccompanimentConfig::from_yaml(&yaml)
                .with_context(|| format!("Invalid config file {}", path.display()))?
        }
        None => AccompanimentConfig::default(),
    };

    if let Some(style) = &args.style {
        config.style = style.clone();
    }
    if let Some(tempo) = args.tempo {
        config.tempo = tempo;
    }
    if let Some(repeats) = args.repeats {
        config.repeats = repeats;
    }
    if args.no_drums {
        config.instruments.drums = false;
    }
    if args.no_bass {
        config.instruments.bass = false;
    }
    if args.no_piano {
        config.instruments.piano = false;
    }

    config.validate()?;
    Ok(config)
}

fn print_summary(score: &Score, config: &AccompanimentConfig) -> Result<()> {
    let events = generate(score, config)?;
    println!(
        "{} - {} at {} BPM, {} pass(es)",
        score.title(),
        events.style,
        config.tempo,
        config.repeats
    );
    for track in &events.tracks {
        println!("  {:<6} {} notes", track.instrument.name(), track.events.len());
    }
    println!("  Total  {} ticks", events.total_ticks);
    println!("Pass --output <FILE> to write MIDI");
    Ok(())
}
