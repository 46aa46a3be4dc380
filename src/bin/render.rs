//! CLI tool for rendering an input script to audio
//!
//! Usage: render <input.txt> [output.wav]
//!
//! If output is not specified, generates <input>.wav

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use keypiano::audio::ContextConfig;
use keypiano::generator::Waveform;
use keypiano::script::{parse_script, Pipeline, PipelineConfig};
use keypiano::synth::ToneShape;
use tracing_subscriber::EnvFilter;

/// Replay a script of key, mouse and touch events and write the result as WAV
#[derive(Parser, Debug)]
#[command(name = "render", version)]
struct Args {
    /// Path to the input script
    input: PathBuf,

    /// Output WAV path (defaults to <input>.wav)
    output: Option<PathBuf>,

    /// Sample rate in Hz
    #[arg(long, default_value_t = 44100)]
    sample_rate: u32,

    /// Samples per frame; events land on frame boundaries
    #[arg(long, default_value_t = 64)]
    frame_size: usize,

    /// Oscillator waveform: sine, square, sawtooth or triangle
    #[arg(long, default_value_t = Waveform::Sine)]
    waveform: Waveform,

    /// Log every delivered event
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.input.with_extension("wav"));

    let content = fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let events = parse_script(&content)
        .with_context(|| format!("parsing {}", args.input.display()))?;

    println!("Parsed {} event groups", events.len());

    let config = PipelineConfig {
        context: ContextConfig {
            sample_rate: args.sample_rate,
            frame_size: args.frame_size,
        },
        shape: ToneShape {
            waveform: args.waveform,
            ..ToneShape::default()
        },
    };

    println!("Configuration:");
    println!("  Sample rate: {} Hz", config.context.sample_rate);
    println!("  Frame size: {} samples", config.context.frame_size);
    println!("  Waveform: {}", config.shape.waveform);
    println!();

    let mut pipeline = Pipeline::new(config, events);

    println!("Generating audio...");
    let samples = pipeline
        .generate_wav(&output)
        .with_context(|| format!("writing {}", output.display()))?;

    println!("✓ Generated {} ({} samples)", output.display(), samples);
    Ok(())
}
