use std::path::PathBuf;

use clap::Parser;
use keypiano::generator::{GeneratorState, SignalGenerator, Waveform};
use keypiano::notes::NoteId;
use keypiano::synth::ToneShape;
use plotters::prelude::*;

const FRAME_SIZE: usize = 64;
const DISCONTINUITY_THRESHOLD: f32 = 0.15;

/// Plot the gain envelope of one piano tone to SVG
#[derive(Parser, Debug)]
#[command(name = "plot-envelope", version)]
struct Args {
    /// Output SVG path
    #[arg(default_value = "envelope.svg")]
    output: PathBuf,

    /// Note to render, e.g. A4 or G#4
    #[arg(long, default_value = "A4")]
    note: NoteId,

    /// Sample rate in Hz
    #[arg(long, default_value_t = 8000)]
    sample_rate: u32,

    /// Oscillator waveform
    #[arg(long, default_value_t = Waveform::Sine)]
    waveform: Waveform,

    /// Also draw the oscillator output under the envelope
    #[arg(long)]
    show_wave: bool,
}

struct Rendered {
    /// Gain at every sample
    envelope: Vec<f32>,
    /// Voice output at every sample
    output: Vec<f32>,
}

fn render(args: &Args, shape: &ToneShape) -> Result<Rendered, Box<dyn std::error::Error>> {
    let mut voice = shape.voice(args.note.frequency(), 0.0, args.sample_rate)?;
    let sample_rate = args.sample_rate as f64;

    let mut output = Vec::new();
    let mut frame_buffer = vec![0.0f32; FRAME_SIZE];
    loop {
        let state = voice.process(&mut frame_buffer);
        output.extend_from_slice(&frame_buffer);
        if state == GeneratorState::Complete {
            break;
        }

        // Safety: prevent infinite loops
        if output.len() as f64 > sample_rate * 10.0 {
            return Err("Tone exceeded maximum duration".into());
        }
    }

    let stop_sample = (shape.stop * sample_rate).round() as usize;
    output.truncate(stop_sample);

    let envelope = (0..output.len())
        .map(|i| voice.gain().value_at(i as f64 / sample_rate))
        .collect();

    Ok(Rendered { envelope, output })
}

fn check_discontinuities(envelope: &[f32], sample_rate: u32) -> Result<(), Box<dyn std::error::Error>> {
    let mut max_diff: f32 = 0.0;
    let mut max_diff_idx: usize = 0;

    for i in 1..envelope.len() {
        let diff = (envelope[i] - envelope[i - 1]).abs();
        if diff > max_diff {
            max_diff = diff;
            max_diff_idx = i;
        }
    }

    if max_diff > DISCONTINUITY_THRESHOLD {
        return Err(format!(
            "DISCONTINUITY at sample {} ({:.1}ms): {} -> {} (diff = {})",
            max_diff_idx,
            max_diff_idx as f32 / sample_rate as f32 * 1000.0,
            envelope[max_diff_idx - 1],
            envelope[max_diff_idx],
            max_diff
        )
        .into());
    }

    println!(
        "  ✓ Max step: {:.6} at sample {} (below threshold {})",
        max_diff, max_diff_idx, DISCONTINUITY_THRESHOLD
    );
    Ok(())
}

fn create_plot(
    args: &Args,
    shape: &ToneShape,
    rendered: &Rendered,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = SVGBackend::new(&args.output, (800, 400)).into_drawing_area();
    root.fill(&WHITE)?;

    let ms_per_sample = 1000.0 / args.sample_rate as f32;
    let max_time = rendered.envelope.len() as f32 * ms_per_sample;
    let y_min = if args.show_wave { -1.0f32 } else { 0.0 };

    let title = format!(
        "{} ({} Hz, {}): attack {}ms to {}, decay to {} at {}ms, stop {}ms",
        args.note,
        args.note.frequency(),
        shape.waveform,
        shape.attack * 1000.0,
        shape.peak_gain,
        shape.floor_gain,
        shape.decay_end * 1000.0,
        shape.stop * 1000.0
    );

    let mut chart = ChartBuilder::on(&root)
        .caption(&title, ("sans-serif", 16))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0f32..max_time, y_min..1.0f32)?;

    chart
        .configure_mesh()
        .x_desc("Time (ms)")
        .y_desc("Gain")
        .x_labels(10)
        .y_labels(10)
        .draw()?;

    if args.show_wave {
        chart.draw_series(LineSeries::new(
            rendered
                .output
                .iter()
                .enumerate()
                .map(|(i, &s)| (i as f32 * ms_per_sample, s)),
            RGBColor(180, 180, 180).stroke_width(1),
        ))?;
    }

    chart.draw_series(LineSeries::new(
        rendered
            .envelope
            .iter()
            .enumerate()
            .map(|(i, &g)| (i as f32 * ms_per_sample, g)),
        BLUE.stroke_width(2),
    ))?;

    // Attack peak, decay floor and stop
    let markers = [
        (shape.attack as f32 * 1000.0, shape.peak_gain),
        (shape.decay_end as f32 * 1000.0, shape.floor_gain),
        (shape.stop as f32 * 1000.0, shape.floor_gain),
    ];
    chart.draw_series(
        markers
            .iter()
            .map(|&(t, g)| Circle::new((t, g), 5, RED.filled())),
    )?;

    root.present()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let shape = ToneShape {
        waveform: args.waveform,
        ..ToneShape::default()
    };

    println!("Envelope Plot Generator");
    println!("=======================");
    println!("  Note: {} ({} Hz)", args.note, args.note.frequency());
    println!("  Waveform: {}", shape.waveform);
    println!("  Attack: {}ms to {}", shape.attack * 1000.0, shape.peak_gain);
    println!("  Decay: to {} at {}ms", shape.floor_gain, shape.decay_end * 1000.0);
    println!("  Stop: {}ms", shape.stop * 1000.0);
    println!();

    print!("  Rendering tone... ");
    let rendered = render(&args, &shape)?;
    println!(
        "done ({} samples, {:.1}ms)",
        rendered.output.len(),
        rendered.output.len() as f32 * 1000.0 / args.sample_rate as f32
    );

    check_discontinuities(&rendered.envelope, args.sample_rate)?;

    print!("  Creating plot... ");
    create_plot(&args, &shape, &rendered)?;
    println!("done");

    println!();
    println!("Output: {}", args.output.display());

    Ok(())
}
