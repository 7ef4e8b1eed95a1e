//! pvoc - phase vocoder time stretching and pitch shifting for
//! AIFF/WAV files.

mod cli;

use std::io::{self, Write};
use std::thread;

use anyhow::{anyhow, Context};
use clap::Parser;
use crossbeam_channel::unbounded;

use pvoc_dsp::{Operation, Pvoc, PvocError};

use cli::{Cli, Command};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let (args, operation, phase_lock) = match cli.command {
        Command::Time(time) => (time.common, Operation::TimeStretch, time.phase_lock),
        Command::Pitch(pitch) => (pitch.common, Operation::PitchShift, false),
    };

    if !args.input.exists() {
        return Err(anyhow!("file does not exist: {}", args.input.display()));
    }

    let processor = Pvoc::new(
        args.bands,
        args.overlap,
        args.scale,
        operation,
        phase_lock,
        &args.window,
        args.gating_amplitude,
        args.gating_threshold,
    )?;

    let output_path = cli::resolve_output_path(&args.output, operation, &args, phase_lock);

    let mut reader = pvoc_audioio::reader_for_path(&args.input)
        .with_context(|| format!("could not open audio file: {}", args.input.display()))?;
    reader
        .open(processor.decimation)
        .with_context(|| format!("could not read audio file: {}", args.input.display()))?;

    if !args.quiet {
        print!("{processor}");
        println!("{:>24}   {}", "Number of Channels:", reader.num_chans());
        println!("{:>24}   {}", "Bit Depth:", reader.bit_depth());
        println!("{:>24}   {:.6} s", "Input Duration:", reader.duration());
        if operation == Operation::TimeStretch {
            println!(
                "{:>24}   {:.6} s",
                "Output Duration:",
                reader.duration() * processor.scale_factor
            );
        }
    }

    let mut writer = pvoc_audioio::writer_for_path(
        &output_path,
        reader.num_chans(),
        reader.sample_rate(),
        reader.bit_depth(),
    )
    .with_context(|| format!("could not open audio file for writing: {}", output_path.display()))?;
    writer
        .create(processor.interpolation)
        .with_context(|| format!("could not create audio file: {}", output_path.display()))?;

    let (progress_tx, progress_rx) = unbounded::<u32>();
    let quiet = args.quiet;

    let worker = thread::spawn(move || {
        let result = processor.run(reader.as_mut(), writer.as_mut(), &progress_tx);
        reader.close();
        let close_result = writer.close().map_err(PvocError::from);
        result.and(close_result)
    });

    for percent in progress_rx.iter() {
        if !quiet {
            render_progress(percent);
        }
    }

    match worker.join() {
        Ok(Ok(())) => {
            if !quiet {
                eprintln!();
                println!("Done!");
            }
            Ok(())
        }
        Ok(Err(error)) => Err(anyhow::Error::new(error).context("processing error")),
        Err(_) => Err(anyhow!("processing thread panicked")),
    }
}

const PROGRESS_BAR_WIDTH: usize = 40;

fn render_progress(percent: u32) {
    let filled = (percent.min(100) as usize * PROGRESS_BAR_WIDTH) / 100;
    eprint!(
        "\rprocessing... [{}{}] {percent:3}%",
        "=".repeat(filled),
        " ".repeat(PROGRESS_BAR_WIDTH - filled)
    );
    let _ = io::stderr().flush();
}
