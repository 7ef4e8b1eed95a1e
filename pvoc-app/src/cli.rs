//! Command-line surface: the `time` and `pitch` subcommands and output
//! file naming.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use pvoc_dsp::Operation;

#[derive(Parser, Debug)]
#[command(name = "pvoc", version)]
#[command(about = "Phase vocoder time stretching and pitch shifting for AIFF/WAV files")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Time stretch the input file without changing its pitch
    Time(TimeArgs),
    /// Pitch shift the input file without changing its duration
    Pitch(PitchArgs),
}

#[derive(Args, Debug)]
pub struct TimeArgs {
    #[command(flatten)]
    pub common: ProcessArgs,

    /// Enable phase locking during resynthesis
    #[arg(short = 'p')]
    pub phase_lock: bool,
}

#[derive(Args, Debug)]
pub struct PitchArgs {
    #[command(flatten)]
    pub common: ProcessArgs,
}

#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Path to the input AIFF/WAV file
    #[arg(short = 'i', value_name = "INPUT")]
    pub input: PathBuf,

    /// Output file, or a directory in which the output is auto-named.
    /// An existing file will be overwritten.
    #[arg(short = 'f', value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Scale multiplier
    #[arg(short = 's', value_name = "SCALE", default_value_t = 1.0)]
    pub scale: f64,

    /// Number of FFT bands, a power of two between 1 and 8192
    #[arg(short = 'b', value_name = "BANDS", default_value_t = 4096)]
    pub bands: usize,

    /// Overlap factor, one of 0.5, 1, 2, 4
    #[arg(short = 'o', value_name = "OVERLAP", default_value_t = 1.0)]
    pub overlap: f64,

    /// Windowing function: hamming, vonhann, kaiser, sinc, triangle,
    /// ramp or rectangle
    #[arg(short = 'w', value_name = "WINDOW", default_value = "hamming")]
    pub window: String,

    /// Resynthesis gating amplitude in dB below 0; bands quieter than
    /// this are removed from the spectrum
    #[arg(long = "ga", value_name = "DB", default_value_t = 0.0, allow_hyphen_values = true)]
    pub gating_amplitude: f64,

    /// Resynthesis gating threshold in dB below each frame's loudest
    /// band; bands further down than this are removed
    #[arg(long = "gt", value_name = "DB", default_value_t = 0.0, allow_hyphen_values = true)]
    pub gating_threshold: f64,

    /// Suppress informational output
    #[arg(short = 'q')]
    pub quiet: bool,
}

/// Resolve the `-f` argument. A path that is not an existing directory
/// passes through untouched; an existing directory gets a generated
/// file name built from the input stem and the non-default parameters,
/// with dots stripped so the extension stays unambiguous.
pub fn resolve_output_path(
    output: &Path,
    operation: Operation,
    args: &ProcessArgs,
    phase_lock: bool,
) -> PathBuf {
    if !output.is_dir() {
        return output.to_path_buf();
    }

    let file_name = args
        .input
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("out");
    let (stem, extension) = match file_name.rfind('.') {
        Some(position) => file_name.split_at(position),
        None => (file_name, ""),
    };

    let operation_tag = match operation {
        Operation::TimeStretch => "t",
        Operation::PitchShift => "p",
    };

    let mut name = format!("{stem}-{operation_tag}s{}", args.scale);
    if args.overlap != 1.0 {
        name.push_str(&format!("-o{}", args.overlap));
    }
    if args.bands != 4096 {
        name.push_str(&format!("-b{}", args.bands));
    }
    if args.window != "hamming" {
        name.push_str(&format!("-{}", args.window));
    }
    if args.gating_amplitude != 0.0 {
        name.push_str(&format!("-ga{}", args.gating_amplitude.abs()));
    }
    if args.gating_threshold != 0.0 {
        name.push_str(&format!("-gt{}", args.gating_threshold.abs()));
    }
    if phase_lock {
        name.push_str("-p");
    }

    let name = name.replace('.', "");
    output.join(format!("{name}{extension}"))
}
