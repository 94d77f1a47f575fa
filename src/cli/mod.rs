//! Command-line parsing for `specslice`.
//!
//! Argument parsing and command dispatch stay separate from the spectral code:
//! this module only describes the arguments, `app` turns them into config
//! structs and runs the pipeline.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "specslice", version, about = "Prepare observed and model spectra for retrievals")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Partition, smooth, bin and optionally normalize an observation.
    Bands(PrepArgs),
    /// Slice the opacity grid down to the bands of an observation.
    Slice(SliceArgs),
    /// Write a synthetic banded observation file.
    Synth(SynthArgs),
    /// Print the walker count a sampler would use.
    Walkers(WalkerArgs),
}

/// Observation preparation options.
#[derive(Debug, Args, Clone)]
pub struct PrepArgs {
    /// Observation file (whitespace-delimited rows).
    pub data: PathBuf,

    /// Gaussian convolution factor in bins (1 disables).
    #[arg(long = "conv", default_value_t = 1.0)]
    pub dataconv: f64,

    /// Bin-down factor (1 disables).
    #[arg(long = "bin", default_value_t = 1.0)]
    pub databin: f64,

    /// Normalize the continuum with a polynomial fit.
    #[arg(long)]
    pub normalize: bool,

    /// Band indices, comma separated, in the order the normalization pivot is
    /// searched (e.g. `0,2,1`).
    #[arg(long, value_delimiter = ',', requires = "normalize")]
    pub band_order: Vec<usize>,

    /// Export the prepared observation (`.csv` for a table, JSON otherwise).
    #[arg(long)]
    pub export: Option<PathBuf>,
}

/// Grid slicing options.
#[derive(Debug, Args, Clone)]
pub struct SliceArgs {
    #[command(flatten)]
    pub prep: PrepArgs,

    /// Opacity directory (falls back to `SPECSLICE_OPACITY_DIR`).
    #[arg(long)]
    pub opacity_dir: Option<PathBuf>,

    /// High-resolution catalog; picks nir/wide/mir from the data when omitted.
    #[arg(long, default_value = "")]
    pub catalog: String,

    /// Model grid degrade factor.
    #[arg(long, default_value_t = 1.0)]
    pub degrade: f64,

    /// Lower bound of the wavelength-calibration offset (nm).
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub delta_l_min: f64,

    /// Upper bound of the wavelength-calibration offset (nm).
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub delta_l_max: f64,

    /// Also read the low-resolution effective-temperature grid.
    #[arg(long)]
    pub teff: bool,

    /// Export the grid alignment and bin indices as JSON.
    #[arg(long)]
    pub export_slice: Option<PathBuf>,
}

/// Synthetic observation options.
#[derive(Debug, Args, Clone)]
pub struct SynthArgs {
    /// Output observation file.
    pub out: PathBuf,

    /// Band as `START:END` in microns (repeatable).
    #[arg(long = "band", value_parser = parse_band)]
    pub bands: Vec<(f64, f64)>,

    /// Bins per band.
    #[arg(long, default_value_t = 200)]
    pub bins: usize,

    /// Absorption lines per band.
    #[arg(long, default_value_t = 5)]
    pub lines: usize,

    /// Relative 1-sigma noise.
    #[arg(long, default_value_t = 0.02)]
    pub noise: f64,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Walker count options.
#[derive(Debug, Args, Clone)]
pub struct WalkerArgs {
    /// Sampler name (`emcee` or `dynesty`).
    #[arg(long, default_value = "emcee")]
    pub sampler: String,

    /// Number of free parameters.
    #[arg(long)]
    pub ndim: usize,

    /// Requested walkers (0 picks the default).
    #[arg(long, default_value_t = 0)]
    pub nwalkers: usize,

    /// Quick-check run: minimum walkers and a couple of steps.
    #[arg(long = "override")]
    pub override_run: bool,
}

fn parse_band(raw: &str) -> Result<(f64, f64), String> {
    let (lo, hi) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected START:END, got '{raw}'"))?;
    let lo: f64 = lo.trim().parse().map_err(|_| format!("invalid band start '{lo}'"))?;
    let hi: f64 = hi.trim().parse().map_err(|_| format!("invalid band end '{hi}'"))?;
    if !(hi > lo) {
        return Err(format!("band end {hi} must exceed start {lo}"));
    }
    Ok((lo, hi))
}
