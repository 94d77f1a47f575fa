//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - resolves configuration (CLI flags, then `.env` / environment)
//! - runs the preparation pipeline
//! - prints summaries and writes optional exports

use std::path::{Path, PathBuf};

use clap::Parser;

use crate::cli::{Command, PrepArgs, SliceArgs, SynthArgs, WalkerArgs};
use crate::data::{SynthConfig, generate_observation};
use crate::domain::{CalibrationSlack, NormalizeConfig, PrepConfig, RetrievalParameter, SliceConfig};
use crate::error::AppError;
use crate::io::{GridSliceFile, PreparedObservationFile, write_json, write_observation_rows, write_series_csv};
use crate::retrieval::{SamplerOverrides, SamplerSettings, calibration_slack, walker_count};

pub mod pipeline;

/// Environment variable naming the default opacity directory.
pub const OPACITY_DIR_ENV: &str = "SPECSLICE_OPACITY_DIR";

/// Entry point for the `specslice` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Bands(args) => handle_bands(args),
        Command::Slice(args) => handle_slice(args),
        Command::Synth(args) => handle_synth(args),
        Command::Walkers(args) => handle_walkers(args),
    }
}

fn handle_bands(args: PrepArgs) -> Result<(), AppError> {
    let config = prep_config_from_args(&args);
    let prepared = pipeline::prepare_observation(&config)?;

    println!("{}", crate::report::format_prep_summary(&prepared, &config));

    if let Some(path) = &config.export {
        export_prepared(path, &prepared, &config)?;
    }
    Ok(())
}

fn handle_slice(args: SliceArgs) -> Result<(), AppError> {
    let config = slice_config_from_args(&args)?;
    let run = pipeline::align_model(&config)?;

    println!("{}", crate::report::format_prep_summary(&run.prepared, &config.prep));
    println!("{}", crate::report::format_slice_summary(&run));

    if let Some(path) = &config.prep.export {
        export_prepared(path, &run.prepared, &config.prep)?;
    }
    if let Some(path) = &config.export {
        let file = GridSliceFile::new(
            run.catalog.clone(),
            config.degrade,
            config.slack,
            run.alignment.clone(),
            run.bins.clone(),
            run.sensitivity.clone(),
        );
        write_json(path, &file)?;
    }
    Ok(())
}

fn handle_synth(args: SynthArgs) -> Result<(), AppError> {
    let config = synth_config_from_args(&args);
    let series = generate_observation(&config)?;
    write_observation_rows(&args.out, &series)?;
    println!(
        "Wrote {} bins in {} band(s) to {}",
        series.len(),
        config.bands.len(),
        args.out.display()
    );
    Ok(())
}

fn handle_walkers(args: WalkerArgs) -> Result<(), AppError> {
    let walkers = walker_count(&args.sampler, args.ndim, args.nwalkers, args.override_run)?;
    let mut settings = SamplerSettings {
        nwalkers: walkers,
        ..SamplerSettings::default()
    };
    if args.override_run {
        settings = SamplerOverrides::default().apply(settings);
    }
    println!(
        "sampler={} ndim={} walkers={} nsteps={} parallel={} printfull={}",
        args.sampler, args.ndim, settings.nwalkers, settings.nsteps, settings.parallel, settings.printfull
    );
    Ok(())
}

fn export_prepared(path: &Path, prepared: &pipeline::PreparedObservation, config: &PrepConfig) -> Result<(), AppError> {
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if is_csv {
        write_series_csv(path, prepared.series())?;
    } else {
        let file = PreparedObservationFile::new(
            config.dataconv,
            config.databin,
            prepared.normalized.is_some(),
            prepared.spans().to_vec(),
            prepared.series().clone(),
        );
        write_json(path, &file)?;
    }
    Ok(())
}

pub fn prep_config_from_args(args: &PrepArgs) -> PrepConfig {
    PrepConfig {
        data_path: args.data.clone(),
        dataconv: args.dataconv,
        databin: args.databin,
        normalize: args.normalize.then(|| NormalizeConfig {
            band_order: args.band_order.clone(),
        }),
        export: args.export.clone(),
    }
}

pub fn slice_config_from_args(args: &SliceArgs) -> Result<SliceConfig, AppError> {
    let opacity_dir = resolve_opacity_dir(args.opacity_dir.as_deref())?;
    Ok(SliceConfig {
        prep: prep_config_from_args(&args.prep),
        opacity_dir,
        catalog: args.catalog.clone(),
        degrade: args.degrade,
        slack: slack_from_bounds(args.delta_l_min, args.delta_l_max),
        with_teff: args.teff,
        export: args.export_slice.clone(),
    })
}

pub fn synth_config_from_args(args: &SynthArgs) -> SynthConfig {
    let defaults = SynthConfig::default();
    SynthConfig {
        bands: if args.bands.is_empty() { defaults.bands } else { args.bands.clone() },
        bins_per_band: args.bins,
        continuum: defaults.continuum,
        lines_per_band: args.lines,
        noise: args.noise,
        seed: args.seed,
    }
}

/// CLI flag first, then `SPECSLICE_OPACITY_DIR` (a `.env` file is honoured).
fn resolve_opacity_dir(flag: Option<&Path>) -> Result<PathBuf, AppError> {
    if let Some(dir) = flag {
        return Ok(dir.to_path_buf());
    }
    dotenvy::dotenv().ok();
    std::env::var(OPACITY_DIR_ENV)
        .map(PathBuf::from)
        .map_err(|_| AppError::new(2, format!("No opacity directory: pass --opacity-dir or set {OPACITY_DIR_ENV} (.env).")))
}

/// `deltaL` bounds in nm; both zero means no calibration offset is fitted.
fn slack_from_bounds(min_nm: f64, max_nm: f64) -> CalibrationSlack {
    if min_nm == 0.0 && max_nm == 0.0 {
        return calibration_slack(None);
    }
    let delta_l = RetrievalParameter {
        name: "deltaL".to_string(),
        value: 0.0,
        guess: 0.0,
        mu: 0.0,
        sigma: 1.0,
        bounds: (min_nm, max_nm),
    };
    calibration_slack(Some(&delta_l))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slack_from_cli_bounds() {
        assert_eq!(slack_from_bounds(0.0, 0.0), CalibrationSlack::default());
        let s = slack_from_bounds(-5.0, 5.0);
        assert!((s.min_dl + 0.005).abs() < 1e-15);
        assert!((s.max_dl - 0.005).abs() < 1e-15);
    }

    #[test]
    fn explicit_opacity_dir_wins() {
        let dir = resolve_opacity_dir(Some(Path::new("/opac"))).unwrap();
        assert_eq!(dir, PathBuf::from("/opac"));
    }

    #[test]
    fn prep_config_carries_band_order() {
        let cli = crate::cli::Cli::parse_from(["specslice", "bands", "obs.dat", "--normalize", "--band-order", "1,0"]);
        let Command::Bands(args) = cli.command else {
            panic!("expected bands");
        };
        let config = prep_config_from_args(&args);
        assert_eq!(config.normalize.unwrap().band_order, vec![1, 0]);
        assert!(config.export.is_none());
    }
}
