//! Shared preparation pipeline used by the CLI handlers and integration tests.
//!
//! Observation side:
//! read rows -> partition bands -> convolve -> bin down -> (normalize)
//!
//! Model side:
//! band limits + opacity header -> catalog choice -> grid slicing -> bin indices

use crate::domain::{Band, CalibrationSlack, NormalizeConfig, ObservedSpectrum, PrepConfig, RowSpan, SliceConfig};
use crate::error::PrepError;
use crate::io::{IngestedObservation, model_wavelengths, read_observations, teff_wavelengths};
use crate::retrieval::{data_wavelength_limits, select_default_opacity_table};
use crate::spectrum::{
    BinnedBands, FractionalBins, GridAlignment, align_model_grid, band_limits, bin_bands, calibration_sensitivity,
    convolve_bands, find_bands, fractional_bins, normalize_series, rebin_flux, shifted_bins,
};

/// All outputs of preparing one observation.
#[derive(Debug, Clone)]
pub struct PreparedObservation {
    pub raw: IngestedObservation,
    /// Bands of the raw series, before smoothing and binning.
    pub bands: Vec<Band>,
    pub binned: BinnedBands,
    pub normalized: Option<ObservedSpectrum>,
}

impl PreparedObservation {
    /// The final series: normalized if requested, otherwise binned.
    pub fn series(&self) -> &ObservedSpectrum {
        self.normalized.as_ref().unwrap_or(&self.binned.series)
    }

    pub fn spans(&self) -> &[RowSpan] {
        &self.binned.spans
    }
}

/// Read and prepare the observation named by `config`.
pub fn prepare_observation(config: &PrepConfig) -> Result<PreparedObservation, PrepError> {
    let raw = read_observations(&config.data_path)?;
    prepare_ingested(raw, config)
}

/// Prepare an already-read observation.
pub fn prepare_ingested(raw: IngestedObservation, config: &PrepConfig) -> Result<PreparedObservation, PrepError> {
    let bands = find_bands(&raw.series)?;
    log::info!("found {} band(s) in {} rows", bands.len(), raw.series.len());

    let smoothed = convolve_bands(&bands, config.dataconv)?;
    let binned = bin_bands(&smoothed, config.databin)?;
    log::info!(
        "binned by {} after convolving by {}: {} -> {} rows",
        config.databin,
        config.dataconv,
        raw.series.len(),
        binned.series.len()
    );

    let normalized = match &config.normalize {
        Some(norm) => {
            let ordered = ordered_spans(&binned.spans, norm)?;
            Some(normalize_series(&binned.series, &ordered)?)
        }
        None => None,
    };

    Ok(PreparedObservation {
        raw,
        bands,
        binned,
        normalized,
    })
}

/// Band spans in the order given by `norm.band_order` (natural order if empty).
fn ordered_spans(spans: &[RowSpan], norm: &NormalizeConfig) -> Result<Vec<RowSpan>, PrepError> {
    if norm.band_order.is_empty() {
        return Ok(spans.to_vec());
    }
    norm.band_order
        .iter()
        .map(|&b| {
            spans.get(b).copied().ok_or_else(|| {
                PrepError::malformed(format!(
                    "normalization band {b} does not exist ({} bands)",
                    spans.len()
                ))
            })
        })
        .collect()
}

/// All outputs of aligning the model grid to one observation.
#[derive(Debug, Clone)]
pub struct SliceRun {
    pub prepared: PreparedObservation,
    pub catalog: String,
    /// Wavelength range the default catalog can model, when one was chosen.
    pub usable: Option<(f64, f64)>,
    pub full_grid_len: usize,
    pub alignment: GridAlignment,
    /// Prepared observation bins on the sliced grid.
    pub bins: FractionalBins,
    /// Index change per 0.001 µm calibration offset; only computed when a
    /// calibration slack leaves room on the grid for the probe shift.
    pub sensitivity: Option<FractionalBins>,
    pub teff_grid: Option<Vec<f64>>,
}

/// Prepare the observation, slice the opacity grid to its bands and map its
/// bins onto the sliced grid.
pub fn align_model(config: &SliceConfig) -> Result<SliceRun, PrepError> {
    let prepared = prepare_observation(&config.prep)?;
    align_prepared(prepared, config)
}

pub fn align_prepared(prepared: PreparedObservation, config: &SliceConfig) -> Result<SliceRun, PrepError> {
    let raw = &prepared.raw.series;

    let (catalog, usable) = if config.catalog.is_empty() {
        let (wavei, wavef) = data_wavelength_limits(&raw.wavelo, &raw.wavehi, config.slack)?;
        let choice = select_default_opacity_table(wavei, wavef)?;
        log::info!("using default opacity catalog '{}'", choice.catalog);
        (choice.catalog.name().to_string(), Some(choice.usable))
    } else {
        (config.catalog.clone(), None)
    };

    let grid = model_wavelengths(&config.opacity_dir, &catalog, config.degrade)?;
    let limits = band_limits(&prepared.bands);
    let alignment = align_model_grid(&grid, &limits, config.slack)?;
    log::info!(
        "model grid sliced from {} to {} points",
        grid.len(),
        alignment.wavelengths.len()
    );

    let series = prepared.series();
    let bins = fractional_bins(&alignment.wavelengths, &series.wavelo, &series.wavehi)?;
    let sensitivity = if config.slack == CalibrationSlack::default() {
        None
    } else {
        Some(calibration_sensitivity(
            &alignment.wavelengths,
            &series.wavelo,
            &series.wavehi,
        )?)
    };

    let teff_grid = if config.with_teff {
        Some(teff_wavelengths(&config.opacity_dir)?)
    } else {
        None
    };

    Ok(SliceRun {
        full_grid_len: grid.len(),
        prepared,
        catalog,
        usable,
        alignment,
        bins,
        sensitivity,
        teff_grid,
    })
}

/// Bin a model spectrum computed on the sliced grid onto the observation bins,
/// with a wavelength-calibration offset of `delta` (in 0.001 µm units).
pub fn rebin_model(run: &SliceRun, model_flux: &[f64], delta: f64) -> Result<Vec<f64>, PrepError> {
    if model_flux.len() != run.alignment.wavelengths.len() {
        return Err(PrepError::malformed(format!(
            "model spectrum has {} samples but the sliced grid has {}",
            model_flux.len(),
            run.alignment.wavelengths.len()
        )));
    }
    if delta == 0.0 {
        return rebin_flux(model_flux, &run.bins);
    }
    let sensitivity = run.sensitivity.as_ref().ok_or_else(|| {
        PrepError::InvalidRange(format!(
            "calibration offset {delta} requested but the grid was sliced without calibration slack"
        ))
    })?;
    let bins = shifted_bins(&run.bins, sensitivity, delta);
    rebin_flux(model_flux, &bins)
}
