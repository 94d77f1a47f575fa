//! Synthetic banded observations.
//!
//! Used for demos and tests when no instrument data is at hand. Each band is a
//! run of equal-width, edge-contiguous bins over a flat continuum with a few
//! Gaussian absorption lines. Noise is Gaussian and proportional to the flux.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

use crate::domain::ObservedSpectrum;
use crate::error::PrepError;

/// Line depth is drawn from this range (fraction of the continuum).
const LINE_DEPTH: (f64, f64) = (0.05, 0.4);
/// Line width in bins.
const LINE_WIDTH_BINS: (f64, f64) = (1.0, 4.0);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthConfig {
    /// `(start, end)` of each band in microns, in any order.
    pub bands: Vec<(f64, f64)>,
    pub bins_per_band: usize,
    pub continuum: f64,
    pub lines_per_band: usize,
    /// Relative 1-sigma noise.
    pub noise: f64,
    pub seed: u64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            bands: vec![(1.10, 1.35), (1.45, 1.80), (1.95, 2.40)],
            bins_per_band: 200,
            continuum: 1.0e-15,
            lines_per_band: 5,
            noise: 0.02,
            seed: 42,
        }
    }
}

/// Generate a synthetic observation, bands sorted by wavelength.
pub fn generate_observation(config: &SynthConfig) -> Result<ObservedSpectrum, PrepError> {
    if config.bands.is_empty() || config.bins_per_band == 0 {
        return Err(PrepError::malformed("synthetic spectrum needs at least one band and one bin"));
    }
    if !(config.noise >= 0.0 && config.continuum > 0.0) {
        return Err(PrepError::malformed(format!(
            "invalid synthetic noise {} or continuum {}",
            config.noise, config.continuum
        )));
    }

    let mut bands = config.bands.clone();
    bands.sort_by(|a, b| a.0.total_cmp(&b.0));
    for pair in bands.windows(2) {
        if pair[1].0 <= pair[0].1 {
            return Err(PrepError::malformed(format!(
                "synthetic bands {:?} and {:?} touch or overlap",
                pair[0], pair[1]
            )));
        }
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let normal = Normal::new(0.0, 1.0).map_err(|e| PrepError::malformed(format!("noise distribution: {e}")))?;

    let mut series = ObservedSpectrum::empty(true);
    for &(start, end) in &bands {
        if !(end > start) {
            return Err(PrepError::malformed(format!("synthetic band ({start}, {end}) is empty")));
        }
        let n = config.bins_per_band;
        let width = (end - start) / n as f64;

        let lines: Vec<(f64, f64, f64)> = (0..config.lines_per_band)
            .map(|_| {
                let centre = rng.gen_range(0.0..n as f64);
                let depth = rng.gen_range(LINE_DEPTH.0..LINE_DEPTH.1);
                let sigma = rng.gen_range(LINE_WIDTH_BINS.0..LINE_WIDTH_BINS.1);
                (centre, depth, sigma)
            })
            .collect();

        // Edges come from a shared index so neighbours match exactly.
        let edge = |i: usize| start + width * i as f64;
        for i in 0..n {
            let x = i as f64 + 0.5;
            let absorption: f64 = lines
                .iter()
                .map(|(c, d, s)| d * (-0.5 * ((x - c) / s).powi(2)).exp())
                .sum();
            let clean = config.continuum * (1.0 - absorption).max(0.0);
            let sigma = config.noise * config.continuum;
            let flux = clean + sigma * normal.sample(&mut rng);

            series.wavelo.push(edge(i));
            series.wavehi.push(edge(i + 1));
            series.flux.push(flux);
            series.err.push(sigma);
            if let Some(lo) = series.err_lo.as_mut() {
                lo.push(sigma);
            }
        }
    }

    log::debug!(
        "generated {} synthetic bins across {} band(s)",
        series.len(),
        bands.len()
    );
    Ok(series)
}
