//! Model-side rebinning onto observation bins.
//!
//! The model spectrum comes back from the physics engine on the (sliced) model
//! grid. To compare it against the observation we:
//!
//! 1. express each observation bin edge as a fractional index into the model
//!    grid (`fractional_bins`);
//! 2. integrate the model over that fractional range (`rebin_flux`).
//!
//! Fractional indices are one-based: the interval `[specwave[j-1], specwave[j])`
//! maps onto `[j, j+1)`.
//!
//! A wavelength-calibration offset is fitted by shifting these indices rather
//! than rebuilding the grid. `calibration_sensitivity` gives the index change
//! for a grid shift of `CALIBRATION_PROBE` microns.

use serde::{Deserialize, Serialize};

use crate::error::PrepError;

/// Grid shift used to probe index sensitivity to a calibration offset.
pub const CALIBRATION_PROBE: f64 = 0.001;

/// Fractional lower/upper indices of each observation bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FractionalBins {
    pub lo: Vec<f64>,
    pub hi: Vec<f64>,
}

impl FractionalBins {
    pub fn len(&self) -> usize {
        self.lo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lo.is_empty()
    }

    pub fn widths(&self) -> Vec<f64> {
        self.hi.iter().zip(&self.lo).map(|(h, l)| h - l).collect()
    }
}

/// Fractional bin indices of `obslo`/`obshi` on `specwave`.
pub fn fractional_bins(
    specwave: &[f64],
    obslo: &[f64],
    obshi: &[f64],
) -> Result<FractionalBins, PrepError> {
    if obslo.len() != obshi.len() {
        return Err(PrepError::malformed(format!(
            "obslo has {} values but obshi has {}",
            obslo.len(),
            obshi.len()
        )));
    }

    let mut lo = Vec::with_capacity(obslo.len());
    let mut hi = Vec::with_capacity(obshi.len());
    for (&l, &h) in obslo.iter().zip(obshi) {
        let j = specwave.iter().position(|&w| l < w);
        lo.push(interpolate_index(specwave, j, l)?);
        let j = specwave.iter().position(|&w| h <= w);
        hi.push(interpolate_index(specwave, j, h)?);
    }
    Ok(FractionalBins { lo, hi })
}

fn interpolate_index(specwave: &[f64], j: Option<usize>, x: f64) -> Result<f64, PrepError> {
    match j {
        Some(j) if j > 0 => {
            let w0 = specwave[j - 1];
            let w1 = specwave[j];
            Ok(j as f64 + (x - w0) / (w1 - w0))
        }
        _ => Err(PrepError::InvalidRange(format!(
            "observation edge {x} lies outside the model grid [{:?}, {:?}]",
            specwave.first(),
            specwave.last()
        ))),
    }
}

/// Change in fractional indices when the grid shifts by `CALIBRATION_PROBE`.
pub fn calibration_sensitivity(
    specwave: &[f64],
    obslo: &[f64],
    obshi: &[f64],
) -> Result<FractionalBins, PrepError> {
    let base = fractional_bins(specwave, obslo, obshi)?;
    let shifted: Vec<f64> = specwave.iter().map(|w| w + CALIBRATION_PROBE).collect();
    let probe = fractional_bins(&shifted, obslo, obshi)?;

    Ok(FractionalBins {
        lo: probe.lo.iter().zip(&base.lo).map(|(p, b)| p - b).collect(),
        hi: probe.hi.iter().zip(&base.hi).map(|(p, b)| p - b).collect(),
    })
}

/// Apply a calibration offset of `delta` probe units to precomputed indices.
pub fn shifted_bins(bins: &FractionalBins, sensitivity: &FractionalBins, delta: f64) -> FractionalBins {
    FractionalBins {
        lo: bins.lo.iter().zip(&sensitivity.lo).map(|(b, s)| b + delta * s).collect(),
        hi: bins.hi.iter().zip(&sensitivity.hi).map(|(b, s)| b + delta * s).collect(),
    }
}

/// Mean model flux over each fractional bin.
///
/// Interior samples count in full, the sample holding `lo` by `1 - frac(lo)`
/// and the sample holding `hi` by `frac(hi)`; the sum is divided by `hi - lo`.
/// A zero-width first (last) bin borrows the width of its neighbour.
pub fn rebin_flux(flux: &[f64], bins: &FractionalBins) -> Result<Vec<f64>, PrepError> {
    let widths = bins.widths();
    let n = bins.len();
    let mut out = Vec::with_capacity(n);

    for i in 0..n {
        let (lo, hi) = (bins.lo[i], bins.hi[i]);
        if !(lo >= 0.0 && hi >= lo) {
            return Err(PrepError::malformed(format!(
                "bin {i} has invalid fractional range [{lo}, {hi}]"
            )));
        }
        let lo_floor = lo.floor() as usize;
        let hi_floor = hi.floor() as usize;
        if lo_floor >= flux.len() {
            return Err(PrepError::InvalidRange(format!(
                "bin {i} starts at index {lo} beyond the model spectrum ({} samples)",
                flux.len()
            )));
        }

        // Samples strictly after the lower boundary sample; for a non-integer
        // `lo` this is `ceil(lo)`, for an integer one it avoids counting
        // `flux[lo]` twice.
        let interior_end = hi_floor.min(flux.len());
        let interior_start = (lo_floor + 1).min(interior_end);
        let mut total: f64 = flux[interior_start..interior_end].iter().sum();
        total += (1.0 - lo.fract()) * flux[lo_floor];
        if let Some(v) = flux.get(hi_floor) {
            total += hi.fract() * v;
        }

        let width = match widths[i] {
            w if w != 0.0 => w,
            _ if i == 0 && n > 1 => widths[1],
            _ if i == n - 1 && n > 1 => widths[n - 2],
            _ => {
                return Err(PrepError::malformed(format!("bin {i} has zero width")));
            }
        };
        out.push(total / width);
    }
    Ok(out)
}

/// Model flux linearly interpolated at each of `bin_wave`.
///
/// `model_wave` must be strictly ascending. Points outside it are an
/// [`PrepError::InvalidRange`]; there is no extrapolation.
pub fn interpolate_model(model_wave: &[f64], model_flux: &[f64], bin_wave: &[f64]) -> Result<Vec<f64>, PrepError> {
    if model_wave.len() != model_flux.len() {
        return Err(PrepError::malformed(format!(
            "{} model wavelengths but {} flux values",
            model_wave.len(),
            model_flux.len()
        )));
    }
    if model_wave.len() < 2 {
        return Err(PrepError::malformed("interpolation needs at least two model points"));
    }
    if !model_wave.windows(2).all(|p| p[0] < p[1]) {
        return Err(PrepError::malformed("model wavelengths are not strictly ascending"));
    }
    let (first, last) = (model_wave[0], model_wave[model_wave.len() - 1]);

    bin_wave
        .iter()
        .map(|&w| {
            if !(w >= first && w <= last) {
                return Err(PrepError::InvalidRange(format!(
                    "wavelength {w} is outside the model grid [{first}, {last}]"
                )));
            }
            // Index of the upper neighbour, in 1..len.
            let j = model_wave.partition_point(|&m| m < w).max(1);
            let (x0, x1) = (model_wave[j - 1], model_wave[j]);
            let t = (w - x0) / (x1 - x0);
            Ok(model_flux[j - 1] + t * (model_flux[j] - model_flux[j - 1]))
        })
        .collect()
}
