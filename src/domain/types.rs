//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - passed between pipeline stages as owned values
//! - exported to JSON
//! - reloaded later for inspection or comparisons

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::PrepError;

/// One wavelength interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WavelengthBin {
    pub start: f64,
    pub end: f64,
}

impl WavelengthBin {
    pub fn mid(&self) -> f64 {
        (self.start + self.end) / 2.0
    }

    pub fn width(&self) -> f64 {
        self.end - self.start
    }
}

/// Wavelength-binned observation: parallel arrays, one entry per bin.
///
/// `err` is the symmetric (or upper) uncertainty. Two-sided inputs also carry
/// `err_lo`, which every stage transforms alongside `err`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedSpectrum {
    pub wavelo: Vec<f64>,
    pub wavehi: Vec<f64>,
    pub flux: Vec<f64>,
    pub err: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err_lo: Option<Vec<f64>>,
}

impl ObservedSpectrum {
    /// Build a series, checking that all columns have the same length.
    pub fn new(
        wavelo: Vec<f64>,
        wavehi: Vec<f64>,
        flux: Vec<f64>,
        err: Vec<f64>,
    ) -> Result<Self, PrepError> {
        let n = wavelo.len();
        if wavehi.len() != n || flux.len() != n || err.len() != n {
            return Err(PrepError::malformed(format!(
                "column lengths differ: wavelo={n}, wavehi={}, flux={}, err={}",
                wavehi.len(),
                flux.len(),
                err.len()
            )));
        }
        Ok(Self {
            wavelo,
            wavehi,
            flux,
            err,
            err_lo: None,
        })
    }

    /// Attach a lower uncertainty column (two-sided errors).
    pub fn with_err_lo(mut self, err_lo: Vec<f64>) -> Result<Self, PrepError> {
        if err_lo.len() != self.len() {
            return Err(PrepError::malformed(format!(
                "err_lo has {} values but the series has {}",
                err_lo.len(),
                self.len()
            )));
        }
        self.err_lo = Some(err_lo);
        Ok(self)
    }

    /// An empty series, used as the seed when concatenating bands.
    pub fn empty(two_sided: bool) -> Self {
        Self {
            wavelo: Vec::new(),
            wavehi: Vec::new(),
            flux: Vec::new(),
            err: Vec::new(),
            err_lo: two_sided.then(Vec::new),
        }
    }

    pub fn len(&self) -> usize {
        self.wavelo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelo.is_empty()
    }

    pub fn bin(&self, i: usize) -> WavelengthBin {
        WavelengthBin {
            start: self.wavelo[i],
            end: self.wavehi[i],
        }
    }

    /// Bin midpoints.
    pub fn wavemid(&self) -> Vec<f64> {
        self.wavelo
            .iter()
            .zip(&self.wavehi)
            .map(|(lo, hi)| (lo + hi) / 2.0)
            .collect()
    }

    /// Owned copy of rows `span.start..span.end`.
    pub fn slice(&self, span: RowSpan) -> Self {
        let r = span.start..span.end;
        Self {
            wavelo: self.wavelo[r.clone()].to_vec(),
            wavehi: self.wavehi[r.clone()].to_vec(),
            flux: self.flux[r.clone()].to_vec(),
            err: self.err[r.clone()].to_vec(),
            err_lo: self.err_lo.as_ref().map(|e| e[r].to_vec()),
        }
    }

    /// Append all rows of `other` (which must have the same error layout).
    pub fn extend_from(&mut self, other: &ObservedSpectrum) {
        self.wavelo.extend_from_slice(&other.wavelo);
        self.wavehi.extend_from_slice(&other.wavehi);
        self.flux.extend_from_slice(&other.flux);
        self.err.extend_from_slice(&other.err);
        if let (Some(dst), Some(src)) = (self.err_lo.as_mut(), other.err_lo.as_ref()) {
            dst.extend_from_slice(src);
        }
    }

    /// Integrated flux in CGS, with wavelengths in microns: `Σ f·Δλ·1e-4`.
    pub fn total_flux_cgs(&self) -> f64 {
        const UM_TO_CM: f64 = 1.0e-4;
        self.flux
            .iter()
            .zip(self.wavelo.iter().zip(&self.wavehi))
            .map(|(f, (lo, hi))| f * (hi - lo) * UM_TO_CM)
            .sum()
    }
}

/// Row range `[start, end)` of a band inside its parent series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowSpan {
    pub start: usize,
    pub end: usize,
}

impl RowSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Span from an inclusive `(first_row, last_row)` pair.
    pub fn from_inclusive(first_row: usize, last_row: usize) -> Self {
        Self {
            start: first_row,
            end: last_row + 1,
        }
    }

    pub fn first_row(&self) -> usize {
        self.start
    }

    /// Inclusive last row. Only meaningful for non-empty spans.
    pub fn last_row(&self) -> usize {
        self.end.saturating_sub(1)
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// A maximal run of edge-contiguous bins, owned, with its position in the parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub rows: RowSpan,
    pub data: ObservedSpectrum,
}

impl Band {
    /// `(wavelo[first], wavehi[last])`.
    pub fn limits(&self) -> (f64, f64) {
        let lo = self.data.wavelo.first().copied().unwrap_or(f64::NAN);
        let hi = self.data.wavehi.last().copied().unwrap_or(f64::NAN);
        (lo, hi)
    }
}

/// Index range `[start_index, end_index)` into a flat wavelength grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexWindow {
    pub start_index: usize,
    pub end_index: usize,
}

impl IndexWindow {
    pub fn len(&self) -> usize {
        self.end_index.saturating_sub(self.start_index)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Where each window's samples live inside the compact sliced grid.
///
/// `offsets[i]` is `[out_start, out_end)` for the i-th window in window-start order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRemap {
    pub offsets: Vec<RowSpan>,
}

/// Wavelength-calibration slack added to band edges before slicing the grid.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CalibrationSlack {
    pub min_dl: f64,
    pub max_dl: f64,
}

/// A retrieval parameter as handed over by the sampler setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalParameter {
    pub name: String,
    pub value: f64,
    pub guess: f64,
    pub mu: f64,
    pub sigma: f64,
    pub bounds: (f64, f64),
}

/// Resolution settings for the observation side of the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepConfig {
    pub data_path: PathBuf,
    /// Gaussian convolution factor in bins (`<= 1` disables).
    pub dataconv: f64,
    /// Bin-down factor (`<= 1` disables).
    pub databin: f64,
    /// Continuum normalization, if requested.
    pub normalize: Option<NormalizeConfig>,
    pub export: Option<PathBuf>,
}

/// Band ordering used to locate the normalization pivot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeConfig {
    /// Indices of bands (in wavelength order) listed in the order the pivot
    /// search should walk them. Empty means natural order.
    pub band_order: Vec<usize>,
}

/// Settings for aligning the opacity grid to the observed bands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SliceConfig {
    /// How the observation is prepared before its bins are mapped onto the grid.
    pub prep: PrepConfig,
    pub opacity_dir: PathBuf,
    /// High-resolution opacity catalog name (e.g. `nir`); empty picks a default.
    pub catalog: String,
    pub degrade: f64,
    pub slack: CalibrationSlack,
    /// Also read the low-resolution grid used for the effective temperature.
    pub with_teff: bool,
    pub export: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatched_columns_are_rejected() {
        let err = ObservedSpectrum::new(vec![1.0, 2.0], vec![2.0], vec![0.0, 0.0], vec![0.0, 0.0]);
        assert!(matches!(err, Err(PrepError::MalformedInput(_))));
    }

    #[test]
    fn row_span_inclusive_view() {
        let span = RowSpan::from_inclusive(2, 3);
        assert_eq!(span, RowSpan::new(2, 4));
        assert_eq!(span.first_row(), 2);
        assert_eq!(span.last_row(), 3);
        assert_eq!(span.len(), 2);
    }

    #[test]
    fn total_flux_uses_bin_widths_in_cm() {
        let s = ObservedSpectrum::new(vec![1.0, 2.0], vec![2.0, 4.0], vec![1.0, 3.0], vec![0.1, 0.1])
            .unwrap();
        // (1*1 + 3*2) * 1e-4
        assert!((s.total_flux_cgs() - 7.0e-4).abs() < 1e-15);
    }
}
