//! Observation-side bin-down with fractional pixel edges.
//!
//! For a factor `w`, output bin `j` covers source pixels `[j·w, (j+1)·w)`. The
//! fully covered pixels are summed; the two partially covered boundary pixels
//! contribute in proportion to their overlap. A boundary that falls exactly on a
//! pixel edge is nudged by `1e-6`, so every bin keeps a (tiny) weight on both
//! boundary pixels rather than a degenerate zero-weight edge.
//!
//! Flux is divided by `w`. Errors are divided by `w` and again by `sqrt(w - 1)`.

use crate::domain::{Band, ObservedSpectrum, RowSpan};
use crate::error::PrepError;

/// Nudge applied to bin bounds that land exactly on an integer.
const EDGE_NUDGE: f64 = 1e-6;

/// Binned series plus the row span each band occupies in it.
#[derive(Debug, Clone, PartialEq)]
pub struct BinnedBands {
    pub series: ObservedSpectrum,
    pub spans: Vec<RowSpan>,
}

#[derive(Debug, Clone, Copy)]
struct FractionalBound {
    index: f64,
    frac: f64,
}

impl FractionalBound {
    fn new(index: f64) -> Self {
        let frac = index.fract();
        if frac == 0.0 {
            Self {
                index: index + EDGE_NUDGE,
                frac: EDGE_NUDGE,
            }
        } else {
            Self { index, frac }
        }
    }

    fn floor(&self) -> usize {
        self.index.floor() as usize
    }

    fn ceil(&self) -> usize {
        self.index.ceil() as usize
    }
}

/// Bin every band by `factor` and concatenate the results in band order.
///
/// `factor <= 1` concatenates the bands unchanged.
pub fn bin_bands(bands: &[Band], factor: f64) -> Result<BinnedBands, PrepError> {
    if bands.is_empty() {
        return Err(PrepError::malformed("no bands to bin"));
    }
    if !factor.is_finite() {
        return Err(PrepError::malformed(format!("bin-down factor must be finite, got {factor}")));
    }

    let two_sided = bands[0].data.err_lo.is_some();
    let mut series = ObservedSpectrum::empty(two_sided);
    let mut spans = Vec::with_capacity(bands.len());

    for band in bands {
        let start = series.len();
        if factor <= 1.0 {
            series.extend_from(&band.data);
        } else {
            series.extend_from(&bin_spectrum(&band.data, factor)?);
        }
        spans.push(RowSpan::new(start, series.len()));
    }

    Ok(BinnedBands { series, spans })
}

/// Bin one band's flux, errors and edges by `factor > 1`.
pub fn bin_spectrum(band: &ObservedSpectrum, factor: f64) -> Result<ObservedSpectrum, PrepError> {
    if factor <= 1.0 {
        return Err(PrepError::malformed(format!("bin-down factor must exceed 1, got {factor}")));
    }

    let n = band.len();
    let out_len = (n as f64 / factor).floor() as usize;
    let err_scale = factor * (factor - 1.0).sqrt();

    let mut out = ObservedSpectrum::empty(band.err_lo.is_some());
    for j in 0..out_len {
        let lo = FractionalBound::new(j as f64 * factor);
        let hi = FractionalBound::new((j + 1) as f64 * factor);

        out.wavelo.push(lower_edge(&band.wavelo, lo));
        out.wavehi.push(upper_edge(&band.wavehi, hi));
        out.flux.push(weighted_sum(&band.flux, lo, hi) / factor);
        out.err.push(weighted_sum(&band.err, lo, hi) / err_scale);
        if let (Some(dst), Some(src)) = (out.err_lo.as_mut(), band.err_lo.as_ref()) {
            dst.push(weighted_sum(src, lo, hi) / err_scale);
        }
    }
    Ok(out)
}

/// Interior pixels in full, boundary pixels by their covered fraction.
fn weighted_sum(values: &[f64], lo: FractionalBound, hi: FractionalBound) -> f64 {
    let interior_end = hi.floor().min(values.len());
    let interior_start = lo.ceil().min(interior_end);
    let mut total: f64 = values[interior_start..interior_end].iter().sum();

    total += (1.0 - lo.frac) * values[lo.floor()];
    if let Some(v) = values.get(hi.floor()) {
        total += hi.frac * v;
    }
    total
}

fn lower_edge(wavelo: &[f64], lo: FractionalBound) -> f64 {
    let i = lo.floor();
    let base = (1.0 - lo.frac) * wavelo[i];
    if i == wavelo.len() - 1 {
        base
    } else {
        base + lo.frac * wavelo[i + 1]
    }
}

fn upper_edge(wavehi: &[f64], hi: FractionalBound) -> f64 {
    let i = hi.floor();
    let base = (1.0 - hi.frac) * wavehi[i - 1];
    if i == wavehi.len() {
        base
    } else {
        base + hi.frac * wavehi[i]
    }
}
