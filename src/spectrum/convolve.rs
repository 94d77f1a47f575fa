//! Gaussian smoothing of band values.
//!
//! Emulates a finite instrument resolution. For a convolution factor `k`
//! (in bins) the kernel spans `6k` bins with `σ = k / 2.35` (FWHM → σ).
//! When `6k` is not an integer, the sample positions are shifted by its
//! fractional part.
//!
//! Edges use implicit zero padding, so the outermost bins are attenuated.

use crate::domain::{Band, ObservedSpectrum};
use crate::error::PrepError;

const KERNEL_WIDTH_FACTOR: f64 = 6.0;
const FWHM_TO_SIGMA: f64 = 2.35;
/// Largest convolution factor accepted; its kernel spans 600k bins.
pub const MAX_CONVOLUTION_FACTOR: f64 = 1.0e5;

/// Normalised Gaussian kernel for factor `k`, or `None` when it would be empty
/// or `k` is outside `(0, MAX_CONVOLUTION_FACTOR]`.
pub fn gaussian_kernel(k: f64) -> Option<Vec<f64>> {
    if !(k <= MAX_CONVOLUTION_FACTOR) {
        return None;
    }
    let width = k * KERNEL_WIDTH_FACTOR;
    let stdev = k / FWHM_TO_SIGMA;
    let whole = width.trunc();
    let remainder = width - whole;
    if !(whole >= 1.0) {
        return None;
    }

    let len = whole as usize;
    let mut kernel: Vec<f64> = (0..len)
        .map(|i| {
            let x = i as f64 + remainder - width / 2.0;
            (-0.5 * (x / stdev).powi(2)).exp()
        })
        .collect();
    let total: f64 = kernel.iter().sum();
    kernel.iter_mut().for_each(|v| *v /= total);
    Some(kernel)
}

/// Convolve `values` with a Gaussian of factor `k`. `k <= 1` returns the input.
pub fn convolve_values(values: &[f64], k: f64) -> Vec<f64> {
    if k <= 1.0 {
        return values.to_vec();
    }
    match gaussian_kernel(k) {
        Some(kernel) => convolve_same(values, &kernel),
        None => values.to_vec(),
    }
}

/// Discrete convolution, centred, output length equal to `values.len()`.
///
/// Sample `i` of the output is sample `i + (m-1)/2` of the full convolution,
/// where `m` is the kernel length; out-of-range inputs count as zero.
pub fn convolve_same(values: &[f64], kernel: &[f64]) -> Vec<f64> {
    let n = values.len() as isize;
    let m = kernel.len() as isize;
    let offset = (m - 1) / 2;

    (0..n)
        .map(|i| {
            let k = i + offset;
            let j_lo = (k - m + 1).max(0);
            let j_hi = k.min(n - 1);
            (j_lo..=j_hi)
                .map(|j| values[j as usize] * kernel[(k - j) as usize])
                .sum()
        })
        .collect()
}

/// Smooth flux and uncertainties of every band with the same kernel.
///
/// Errors are convolved like flux. This is a smoothing of the error curve, not
/// a propagation of variances. A factor that is not finite or exceeds
/// [`MAX_CONVOLUTION_FACTOR`] is rejected.
pub fn convolve_bands(bands: &[Band], k: f64) -> Result<Vec<Band>, PrepError> {
    if !k.is_finite() {
        return Err(PrepError::malformed(format!("convolution factor must be finite, got {k}")));
    }
    if k > MAX_CONVOLUTION_FACTOR {
        return Err(PrepError::malformed(format!(
            "convolution factor {k} exceeds the limit of {MAX_CONVOLUTION_FACTOR}"
        )));
    }
    if k <= 1.0 {
        return Ok(bands.to_vec());
    }
    Ok(bands
        .iter()
        .map(|band| Band {
            rows: band.rows,
            data: ObservedSpectrum {
                wavelo: band.data.wavelo.clone(),
                wavehi: band.data.wavehi.clone(),
                flux: convolve_values(&band.data.flux, k),
                err: convolve_values(&band.data.err, k),
                err_lo: band.data.err_lo.as_deref().map(|e| convolve_values(e, k)),
            },
        })
        .collect())
}
