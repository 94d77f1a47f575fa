//! Polynomial continuum normalization.
//!
//! The fit is anchored at a pivot band: walking the band spans in the order the
//! caller supplies them, the pivot is the first band that starts before its
//! predecessor. Each band from the pivot onward contributes one point
//! `(centre wavelength, mean flux)`, and a polynomial of degree equal to the
//! number of those bands is fitted through them (minimum-norm, since the fit
//! has one more coefficient than points). Flux is divided by that polynomial.

use crate::domain::{ObservedSpectrum, RowSpan};
use crate::error::PrepError;
use crate::math::{Polynomial, polyfit};

/// Index of the first span whose start precedes the previous span's start.
pub fn find_pivot(spans: &[RowSpan]) -> Result<usize, PrepError> {
    (1..spans.len())
        .find(|&i| spans[i].start < spans[i - 1].start)
        .ok_or(PrepError::MissingPivot)
}

/// Fit the continuum through the bands in `spans` and return `values / p(wave)`.
pub fn normalize_by_polynomial(
    wave: &[f64],
    values: &[f64],
    spans: &[RowSpan],
) -> Result<Vec<f64>, PrepError> {
    let poly = fit_continuum(wave, values, spans)?;
    Ok(wave.iter().zip(values).map(|(w, v)| v / poly.eval(*w)).collect())
}

/// Polynomial through `(centre, mean)` of each span, degree = number of spans.
pub fn fit_continuum(wave: &[f64], values: &[f64], spans: &[RowSpan]) -> Result<Polynomial, PrepError> {
    if wave.len() != values.len() {
        return Err(PrepError::malformed(format!(
            "wavelength has {} values but flux has {}",
            wave.len(),
            values.len()
        )));
    }

    let mut centres = Vec::with_capacity(spans.len());
    let mut means = Vec::with_capacity(spans.len());
    for span in spans {
        if span.is_empty() || span.end > wave.len() {
            return Err(PrepError::malformed(format!(
                "normalization span {}..{} is empty or outside {} rows",
                span.start,
                span.end,
                wave.len()
            )));
        }
        centres.push((wave[span.start] + wave[span.end - 1]) / 2.0);
        let window = &values[span.start..span.end];
        means.push(window.iter().sum::<f64>() / window.len() as f64);
    }

    polyfit(&centres, &means, spans.len())
}

/// Normalize flux and errors of a concatenated series.
///
/// `spans` are the band row spans in the order used for the pivot search.
pub fn normalize_series(series: &ObservedSpectrum, spans: &[RowSpan]) -> Result<ObservedSpectrum, PrepError> {
    let pivot = find_pivot(spans)?;
    let fit_spans = &spans[pivot..];
    let wave = series.wavemid();

    log::info!(
        "normalizing with pivot band {pivot}, fitting {} band(s)",
        fit_spans.len()
    );

    let flux = normalize_by_polynomial(&wave, &series.flux, fit_spans)?;

    // TODO: confirm with the retrieval authors whether rows before the pivot
    // should really be normalized from the raw error column. Kept as-is: those
    // rows carry errors, the rest carry flux, and the continuum is refit on
    // the spliced array.
    let split = fit_spans[0].start.min(series.len());
    let spliced: Vec<f64> = series.err[..split]
        .iter()
        .chain(&series.flux[split..])
        .copied()
        .collect();
    let err = normalize_by_polynomial(&wave, &spliced, fit_spans)?;

    Ok(ObservedSpectrum {
        wavelo: series.wavelo.clone(),
        wavehi: series.wavehi.clone(),
        flux,
        err,
        err_lo: None,
    })
}
