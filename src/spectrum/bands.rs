//! Band partitioning.
//!
//! A band is a maximal run of rows whose edges touch exactly:
//! row `i` continues the current band iff `wavelo[i] == wavehi[i-1]`.
//!
//! The comparison is bit-exact. Edges are rounded at ingest, so any mismatch
//! is treated as a gap and jittered inputs produce extra bands.

use crate::domain::{Band, ObservedSpectrum, RowSpan};
use crate::error::PrepError;

/// Split a series into its contiguous bands, in row order.
pub fn find_bands(series: &ObservedSpectrum) -> Result<Vec<Band>, PrepError> {
    let spans = find_band_spans(&series.wavelo, &series.wavehi)?;
    Ok(spans
        .into_iter()
        .map(|rows| Band {
            rows,
            data: series.slice(rows),
        })
        .collect())
}

/// Row spans of each band without copying any data.
pub fn find_band_spans(wavelo: &[f64], wavehi: &[f64]) -> Result<Vec<RowSpan>, PrepError> {
    if wavelo.is_empty() {
        return Err(PrepError::malformed("cannot partition an empty series into bands"));
    }
    if wavelo.len() != wavehi.len() {
        return Err(PrepError::malformed(format!(
            "wavelo has {} values but wavehi has {}",
            wavelo.len(),
            wavehi.len()
        )));
    }

    let mut spans = Vec::new();
    let mut start = 0usize;
    for i in 1..wavelo.len() {
        #[allow(clippy::float_cmp)]
        let contiguous = wavelo[i] == wavehi[i - 1];
        if !contiguous {
            spans.push(RowSpan::new(start, i));
            start = i;
        }
    }
    spans.push(RowSpan::new(start, wavelo.len()));

    log::debug!("found {} band(s) in {} rows", spans.len(), wavelo.len());
    Ok(spans)
}

/// `(band_start, band_end)` wavelength limits of each band.
pub fn band_limits(bands: &[Band]) -> Vec<(f64, f64)> {
    bands.iter().map(Band::limits).collect()
}

/// Concatenate bands back into one series, preserving band order.
pub fn concat_bands(bands: &[Band]) -> ObservedSpectrum {
    let two_sided = bands.first().is_some_and(|b| b.data.err_lo.is_some());
    let mut out = ObservedSpectrum::empty(two_sided);
    for band in bands {
        out.extend_from(&band.data);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(wavelo: &[f64], wavehi: &[f64]) -> ObservedSpectrum {
        let n = wavelo.len();
        let flux: Vec<f64> = (0..n).map(|i| i as f64 + 1.0).collect();
        let err: Vec<f64> = (0..n).map(|i| 0.1 * (i as f64 + 1.0)).collect();
        ObservedSpectrum::new(wavelo.to_vec(), wavehi.to_vec(), flux, err).unwrap()
    }

    #[test]
    fn splits_where_edges_break() {
        let s = series(&[1.0, 1.1, 2.0, 2.1], &[1.1, 1.2, 2.1, 2.2]);
        let bands = find_bands(&s).unwrap();
        assert_eq!(bands.len(), 2);
        assert_eq!(bands[0].rows.first_row(), 0);
        assert_eq!(bands[0].rows.last_row(), 1);
        assert_eq!(bands[1].rows.first_row(), 2);
        assert_eq!(bands[1].rows.last_row(), 3);
        assert_eq!(bands[1].data.flux, vec![3.0, 4.0]);
        assert_eq!(band_limits(&bands), vec![(1.0, 1.2), (2.0, 2.2)]);
    }

    #[test]
    fn single_row_is_one_band() {
        let s = series(&[1.0], &[1.1]);
        let bands = find_bands(&s).unwrap();
        assert_eq!(bands.len(), 1);
        assert_eq!(bands[0].rows, RowSpan::new(0, 1));
    }

    #[test]
    fn empty_series_is_rejected() {
        let s = series(&[], &[]);
        assert!(matches!(find_bands(&s), Err(PrepError::MalformedInput(_))));
    }

    #[test]
    fn concatenating_bands_round_trips() {
        let wavelo = [0.5, 0.6, 0.7, 1.0, 1.5, 2.0, 2.5, 4.0];
        let wavehi = [0.6, 0.7, 0.8, 1.5, 2.0, 2.5, 3.0, 4.5];
        let s = series(&wavelo, &wavehi);
        let bands = find_bands(&s).unwrap();
        assert_eq!(bands.len(), 3);
        assert_eq!(concat_bands(&bands), s);
    }

    #[test]
    fn near_miss_edges_start_a_new_band() {
        let s = series(&[1.0, 1.1000001], &[1.1, 1.2]);
        assert_eq!(find_bands(&s).unwrap().len(), 2);
    }

    #[test]
    fn two_sided_errors_are_split_too() {
        let s = series(&[1.0, 1.1, 2.0], &[1.1, 1.2, 2.1])
            .with_err_lo(vec![0.01, 0.02, 0.03])
            .unwrap();
        let bands = find_bands(&s).unwrap();
        assert_eq!(bands[1].data.err_lo.as_deref(), Some(&[0.03][..]));
    }
}
