//! Observation file ingest.
//!
//! Observation files are whitespace-delimited text, one bin per row:
//!
//! ```text
//! wavelo  wavehi  <unused>  errlo  errhi  flux  [...]
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. Bin edges are rounded to
//! five decimals so that adjacent bins written with slightly different precision
//! still compare equal when bands are partitioned.

use std::fs;
use std::path::Path;

use crate::domain::ObservedSpectrum;
use crate::error::PrepError;

const COL_WAVELO: usize = 0;
const COL_WAVEHI: usize = 1;
const COL_ERRLO: usize = 3;
const COL_ERRHI: usize = 4;
const COL_FLUX: usize = 5;
const MIN_COLUMNS: usize = 6;

const EDGE_DECIMALS: i32 = 5;

/// Summary stats about the rows that were read.
#[derive(Debug, Clone)]
pub struct ObservationStats {
    pub n_rows: usize,
    pub wave_min: f64,
    pub wave_max: f64,
    pub flux_min: f64,
    pub flux_max: f64,
}

/// Ingest output: the parsed series plus what the reader saw.
#[derive(Debug, Clone)]
pub struct IngestedObservation {
    pub series: ObservedSpectrum,
    pub stats: ObservationStats,
    /// Non-empty, non-comment lines read.
    pub rows_read: usize,
}

/// Read an observation file from disk.
pub fn read_observations(path: &Path) -> Result<IngestedObservation, PrepError> {
    let text = fs::read_to_string(path).map_err(|e| PrepError::io(path, e))?;
    let ingested = parse_observations(&text)?;
    log::info!(
        "read {} observation rows from {}",
        ingested.rows_read,
        path.display()
    );
    Ok(ingested)
}

/// Parse observation rows from text.
pub fn parse_observations(text: &str) -> Result<IngestedObservation, PrepError> {
    let mut wavelo = Vec::new();
    let mut wavehi = Vec::new();
    let mut flux = Vec::new();
    let mut errhi = Vec::new();
    let mut errlo = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        if fields.len() < MIN_COLUMNS {
            return Err(PrepError::malformed(format!(
                "line {line}: expected at least {MIN_COLUMNS} columns, found {}",
                fields.len()
            )));
        }

        let lo = round_to(parse_field(&fields, COL_WAVELO, line, "wavelo")?, EDGE_DECIMALS);
        let hi = round_to(parse_field(&fields, COL_WAVEHI, line, "wavehi")?, EDGE_DECIMALS);
        if !(hi > lo) {
            return Err(PrepError::malformed(format!(
                "line {line}: bin upper edge {hi} is not above lower edge {lo}"
            )));
        }

        wavelo.push(lo);
        wavehi.push(hi);
        errlo.push(parse_field(&fields, COL_ERRLO, line, "errlo")?);
        errhi.push(parse_field(&fields, COL_ERRHI, line, "errhi")?);
        flux.push(parse_field(&fields, COL_FLUX, line, "flux")?);
    }

    if wavelo.is_empty() {
        return Err(PrepError::malformed("observation input contains no data rows"));
    }

    let rows_read = wavelo.len();
    let series = ObservedSpectrum::new(wavelo, wavehi, flux, errhi)?.with_err_lo(errlo)?;
    let stats = compute_stats(&series);

    Ok(IngestedObservation {
        series,
        stats,
        rows_read,
    })
}

fn parse_field(fields: &[&str], col: usize, line: usize, name: &str) -> Result<f64, PrepError> {
    let raw = fields[col];
    let value: f64 = raw
        .parse()
        .map_err(|_| PrepError::malformed(format!("line {line}: invalid {name} value '{raw}'")))?;
    if !value.is_finite() {
        return Err(PrepError::malformed(format!("line {line}: non-finite {name} value")));
    }
    Ok(value)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

fn compute_stats(series: &ObservedSpectrum) -> ObservationStats {
    let fold_min = |v: &[f64]| v.iter().copied().fold(f64::INFINITY, f64::min);
    let fold_max = |v: &[f64]| v.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    ObservationStats {
        n_rows: series.len(),
        wave_min: fold_min(&series.wavelo),
        wave_max: fold_max(&series.wavehi),
        flux_min: fold_min(&series.flux),
        flux_max: fold_max(&series.flux),
    }
}
