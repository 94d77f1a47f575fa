//! Export prepared observations and grid alignments.
//!
//! JSON files are the portable representation: they carry run metadata and can
//! be reloaded with `read_json`. The CSV export of a series is meant for
//! spreadsheets and quick plotting.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::domain::{CalibrationSlack, ObservedSpectrum, RowSpan};
use crate::error::PrepError;
use crate::spectrum::{FractionalBins, GridAlignment};

const TOOL: &str = "specslice";

/// A prepared (convolved, binned, optionally normalized) observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedObservationFile {
    pub tool: String,
    pub created_at: DateTime<Utc>,
    pub dataconv: f64,
    pub databin: f64,
    pub normalized: bool,
    /// Row span of each band in `series`, in wavelength order.
    pub bands: Vec<RowSpan>,
    pub series: ObservedSpectrum,
}

impl PreparedObservationFile {
    pub fn new(dataconv: f64, databin: f64, normalized: bool, bands: Vec<RowSpan>, series: ObservedSpectrum) -> Self {
        Self {
            tool: TOOL.to_string(),
            created_at: Utc::now(),
            dataconv,
            databin,
            normalized,
            bands,
            series,
        }
    }
}

/// The sliced model grid and the bin indices of the observation on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSliceFile {
    pub tool: String,
    pub created_at: DateTime<Utc>,
    pub catalog: String,
    pub degrade: f64,
    pub slack: CalibrationSlack,
    pub alignment: GridAlignment,
    pub bins: FractionalBins,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitivity: Option<FractionalBins>,
}

impl GridSliceFile {
    pub fn new(
        catalog: impl Into<String>,
        degrade: f64,
        slack: CalibrationSlack,
        alignment: GridAlignment,
        bins: FractionalBins,
        sensitivity: Option<FractionalBins>,
    ) -> Self {
        Self {
            tool: TOOL.to_string(),
            created_at: Utc::now(),
            catalog: catalog.into(),
            degrade,
            slack,
            alignment,
            bins,
            sensitivity,
        }
    }
}

/// Write any serializable value as pretty JSON.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PrepError> {
    let file = File::create(path).map_err(|e| PrepError::io(path, e))?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut out, value)?;
    out.flush().map_err(|e| PrepError::io(path, e))?;
    log::info!("wrote {}", path.display());
    Ok(())
}

/// Read a JSON file written by `write_json`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, PrepError> {
    let file = File::open(path).map_err(|e| PrepError::io(path, e))?;
    Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
}

/// Write a series as CSV with one row per bin.
pub fn write_series_csv(path: &Path, series: &ObservedSpectrum) -> Result<(), PrepError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;

    let mut header = vec!["wavelo", "wavehi", "wavemid", "flux", "err"];
    if series.err_lo.is_some() {
        header.push("err_lo");
    }
    writer.write_record(&header).map_err(|e| csv_error(path, e))?;

    for i in 0..series.len() {
        let bin = series.bin(i);
        let mut record = vec![
            format!("{:.6}", bin.start),
            format!("{:.6}", bin.end),
            format!("{:.6}", bin.mid()),
            format!("{:.6e}", series.flux[i]),
            format!("{:.6e}", series.err[i]),
        ];
        if let Some(lo) = &series.err_lo {
            record.push(format!("{:.6e}", lo[i]));
        }
        writer.write_record(&record).map_err(|e| csv_error(path, e))?;
    }

    writer.flush().map_err(|e| PrepError::io(path, e))?;
    log::info!("wrote {} rows to {}", series.len(), path.display());
    Ok(())
}

/// Write a series in the whitespace-delimited observation format read by
/// `ingest::read_observations`. Column 2 carries the bin midpoint.
pub fn write_observation_rows(path: &Path, series: &ObservedSpectrum) -> Result<(), PrepError> {
    let file = File::create(path).map_err(|e| PrepError::io(path, e))?;
    let mut out = BufWriter::new(file);
    let err_lo = series.err_lo.as_deref().unwrap_or(&series.err);

    writeln!(out, "# wavelo wavehi wavemid errlo errhi flux").map_err(|e| PrepError::io(path, e))?;
    for i in 0..series.len() {
        let bin = series.bin(i);
        writeln!(
            out,
            "{:.5} {:.5} {:.6} {:.6e} {:.6e} {:.6e}",
            bin.start,
            bin.end,
            bin.mid(),
            err_lo[i],
            series.err[i],
            series.flux[i]
        )
        .map_err(|e| PrepError::io(path, e))?;
    }
    out.flush().map_err(|e| PrepError::io(path, e))?;
    log::info!("wrote {} observation rows to {}", series.len(), path.display());
    Ok(())
}

fn csv_error(path: &Path, e: csv::Error) -> PrepError {
    PrepError::io(path, std::io::Error::other(e))
}
