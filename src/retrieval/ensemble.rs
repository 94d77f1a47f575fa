//! Ensemble (grid) mode.
//!
//! Instead of sampling, ensemble mode evaluates the model on a regular grid over
//! a subset of parameters. Each axis runs from the lower to the upper bound of
//! its parameter in steps of the parameter's `sigma`; the ensemble is the
//! Cartesian product of the axes, with the first axis varying fastest.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::RetrievalParameter;
use crate::error::PrepError;

/// Ensembles above this size need caller confirmation.
pub const CONFIRM_THRESHOLD: usize = 1_000;

/// Ensembles above this size are refused outright.
pub const MAX_ENSEMBLE_SIZE: usize = 10_000;

/// One varied parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleAxis {
    /// Position of the parameter in the full parameter vector.
    pub index: usize,
    pub name: String,
    pub values: Vec<f64>,
}

impl EnsembleAxis {
    /// `floor((max - min) / step) + 1` points starting at `min`.
    pub fn from_range(index: usize, name: impl Into<String>, min: f64, max: f64, step: f64) -> Result<Self, PrepError> {
        let name = name.into();
        if !(step > 0.0) || !(max >= min) {
            return Err(PrepError::malformed(format!(
                "ensemble axis '{name}' needs min <= max and a positive step (min={min}, max={max}, step={step})"
            )));
        }
        // An axis alone may not exceed the ensemble limit; check before allocating.
        let span = ((max - min) / step).floor();
        if !(span < MAX_ENSEMBLE_SIZE as f64) {
            return Err(PrepError::EnsembleTooLarge {
                size: (span as usize).saturating_add(1),
                limit: MAX_ENSEMBLE_SIZE,
            });
        }
        let count = span as usize + 1;
        let values = (0..count).map(|j| min + j as f64 * step).collect();
        Ok(Self { index, name, values })
    }

    pub fn from_parameter(index: usize, param: &RetrievalParameter) -> Result<Self, PrepError> {
        Self::from_range(index, param.name.clone(), param.bounds.0, param.bounds.1, param.sigma)
    }
}

/// Parameter vectors to evaluate, one row per grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ensemble {
    pub axes: Vec<EnsembleAxis>,
    pub rows: Vec<Vec<f64>>,
}

impl Ensemble {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Number of grid points the axes span, saturating at `usize::MAX`.
pub fn ensemble_size(axes: &[EnsembleAxis]) -> usize {
    axes.iter()
        .try_fold(1usize, |acc, a| acc.checked_mul(a.values.len()))
        .unwrap_or(usize::MAX)
}

/// Enumerate the ensemble around `base`.
///
/// Sizes above `MAX_ENSEMBLE_SIZE` are refused; sizes above
/// `CONFIRM_THRESHOLD` are built only if `confirm_large_job(size)` agrees.
pub fn build_ensemble<F>(base: &[f64], axes: Vec<EnsembleAxis>, confirm_large_job: F) -> Result<Ensemble, PrepError>
where
    F: FnOnce(usize) -> bool,
{
    if let Some(axis) = axes.iter().find(|a| a.index >= base.len()) {
        return Err(PrepError::malformed(format!(
            "ensemble axis '{}' points at parameter {} of {}",
            axis.name,
            axis.index,
            base.len()
        )));
    }

    let size = ensemble_size(&axes);
    if size > MAX_ENSEMBLE_SIZE {
        return Err(PrepError::EnsembleTooLarge {
            size,
            limit: MAX_ENSEMBLE_SIZE,
        });
    }
    if size > CONFIRM_THRESHOLD && !confirm_large_job(size) {
        return Err(PrepError::EnsembleDeclined(size));
    }
    log::info!("ensemble size: {size}");

    let rows = (0..size)
        .map(|i| {
            let mut row = base.to_vec();
            let mut rem = i;
            for axis in &axes {
                let n = axis.values.len();
                row[axis.index] = axis.values[rem % n];
                rem /= n;
            }
            row
        })
        .collect();

    Ok(Ensemble { axes, rows })
}

/// Evaluate `f` on every row in parallel, keeping row order.
pub fn run_ensemble<T, F>(ensemble: &Ensemble, f: F) -> Result<Vec<T>, PrepError>
where
    T: Send,
    F: Fn(&[f64]) -> Result<T, PrepError> + Sync,
{
    ensemble.rows.par_iter().map(|row| f(row)).collect()
}

/// Write the ensemble table: one line per axis, its name then its value in each row.
pub fn write_ensemble_table(path: &Path, ensemble: &Ensemble) -> Result<(), PrepError> {
    let file = File::create(path).map_err(|e| PrepError::io(path, e))?;
    let mut out = BufWriter::new(file);
    for axis in &ensemble.axes {
        let mut line = format!("     {}", axis.name);
        for row in &ensemble.rows {
            line.push_str(&format!(" {:.6}", row[axis.index]));
        }
        writeln!(out, "{line}").map_err(|e| PrepError::io(path, e))?;
    }
    out.flush().map_err(|e| PrepError::io(path, e))?;
    Ok(())
}
