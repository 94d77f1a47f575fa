//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - observed spectra and their bands (`ObservedSpectrum`, `Band`, `RowSpan`)
//! - grid slicing metadata (`IndexWindow`, `IndexRemap`, `CalibrationSlack`)
//! - run configuration (`PrepConfig`, `SliceConfig`)

pub mod types;

pub use types::*;
