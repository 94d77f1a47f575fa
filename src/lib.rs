//! `specslice` library crate.
//!
//! Prepares observed and model spectra for atmospheric retrievals: band
//! partitioning, smoothing, bin-down, continuum normalization, and slicing of
//! the opacity wavelength grid to the observed bands.
//!
//! The binary (`specslice`) is a thin wrapper around this library so that the
//! core logic is testable without spawning processes.

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod report;
pub mod retrieval;
pub mod species;
pub mod spectrum;
