//! Spectral preparation engine.
//!
//! Observation side, in pipeline order:
//!
//! - `bands`: split a series into edge-contiguous bands
//! - `convolve`: Gaussian smoothing per band
//! - `binning`: fractional-pixel bin-down per band
//! - `normalize`: polynomial continuum normalization across bands
//!
//! Model side:
//!
//! - `grid`: slice the opacity grid down to the windows the bands need
//! - `rebin`: integrate a model spectrum onto observation bins

pub mod bands;
pub mod binning;
pub mod convolve;
pub mod grid;
pub mod normalize;
pub mod rebin;

pub use bands::*;
pub use binning::*;
pub use convolve::*;
pub use grid::*;
pub use normalize::*;
pub use rebin::*;
