//! Retrieval setup: walker counts, calibration slack, catalog choice, T-P
//! model selection and ensemble enumeration.

pub mod ensemble;
pub mod setup;
pub mod tp;

pub use ensemble::*;
pub use setup::*;
pub use tp::{TpModel, TpProfile};
