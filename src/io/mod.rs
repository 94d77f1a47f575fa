//! Input/output helpers.
//!
//! - observation file ingest (`ingest`)
//! - opacity-table headers and model grids (`opacity`)
//! - JSON/CSV exports (`export`)

pub mod export;
pub mod ingest;
pub mod opacity;

pub use export::*;
pub use ingest::*;
pub use opacity::*;
