//! Reporting utilities: terminal summaries of prepared observations and grids.

pub mod format;

pub use format::*;
