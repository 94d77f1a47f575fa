//! Error types.
//!
//! - `PrepError` is what the library returns: one variant per failure kind a
//!   caller may want to branch on.
//! - `AppError` is the binary-facing error: a message plus a process exit code.

use std::path::PathBuf;

use thiserror::Error;

/// Failures raised while preparing observed or model spectra.
#[derive(Debug, Error)]
pub enum PrepError {
    /// A requested wavelength range is not covered by the available grid.
    #[error("wavelength range not covered: {0}")]
    InvalidRange(String),

    /// No band-order inversion was found to anchor the polynomial fit.
    #[error("could not find a pivot band for polynomial normalization")]
    MissingPivot,

    #[error("unsupported sampler '{0}' (expected 'emcee' or 'dynesty')")]
    UnsupportedSampler(String),

    /// Empty or inconsistent-length arrays, or values that cannot be used.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("unknown gas species '{0}'")]
    UnknownSpecies(String),

    #[error("unknown temperature-pressure model '{0}'")]
    UnknownModel(String),

    #[error("ensemble of {0} entries was declined")]
    EnsembleDeclined(usize),

    #[error("ensemble of {size} entries exceeds the limit of {limit}")]
    EnsembleTooLarge { size: usize, limit: usize },

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PrepError {
    pub fn malformed(message: impl Into<String>) -> Self {
        PrepError::MalformedInput(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PrepError::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit code used when this error reaches the binary.
    ///
    /// - 2: bad input or configuration
    /// - 3: data that cannot be prepared
    /// - 4: I/O and serialization
    pub fn exit_code(&self) -> u8 {
        match self {
            PrepError::MalformedInput(_)
            | PrepError::UnsupportedSampler(_)
            | PrepError::UnknownSpecies(_)
            | PrepError::UnknownModel(_)
            | PrepError::EnsembleDeclined(_)
            | PrepError::EnsembleTooLarge { .. } => 2,
            PrepError::InvalidRange(_) | PrepError::MissingPivot => 3,
            PrepError::Io { .. } | PrepError::Json(_) => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<PrepError> for AppError {
    fn from(err: PrepError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
