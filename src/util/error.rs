//! Error types for the EDL library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for EDL operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Path is not a unit directory or its manifest is unusable
    #[error("Invalid EDL unit at {path}: {reason}")]
    InvalidUnit { path: PathBuf, reason: String },

    /// Manifest was written for a different format version
    #[error("Unsupported EDL format version (was '{found}', expected '{expected}')")]
    UnsupportedFormatVersion { found: String, expected: String },

    /// Manifest declares a different type than the unit being loaded
    #[error("EDL unit of type '{actual}' can not be loaded as '{expected}'")]
    TypeMismatch { expected: String, actual: String },

    /// Manifest declares a type the loader can not materialize
    #[error("EDL unit type '{0}' is unknown, data can not be loaded")]
    UnknownUnitType(String),

    /// Filesystem operation on a unit without a path
    #[error("No path is set for this EDL unit")]
    NoPathSet,

    /// Child unit can not be attached
    #[error("Invalid child unit: {0}")]
    InvalidChild(String),

    /// Data part with this file name already exists
    #[error("Data part '{0}' already exists")]
    DuplicatePart(String),

    /// Data part extension differs from the data file type
    #[error("Can not add part of type '{actual}' to data file of type '{expected}'")]
    TypeConflict { expected: String, actual: String },

    /// Data file has neither media type nor file type
    #[error("Data file has no media type or file type, can not determine a loader")]
    NoTypeAssociation,

    /// No decoder known for this data type
    #[error("No data loader registered for '{0}'")]
    UnknownDataClass(String),

    /// Time-sync data can not be used by the consuming decoder
    #[error("Incompatible time-sync data: {0}")]
    SyncIncompatible(String),

    /// No auxiliary data file matches the requested key
    #[error("No auxiliary data matching '{0}'")]
    AuxDataNotFound(String),

    /// Decoder failed to interpret file contents
    #[error("Decode error: {0}")]
    Decode(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Manifest or attributes parse error
    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// Manifest or attributes serialization error
    #[error("TOML write error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[cfg(feature = "csv")]
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Time-sync file error
    #[error("tsync error: {0}")]
    TSync(#[from] tsync::Error),
}

impl Error {
    /// Create an invalid unit error.
    pub fn invalid_unit(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidUnit {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a sync incompatibility error.
    pub fn sync(msg: impl Into<String>) -> Self {
        Self::SyncIncompatible(msg.into())
    }
}

/// Result type alias for EDL operations.
pub type Result<T> = std::result::Result<T, Error>;
