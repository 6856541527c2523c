//! Error types for butterfly-network
//!
//! Data-quality problems in the input never surface here; they are skipped
//! during ingest. Everything in this enum aborts the current operation.

use std::io;

use thiserror::Error;

/// Main error type for butterfly-network operations
#[derive(Debug, Error)]
pub enum Error {
    /// Underlying read or write failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A serialized block is truncated or structurally invalid
    #[error("invalid format: {0}")]
    Format(String),

    /// The stream was written by an unsupported format version
    #[error("unsupported {what} version {found} (expected {expected})")]
    UnsupportedVersion {
        what: &'static str,
        found: u8,
        expected: u8,
    },

    /// File envelope checksum does not match its contents
    #[error("checksum mismatch: expected {expected:016x}, computed {computed:016x}")]
    Checksum { expected: u64, computed: u64 },

    /// Too many distinct profile attribute sets for the on-disk edge field
    #[error("profile attribute capacity exceeded: id {id} > {max}; check which tags are classified as profile tags")]
    ProfileCapacity { id: u32, max: u32 },

    /// A fixed-width count field cannot hold the value
    #[error("capacity exceeded: {0}")]
    Capacity(String),

    /// An auxiliary graph was written for a different network
    #[error("guid mismatch: graph belongs to {found}, database is {expected}")]
    GuidMismatch { expected: String, found: String },

    /// The profile is not registered in the database
    #[error("profile '{0}' is not supported by this database")]
    UnsupportedProfile(String),

    #[error("no contracted graph stored for profile '{0}'")]
    MissingContracted(String),

    /// Spatial query on a vertex store that has not been sorted
    #[error("spatial query requires a Hilbert-sorted vertex store")]
    NotSorted,

    /// PBF decoding failed
    #[error("pbf error: {0}")]
    Pbf(String),

    /// Invalid builder or CLI configuration
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<osmpbf::Error> for Error {
    fn from(err: osmpbf::Error) -> Self {
        Error::Pbf(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}

/// Result type alias for butterfly-network operations
pub type Result<T> = std::result::Result<T, Error>;
