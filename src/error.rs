//! Error types for adc-search operations.
//!
//! Every fallible operation in the crate returns [`Result`]. Errors are never
//! retried internally and no partial results survive a failed invocation.

use std::io;
use thiserror::Error;

/// Result type alias using [`AdcError`].
pub type Result<T> = std::result::Result<T, AdcError>;

/// Errors that can occur during search, clustering and store access.
#[derive(Error, Debug)]
pub enum AdcError {
    /// Vector dimensions do not match the expected dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected vector dimension.
        expected: usize,
        /// Actual vector dimension provided.
        actual: usize,
    },

    /// Clustering was asked for more clusters than there are ids.
    #[error("insufficient ids: required at least {required}, got {actual}")]
    InsufficientIds {
        /// Minimum number of ids required (the number of clusters).
        required: usize,
        /// Number of distinct ids provided.
        actual: usize,
    },

    /// Invalid parameter value provided.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A codebook does not cover every (position, code) pair exactly once.
    #[error("invalid codebook: {0}")]
    InvalidCodebook(String),

    /// A quantized row cannot be scored against the distance table.
    #[error("invalid code row for id {id}: {reason}")]
    InvalidCodeRow {
        /// Id of the offending row.
        id: u64,
        /// What is wrong with it.
        reason: String,
    },

    /// Cosine similarity is undefined for a zero-norm operand.
    #[error("cosine similarity undefined: zero-norm vector")]
    ZeroNorm,

    /// The row store could not be reached or queried.
    #[error("row store unavailable: {0}")]
    StoreUnavailable(String),

    /// The requested table does not exist in the row store.
    #[error("table not found: {0}")]
    TableNotFound(String),

    /// The requested codebook does not exist in the row store.
    #[error("codebook not found: {0}")]
    CodebookNotFound(String),

    /// The row store holds no coarse quantizer.
    #[error("coarse quantizer not loaded")]
    CoarseQuantizerMissing,

    /// Vector with the specified ID was not found.
    #[error("vector not found: ID {0}")]
    VectorNotFound(u64),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during serialization or deserialization.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Checksum verification failed during snapshot loading.
    #[error("checksum mismatch: file may be corrupted")]
    ChecksumMismatch,

    /// Snapshot file has an invalid or unrecognized format.
    #[error("invalid file format: {0}")]
    InvalidFormat(String),

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AdcError {
    /// Creates a new `DimensionMismatch` error.
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    /// Creates a new `InsufficientIds` error.
    pub fn insufficient_ids(required: usize, actual: usize) -> Self {
        Self::InsufficientIds { required, actual }
    }

    /// Creates a new `InvalidParameter` error.
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Creates a new `InvalidCodebook` error.
    pub fn invalid_codebook(msg: impl Into<String>) -> Self {
        Self::InvalidCodebook(msg.into())
    }

    /// Creates a new `InvalidCodeRow` error.
    pub fn invalid_code_row(id: u64, reason: impl Into<String>) -> Self {
        Self::InvalidCodeRow {
            id,
            reason: reason.into(),
        }
    }

    /// Creates a new `StoreUnavailable` error.
    pub fn store_unavailable(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    /// Creates a new `SerializationError`.
    pub fn serialization_error(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }

    /// Creates a new `InvalidFormat` error.
    pub fn invalid_format(msg: impl Into<String>) -> Self {
        Self::InvalidFormat(msg.into())
    }

    /// Returns true for errors that abort an invocation because of caller
    /// misconfiguration rather than data or store problems.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::InsufficientIds { .. } | Self::InvalidParameter(_) | Self::InvalidConfig(_)
        )
    }
}

impl From<bincode::Error> for AdcError {
    fn from(err: bincode::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

impl From<serde_json::Error> for AdcError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}
