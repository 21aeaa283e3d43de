//! Error types for cadview.

use thiserror::Error;

/// The main error type for cadview operations.
#[derive(Error, Debug)]
pub enum CadviewError {
    /// An entity type name did not match any known type.
    #[error("unknown entity type '{0}'")]
    UnknownEntityType(String),

    /// A raw pick-type mask carried bits that do not name an entity type.
    #[error("invalid pick-type mask {0:#x}")]
    InvalidPickTypeMask(u64),

    /// A pick-type request was neither an integer mask nor a list of names.
    #[error("malformed pick-type request: {0}")]
    MalformedPickTypeRequest(String),

    /// An entity uid does not fit in the 56 bits a pick id can carry.
    #[error("entity uid {0:#x} exceeds 56 bits")]
    UidOutOfRange(u64),

    /// Primitive attribute arrays disagree in length.
    #[error("data size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// A specialized Result type for cadview operations.
pub type Result<T> = std::result::Result<T, CadviewError>;
