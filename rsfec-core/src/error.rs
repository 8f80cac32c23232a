//! Error types for rsfec
//!
//! Each layer of the engine has its own error enum so callers can match on
//! exactly what went wrong; [`RsfecError`] unifies them for the byte-buffer
//! API and for callers that just want to bubble errors up.

use thiserror::Error;

/// Result type alias for rsfec operations
pub type Result<T> = std::result::Result<T, RsfecError>;

/// GF(256) arithmetic errors
///
/// Only reachable through a logic error in the matrix engine: correct
/// construction and row selection never divide by zero.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldError {
    #[error("division by zero in GF(256)")]
    DivideByZero,

    #[error("zero has no multiplicative inverse in GF(256)")]
    InverseOfZero,

    #[error("zero has no discrete logarithm in GF(256)")]
    LogOfZero,
}

/// Matrix engine errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatrixError {
    #[error("matrix is singular")]
    Singular,

    #[error("matrix is not square: {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    #[error("row selection size mismatch: expected {expected} rows, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("row index {index} out of range (rows: {rows})")]
    RowOutOfRange { index: usize, rows: usize },

    #[error("dimension mismatch: left has {left} columns, right has {right} rows")]
    DimensionMismatch { left: usize, right: usize },

    #[error(transparent)]
    Field(#[from] FieldError),
}

/// Coder construction and configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("data_shards must be > 0")]
    NoDataShards,

    #[error("too many shards: {total} (max: {max})")]
    TooManyShards { total: usize, max: usize },

    #[error("invalid value for {var}: {value:?}")]
    InvalidEnvValue { var: String, value: String },

    #[error("failed to build encoding matrix: {0}")]
    EncodingMatrix(MatrixError),
}

/// Encode/reconstruct errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("{what} length mismatch: expected {expected}, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("block size must be > 0")]
    InvalidBlockSize,

    #[error("insufficient redundancy: {erased} shards erased, only {parity} parity shards")]
    InsufficientRedundancy { erased: usize, parity: usize },

    #[error("decode matrix is singular")]
    Singular,

    #[error("invalid shard index: {index} (total: {total})")]
    InvalidShardIndex { index: usize, total: usize },

    #[error(transparent)]
    Field(#[from] FieldError),
}

impl From<MatrixError> for CodecError {
    fn from(err: MatrixError) -> Self {
        match err {
            MatrixError::Singular => CodecError::Singular,
            MatrixError::Field(e) => CodecError::Field(e),
            MatrixError::SizeMismatch { expected, actual } => CodecError::LengthMismatch {
                what: "row selection",
                expected,
                actual,
            },
            MatrixError::DimensionMismatch { left, right } => CodecError::LengthMismatch {
                what: "matrix dimension",
                expected: left,
                actual: right,
            },
            MatrixError::NotSquare { rows, cols } => CodecError::LengthMismatch {
                what: "square matrix",
                expected: rows,
                actual: cols,
            },
            MatrixError::RowOutOfRange { index, rows } => CodecError::InvalidShardIndex {
                index,
                total: rows,
            },
        }
    }
}

/// Unified error type for rsfec
#[derive(Error, Debug)]
pub enum RsfecError {
    // ===== Engine Errors =====
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Matrix error: {0}")]
    Matrix(#[from] MatrixError),

    #[error("Field error: {0}")]
    Field(#[from] FieldError),

    // ===== Shard Errors =====
    #[error("Insufficient shards: have {available}, need {required}")]
    InsufficientShards { available: usize, required: usize },

    #[error("Shard size mismatch: expected {expected}, got {actual}")]
    ShardSizeMismatch { expected: usize, actual: usize },
}
