//! rsfec Core Library
//!
//! Systematic Reed-Solomon erasure coding over GF(256).
//! This crate provides:
//! - GF(256) arithmetic with process-wide log/antilog tables
//! - An MDS encoding matrix (identity over a Cauchy parity block)
//! - Shard encoding, verification, and erasure reconstruction
//! - A byte-buffer API that splits, encodes, and reassembles whole buffers
//!
//! # Example
//!
//! ```
//! use rsfec_core::ReedSolomon;
//!
//! rsfec_core::initialize_field();
//! let rs = ReedSolomon::new(4, 2).unwrap();
//!
//! let mut shards: Vec<Vec<u8>> = (0..4).map(|i| vec![i as u8; 8]).collect();
//! shards.extend(vec![vec![0u8; 8]; 2]);
//! rs.encode_in_place(&mut shards, 8).unwrap();
//!
//! let original = shards.clone();
//! shards[1].fill(0);
//! shards[4].fill(0);
//! let mut erasures = vec![false, true, false, false, true, false];
//! rs.reconstruct(&mut shards, &mut erasures, 8).unwrap();
//! assert_eq!(shards, original);
//! ```

pub mod coder;
pub mod encoder;
pub mod erasure;
pub mod error;
pub mod galois;
pub mod matrix;
pub mod reconstruct;

pub use coder::{CoderConfig, ReedSolomon};
pub use erasure::{ErasureEncoder, ShardData};
pub use error::{CodecError, ConfigError, FieldError, MatrixError, Result, RsfecError};
pub use galois::{initialize_field, GaloisField};
pub use matrix::{build_encoding_matrix, Matrix};

/// Default erasure coding configuration
/// - 10 data shards: minimum required to reconstruct
/// - 4 parity shards: can tolerate 4 lost shards
/// - 14 total shards
///
/// Override at runtime via ERASURE_DATA_SHARDS / ERASURE_PARITY_SHARDS env vars
/// (see [`CoderConfig::from_env`]).
pub const DATA_SHARDS: usize = 10;
pub const PARITY_SHARDS: usize = 4;
pub const TOTAL_SHARDS: usize = DATA_SHARDS + PARITY_SHARDS;

/// GF(256) has 256 distinct points, so no configuration can exceed 256 shards
pub const MAX_TOTAL_SHARDS: usize = 256;

/// Read erasure shard counts from environment, falling back to compile-time defaults.
/// Returns (data_shards, parity_shards, total_shards).
pub fn erasure_config_from_env() -> Result<(usize, usize, usize)> {
    let config = CoderConfig::from_env()?;
    Ok((
        config.data_shards(),
        config.parity_shards(),
        config.total_shards(),
    ))
}

/// Serializes tests that read or write the `ERASURE_*` environment variables
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
