//! Reed-Solomon coder handle
//!
//! A [`ReedSolomon`] owns its shard-count configuration and the encoding
//! matrix derived from it. It is immutable after construction, so one handle
//! can serve any number of threads encoding or reconstructing concurrently.
//! Encoding lives in [`crate::encoder`], reconstruction in
//! [`crate::reconstruct`].

use crate::error::{CodecError, ConfigError};
use crate::galois;
use crate::matrix::{build_encoding_matrix, Matrix};
use crate::{DATA_SHARDS, MAX_TOTAL_SHARDS, PARITY_SHARDS};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// Shard-count configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCoderConfig", into = "RawCoderConfig")]
pub struct CoderConfig {
    data_shards: usize,
    parity_shards: usize,
}

/// Unvalidated wire form, so deserialization goes through [`CoderConfig::new`]
#[derive(Serialize, Deserialize)]
struct RawCoderConfig {
    data_shards: usize,
    parity_shards: usize,
}

impl TryFrom<RawCoderConfig> for CoderConfig {
    type Error = ConfigError;

    fn try_from(raw: RawCoderConfig) -> Result<Self, Self::Error> {
        Self::new(raw.data_shards, raw.parity_shards)
    }
}

impl From<CoderConfig> for RawCoderConfig {
    fn from(config: CoderConfig) -> Self {
        Self {
            data_shards: config.data_shards,
            parity_shards: config.parity_shards,
        }
    }
}

impl Default for CoderConfig {
    fn default() -> Self {
        Self {
            data_shards: DATA_SHARDS,
            parity_shards: PARITY_SHARDS,
        }
    }
}

impl CoderConfig {
    /// Validate and create a configuration
    pub fn new(data_shards: usize, parity_shards: usize) -> Result<Self, ConfigError> {
        if data_shards == 0 {
            return Err(ConfigError::NoDataShards);
        }
        let total = data_shards.saturating_add(parity_shards);
        if total > MAX_TOTAL_SHARDS {
            return Err(ConfigError::TooManyShards {
                total,
                max: MAX_TOTAL_SHARDS,
            });
        }
        Ok(Self {
            data_shards,
            parity_shards,
        })
    }

    /// Read shard counts from `ERASURE_DATA_SHARDS` / `ERASURE_PARITY_SHARDS`,
    /// falling back to the compile-time defaults for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let data = env_usize("ERASURE_DATA_SHARDS")?.unwrap_or(DATA_SHARDS);
        let parity = env_usize("ERASURE_PARITY_SHARDS")?.unwrap_or(PARITY_SHARDS);
        Self::new(data, parity)
    }

    /// Number of data shards (k)
    pub fn data_shards(&self) -> usize {
        self.data_shards
    }

    /// Number of parity shards (m)
    pub fn parity_shards(&self) -> usize {
        self.parity_shards
    }

    /// Total number of shards
    pub fn total_shards(&self) -> usize {
        self.data_shards + self.parity_shards
    }

    /// Storage overhead ratio (parity/data)
    pub fn overhead_ratio(&self) -> f64 {
        self.parity_shards as f64 / self.data_shards as f64
    }

    /// Maximum number of lost shards that can be repaired
    pub fn max_failures(&self) -> usize {
        self.parity_shards
    }
}

fn env_usize(var: &str) -> Result<Option<usize>, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnvValue {
                var: var.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}

/// Reed-Solomon encoder/reconstructor for one `(data, parity)` configuration
#[derive(Clone)]
pub struct ReedSolomon {
    config: CoderConfig,
    /// `total x data` systematic encoding matrix
    matrix: Matrix,
    /// Bottom `parity x data` rows of `matrix`
    parity: Matrix,
}

impl ReedSolomon {
    /// Create a coder for `data_shards` data and `parity_shards` parity shards
    pub fn new(data_shards: usize, parity_shards: usize) -> Result<Self, ConfigError> {
        Self::with_config(CoderConfig::new(data_shards, parity_shards)?)
    }

    /// Create a coder from a validated configuration
    pub fn with_config(config: CoderConfig) -> Result<Self, ConfigError> {
        galois::initialize_field();

        let (d, p) = (config.data_shards(), config.parity_shards());
        // Points are distinct bytes once the config is validated
        let matrix = build_encoding_matrix(d, p).map_err(|e| {
            error!(
                data_shards = d,
                parity_shards = p,
                error = %e,
                "failed to build encoding matrix"
            );
            ConfigError::EncodingMatrix(e)
        })?;
        let parity = matrix.row_range(d, d + p);

        debug!(
            data_shards = d,
            parity_shards = p,
            "built reed-solomon encoding matrix"
        );

        Ok(Self {
            config,
            matrix,
            parity,
        })
    }

    pub fn config(&self) -> &CoderConfig {
        &self.config
    }

    pub fn data_shards(&self) -> usize {
        self.config.data_shards()
    }

    pub fn parity_shards(&self) -> usize {
        self.config.parity_shards()
    }

    pub fn total_shards(&self) -> usize {
        self.config.total_shards()
    }

    /// Full systematic encoding matrix
    pub fn encoding_matrix(&self) -> &Matrix {
        &self.matrix
    }

    /// Parity rows of the encoding matrix
    pub fn parity_rows(&self) -> &Matrix {
        &self.parity
    }

    pub(crate) fn check_block_size(block_size: usize) -> Result<(), CodecError> {
        if block_size == 0 {
            return Err(CodecError::InvalidBlockSize);
        }
        Ok(())
    }

    pub(crate) fn check_count(
        what: &'static str,
        expected: usize,
        actual: usize,
    ) -> Result<(), CodecError> {
        if expected != actual {
            return Err(CodecError::LengthMismatch {
                what,
                expected,
                actual,
            });
        }
        Ok(())
    }

    pub(crate) fn check_buffers<'a, I>(buffers: I, block_size: usize) -> Result<(), CodecError>
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        for buf in buffers {
            if buf.len() != block_size {
                return Err(CodecError::LengthMismatch {
                    what: "shard",
                    expected: block_size,
                    actual: buf.len(),
                });
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for ReedSolomon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReedSolomon")
            .field("data_shards", &self.data_shards())
            .field("parity_shards", &self.parity_shards())
            .finish()
    }
}
