//! Byte-buffer erasure coding
//!
//! Splits an arbitrary buffer into `data_shards` zero-padded shards, adds
//! parity, and joins shards back into the original buffer:
//! - shard size is `ceil(len / data_shards)`, at least one byte
//! - any `data_shards` of the `total_shards` shards recover the buffer
//! - the caller keeps the original length to strip the padding

use crate::coder::{CoderConfig, ReedSolomon};
use crate::error::{Result, RsfecError};
use bytes::Bytes;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A single shard of erasure-coded data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardData {
    /// Shard index (0 to total_shards-1)
    pub index: u8,
    /// Shard data
    pub data: Bytes,
    /// Whether this is a parity shard
    pub is_parity: bool,
}

impl ShardData {
    /// Create a new shard
    pub fn new(index: u8, data: Bytes, is_parity: bool) -> Self {
        Self {
            index,
            data,
            is_parity,
        }
    }

    /// Get shard size
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Reed-Solomon encoder/decoder for whole buffers
#[derive(Debug, Clone)]
pub struct ErasureEncoder {
    coder: ReedSolomon,
}

impl ErasureEncoder {
    /// Create a new encoder with default configuration (10, 4)
    pub fn new() -> Result<Self> {
        Self::with_config(CoderConfig::default())
    }

    /// Create a new encoder with custom configuration
    pub fn with_config(config: CoderConfig) -> Result<Self> {
        let coder = ReedSolomon::with_config(config)?;
        Ok(Self { coder })
    }

    /// Get the coder configuration
    pub fn config(&self) -> &CoderConfig {
        self.coder.config()
    }

    /// Underlying shard-level coder
    pub fn coder(&self) -> &ReedSolomon {
        &self.coder
    }

    /// Encode data into shards
    ///
    /// Returns a vector of shards (data + parity)
    pub fn encode(&self, data: &[u8]) -> Result<Vec<ShardData>> {
        let (mut shards, shard_size) = self.split(data);
        let (data_part, parity_part) = shards.split_at_mut(self.config().data_shards());
        self.coder.encode(data_part, parity_part, shard_size)?;
        Ok(self.wrap_shards(shards))
    }

    /// Encode data into shards, computing parity shards in parallel
    ///
    /// Produces exactly the same shards as [`encode`](Self::encode).
    pub fn encode_parallel(&self, data: &[u8]) -> Result<Vec<ShardData>> {
        let (mut shards, shard_size) = self.split(data);
        let (data_part, parity_part) = shards.split_at_mut(self.config().data_shards());
        self.coder
            .encode_parallel(data_part, parity_part, shard_size)?;
        Ok(self.wrap_shards(shards))
    }

    /// Decode shards back into original data
    ///
    /// Requires at least `data_shards` number of shards.
    /// Missing shards should be represented as `None`.
    pub fn decode(&self, shards: &[Option<ShardData>], original_size: usize) -> Result<Bytes> {
        let data_shards = self.config().data_shards();
        let total_shards = self.config().total_shards();

        if shards.len() != total_shards {
            return Err(RsfecError::ShardSizeMismatch {
                expected: total_shards,
                actual: shards.len(),
            });
        }

        let available = shards.iter().filter(|s| s.is_some()).count();
        if available < data_shards {
            return Err(RsfecError::InsufficientShards {
                available,
                required: data_shards,
            });
        }

        let shard_size = shards
            .iter()
            .find_map(|s| s.as_ref().map(ShardData::size))
            .ok_or(RsfecError::InsufficientShards {
                available: 0,
                required: data_shards,
            })?;
        if let Some(bad) = shards
            .iter()
            .flatten()
            .find(|s| s.size() != shard_size)
        {
            return Err(RsfecError::ShardSizeMismatch {
                expected: shard_size,
                actual: bad.size(),
            });
        }

        let capacity = shard_size * data_shards;
        if original_size > capacity {
            return Err(RsfecError::ShardSizeMismatch {
                expected: capacity,
                actual: original_size,
            });
        }

        // Only data shards are needed to rebuild the buffer
        let mut buffers: Vec<Vec<u8>> = Vec::with_capacity(total_shards);
        let mut erasures = vec![false; total_shards];
        for (i, shard) in shards.iter().enumerate() {
            match shard {
                Some(s) => buffers.push(s.data.to_vec()),
                None => {
                    buffers.push(vec![0u8; shard_size]);
                    erasures[i] = true;
                }
            }
        }

        debug!(
            missing = total_shards - available,
            shard_size, original_size, "decoding buffer from shards"
        );

        self.coder
            .reconstruct_data(&mut buffers, &mut erasures, shard_size)?;

        let mut result = Vec::with_capacity(capacity);
        for shard in buffers.iter().take(data_shards) {
            result.extend_from_slice(shard);
        }

        result.truncate(original_size);
        Ok(Bytes::from(result))
    }

    /// Verify that shards are consistent (for health checking)
    pub fn verify_shards(&self, shards: &[ShardData]) -> Result<bool> {
        if shards.len() != self.config().total_shards() {
            return Ok(false);
        }

        let expected_size = shards.first().map(|s| s.size()).unwrap_or(0);
        if expected_size == 0 || !shards.iter().all(|s| s.size() == expected_size) {
            return Ok(false);
        }

        let shard_refs: Vec<&[u8]> = shards.iter().map(|s| s.data.as_ref()).collect();
        Ok(self.coder.verify(&shard_refs, expected_size)?)
    }

    /// Calculate the size of each shard given the data size
    fn calculate_shard_size(&self, data_size: usize) -> usize {
        data_size.div_ceil(self.config().data_shards()).max(1)
    }

    /// Zero-padded data shards followed by zeroed parity shards
    fn split(&self, data: &[u8]) -> (Vec<Vec<u8>>, usize) {
        let shard_size = self.calculate_shard_size(data.len());
        let config = self.config();

        let mut shards: Vec<Vec<u8>> = Vec::with_capacity(config.total_shards());
        for i in 0..config.data_shards() {
            let start = (i * shard_size).min(data.len());
            let end = ((i + 1) * shard_size).min(data.len());
            let mut shard = data[start..end].to_vec();
            shard.resize(shard_size, 0);
            shards.push(shard);
        }
        shards.resize(config.total_shards(), vec![0u8; shard_size]);
        (shards, shard_size)
    }

    fn wrap_shards(&self, shards: Vec<Vec<u8>>) -> Vec<ShardData> {
        let data_shards = self.config().data_shards();
        shards
            .into_iter()
            .enumerate()
            .map(|(i, shard_data)| {
                ShardData::new(i as u8, Bytes::from(shard_data), i >= data_shards)
            })
            .collect()
    }
}

impl Default for ErasureEncoder {
    fn default() -> Self {
        Self::new().expect("Default erasure config should always work")
    }
}

/// Convenience function to encode data with default configuration
pub fn encode(data: &[u8]) -> Result<Vec<ShardData>> {
    ErasureEncoder::new()?.encode(data)
}

/// Convenience function to decode shards with default configuration
pub fn decode(shards: &[Option<ShardData>], original_size: usize) -> Result<Bytes> {
    ErasureEncoder::new()?.decode(shards, original_size)
}

/// Encode data into shards on the rayon pool, one buffer per item
pub fn encode_batch(encoder: &ErasureEncoder, buffers: &[&[u8]]) -> Result<Vec<Vec<ShardData>>> {
    buffers
        .par_iter()
        .map(|buf| encoder.encode(buf))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CodecError;

    #[test]
    fn test_encode_decode_simple() {
        let encoder = ErasureEncoder::new().unwrap();
        let original = b"Hello, erasure coding!";

        let shards = encoder.encode(original).unwrap();
        assert_eq!(shards.len(), 14);

        let shard_opts: Vec<Option<ShardData>> = shards.into_iter().map(Some).collect();
        let decoded = encoder.decode(&shard_opts, original.len()).unwrap();
        assert_eq!(decoded.as_ref(), original);
    }

    #[test]
    fn test_encode_decode_with_missing_shards() {
        let encoder = ErasureEncoder::new().unwrap();
        let original: Vec<u8> = (0..1024 * 1024).map(|i| (i % 251) as u8).collect();

        let shards = encoder.encode(&original).unwrap();

        // Remove 4 shards (maximum we can lose)
        let mut shard_opts: Vec<Option<ShardData>> = shards.into_iter().map(Some).collect();
        shard_opts[0] = None;
        shard_opts[5] = None;
        shard_opts[10] = None;
        shard_opts[13] = None;

        let decoded = encoder.decode(&shard_opts, original.len()).unwrap();
        assert_eq!(decoded.as_ref(), original.as_slice());
    }

    #[test]
    fn test_decode_with_only_data_shards_missing() {
        let encoder = ErasureEncoder::with_config(CoderConfig::new(4, 3).unwrap()).unwrap();
        let original: Vec<u8> = (0..1000).map(|i| (i * 7 % 256) as u8).collect();
        let shards = encoder.encode(&original).unwrap();

        let mut shard_opts: Vec<Option<ShardData>> = shards.into_iter().map(Some).collect();
        for opt in shard_opts.iter_mut().take(3) {
            *opt = None;
        }

        let decoded = encoder.decode(&shard_opts, original.len()).unwrap();
        assert_eq!(decoded.as_ref(), original.as_slice());
    }

    #[test]
    fn test_too_many_missing_shards() {
        let encoder = ErasureEncoder::new().unwrap();
        let original = b"test data";

        let shards = encoder.encode(original).unwrap();

        // Remove 5 shards (one more than maximum)
        let mut shard_opts: Vec<Option<ShardData>> = shards.into_iter().map(Some).collect();
        for shard in shard_opts.iter_mut().take(5) {
            *shard = None;
        }

        let result = encoder.decode(&shard_opts, original.len());
        assert!(matches!(
            result,
            Err(RsfecError::InsufficientShards {
                available: 9,
                required: 10
            })
        ));
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        let encoder = ErasureEncoder::with_config(CoderConfig::new(3, 2).unwrap()).unwrap();
        let shards = encoder.encode(b"abcdefghi").unwrap();

        let short: Vec<Option<ShardData>> = shards.iter().take(4).cloned().map(Some).collect();
        assert!(matches!(
            encoder.decode(&short, 9),
            Err(RsfecError::ShardSizeMismatch { expected: 5, actual: 4 })
        ));

        let mut ragged: Vec<Option<ShardData>> = shards.iter().cloned().map(Some).collect();
        ragged[4] = Some(ShardData::new(4, Bytes::from_static(&[1, 2]), true));
        assert!(matches!(
            encoder.decode(&ragged, 9),
            Err(RsfecError::ShardSizeMismatch { expected: 3, actual: 2 })
        ));

        let all: Vec<Option<ShardData>> = shards.into_iter().map(Some).collect();
        assert!(encoder.decode(&all, 10).is_err());
    }

    #[test]
    fn test_encode_parallel() {
        let encoder = ErasureEncoder::new().unwrap();
        let original = vec![42u8; 4 * 1024 * 1024];

        let shards_seq = encoder.encode(&original).unwrap();
        let shards_par = encoder.encode_parallel(&original).unwrap();
        assert_eq!(shards_seq, shards_par);
    }

    #[test]
    fn test_verify_shards() {
        let encoder = ErasureEncoder::new().unwrap();
        let original = b"verify test";

        let shards = encoder.encode(original).unwrap();
        assert!(encoder.verify_shards(&shards).unwrap());

        let mut corrupted_shards = shards.clone();
        let mut data = corrupted_shards[0].data.to_vec();
        data[0] ^= 0xFF;
        corrupted_shards[0].data = Bytes::from(data);
        assert!(!encoder.verify_shards(&corrupted_shards).unwrap());

        assert!(!encoder.verify_shards(&shards[..13]).unwrap());
    }

    #[test]
    fn test_custom_config() {
        let config = CoderConfig::new(3, 2).unwrap();
        let encoder = ErasureEncoder::with_config(config).unwrap();

        let original = b"small config test";
        let shards = encoder.encode(original).unwrap();
        assert_eq!(shards.len(), 5);
        assert!(shards.iter().all(|s| s.size() == 6));

        let mut shard_opts: Vec<Option<ShardData>> = shards.into_iter().map(Some).collect();
        shard_opts[0] = None;
        shard_opts[2] = None;
        let decoded = encoder.decode(&shard_opts, original.len()).unwrap();
        assert_eq!(decoded.as_ref(), original);
    }

    #[test]
    fn test_empty_input() {
        let encoder = ErasureEncoder::with_config(CoderConfig::new(4, 2).unwrap()).unwrap();
        let shards = encoder.encode(&[]).unwrap();
        assert_eq!(shards.len(), 6);
        assert!(shards.iter().all(|s| s.size() == 1));

        let shard_opts: Vec<Option<ShardData>> = shards.into_iter().map(Some).collect();
        assert!(encoder.decode(&shard_opts, 0).unwrap().is_empty());
    }

    #[test]
    fn test_shard_indices() {
        let encoder = ErasureEncoder::new().unwrap();
        let shards = encoder.encode(b"index test").unwrap();

        for (i, shard) in shards.iter().enumerate() {
            assert_eq!(shard.index as usize, i);
            assert_eq!(shard.is_parity, i >= 10);
        }
    }

    #[test]
    fn test_max_width_config_indices() {
        let encoder = ErasureEncoder::with_config(CoderConfig::new(250, 6).unwrap()).unwrap();
        let shards = encoder.encode(&[7u8; 1000]).unwrap();
        assert_eq!(shards.len(), 256);
        assert_eq!(shards[255].index, 255);
        assert!(shards[255].is_parity);
    }

    #[test]
    fn test_shard_serialization() {
        let shard = ShardData::new(3, Bytes::from_static(b"payload"), true);
        let bytes = bincode::serialize(&shard).unwrap();
        let back: ShardData = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, shard);
    }

    #[test]
    fn test_encode_batch() {
        let encoder = ErasureEncoder::with_config(CoderConfig::new(4, 2).unwrap()).unwrap();
        let inputs: Vec<Vec<u8>> = (0..8).map(|i| vec![i as u8; 100 + i]).collect();
        let refs: Vec<&[u8]> = inputs.iter().map(Vec::as_slice).collect();

        let batches = encode_batch(&encoder, &refs).unwrap();
        assert_eq!(batches.len(), 8);
        for (input, shards) in inputs.iter().zip(&batches) {
            assert_eq!(shards, &encoder.encode(input).unwrap());
        }
    }

    #[test]
    fn test_codec_error_converts() {
        let err: RsfecError = CodecError::InvalidBlockSize.into();
        assert!(matches!(err, RsfecError::Codec(CodecError::InvalidBlockSize)));
    }
}
