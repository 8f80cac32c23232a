//! Parity generation
//!
//! Parity shard `i` is `Σ_j M[data + i][j] * data[j]`, evaluated
//! independently at every byte position of the block.

use crate::coder::ReedSolomon;
use crate::error::CodecError;
use crate::galois;
use crate::matrix::Matrix;
use rayon::prelude::*;

impl ReedSolomon {
    /// Compute parity shards from data shards.
    ///
    /// `data` must hold exactly `data_shards` buffers and `parity` exactly
    /// `parity_shards` buffers, all `block_size` bytes long. Only `parity` is
    /// written.
    pub fn encode<D, P>(
        &self,
        data: &[D],
        parity: &mut [P],
        block_size: usize,
    ) -> Result<(), CodecError>
    where
        D: AsRef<[u8]>,
        P: AsMut<[u8]>,
    {
        Self::check_block_size(block_size)?;
        Self::check_count("data shards", self.data_shards(), data.len())?;
        Self::check_count("parity shards", self.parity_shards(), parity.len())?;

        let inputs: Vec<&[u8]> = data.iter().map(AsRef::as_ref).collect();
        let mut outputs: Vec<&mut [u8]> = parity.iter_mut().map(AsMut::as_mut).collect();
        Self::check_buffers(inputs.iter().copied(), block_size)?;
        Self::check_buffers(outputs.iter().map(|s| &**s), block_size)?;

        encode_rows(self.parity_rows(), &inputs, &mut outputs);
        Ok(())
    }

    /// Same as [`encode`](Self::encode), computing parity shards on the rayon
    /// pool. Output is byte-identical to the sequential path.
    pub fn encode_parallel<D, P>(
        &self,
        data: &[D],
        parity: &mut [P],
        block_size: usize,
    ) -> Result<(), CodecError>
    where
        D: AsRef<[u8]> + Sync,
        P: AsMut<[u8]> + Send,
    {
        Self::check_block_size(block_size)?;
        Self::check_count("data shards", self.data_shards(), data.len())?;
        Self::check_count("parity shards", self.parity_shards(), parity.len())?;

        let inputs: Vec<&[u8]> = data.iter().map(AsRef::as_ref).collect();
        let mut outputs: Vec<&mut [u8]> = parity.iter_mut().map(AsMut::as_mut).collect();
        Self::check_buffers(inputs.iter().copied(), block_size)?;
        Self::check_buffers(outputs.iter().map(|s| &**s), block_size)?;

        let rows = self.parity_rows();
        outputs
            .par_iter_mut()
            .enumerate()
            .for_each(|(r, out)| encode_row(rows.row(r), &inputs, out));
        Ok(())
    }

    /// Encode with data and parity in one shard array.
    ///
    /// Shards `0..data_shards` are read, shards `data_shards..total_shards`
    /// are overwritten.
    pub fn encode_in_place<S>(&self, shards: &mut [S], block_size: usize) -> Result<(), CodecError>
    where
        S: AsRef<[u8]> + AsMut<[u8]>,
    {
        Self::check_count("shards", self.total_shards(), shards.len())?;
        let (data, parity) = shards.split_at_mut(self.data_shards());
        self.encode(data, parity, block_size)
    }

    /// Encode several stripes laid out back to back.
    ///
    /// `shards.len()` must be a positive multiple `n` of `total_shards`. The
    /// first `n * data_shards` buffers are data blocks, the remaining
    /// `n * parity_shards` are parity blocks; stripe `k` encodes data blocks
    /// `k * data_shards..` into parity blocks `k * parity_shards..` of the
    /// parity region.
    pub fn encode_stripes<S>(&self, shards: &mut [S], block_size: usize) -> Result<(), CodecError>
    where
        S: AsRef<[u8]> + AsMut<[u8]>,
    {
        let stripes = self.stripe_count(shards.len())?;
        Self::check_block_size(block_size)?;
        Self::check_buffers(shards.iter().map(AsRef::as_ref), block_size)?;

        let (d, p) = (self.data_shards(), self.parity_shards());
        if p == 0 {
            return Ok(());
        }
        let (data, parity) = shards.split_at_mut(stripes * d);
        for (data, parity) in data.chunks(d).zip(parity.chunks_mut(p)) {
            self.encode(data, parity, block_size)?;
        }
        Ok(())
    }

    /// Check that the parity shards match the data shards.
    ///
    /// Returns `Ok(false)` on a parity mismatch; malformed input is an error.
    pub fn verify<S>(&self, shards: &[S], block_size: usize) -> Result<bool, CodecError>
    where
        S: AsRef<[u8]>,
    {
        Self::check_block_size(block_size)?;
        Self::check_count("shards", self.total_shards(), shards.len())?;
        Self::check_buffers(shards.iter().map(AsRef::as_ref), block_size)?;

        let (data, parity) = shards.split_at(self.data_shards());
        let mut expected = vec![vec![0u8; block_size]; self.parity_shards()];
        self.encode(data, &mut expected, block_size)?;

        Ok(expected
            .iter()
            .zip(parity)
            .all(|(want, got)| want.as_slice() == got.as_ref()))
    }

    pub(crate) fn stripe_count(&self, len: usize) -> Result<usize, CodecError> {
        let total = self.total_shards();
        if len == 0 || len % total != 0 {
            return Err(CodecError::LengthMismatch {
                what: "stripe shards",
                expected: (len / total).max(1) * total,
                actual: len,
            });
        }
        Ok(len / total)
    }
}

/// `outputs[r] = rows[r] · inputs` for every output row
pub(crate) fn encode_rows(rows: &Matrix, inputs: &[&[u8]], outputs: &mut [&mut [u8]]) {
    for (r, out) in outputs.iter_mut().enumerate() {
        encode_row(rows.row(r), inputs, out);
    }
}

fn encode_row(coefficients: &[u8], inputs: &[&[u8]], out: &mut [u8]) {
    let gf = galois::field();
    let mut terms = coefficients.iter().zip(inputs);
    if let Some((&c, input)) = terms.next() {
        gf.mul_slice(c, input, out);
    }
    for (&c, input) in terms {
        gf.mul_slice_xor(c, input, out);
    }
}
