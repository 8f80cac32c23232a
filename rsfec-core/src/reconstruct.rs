//! Erasure reconstruction
//!
//! Any `data_shards` surviving shards determine the data: their rows of the
//! encoding matrix form an invertible square matrix (MDS property), and the
//! inverse maps surviving bytes back to data bytes. Erased parity is then
//! re-encoded from the repaired data.

use crate::coder::ReedSolomon;
use crate::encoder::encode_rows;
use crate::error::CodecError;
use crate::matrix::Matrix;
use tracing::{debug, error};

impl ReedSolomon {
    /// Rebuild every shard flagged in `erasures`.
    ///
    /// `shards` and `erasures` hold one entry per shard; every buffer,
    /// erased or not, must be `block_size` bytes. Only erased buffers are
    /// written, and their flags are cleared once repaired. With no erasures
    /// this is a no-op. More erasures than parity shards fails with
    /// [`CodecError::InsufficientRedundancy`] before anything is written.
    pub fn reconstruct<S>(
        &self,
        shards: &mut [S],
        erasures: &mut [bool],
        block_size: usize,
    ) -> Result<(), CodecError>
    where
        S: AsRef<[u8]> + AsMut<[u8]>,
    {
        let mut refs: Vec<&mut [u8]> = shards.iter_mut().map(AsMut::as_mut).collect();
        self.reconstruct_refs(&mut refs, erasures, block_size, false)
    }

    /// Like [`reconstruct`](Self::reconstruct) but only repairs data shards.
    ///
    /// Erased parity shards are left untouched and stay flagged.
    pub fn reconstruct_data<S>(
        &self,
        shards: &mut [S],
        erasures: &mut [bool],
        block_size: usize,
    ) -> Result<(), CodecError>
    where
        S: AsRef<[u8]> + AsMut<[u8]>,
    {
        let mut refs: Vec<&mut [u8]> = shards.iter_mut().map(AsMut::as_mut).collect();
        self.reconstruct_refs(&mut refs, erasures, block_size, true)
    }

    /// Rebuild the shards listed by index in `erased`.
    ///
    /// Equivalent to [`reconstruct`](Self::reconstruct) with a bitmap built
    /// from the list; duplicate indices are ignored.
    pub fn reconstruct_indices<S>(
        &self,
        shards: &mut [S],
        erased: &[usize],
        block_size: usize,
    ) -> Result<(), CodecError>
    where
        S: AsRef<[u8]> + AsMut<[u8]>,
    {
        let total = self.total_shards();
        let mut erasures = vec![false; total];
        for &index in erased {
            if index >= total {
                return Err(CodecError::InvalidShardIndex { index, total });
            }
            erasures[index] = true;
        }
        self.reconstruct(shards, &mut erasures, block_size)
    }

    /// Reconstruct several stripes laid out as for
    /// [`encode_stripes`](Self::encode_stripes).
    ///
    /// `erasures` has one flag per buffer in `shards`. Every stripe is
    /// checked for sufficient redundancy before any stripe is repaired.
    pub fn reconstruct_stripes<S>(
        &self,
        shards: &mut [S],
        erasures: &mut [bool],
        block_size: usize,
    ) -> Result<(), CodecError>
    where
        S: AsRef<[u8]> + AsMut<[u8]>,
    {
        let stripes = self.stripe_count(shards.len())?;
        Self::check_count("erasure flags", shards.len(), erasures.len())?;
        Self::check_block_size(block_size)?;
        Self::check_buffers(shards.iter().map(AsRef::as_ref), block_size)?;

        let (d, p) = (self.data_shards(), self.parity_shards());
        let parity_base = stripes * d;
        let stripe_flags = |k: usize, flags: &[bool]| -> Vec<bool> {
            (0..d)
                .map(|j| flags[k * d + j])
                .chain((0..p).map(|i| flags[parity_base + k * p + i]))
                .collect()
        };

        for k in 0..stripes {
            let erased = stripe_flags(k, erasures).iter().filter(|&&e| e).count();
            if erased > p {
                return Err(CodecError::InsufficientRedundancy { erased, parity: p });
            }
        }
        // With no parity every stripe passed only if nothing is erased
        if p == 0 || !erasures.contains(&true) {
            return Ok(());
        }

        let (data, parity) = shards.split_at_mut(parity_base);
        let stripes_iter = data.chunks_mut(d).zip(parity.chunks_mut(p)).enumerate();
        for (k, (data_chunk, parity_chunk)) in stripes_iter {
            let mut flags = stripe_flags(k, erasures);
            if !flags.contains(&true) {
                continue;
            }
            let mut refs: Vec<&mut [u8]> = data_chunk
                .iter_mut()
                .map(AsMut::as_mut)
                .chain(parity_chunk.iter_mut().map(AsMut::as_mut))
                .collect();

            debug!(stripe = k, "reconstructing stripe");
            self.reconstruct_refs(&mut refs, &mut flags, block_size, false)?;

            for j in 0..d {
                erasures[k * d + j] = flags[j];
            }
            for i in 0..p {
                erasures[parity_base + k * p + i] = flags[d + i];
            }
        }
        Ok(())
    }

    fn reconstruct_refs(
        &self,
        shards: &mut [&mut [u8]],
        erasures: &mut [bool],
        block_size: usize,
        data_only: bool,
    ) -> Result<(), CodecError> {
        let (d, p, total) = (self.data_shards(), self.parity_shards(), self.total_shards());
        Self::check_block_size(block_size)?;
        Self::check_count("shards", total, shards.len())?;
        Self::check_count("erasure flags", total, erasures.len())?;
        Self::check_buffers(shards.iter().map(|s| &**s), block_size)?;

        let erased = erasures.iter().filter(|&&e| e).count();
        if erased == 0 {
            return Ok(());
        }
        if erased > p {
            return Err(CodecError::InsufficientRedundancy { erased, parity: p });
        }

        let missing_data: Vec<usize> = (0..d).filter(|&i| erasures[i]).collect();
        let missing_parity: Vec<usize> = (d..total).filter(|&i| erasures[i]).collect();

        debug!(
            erased,
            data = missing_data.len(),
            parity = missing_parity.len(),
            data_only,
            "reconstructing shards"
        );

        if !missing_data.is_empty() {
            let recovered = self.recover_data(shards, erasures, &missing_data, block_size)?;
            for (&index, bytes) in missing_data.iter().zip(recovered) {
                shards[index].copy_from_slice(&bytes);
                erasures[index] = false;
            }
        }

        if data_only || missing_parity.is_empty() {
            return Ok(());
        }

        let (data, parity) = shards.split_at_mut(d);
        let inputs: Vec<&[u8]> = data.iter().map(|s| &**s).collect();
        let rows = Matrix::from_rows(
            &missing_parity
                .iter()
                .map(|&i| self.parity_rows().row(i - d).to_vec())
                .collect::<Vec<_>>(),
        )?;
        let mut outputs: Vec<&mut [u8]> = parity
            .iter_mut()
            .enumerate()
            .filter(|(i, _)| erasures[d + i])
            .map(|(_, s)| &mut **s)
            .collect();
        encode_rows(&rows, &inputs, &mut outputs);

        for &index in &missing_parity {
            erasures[index] = false;
        }
        Ok(())
    }

    /// Solve for the erased data shards from the first `data_shards`
    /// surviving shards. Nothing in `shards` is modified.
    fn recover_data(
        &self,
        shards: &[&mut [u8]],
        erasures: &[bool],
        missing: &[usize],
        block_size: usize,
    ) -> Result<Vec<Vec<u8>>, CodecError> {
        let d = self.data_shards();
        let survivors: Vec<usize> = (0..self.total_shards())
            .filter(|&i| !erasures[i])
            .take(d)
            .collect();

        let decode = self
            .encoding_matrix()
            .sub_matrix(&survivors)
            .and_then(|sub| sub.invert())
            .map_err(|err| {
                error!(
                    data_shards = d,
                    parity_shards = self.parity_shards(),
                    ?survivors,
                    %err,
                    "decode matrix could not be inverted"
                );
                CodecError::from(err)
            })?;

        let rows = Matrix::from_rows(
            &missing
                .iter()
                .map(|&i| decode.row(i).to_vec())
                .collect::<Vec<_>>(),
        )?;
        let inputs: Vec<&[u8]> = survivors.iter().map(|&i| &*shards[i]).collect();
        let mut recovered = vec![vec![0u8; block_size]; missing.len()];
        {
            let mut outputs: Vec<&mut [u8]> = recovered.iter_mut().map(Vec::as_mut_slice).collect();
            encode_rows(&rows, &inputs, &mut outputs);
        }
        Ok(recovered)
    }
}
