//! Dense matrices over GF(256)
//!
//! Only what the coder needs: the systematic encoding matrix, row selection,
//! products, and Gauss-Jordan inversion.

use crate::error::MatrixError;
use crate::galois::{self, GaloisField};
use std::fmt;

/// Row-major matrix of GF(256) elements
#[derive(Clone, PartialEq, Eq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<u8>,
}

impl Matrix {
    /// Zero matrix
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0u8; rows * cols],
        }
    }

    /// `n x n` identity
    pub fn identity(n: usize) -> Self {
        let mut m = Self::new(n, n);
        for i in 0..n {
            m.set(i, i, 1);
        }
        m
    }

    /// Build from row vectors. All rows must have the same length.
    pub fn from_rows(rows: &[Vec<u8>]) -> Result<Self, MatrixError> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            if row.len() != cols {
                return Err(MatrixError::DimensionMismatch {
                    left: cols,
                    right: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    #[inline]
    pub fn get(&self, r: usize, c: usize) -> u8 {
        self.data[r * self.cols + c]
    }

    #[inline]
    pub fn set(&mut self, r: usize, c: usize, value: u8) {
        self.data[r * self.cols + c] = value;
    }

    /// Borrow one row
    #[inline]
    pub fn row(&self, r: usize) -> &[u8] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    fn row_mut(&mut self, r: usize) -> &mut [u8] {
        &mut self.data[r * self.cols..(r + 1) * self.cols]
    }

    fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        for c in 0..self.cols {
            self.data.swap(a * self.cols + c, b * self.cols + c);
        }
    }

    /// Copy of rows `start..end`
    pub fn row_range(&self, start: usize, end: usize) -> Self {
        Self {
            rows: end - start,
            cols: self.cols,
            data: self.data[start * self.cols..end * self.cols].to_vec(),
        }
    }

    /// Square matrix made of the given rows, in the given order
    ///
    /// The selection must contain exactly `cols` indices so the result is
    /// square.
    pub fn sub_matrix(&self, row_indices: &[usize]) -> Result<Self, MatrixError> {
        if row_indices.len() != self.cols {
            return Err(MatrixError::SizeMismatch {
                expected: self.cols,
                actual: row_indices.len(),
            });
        }
        let mut out = Self::new(row_indices.len(), self.cols);
        for (dst, &src) in row_indices.iter().enumerate() {
            if src >= self.rows {
                return Err(MatrixError::RowOutOfRange {
                    index: src,
                    rows: self.rows,
                });
            }
            out.row_mut(dst).copy_from_slice(self.row(src));
        }
        Ok(out)
    }

    /// Matrix product `self * other`
    pub fn multiply(&self, other: &Matrix) -> Result<Self, MatrixError> {
        if self.cols != other.rows {
            return Err(MatrixError::DimensionMismatch {
                left: self.cols,
                right: other.rows,
            });
        }
        let gf = galois::field();
        let mut out = Self::new(self.rows, other.cols);
        for r in 0..self.rows {
            for c in 0..other.cols {
                let mut acc = 0u8;
                for k in 0..self.cols {
                    acc ^= gf.mul(self.get(r, k), other.get(k, c));
                }
                out.set(r, c, acc);
            }
        }
        Ok(out)
    }

    /// Matrix-vector product, one byte position at a time
    pub fn mul_vec(&self, input: &[u8]) -> Result<Vec<u8>, MatrixError> {
        if input.len() != self.cols {
            return Err(MatrixError::DimensionMismatch {
                left: self.cols,
                right: input.len(),
            });
        }
        let gf = galois::field();
        Ok((0..self.rows)
            .map(|r| {
                self.row(r)
                    .iter()
                    .zip(input)
                    .fold(0u8, |acc, (&m, &x)| acc ^ gf.mul(m, x))
            })
            .collect())
    }

    /// Inverse via Gauss-Jordan elimination on `[self | I]`
    pub fn invert(&self) -> Result<Self, MatrixError> {
        if !self.is_square() {
            return Err(MatrixError::NotSquare {
                rows: self.rows,
                cols: self.cols,
            });
        }
        let n = self.rows;
        let gf = galois::field();
        let mut work = self.augment(&Matrix::identity(n));

        for col in 0..n {
            let pivot = (col..n)
                .find(|&r| work.get(r, col) != 0)
                .ok_or(MatrixError::Singular)?;
            work.swap_rows(col, pivot);

            let scale = gf.inv(work.get(col, col))?;
            if scale != 1 {
                let row = work.row_mut(col);
                for v in row.iter_mut() {
                    *v = gf.mul(*v, scale);
                }
            }

            let pivot_row = work.row(col).to_vec();
            for r in 0..n {
                if r == col {
                    continue;
                }
                let factor = work.get(r, col);
                if factor != 0 {
                    eliminate(gf, factor, &pivot_row, work.row_mut(r));
                }
            }
        }

        let mut out = Self::new(n, n);
        for r in 0..n {
            out.row_mut(r).copy_from_slice(&work.row(r)[n..]);
        }
        Ok(out)
    }

    /// `[self | right]`
    fn augment(&self, right: &Matrix) -> Self {
        let cols = self.cols + right.cols;
        let mut out = Self::new(self.rows, cols);
        for r in 0..self.rows {
            let row = out.row_mut(r);
            row[..self.cols].copy_from_slice(self.row(r));
            row[self.cols..].copy_from_slice(right.row(r));
        }
        out
    }
}

/// `target -= factor * source` (subtraction is XOR)
fn eliminate(gf: &GaloisField, factor: u8, source: &[u8], target: &mut [u8]) {
    gf.mul_slice_xor(factor, source, target);
}

impl fmt::Debug for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Matrix {}x{} [", self.rows, self.cols)?;
        for r in 0..self.rows {
            write!(f, "  ")?;
            for v in self.row(r) {
                write!(f, "{v:02x} ")?;
            }
            writeln!(f)?;
        }
        write!(f, "]")
    }
}

/// Systematic `(data + parity) x data` encoding matrix
///
/// The top `data_shards` rows are the identity. Parity row `i`, column `j`
/// holds `1 / (x_i ^ y_j)` with `y_j = j` and `x_i = data_shards + i`; the
/// points are distinct bytes, so no denominator is zero and the parity block
/// is a Cauchy matrix. Every square submatrix of a Cauchy matrix is
/// nonsingular, which makes any `data_shards` rows of the result invertible.
///
/// Callers guarantee `data_shards + parity_shards <= 256`.
pub fn build_encoding_matrix(
    data_shards: usize,
    parity_shards: usize,
) -> Result<Matrix, MatrixError> {
    let gf = galois::field();
    let total = data_shards + parity_shards;
    let mut m = Matrix::new(total, data_shards);

    for i in 0..data_shards {
        m.set(i, i, 1);
    }
    for i in 0..parity_shards {
        let x = (data_shards + i) as u8;
        for j in 0..data_shards {
            let y = j as u8;
            m.set(data_shards + i, j, gf.inv(x ^ y)?);
        }
    }
    Ok(m)
}
