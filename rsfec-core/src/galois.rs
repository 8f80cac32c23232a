//! GF(2^8) arithmetic
//!
//! Elements are bytes, interpreted as polynomials over GF(2) reduced modulo
//! the primitive polynomial x^8 + x^4 + x^3 + x^2 + 1 (0x11D). Multiplication
//! and division go through log/antilog tables generated from the element 2.
//!
//! The tables live in an immutable [`GaloisField`] built once per process
//! behind a [`OnceLock`]. Call [`initialize_field`] at startup to pay the
//! construction cost up front; otherwise the first arithmetic call does it.

use crate::error::FieldError;
use std::sync::OnceLock;

/// Primitive polynomial x^8 + x^4 + x^3 + x^2 + 1
pub const PRIMITIVE_POLYNOMIAL: u16 = 0x11D;

/// Generator element used to build the log tables
pub const GENERATOR: u8 = 2;

/// Number of nonzero field elements (order of the multiplicative group)
pub const FIELD_ORDER: usize = 255;

static FIELD: OnceLock<GaloisField> = OnceLock::new();

/// Build the field tables if they do not exist yet and return them.
///
/// Idempotent: every call returns the same instance.
pub fn initialize_field() -> &'static GaloisField {
    FIELD.get_or_init(GaloisField::new)
}

/// Shared field tables, initialized lazily on first use
#[inline]
pub fn field() -> &'static GaloisField {
    initialize_field()
}

/// Precomputed GF(256) tables
pub struct GaloisField {
    /// Antilog table, doubled so `exp[log a + log b]` needs no reduction
    exp: [u8; 512],
    /// Log table; `log[0]` is unused
    log: [u8; 256],
    /// Full product table, `mul_table[a][b] == a * b`
    mul_table: Vec<[u8; 256]>,
}

impl GaloisField {
    fn new() -> Self {
        let mut exp = [0u8; 512];
        let mut log = [0u8; 256];

        let mut x: u16 = 1;
        for i in 0..FIELD_ORDER {
            exp[i] = x as u8;
            log[x as usize] = i as u8;
            x <<= 1;
            if x & 0x100 != 0 {
                x ^= PRIMITIVE_POLYNOMIAL;
            }
        }
        for i in FIELD_ORDER..exp.len() {
            exp[i] = exp[i - FIELD_ORDER];
        }

        let mut mul_table = vec![[0u8; 256]; 256];
        for a in 1..256 {
            let la = log[a] as usize;
            for b in 1..256 {
                mul_table[a][b] = exp[la + log[b] as usize];
            }
        }

        Self {
            exp,
            log,
            mul_table,
        }
    }

    /// `a * b`
    #[inline]
    pub fn mul(&self, a: u8, b: u8) -> u8 {
        if a == 0 || b == 0 {
            return 0;
        }
        self.exp[self.log[a as usize] as usize + self.log[b as usize] as usize]
    }

    /// `a / b`
    #[inline]
    pub fn div(&self, a: u8, b: u8) -> Result<u8, FieldError> {
        if b == 0 {
            return Err(FieldError::DivideByZero);
        }
        if a == 0 {
            return Ok(0);
        }
        let idx = self.log[a as usize] as usize + FIELD_ORDER - self.log[b as usize] as usize;
        Ok(self.exp[idx])
    }

    /// Multiplicative inverse of `a`
    #[inline]
    pub fn inv(&self, a: u8) -> Result<u8, FieldError> {
        if a == 0 {
            return Err(FieldError::InverseOfZero);
        }
        Ok(self.exp[FIELD_ORDER - self.log[a as usize] as usize])
    }

    /// `a` raised to the `n`th power
    pub fn exp(&self, a: u8, n: usize) -> u8 {
        if n == 0 {
            return 1;
        }
        if a == 0 {
            return 0;
        }
        self.exp[(self.log[a as usize] as usize * (n % FIELD_ORDER)) % FIELD_ORDER]
    }

    /// Discrete log of a nonzero element
    pub fn log(&self, a: u8) -> Result<u8, FieldError> {
        if a == 0 {
            return Err(FieldError::LogOfZero);
        }
        Ok(self.log[a as usize])
    }

    /// Row of the product table for a fixed multiplier
    #[inline]
    pub fn mul_row(&self, c: u8) -> &[u8; 256] {
        &self.mul_table[c as usize]
    }

    /// `out[i] = c * input[i]`
    ///
    /// Both slices must have the same length.
    pub fn mul_slice(&self, c: u8, input: &[u8], out: &mut [u8]) {
        debug_assert_eq!(input.len(), out.len());
        let row = self.mul_row(c);
        for (o, &i) in out.iter_mut().zip(input) {
            *o = row[i as usize];
        }
    }

    /// `out[i] ^= c * input[i]`
    pub fn mul_slice_xor(&self, c: u8, input: &[u8], out: &mut [u8]) {
        debug_assert_eq!(input.len(), out.len());
        match c {
            0 => {}
            1 => {
                for (o, &i) in out.iter_mut().zip(input) {
                    *o ^= i;
                }
            }
            _ => {
                let row = self.mul_row(c);
                for (o, &i) in out.iter_mut().zip(input) {
                    *o ^= row[i as usize];
                }
            }
        }
    }
}

impl std::fmt::Debug for GaloisField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GaloisField")
            .field("polynomial", &format_args!("{:#x}", PRIMITIVE_POLYNOMIAL))
            .field("generator", &GENERATOR)
            .finish()
    }
}

/// Addition (and subtraction) in GF(256) is XOR
#[inline]
pub fn add(a: u8, b: u8) -> u8 {
    a ^ b
}

/// `a * b` using the shared tables
#[inline]
pub fn mul(a: u8, b: u8) -> u8 {
    field().mul(a, b)
}

/// `a / b` using the shared tables
#[inline]
pub fn div(a: u8, b: u8) -> Result<u8, FieldError> {
    field().div(a, b)
}

/// Inverse of `a` using the shared tables
#[inline]
pub fn inv(a: u8) -> Result<u8, FieldError> {
    field().inv(a)
}

/// `a^n` using the shared tables
pub fn exp(a: u8, n: usize) -> u8 {
    field().exp(a, n)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Carry-less multiply with reduction, independent of the tables
    fn slow_mul(mut a: u8, mut b: u8) -> u8 {
        let mut product = 0u8;
        while b != 0 {
            if b & 1 != 0 {
                product ^= a;
            }
            let carry = a & 0x80 != 0;
            a <<= 1;
            if carry {
                a ^= (PRIMITIVE_POLYNOMIAL & 0xFF) as u8;
            }
            b >>= 1;
        }
        product
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let first = initialize_field() as *const GaloisField;
        let second = initialize_field() as *const GaloisField;
        assert_eq!(first, second);
        assert!(std::ptr::eq(field(), initialize_field()));
    }

    #[test]
    fn test_generator_is_primitive() {
        let gf = field();
        let mut seen = [false; 256];
        for i in 0..FIELD_ORDER {
            let v = gf.exp(GENERATOR, i);
            assert_ne!(v, 0);
            assert!(!seen[v as usize], "generator repeats at power {i}");
            seen[v as usize] = true;
        }
        assert_eq!(gf.exp(GENERATOR, FIELD_ORDER), 1);
    }

    #[test]
    fn test_known_values() {
        assert_eq!(mul(2, 0x80), 0x1D);
        assert_eq!(mul(3, 7), 9);
        assert_eq!(mul(0, 0x55), 0);
        assert_eq!(mul(0x55, 0), 0);
        assert_eq!(mul(1, 0xAB), 0xAB);
        assert_eq!(add(0x0F, 0xF0), 0xFF);
    }

    #[test]
    fn test_mul_matches_slow_mul() {
        let gf = field();
        for a in 0..=255u8 {
            for b in 0..=255u8 {
                assert_eq!(gf.mul(a, b), slow_mul(a, b), "{a} * {b}");
                assert_eq!(gf.mul_row(a)[b as usize], slow_mul(a, b));
            }
        }
    }

    #[test]
    fn test_div_mul_roundtrip() {
        for a in 1..=255u8 {
            for b in 1..=255u8 {
                let q = div(a, b).unwrap();
                assert_eq!(mul(q, b), a, "({a} / {b}) * {b}");
            }
        }
    }

    #[test]
    fn test_inverse() {
        for a in 1..=255u8 {
            let ia = inv(a).unwrap();
            assert_eq!(mul(a, ia), 1, "{a} * inv({a})");
        }
        assert_eq!(inv(1).unwrap(), 1);
    }

    #[test]
    fn test_zero_operands() {
        assert_eq!(div(0, 7), Ok(0));
        assert_eq!(div(7, 0), Err(FieldError::DivideByZero));
        assert_eq!(div(0, 0), Err(FieldError::DivideByZero));
        assert_eq!(inv(0), Err(FieldError::InverseOfZero));
        assert_eq!(field().log(0), Err(FieldError::LogOfZero));
    }

    #[test]
    fn test_exp_large_exponent() {
        // The multiplicative group has order 255, so exponents reduce mod 255
        let n = usize::MAX / 2;
        assert_eq!(exp(3, n), exp(3, n % 255));
        assert_eq!(exp(2, usize::MAX), exp(2, usize::MAX % 255));
        assert_eq!(exp(7, 255 * 1_000_003), 1);
        assert_eq!(exp(0, usize::MAX), 0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic]
    fn test_mul_slice_length_mismatch() {
        let mut out = [0u8; 2];
        field().mul_slice(3, &[1, 2, 3, 4], &mut out);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic]
    fn test_mul_slice_xor_length_mismatch() {
        let mut out = [0u8; 4];
        field().mul_slice_xor(3, &[1, 2], &mut out);
    }

    #[test]
    fn test_exp() {
        assert_eq!(exp(0, 0), 1);
        assert_eq!(exp(0, 3), 0);
        assert_eq!(exp(5, 1), 5);
        assert_eq!(exp(5, 2), mul(5, 5));
        assert_eq!(exp(5, 3), mul(mul(5, 5), 5));
    }

    #[test]
    fn test_mul_slice_kernels() {
        let gf = field();
        let input: Vec<u8> = (0..=255u8).collect();

        let mut out = vec![0u8; 256];
        gf.mul_slice(0x1D, &input, &mut out);
        for (i, &o) in out.iter().enumerate() {
            assert_eq!(o, gf.mul(0x1D, i as u8));
        }

        let mut acc = vec![0xAAu8; 256];
        gf.mul_slice_xor(7, &input, &mut acc);
        for (i, &o) in acc.iter().enumerate() {
            assert_eq!(o, 0xAA ^ gf.mul(7, i as u8));
        }

        let mut unchanged = vec![0x11u8; 256];
        gf.mul_slice_xor(0, &input, &mut unchanged);
        assert!(unchanged.iter().all(|&b| b == 0x11));

        let mut xored = vec![0u8; 256];
        gf.mul_slice_xor(1, &input, &mut xored);
        assert_eq!(xored, input);
    }

    #[test]
    fn test_concurrent_initialization() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| initialize_field() as *const GaloisField as usize))
            .collect();
        let ptrs: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(ptrs.windows(2).all(|w| w[0] == w[1]));
    }
}
