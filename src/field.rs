//! Arithmetic in the prime field `Z_q` that every share lives in.
//!
//! Elements are stored as [`U256`] so that products of two reduced elements
//! never overflow before reduction. The modulus itself is restricted to
//! `q < 2^128`, which keeps centered residues inside `i128`.

use crypto_bigint::{NonZero, U256};
use rand::{CryptoRng, Rng};

/// Modulus context for field arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimeField {
    modulus: NonZero<U256>,
}

impl PrimeField {
    /// Returns `None` for moduli below 3, which cannot carry a signed encoding.
    pub fn new(modulus: u128) -> Option<Self> {
        if modulus < 3 {
            return None;
        }
        let modulus = Option::from(NonZero::new(U256::from_u128(modulus)))?;
        Some(Self { modulus })
    }

    pub fn modulus(&self) -> U256 {
        self.modulus.get()
    }

    pub fn modulus_u128(&self) -> u128 {
        to_u128(&self.modulus.get())
    }

    /// Largest element that still decodes as non-negative, `floor(q / 2)`.
    pub fn half(&self) -> U256 {
        self.modulus.get() >> 1
    }

    pub fn reduce(&self, value: &U256) -> U256 {
        value.rem(&self.modulus)
    }

    pub fn element(&self, value: u128) -> U256 {
        self.reduce(&U256::from_u128(value))
    }

    pub fn add(&self, lhs: &U256, rhs: &U256) -> U256 {
        lhs.add_mod(rhs, &self.modulus)
    }

    pub fn sub(&self, lhs: &U256, rhs: &U256) -> U256 {
        lhs.sub_mod(rhs, &self.modulus)
    }

    pub fn neg(&self, value: &U256) -> U256 {
        if *value == U256::ZERO {
            U256::ZERO
        } else {
            self.modulus.wrapping_sub(value)
        }
    }

    pub fn mul(&self, lhs: &U256, rhs: &U256) -> U256 {
        lhs.mul_mod(rhs, &self.modulus)
    }

    /// Square-and-multiply exponentiation.
    pub fn pow(&self, base: &U256, exponent: u128) -> U256 {
        let mut acc = self.reduce(&U256::ONE);
        let mut base = self.reduce(base);
        let mut exp = exponent;
        while exp > 0 {
            if exp & 1 == 1 {
                acc = self.mul(&acc, &base);
            }
            base = self.mul(&base, &base);
            exp >>= 1;
        }
        acc
    }

    /// Multiplicative inverse via Fermat's little theorem.
    ///
    /// The candidate is checked before it is returned, so a composite modulus
    /// or a zero input yields `None` instead of a wrong answer.
    pub fn inverse(&self, value: &U256) -> Option<U256> {
        let value = self.reduce(value);
        if value == U256::ZERO {
            return None;
        }
        let candidate = self.pow(&value, self.modulus_u128() - 2);
        (self.mul(&candidate, &value) == U256::ONE).then_some(candidate)
    }

    /// Maps a signed integer into `[0, q)`.
    pub fn from_i128(&self, value: i128) -> U256 {
        let magnitude = self.element(value.unsigned_abs());
        if value < 0 {
            self.neg(&magnitude)
        } else {
            magnitude
        }
    }

    /// Centered residue: elements above `q / 2` are read as `x - q`.
    pub fn centered(&self, value: &U256) -> i128 {
        let value = self.reduce(value);
        if value > self.half() {
            let magnitude = to_u128(&self.modulus.wrapping_sub(&value));
            -(magnitude as i128)
        } else {
            to_u128(&value) as i128
        }
    }

    /// Uniform element of `[0, q)`.
    ///
    /// Draws 256 bits and reduces; with `q < 2^128` the bias is below `2^-128`.
    pub fn sample<G: Rng + CryptoRng>(&self, rng: &mut G) -> U256 {
        let words: [u64; 4] = std::array::from_fn(|_| rng.random::<u64>());
        U256::from_words(words).rem(&self.modulus)
    }
}

/// Low 128 bits of a [`U256`]. Field elements always fit.
pub fn to_u128(value: &U256) -> u128 {
    let words = value.as_words();
    (words[0] as u128) | ((words[1] as u128) << 64)
}
