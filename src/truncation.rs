//! Rescaling a shared product from double to single fractional precision.
//!
//! After a multiplication the wrapped element encodes `x * BASE^(2F)`. The
//! protocol strips the low `F` digits without revealing the value:
//!
//! 1. `b = raw + BASE^(PRECISION + 2F)`, a public offset making `b` non-negative.
//! 2. Draw `mask` uniform in `[0, Q)`, reduced below `mask_bound`.
//! 3. Reveal `b + mask`. The mask is `BASE^KAPPA` times wider than `b`, so the
//!    opened value is statistically independent of `b`.
//! 4. Take `mask mod BASE^F` and `(b + mask) mod BASE^F`.
//! 5. `b_low` is their difference, shared as public constants.
//! 6. `c = raw - b_low`, which is divisible by `BASE^F`.
//! 7. `d = c * INVERSE`.
//!
//! The low-digit difference in step 5 may borrow once, so the result is the
//! floor of the exact quotient or one unit above it.

use crate::config::FieldConfig;
use crate::errors::MpcResult;
use crate::field::to_u128;
use crate::fixed::SharedFixedPoint;
use crate::natural::SharedNatural;
use crate::repository::ShareRepository;
use crypto_bigint::U256;
use rand::{CryptoRng, Rng};
use std::sync::Arc;
use tracing::trace;

/// Draws a truncation mask: uniform in `[0, Q)`, then reduced below the mask bound.
pub fn sample_mask<G: Rng + CryptoRng>(config: &FieldConfig, rng: &mut G) -> u128 {
    to_u128(&config.field().sample(rng)) % config.mask_bound()
}

impl<R: ShareRepository> SharedFixedPoint<R> {
    /// Truncates with masks from the thread RNG.
    pub fn truncate(self) -> MpcResult<Self> {
        self.truncate_with(&mut rand::rng())
    }

    /// Consumes a double-scale value and returns it at single scale.
    ///
    /// The pre-truncation element is discarded; only the masked sum is ever
    /// reconstructed. Must not run concurrently on the same value.
    pub fn truncate_with<G: Rng + CryptoRng>(mut self, rng: &mut G) -> MpcResult<Self> {
        let config = Arc::clone(&self.config);
        let field = config.field();
        let repo = Arc::clone(self.raw.repository());
        let constant =
            |value: u128| SharedNatural::constant(U256::from_u128(value), Arc::clone(&repo), field);

        let offset = constant(config.truncation_offset())?;
        let b = self.raw.add(&offset)?;

        let mask = sample_mask(&config, rng);
        let b_masked = b.add(&constant(mask)?)?.reveal()?;
        trace!(id = self.raw.id(), "masked value opened");

        let scale = config.scale();
        let b_masked_low = to_u128(&b_masked) % scale;
        let mask_low = mask % scale;
        let b_low = constant(b_masked_low)?.subtract(&constant(mask_low)?)?;

        let c = self.raw.subtract(&b_low)?;
        let d = c.multiply_scalar(&config.inverse())?;
        trace!(from = self.raw.id(), to = d.id(), "truncated");

        self.raw = d;
        Ok(self)
    }
}
