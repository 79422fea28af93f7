//! Fixed-point encoding between `f64` values and field elements.
//!
//! A value `x` is stored as `trunc(x * BASE^PRECISION_FRACTIONAL) mod Q`, with
//! the upper half of the field standing in for negative numbers.

use crate::config::FieldConfig;
use crypto_bigint::U256;
use thiserror::Error;

pub type EncodingResult<T> = Result<T, EncodingError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodingError {
    #[error("Cannot encode non-finite value {value}")]
    NonFinite { value: f64 },

    #[error("Value {value} scales beyond the signed 128-bit range")]
    OutOfRange { value: f64 },
}

/// Encodes `value` into `[0, Q)`.
///
/// Scaled magnitudes that exceed the field but fit in `i128` wrap modulo `Q`;
/// that is a precision limit of the field, not an error.
pub fn encode(value: f64, config: &FieldConfig) -> EncodingResult<U256> {
    if !value.is_finite() {
        return Err(EncodingError::NonFinite { value });
    }
    let upscaled = (value * config.scale() as f64).trunc();
    // i128::MAX as f64 rounds up to 2^127, which itself does not fit
    if upscaled.abs() >= i128::MAX as f64 {
        return Err(EncodingError::OutOfRange { value });
    }
    Ok(config.field().from_i128(upscaled as i128))
}

/// Decodes a field element through its centered residue.
pub fn decode(element: &U256, config: &FieldConfig) -> f64 {
    let signed = config.field().centered(element);
    signed as f64 / config.scale() as f64
}
