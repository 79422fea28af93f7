//! Field and precision parameters for the fixed-point layer.
//!
//! A [`FieldConfig`] is immutable once built. Every public constant the
//! truncation protocol needs is derived and checked here, so the protocol
//! itself never has to re-validate sizes.

use crate::field::{PrimeField, to_u128};
use crypto_bigint::U256;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_MODULUS: u128 = 293973345475167247070445277780365744413;
pub const DEFAULT_BASE: u128 = 10;
pub const DEFAULT_PRECISION: u32 = 8;
pub const DEFAULT_PRECISION_FRACTIONAL: u32 = 8;
pub const DEFAULT_KAPPA: u32 = 6;
/// Inverse of `DEFAULT_BASE^DEFAULT_PRECISION_FRACTIONAL` modulo `DEFAULT_MODULUS`.
pub const DEFAULT_INVERSE: u128 = 104491423396290281423421247963055991507;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Modulus {modulus} is too small, need at least 3")]
    InvalidModulus { modulus: u128 },

    #[error("Base {base} is invalid, need at least 2")]
    InvalidBase { base: u128 },

    #[error("Fractional precision must be positive")]
    ZeroFractionalPrecision,

    #[error("{base}^{exponent} does not fit in 128 bits")]
    PowerOverflow { base: u128, exponent: u32 },

    #[error(
        "Mask bound {mask_bound} plus value bound {value_bound} must stay below modulus {modulus}"
    )]
    InsufficientHeadroom {
        value_bound: u128,
        mask_bound: u128,
        modulus: u128,
    },

    #[error("Scale {scale} has no inverse modulo {modulus}")]
    ScaleNotInvertible { scale: u128, modulus: u128 },

    #[error("Supplied inverse {inverse} does not invert scale {scale}")]
    InverseMismatch { inverse: u128, scale: u128 },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldConfig {
    field: PrimeField,
    base: u128,
    precision: u32,
    precision_fractional: u32,
    kappa: u32,
    inverse: U256,
    scale: u128,
    truncation_offset: u128,
    value_bound: u128,
    mask_bound: u128,
}

impl FieldConfig {
    pub fn builder() -> FieldConfigBuilder {
        FieldConfigBuilder::new()
    }

    pub fn field(&self) -> PrimeField {
        self.field
    }

    /// The modulus `Q`.
    pub fn modulus(&self) -> u128 {
        self.field.modulus_u128()
    }

    pub fn base(&self) -> u128 {
        self.base
    }

    /// Digits reserved for the integer part of a value.
    pub fn precision(&self) -> u32 {
        self.precision
    }

    pub fn precision_fractional(&self) -> u32 {
        self.precision_fractional
    }

    pub fn kappa(&self) -> u32 {
        self.kappa
    }

    /// `BASE^PRECISION_FRACTIONAL` inverted modulo `Q`.
    pub fn inverse(&self) -> U256 {
        self.inverse
    }

    /// `BASE^PRECISION_FRACTIONAL`, the fixed-point scaling factor.
    pub fn scale(&self) -> u128 {
        self.scale
    }

    /// Public offset added before masking, `BASE^(PRECISION + 2 * PRECISION_FRACTIONAL)`.
    ///
    /// A double-scale product whose result lies in range (magnitude below
    /// `BASE^PRECISION`) is smaller in magnitude than this, so adding it
    /// yields a non-negative integer.
    pub fn truncation_offset(&self) -> u128 {
        self.truncation_offset
    }

    /// Exclusive upper bound on an offset product.
    pub fn value_bound(&self) -> u128 {
        self.value_bound
    }

    /// Exclusive upper bound on truncation masks, `value_bound * BASE^KAPPA`.
    pub fn mask_bound(&self) -> u128 {
        self.mask_bound
    }
}

impl Default for FieldConfig {
    fn default() -> Self {
        FieldConfigBuilder::new()
            .inverse(DEFAULT_INVERSE)
            .build()
            .unwrap_or_else(|err| panic!("default field parameters rejected: {err}"))
    }
}

pub struct FieldConfigBuilder {
    modulus: Option<u128>,
    base: Option<u128>,
    precision: Option<u32>,
    precision_fractional: Option<u32>,
    kappa: Option<u32>,
    inverse: Option<u128>,
}

impl Default for FieldConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldConfigBuilder {
    pub fn new() -> Self {
        Self {
            modulus: None,
            base: None,
            precision: None,
            precision_fractional: None,
            kappa: None,
            inverse: None,
        }
    }

    pub fn modulus(mut self, modulus: u128) -> Self {
        self.modulus = Some(modulus);
        self
    }

    pub fn base(mut self, base: u128) -> Self {
        self.base = Some(base);
        self
    }

    pub fn precision(mut self, digits: u32) -> Self {
        self.precision = Some(digits);
        self
    }

    pub fn precision_fractional(mut self, digits: u32) -> Self {
        self.precision_fractional = Some(digits);
        self
    }

    pub fn kappa(mut self, kappa: u32) -> Self {
        self.kappa = Some(kappa);
        self
    }

    /// Supply a precomputed inverse of the scale. It is checked, not trusted.
    pub fn inverse(mut self, inverse: u128) -> Self {
        self.inverse = Some(inverse);
        self
    }

    pub fn build(self) -> ConfigResult<FieldConfig> {
        let modulus = self.modulus.unwrap_or(DEFAULT_MODULUS);
        let base = self.base.unwrap_or(DEFAULT_BASE);
        let precision = self.precision.unwrap_or(DEFAULT_PRECISION);
        let precision_fractional = self
            .precision_fractional
            .unwrap_or(DEFAULT_PRECISION_FRACTIONAL);
        let kappa = self.kappa.unwrap_or(DEFAULT_KAPPA);

        let field =
            PrimeField::new(modulus).ok_or(ConfigError::InvalidModulus { modulus })?;
        if base < 2 {
            return Err(ConfigError::InvalidBase { base });
        }
        if precision_fractional == 0 {
            return Err(ConfigError::ZeroFractionalPrecision);
        }

        let scale = checked_power(base, precision_fractional)?;
        let offset_exponent = precision
            .checked_add(2 * precision_fractional)
            .ok_or(ConfigError::PowerOverflow {
                base,
                exponent: u32::MAX,
            })?;
        let truncation_offset = checked_power(base, offset_exponent)?;
        let value_bound = checked_power(base, offset_exponent + 1)?;
        let mask_bound = value_bound
            .checked_mul(checked_power(base, kappa)?)
            .ok_or(ConfigError::PowerOverflow {
                base,
                exponent: offset_exponent + 1 + kappa,
            })?;

        let headroom = ConfigError::InsufficientHeadroom {
            value_bound,
            mask_bound,
            modulus,
        };
        match value_bound.checked_add(mask_bound) {
            Some(total) if total < modulus => {}
            _ => return Err(headroom),
        }

        let computed = field
            .inverse(&field.element(scale))
            .ok_or(ConfigError::ScaleNotInvertible { scale, modulus })?;
        if let Some(inverse) = self.inverse {
            if field.element(inverse) != computed {
                return Err(ConfigError::InverseMismatch { inverse, scale });
            }
        }

        debug!(
            modulus,
            base,
            precision,
            precision_fractional,
            kappa,
            truncation_offset,
            mask_bound,
            inverse = to_u128(&computed),
            "field config built"
        );

        Ok(FieldConfig {
            field,
            base,
            precision,
            precision_fractional,
            kappa,
            inverse: computed,
            scale,
            truncation_offset,
            value_bound,
            mask_bound,
        })
    }
}

fn checked_power(base: u128, exponent: u32) -> ConfigResult<u128> {
    base.checked_pow(exponent)
        .ok_or(ConfigError::PowerOverflow { base, exponent })
}
