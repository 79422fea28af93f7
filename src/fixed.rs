//! Secret-shared fixed-point numbers.
//!
//! A [`SharedFixedPoint`] is a [`SharedNatural`] read through the fixed-point
//! encoding of its [`FieldConfig`]. Addition and subtraction keep the scale;
//! multiplication doubles it and is always followed by
//! [`truncate`](SharedFixedPoint::truncate).

use crate::config::FieldConfig;
use crate::encoding::{self, EncodingError, EncodingResult};
use crate::errors::{MpcError, MpcResult};
use crate::natural::SharedNatural;
use crate::repository::ShareRepository;
use crypto_bigint::U256;
use std::fmt;
use std::sync::Arc;

/// Right-hand side of an arithmetic operator.
pub enum Operand<'a, R: ShareRepository> {
    Shared(&'a SharedFixedPoint<R>),
    Plain(f64),
}

impl<R: ShareRepository> From<f64> for Operand<'_, R> {
    fn from(value: f64) -> Self {
        Operand::Plain(value)
    }
}

impl<'a, R: ShareRepository> From<&'a SharedFixedPoint<R>> for Operand<'a, R> {
    fn from(value: &'a SharedFixedPoint<R>) -> Self {
        Operand::Shared(value)
    }
}

pub struct SharedFixedPoint<R: ShareRepository> {
    pub(crate) raw: SharedNatural<R>,
    pub(crate) config: Arc<FieldConfig>,
}

impl<R: ShareRepository> Clone for SharedFixedPoint<R> {
    fn clone(&self) -> Self {
        Self {
            raw: self.raw.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<R: ShareRepository> fmt::Debug for SharedFixedPoint<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedFixedPoint")
            .field("raw", &self.raw)
            .field("precision_fractional", &self.config.precision_fractional())
            .finish()
    }
}

impl<R: ShareRepository> SharedFixedPoint<R> {
    /// Encodes `value` and secret-shares it through the repository.
    pub fn new(value: f64, repo: Arc<R>, config: Arc<FieldConfig>) -> MpcResult<Self> {
        let encoded = encoding::encode(value, &config)?;
        let raw = SharedNatural::from_value(encoded, repo, config.field())?;
        Ok(Self { raw, config })
    }

    /// Wraps an already encoded shared element without re-encoding.
    pub fn from_natural(raw: SharedNatural<R>, config: Arc<FieldConfig>) -> Self {
        Self { raw, config }
    }

    pub fn raw(&self) -> &SharedNatural<R> {
        &self.raw
    }

    pub fn into_raw(self) -> SharedNatural<R> {
        self.raw
    }

    pub fn config(&self) -> &Arc<FieldConfig> {
        &self.config
    }

    pub fn encode(&self, value: f64) -> EncodingResult<U256> {
        encoding::encode(value, &self.config)
    }

    pub fn decode(&self, element: &U256) -> f64 {
        encoding::decode(element, &self.config)
    }

    pub fn add<'a>(&self, rhs: impl Into<Operand<'a, R>>) -> MpcResult<Self>
    where
        R: 'a,
    {
        let raw = match rhs.into() {
            Operand::Shared(other) => self.raw.add(&other.raw)?,
            Operand::Plain(value) => self.raw.add(&self.promote(value)?.raw)?,
        };
        Ok(self.wrap(raw))
    }

    pub fn sub<'a>(&self, rhs: impl Into<Operand<'a, R>>) -> MpcResult<Self>
    where
        R: 'a,
    {
        let raw = match rhs.into() {
            Operand::Shared(other) => self.raw.subtract(&other.raw)?,
            Operand::Plain(value) => self.raw.subtract(&self.promote(value)?.raw)?,
        };
        Ok(self.wrap(raw))
    }

    /// Product at single fractional scale.
    ///
    /// A plain factor is encoded and applied as a public scalar; a shared one
    /// goes through the repository's interactive multiplication.
    pub fn mul<'a>(&self, rhs: impl Into<Operand<'a, R>>) -> MpcResult<Self>
    where
        R: 'a,
    {
        let raw = match rhs.into() {
            Operand::Shared(other) => self.raw.multiply(&other.raw)?,
            Operand::Plain(value) => self.raw.multiply_scalar(&self.encode(value)?)?,
        };
        self.wrap(raw).truncate()
    }

    /// Division by a public scalar. Shared divisors are not supported.
    pub fn div<'a>(&self, rhs: impl Into<Operand<'a, R>>) -> MpcResult<Self>
    where
        R: 'a,
    {
        match rhs.into() {
            Operand::Shared(_) => Err(MpcError::Unsupported {
                operation: "division by a shared value",
            }),
            Operand::Plain(divisor) => self.divide_plain(divisor),
        }
    }

    /// `x / k` as `x * r / BASE^(2F)` with `r = round(BASE^(2F) / k)`.
    ///
    /// `r` is split into `high * BASE^F + low`. The high part is truncated
    /// once and the low part twice, so the reciprocal keeps double fractional
    /// precision and the error stays within a few steps for any in-range
    /// quotient.
    fn divide_plain(&self, divisor: f64) -> MpcResult<Self> {
        let scale = self.config.scale();
        let reciprocal = (scale as f64 * scale as f64 / divisor).round();
        if !reciprocal.is_finite() {
            return Err(EncodingError::NonFinite { value: divisor }.into());
        }
        if reciprocal.abs() >= i128::MAX as f64 {
            return Err(EncodingError::OutOfRange { value: divisor }.into());
        }
        let reciprocal = reciprocal as i128;
        // scale^2 fits u128, so scale fits i128
        let scale = scale as i128;
        let field = self.config.field();
        let high = field.from_i128(reciprocal / scale);
        let low = field.from_i128(reciprocal % scale);

        let high_part = self.wrap(self.raw.multiply_scalar(&high)?).truncate()?;
        let low_part = self
            .wrap(self.raw.multiply_scalar(&low)?)
            .truncate()?
            .truncate()?;
        high_part.add(&low_part)
    }

    /// Reconstructs and decodes the value.
    pub fn reveal(&self) -> MpcResult<f64> {
        let element = self.raw.reveal()?;
        Ok(self.decode(&element))
    }

    fn promote(&self, value: f64) -> MpcResult<Self> {
        Self::new(value, Arc::clone(self.raw.repository()), Arc::clone(&self.config))
    }

    fn wrap(&self, raw: SharedNatural<R>) -> Self {
        Self::from_natural(raw, Arc::clone(&self.config))
    }
}
