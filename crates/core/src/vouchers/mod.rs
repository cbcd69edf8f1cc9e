//! Vouchers
//!
//! A voucher is a named, time-boxed discount rule identified by a code,
//! either percentage-based or fixed-amount, with a minimum qualifying
//! order total. Evaluation runs its checks in a fixed order so callers
//! can surface a specific, stable rejection reason, and the computed
//! discount is always capped at the subtotal.

use decimal_percentage::Percentage;
use jiff::Timestamp;
use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};
use rusty_money::{Money, MoneyError, iso::Currency};
use thiserror::Error;

/// Errors specific to discount arithmetic.
///
/// These are genuine computation failures, distinct from a
/// [`VoucherRejection`], which is an expected, recoverable outcome.
#[derive(Debug, Error)]
pub enum DiscountError {
    /// Percentage calculation could not be safely converted.
    #[error("percentage conversion overflowed or was not finite")]
    PercentConversion,

    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// Why a voucher did not apply.
///
/// The variants are ordered the way evaluation checks them; the first
/// failing check wins. Messages are shown to the user as-is, so the
/// below-minimum variant carries the amount it failed against.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VoucherRejection {
    /// No voucher exists for the submitted code.
    #[error("voucher code \"{code}\" was not found")]
    NotFound {
        /// The code as the user submitted it.
        code: String,
    },

    /// The validity window has not opened yet.
    #[error("voucher is not yet valid, it starts at {starts_at}")]
    NotYetValid {
        /// Opening of the validity window.
        starts_at: Timestamp,
    },

    /// The validity window has closed.
    #[error("voucher expired at {ended_at}")]
    Expired {
        /// Close of the validity window.
        ended_at: Timestamp,
    },

    /// The order subtotal does not reach the voucher's minimum.
    #[error("order total is below the voucher minimum of {minimum}")]
    BelowMinimum {
        /// Minimum qualifying order total, in minor units.
        minimum: i64,
    },
}

/// How a voucher's discount is computed.
#[derive(Debug, Clone)]
pub enum VoucherKind<'a> {
    /// Take a percentage off the subtotal (e.g. 10% off).
    Percentage(Percentage),

    /// Subtract a fixed amount from the subtotal (e.g. ₫50,000 off).
    FixedAmount(Money<'a, Currency>),
}

/// A named, time-boxed discount rule.
#[derive(Debug, Clone)]
pub struct Voucher<'a> {
    code: String,
    name: String,
    kind: VoucherKind<'a>,
    minimum_order: Money<'a, Currency>,
    starts_at: Timestamp,
    ends_at: Timestamp,
}

/// Outcome of evaluating a voucher against a subtotal.
#[derive(Debug, Clone)]
pub enum Evaluation<'a> {
    /// The voucher applies and yields this discount.
    Applied {
        /// Discount to subtract from the subtotal, already capped at it.
        discount: Money<'a, Currency>,
    },

    /// The voucher does not apply, with the first failing check.
    Rejected(VoucherRejection),
}

impl<'a> Voucher<'a> {
    /// Create a voucher.
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        kind: VoucherKind<'a>,
        minimum_order: Money<'a, Currency>,
        starts_at: Timestamp,
        ends_at: Timestamp,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            kind,
            minimum_order,
            starts_at,
            ends_at,
        }
    }

    /// Returns the code identifying the voucher.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Returns the display name of the voucher.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns how the discount is computed.
    pub fn kind(&self) -> &VoucherKind<'a> {
        &self.kind
    }

    /// Returns the minimum qualifying order total.
    pub fn minimum_order(&self) -> &Money<'a, Currency> {
        &self.minimum_order
    }

    /// Returns the opening of the validity window.
    pub fn starts_at(&self) -> Timestamp {
        self.starts_at
    }

    /// Returns the close of the validity window.
    pub fn ends_at(&self) -> Timestamp {
        self.ends_at
    }

    /// Evaluate the voucher against a subtotal at a point in time.
    ///
    /// Checks run in a fixed order, first failure wins: validity window
    /// opening, then closing, then the minimum order amount. A voucher
    /// that passes all three yields a discount capped at the subtotal,
    /// so the payable total never goes negative.
    ///
    /// # Errors
    ///
    /// Returns a [`DiscountError`] when the discount arithmetic itself
    /// fails; rejections are part of the `Ok` outcome.
    pub fn evaluate(
        &self,
        subtotal: &Money<'a, Currency>,
        now: Timestamp,
    ) -> Result<Evaluation<'a>, DiscountError> {
        if now < self.starts_at {
            return Ok(Evaluation::Rejected(VoucherRejection::NotYetValid {
                starts_at: self.starts_at,
            }));
        }

        if now > self.ends_at {
            return Ok(Evaluation::Rejected(VoucherRejection::Expired {
                ended_at: self.ends_at,
            }));
        }

        let subtotal_minor = subtotal.to_minor_units();
        let minimum_minor = self.minimum_order.to_minor_units();

        if subtotal_minor < minimum_minor {
            return Ok(Evaluation::Rejected(VoucherRejection::BelowMinimum {
                minimum: minimum_minor,
            }));
        }

        let raw = match &self.kind {
            VoucherKind::Percentage(percent) => percent_of_minor(percent, subtotal_minor)?,
            VoucherKind::FixedAmount(amount) => amount.to_minor_units(),
        };

        let capped = raw.clamp(0, subtotal_minor);

        Ok(Evaluation::Applied {
            discount: Money::from_minor(capped, subtotal.currency()),
        })
    }
}

/// Calculate a percentage of a minor-unit amount, rounded half away
/// from zero.
///
/// # Errors
///
/// Returns [`DiscountError::PercentConversion`] when the calculation
/// overflows or cannot be represented.
fn percent_of_minor(percent: &Percentage, minor: i64) -> Result<i64, DiscountError> {
    let minor = Decimal::from_i64(minor).ok_or(DiscountError::PercentConversion)?;

    ((*percent) * Decimal::ONE)
        .checked_mul(minor)
        .ok_or(DiscountError::PercentConversion)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(DiscountError::PercentConversion)
}
