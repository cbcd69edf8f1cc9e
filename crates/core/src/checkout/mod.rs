//! Checkout
//!
//! The pure derivation step of checkout pricing. After every mutating
//! operation (cart change, voucher change, method change) the caller
//! re-derives a [`CheckoutQuote`] from scratch: subtotal, voucher
//! evaluation, payable total, method eligibility and any forced method
//! switch all come out of one function instead of an implicit reactive
//! graph, so the re-validation rules are testable in isolation.

use jiff::Timestamp;
use rusty_money::{Money, iso::Currency};
use smallvec::SmallVec;
use thiserror::Error;

use crate::{
    carts::{Cart, CartError},
    payments::{PaymentMethod, PaymentPolicy},
    vouchers::{DiscountError, Evaluation, Voucher, VoucherRejection},
};

/// Errors that can occur while deriving a quote.
#[derive(Debug, Error)]
pub enum QuoteError {
    /// Wrapped cart total error.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Wrapped discount arithmetic error.
    #[error(transparent)]
    Discount(#[from] DiscountError),
}

/// The voucher attached to a quote, if any.
///
/// Exactly one of applied or rejected is ever held; attaching a new
/// code replaces the previous state entirely, vouchers do not stack.
#[derive(Debug, Clone)]
pub enum VoucherState<'a> {
    /// No voucher attached.
    None,

    /// The voucher applies and contributes a discount.
    Applied {
        /// The evaluated voucher.
        voucher: Voucher<'a>,

        /// Discount subtracted from the subtotal, capped at it.
        discount: Money<'a, Currency>,
    },

    /// A code was submitted but yields no discount.
    Rejected {
        /// The fetched voucher, absent when the code was not found.
        voucher: Option<Voucher<'a>>,

        /// The first failing check.
        rejection: VoucherRejection,
    },
}

impl VoucherState<'_> {
    /// The code to send with a checkout request, present only when the
    /// voucher actually applies.
    #[must_use]
    pub fn applied_code(&self) -> Option<&str> {
        match self {
            Self::Applied { voucher, .. } => Some(voucher.code()),
            Self::None | Self::Rejected { .. } => None,
        }
    }
}

/// A fully derived pricing snapshot for the checkout screen.
#[derive(Debug, Clone)]
pub struct CheckoutQuote<'a> {
    /// Sum of line totals before any discount.
    pub subtotal: Money<'a, Currency>,

    /// Current voucher outcome.
    pub voucher: VoucherState<'a>,

    /// Discount taken off the subtotal; zero unless a voucher applies.
    pub discount: Money<'a, Currency>,

    /// Payable total, `subtotal - discount`, never negative.
    pub total: Money<'a, Currency>,

    /// Methods selectable at this total.
    pub eligible_methods: SmallVec<[PaymentMethod; 2]>,

    /// The enforced method selection.
    pub method: PaymentMethod,

    /// Whether enforcement switched away from the prior selection;
    /// surfaced to the user as a non-blocking notice.
    pub method_switched: bool,
}

impl<'a> CheckoutQuote<'a> {
    /// Derive a quote from the cart, the fetched voucher (if any), the
    /// current method selection and the eligibility policy.
    ///
    /// The voucher is re-evaluated against the current subtotal on
    /// every call, so a voucher that stopped qualifying (for example
    /// after an item was removed) comes back rejected with its
    /// discount dropped from the total.
    ///
    /// # Errors
    ///
    /// Returns a [`QuoteError`] when the subtotal or the discount
    /// cannot be computed.
    pub fn derive(
        cart: &Cart<'a>,
        voucher: Option<&Voucher<'a>>,
        selected: PaymentMethod,
        policy: &PaymentPolicy<'a>,
        now: Timestamp,
    ) -> Result<Self, QuoteError> {
        let subtotal = cart.subtotal()?;
        let currency = subtotal.currency();

        let voucher_state = match voucher {
            None => VoucherState::None,
            Some(voucher) => match voucher.evaluate(&subtotal, now)? {
                Evaluation::Applied { discount } => VoucherState::Applied {
                    voucher: voucher.clone(),
                    discount,
                },
                Evaluation::Rejected(rejection) => VoucherState::Rejected {
                    voucher: Some(voucher.clone()),
                    rejection,
                },
            },
        };

        let discount = match &voucher_state {
            VoucherState::Applied { discount, .. } => *discount,
            VoucherState::None | VoucherState::Rejected { .. } => Money::from_minor(0, currency),
        };

        // The discount is capped at the subtotal, so this cannot go
        // negative; max(0) keeps the invariant explicit.
        let total_minor = (subtotal.to_minor_units() - discount.to_minor_units()).max(0);
        let total = Money::from_minor(total_minor, currency);

        let eligible_methods = policy.eligible_methods(&total);
        let enforcement = policy.enforce(selected, &total);

        Ok(Self {
            subtotal,
            voucher: voucher_state,
            discount,
            total,
            eligible_methods,
            method: enforcement.method,
            method_switched: enforcement.switched,
        })
    }
}
