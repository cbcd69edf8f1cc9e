//! Checkout flow errors.

use davenport::{checkout::QuoteError, payments::PaymentMethod};
use thiserror::Error;

use crate::{api::ApiError, carts::CartSyncError};

/// Errors surfaced by the checkout flow.
///
/// The first five are local validation failures: they block the
/// operation without any network call and without touching the
/// current selections.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The initial load has not completed yet.
    #[error("checkout is still loading")]
    NotReady,

    /// Submission requires a shipping address.
    #[error("select a shipping address before placing the order")]
    NoAddressSelected,

    /// The chosen address is not one of the fetched addresses.
    #[error("unknown shipping address")]
    UnknownAddress,

    /// An empty cart cannot be checked out.
    #[error("the cart is empty")]
    EmptyCart,

    /// A submission is already in flight; confirm is disabled until it
    /// resolves.
    #[error("an order submission is already in progress")]
    SubmissionInFlight,

    /// The method cannot be selected at the current total.
    #[error("{method} is not available for this order total")]
    MethodNotEligible {
        /// The method the user tried to select.
        method: PaymentMethod,
    },

    /// The storefront service failed or refused a call.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A cart mutation could not be synchronized.
    #[error(transparent)]
    CartSync(#[from] CartSyncError),

    /// The pricing quote could not be derived.
    #[error(transparent)]
    Quote(#[from] QuoteError),
}
