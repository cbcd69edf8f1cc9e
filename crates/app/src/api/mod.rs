//! Storefront API
//!
//! The REST surface this client consumes, behind a trait so the
//! checkout flow can be exercised against mocks. Wire DTOs live in
//! [`wire`] and are parsed into core types at this boundary; untyped
//! response data never reaches pricing logic.

use async_trait::async_trait;
use davenport::carts::Cart;
use davenport::payments::PaymentMethod;
use davenport::vouchers::Voucher;
use mockall::automock;
use thiserror::Error;
use uuid::Uuid;

pub mod http;
mod wire;

pub use http::HttpStorefrontApi;

/// Errors from talking to the storefront service.
#[derive(Debug, Error)]
pub enum ApiError {
    /// An HTTP transport error occurred (includes timeouts).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service rejected the request with its own message, shown to
    /// the user verbatim.
    #[error("{message}")]
    Rejected {
        /// HTTP status of the response.
        status: u16,

        /// Server-provided message.
        message: String,
    },

    /// The service answered a non-2xx status without a usable message.
    #[error("request failed with status {status}")]
    Status {
        /// HTTP status of the response.
        status: u16,
    },

    /// The response body did not match the expected shape.
    #[error("could not decode response: {0}")]
    Decode(String),

    /// The configured currency code is not a known ISO currency.
    #[error("unknown currency code: {0}")]
    UnknownCurrency(String),
}

/// A saved shipping address.
#[derive(Debug, Clone)]
pub struct Address {
    pub uuid: Uuid,
    pub recipient: String,
    pub phone: String,
    pub street: String,
    pub ward: String,
    pub district: String,
    pub province: String,
    pub is_default: bool,
}

impl Address {
    /// One-line form for display.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{}, {}, {}, {}",
            self.street, self.ward, self.district, self.province
        )
    }
}

/// The server-side cart, identified and priced.
#[derive(Debug, Clone)]
pub struct CartSnapshot {
    /// Server identity of the cart, sent back on checkout.
    pub uuid: Uuid,

    /// The priced item set.
    pub cart: Cart<'static>,
}

/// The single atomic order-creation request.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    pub address: Uuid,
    pub cart: Uuid,
    pub method: PaymentMethod,
    pub voucher_code: Option<String>,
}

/// The created order, as confirmed for cash settlement.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSummary {
    pub uuid: Uuid,
    pub code: String,
    pub total: i64,
}

/// What the service answered to a checkout submission.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutOutcome {
    /// Cash on delivery: the order exists, show the confirmation.
    Confirmed(OrderSummary),

    /// Online payment: hand the whole page to the gateway.
    Redirect {
        /// Gateway URL the browser must navigate to.
        payment_url: String,
    },
}

/// REST operations of the storefront service consumed by checkout.
#[automock]
#[async_trait]
pub trait StorefrontApi: Send + Sync {
    /// Fetch the authenticated user's current cart.
    async fn fetch_cart(&self) -> Result<CartSnapshot, ApiError>;

    /// Fetch the user's saved shipping addresses.
    async fn fetch_addresses(&self) -> Result<Vec<Address>, ApiError>;

    /// Look a voucher up by code. `Ok(None)` means the code does not
    /// exist; validity is evaluated client-side afterwards.
    async fn lookup_voucher(&self, code: &str) -> Result<Option<Voucher<'static>>, ApiError>;

    /// Add `quantity` of a product to the server-side cart.
    async fn add_cart_item(&self, product: Uuid, quantity: u32) -> Result<(), ApiError>;

    /// Remove a product's line from the server-side cart.
    async fn remove_cart_item(&self, product: Uuid) -> Result<(), ApiError>;

    /// Empty the server-side cart.
    async fn clear_cart(&self) -> Result<(), ApiError>;

    /// Submit the order. At most one call per user confirmation.
    async fn submit_checkout(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutOutcome, ApiError>;
}
