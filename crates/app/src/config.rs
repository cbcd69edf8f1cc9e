//! Storefront client configuration.

use clap::Args;
use davenport::payments::{DEFAULT_COD_CEILING_MINOR, PaymentPolicy};
use rusty_money::{Money, iso};

/// Connection and policy settings for the storefront client.
#[derive(Debug, Clone, Args)]
pub struct StorefrontConfig {
    /// Storefront API base URL
    #[arg(
        long,
        env = "STOREFRONT_API_URL",
        default_value = "http://localhost:8080/api"
    )]
    pub api_url: String,

    /// Bearer token for the storefront API
    #[arg(long, env = "STOREFRONT_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// ISO code of the storefront currency
    #[arg(long, env = "STOREFRONT_CURRENCY", default_value = "VND")]
    pub currency: String,

    /// Request timeout applied to every call, in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "15")]
    pub request_timeout_secs: u64,

    /// Cash-on-delivery ceiling, in minor units. Mirrors the order
    /// service's policy; override when the backend changes it.
    #[arg(long, env = "COD_CEILING", default_value_t = DEFAULT_COD_CEILING_MINOR)]
    pub cod_ceiling: i64,
}

impl StorefrontConfig {
    /// Resolve the configured currency code against the ISO table.
    #[must_use]
    pub fn resolve_currency(&self) -> Option<&'static iso::Currency> {
        iso::find(&self.currency)
    }

    /// Build the payment eligibility policy for the configured ceiling.
    #[must_use]
    pub fn payment_policy(&self, currency: &'static iso::Currency) -> PaymentPolicy<'static> {
        PaymentPolicy::new(Money::from_minor(self.cod_ceiling, currency))
    }
}
