//! HTTP client for the storefront service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use rusty_money::iso::{self, Currency};
use tracing::debug;
use uuid::Uuid;

use davenport::vouchers::Voucher;

use crate::config::StorefrontConfig;

use super::{
    Address, ApiError, CartSnapshot, CheckoutOutcome, CheckoutRequest, StorefrontApi,
    wire::{
        AddCartItemDto, AddressDto, CartDto, CheckoutRequestDto, CheckoutResponseDto, ErrorBodyDto,
        VoucherDto,
    },
};

/// Typed REST client for the storefront service.
///
/// Every call carries the configured timeout; a timeout surfaces as a
/// retryable [`ApiError::Http`].
#[derive(Debug, Clone)]
pub struct HttpStorefrontApi {
    base_url: String,
    token: Option<String>,
    currency: &'static Currency,
    http: Client,
}

impl HttpStorefrontApi {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when the currency code is unknown or the
    /// underlying HTTP client cannot be constructed.
    pub fn new(config: &StorefrontConfig) -> Result<Self, ApiError> {
        let currency = iso::find(&config.currency)
            .ok_or_else(|| ApiError::UnknownCurrency(config.currency.clone()))?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.api_token.clone(),
            currency,
            http,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}{path}", self.base_url));

        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn read_error(response: Response) -> ApiError {
        let status = response.status().as_u16();

        match response.json::<ErrorBodyDto>().await {
            Ok(ErrorBodyDto {
                message: Some(message),
            }) if !message.is_empty() => ApiError::Rejected { status, message },
            _ => ApiError::Status { status },
        }
    }

    async fn expect_success(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::read_error(response).await)
        }
    }
}

#[async_trait]
impl StorefrontApi for HttpStorefrontApi {
    async fn fetch_cart(&self) -> Result<CartSnapshot, ApiError> {
        let response = self.request(Method::GET, "/cart").send().await?;
        let response = Self::expect_success(response).await?;

        let dto: CartDto = response.json().await?;

        dto.into_snapshot(self.currency)
    }

    async fn fetch_addresses(&self) -> Result<Vec<Address>, ApiError> {
        let response = self.request(Method::GET, "/addresses").send().await?;
        let response = Self::expect_success(response).await?;

        let dtos: Vec<AddressDto> = response.json().await?;

        Ok(dtos.into_iter().map(Address::from).collect())
    }

    async fn lookup_voucher(&self, code: &str) -> Result<Option<Voucher<'static>>, ApiError> {
        let response = self
            .request(Method::GET, &format!("/vouchers/{code}"))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(code, "voucher code not found");

            return Ok(None);
        }

        let response = Self::expect_success(response).await?;
        let dto: VoucherDto = response.json().await?;

        dto.into_voucher(self.currency).map(Some)
    }

    async fn add_cart_item(&self, product: Uuid, quantity: u32) -> Result<(), ApiError> {
        let body = AddCartItemDto {
            product_id: product,
            quantity,
        };

        let response = self
            .request(Method::POST, "/cart/items")
            .json(&body)
            .send()
            .await?;

        Self::expect_success(response).await?;

        Ok(())
    }

    async fn remove_cart_item(&self, product: Uuid) -> Result<(), ApiError> {
        let response = self
            .request(Method::DELETE, &format!("/cart/items/{product}"))
            .send()
            .await?;

        Self::expect_success(response).await?;

        Ok(())
    }

    async fn clear_cart(&self) -> Result<(), ApiError> {
        let response = self.request(Method::DELETE, "/cart/items").send().await?;

        Self::expect_success(response).await?;

        Ok(())
    }

    async fn submit_checkout(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutOutcome, ApiError> {
        let body = CheckoutRequestDto::from(request);

        let response = self
            .request(Method::POST, "/checkout")
            .json(&body)
            .send()
            .await?;

        let response = Self::expect_success(response).await?;
        let dto: CheckoutResponseDto = response.json().await?;

        dto.into_outcome()
    }
}
