//! Wire shapes of the storefront service.
//!
//! Everything the service sends is deserialized into these DTOs and
//! then parsed into core types; a body that does not fit becomes an
//! [`ApiError::Decode`] instead of loosely-typed data leaking into
//! pricing.

use davenport::carts::{Cart, CartItem};
use davenport::vouchers::{Voucher, VoucherKind};
use decimal_percentage::Percentage;
use jiff::Timestamp;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use rusty_money::{Money, iso::Currency};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Address, ApiError, CartSnapshot, CheckoutOutcome, CheckoutRequest, OrderSummary};

#[derive(Debug, Deserialize)]
pub(super) struct CartDto {
    pub id: Uuid,
    #[serde(default)]
    pub items: Vec<CartItemDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CartItemDto {
    pub product_id: Uuid,
    pub product_name: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    pub unit_price: i64,
    pub quantity: u32,
}

impl CartDto {
    pub(super) fn into_snapshot(
        self,
        currency: &'static Currency,
    ) -> Result<CartSnapshot, ApiError> {
        let items = self
            .items
            .into_iter()
            .map(|item| {
                CartItem::new(
                    item.product_id,
                    item.product_name,
                    item.thumbnail,
                    Money::from_minor(item.unit_price, currency),
                    item.quantity,
                )
                .map_err(|error| ApiError::Decode(error.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let cart = Cart::with_items(items, currency)
            .map_err(|error| ApiError::Decode(error.to_string()))?;

        Ok(CartSnapshot {
            uuid: self.id,
            cart,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct AddressDto {
    pub id: Uuid,
    pub recipient: String,
    pub phone: String,
    pub street: String,
    pub ward: String,
    pub district: String,
    pub province: String,
    #[serde(default)]
    pub is_default: bool,
}

impl From<AddressDto> for Address {
    fn from(dto: AddressDto) -> Self {
        Self {
            uuid: dto.id,
            recipient: dto.recipient,
            phone: dto.phone,
            street: dto.street,
            ward: dto.ward,
            district: dto.district,
            province: dto.province,
            is_default: dto.is_default,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(super) enum VoucherTypeDto {
    Percentage,
    FixedAmount,
}

#[derive(Debug, Deserialize)]
pub(super) struct VoucherDto {
    pub code: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: VoucherTypeDto,
    pub amount: Decimal,
    pub minimum_order_amount: i64,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
}

impl VoucherDto {
    pub(super) fn into_voucher(
        self,
        currency: &'static Currency,
    ) -> Result<Voucher<'static>, ApiError> {
        let kind = match self.kind {
            VoucherTypeDto::Percentage => {
                // The wire carries percent points (10 means 10% off).
                let ratio = self
                    .amount
                    .to_f64()
                    .map(|points| points / 100.0)
                    .filter(|ratio| ratio.is_finite() && *ratio >= 0.0)
                    .ok_or_else(|| {
                        ApiError::Decode(format!("invalid voucher percentage: {}", self.amount))
                    })?;

                VoucherKind::Percentage(Percentage::from(ratio))
            }
            VoucherTypeDto::FixedAmount => {
                let minor = self.amount.to_i64().ok_or_else(|| {
                    ApiError::Decode(format!("invalid voucher amount: {}", self.amount))
                })?;

                VoucherKind::FixedAmount(Money::from_minor(minor, currency))
            }
        };

        Ok(Voucher::new(
            self.code,
            self.name,
            kind,
            Money::from_minor(self.minimum_order_amount, currency),
            self.start_date,
            self.end_date,
        ))
    }
}

#[derive(Debug, Serialize)]
pub(super) struct AddCartItemDto {
    pub product_id: Uuid,
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
pub(super) struct CheckoutRequestDto<'a> {
    pub address_id: Uuid,
    pub cart_id: Uuid,
    pub payment_method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voucher_code: Option<&'a str>,
}

impl<'a> From<&'a CheckoutRequest> for CheckoutRequestDto<'a> {
    fn from(request: &'a CheckoutRequest) -> Self {
        Self {
            address_id: request.address,
            cart_id: request.cart,
            payment_method: request.method.as_str(),
            voucher_code: request.voucher_code.as_deref(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct OrderDto {
    pub id: Uuid,
    pub code: String,
    pub total: i64,
}

#[derive(Debug, Deserialize)]
pub(super) struct CheckoutResponseDto {
    #[serde(default)]
    pub payment_url: Option<String>,
    #[serde(default)]
    pub order: Option<OrderDto>,
}

impl CheckoutResponseDto {
    pub(super) fn into_outcome(self) -> Result<CheckoutOutcome, ApiError> {
        if let Some(payment_url) = self.payment_url {
            return Ok(CheckoutOutcome::Redirect { payment_url });
        }

        if let Some(order) = self.order {
            return Ok(CheckoutOutcome::Confirmed(OrderSummary {
                uuid: order.id,
                code: order.code,
                total: order.total,
            }));
        }

        Err(ApiError::Decode(
            "checkout response carried neither a payment URL nor an order".to_string(),
        ))
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorBodyDto {
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::VND;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn cart_parses_into_core_items() -> TestResult {
        let body = r#"{
            "id": "0198c0de-0000-7000-8000-000000000001",
            "items": [
                {
                    "product_id": "0198c0de-0000-7000-8000-000000000002",
                    "product_name": "Oak Side Table",
                    "thumbnail": "https://cdn.example/oak.jpg",
                    "unit_price": 1500000,
                    "quantity": 2
                }
            ]
        }"#;

        let dto: CartDto = serde_json::from_str(body)?;
        let snapshot = dto.into_snapshot(VND)?;

        assert_eq!(snapshot.cart.len(), 1);
        assert_eq!(
            snapshot.cart.subtotal()?,
            Money::from_minor(3_000_000, VND)
        );

        Ok(())
    }

    #[test]
    fn zero_quantity_line_is_a_decode_error() -> TestResult {
        let body = r#"{
            "id": "0198c0de-0000-7000-8000-000000000001",
            "items": [
                {
                    "product_id": "0198c0de-0000-7000-8000-000000000002",
                    "product_name": "Oak Side Table",
                    "unit_price": 1500000,
                    "quantity": 0
                }
            ]
        }"#;

        let dto: CartDto = serde_json::from_str(body)?;
        let result = dto.into_snapshot(VND);

        assert!(matches!(result, Err(ApiError::Decode(_))));

        Ok(())
    }

    #[test]
    fn percentage_voucher_parses_percent_points() -> TestResult {
        let body = r#"{
            "code": "SALE10",
            "name": "Storewide Sale",
            "type": "PERCENTAGE",
            "amount": 10,
            "minimum_order_amount": 1000000,
            "start_date": "2026-01-01T00:00:00Z",
            "end_date": "2026-12-31T23:59:59Z"
        }"#;

        let dto: VoucherDto = serde_json::from_str(body)?;
        let voucher = dto.into_voucher(VND)?;

        let now: Timestamp = "2026-06-01T00:00:00Z".parse()?;
        let subtotal = Money::from_minor(15_000_000, VND);

        let evaluation = voucher.evaluate(&subtotal, now)?;

        assert!(
            matches!(
                evaluation,
                davenport::vouchers::Evaluation::Applied { discount }
                    if discount == Money::from_minor(1_500_000, VND)
            ),
            "10 percent points must mean a 10% discount"
        );

        Ok(())
    }

    #[test]
    fn fixed_amount_voucher_parses_minor_units() -> TestResult {
        let body = r#"{
            "code": "FLAT500",
            "name": "Flat Off",
            "type": "FIXED_AMOUNT",
            "amount": 500000,
            "minimum_order_amount": 0,
            "start_date": "2026-01-01T00:00:00Z",
            "end_date": "2026-12-31T23:59:59Z"
        }"#;

        let dto: VoucherDto = serde_json::from_str(body)?;
        let voucher = dto.into_voucher(VND)?;

        assert!(matches!(
            voucher.kind(),
            VoucherKind::FixedAmount(amount) if *amount == Money::from_minor(500_000, VND)
        ));

        Ok(())
    }

    #[test]
    fn checkout_response_prefers_the_payment_url() -> TestResult {
        let body = r#"{"payment_url": "https://pay.example/tx/42"}"#;

        let dto: CheckoutResponseDto = serde_json::from_str(body)?;

        assert_eq!(
            dto.into_outcome()?,
            CheckoutOutcome::Redirect {
                payment_url: "https://pay.example/tx/42".to_string()
            }
        );

        Ok(())
    }

    #[test]
    fn checkout_response_with_order_confirms() -> TestResult {
        let body = r#"{
            "order": {
                "id": "0198c0de-0000-7000-8000-00000000000a",
                "code": "ORD-2026-0042",
                "total": 13500000
            }
        }"#;

        let dto: CheckoutResponseDto = serde_json::from_str(body)?;
        let outcome = dto.into_outcome()?;

        assert!(matches!(
            outcome,
            CheckoutOutcome::Confirmed(OrderSummary { code, total: 13_500_000, .. })
                if code == "ORD-2026-0042"
        ));

        Ok(())
    }

    #[test]
    fn empty_checkout_response_is_a_decode_error() -> TestResult {
        let dto: CheckoutResponseDto = serde_json::from_str("{}")?;

        assert!(matches!(dto.into_outcome(), Err(ApiError::Decode(_))));

        Ok(())
    }

    #[test]
    fn checkout_request_omits_an_absent_voucher() -> TestResult {
        let request = CheckoutRequest {
            address: Uuid::now_v7(),
            cart: Uuid::now_v7(),
            method: davenport::payments::PaymentMethod::VnPay,
            voucher_code: None,
        };

        let json = serde_json::to_value(CheckoutRequestDto::from(&request))?;

        assert_eq!(json["payment_method"], "VNPAY");
        assert!(json.get("voucher_code").is_none());

        Ok(())
    }
}
