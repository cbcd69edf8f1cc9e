//! Server-synchronized cart session.
//!
//! The storefront cart is server-owned; this session pairs the server
//! cart identity with the local priced item set. Every mutation goes
//! to the service first and is replayed locally only after the call
//! succeeds, so a failed request leaves the local cart exactly as it
//! was.

use std::sync::Arc;

use davenport::carts::{Cart, CartError, CartItem};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::api::{ApiError, CartSnapshot, StorefrontApi};

/// Errors from keeping the local cart in step with the service.
#[derive(Debug, Error)]
pub enum CartSyncError {
    /// The storefront service refused or failed the mutation.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Replaying the confirmed mutation locally failed.
    #[error(transparent)]
    Cart(#[from] CartError),
}

/// A server-backed cart with a local priced copy.
#[derive(Clone)]
pub struct CartSession {
    api: Arc<dyn StorefrontApi>,
    uuid: Uuid,
    cart: Cart<'static>,
}

impl CartSession {
    /// Wrap a fetched snapshot.
    #[must_use]
    pub fn new(api: Arc<dyn StorefrontApi>, snapshot: CartSnapshot) -> Self {
        Self {
            api,
            uuid: snapshot.uuid,
            cart: snapshot.cart,
        }
    }

    /// Server identity of the cart.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// The local priced item set.
    #[must_use]
    pub fn cart(&self) -> &Cart<'static> {
        &self.cart
    }

    /// Add a line, server first.
    ///
    /// # Errors
    ///
    /// Returns a [`CartSyncError`] when the service rejects the add or
    /// the local replay fails; the local cart is untouched on error.
    pub async fn add(&mut self, item: CartItem<'static>) -> Result<(), CartSyncError> {
        self.api
            .add_cart_item(item.product(), item.quantity())
            .await?;

        self.cart.add(item)?;

        Ok(())
    }

    /// Remove a product's line, server first. A product the server no
    /// longer knows is surfaced as the service's error.
    ///
    /// # Errors
    ///
    /// Returns a [`CartSyncError`] when the service rejects the
    /// removal; the local cart is untouched on error.
    pub async fn remove(&mut self, product: Uuid) -> Result<(), CartSyncError> {
        self.api.remove_cart_item(product).await?;

        self.cart.remove(product);

        debug!(%product, remaining = self.cart.len(), "removed cart line");

        Ok(())
    }

    /// Empty the cart, server first.
    ///
    /// # Errors
    ///
    /// Returns a [`CartSyncError`] when the service rejects the clear;
    /// the local cart is untouched on error.
    pub async fn clear(&mut self) -> Result<(), CartSyncError> {
        self.api.clear_cart().await?;

        self.cart.clear();

        Ok(())
    }

    /// Replay a removal the service has already confirmed.
    pub(crate) fn confirm_remove(&mut self, product: Uuid) {
        self.cart.remove(product);
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::{Money, iso::VND};
    use testresult::TestResult;

    use crate::api::MockStorefrontApi;

    use super::*;

    fn item(unit_price: i64, quantity: u32) -> CartItem<'static> {
        CartItem::new(
            Uuid::now_v7(),
            "Ash Coffee Table",
            None,
            Money::from_minor(unit_price, VND),
            quantity,
        )
        .expect("valid item")
    }

    fn snapshot_with(items: Vec<CartItem<'static>>) -> CartSnapshot {
        CartSnapshot {
            uuid: Uuid::now_v7(),
            cart: Cart::with_items(items, VND).expect("same currency"),
        }
    }

    #[tokio::test]
    async fn confirmed_add_updates_the_local_cart() -> TestResult {
        let mut api = MockStorefrontApi::new();
        api.expect_add_cart_item().returning(|_, _| Ok(()));

        let mut session = CartSession::new(Arc::new(api), snapshot_with(Vec::new()));

        session.add(item(2_000_000, 2)).await?;

        assert_eq!(session.cart().count(), 2);
        assert_eq!(
            session.cart().subtotal()?,
            Money::from_minor(4_000_000, VND)
        );

        Ok(())
    }

    #[tokio::test]
    async fn rejected_add_leaves_the_local_cart_alone() -> TestResult {
        let mut api = MockStorefrontApi::new();
        api.expect_add_cart_item()
            .returning(|_, _| Err(ApiError::Status { status: 409 }));

        let existing = item(1_000_000, 1);
        let mut session = CartSession::new(Arc::new(api), snapshot_with(vec![existing]));

        let result = session.add(item(2_000_000, 1)).await;

        assert!(matches!(
            result,
            Err(CartSyncError::Api(ApiError::Status { status: 409 }))
        ));
        assert_eq!(session.cart().len(), 1);
        assert_eq!(
            session.cart().subtotal()?,
            Money::from_minor(1_000_000, VND)
        );

        Ok(())
    }

    #[tokio::test]
    async fn confirmed_remove_drops_the_line() -> TestResult {
        let mut api = MockStorefrontApi::new();
        api.expect_remove_cart_item().returning(|_| Ok(()));

        let line = item(1_000_000, 1);
        let product = line.product();
        let mut session = CartSession::new(Arc::new(api), snapshot_with(vec![line]));

        session.remove(product).await?;

        assert!(session.cart().is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn failed_clear_keeps_the_items() -> TestResult {
        let mut api = MockStorefrontApi::new();
        api.expect_clear_cart()
            .returning(|| Err(ApiError::Status { status: 500 }));

        let mut session = CartSession::new(Arc::new(api), snapshot_with(vec![item(500_000, 3)]));

        let result = session.clear().await;

        assert!(result.is_err());
        assert_eq!(session.cart().count(), 3);

        Ok(())
    }
}
