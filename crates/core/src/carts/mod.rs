//! Carts
//!
//! The in-memory representation of what the user intends to buy. All
//! mutation goes through the cart's own operations so the derived
//! subtotal and count can never drift from the item set.

use rusty_money::{Money, MoneyError, iso::Currency};
use thiserror::Error;
use uuid::Uuid;

/// Errors related to cart construction or totals.
#[derive(Debug, Error)]
pub enum CartError {
    /// An item's currency differs from the cart currency.
    #[error("item {product} has currency {item}, but cart has currency {cart}")]
    CurrencyMismatch {
        /// Product whose price used the wrong currency.
        product: Uuid,

        /// ISO code of the offending item price.
        item: &'static str,

        /// ISO code of the cart currency.
        cart: &'static str,
    },

    /// Item quantities start at one; zero means "remove".
    #[error("item quantity must be at least 1")]
    ZeroQuantity,

    /// The product is not present in the cart.
    #[error("product {0} is not in the cart")]
    ItemNotFound(Uuid),

    /// A line or cart total exceeded the representable amount.
    #[error("amount overflows the representable range")]
    AmountOverflow,

    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// A single cart line: one product at one unit price, with a quantity.
#[derive(Clone, Debug, PartialEq)]
pub struct CartItem<'a> {
    product: Uuid,
    name: String,
    thumbnail: Option<String>,
    unit_price: Money<'a, Currency>,
    quantity: u32,
}

impl<'a> CartItem<'a> {
    /// Creates a new cart line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ZeroQuantity`] when `quantity` is zero.
    pub fn new(
        product: Uuid,
        name: impl Into<String>,
        thumbnail: Option<String>,
        unit_price: Money<'a, Currency>,
        quantity: u32,
    ) -> Result<Self, CartError> {
        if quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }

        Ok(Self {
            product,
            name: name.into(),
            thumbnail,
            unit_price,
            quantity,
        })
    }

    /// Returns the product of the line.
    pub fn product(&self) -> Uuid {
        self.product
    }

    /// Returns the display name of the product.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the thumbnail URL, if the product has one.
    pub fn thumbnail(&self) -> Option<&str> {
        self.thumbnail.as_deref()
    }

    /// Returns the unit price of the line.
    pub fn unit_price(&self) -> &Money<'a, Currency> {
        &self.unit_price
    }

    /// Returns the quantity of the line.
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Calculates `unit_price × quantity`.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::AmountOverflow`] when the multiplication does
    /// not fit in the minor-unit range.
    pub fn line_total(&self) -> Result<Money<'a, Currency>, CartError> {
        let minor = self
            .unit_price
            .to_minor_units()
            .checked_mul(i64::from(self.quantity))
            .ok_or(CartError::AmountOverflow)?;

        Ok(Money::from_minor(minor, self.unit_price.currency()))
    }
}

/// Cart
///
/// Items keep insertion order, which is irrelevant to pricing. The
/// backing collection is never handed out mutably.
#[derive(Clone, Debug)]
pub struct Cart<'a> {
    items: Vec<CartItem<'a>>,
    currency: &'static Currency,
}

impl<'a> Cart<'a> {
    /// Create a new, empty cart in the given currency.
    #[must_use]
    pub fn new(currency: &'static Currency) -> Self {
        Cart {
            items: Vec::new(),
            currency,
        }
    }

    /// Create a new cart with the given items.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError::CurrencyMismatch`] if any item's price is
    /// not in the cart currency.
    pub fn with_items(
        items: impl Into<Vec<CartItem<'a>>>,
        currency: &'static Currency,
    ) -> Result<Self, CartError> {
        let items = items.into();

        items.iter().try_for_each(|item| {
            let item_currency = item.unit_price().currency();

            if item_currency == currency {
                Ok(())
            } else {
                Err(CartError::CurrencyMismatch {
                    product: item.product(),
                    item: item_currency.iso_alpha_code,
                    cart: currency.iso_alpha_code,
                })
            }
        })?;

        Ok(Cart { items, currency })
    }

    /// Add a line to the cart.
    ///
    /// If the product is already present its quantity is incremented by
    /// the incoming quantity; otherwise the line is appended. No upper
    /// bound is enforced here, the storefront service is authoritative
    /// on stock.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError::CurrencyMismatch`] if the item's price is
    /// not in the cart currency.
    pub fn add(&mut self, item: CartItem<'a>) -> Result<(), CartError> {
        let item_currency = item.unit_price().currency();

        if item_currency != self.currency {
            return Err(CartError::CurrencyMismatch {
                product: item.product(),
                item: item_currency.iso_alpha_code,
                cart: self.currency.iso_alpha_code,
            });
        }

        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|line| line.product == item.product)
        {
            existing.quantity = existing
                .quantity
                .checked_add(item.quantity)
                .ok_or(CartError::AmountOverflow)?;

            return Ok(());
        }

        self.items.push(item);

        Ok(())
    }

    /// Replace the quantity of an existing line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ZeroQuantity`] when `quantity` is zero and
    /// [`CartError::ItemNotFound`] when the product is absent.
    pub fn set_quantity(&mut self, product: Uuid, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }

        let line = self
            .items
            .iter_mut()
            .find(|line| line.product == product)
            .ok_or(CartError::ItemNotFound(product))?;

        line.quantity = quantity;

        Ok(())
    }

    /// Remove the line for the given product. No-op when absent.
    pub fn remove(&mut self, product: Uuid) {
        self.items.retain(|line| line.product != product);
    }

    /// Empty the cart.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Look up the line for a product.
    #[must_use]
    pub fn item(&self, product: Uuid) -> Option<&CartItem<'a>> {
        self.items.iter().find(|line| line.product == product)
    }

    /// Iterate over the lines in the cart.
    pub fn iter(&self) -> impl Iterator<Item = &CartItem<'a>> {
        self.items.iter()
    }

    /// Returns the lines in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem<'a>] {
        &self.items
    }

    /// Get the number of distinct lines in the cart.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the cart is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.items
            .iter()
            .map(|line| u64::from(line.quantity))
            .sum()
    }

    /// Calculate the subtotal of the cart.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if a line total overflows or money
    /// arithmetic fails.
    pub fn subtotal(&self) -> Result<Money<'a, Currency>, CartError> {
        self.items.iter().try_fold(
            Money::from_minor(0, self.currency),
            |acc, item| Ok(acc.add(item.line_total()?)?),
        )
    }

    /// Get the currency of the cart.
    #[must_use]
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::{USD, VND};
    use testresult::TestResult;
    use uuid::Uuid;

    use super::*;

    fn line(price: i64, quantity: u32) -> CartItem<'static> {
        CartItem::new(
            Uuid::now_v7(),
            "Oak Side Table",
            None,
            Money::from_minor(price, VND),
            quantity,
        )
        .expect("valid line")
    }

    #[test]
    fn empty_cart_has_zero_subtotal() -> TestResult {
        let cart = Cart::new(VND);

        assert_eq!(cart.subtotal()?, Money::from_minor(0, VND));
        assert_eq!(cart.count(), 0);
        assert!(cart.is_empty());

        Ok(())
    }

    #[test]
    fn subtotal_is_sum_of_line_totals() -> TestResult {
        let mut cart = Cart::new(VND);

        cart.add(line(1_500_000, 2))?;
        cart.add(line(300_000, 3))?;

        assert_eq!(cart.subtotal()?, Money::from_minor(3_900_000, VND));
        assert_eq!(cart.count(), 5);
        assert_eq!(cart.len(), 2);

        Ok(())
    }

    #[test]
    fn adding_same_product_merges_quantities() -> TestResult {
        let mut cart = Cart::new(VND);
        let product = Uuid::now_v7();

        let first = CartItem::new(
            product,
            "Walnut Bookshelf",
            None,
            Money::from_minor(2_000_000, VND),
            1,
        )?;
        let second = CartItem::new(
            product,
            "Walnut Bookshelf",
            None,
            Money::from_minor(2_000_000, VND),
            2,
        )?;

        cart.add(first)?;
        cart.add(second)?;

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.count(), 3);
        assert_eq!(cart.subtotal()?, Money::from_minor(6_000_000, VND));

        Ok(())
    }

    #[test]
    fn subtotal_invariant_holds_across_mutations() -> TestResult {
        let mut cart = Cart::new(VND);
        let keep = line(1_200_000, 1);
        let dropped = line(450_000, 4);
        let keep_product = keep.product();
        let dropped_product = dropped.product();

        cart.add(keep)?;
        cart.add(dropped)?;
        cart.set_quantity(keep_product, 3)?;
        cart.remove(dropped_product);

        let expected: i64 = cart
            .iter()
            .map(|item| item.unit_price().to_minor_units() * i64::from(item.quantity()))
            .sum();

        assert_eq!(cart.subtotal()?.to_minor_units(), expected);
        assert_eq!(expected, 3_600_000);

        Ok(())
    }

    #[test]
    fn remove_unknown_product_is_noop() -> TestResult {
        let mut cart = Cart::new(VND);

        cart.add(line(100_000, 1))?;
        cart.remove(Uuid::now_v7());

        assert_eq!(cart.len(), 1);

        Ok(())
    }

    #[test]
    fn set_quantity_on_unknown_product_fails() -> TestResult {
        let mut cart = Cart::new(VND);
        let stranger = Uuid::now_v7();

        let result = cart.set_quantity(stranger, 2);

        assert!(matches!(result, Err(CartError::ItemNotFound(p)) if p == stranger));

        Ok(())
    }

    #[test]
    fn set_quantity_to_zero_is_rejected() -> TestResult {
        let mut cart = Cart::new(VND);
        let item = line(100_000, 1);
        let product = item.product();

        cart.add(item)?;

        assert!(matches!(
            cart.set_quantity(product, 0),
            Err(CartError::ZeroQuantity)
        ));

        Ok(())
    }

    #[test]
    fn zero_quantity_line_is_rejected() {
        let result = CartItem::new(
            Uuid::now_v7(),
            "Rattan Chair",
            None,
            Money::from_minor(100_000, VND),
            0,
        );

        assert!(matches!(result, Err(CartError::ZeroQuantity)));
    }

    #[test]
    fn mismatched_currency_is_rejected() -> TestResult {
        let mut cart = Cart::new(VND);

        let result = cart.add(CartItem::new(
            Uuid::now_v7(),
            "Imported Lamp",
            None,
            Money::from_minor(25_00, USD),
            1,
        )?);

        assert!(matches!(
            result,
            Err(CartError::CurrencyMismatch { item: "USD", cart: "VND", .. })
        ));

        Ok(())
    }

    #[test]
    fn clear_empties_the_cart() -> TestResult {
        let mut cart = Cart::new(VND);

        cart.add(line(100_000, 2))?;
        cart.add(line(200_000, 1))?;
        cart.clear();

        assert!(cart.is_empty());
        assert_eq!(cart.subtotal()?, Money::from_minor(0, VND));

        Ok(())
    }
}
