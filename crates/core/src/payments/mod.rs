//! Payments
//!
//! Which payment methods may settle a given payable total. Cash on
//! delivery is gated by a ceiling; the online gateway is always
//! available. The policy never leaves an ineligible method selected:
//! enforcement switches the selection to the gateway and reports the
//! switch so it can be surfaced as a notice.

use rusty_money::{Money, iso::Currency};
use smallvec::{SmallVec, smallvec};

/// Default cash-on-delivery ceiling, in minor units.
pub const DEFAULT_COD_CEILING_MINOR: i64 = 20_000_000;

/// A way to settle the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    /// Settled in cash when the order is delivered.
    CashOnDelivery,

    /// Settled online through the VNPAY gateway before fulfilment.
    VnPay,
}

impl PaymentMethod {
    /// Stable wire/display name of the method.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CashOnDelivery => "COD",
            Self::VnPay => "VNPAY",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of enforcing the policy against a current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Enforcement {
    /// The method that should be selected after enforcement.
    pub method: PaymentMethod,

    /// Whether enforcement had to switch away from the prior selection.
    pub switched: bool,
}

/// Eligibility rules for payment methods, as a function of the payable
/// total only.
#[derive(Debug, Clone)]
pub struct PaymentPolicy<'a> {
    cod_ceiling: Money<'a, Currency>,
}

impl<'a> PaymentPolicy<'a> {
    /// Create a policy with the given cash-on-delivery ceiling.
    #[must_use]
    pub fn new(cod_ceiling: Money<'a, Currency>) -> Self {
        Self { cod_ceiling }
    }

    /// Create a policy with the default ceiling in the given currency.
    #[must_use]
    pub fn with_default_ceiling(currency: &'static Currency) -> Self {
        Self::new(Money::from_minor(DEFAULT_COD_CEILING_MINOR, currency))
    }

    /// Returns the cash-on-delivery ceiling.
    pub fn cod_ceiling(&self) -> &Money<'a, Currency> {
        &self.cod_ceiling
    }

    /// Methods allowed for the given payable total.
    ///
    /// Cash on delivery is included iff the total does not exceed the
    /// ceiling (the ceiling itself is still eligible); the gateway is
    /// always included.
    #[must_use]
    pub fn eligible_methods(&self, total: &Money<'a, Currency>) -> SmallVec<[PaymentMethod; 2]> {
        if self.is_eligible(PaymentMethod::CashOnDelivery, total) {
            smallvec![PaymentMethod::CashOnDelivery, PaymentMethod::VnPay]
        } else {
            smallvec![PaymentMethod::VnPay]
        }
    }

    /// Whether a single method is allowed for the given payable total.
    #[must_use]
    pub fn is_eligible(&self, method: PaymentMethod, total: &Money<'a, Currency>) -> bool {
        match method {
            PaymentMethod::CashOnDelivery => {
                total.to_minor_units() <= self.cod_ceiling.to_minor_units()
            }
            PaymentMethod::VnPay => true,
        }
    }

    /// Keep the selection if it is still allowed, otherwise switch to
    /// the gateway and flag the switch.
    #[must_use]
    pub fn enforce(&self, selected: PaymentMethod, total: &Money<'a, Currency>) -> Enforcement {
        if self.is_eligible(selected, total) {
            Enforcement {
                method: selected,
                switched: false,
            }
        } else {
            Enforcement {
                method: PaymentMethod::VnPay,
                switched: true,
            }
        }
    }

    /// The method to preselect when none was chosen yet: cash on
    /// delivery where allowed, the gateway otherwise.
    #[must_use]
    pub fn default_method(&self, total: &Money<'a, Currency>) -> PaymentMethod {
        if self.is_eligible(PaymentMethod::CashOnDelivery, total) {
            PaymentMethod::CashOnDelivery
        } else {
            PaymentMethod::VnPay
        }
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::VND;

    use super::*;

    fn policy() -> PaymentPolicy<'static> {
        PaymentPolicy::with_default_ceiling(VND)
    }

    #[test]
    fn total_at_ceiling_keeps_cod_eligible() {
        let total = Money::from_minor(20_000_000, VND);

        let methods = policy().eligible_methods(&total);

        assert!(methods.contains(&PaymentMethod::CashOnDelivery));
        assert!(methods.contains(&PaymentMethod::VnPay));
    }

    #[test]
    fn total_above_ceiling_drops_cod() {
        let total = Money::from_minor(20_000_001, VND);

        let methods = policy().eligible_methods(&total);

        assert!(!methods.contains(&PaymentMethod::CashOnDelivery));
        assert_eq!(methods.as_slice(), [PaymentMethod::VnPay]);
    }

    #[test]
    fn enforcement_switches_ineligible_cod_to_gateway() {
        let total = Money::from_minor(25_000_000, VND);

        let enforcement = policy().enforce(PaymentMethod::CashOnDelivery, &total);

        assert_eq!(
            enforcement,
            Enforcement {
                method: PaymentMethod::VnPay,
                switched: true,
            }
        );
    }

    #[test]
    fn enforcement_keeps_eligible_selection() {
        let total = Money::from_minor(13_500_000, VND);

        let enforcement = policy().enforce(PaymentMethod::CashOnDelivery, &total);

        assert_eq!(
            enforcement,
            Enforcement {
                method: PaymentMethod::CashOnDelivery,
                switched: false,
            }
        );
    }

    #[test]
    fn gateway_is_always_eligible() {
        let total = Money::from_minor(i64::MAX, VND);

        let enforcement = policy().enforce(PaymentMethod::VnPay, &total);

        assert!(!enforcement.switched);
        assert_eq!(enforcement.method, PaymentMethod::VnPay);
    }

    #[test]
    fn default_method_prefers_cod_when_allowed() {
        let policy = policy();

        assert_eq!(
            policy.default_method(&Money::from_minor(1_000_000, VND)),
            PaymentMethod::CashOnDelivery
        );
        assert_eq!(
            policy.default_method(&Money::from_minor(25_000_000, VND)),
            PaymentMethod::VnPay
        );
    }
}
