//! Davenport
//!
//! Davenport is the pricing core of a furniture storefront checkout: an
//! in-memory cart with a narrow mutation API, single-voucher evaluation,
//! payment-method eligibility, and a pure quote derivation that ties the
//! three together. All money is handled in minor units of a single
//! currency per cart; the crate performs no I/O and never reads the
//! clock, so every time-dependent decision takes an explicit timestamp.

pub mod carts;
pub mod checkout;
pub mod payments;
pub mod vouchers;
