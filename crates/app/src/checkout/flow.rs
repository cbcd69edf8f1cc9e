//! Checkout flow.
//!
//! One flow instance backs one checkout screen. State lives behind a
//! mutex that is only held across synchronous sections, never across
//! an await, so a pending call (a slow voucher lookup, the submission
//! itself) leaves the rest of the flow responsive.

use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicU64, Ordering},
};

use jiff::Timestamp;
use mockall::automock;
use tracing::{info, warn};
use uuid::Uuid;

use davenport::{
    checkout::{CheckoutQuote, VoucherState},
    payments::{PaymentMethod, PaymentPolicy},
    vouchers::{Voucher, VoucherRejection},
};

use crate::{
    api::{Address, CheckoutOutcome, CheckoutRequest, OrderSummary, StorefrontApi},
    carts::CartSession,
    checkout::errors::CheckoutError,
};

/// Full-page hand-off to an external URL.
///
/// Gateway payment leaves the application entirely; this seam is what
/// performs that navigation, and what tests observe instead.
#[automock]
pub trait Navigator: Send + Sync {
    /// Navigate the whole page to `url`.
    fn open_external(&self, url: &str);
}

/// Where the flow currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Initial reads (cart, addresses) have not all completed.
    Loading,

    /// Selections are mutable and the order can be confirmed.
    Ready,

    /// A submission is in flight; confirm is disabled.
    Submitting,
}

/// Result of applying a voucher code.
#[derive(Debug)]
pub enum VoucherOutcome {
    /// The code resolved to a usable discount.
    Applied {
        /// Quote including the new discount.
        quote: CheckoutQuote<'static>,
    },

    /// The code was found invalid, or does not exist.
    Rejected {
        /// Why the voucher did not apply.
        rejection: VoucherRejection,

        /// Quote without any discount from this code.
        quote: CheckoutQuote<'static>,
    },

    /// A newer lookup was issued before this one resolved; the result
    /// was discarded and the state is whatever the newer lookup made
    /// of it.
    Superseded,
}

/// How a confirmed submission ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Cash on delivery: show the confirmation for this order.
    Confirmed(OrderSummary),

    /// Online payment: the page has been handed to the gateway.
    RedirectedToGateway {
        /// The gateway URL that was navigated to.
        payment_url: String,
    },
}

/// What the user has attached to the order so far.
enum VoucherSlot {
    None,
    Fetched(Voucher<'static>),
    NotFound { code: String },
}

struct FlowState {
    phase: Phase,
    session: Option<CartSession>,
    addresses: Vec<Address>,
    selected_address: Option<Uuid>,
    voucher: VoucherSlot,
    method: PaymentMethod,
}

/// The checkout orchestrator.
pub struct CheckoutFlow {
    api: Arc<dyn StorefrontApi>,
    navigator: Arc<dyn Navigator>,
    policy: PaymentPolicy<'static>,
    state: Mutex<FlowState>,
    lookup_seq: AtomicU64,
}

impl CheckoutFlow {
    /// Create a flow in the [`Phase::Loading`] state.
    #[must_use]
    pub fn new(
        api: Arc<dyn StorefrontApi>,
        navigator: Arc<dyn Navigator>,
        policy: PaymentPolicy<'static>,
    ) -> Self {
        Self {
            api,
            navigator,
            policy,
            state: Mutex::new(FlowState {
                phase: Phase::Loading,
                session: None,
                addresses: Vec::new(),
                selected_address: None,
                voucher: VoucherSlot::None,
                method: PaymentMethod::CashOnDelivery,
            }),
            lookup_seq: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FlowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    /// Fetched addresses, empty before the first successful load.
    #[must_use]
    pub fn addresses(&self) -> Vec<Address> {
        self.lock().addresses.clone()
    }

    /// The currently selected shipping address, if any.
    #[must_use]
    pub fn selected_address(&self) -> Option<Uuid> {
        self.lock().selected_address
    }

    /// Fetch the cart and the address list, in parallel, and move to
    /// [`Phase::Ready`].
    ///
    /// Both reads must succeed; a failure leaves the flow loadable
    /// again with nothing partially applied. On the first successful
    /// load the payment method defaults to cash on delivery where the
    /// total allows it, the gateway otherwise.
    ///
    /// # Errors
    ///
    /// Returns a [`CheckoutError`] when either read or the quote
    /// derivation fails.
    pub async fn load(&self) -> Result<CheckoutQuote<'static>, CheckoutError> {
        {
            let state = self.lock();

            if state.phase == Phase::Submitting {
                return Err(CheckoutError::SubmissionInFlight);
            }
        }

        let (cart, addresses) =
            tokio::join!(self.api.fetch_cart(), self.api.fetch_addresses());

        let snapshot = cart?;
        let addresses = addresses?;

        let mut state = self.lock();
        let first_load = state.session.is_none();

        if let Some(selected) = state.selected_address
            && !addresses.iter().any(|address| address.uuid == selected)
        {
            state.selected_address = None;
        }

        state.session = Some(CartSession::new(Arc::clone(&self.api), snapshot));
        state.addresses = addresses;

        let mut quote = Self::quote_of(&state, &self.policy, Timestamp::now())?;

        if first_load {
            // A gateway-only total on entry is a default, not a switch.
            quote.method_switched = false;
        }

        state.method = quote.method;
        state.phase = Phase::Ready;

        info!(
            items = state.session.as_ref().map_or(0, |s| s.cart().len()),
            addresses = state.addresses.len(),
            "checkout ready"
        );

        Ok(quote)
    }

    /// Select a shipping address from the fetched list.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::UnknownAddress`] for an address that is
    /// not in the list, and phase errors outside [`Phase::Ready`].
    pub fn select_address(&self, address: Uuid) -> Result<(), CheckoutError> {
        let mut state = self.lock();

        Self::ensure_ready(&state)?;

        if !state.addresses.iter().any(|entry| entry.uuid == address) {
            return Err(CheckoutError::UnknownAddress);
        }

        state.selected_address = Some(address);

        Ok(())
    }

    /// Select a payment method.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::MethodNotEligible`] when the method is
    /// not allowed at the current total.
    pub fn select_method(
        &self,
        method: PaymentMethod,
    ) -> Result<CheckoutQuote<'static>, CheckoutError> {
        let mut state = self.lock();

        Self::ensure_ready(&state)?;

        let quote = Self::quote_of(&state, &self.policy, Timestamp::now())?;

        if !self.policy.is_eligible(method, &quote.total) {
            return Err(CheckoutError::MethodNotEligible { method });
        }

        state.method = method;

        let quote = Self::quote_of(&state, &self.policy, Timestamp::now())?;

        Ok(quote)
    }

    /// Look up a voucher code and attach the outcome.
    ///
    /// Applying a code replaces whatever voucher state was held
    /// before. Only the most recently issued lookup may commit: if a
    /// newer lookup was started while this one was in flight, its
    /// result is discarded and [`VoucherOutcome::Superseded`] is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns a [`CheckoutError`] when the lookup call fails; the
    /// previous voucher state is kept in that case.
    pub async fn apply_voucher(&self, code: &str) -> Result<VoucherOutcome, CheckoutError> {
        {
            let state = self.lock();

            Self::ensure_ready(&state)?;
        }

        let seq = self.lookup_seq.fetch_add(1, Ordering::SeqCst) + 1;

        let result = self.api.lookup_voucher(code).await;

        let mut state = self.lock();

        if self.lookup_seq.load(Ordering::SeqCst) != seq {
            info!(code, "voucher lookup superseded by a newer one");

            return Ok(VoucherOutcome::Superseded);
        }

        match result? {
            Some(voucher) => state.voucher = VoucherSlot::Fetched(voucher),
            None => {
                state.voucher = VoucherSlot::NotFound {
                    code: code.to_string(),
                };
            }
        }

        let quote = Self::recompute(&mut state, &self.policy)?;

        // A code was just attached, so the derived state is either
        // applied or rejected.
        match &quote.voucher {
            VoucherState::Rejected { rejection, .. } => {
                let rejection = rejection.clone();

                info!(code, %rejection, "voucher rejected");

                Ok(VoucherOutcome::Rejected { rejection, quote })
            }
            VoucherState::Applied { .. } | VoucherState::None => {
                Ok(VoucherOutcome::Applied { quote })
            }
        }
    }

    /// Detach any voucher and recompute.
    ///
    /// # Errors
    ///
    /// Returns a [`CheckoutError`] outside [`Phase::Ready`] or when the
    /// quote derivation fails.
    pub fn clear_voucher(&self) -> Result<CheckoutQuote<'static>, CheckoutError> {
        let mut state = self.lock();

        Self::ensure_ready(&state)?;

        // Invalidate any lookup still in flight so its late result
        // cannot resurrect the voucher that was just detached.
        self.lookup_seq.fetch_add(1, Ordering::SeqCst);

        state.voucher = VoucherSlot::None;

        Self::recompute(&mut state, &self.policy)
    }

    /// Remove a cart line, server first, and recompute.
    ///
    /// The subtotal change re-evaluates an attached voucher and can
    /// force the payment method back to the gateway; both show up in
    /// the returned quote.
    ///
    /// # Errors
    ///
    /// Returns a [`CheckoutError`] when the service rejects the
    /// removal; the local cart and quote are unchanged in that case.
    pub async fn remove_item(&self, product: Uuid) -> Result<CheckoutQuote<'static>, CheckoutError> {
        {
            let state = self.lock();

            Self::ensure_ready(&state)?;
        }

        self.api.remove_cart_item(product).await?;

        let mut state = self.lock();

        if let Some(session) = state.session.as_mut() {
            session.confirm_remove(product);
        }

        Self::recompute(&mut state, &self.policy)
    }

    /// The current pricing snapshot.
    ///
    /// # Errors
    ///
    /// Returns a [`CheckoutError`] before the first load or when the
    /// derivation fails.
    pub fn quote(&self) -> Result<CheckoutQuote<'static>, CheckoutError> {
        let mut state = self.lock();

        Self::recompute(&mut state, &self.policy)
    }

    /// Confirm the order: validate locally, submit exactly once, and
    /// branch on the response.
    ///
    /// While the request is in flight the flow is in
    /// [`Phase::Submitting`] and a second confirmation is refused, so
    /// a double-click cannot create two orders. On success with cash
    /// settlement the order summary is returned; on success with
    /// gateway payment the navigator performs the full-page redirect.
    /// On failure the flow returns to [`Phase::Ready`] with every
    /// selection intact.
    ///
    /// # Errors
    ///
    /// Local validation errors ([`CheckoutError::NoAddressSelected`],
    /// [`CheckoutError::EmptyCart`]) are returned without any network
    /// call; service failures come back as [`CheckoutError::Api`] with
    /// the server message preserved verbatim when one was provided.
    pub async fn submit(&self) -> Result<SubmitOutcome, CheckoutError> {
        let request = {
            let mut state = self.lock();

            match state.phase {
                Phase::Submitting => return Err(CheckoutError::SubmissionInFlight),
                Phase::Loading => return Err(CheckoutError::NotReady),
                Phase::Ready => {}
            }

            let address = state.selected_address.ok_or(CheckoutError::NoAddressSelected)?;

            let Some(session) = state.session.as_ref() else {
                return Err(CheckoutError::NotReady);
            };

            if session.cart().is_empty() {
                return Err(CheckoutError::EmptyCart);
            }

            let cart = session.uuid();

            // Enforce eligibility one last time; an ineligible method
            // must never reach the order service.
            let quote = Self::recompute(&mut state, &self.policy)?;

            let request = CheckoutRequest {
                address,
                cart,
                method: quote.method,
                voucher_code: quote.voucher.applied_code().map(String::from),
            };

            state.phase = Phase::Submitting;

            request
        };

        info!(method = %request.method, "submitting checkout");

        let result = self.api.submit_checkout(&request).await;

        {
            let mut state = self.lock();

            // Whatever happened, confirm is re-enabled and every
            // selection survives.
            state.phase = Phase::Ready;
        }

        match result {
            Ok(CheckoutOutcome::Confirmed(order)) => {
                info!(order = %order.code, "order confirmed for cash on delivery");

                Ok(SubmitOutcome::Confirmed(order))
            }
            Ok(CheckoutOutcome::Redirect { payment_url }) => {
                info!("handing the page to the payment gateway");

                self.navigator.open_external(&payment_url);

                Ok(SubmitOutcome::RedirectedToGateway { payment_url })
            }
            Err(error) => {
                warn!(%error, "checkout submission failed");

                Err(CheckoutError::Api(error))
            }
        }
    }

    fn ensure_ready(state: &FlowState) -> Result<(), CheckoutError> {
        match state.phase {
            Phase::Ready => Ok(()),
            Phase::Loading => Err(CheckoutError::NotReady),
            Phase::Submitting => Err(CheckoutError::SubmissionInFlight),
        }
    }

    /// Derive the quote for the current state without persisting
    /// anything.
    fn quote_of(
        state: &FlowState,
        policy: &PaymentPolicy<'static>,
        now: Timestamp,
    ) -> Result<CheckoutQuote<'static>, CheckoutError> {
        let session = state.session.as_ref().ok_or(CheckoutError::NotReady)?;

        let voucher = match &state.voucher {
            VoucherSlot::Fetched(voucher) => Some(voucher),
            VoucherSlot::None | VoucherSlot::NotFound { .. } => None,
        };

        let mut quote =
            CheckoutQuote::derive(session.cart(), voucher, state.method, policy, now)?;

        if let VoucherSlot::NotFound { code } = &state.voucher {
            quote.voucher = VoucherState::Rejected {
                voucher: None,
                rejection: VoucherRejection::NotFound { code: code.clone() },
            };
        }

        Ok(quote)
    }

    /// Derive the quote and persist its method enforcement: a forced
    /// switch is kept as the new selection and logged as a notice.
    fn recompute(
        state: &mut FlowState,
        policy: &PaymentPolicy<'static>,
    ) -> Result<CheckoutQuote<'static>, CheckoutError> {
        let quote = Self::quote_of(state, policy, Timestamp::now())?;

        if quote.method_switched {
            warn!(
                from = %state.method,
                to = %quote.method,
                "payment method no longer available at this total, switched"
            );
        }

        state.method = quote.method;

        Ok(quote)
    }
}
