//! Checkout state machine.

use std::{fmt, pin::pin, sync::Arc};

use rusty_money::{Money, iso::Currency};
use tokio::{
    sync::{Mutex, Notify, watch},
    time,
};
use tracing::{debug, error, info, warn};

use crate::{
    cart::{CartStore, models::DroppedCoupon},
    checkout::{
        errors::CheckoutError,
        orders::{NewOrder, OrderRecord, OrderRepository, OrderUuid},
        payment::{PaymentGateway, PaymentHandle, PaymentOutcome, PaymentRequest},
    },
    clock::Clock,
    config::StorefrontConfig,
    delivery::DeliveryAddress,
    reconcile::{ShortfallNotice, StockReconciler},
    retry::retry,
    store::StoreError,
    totals::{self, Totals},
};

/// Where a checkout currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckoutState {
    /// Nothing running.
    #[default]
    Idle,

    /// Checking service hours.
    WorkingHoursCheck,

    /// Reconciling the cart against live stock.
    StockCheck,

    /// Waiting for the payment sheet.
    PaymentPending,

    /// Order saved.
    OrderPersisted,

    /// Ordered items removed from the cart; checkout complete.
    CartCleared,
}

/// Result of a completed checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutReceipt {
    /// Saved order
    pub order: OrderUuid,

    /// Payment confirmation
    pub payment: PaymentHandle,

    /// Totals as charged
    pub totals: Totals,

    /// Exact amount captured
    pub charged: Money<'static, Currency>,

    /// Quantities reduced by the stock check before payment
    pub adjustments: Vec<ShortfallNotice>,

    /// Coupon dropped before payment because the cart or the clock no longer
    /// satisfied it
    pub dropped_coupon: Option<DroppedCoupon>,

    /// `false` when the order was saved but its items could not be removed from the cart
    pub cart_cleared: bool,
}

/// External services checkout talks to.
#[derive(Clone)]
pub struct CheckoutServices {
    /// Payment gateway
    pub payments: Arc<dyn PaymentGateway>,

    /// Orders collection
    pub orders: Arc<dyn OrderRepository>,

    /// Clock for service hours and order timestamps
    pub clock: Arc<dyn Clock>,
}

impl fmt::Debug for CheckoutServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckoutServices").finish_non_exhaustive()
    }
}

/// Runs checkouts for one cart, one at a time.
pub struct CheckoutOrchestrator {
    cart: Arc<CartStore>,
    reconciler: StockReconciler,
    services: CheckoutServices,
    config: StorefrontConfig,
    state: watch::Sender<CheckoutState>,
    cancel: Notify,
    in_flight: Mutex<()>,
}

impl fmt::Debug for CheckoutOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckoutOrchestrator")
            .field("cart", &self.cart)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl CheckoutOrchestrator {
    /// Create an orchestrator for a cart.
    pub fn new(
        cart: Arc<CartStore>,
        reconciler: StockReconciler,
        services: CheckoutServices,
        config: StorefrontConfig,
    ) -> Self {
        let (state, _) = watch::channel(CheckoutState::Idle);

        Self {
            cart,
            reconciler,
            services,
            config,
            state,
            cancel: Notify::new(),
            in_flight: Mutex::new(()),
        }
    }

    /// Current state.
    pub fn state(&self) -> CheckoutState {
        *self.state.borrow()
    }

    /// Follow state changes.
    pub fn watch_state(&self) -> watch::Receiver<CheckoutState> {
        self.state.subscribe()
    }

    /// Abandon a pending payment. Returns whether there was one to abandon.
    pub fn cancel_payment(&self) -> bool {
        if self.state() == CheckoutState::PaymentPending {
            self.cancel.notify_waiters();
            true
        } else {
            false
        }
    }

    /// Run a checkout to the delivery address the customer selected.
    ///
    /// # Errors
    ///
    /// Any gate can stop the checkout with a [`CheckoutError`]; the state returns to
    /// [`CheckoutState::Idle`]. See [`CheckoutError::is_post_payment`] for the
    /// failures that happen after payment was captured.
    #[tracing::instrument(
        name = "checkout.orchestrator.checkout",
        skip(self, delivery),
        fields(user = %self.cart.session().user()),
        err
    )]
    pub async fn checkout(
        &self,
        delivery: Option<DeliveryAddress>,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        let Ok(_in_flight) = self.in_flight.try_lock() else {
            return Err(CheckoutError::CheckoutInProgress);
        };

        let result = self.run(delivery).await;

        if result.is_err() {
            self.transition(CheckoutState::Idle);
        }

        result
    }

    async fn run(&self, delivery: Option<DeliveryAddress>) -> Result<CheckoutReceipt, CheckoutError> {
        let user = self.cart.session().user();

        self.transition(CheckoutState::WorkingHoursCheck);

        let now = self
            .services
            .clock
            .now()
            .to_zoned(self.config.timezone.clone());

        self.config.service_hours.check(&now)?;

        self.transition(CheckoutState::StockCheck);

        let report = self.reconciler.run(&self.cart).await?;

        if report.blocks_checkout() {
            return Err(CheckoutError::OutOfStock(
                report.out_of_stock().cloned().collect(),
            ));
        }

        let delivery = delivery.ok_or(CheckoutError::MissingDeliveryAddress)?;

        if let Some(zone) = &self.config.delivery_zone {
            zone.check(&delivery)?;
        }

        let (items, coupon, expired_coupon) = {
            let mut state = self.cart.lock().await;
            let dropped = self.cart.revalidate_coupon(&mut state);

            (state.items.clone(), state.coupon.clone(), dropped)
        };

        if items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let totals = totals::compute(&items, coupon.as_ref());
        let request = PaymentRequest::new(user, totals.total, self.config.currency, delivery.clone())?;
        let charged = request.amount;

        let handle = self.await_payment(request).await?;

        info!(payment = %handle, amount = charged.to_minor_units(), "payment captured");

        let record = OrderRecord::try_from(NewOrder {
            user: Some(user),
            items,
            totals,
            coupon: coupon.map(|coupon| coupon.code),
            charged,
            delivery: Some(delivery),
            payment: handle.clone(),
            placed_at: self.services.clock.now(),
        })
        .map_err(|reason| {
            error!(%user, payment = %handle, %reason, "payment captured but order is invalid");

            CheckoutError::OrderRejected {
                handle: handle.clone(),
                reason,
            }
        })?;

        let ordered: Vec<_> = record.items().iter().map(|item| item.uuid).collect();
        let order = self.persist(record).await?;

        self.transition(CheckoutState::OrderPersisted);

        info!(%order, payment = %handle, total = %totals.total, "order placed");

        let cart_cleared = match self.cart.remove_ordered(&ordered).await {
            Ok(()) => {
                self.transition(CheckoutState::CartCleared);
                true
            }
            Err(error) => {
                warn!(%order, %error, "order placed but cart could not be cleared");
                false
            }
        };

        Ok(CheckoutReceipt {
            order,
            payment: handle,
            totals,
            charged,
            adjustments: report.notices,
            dropped_coupon: report.dropped_coupon.or(expired_coupon),
            cart_cleared,
        })
    }

    /// Open the payment sheet and wait until it is confirmed, dismissed, cancelled
    /// or times out.
    async fn await_payment(&self, request: PaymentRequest) -> Result<PaymentHandle, CheckoutError> {
        let mut cancelled = pin!(self.cancel.notified());
        cancelled.as_mut().enable();

        self.transition(CheckoutState::PaymentPending);

        let payment = time::timeout(
            self.config.payment_timeout,
            self.services.payments.open_checkout(request),
        );

        let outcome = tokio::select! {
            biased;

            () = &mut cancelled => {
                info!("payment cancelled by the customer");
                return Err(CheckoutError::PaymentDismissed);
            }

            outcome = payment => outcome,
        };

        match outcome {
            Ok(Ok(PaymentOutcome::Confirmed(handle))) => Ok(handle),
            Ok(Ok(PaymentOutcome::Dismissed)) => {
                info!("payment sheet dismissed");
                Err(CheckoutError::PaymentDismissed)
            }
            Ok(Err(error)) => Err(error.into()),
            Err(_elapsed) => {
                warn!(
                    timeout_secs = self.config.payment_timeout.as_secs(),
                    "payment timed out"
                );
                Err(CheckoutError::PaymentTimedOut(self.config.payment_timeout))
            }
        }
    }

    /// Save the order, retrying transient store failures.
    async fn persist(&self, record: OrderRecord) -> Result<OrderUuid, CheckoutError> {
        let result = retry(
            self.config.order_retry,
            "orders.create",
            StoreError::is_transient,
            || self.services.orders.create(&record),
        )
        .await;

        result.map_err(|source| {
            error!(
                user = %record.user(),
                payment = %record.payment(),
                amount = record.charged().to_minor_units(),
                error = %source,
                "payment captured but order could not be saved"
            );

            CheckoutError::OrderNotSaved {
                handle: record.payment().clone(),
                record: Box::new(record),
                source,
            }
        })
    }

    fn transition(&self, state: CheckoutState) {
        debug!(?state, "checkout state");

        self.state.send_replace(state);
    }
}
