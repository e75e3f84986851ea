//! Checkout errors.

use std::time::Duration;

use thiserror::Error;

use crate::{
    cart::CartError,
    checkout::{
        hours::Closed,
        orders::{OrderRecord, OrderValidationError},
        payment::{PaymentError, PaymentHandle},
    },
    delivery::DeliveryError,
    money::MoneyError,
    reconcile::ShortfallNotice,
    store::StoreError,
};

/// Reasons checkout stopped.
///
/// Everything up to and including payment leaves the cart untouched and returns the
/// checkout to idle. [`CheckoutError::OrderRejected`] and
/// [`CheckoutError::OrderNotSaved`] happen after money has moved: they carry the
/// payment handle so the payment can be reconciled by hand.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Another checkout for this cart is running.
    #[error("a checkout is already in progress")]
    CheckoutInProgress,

    /// Outside service hours.
    #[error(transparent)]
    Closed(#[from] Closed),

    /// Nothing to check out.
    #[error("your cart is empty")]
    EmptyCart,

    /// Items in the cart are out of stock.
    #[error("{} item(s) out of stock: {}", .0.len(), notices(.0))]
    OutOfStock(Vec<ShortfallNotice>),

    /// No delivery address was selected.
    #[error("choose a delivery address to continue")]
    MissingDeliveryAddress,

    /// The delivery address cannot be served.
    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    /// Reconciliation or cart access failed.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// The total could not be converted for payment.
    #[error("could not prepare the payment amount: {0}")]
    Money(#[from] MoneyError),

    /// The gateway failed.
    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// The customer closed the payment sheet, or cancelled it.
    #[error("payment cancelled, your cart has not been changed")]
    PaymentDismissed,

    /// The payment sheet stayed open past the timeout.
    #[error("payment did not complete within {} minutes, your cart has not been changed", .0.as_secs() / 60)]
    PaymentTimedOut(Duration),

    /// Paid, but the order failed validation and was not saved.
    #[error("payment {handle} went through but the order could not be placed ({reason}), contact support with this reference")]
    OrderRejected {
        /// Captured payment
        handle: PaymentHandle,
        /// Missing field
        reason: OrderValidationError,
    },

    /// Paid, but saving the order failed after every retry.
    #[error("payment {handle} went through but the order could not be saved, contact support with this reference")]
    OrderNotSaved {
        /// Captured payment
        handle: PaymentHandle,
        /// The order that could not be saved
        record: Box<OrderRecord>,
        /// Last store failure
        #[source]
        source: StoreError,
    },
}

impl CheckoutError {
    /// Whether money has been captured without a saved order.
    pub const fn is_post_payment(&self) -> bool {
        matches!(self, Self::OrderRejected { .. } | Self::OrderNotSaved { .. })
    }
}

fn notices(notices: &[ShortfallNotice]) -> String {
    notices
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
