//! Cart change notifications.

use tokio::sync::broadcast::{self, error::RecvError};

use crate::{cart::models::LineItemUuid, coupons::models::CouponCode};

/// Something changed in the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartEvent {
    /// A line item was added.
    ItemAdded(LineItemUuid),

    /// A line item's quantity changed.
    QuantityChanged {
        /// Item
        item: LineItemUuid,
        /// New quantity
        quantity: u32,
    },

    /// A line item was removed.
    ItemRemoved(LineItemUuid),

    /// Every line item was removed.
    Cleared,

    /// The cart was reloaded from the store.
    Refreshed,

    /// A reconciliation pass changed these items.
    Reconciled(Vec<LineItemUuid>),

    /// A coupon was applied.
    CouponApplied(CouponCode),

    /// A coupon was removed, by the user or because it stopped qualifying.
    CouponRemoved(CouponCode),

    /// The listener fell behind and missed this many events; re-read the cart.
    Missed(u64),
}

impl CartEvent {
    /// Whether the event may have changed the number of line items.
    pub const fn changes_item_count(&self) -> bool {
        matches!(
            self,
            Self::ItemAdded(_) | Self::ItemRemoved(_) | Self::Cleared | Self::Refreshed | Self::Missed(_)
        )
    }
}

/// A registered listener. Dropping it unregisters.
#[derive(Debug)]
pub struct CartSubscription {
    receiver: broadcast::Receiver<CartEvent>,
}

impl CartSubscription {
    pub(crate) const fn new(receiver: broadcast::Receiver<CartEvent>) -> Self {
        Self { receiver }
    }

    /// Wait for the next event. Returns `None` once the cart store is gone.
    pub async fn recv(&mut self) -> Option<CartEvent> {
        match self.receiver.recv().await {
            Ok(event) => Some(event),
            Err(RecvError::Lagged(missed)) => Some(CartEvent::Missed(missed)),
            Err(RecvError::Closed) => None,
        }
    }
}
