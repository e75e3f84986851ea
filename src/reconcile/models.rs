//! Reconciliation Models

use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::{
    cart::models::{DroppedCoupon, LineItemUuid},
    inventory::InventoryError,
};

/// What a reconciliation pass did with one line item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Enough stock; quantity untouched.
    Reconciled,

    /// Quantity reduced to the units in stock.
    Clamped {
        /// Quantity before the pass
        from: u32,
        /// Quantity after the pass
        to: u32,
    },

    /// Nothing in stock; left in the cart for the customer to remove.
    OutOfStock,

    /// The stock read failed; the item was left as it was for this pass.
    Skipped {
        /// Why the item could not be checked
        reason: InventoryError,
    },
}

/// Outcome for a single line item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReconciliation {
    /// Line item
    pub item: LineItemUuid,

    /// Item name, for notices
    pub name: String,

    /// What happened
    pub outcome: ItemOutcome,
}

impl ItemReconciliation {
    /// The customer-facing notice for this outcome, if it needs one.
    pub fn notice(&self) -> Option<ShortfallNotice> {
        let kind = match self.outcome {
            ItemOutcome::OutOfStock => ShortfallKind::OutOfStock,
            ItemOutcome::Clamped { to, .. } => ShortfallKind::Reduced { available: to },
            ItemOutcome::Reconciled | ItemOutcome::Skipped { .. } => return None,
        };

        Some(ShortfallNotice {
            item: self.item,
            name: self.name.clone(),
            kind,
        })
    }
}

/// Kind of stock shortfall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortfallKind {
    /// Nothing left; the customer must remove the item.
    OutOfStock,

    /// Quantity was reduced to what is left.
    Reduced {
        /// Units available, and the item's new quantity
        available: u32,
    },
}

/// A human-readable report of a stock shortfall on one line item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortfallNotice {
    /// Line item
    pub item: LineItemUuid,

    /// Item name
    pub name: String,

    /// Shortfall
    pub kind: ShortfallKind,
}

impl ShortfallNotice {
    /// The notice text without the item name.
    pub fn message(&self) -> String {
        match self.kind {
            ShortfallKind::OutOfStock => "out of stock — remove to proceed".to_string(),
            ShortfallKind::Reduced { available } => {
                format!("only {available} available — reduced automatically.")
            }
        }
    }

    /// Whether this shortfall blocks checkout.
    pub const fn is_out_of_stock(&self) -> bool {
        matches!(self.kind, ShortfallKind::OutOfStock)
    }
}

impl Display for ShortfallNotice {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}: {}", self.name, self.message())
    }
}

/// Result of a full reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationReport {
    /// One outcome per line item, in cart order
    pub outcomes: Vec<ItemReconciliation>,

    /// Notices for every clamped or out-of-stock item
    pub notices: Vec<ShortfallNotice>,

    /// Set when clamping made the applied coupon stop qualifying
    pub dropped_coupon: Option<DroppedCoupon>,
}

impl ReconciliationReport {
    /// Whether any item is out of stock, which blocks checkout until removed.
    pub fn blocks_checkout(&self) -> bool {
        self.notices.iter().any(ShortfallNotice::is_out_of_stock)
    }

    /// Notices for out-of-stock items.
    pub fn out_of_stock(&self) -> impl Iterator<Item = &ShortfallNotice> {
        self.notices.iter().filter(|notice| notice.is_out_of_stock())
    }

    /// Items whose stock could not be read this pass.
    pub fn skipped(&self) -> impl Iterator<Item = &ItemReconciliation> {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome.outcome, ItemOutcome::Skipped { .. }))
    }
}
