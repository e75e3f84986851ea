//! Reconciliation pass.

use std::{fmt, sync::Arc};

use jiff::Timestamp;
use tracing::{info, warn};

use crate::{
    cart::{CartError, CartStore, models::LineItem},
    clock::Clock,
    inventory::InventoryReader,
    reconcile::models::{ItemOutcome, ItemReconciliation, ReconciliationReport},
};

/// Runs reconciliation passes over a cart.
#[derive(Clone)]
pub struct StockReconciler {
    inventory: Arc<dyn InventoryReader>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for StockReconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StockReconciler").finish_non_exhaustive()
    }
}

impl StockReconciler {
    /// Create a reconciler reading from `inventory`.
    pub fn new(inventory: Arc<dyn InventoryReader>, clock: Arc<dyn Clock>) -> Self {
        Self { inventory, clock }
    }

    /// Run a full pass over the cart's line items.
    ///
    /// The cart is locked for the whole pass so no customer mutation interleaves
    /// with it. Changed items are persisted in a single batch.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Store`] when the batch write fails; the cart is left
    /// as it was before the pass. Per-item stock read failures are not errors,
    /// they show up as [`ItemOutcome::Skipped`].
    #[tracing::instrument(
        name = "reconcile.run",
        skip(self, cart),
        fields(user = %cart.session().user()),
        err
    )]
    pub async fn run(&self, cart: &CartStore) -> Result<ReconciliationReport, CartError> {
        let mut state = cart.lock().await;
        let now = self.clock.now();

        let mut outcomes = Vec::with_capacity(state.items.len());
        let mut changed = Vec::new();

        for item in &state.items {
            let (outcome, updated) = self.reconcile_item(item, now).await;

            outcomes.push(ItemReconciliation {
                item: item.uuid,
                name: item.name.clone(),
                outcome,
            });

            changed.extend(updated);
        }

        let dropped_coupon = cart.commit_reconciled(&mut state, changed).await?;

        let notices: Vec<_> = outcomes
            .iter()
            .filter_map(ItemReconciliation::notice)
            .collect();

        if !notices.is_empty() {
            info!(notices = notices.len(), "stock shortfall found");
        }

        Ok(ReconciliationReport {
            outcomes,
            notices,
            dropped_coupon,
        })
    }

    /// Check one item against live stock, returning its outcome and, when it
    /// changed, the updated item to persist.
    async fn reconcile_item(&self, item: &LineItem, now: Timestamp) -> (ItemOutcome, Option<LineItem>) {
        let level = match self.inventory.get_stock(&item.product).await {
            Ok(level) => level,
            Err(reason) => {
                warn!(
                    item = %item.uuid,
                    product = %item.product.product,
                    error = %reason,
                    "stock check failed, item left unreconciled"
                );

                return (ItemOutcome::Skipped { reason }, None);
            }
        };

        if level.unit_price != item.unit_base_price {
            info!(
                item = %item.uuid,
                snapshot = %item.unit_base_price,
                live = %level.unit_price,
                "catalog price differs from the price in the cart"
            );
        }

        if level.stock == 0 {
            return (ItemOutcome::OutOfStock, with_snapshot(item, 0));
        }

        if level.stock < item.quantity() {
            let mut updated = item.clone();
            updated.set_quantity(level.stock, now);
            updated.stock_snapshot = level.stock;

            return (
                ItemOutcome::Clamped {
                    from: item.quantity(),
                    to: level.stock,
                },
                Some(updated),
            );
        }

        (ItemOutcome::Reconciled, with_snapshot(item, level.stock))
    }
}

/// The item with a refreshed stock snapshot, or `None` when the snapshot is current.
fn with_snapshot(item: &LineItem, stock: u32) -> Option<LineItem> {
    (item.stock_snapshot != stock).then(|| {
        let mut updated = item.clone();
        updated.stock_snapshot = stock;
        updated
    })
}
