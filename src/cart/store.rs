//! Cart Store
//!
//! The authoritative per-session list of line items. Every mutation holds the
//! store's lock from validation through persistence, so mutations within a session
//! are applied one at a time and the in-memory view only ever reflects writes the
//! cart collection accepted.

use std::{fmt, sync::Arc};

use tokio::sync::{Mutex, MutexGuard, broadcast};
use tracing::{debug, info, warn};

use crate::{
    cart::{
        errors::CartError,
        events::{CartEvent, CartSubscription},
        models::{CartSnapshot, DroppedCoupon, LineItem, LineItemUuid, Mutation, ProductDraft},
        repository::CartRepository,
    },
    clock::Clock,
    coupons::{CouponEvaluator, models::AppliedCoupon, revalidate},
    inventory::InventoryReader,
    session::Session,
    totals::{self, Totals},
};

const EVENT_CAPACITY: usize = 64;

/// Line items plus the coupon evaluated against them.
#[derive(Debug, Default)]
pub(crate) struct CartState {
    pub(crate) items: Vec<LineItem>,
    pub(crate) coupon: Option<AppliedCoupon>,
}

/// A signed-in user's cart.
pub struct CartStore {
    session: Session,
    max_item_quantity: u32,
    repository: Arc<dyn CartRepository>,
    inventory: Arc<dyn InventoryReader>,
    clock: Arc<dyn Clock>,
    state: Mutex<CartState>,
    events: broadcast::Sender<CartEvent>,
}

impl fmt::Debug for CartStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartStore")
            .field("session", &self.session)
            .field("max_item_quantity", &self.max_item_quantity)
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// Create an empty cart store for a session.
    pub fn new(
        session: Session,
        repository: Arc<dyn CartRepository>,
        inventory: Arc<dyn InventoryReader>,
        clock: Arc<dyn Clock>,
        max_item_quantity: u32,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            session,
            max_item_quantity,
            repository,
            inventory,
            clock,
            state: Mutex::new(CartState::default()),
            events,
        }
    }

    /// Create a cart store and load the session's persisted line items.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Store`] when the cart collection cannot be read.
    pub async fn open(
        session: Session,
        repository: Arc<dyn CartRepository>,
        inventory: Arc<dyn InventoryReader>,
        clock: Arc<dyn Clock>,
        max_item_quantity: u32,
    ) -> Result<Self, CartError> {
        let store = Self::new(session, repository, inventory, clock, max_item_quantity);

        store.refresh().await?;

        Ok(store)
    }

    /// The session this cart belongs to.
    pub const fn session(&self) -> Session {
        self.session
    }

    /// Register a change listener. Dropping the subscription unregisters it.
    pub fn subscribe(&self) -> CartSubscription {
        CartSubscription::new(self.events.subscribe())
    }

    /// Current line items.
    pub async fn items(&self) -> Vec<LineItem> {
        self.state.lock().await.items.clone()
    }

    /// Number of line items.
    pub async fn len(&self) -> usize {
        self.state.lock().await.items.len()
    }

    /// Whether the cart has no line items.
    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.items.is_empty()
    }

    /// The applied coupon, as last validated.
    pub async fn applied_coupon(&self) -> Option<AppliedCoupon> {
        self.state.lock().await.coupon.clone()
    }

    /// Totals for the current items and coupon, computed fresh. A coupon that no
    /// longer applies, e.g. one that has expired since it was applied, is removed
    /// first.
    pub async fn totals(&self) -> Totals {
        let mut state = self.state.lock().await;

        self.revalidate_coupon(&mut state);

        totals::compute(&state.items, state.coupon.as_ref())
    }

    /// Add a customised product after checking live stock.
    ///
    /// # Errors
    ///
    /// - [`CartError::QuantityOutOfRange`]: quantity outside `1..=max_item_quantity`.
    /// - [`CartError::OutOfStock`] / [`CartError::InsufficientStock`]: not enough stock.
    /// - [`CartError::Inventory`]: the stock lookup failed.
    /// - [`CartError::Store`]: the item could not be saved; the cart is unchanged.
    #[tracing::instrument(
        name = "cart.store.add_item",
        skip(self, draft),
        fields(
            user = %self.session.user(),
            product = %draft.product.product,
            quantity = draft.quantity
        ),
        err
    )]
    pub async fn add_item(&self, draft: ProductDraft) -> Result<Mutation<LineItem>, CartError> {
        self.check_quantity(draft.quantity)?;

        let mut state = self.state.lock().await;

        let level = self.inventory.get_stock(&draft.product).await?;

        ensure_stock(&draft.name, draft.quantity, level.stock)?;

        let item = LineItem::from_draft(draft, level.unit_price, level.stock, self.clock.now());

        self.repository
            .save_item(self.session.user(), &item)
            .await?;

        state.items.push(item.clone());

        let dropped_coupon = self.revalidate_coupon(&mut state);

        info!(item = %item.uuid, price = %item.price(), "added line item");

        self.notify(CartEvent::ItemAdded(item.uuid));

        Ok(Mutation {
            value: item,
            dropped_coupon,
        })
    }

    /// Change a line item's quantity after checking live stock, rescaling its price.
    ///
    /// # Errors
    ///
    /// - [`CartError::QuantityOutOfRange`]: quantity outside `1..=max_item_quantity`.
    /// - [`CartError::ItemNotFound`]: no such item in this cart.
    /// - [`CartError::OutOfStock`] / [`CartError::InsufficientStock`]: not enough stock.
    /// - [`CartError::Inventory`]: the stock lookup failed.
    /// - [`CartError::Store`]: the change could not be saved; the cart is unchanged.
    #[tracing::instrument(
        name = "cart.store.update_quantity",
        skip(self),
        fields(user = %self.session.user()),
        err
    )]
    pub async fn update_quantity(
        &self,
        item: LineItemUuid,
        quantity: u32,
    ) -> Result<Mutation<LineItem>, CartError> {
        self.check_quantity(quantity)?;

        let mut state = self.state.lock().await;

        let current = state
            .items
            .iter()
            .find(|line| line.uuid == item)
            .cloned()
            .ok_or(CartError::ItemNotFound(item))?;

        let level = self.inventory.get_stock(&current.product).await?;

        ensure_stock(&current.name, quantity, level.stock)?;

        let mut updated = current;
        updated.set_quantity(quantity, self.clock.now());
        updated.stock_snapshot = level.stock;

        self.repository
            .save_item(self.session.user(), &updated)
            .await?;

        if let Some(line) = state.items.iter_mut().find(|line| line.uuid == item) {
            *line = updated.clone();
        }

        let dropped_coupon = self.revalidate_coupon(&mut state);

        self.notify(CartEvent::QuantityChanged { item, quantity });

        Ok(Mutation {
            value: updated,
            dropped_coupon,
        })
    }

    /// Remove a line item. Removing an item that is already gone succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Store`] when the deletion could not be saved.
    #[tracing::instrument(
        name = "cart.store.remove_item",
        skip(self),
        fields(user = %self.session.user()),
        err
    )]
    pub async fn remove_item(&self, item: LineItemUuid) -> Result<Mutation<()>, CartError> {
        let mut state = self.state.lock().await;

        self.repository
            .delete_item(self.session.user(), item)
            .await?;

        let before = state.items.len();
        state.items.retain(|line| line.uuid != item);
        let removed = state.items.len() != before;

        let dropped_coupon = self.revalidate_coupon(&mut state);

        if removed {
            self.notify(CartEvent::ItemRemoved(item));
        }

        Ok(Mutation {
            value: (),
            dropped_coupon,
        })
    }

    /// Remove every line item and any applied coupon.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Store`] when the cart collection could not be cleared.
    #[tracing::instrument(
        name = "cart.store.clear",
        skip(self),
        fields(user = %self.session.user()),
        err
    )]
    pub async fn clear(&self) -> Result<(), CartError> {
        let mut state = self.state.lock().await;

        self.repository.clear(self.session.user()).await?;

        state.items.clear();

        if let Some(coupon) = state.coupon.take() {
            self.notify(CartEvent::CouponRemoved(coupon.code));
        }

        self.notify(CartEvent::Cleared);

        Ok(())
    }

    /// Remove the line items an order was placed for, and the coupon it used.
    /// Items added after the order was snapshotted stay in the cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Store`] when the removal could not be saved.
    #[tracing::instrument(
        name = "cart.store.remove_ordered",
        skip(self, ordered),
        fields(user = %self.session.user(), items = ordered.len()),
        err
    )]
    pub async fn remove_ordered(&self, ordered: &[LineItemUuid]) -> Result<(), CartError> {
        let mut state = self.state.lock().await;
        let user = self.session.user();

        let keeps_others = state
            .items
            .iter()
            .any(|line| !ordered.contains(&line.uuid));

        if keeps_others {
            for item in ordered {
                self.repository.delete_item(user, *item).await?;
            }
        } else {
            self.repository.clear(user).await?;
        }

        state.items.retain(|line| !ordered.contains(&line.uuid));

        if let Some(coupon) = state.coupon.take() {
            self.notify(CartEvent::CouponRemoved(coupon.code));
        }

        if keeps_others {
            debug!(remaining = state.items.len(), "items added during checkout kept");

            for item in ordered {
                self.notify(CartEvent::ItemRemoved(*item));
            }
        } else {
            self.notify(CartEvent::Cleared);
        }

        Ok(())
    }

    /// Evaluate a coupon code against the current cart and apply it.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Coupon`] with the reason the coupon does not apply.
    pub async fn apply_coupon(
        &self,
        code: &str,
        evaluator: &CouponEvaluator,
    ) -> Result<AppliedCoupon, CartError> {
        let mut state = self.state.lock().await;

        let applied = evaluator
            .evaluate(code, CartSnapshot::new(&state.items))
            .await?;

        state.coupon = Some(applied.clone());

        self.notify(CartEvent::CouponApplied(applied.code.clone()));

        Ok(applied)
    }

    /// Remove the applied coupon, returning it.
    pub async fn remove_coupon(&self) -> Option<AppliedCoupon> {
        let removed = self.state.lock().await.coupon.take();

        if let Some(coupon) = &removed {
            self.notify(CartEvent::CouponRemoved(coupon.code.clone()));
        }

        removed
    }

    /// Reload line items from the cart collection, replacing the local view.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Store`] when the cart collection cannot be read.
    pub async fn refresh(&self) -> Result<Mutation<()>, CartError> {
        let mut state = self.state.lock().await;

        state.items = self.accept_stored(self.repository.load(self.session.user()).await?);

        Ok(self.finish_replace(&mut state))
    }

    /// Apply a snapshot pushed by the cart collection's live subscription.
    pub async fn replace_items(&self, items: Vec<LineItem>) -> Mutation<()> {
        let mut state = self.state.lock().await;

        state.items = self.accept_stored(items);

        self.finish_replace(&mut state)
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, CartState> {
        self.state.lock().await
    }

    /// Persist items changed by a reconciliation pass in one batch, then apply them.
    /// The applied coupon is revalidated even when nothing changed.
    pub(crate) async fn commit_reconciled(
        &self,
        state: &mut CartState,
        changed: Vec<LineItem>,
    ) -> Result<Option<DroppedCoupon>, CartError> {
        if changed.is_empty() {
            return Ok(self.revalidate_coupon(state));
        }

        self.repository
            .save_items(self.session.user(), &changed)
            .await?;

        let uuids = changed.iter().map(|item| item.uuid).collect();

        for item in changed {
            if let Some(line) = state.items.iter_mut().find(|line| line.uuid == item.uuid) {
                *line = item;
            }
        }

        let dropped = self.revalidate_coupon(state);

        self.notify(CartEvent::Reconciled(uuids));

        Ok(dropped)
    }

    /// Drop stored line items whose quantity is outside `1..=max_item_quantity`.
    fn accept_stored(&self, items: Vec<LineItem>) -> Vec<LineItem> {
        items
            .into_iter()
            .filter(|item| {
                let valid = (1..=self.max_item_quantity).contains(&item.quantity());

                if !valid {
                    warn!(
                        item = %item.uuid,
                        quantity = item.quantity(),
                        max = self.max_item_quantity,
                        "stored line item has an invalid quantity, ignored"
                    );
                }

                valid
            })
            .collect()
    }

    fn finish_replace(&self, state: &mut CartState) -> Mutation<()> {
        let dropped_coupon = self.revalidate_coupon(state);

        debug!(items = state.items.len(), "cart replaced from store");

        self.notify(CartEvent::Refreshed);

        Mutation {
            value: (),
            dropped_coupon,
        }
    }

    fn check_quantity(&self, requested: u32) -> Result<(), CartError> {
        if (1..=self.max_item_quantity).contains(&requested) {
            Ok(())
        } else {
            Err(CartError::QuantityOutOfRange {
                requested,
                max: self.max_item_quantity,
            })
        }
    }

    pub(crate) fn revalidate_coupon(&self, state: &mut CartState) -> Option<DroppedCoupon> {
        let applied = state.coupon.take()?;

        match revalidate(&applied, CartSnapshot::new(&state.items), self.clock.now()) {
            Ok(updated) => {
                state.coupon = Some(updated);
                None
            }
            Err(reason) => {
                warn!(code = %applied.code, %reason, "coupon no longer applies, removed");

                self.notify(CartEvent::CouponRemoved(applied.code.clone()));

                Some(DroppedCoupon {
                    code: applied.code,
                    reason,
                })
            }
        }
    }

    fn notify(&self, event: CartEvent) {
        if self.events.send(event).is_err() {
            debug!("no cart listeners");
        }
    }
}

fn ensure_stock(name: &str, requested: u32, stock: u32) -> Result<(), CartError> {
    if stock == 0 {
        return Err(CartError::OutOfStock {
            name: name.to_string(),
        });
    }

    if requested > stock {
        return Err(CartError::InsufficientStock {
            name: name.to_string(),
            available: stock,
            requested,
        });
    }

    Ok(())
}
