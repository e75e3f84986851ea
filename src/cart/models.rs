//! Cart Models

use jiff::Timestamp;
use rust_decimal::Decimal;
use smallvec::SmallVec;

use crate::{
    coupons::{CouponError, models::CouponCode},
    inventory::ProductRef,
    totals::{add_ons_total, subtotal},
    uuids::TypedUuid,
};

/// Line Item UUID
pub type LineItemUuid = TypedUuid<LineItem>;

/// Topping or booster chosen for a line item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddOn {
    /// Catalog id of the add-on
    pub id: String,

    /// Display name
    pub name: String,

    /// Price, added once per line item
    pub price: Decimal,
}

/// Add-on list; most drinks carry only a couple.
pub type AddOns = SmallVec<[AddOn; 4]>;

/// A completed customisation flow, ready to be added to the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    /// Catalog entry being customised
    pub product: ProductRef,

    /// Display name
    pub name: String,

    /// Requested quantity
    pub quantity: u32,

    /// Chosen toppings
    pub toppings: AddOns,

    /// Chosen boosters
    pub boosters: AddOns,

    /// Free text for the kitchen
    pub special_instructions: Option<String>,
}

/// One customised product in a cart.
///
/// `quantity` and `price` are only mutated together, through [`LineItem::set_quantity`],
/// so `price / quantity` always equals the unit price snapshotted when the item was added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    /// Stable identifier for the item's lifetime in the cart
    pub uuid: LineItemUuid,

    /// Catalog entry this item customises
    pub product: ProductRef,

    /// Name snapshotted at add time
    pub name: String,

    /// Unit price snapshotted at add time
    pub unit_base_price: Decimal,

    quantity: u32,

    price: Decimal,

    /// Chosen toppings
    pub toppings: AddOns,

    /// Chosen boosters
    pub boosters: AddOns,

    /// Free text for the kitchen
    pub special_instructions: Option<String>,

    /// Stock observed at the last check; used for clamping, never for charging
    pub stock_snapshot: u32,

    /// When the item was added
    pub created_at: Timestamp,

    /// Last mutation
    pub updated_at: Timestamp,
}

impl LineItem {
    /// Create a line item from a draft, snapshotting the live unit price and stock.
    pub fn from_draft(draft: ProductDraft, unit_price: Decimal, stock: u32, now: Timestamp) -> Self {
        Self {
            uuid: LineItemUuid::new(),
            product: draft.product,
            name: draft.name,
            unit_base_price: unit_price,
            quantity: draft.quantity,
            price: unit_price * Decimal::from(draft.quantity),
            toppings: draft.toppings,
            boosters: draft.boosters,
            special_instructions: draft.special_instructions,
            stock_snapshot: stock,
            created_at: now,
            updated_at: now,
        }
    }

    /// Restore the quantity and price pair read back from the cart collection.
    #[must_use]
    pub fn with_stored_quantity(mut self, quantity: u32, price: Decimal) -> Self {
        self.quantity = quantity;
        self.price = price;
        self
    }

    /// Units of this item.
    pub const fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Total price for all units, excluding add-ons.
    pub const fn price(&self) -> Decimal {
        self.price
    }

    /// Sum of topping and booster prices.
    pub fn add_ons_price(&self) -> Decimal {
        self.toppings
            .iter()
            .chain(&self.boosters)
            .map(|add_on| add_on.price)
            .sum()
    }

    /// Change the quantity, rescaling the price in the same step.
    pub fn set_quantity(&mut self, quantity: u32, now: Timestamp) {
        self.price = rescale_price(self.price, self.quantity, quantity);
        self.quantity = quantity;
        self.updated_at = now;
    }
}

/// Rescale a line price from one quantity to another, keeping the implicit
/// per-unit price (`price / from`) unchanged.
#[must_use]
pub fn rescale_price(price: Decimal, from: u32, to: u32) -> Decimal {
    if from == 0 || from == to {
        return price;
    }

    // Multiply first: `price` is `unit * from`, so the division is exact.
    price * Decimal::from(to) / Decimal::from(from)
}

/// Read-only view of a cart's line items, used for coupon eligibility.
#[derive(Debug, Clone, Copy)]
pub struct CartSnapshot<'a> {
    items: &'a [LineItem],
}

impl<'a> CartSnapshot<'a> {
    /// Wrap a slice of line items.
    pub const fn new(items: &'a [LineItem]) -> Self {
        Self { items }
    }

    /// The line items.
    pub const fn items(&self) -> &'a [LineItem] {
        self.items
    }

    /// Number of line items.
    pub fn item_count(&self) -> u32 {
        u32::try_from(self.items.len()).unwrap_or(u32::MAX)
    }

    /// Whether the cart has no items.
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Subtotal plus add-ons, before any discount.
    pub fn pre_discount_amount(&self) -> Decimal {
        subtotal(self.items) + add_ons_total(self.items)
    }
}

/// A coupon removed because the cart no longer satisfies it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedCoupon {
    /// The removed coupon's code
    pub code: CouponCode,

    /// Why it stopped applying
    pub reason: CouponError,
}

/// Result of a cart mutation, with any coupon it invalidated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation<T> {
    /// The mutation's own result
    pub value: T,

    /// Set when the applied coupon no longer qualified and was removed
    pub dropped_coupon: Option<DroppedCoupon>,
}
