//! Cart errors.

use thiserror::Error;

use crate::{
    cart::models::LineItemUuid, coupons::CouponError, inventory::InventoryError,
    store::StoreError,
};

/// Reasons a cart mutation was refused.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CartError {
    /// Quantity outside `1..=max`.
    #[error("choose a quantity between 1 and {max} (got {requested})")]
    QuantityOutOfRange {
        /// Requested quantity
        requested: u32,
        /// Per-item cap
        max: u32,
    },

    /// Nothing left in stock.
    #[error("{name} is out of stock")]
    OutOfStock {
        /// Product name
        name: String,
    },

    /// Fewer units in stock than requested.
    #[error("only {available} {name} available, reduce the quantity to continue")]
    InsufficientStock {
        /// Product name
        name: String,
        /// Units in stock
        available: u32,
        /// Units requested
        requested: u32,
    },

    /// The line item is not in this cart.
    #[error("that item is no longer in your cart")]
    ItemNotFound(LineItemUuid),

    /// Stock lookup failed.
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// Coupon could not be applied.
    #[error(transparent)]
    Coupon(#[from] CouponError),

    /// The cart collection rejected the write.
    #[error("could not save your cart, please try again")]
    Store(#[from] StoreError),
}
