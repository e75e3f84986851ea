//! Coupon errors.

use jiff::Timestamp;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::{coupons::models::CouponCode, store::StoreError};

/// Reasons a coupon cannot be applied to the current cart.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CouponError {
    /// No coupon with this code exists.
    #[error("coupon {0} doesn't exist, check the code and try again")]
    InvalidCode(CouponCode),

    /// The coupon has been disabled.
    #[error("coupon {0} is no longer active")]
    Inactive(CouponCode),

    /// The validity window has not started.
    #[error("coupon {code} can't be used until {valid_from}")]
    NotYetValid {
        /// Coupon code
        code: CouponCode,
        /// Start of the validity window
        valid_from: Timestamp,
    },

    /// The validity window has ended.
    #[error("coupon {code} expired at {valid_until}")]
    Expired {
        /// Coupon code
        code: CouponCode,
        /// End of the validity window
        valid_until: Timestamp,
    },

    /// The cart is empty.
    #[error("add something to your cart before using coupon {0}")]
    EmptyCart(CouponCode),

    /// Not enough spent.
    #[error("coupon {code} needs a minimum purchase of {required}, your cart is {current}")]
    MinPurchaseNotMet {
        /// Coupon code
        code: CouponCode,
        /// Required pre-discount amount
        required: Decimal,
        /// Current pre-discount amount
        current: Decimal,
    },

    /// Not enough line items.
    #[error("coupon {code} needs at least {required} items in your cart, you have {current}")]
    MinItemsNotMet {
        /// Coupon code
        code: CouponCode,
        /// Required line items
        required: u32,
        /// Current line items
        current: u32,
    },

    /// Too many line items.
    #[error("coupon {code} allows at most {allowed} items in your cart, you have {current}")]
    MaxItemsExceeded {
        /// Coupon code
        code: CouponCode,
        /// Allowed line items
        allowed: u32,
        /// Current line items
        current: u32,
    },

    /// A line item falls outside the coupon's categories.
    #[error("coupon {code} doesn't cover {category} items, remove them to use it")]
    IneligibleCategory {
        /// Coupon code
        code: CouponCode,
        /// First offending category
        category: String,
    },

    /// The coupon store failed.
    #[error("could not check the coupon, please try again")]
    Store(#[from] StoreError),
}
