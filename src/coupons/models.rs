//! Coupon Models

use std::fmt::{Display, Formatter, Result as FmtResult};

use jiff::Timestamp;
use rust_decimal::Decimal;
use rustc_hash::FxHashSet;

/// Coupon code, matched case-insensitively and stored uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CouponCode(String);

impl CouponCode {
    /// Normalise a user-entered code.
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_uppercase())
    }

    /// The normalised code.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether nothing but whitespace was entered.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for CouponCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

/// How a coupon's discount value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CouponKind {
    /// `discount_value` percent of the pre-discount amount, optionally capped.
    Percentage,

    /// A flat `discount_value` off the order.
    Fixed,
}

/// Cart-state preconditions a coupon requires.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CouponRequirements {
    /// Minimum pre-discount amount (subtotal plus add-ons).
    pub min_purchase: Option<Decimal>,

    /// Minimum number of line items.
    pub min_items: Option<u32>,

    /// Maximum number of line items.
    pub max_items: Option<u32>,

    /// Categories every line item must belong to. Empty allows any category.
    pub eligible_categories: FxHashSet<String>,

    /// Start of the validity window (inclusive).
    pub valid_from: Option<Timestamp>,

    /// End of the validity window (inclusive).
    pub valid_until: Option<Timestamp>,
}

/// A named discount rule as stored in the coupon collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coupon {
    /// Normalised code
    pub code: CouponCode,

    /// Percentage or fixed
    pub kind: CouponKind,

    /// Percent (for [`CouponKind::Percentage`]) or amount (for [`CouponKind::Fixed`])
    pub discount_value: Decimal,

    /// Cap on a percentage discount
    pub max_discount: Option<Decimal>,

    /// Disabled coupons never apply
    pub is_active: bool,

    /// Eligibility constraints
    pub requirements: CouponRequirements,
}

/// A coupon evaluated against a specific cart.
///
/// Cached by the cart store and re-evaluated from these fields whenever the cart
/// changes, since eligibility and the resolved amount both depend on cart state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedCoupon {
    /// Normalised code
    pub code: CouponCode,

    /// Percentage or fixed
    pub kind: CouponKind,

    /// Discount resolved against the cart it was evaluated for
    pub resolved_discount: Decimal,

    /// The coupon's configured value
    pub original_value: Decimal,

    /// Cap on a percentage discount
    pub max_discount: Option<Decimal>,

    /// Eligibility constraints carried for re-validation
    pub requirements: CouponRequirements,
}
