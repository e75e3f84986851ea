//! Totals
//!
//! Pure pricing over the cart's line items and applied coupon. Never cached: the
//! cart store recomputes it from current state whenever it is asked.

use rust_decimal::Decimal;

use crate::{cart::models::LineItem, coupons::models::AppliedCoupon, money::round_money};

/// Sales tax, charged on the post-discount amount.
pub const TAX_RATE: Decimal = Decimal::from_parts(875, 0, 0, false, 4);

/// Order totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Totals {
    /// Sum of line prices
    pub subtotal: Decimal,

    /// Sum of topping and booster prices
    pub add_ons_total: Decimal,

    /// Coupon discount, bounded by `subtotal + add_ons_total`
    pub discount: Decimal,

    /// Tax on the discounted amount
    pub tax: Decimal,

    /// Amount to charge
    pub total: Decimal,
}

impl Totals {
    /// Subtotal plus add-ons.
    pub fn pre_discount(&self) -> Decimal {
        self.subtotal + self.add_ons_total
    }
}

/// Sum of line prices.
pub fn subtotal(items: &[LineItem]) -> Decimal {
    items.iter().map(LineItem::price).sum()
}

/// Sum of every line item's topping and booster prices.
pub fn add_ons_total(items: &[LineItem]) -> Decimal {
    items.iter().map(LineItem::add_ons_price).sum()
}

/// Compute totals for a set of line items and an optional applied coupon.
pub fn compute(items: &[LineItem], coupon: Option<&AppliedCoupon>) -> Totals {
    let subtotal = subtotal(items);
    let add_ons_total = add_ons_total(items);
    let pre_discount = subtotal + add_ons_total;

    let discount = coupon
        .map_or(Decimal::ZERO, |coupon| coupon.resolved_discount)
        .clamp(Decimal::ZERO, pre_discount);

    let tax = round_money((pre_discount - discount) * TAX_RATE);

    Totals {
        subtotal,
        add_ons_total,
        discount,
        tax,
        total: pre_discount + tax - discount,
    }
}
