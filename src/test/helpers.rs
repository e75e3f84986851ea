//! Test Helpers

use jiff::Timestamp;
use rust_decimal::Decimal;
use smallvec::smallvec;

use crate::{
    cart::models::ProductDraft,
    coupons::models::{Coupon, CouponCode, CouponKind, CouponRequirements},
    delivery::{Coordinates, DeliveryAddress},
    inventory::ProductRef,
};

/// Tuesday 2026-10-13, 10:00 in Asia/Kolkata.
pub(crate) fn tuesday_morning() -> Timestamp {
    Timestamp::from_second(1_791_865_800).unwrap_or(Timestamp::UNIX_EPOCH)
}

pub(crate) fn draft(product: &ProductRef, quantity: u32) -> ProductDraft {
    ProductDraft {
        product: product.clone(),
        name: format!("{} special", product.category),
        quantity,
        toppings: smallvec![],
        boosters: smallvec![],
        special_instructions: None,
    }
}

pub(crate) fn percentage_coupon(code: &str, percent: i64) -> Coupon {
    Coupon {
        code: CouponCode::new(code),
        kind: CouponKind::Percentage,
        discount_value: Decimal::new(percent, 0),
        max_discount: None,
        is_active: true,
        requirements: CouponRequirements::default(),
    }
}

pub(crate) fn delivery_address() -> DeliveryAddress {
    DeliveryAddress {
        label: "Home".to_string(),
        line1: "12 MG Road".to_string(),
        city: "Bengaluru".to_string(),
        postal_code: "560001".to_string(),
        coordinates: Some(Coordinates {
            latitude: 12.9756,
            longitude: 77.6050,
        }),
    }
}
