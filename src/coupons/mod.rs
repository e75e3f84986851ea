//! Coupons

pub mod errors;
pub mod evaluator;
pub mod models;

pub use errors::CouponError;
pub use evaluator::*;
