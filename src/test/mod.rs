//! Test support: in-memory collaborators and a ready-wired cart.

mod helpers;

pub(crate) use context::TestContext;
pub(crate) use fakes::{
    InMemoryCartRepository, InMemoryCouponStore, InMemoryInventory, InMemoryOrderRepository,
    ManualClock,
};
pub(crate) use helpers::{delivery_address, draft, percentage_coupon, tuesday_morning};
