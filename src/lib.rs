//! Smoothie Cart
//!
//! Cart pricing and stock reconciliation for a smoothie storefront: a per-session
//! cart checked against live inventory, promo-code evaluation, order totals, and a
//! checkout that gates payment on service hours and stock.
//!
//! Every external collaborator (document store, auth provider, payment gateway,
//! geocoder) is a trait; the crate never talks to a network itself.

pub mod cart;
pub mod checkout;
pub mod clock;
pub mod config;
pub mod coupons;
pub mod delivery;
pub mod inventory;
pub mod money;
pub mod prelude;
pub mod reconcile;
pub mod retry;
pub mod session;
pub mod store;
pub mod totals;
pub mod uuids;

#[cfg(test)]
mod test;
