//! Checkout Orchestrator
//!
//! Sequences the checkout gates: service hours, stock reconciliation, totals,
//! payment, order persistence and clearing the cart.

mod errors;
pub mod hours;
mod orchestrator;
pub mod orders;
pub mod payment;

pub use errors::CheckoutError;
pub use orchestrator::*;
