//! Stock Reconciler
//!
//! Compares cart line items against live inventory and corrects drift: items with
//! fewer units in stock than in the cart are clamped, items with none are flagged
//! for the customer to remove. A failed stock read skips that item for the pass
//! instead of aborting the whole pass.

mod models;
mod reconciler;
mod schedule;

pub use models::*;
pub use reconciler::*;
pub use schedule::*;
