//! Cart

pub mod errors;
pub mod events;
pub mod models;
pub mod repository;
pub mod store;

pub use errors::CartError;
pub use store::*;
