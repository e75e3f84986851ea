//! Inventory Reader
//!
//! Live stock and price lookups against the catalog. Stock is decremented out of
//! band by fulfilment, so results are only trusted for the pass that read them.

use async_trait::async_trait;
use mockall::automock;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::{store::StoreError, uuids::TypedUuid};

/// Marker for catalog product identifiers.
#[derive(Debug)]
pub struct Product;

/// Product UUID
pub type ProductUuid = TypedUuid<Product>;

/// Reference to a catalog entry: products are stored per category.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProductRef {
    /// Category tag, e.g. `smoothies` or `bowls`
    pub category: String,

    /// Product within the category
    pub product: ProductUuid,
}

impl ProductRef {
    /// Create a product reference.
    pub fn new(category: impl Into<String>, product: ProductUuid) -> Self {
        Self {
            category: category.into(),
            product,
        }
    }
}

/// Live stock and unit price for a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockLevel {
    /// Units available right now
    pub stock: u32,

    /// Current unit price
    pub unit_price: Decimal,
}

/// Inventory errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InventoryError {
    /// The product no longer exists in the catalog.
    #[error("this product is no longer on the menu")]
    NotFound(ProductUuid),

    /// The catalog store failed.
    #[error("could not check stock, please try again")]
    Store(#[from] StoreError),
}

/// Read-only view of the catalog's stock counters.
#[automock]
#[async_trait]
pub trait InventoryReader: Send + Sync {
    /// Fetch the current stock and unit price of a product.
    async fn get_stock(&self, product: &ProductRef) -> Result<StockLevel, InventoryError>;
}
