//! Cart Repository
//!
//! Contract for the per-user cart collection in the document store.

use async_trait::async_trait;
use mockall::automock;

use crate::{
    cart::models::{LineItem, LineItemUuid},
    session::UserUuid,
    store::StoreError,
};

/// Persistence for a user's line items.
#[automock]
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Read every line item in the user's cart.
    async fn load(&self, user: UserUuid) -> Result<Vec<LineItem>, StoreError>;

    /// Create or overwrite a single line item.
    async fn save_item(&self, user: UserUuid, item: &LineItem) -> Result<(), StoreError>;

    /// Create or overwrite several line items in one batch.
    async fn save_items(&self, user: UserUuid, items: &[LineItem]) -> Result<(), StoreError>;

    /// Delete a line item. Deleting a missing item is not an error.
    async fn delete_item(&self, user: UserUuid, item: LineItemUuid) -> Result<(), StoreError>;

    /// Delete every line item in the user's cart.
    async fn clear(&self, user: UserUuid) -> Result<(), StoreError>;
}
