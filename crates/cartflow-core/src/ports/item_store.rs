//! ItemStore port - persistence of cart items.
//!
//! The worker writes item status through this port only; the cart service
//! creates and lists items. Schema and SQL dialect stay behind the trait.

use async_trait::async_trait;

use crate::domain::{Item, ItemId, ItemStatus, NewItem, StoreError};

#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Persist a new item; the store assigns id and timestamps.
    async fn create_item(&self, item: NewItem) -> Result<Item, StoreError>;

    async fn update_item_status(&self, id: ItemId, status: ItemStatus) -> Result<(), StoreError>;

    /// Attach a reservation id and mark the item RESERVED.
    async fn update_item_reservation(
        &self,
        id: ItemId,
        reservation_id: &str,
    ) -> Result<(), StoreError>;

    async fn get_item(&self, id: ItemId) -> Result<Item, StoreError>;

    /// All items, ascending by id.
    async fn list_items(&self) -> Result<Vec<Item>, StoreError>;
}
