//! InMemoryItemStore - 開発用の ItemStore
//!
//! Stands in for the SQL-backed store: sequential ids starting at 1 and
//! timestamps from the injected clock.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{Item, ItemId, ItemStatus, NewItem, StoreError};
use crate::ports::{Clock, ItemStore, SystemClock};

#[derive(Default)]
struct StoreState {
    items: BTreeMap<ItemId, Item>,
    last_id: i64,
}

pub struct InMemoryItemStore {
    state: RwLock<StoreState>,
    clock: Arc<dyn Clock>,
}

impl InMemoryItemStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            clock,
        }
    }

    async fn modify(&self, id: ItemId, f: impl FnOnce(&mut Item)) -> Result<(), StoreError> {
        let now = self.clock.now();
        let mut state = self.state.write().await;
        let item = state.items.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        f(item);
        item.updated_at = now;
        Ok(())
    }
}

impl Default for InMemoryItemStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ItemStore for InMemoryItemStore {
    async fn create_item(&self, item: NewItem) -> Result<Item, StoreError> {
        let now = self.clock.now();
        let mut state = self.state.write().await;
        state.last_id += 1;
        let id = ItemId::new(state.last_id);

        let item = Item {
            id,
            name: item.name,
            quantity: item.quantity,
            reservation_id: None,
            status: item.status,
            created_at: now,
            updated_at: now,
        };
        state.items.insert(id, item.clone());
        Ok(item)
    }

    async fn update_item_status(&self, id: ItemId, status: ItemStatus) -> Result<(), StoreError> {
        self.modify(id, |item| item.status = status).await
    }

    async fn update_item_reservation(
        &self,
        id: ItemId,
        reservation_id: &str,
    ) -> Result<(), StoreError> {
        self.modify(id, |item| {
            item.reservation_id = Some(reservation_id.to_string());
            item.status = ItemStatus::Reserved;
        })
        .await
    }

    async fn get_item(&self, id: ItemId) -> Result<Item, StoreError> {
        self.state
            .read()
            .await
            .items
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn list_items(&self) -> Result<Vec<Item>, StoreError> {
        Ok(self.state.read().await.items.values().cloned().collect())
    }
}
