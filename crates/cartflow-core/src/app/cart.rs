//! CartService - entry point that admits items into the pipeline.
//!
//! Adding an item stores it as PENDING and enqueues its AVAILABILITY_CHECK
//! job; everything after that is the worker's business.

use std::sync::Arc;

use thiserror::Error;

use crate::domain::{Item, ItemId, ItemStatus, NewItem, QueueError, ReservationJob, StoreError};
use crate::ports::{IdGenerator, ItemStore, JobQueue};

#[derive(Debug, Error)]
pub enum CartError {
    #[error("invalid item: {0}")]
    InvalidItem(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

pub struct CartService {
    items: Arc<dyn ItemStore>,
    queue: Arc<dyn JobQueue>,
    ids: Arc<dyn IdGenerator>,
}

impl CartService {
    pub fn new(
        items: Arc<dyn ItemStore>,
        queue: Arc<dyn JobQueue>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self { items, queue, ids }
    }

    /// Store a new PENDING item and start its workflow.
    ///
    /// If the job cannot be enqueued the item is marked FAILED (best effort)
    /// and the queue error is returned.
    pub async fn add_item_to_cart(&self, name: &str, quantity: u32) -> Result<Item, CartError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CartError::InvalidItem("name must not be empty".to_string()));
        }
        if quantity == 0 {
            return Err(CartError::InvalidItem(
                "quantity must be at least 1".to_string(),
            ));
        }

        let item = self.items.create_item(NewItem::pending(name, quantity)).await?;
        let job = ReservationJob::availability_check(
            self.ids.generate_job_id(),
            item.id,
            item.name.clone(),
            item.quantity,
        );
        let job_id = job.id;

        if let Err(err) = self.queue.enqueue(job).await {
            tracing::error!(
                item_id = %item.id,
                error = %err,
                "could not enqueue availability check"
            );
            if let Err(store_err) = self
                .items
                .update_item_status(item.id, ItemStatus::Failed)
                .await
            {
                tracing::warn!(
                    item_id = %item.id,
                    error = %store_err,
                    "could not mark item failed"
                );
            }
            return Err(err.into());
        }

        tracing::info!(
            item_id = %item.id,
            %job_id,
            item = %item.name,
            quantity,
            "item added to cart"
        );
        Ok(item)
    }

    pub async fn list_cart_items(&self) -> Result<Vec<Item>, CartError> {
        Ok(self.items.list_items().await?)
    }

    pub async fn get_item(&self, id: ItemId) -> Result<Item, CartError> {
        Ok(self.items.get_item(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{JobId, JobStatus, JobType};
    use crate::impls::{InMemoryItemStore, InMemoryJobQueue};
    use crate::observability::QueueCounts;
    use crate::ports::{SystemClock, UlidGenerator};
    use async_trait::async_trait;
    use rstest::rstest;

    fn service() -> (CartService, Arc<InMemoryItemStore>, Arc<InMemoryJobQueue>) {
        let items = Arc::new(InMemoryItemStore::new());
        let queue = Arc::new(InMemoryJobQueue::new());
        let service = CartService::new(
            items.clone(),
            queue.clone(),
            Arc::new(UlidGenerator::new(SystemClock)),
        );
        (service, items, queue)
    }

    #[tokio::test]
    async fn add_item_creates_pending_item_and_check_job() {
        let (cart, _items, queue) = service();

        let item = cart.add_item_to_cart("  laptop ", 5).await.unwrap();

        assert_eq!(item.name, "laptop");
        assert_eq!(item.quantity, 5);
        assert_eq!(item.status, ItemStatus::Pending);
        assert_eq!(item.reservation_id, None);

        let pending = queue.jobs_with_status(JobStatus::Pending).await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].job_type, JobType::AvailabilityCheck);
        assert_eq!(pending[0].item_id, item.id);
        assert_eq!(pending[0].item_name, "laptop");
        assert_eq!(pending[0].quantity, 5);
        assert_eq!(pending[0].attempts, 0);
        assert!(pending[0].created_at.is_some());
    }

    #[rstest]
    #[case::empty_name("", 1)]
    #[case::blank_name("   ", 1)]
    #[case::zero_quantity("phone", 0)]
    #[tokio::test]
    async fn rejects_invalid_items(#[case] name: &str, #[case] quantity: u32) {
        let (cart, items, queue) = service();

        let err = cart.add_item_to_cart(name, quantity).await.unwrap_err();

        assert!(matches!(err, CartError::InvalidItem(_)));
        assert!(items.list_items().await.unwrap().is_empty());
        assert!(queue.counts().await.unwrap().is_idle());
    }

    #[tokio::test]
    async fn list_and_get_return_stored_items() {
        let (cart, _items, _queue) = service();
        let laptop = cart.add_item_to_cart("laptop", 1).await.unwrap();
        let phone = cart.add_item_to_cart("phone", 2).await.unwrap();

        let listed: Vec<_> = cart
            .list_cart_items()
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.name)
            .collect();
        assert_eq!(listed, vec!["laptop", "phone"]);
        assert_eq!(cart.get_item(phone.id).await.unwrap().quantity, 2);
        assert_ne!(laptop.id, phone.id);
    }

    #[tokio::test]
    async fn get_unknown_item_is_not_found() {
        let (cart, _items, _queue) = service();
        assert!(matches!(
            cart.get_item(ItemId::new(77)).await,
            Err(CartError::Store(StoreError::NotFound(_)))
        ));
    }

    struct RefusingQueue;

    #[async_trait]
    impl JobQueue for RefusingQueue {
        async fn enqueue(&self, _job: ReservationJob) -> Result<(), QueueError> {
            Err(QueueError::Backend("queue is down".into()))
        }

        async fn dequeue(&self) -> Result<ReservationJob, QueueError> {
            Err(QueueError::Backend("queue is down".into()))
        }

        async fn complete(&self, _job: ReservationJob) -> Result<(), QueueError> {
            Ok(())
        }

        async fn fail(&self, _job: ReservationJob) -> Result<(), QueueError> {
            Ok(())
        }

        async fn retry_failed_jobs(&self) -> Result<usize, QueueError> {
            Ok(0)
        }

        async fn get(&self, _id: JobId) -> Result<Option<ReservationJob>, QueueError> {
            Ok(None)
        }

        async fn counts(&self) -> Result<QueueCounts, QueueError> {
            Ok(QueueCounts::default())
        }
    }

    #[tokio::test]
    async fn enqueue_failure_marks_item_failed() {
        let items = Arc::new(InMemoryItemStore::new());
        let cart = CartService::new(
            items.clone(),
            Arc::new(RefusingQueue),
            Arc::new(UlidGenerator::new(SystemClock)),
        );

        let err = cart.add_item_to_cart("tablet", 1).await.unwrap_err();

        assert!(matches!(err, CartError::Queue(QueueError::Backend(_))));
        let stored = items.list_items().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, ItemStatus::Failed);
    }
}
