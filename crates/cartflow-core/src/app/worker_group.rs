use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::app::worker::ReservationWorker;

/// Worker group handle.
/// - `shutdown_tx` を drop するとワーカー全体が止まる
/// - `shutdown_and_join()` で全ワーカーの終了を待てる
pub struct WorkerGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl WorkerGroup {
    /// Spawn `n` loops sharing one worker (and so one queue, store and provider).
    pub fn spawn(n: usize, worker: Arc<ReservationWorker>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut joins = Vec::with_capacity(n);
        for worker_id in 0..n {
            let worker = Arc::clone(&worker);
            let rx = shutdown_rx.clone();

            let join = tokio::spawn(async move {
                worker.run(worker_id, rx).await;
            });
            joins.push(join);
        }

        Self { shutdown_tx, joins }
    }

    pub fn len(&self) -> usize {
        self.joins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    /// Request shutdown for all workers.
    /// An in-flight job is still driven to complete, re-enqueue or fail; the
    /// workers just stop taking new jobs.
    pub fn request_shutdown(&self) {
        // ignore send error: receivers may already be dropped
        let _ = self.shutdown_tx.send(true);
    }

    /// Shutdown and wait for all workers.
    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for join in self.joins {
            if let Err(err) = join.await {
                tracing::error!(error = %err, "worker task panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::config::WorkerConfig;
    use crate::domain::{JobId, JobStatus, NewItem, ReservationJob};
    use crate::impls::{InMemoryItemStore, InMemoryJobQueue, ScriptedReservationProvider};
    use crate::ports::{ItemStore, JobQueue};
    use std::time::Duration;
    use ulid::Ulid;

    #[tokio::test]
    async fn group_drains_queue_and_shuts_down() {
        let queue = Arc::new(InMemoryJobQueue::new());
        let items = Arc::new(InMemoryItemStore::new());
        let provider =
            Arc::new(ScriptedReservationProvider::new().otherwise_availability(Ok(false)));
        let worker = Arc::new(ReservationWorker::new(
            queue.clone(),
            items.clone(),
            provider,
            WorkerConfig {
                concurrency: 3,
                ..WorkerConfig::default()
            },
        ));

        for i in 0..6 {
            let item = items
                .create_item(NewItem::pending(format!("gadget-{i}"), 1))
                .await
                .unwrap();
            let job = ReservationJob::availability_check(
                JobId::from_ulid(Ulid::new()),
                item.id,
                item.name.clone(),
                1,
            );
            queue.enqueue(job).await.unwrap();
        }

        let group = WorkerGroup::spawn(3, worker);
        assert_eq!(group.len(), 3);

        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if queue.counts().await.unwrap().completed == 6 {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("all jobs should complete");

        tokio::time::timeout(Duration::from_secs(1), group.shutdown_and_join())
            .await
            .expect("group should stop");
        assert_eq!(queue.jobs_with_status(JobStatus::Completed).await.len(), 6);
    }
}
