//! JobQueue port - durable multi-consumer mailbox for reservation jobs.
//!
//! Four collections: pending, processing, completed, failed. A job lives in
//! exactly one of them at a time, and every operation moves it atomically.
//!
//! # 設計原則
//! - Lookup and removal are keyed by `JobId`, never by content equality.
//! - `dequeue` is the only operation that waits.
//! - Cancellation is by dropping the future; implementations must not lose a
//!   job when a pending `dequeue` is dropped.
//! - `complete`/`fail` on a job that is already terminal is a no-op.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{JobId, QueueError, ReservationJob};
use crate::observability::QueueCounts;

#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Append `job` to pending with status PENDING.
    ///
    /// `created_at` is stamped only when absent. A job coming back from
    /// processing (retry) is moved, not duplicated.
    async fn enqueue(&self, job: ReservationJob) -> Result<(), QueueError>;

    /// Like `enqueue`, but the job only becomes visible to `dequeue` after
    /// `delay`. Backends without delayed visibility enqueue immediately.
    async fn enqueue_delayed(
        &self,
        job: ReservationJob,
        delay: Duration,
    ) -> Result<(), QueueError> {
        let _ = delay;
        self.enqueue(job).await
    }

    /// Wait for a pending job, move it to processing with status PROCESSING
    /// and `last_attempted_at` stamped, and return it.
    async fn dequeue(&self) -> Result<ReservationJob, QueueError>;

    /// Move `job` from processing to completed.
    async fn complete(&self, job: ReservationJob) -> Result<(), QueueError>;

    /// Move `job` from processing to failed.
    async fn fail(&self, job: ReservationJob) -> Result<(), QueueError>;

    /// Operator sweep: drain the failed collection back into pending.
    /// Returns how many jobs were moved.
    async fn retry_failed_jobs(&self) -> Result<usize, QueueError>;

    async fn get(&self, id: JobId) -> Result<Option<ReservationJob>, QueueError>;

    /// Observability hook.
    async fn counts(&self) -> Result<QueueCounts, QueueError>;
}
