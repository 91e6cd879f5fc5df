//! ReservationWorker - the job control loop.
//!
//! # フロー
//! 1. `JobQueue::dequeue()` で job を取得 (PENDING -> PROCESSING)
//! 2. attempt budget を確認、使い切っていれば fail
//! 3. job_type で dispatch (availability check / reservation)
//! 4. 結果で queue を更新: complete, re-enqueue, or fail
//!
//! A cycle is single-shot: no sleeping and retrying inside it. Backoff happens
//! by the job travelling back through pending with a visibility delay.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;

use crate::app::config::WorkerConfig;
use crate::domain::{
    ItemStatus, JobType, ProviderError, QueueError, ReservationJob, RetryDecision, StoreError,
    can_retry, decide_after_failure,
};
use crate::ports::{
    Clock, IdGenerator, ItemStore, JobQueue, ReservationProvider, SystemClock, UlidGenerator,
};

/// How one worker cycle ended for the job it handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Attempt budget already spent before dispatch; failed without a provider call.
    Exhausted,
    Completed,
    /// Attempt failed and the job went back to pending.
    Retried { attempts: u32 },
    /// Attempt failed and the budget is spent now.
    Failed { attempts: u32 },
    /// Job type this worker does not understand; failed without retry.
    Rejected { job_type: String },
}

/// Why dispatching a job did not succeed.
#[derive(Debug, Error)]
enum DispatchError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("enqueueing follow-up job failed: {0}")]
    FollowUp(#[source] QueueError),

    #[error("unknown job type: {0}")]
    UnknownJobType(String),
}

pub struct ReservationWorker {
    queue: Arc<dyn JobQueue>,
    items: Arc<dyn ItemStore>,
    provider: Arc<dyn ReservationProvider>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    config: WorkerConfig,
}

impl ReservationWorker {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        items: Arc<dyn ItemStore>,
        provider: Arc<dyn ReservationProvider>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            queue,
            items,
            provider,
            ids: Arc::new(UlidGenerator::new(SystemClock)),
            clock: Arc::new(SystemClock),
            config,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Run until `shutdown` flips to `true` (or its sender is dropped).
    ///
    /// Only the wait for a job races against shutdown. Once a job is dequeued
    /// it is always driven to complete, re-enqueue or fail before the loop
    /// looks at the signal again.
    pub async fn run(&self, worker_id: usize, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(worker_id, "reservation worker started");

        loop {
            // shutdown が来ていたら抜ける
            if *shutdown.borrow() {
                break;
            }

            let next = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                next = self.queue.dequeue() => next,
            };

            let result = match next {
                Ok(job) => self.process(job).await,
                Err(err) => Err(err),
            };

            match result {
                Ok(outcome) => tracing::debug!(worker_id, ?outcome, "cycle finished"),
                Err(err) => {
                    tracing::error!(worker_id, error = %err, "error processing job");
                    tokio::select! {
                        _ = shutdown.changed() => {}
                        _ = tokio::time::sleep(self.config.error_pause) => {}
                    }
                }
            }
        }

        tracing::info!(worker_id, "reservation worker stopped");
    }

    /// Dequeue one job (waiting if necessary) and process it.
    ///
    /// Errors are queue transport errors only; everything that goes wrong
    /// with the job itself is settled through the queue and reported in the
    /// returned outcome.
    pub async fn process_next_job(&self) -> Result<CycleOutcome, QueueError> {
        let job = self.queue.dequeue().await?;
        self.process(job).await
    }

    async fn process(&self, mut job: ReservationJob) -> Result<CycleOutcome, QueueError> {
        let max_attempts = self.config.max_attempts;

        if !can_retry(&job, max_attempts) {
            tracing::warn!(
                job_id = %job.id,
                attempts = job.attempts,
                max_attempts,
                "job exceeded maximum retry attempts"
            );
            self.queue.fail(job).await?;
            return Ok(CycleOutcome::Exhausted);
        }

        let err = match self.dispatch(&job).await {
            Ok(()) => {
                tracing::info!(job_id = %job.id, job_type = %job.job_type, "job completed");
                self.queue.complete(job).await?;
                return Ok(CycleOutcome::Completed);
            }
            Err(DispatchError::UnknownJobType(job_type)) => {
                tracing::error!(
                    job_id = %job.id,
                    item_id = %job.item_id,
                    %job_type,
                    "unknown job type, failing job without retry"
                );
                self.queue.fail(job).await?;
                return Ok(CycleOutcome::Rejected { job_type });
            }
            Err(err) => err,
        };

        job.record_failed_attempt(self.clock.now());
        let attempts = job.attempts;

        match decide_after_failure(&job, max_attempts) {
            RetryDecision::Requeue => {
                tracing::warn!(
                    job_id = %job.id,
                    attempts,
                    max_attempts,
                    error = %err,
                    "job attempt failed, retrying"
                );
                self.requeue(job).await?;
                Ok(CycleOutcome::Retried { attempts })
            }
            RetryDecision::Fail => {
                tracing::warn!(
                    job_id = %job.id,
                    attempts,
                    max_attempts,
                    error = %err,
                    "job attempt failed, no attempts left"
                );
                self.queue.fail(job).await?;
                Ok(CycleOutcome::Failed { attempts })
            }
        }
    }

    async fn requeue(&self, job: ReservationJob) -> Result<(), QueueError> {
        if self.config.retry_delay.is_zero() {
            self.queue.enqueue(job).await
        } else {
            self.queue.enqueue_delayed(job, self.config.retry_delay).await
        }
    }

    async fn dispatch(&self, job: &ReservationJob) -> Result<(), DispatchError> {
        match &job.job_type {
            JobType::AvailabilityCheck => self.check_availability(job).await,
            JobType::Reservation => self.reserve(job).await,
            JobType::Unrecognized(raw) => Err(DispatchError::UnknownJobType(raw.clone())),
        }
    }

    async fn check_availability(&self, job: &ReservationJob) -> Result<(), DispatchError> {
        let available = match self
            .provider
            .check_availability(&job.item_name, job.quantity)
            .await
        {
            Ok(available) => available,
            Err(err) => {
                self.mark_item_failed(job).await;
                return Err(err.into());
            }
        };

        if !available {
            tracing::info!(item_id = %job.item_id, item = %job.item_name, "item unavailable");
            self.items
                .update_item_status(job.item_id, ItemStatus::Unavailable)
                .await?;
            return Ok(());
        }

        self.items
            .update_item_status(job.item_id, ItemStatus::Available)
            .await?;

        let reservation = job.follow_up_reservation(self.ids.generate_job_id());
        let reservation_id = reservation.id;
        self.queue
            .enqueue(reservation)
            .await
            .map_err(DispatchError::FollowUp)?;

        tracing::info!(
            item_id = %job.item_id,
            job_id = %reservation_id,
            "item available, reservation job enqueued"
        );
        Ok(())
    }

    async fn reserve(&self, job: &ReservationJob) -> Result<(), DispatchError> {
        let reservation_id = match self.provider.reserve_item(&job.item_name, job.quantity).await {
            Ok(reservation_id) => reservation_id,
            Err(err) => {
                self.mark_item_failed(job).await;
                return Err(err.into());
            }
        };

        self.items
            .update_item_reservation(job.item_id, &reservation_id)
            .await?;
        tracing::info!(item_id = %job.item_id, %reservation_id, "item reserved");
        Ok(())
    }

    /// Best effort: the job's fate does not depend on this write.
    async fn mark_item_failed(&self, job: &ReservationJob) {
        if let Err(err) = self
            .items
            .update_item_status(job.item_id, ItemStatus::Failed)
            .await
        {
            tracing::warn!(item_id = %job.item_id, error = %err, "could not mark item failed");
        }
    }
}
