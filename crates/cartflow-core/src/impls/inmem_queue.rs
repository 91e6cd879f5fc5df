//! In-memory job queue.
//!
//! # 実装詳細
//! - `jobs` is the single source of truth (arena keyed by `JobId`); a job's
//!   `status` says which collection it belongs to.
//! - The ordered structures (pending, completed, failed) hold ids only, so a
//!   move never compares job contents.
//! - Delayed retries sit in a min-heap until visible; they count as pending.
//! - `dequeue` waits on `Notify`, or until the next delayed job is due.

use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

use crate::domain::{JobId, JobStatus, QueueError, ReservationJob};
use crate::observability::QueueCounts;
use crate::ports::{Clock, JobQueue, SystemClock};

/// Delayed entry for the visibility heap.
///
/// Reverse ordering so `BinaryHeap` acts as a min-heap (earliest first).
#[derive(Debug, Clone, PartialEq, Eq)]
struct DelayedJob {
    visible_at: Instant,
    job_id: JobId,
}

impl PartialOrd for DelayedJob {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DelayedJob {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .visible_at
            .cmp(&self.visible_at)
            .then_with(|| other.job_id.cmp(&self.job_id))
    }
}

#[derive(Default)]
struct InMemoryQueueState {
    /// All jobs ever admitted, keyed by id.
    jobs: HashMap<JobId, ReservationJob>,

    /// Visible pending jobs, FIFO.
    pending: VecDeque<JobId>,

    /// Pending jobs not visible yet.
    delayed: BinaryHeap<DelayedJob>,

    completed: Vec<JobId>,
    failed: Vec<JobId>,
}

impl InMemoryQueueState {
    fn status_of(&self, id: &JobId) -> Option<JobStatus> {
        self.jobs.get(id).map(|job| job.status)
    }

    /// Move due delayed jobs into the visible pending list.
    fn promote_delayed(&mut self, now: Instant) {
        while let Some(entry) = self.delayed.peek() {
            if entry.visible_at > now {
                break;
            }
            let Some(entry) = self.delayed.pop() else {
                break;
            };
            if self.status_of(&entry.job_id) == Some(JobStatus::Pending) {
                self.pending.push_back(entry.job_id);
            }
        }
    }

    /// Pop the next visible pending job and mark it processing.
    fn take_next(&mut self, now: chrono::DateTime<chrono::Utc>) -> Option<ReservationJob> {
        while let Some(id) = self.pending.pop_front() {
            if let Some(job) = self.jobs.get_mut(&id)
                && job.status == JobStatus::Pending
            {
                job.status = JobStatus::Processing;
                job.last_attempted_at = Some(now);
                return Some(job.clone());
            }
        }
        None
    }

    fn admit(
        &mut self,
        mut job: ReservationJob,
        now: chrono::DateTime<chrono::Utc>,
        visible_at: Option<Instant>,
    ) -> Result<(), QueueError> {
        let previous_created_at = match self.jobs.get(&job.id) {
            Some(existing) if existing.status == JobStatus::Pending => {
                return Err(QueueError::Duplicate(job.id));
            }
            Some(existing) if existing.status.is_terminal() => {
                return Err(QueueError::AlreadyTerminal(job.id));
            }
            Some(existing) => existing.created_at,
            None => None,
        };

        job.status = JobStatus::Pending;
        job.created_at = job.created_at.or(previous_created_at).or(Some(now));

        let id = job.id;
        self.jobs.insert(id, job);
        match visible_at {
            Some(visible_at) => self.delayed.push(DelayedJob {
                visible_at,
                job_id: id,
            }),
            None => self.pending.push_back(id),
        }
        Ok(())
    }

    /// Move a processing job into a terminal collection.
    ///
    /// Already terminal: no-op, so a repeated call never duplicates entries.
    fn retire(&mut self, mut job: ReservationJob, status: JobStatus) -> Result<bool, QueueError> {
        match self.status_of(&job.id) {
            Some(current) if current.is_terminal() => return Ok(false),
            Some(JobStatus::Processing) => {}
            _ => return Err(QueueError::NotProcessing(job.id)),
        }

        let previous_created_at = self.jobs.get(&job.id).and_then(|j| j.created_at);
        job.status = status;
        job.created_at = job.created_at.or(previous_created_at);

        let id = job.id;
        self.jobs.insert(id, job);
        match status {
            JobStatus::Completed => self.completed.push(id),
            _ => self.failed.push(id),
        }
        Ok(true)
    }

    /// Drain the failed collection into pending, oldest failure first.
    fn requeue_failed(&mut self) -> usize {
        let failed = std::mem::take(&mut self.failed);
        let mut moved = 0;
        for id in failed {
            if let Some(job) = self.jobs.get_mut(&id)
                && job.status == JobStatus::Failed
            {
                job.status = JobStatus::Pending;
                self.pending.push_back(id);
                moved += 1;
            }
        }
        moved
    }

    fn counts(&self) -> QueueCounts {
        let mut counts = QueueCounts::default();
        for job in self.jobs.values() {
            match job.status {
                JobStatus::Pending => counts.pending += 1,
                JobStatus::Processing => counts.processing += 1,
                JobStatus::Completed => counts.completed += 1,
                JobStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }
}

/// In-memory `JobQueue`, the reference backend for tests and the demo binary.
pub struct InMemoryJobQueue {
    state: Arc<Mutex<InMemoryQueueState>>,
    notify: Arc<Notify>,
    clock: Arc<dyn Clock>,
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(InMemoryQueueState::default())),
            notify: Arc::new(Notify::new()),
            clock,
        }
    }

    /// Snapshot of one collection, in collection order.
    ///
    /// For `Pending`, visible jobs come first, then delayed ones by due time.
    pub async fn jobs_with_status(&self, status: JobStatus) -> Vec<ReservationJob> {
        let state = self.state.lock().await;
        let ids: Vec<JobId> = match status {
            JobStatus::Pending => {
                let mut delayed = state.delayed.clone().into_sorted_vec();
                // into_sorted_vec is ascending by Ord, i.e. latest first here.
                delayed.reverse();
                state
                    .pending
                    .iter()
                    .copied()
                    .chain(delayed.into_iter().map(|entry| entry.job_id))
                    .collect()
            }
            JobStatus::Processing => state
                .jobs
                .values()
                .filter(|job| job.status == JobStatus::Processing)
                .map(|job| job.id)
                .collect(),
            JobStatus::Completed => state.completed.clone(),
            JobStatus::Failed => state.failed.clone(),
        };

        ids.iter()
            .filter_map(|id| state.jobs.get(id))
            .filter(|job| job.status == status)
            .cloned()
            .collect()
    }

    async fn admit(
        &self,
        job: ReservationJob,
        visible_at: Option<Instant>,
    ) -> Result<(), QueueError> {
        let job_id = job.id;
        {
            let mut state = self.state.lock().await;
            state.admit(job, self.clock.now(), visible_at)?;
        }
        tracing::debug!(%job_id, delayed = visible_at.is_some(), "job enqueued");

        // Notify outside the lock. A delayed job also wakes a waiter so it can
        // recompute its next wake-up time.
        self.notify.notify_one();
        Ok(())
    }
}

impl Default for InMemoryJobQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn enqueue(&self, job: ReservationJob) -> Result<(), QueueError> {
        self.admit(job, None).await
    }

    async fn enqueue_delayed(
        &self,
        job: ReservationJob,
        delay: Duration,
    ) -> Result<(), QueueError> {
        if delay.is_zero() {
            return self.admit(job, None).await;
        }
        self.admit(job, Some(Instant::now() + delay)).await
    }

    async fn dequeue(&self) -> Result<ReservationJob, QueueError> {
        loop {
            // Register interest before releasing the lock, otherwise an
            // enqueue between unlock and await could wake nobody.
            let notified = self.notify.notified();
            tokio::pin!(notified);

            let next_wake = {
                let mut state = self.state.lock().await;
                state.promote_delayed(Instant::now());

                if let Some(job) = state.take_next(self.clock.now()) {
                    tracing::debug!(job_id = %job.id, "job dequeued");
                    return Ok(job);
                }

                notified.as_mut().enable();
                state.delayed.peek().map(|entry| entry.visible_at)
            };

            match next_wake {
                Some(wake_time) => {
                    tokio::select! {
                        _ = &mut notified => {},
                        _ = tokio::time::sleep_until(wake_time) => {},
                    }
                }
                None => notified.await,
            }
        }
    }

    async fn complete(&self, job: ReservationJob) -> Result<(), QueueError> {
        let job_id = job.id;
        let moved = self.state.lock().await.retire(job, JobStatus::Completed)?;
        if !moved {
            tracing::debug!(%job_id, "complete on terminal job ignored");
        }
        Ok(())
    }

    async fn fail(&self, job: ReservationJob) -> Result<(), QueueError> {
        let job_id = job.id;
        let moved = self.state.lock().await.retire(job, JobStatus::Failed)?;
        if !moved {
            tracing::debug!(%job_id, "fail on terminal job ignored");
        }
        Ok(())
    }

    async fn retry_failed_jobs(&self) -> Result<usize, QueueError> {
        let moved = self.state.lock().await.requeue_failed();

        // One wake-up per job, same as `admit`.
        for _ in 0..moved {
            self.notify.notify_one();
        }
        tracing::info!(moved, "failed jobs moved back to pending");
        Ok(moved)
    }

    async fn get(&self, id: JobId) -> Result<Option<ReservationJob>, QueueError> {
        Ok(self.state.lock().await.jobs.get(&id).cloned())
    }

    async fn counts(&self) -> Result<QueueCounts, QueueError> {
        Ok(self.state.lock().await.counts())
    }
}
