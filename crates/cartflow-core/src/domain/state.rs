//! Job state machine.
//!
//! Pure rules, no side effects: the queue and the worker apply them.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::job::ReservationJob;

/// Job status, mirroring the queue collection the job lives in.
///
/// State transitions:
/// - Pending -> Processing (dequeue)
/// - Processing -> Completed (complete)
/// - Processing -> Failed (fail)
/// - Processing -> Pending (re-enqueue after a failed attempt)
/// - Failed -> Pending (operator sweep only)
///
/// Completed and Failed are terminal for the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Processing => "PROCESSING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Whether `job` may be (re)processed under an attempt budget of `max_attempts`.
///
/// Consulted twice per worker cycle: before dispatch, to short-circuit jobs
/// already exhausted, and after a failed attempt, to pick re-enqueue or fail.
pub fn can_retry(job: &ReservationJob, max_attempts: u32) -> bool {
    job.status != JobStatus::Completed && job.attempts < max_attempts
}

/// What to do with a job whose attempt just failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Put it back into pending for another cycle.
    Requeue,
    /// Give up: move it to the failed collection.
    Fail,
}

/// Decide the fate of a job after its attempt counter was incremented.
pub fn decide_after_failure(job: &ReservationJob, max_attempts: u32) -> RetryDecision {
    if can_retry(job, max_attempts) {
        RetryDecision::Requeue
    } else {
        RetryDecision::Fail
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ItemId, JobId};
    use rstest::rstest;
    use ulid::Ulid;

    fn job_with(status: JobStatus, attempts: u32) -> ReservationJob {
        let mut job = ReservationJob::availability_check(
            JobId::from_ulid(Ulid::new()),
            ItemId::new(1),
            "tablet",
            1,
        );
        job.status = status;
        job.attempts = attempts;
        job
    }

    #[rstest]
    #[case::fresh(JobStatus::Pending, 0, true)]
    #[case::processing_under_budget(JobStatus::Processing, 2, true)]
    #[case::exhausted(JobStatus::Processing, 3, false)]
    #[case::over_budget(JobStatus::Pending, 7, false)]
    #[case::completed(JobStatus::Completed, 0, false)]
    #[case::failed_under_budget(JobStatus::Failed, 1, true)]
    fn can_retry_rule(#[case] status: JobStatus, #[case] attempts: u32, #[case] expected: bool) {
        assert_eq!(can_retry(&job_with(status, attempts), 3), expected);
    }

    #[test]
    fn zero_budget_never_retries() {
        assert!(!can_retry(&job_with(JobStatus::Pending, 0), 0));
    }

    #[rstest]
    #[case::first_failure(1, RetryDecision::Requeue)]
    #[case::second_failure(2, RetryDecision::Requeue)]
    #[case::last_failure(3, RetryDecision::Fail)]
    fn decision_after_failure(#[case] attempts: u32, #[case] expected: RetryDecision) {
        let job = job_with(JobStatus::Processing, attempts);
        assert_eq!(decide_after_failure(&job, 3), expected);
    }

    #[test]
    fn terminal_states() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }
}
