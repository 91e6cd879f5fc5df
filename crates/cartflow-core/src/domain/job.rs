//! Reservation job record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{ItemId, JobId};
use super::state::JobStatus;

/// What a job asks the worker to do.
///
/// Serialized as the bare type name. A name this build does not know is kept
/// verbatim in `Unrecognized` instead of failing to decode, so the worker can
/// reject it loudly rather than lose it in the queue backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobType {
    AvailabilityCheck,
    Reservation,
    Unrecognized(String),
}

impl JobType {
    pub fn as_str(&self) -> &str {
        match self {
            JobType::AvailabilityCheck => "AVAILABILITY_CHECK",
            JobType::Reservation => "RESERVATION",
            JobType::Unrecognized(raw) => raw,
        }
    }
}

impl From<String> for JobType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "AVAILABILITY_CHECK" => JobType::AvailabilityCheck,
            "RESERVATION" => JobType::Reservation,
            _ => JobType::Unrecognized(raw),
        }
    }
}

impl From<JobType> for String {
    fn from(job_type: JobType) -> Self {
        match job_type {
            JobType::Unrecognized(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of asynchronous reservation work.
///
/// Design:
/// - `id` is assigned by whoever creates the job and survives retries.
/// - The queue owns `status`, `created_at` and `last_attempted_at`.
/// - The worker owns `attempts`; it only grows, and only on a failed attempt.
/// - The item is referenced by id, never owned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationJob {
    pub id: JobId,
    pub item_id: ItemId,
    pub item_name: String,
    pub quantity: u32,
    pub job_type: JobType,
    pub status: JobStatus,
    pub attempts: u32,
    #[serde(default)]
    pub last_attempted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl ReservationJob {
    pub fn new(
        id: JobId,
        item_id: ItemId,
        item_name: impl Into<String>,
        quantity: u32,
        job_type: JobType,
    ) -> Self {
        Self {
            id,
            item_id,
            item_name: item_name.into(),
            quantity,
            job_type,
            status: JobStatus::Pending,
            attempts: 0,
            last_attempted_at: None,
            created_at: None,
        }
    }

    /// First job of an item's workflow.
    pub fn availability_check(
        id: JobId,
        item_id: ItemId,
        item_name: impl Into<String>,
        quantity: u32,
    ) -> Self {
        Self::new(id, item_id, item_name, quantity, JobType::AvailabilityCheck)
    }

    /// Follow-up reservation for the same item and quantity, with a fresh id
    /// and a clean attempt counter.
    pub fn follow_up_reservation(&self, id: JobId) -> Self {
        Self::new(
            id,
            self.item_id,
            self.item_name.clone(),
            self.quantity,
            JobType::Reservation,
        )
    }

    /// Record one failed processing attempt.
    pub fn record_failed_attempt(&mut self, now: DateTime<Utc>) {
        self.attempts += 1;
        self.last_attempted_at = Some(now);
    }
}
