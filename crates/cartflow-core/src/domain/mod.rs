//! Domain model (ids, items, jobs, the job state machine, errors).

pub mod errors;
pub mod ids;
pub mod item;
pub mod job;
pub mod state;

pub use self::errors::{ProviderError, QueueError, StoreError};
pub use self::ids::{Id, IdMarker, ItemId, JobId};
pub use self::item::{Item, ItemStatus, NewItem};
pub use self::job::{JobType, ReservationJob};
pub use self::state::{JobStatus, RetryDecision, can_retry, decide_after_failure};
