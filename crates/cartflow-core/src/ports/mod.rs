//! Ports - 抽象化レイヤー
//!
//! Hexagonal "ports": each trait is the only way the core reaches an external
//! system (queue backend, item database, inventory service, time, ids).

pub mod clock;
pub mod id_generator;
pub mod item_store;
pub mod job_queue;
pub mod reservation_provider;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::item_store::ItemStore;
pub use self::job_queue::JobQueue;
pub use self::reservation_provider::ReservationProvider;
