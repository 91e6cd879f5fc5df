//! Impls - 実装（開発用・テスト用）
//!
//! In-process implementations of the ports. Production backends (Redis queue,
//! SQL item store, HTTP inventory client) plug into the same traits.

pub mod inmem_item_store;
pub mod inmem_queue;
pub mod scripted_provider;
pub mod simulated_provider;

pub use self::inmem_item_store::InMemoryItemStore;
pub use self::inmem_queue::InMemoryJobQueue;
pub use self::scripted_provider::{ProviderCall, ScriptedReservationProvider};
pub use self::simulated_provider::{SimulatedReservationProvider, SimulationConfig};
