//! ReservationProvider port - the external inventory service.
//!
//! Injected into the worker as a trait object, so production can talk to the
//! real service while tests plug in deterministic providers.

use async_trait::async_trait;

use crate::domain::ProviderError;

#[async_trait]
pub trait ReservationProvider: Send + Sync {
    async fn check_availability(&self, item_name: &str, quantity: u32)
    -> Result<bool, ProviderError>;

    /// Reserve stock and return the provider's reservation id.
    async fn reserve_item(&self, item_name: &str, quantity: u32) -> Result<String, ProviderError>;
}
