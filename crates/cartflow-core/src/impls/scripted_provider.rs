//! ScriptedReservationProvider - deterministic provider for tests.
//!
//! Answers come from a per-operation script (FIFO); once a script runs dry the
//! fallback answer is used. Every call is recorded for assertions.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::domain::ProviderError;
use crate::ports::ReservationProvider;

/// A call received by the scripted provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    CheckAvailability { item_name: String, quantity: u32 },
    ReserveItem { item_name: String, quantity: u32 },
}

pub struct ScriptedReservationProvider {
    availability: Mutex<VecDeque<Result<bool, ProviderError>>>,
    reservations: Mutex<VecDeque<Result<String, ProviderError>>>,
    availability_fallback: Result<bool, ProviderError>,
    reservation_fallback: Result<String, ProviderError>,
    calls: Mutex<Vec<ProviderCall>>,
}

impl ScriptedReservationProvider {
    /// Empty script: every call fails as unavailable until told otherwise.
    pub fn new() -> Self {
        let unscripted = ProviderError::Unavailable("no scripted response".to_string());
        Self {
            availability: Mutex::new(VecDeque::new()),
            reservations: Mutex::new(VecDeque::new()),
            availability_fallback: Err(unscripted.clone()),
            reservation_fallback: Err(unscripted),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn then_availability(self, answer: Result<bool, ProviderError>) -> Self {
        lock(&self.availability).push_back(answer);
        self
    }

    pub fn then_reservation(self, answer: Result<String, ProviderError>) -> Self {
        lock(&self.reservations).push_back(answer);
        self
    }

    pub fn otherwise_availability(mut self, answer: Result<bool, ProviderError>) -> Self {
        self.availability_fallback = answer;
        self
    }

    pub fn otherwise_reservation(mut self, answer: Result<String, ProviderError>) -> Self {
        self.reservation_fallback = answer;
        self
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        lock(&self.calls).clone()
    }

    pub fn availability_calls(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|call| matches!(call, ProviderCall::CheckAvailability { .. }))
            .count()
    }

    pub fn reservation_calls(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|call| matches!(call, ProviderCall::ReserveItem { .. }))
            .count()
    }
}

impl Default for ScriptedReservationProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl ReservationProvider for ScriptedReservationProvider {
    async fn check_availability(
        &self,
        item_name: &str,
        quantity: u32,
    ) -> Result<bool, ProviderError> {
        lock(&self.calls).push(ProviderCall::CheckAvailability {
            item_name: item_name.to_string(),
            quantity,
        });
        lock(&self.availability)
            .pop_front()
            .unwrap_or_else(|| self.availability_fallback.clone())
    }

    async fn reserve_item(&self, item_name: &str, quantity: u32) -> Result<String, ProviderError> {
        lock(&self.calls).push(ProviderCall::ReserveItem {
            item_name: item_name.to_string(),
            quantity,
        });
        lock(&self.reservations)
            .pop_front()
            .unwrap_or_else(|| self.reservation_fallback.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn script_then_fallback() {
        let provider = ScriptedReservationProvider::new()
            .then_availability(Ok(false))
            .otherwise_availability(Ok(true));

        assert!(!provider.check_availability("laptop", 1).await.unwrap());
        assert!(provider.check_availability("laptop", 1).await.unwrap());
        assert!(provider.check_availability("laptop", 1).await.unwrap());
        assert_eq!(provider.availability_calls(), 3);
    }

    #[tokio::test]
    async fn unscripted_calls_fail_and_are_recorded() {
        let provider = ScriptedReservationProvider::new();

        assert!(matches!(
            provider.reserve_item("phone", 2).await,
            Err(ProviderError::Unavailable(_))
        ));
        assert_eq!(
            provider.calls(),
            vec![ProviderCall::ReserveItem {
                item_name: "phone".to_string(),
                quantity: 2
            }]
        );
        assert_eq!(provider.availability_calls(), 0);
    }
}
