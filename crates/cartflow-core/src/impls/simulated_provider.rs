//! SimulatedReservationProvider - 開発用の在庫サービス
//!
//! Behaves like a flaky remote inventory service: random latency, random
//! transient failures, and a small stock table. Randomness and time are
//! injected, so a seeded instance replays the same run every time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::domain::ProviderError;
use crate::ports::{Clock, ReservationProvider, SystemClock};

/// Knobs of the simulated provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Upper bound of the artificial delay per call.
    pub max_latency: Duration,

    /// Probability (0.0 to 1.0) that a call fails as "unavailable".
    pub failure_rate: f64,

    /// RNG seed; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_latency: Duration::from_secs(2),
            failure_rate: 0.1,
            seed: None,
        }
    }
}

pub struct SimulatedReservationProvider {
    inventory: Mutex<HashMap<String, u32>>,
    rng: Mutex<StdRng>,
    max_latency: Duration,
    failure_rate: f64,
    clock: Arc<dyn Clock>,
}

impl SimulatedReservationProvider {
    pub fn new(config: &SimulationConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &SimulationConfig, clock: Arc<dyn Clock>) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let inventory = [("laptop", 10), ("phone", 20), ("tablet", 15), ("headphones", 30)]
            .into_iter()
            .map(|(name, stock)| (name.to_string(), stock))
            .collect();

        Self {
            inventory: Mutex::new(inventory),
            rng: Mutex::new(rng),
            max_latency: config.max_latency,
            failure_rate: config.failure_rate.clamp(0.0, 1.0),
            clock,
        }
    }

    pub fn set_inventory(&self, item_name: &str, quantity: u32) {
        self.inventory
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(item_name.to_string(), quantity);
    }

    pub fn inventory(&self, item_name: &str) -> u32 {
        self.inventory
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(item_name)
            .copied()
            .unwrap_or(0)
    }

    /// Draw this call's latency and whether it fails, in one RNG access.
    fn roll(&self) -> (Duration, bool) {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let max_ms = u64::try_from(self.max_latency.as_millis()).unwrap_or(u64::MAX);
        let latency = if max_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rng.gen_range(0..max_ms))
        };
        let fails = rng.r#gen::<f64>() < self.failure_rate;
        (latency, fails)
    }

    async fn simulate_call(&self, what: &str) -> Result<(), ProviderError> {
        let (latency, fails) = self.roll();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if fails {
            return Err(ProviderError::Unavailable(format!(
                "{what}: service temporarily unavailable"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ReservationProvider for SimulatedReservationProvider {
    async fn check_availability(
        &self,
        item_name: &str,
        quantity: u32,
    ) -> Result<bool, ProviderError> {
        self.simulate_call("availability check").await?;

        let inventory = self.inventory.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(inventory
            .get(item_name)
            .is_some_and(|&stock| stock >= quantity))
    }

    async fn reserve_item(&self, item_name: &str, quantity: u32) -> Result<String, ProviderError> {
        self.simulate_call("reservation").await?;

        let mut inventory = self.inventory.lock().unwrap_or_else(PoisonError::into_inner);
        let stock = inventory
            .get_mut(item_name)
            .ok_or_else(|| ProviderError::UnknownItem(item_name.to_string()))?;
        if *stock < quantity {
            return Err(ProviderError::InsufficientInventory {
                item: item_name.to_string(),
                requested: quantity,
                available: *stock,
            });
        }
        *stock -= quantity;

        Ok(format!("RSV-{item_name}-{}", self.clock.now().timestamp()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::FixedClock;
    use chrono::DateTime;

    fn reliable() -> SimulationConfig {
        SimulationConfig {
            max_latency: Duration::ZERO,
            failure_rate: 0.0,
            seed: Some(7),
        }
    }

    #[tokio::test]
    async fn availability_follows_stock() {
        let provider = SimulatedReservationProvider::new(&reliable());

        assert!(provider.check_availability("laptop", 10).await.unwrap());
        assert!(!provider.check_availability("laptop", 11).await.unwrap());
        assert!(!provider.check_availability("spaceship", 1).await.unwrap());
    }

    #[tokio::test]
    async fn reservation_id_uses_clock_and_decrements_stock() {
        let clock = FixedClock::new(DateTime::from_timestamp(123, 0).unwrap());
        let provider = SimulatedReservationProvider::with_clock(&reliable(), Arc::new(clock));

        let id = provider.reserve_item("laptop", 5).await.unwrap();

        assert_eq!(id, "RSV-laptop-123");
        assert_eq!(provider.inventory("laptop"), 5);
    }

    #[tokio::test]
    async fn reservation_rejects_unknown_and_short_stock() {
        let provider = SimulatedReservationProvider::new(&reliable());
        provider.set_inventory("phone", 1);

        assert!(matches!(
            provider.reserve_item("spaceship", 1).await,
            Err(ProviderError::UnknownItem(_))
        ));
        assert!(matches!(
            provider.reserve_item("phone", 2).await,
            Err(ProviderError::InsufficientInventory { available: 1, .. })
        ));
        assert_eq!(provider.inventory("phone"), 1);
    }

    #[tokio::test]
    async fn always_failing_provider_reports_unavailable() {
        let config = SimulationConfig {
            failure_rate: 1.0,
            ..reliable()
        };
        let provider = SimulatedReservationProvider::new(&config);

        assert!(matches!(
            provider.check_availability("laptop", 1).await,
            Err(ProviderError::Unavailable(_))
        ));
        assert_eq!(provider.inventory("laptop"), 10);
    }

    #[test]
    fn same_seed_same_rolls() {
        let config = SimulationConfig {
            max_latency: Duration::from_millis(500),
            failure_rate: 0.5,
            seed: Some(42),
        };
        let a = SimulatedReservationProvider::new(&config);
        let b = SimulatedReservationProvider::new(&config);

        let rolls_a: Vec<_> = (0..16).map(|_| a.roll()).collect();
        let rolls_b: Vec<_> = (0..16).map(|_| b.roll()).collect();
        assert_eq!(rolls_a, rolls_b);
        assert!(rolls_a.iter().all(|(latency, _)| *latency < config.max_latency));
    }
}
