//! Queue status views and log setup.

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Number of jobs per queue collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    /// Includes jobs whose delayed visibility has not elapsed yet.
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

impl QueueCounts {
    /// No job is waiting or in flight.
    pub fn is_idle(&self) -> bool {
        self.pending == 0 && self.processing == 0
    }
}

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins over `default_filter`. Safe to call more than once; later
/// calls are no-ops.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_ignores_terminal_collections() {
        let counts = QueueCounts {
            pending: 0,
            processing: 0,
            completed: 4,
            failed: 1,
        };
        assert!(counts.is_idle());

        let busy = QueueCounts {
            processing: 1,
            ..counts
        };
        assert!(!busy.is_idle());
    }
}
