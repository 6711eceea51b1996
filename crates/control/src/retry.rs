// Single-slot deferred retry with supersede and cancel semantics

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

/// Schedules a single deferred action; only the most recently scheduled
/// action survives. A rapid sequence of reconnect requests must not pile up
/// redundant attempts.
#[derive(Clone, Default)]
pub struct RetryScheduler {
    // Bumped on every schedule and cancel. A sleeping task fires only if its
    // generation is still current when the timer ends; the check and the
    // action run under the lock, so fire and cancel can never both win.
    generation: Arc<Mutex<u64>>,
}

impl RetryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `action` after `delay`, cancelling any previously scheduled
    /// action that has not fired yet
    pub fn schedule_once<F>(&self, delay: Duration, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let generation = {
            let mut current = self.generation.lock().unwrap();
            *current += 1;
            *current
        };

        let slot = self.generation.clone();
        tokio::spawn(async move {
            sleep(delay).await;
            let current = slot.lock().unwrap();
            if *current == generation {
                action();
            } else {
                debug!("Scheduled retry superseded, skipping");
            }
        });
    }

    /// Drop any scheduled action without replacing it
    pub fn cancel(&self) {
        *self.generation.lock().unwrap() += 1;
    }
}
