//! Global admission gate for agent invocations.
//!
//! Sessions already serialize their own prompts; the limiter bounds how
//! many sessions may be running the agent at the same time.

use std::sync::Arc;

use relay_domain::{Error, Result};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Counting gate with a fixed capacity of at least one slot.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// A held slot. Dropping it frees the slot.
#[derive(Debug)]
pub struct LimiterPermit {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyLimiter {
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots not currently held.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait until a slot is free and take it.
    pub async fn acquire(&self) -> Result<LimiterPermit> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::Other("concurrency limiter closed".into()))?;
        Ok(LimiterPermit { _permit: permit })
    }
}
