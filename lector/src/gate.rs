//! Concurrency gate bounding simultaneous recognitions.
//!
//! Recognition engines are expensive to hold in memory and not safe for
//! concurrent use, so every recognition must hold a permit. Capacity
//! defaults to 1, which serializes the service.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::error::{LectorError, Result};

/// Permit for one recognition. Released on drop, so every pipeline exit
/// path releases exactly once.
pub type GatePermit = OwnedSemaphorePermit;

#[derive(Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl ConcurrencyGate {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait for a permit or for the caller to give up, whichever comes
    /// first. On cancellation nothing has been acquired.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<GatePermit> {
        tokio::select! {
            permit = Arc::clone(&self.semaphore).acquire_owned() => {
                permit.map_err(|_| LectorError::Cancelled("concurrency gate closed".to_string()))
            }
            _ = cancel.cancelled() => {
                Err(LectorError::Cancelled(
                    "request cancelled while waiting for a recognition slot".to_string(),
                ))
            }
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}
