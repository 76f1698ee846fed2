//! Concurrency slots
//!
//! A fixed pool of permits gating PENDING -> RUNNING. Waiting for a permit
//! suspends the pipeline task without holding anything else.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

/// Slot usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotStats {
    /// Configured number of slots
    pub capacity: usize,
    /// Slots currently held
    pub in_use: usize,
    /// Highest `in_use` observed
    pub peak_in_use: usize,
    /// Total acquisitions
    pub total_acquired: u64,
}

#[derive(Debug)]
struct SlotCounters {
    in_use: usize,
    peak_in_use: usize,
    total_acquired: u64,
}

/// Global execution slots
#[derive(Debug, Clone)]
pub struct ExecutionSlots {
    capacity: usize,
    semaphore: Arc<Semaphore>,
    counters: Arc<Mutex<SlotCounters>>,
}

impl ExecutionSlots {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            semaphore: Arc::new(Semaphore::new(capacity)),
            counters: Arc::new(Mutex::new(SlotCounters {
                in_use: 0,
                peak_in_use: 0,
                total_acquired: 0,
            })),
        }
    }

    /// Wait for a free slot
    ///
    /// # Errors
    /// Only if the semaphore was closed, which this type never does.
    pub async fn acquire(&self) -> Result<SlotPermit, AcquireError> {
        let permit = Arc::clone(&self.semaphore).acquire_owned().await?;
        {
            let mut counters = self.counters.lock();
            counters.in_use += 1;
            counters.peak_in_use = counters.peak_in_use.max(counters.in_use);
            counters.total_acquired += 1;
        }
        Ok(SlotPermit {
            _permit: permit,
            counters: Arc::clone(&self.counters),
        })
    }

    /// Slots free right now
    #[must_use]
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    #[must_use]
    pub fn stats(&self) -> SlotStats {
        let counters = self.counters.lock();
        SlotStats {
            capacity: self.capacity,
            in_use: counters.in_use,
            peak_in_use: counters.peak_in_use,
            total_acquired: counters.total_acquired,
        }
    }
}

/// Held slot; released on drop
#[derive(Debug)]
pub struct SlotPermit {
    _permit: OwnedSemaphorePermit,
    counters: Arc<Mutex<SlotCounters>>,
}

impl Drop for SlotPermit {
    fn drop(&mut self) {
        let mut counters = self.counters.lock();
        counters.in_use = counters.in_use.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn permits_bound_concurrency() {
        let slots = ExecutionSlots::new(2);
        let a = slots.acquire().await.unwrap();
        let _b = slots.acquire().await.unwrap();
        assert_eq!(slots.available(), 0);

        // Third acquisition waits until a slot frees
        let waiter = {
            let slots = slots.clone();
            tokio::spawn(async move { slots.acquire().await.map(|_| ()) })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(a);
        waiter.await.unwrap().unwrap();

        let stats = slots.stats();
        assert_eq!(stats.capacity, 2);
        assert_eq!(stats.peak_in_use, 2);
        assert_eq!(stats.total_acquired, 3);
    }

    #[tokio::test]
    async fn drop_releases_slot() {
        let slots = ExecutionSlots::new(1);
        {
            let _permit = slots.acquire().await.unwrap();
            assert_eq!(slots.stats().in_use, 1);
        }
        assert_eq!(slots.stats().in_use, 0);
        assert_eq!(slots.available(), 1);
    }
}
