//! Bounded concurrency for parameter lookups and transfers
//!
//! A limit of `N > 0` lets at most `N` wrapped operations run at once; the
//! rest wait for a slot in the order they first asked for one. A limit of
//! zero disables queuing entirely.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::debug;

/// Caps how many wrapped operations are in flight at the same time
#[derive(Debug, Clone)]
pub struct RateLimiter {
    limit: usize,
    slots: Option<Arc<Semaphore>>,
}

impl RateLimiter {
    /// Create a limiter; `0` means unlimited
    pub fn new(limit: usize) -> Self {
        let slots = if limit == 0 {
            None
        } else {
            Some(Arc::new(Semaphore::new(limit)))
        };
        Self { limit, slots }
    }

    /// Configured limit (`0` = unlimited)
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Whether this limiter actually queues work
    pub fn is_limited(&self) -> bool {
        self.slots.is_some()
    }

    /// Number of operations currently holding a slot
    pub fn in_flight(&self) -> usize {
        match &self.slots {
            Some(slots) => self.limit - slots.available_permits(),
            None => 0,
        }
    }

    /// Run `operation` once a slot is free, releasing the slot when it settles.
    ///
    /// The future is not polled before a slot is acquired, so none of its
    /// body runs while it is queued. Slots are handed out first come, first
    /// served.
    pub async fn run<F, T>(&self, operation: F) -> T
    where
        F: Future<Output = T>,
    {
        let Some(slots) = &self.slots else {
            return operation.await;
        };

        // The semaphore is never closed, so acquiring only fails if that
        // changes; fall back to running unthrottled rather than dropping work.
        match slots.acquire().await {
            Ok(_permit) => operation.await,
            Err(e) => {
                debug!("Rate limiter closed ({}), running without a slot", e);
                operation.await
            }
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(0)
    }
}
