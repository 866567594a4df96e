//! Rate-limited batch execution primitive.
//!
//! Every remote call the engines make goes through [`BatchRunner::run`]:
//! the work collection is split into contiguous, order-preserving batches,
//! each batch's futures are joined concurrently, and the configured delay
//! is waited after every batch (the last included) so the external rate
//! limit is respected no matter what runs next.
//!
//! The runner collects results, it does not catch anything: the unit of
//! work is responsible for capturing its own failure into its result value.

use std::time::Duration;

use futures::future::join_all;
use tracing::debug;

use crate::config::RateLimit;
use crate::error::SyncError;

#[derive(Debug, Clone)]
pub struct BatchRunner {
    batch_size: usize,
    batch_delay: Duration,
}

impl BatchRunner {
    /// Rejects a batch size of zero, which could never make progress.
    pub fn new(batch_size: usize, batch_delay: Duration) -> Result<Self, SyncError> {
        if batch_size == 0 {
            return Err(SyncError::InvalidBatchSize);
        }
        Ok(Self {
            batch_size,
            batch_delay,
        })
    }

    pub fn from_rate_limit(rate_limit: &RateLimit) -> Result<Self, SyncError> {
        Self::new(rate_limit.requests_per_batch, rate_limit.batch_delay())
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn batch_delay(&self) -> Duration {
        self.batch_delay
    }

    /// Runs `work` over all items in `ceil(items.len() / batch_size)`
    /// batches, returning the results in input order.
    ///
    /// All futures within one batch run concurrently and the batch is
    /// joined as a barrier before the inter-batch delay is measured.
    pub async fn run<T, R, F, Fut>(&self, items: Vec<T>, work: F) -> Vec<R>
    where
        F: Fn(T) -> Fut,
        Fut: std::future::Future<Output = R>,
    {
        let total = items.len();
        let mut results = Vec::with_capacity(total);
        let mut items = items.into_iter();
        let mut batch_index = 0usize;

        loop {
            let batch: Vec<T> = items.by_ref().take(self.batch_size).collect();
            if batch.is_empty() {
                break;
            }
            debug!(
                batch_index,
                batch_len = batch.len(),
                total,
                "Running batch"
            );
            results.extend(join_all(batch.into_iter().map(&work)).await);
            tokio::time::sleep(self.batch_delay).await;
            batch_index += 1;
        }

        results
    }
}
