//! The work queue contract (§4.5).

use async_trait::async_trait;
use std::time::Duration;

use crate::error::QueueError;

/// One logical FIFO queue per provider name, plus the distinguished
/// `"aliases"` pre-queue. At-least-once delivery is acceptable because
/// merges are idempotent.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    async fn enqueue(&self, queue: &str, tiid: &str) -> Result<(), QueueError>;

    /// Blocks up to `timeout` waiting for work; returns `None` on timeout so
    /// callers can check for cancellation.
    async fn dequeue(&self, queue: &str, timeout: Duration) -> Result<Option<String>, QueueError>;

    async fn size(&self, queue: &str) -> Result<usize, QueueError>;
}
