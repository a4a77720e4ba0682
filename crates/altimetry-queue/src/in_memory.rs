//! In-process FIFO queue, the default Work Queue backend and the one test
//! tooling builds on.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use altimetry_core::error::QueueError;
use altimetry_core::queue::WorkQueue;
use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

#[derive(Default)]
struct Lane {
    items: Mutex<VecDeque<String>>,
    notify: Notify,
}

/// A concurrent map of named FIFO lanes, one per provider plus `"aliases"`.
/// Lanes are created lazily on first use; there is no fixed roster baked
/// into the queue itself.
#[derive(Default)]
pub struct InMemoryWorkQueue {
    lanes: Mutex<HashMap<String, Arc<Lane>>>,
}

impl InMemoryWorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    async fn lane(&self, queue: &str) -> Arc<Lane> {
        let mut lanes = self.lanes.lock().await;
        lanes
            .entry(queue.to_string())
            .or_insert_with(|| Arc::new(Lane::default()))
            .clone()
    }
}

#[async_trait]
impl WorkQueue for InMemoryWorkQueue {
    async fn enqueue(&self, queue: &str, tiid: &str) -> Result<(), QueueError> {
        let lane = self.lane(queue).await;
        lane.items.lock().await.push_back(tiid.to_string());
        lane.notify.notify_one();
        Ok(())
    }

    async fn dequeue(&self, queue: &str, timeout: Duration) -> Result<Option<String>, QueueError> {
        let lane = self.lane(queue).await;
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(tiid) = lane.items.lock().await.pop_front() {
                return Ok(Some(tiid));
            }
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            // Race the notification against the remaining timeout so a
            // concurrent enqueue wakes us immediately rather than forcing a
            // full poll interval.
            tokio::select! {
                _ = lane.notify.notified() => {}
                _ = tokio::time::sleep(remaining) => return Ok(None),
            }
        }
    }

    async fn size(&self, queue: &str) -> Result<usize, QueueError> {
        let lane = self.lane(queue).await;
        let guard = lane.items.lock().await;
        Ok(guard.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fifo_within_a_lane() {
        let q = InMemoryWorkQueue::new();
        q.enqueue("dryad", "tiid1").await.unwrap();
        q.enqueue("dryad", "tiid2").await.unwrap();
        assert_eq!(q.size("dryad").await.unwrap(), 2);
        assert_eq!(
            q.dequeue("dryad", Duration::from_millis(50)).await.unwrap(),
            Some("tiid1".to_string())
        );
        assert_eq!(
            q.dequeue("dryad", Duration::from_millis(50)).await.unwrap(),
            Some("tiid2".to_string())
        );
    }

    #[tokio::test]
    async fn dequeue_times_out_on_empty_lane() {
        let q = InMemoryWorkQueue::new();
        let result = q.dequeue("mendeley", Duration::from_millis(20)).await.unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn lanes_do_not_cross_deliver() {
        let q = InMemoryWorkQueue::new();
        q.enqueue("aliases", "tiid1").await.unwrap();
        let result = q.dequeue("mendeley", Duration::from_millis(20)).await.unwrap();
        assert_eq!(result, None);
        assert_eq!(q.size("aliases").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn enqueue_wakes_a_blocked_dequeue() {
        let q = Arc::new(InMemoryWorkQueue::new());
        let reader = {
            let q = q.clone();
            tokio::spawn(async move { q.dequeue("pmc", Duration::from_secs(5)).await.unwrap() })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        q.enqueue("pmc", "tiid-woken").await.unwrap();
        let result = reader.await.unwrap();
        assert_eq!(result, Some("tiid-woken".to_string()));
    }
}
