//! Redis-list-backed Work Queue, the production backend referenced by
//! `REGISTRY_URL`-style connection strings (the queue and registry share a
//! Redis instance in most deployments, though nothing requires that).

use std::time::Duration;

use altimetry_core::error::QueueError;
use altimetry_core::queue::WorkQueue;
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};

fn lane_key(queue: &str) -> String {
    format!("altimetry:queue:{queue}")
}

/// A Work Queue backed by Redis lists: `LPUSH` to enqueue, blocking `BRPOP`
/// to dequeue. FIFO per list; at-least-once delivery, matching the core's
/// contract (§4.5).
#[derive(Clone)]
pub struct RedisWorkQueue {
    conn: ConnectionManager,
}

impl RedisWorkQueue {
    pub async fn connect(url: &str) -> Result<Self, QueueError> {
        let client = redis::Client::open(url).map_err(|e| QueueError::Backend(e.into()))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| QueueError::Backend(e.into()))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl WorkQueue for RedisWorkQueue {
    async fn enqueue(&self, queue: &str, tiid: &str) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        conn.lpush::<_, _, ()>(lane_key(queue), tiid)
            .await
            .map_err(|e| QueueError::Backend(e.into()))
    }

    async fn dequeue(&self, queue: &str, timeout: Duration) -> Result<Option<String>, QueueError> {
        let mut conn = self.conn.clone();
        let timeout_secs = timeout.as_secs_f64().max(0.001);
        let popped: Option<(String, String)> = conn
            .brpop(lane_key(queue), timeout_secs)
            .await
            .map_err(|e| QueueError::Backend(e.into()))?;
        Ok(popped.map(|(_key, tiid)| tiid))
    }

    async fn size(&self, queue: &str) -> Result<usize, QueueError> {
        let mut conn = self.conn.clone();
        let len: usize = conn
            .llen(lane_key(queue))
            .await
            .map_err(|e| QueueError::Backend(e.into()))?;
        Ok(len)
    }
}
