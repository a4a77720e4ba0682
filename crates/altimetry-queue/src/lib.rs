//! Work Queue implementations (spec §4.5).
//!
//! One logical FIFO queue per provider name, plus the distinguished
//! `"aliases"` pre-queue. At-least-once delivery is acceptable: every
//! consumer of these queues applies idempotent merge rules.

mod in_memory;
#[cfg(feature = "redis-backend")]
mod redis_backend;

pub use in_memory::InMemoryWorkQueue;
#[cfg(feature = "redis-backend")]
pub use redis_backend::RedisWorkQueue;

/// Name of the pre-alias queue every item is admitted onto.
pub const ALIASES_QUEUE: &str = "aliases";
