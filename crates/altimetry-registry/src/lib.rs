//! Progress Registry implementations (spec §4.4).
//!
//! Tracks, per item, how many metric-providing providers have yet to
//! complete. A missing counter means "not currently updating"; a counter
//! may transiently read negative when a provider's empty metrics response
//! is recorded as "done" (§3, Progress counter).

mod in_memory;
#[cfg(feature = "redis-backend")]
mod redis_backend;

pub use in_memory::InMemoryProgressRegistry;
#[cfg(feature = "redis-backend")]
pub use redis_backend::RedisProgressRegistry;
