//! In-process counter map, the default Progress Registry backend and the
//! one test tooling builds on.

use altimetry_core::error::RegistryError;
use altimetry_core::registry::ProgressRegistry;
use async_trait::async_trait;
use dashmap::DashMap;

/// A concurrent `tiid -> outstanding count` map. Atomic across concurrent
/// workers via `DashMap`'s per-shard locking.
#[derive(Default)]
pub struct InMemoryProgressRegistry {
    counters: DashMap<String, i64>,
}

impl InMemoryProgressRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressRegistry for InMemoryProgressRegistry {
    async fn set(&self, tiid: &str, n: i64) -> Result<(), RegistryError> {
        self.counters.insert(tiid.to_string(), n);
        Ok(())
    }

    async fn decr(&self, tiid: &str) -> Result<i64, RegistryError> {
        let mut entry = self.counters.entry(tiid.to_string()).or_insert(0);
        *entry -= 1;
        Ok(*entry)
    }

    async fn get(&self, tiid: &str) -> Result<Option<i64>, RegistryError> {
        Ok(self.counters.get(tiid).map(|v| *v))
    }

    async fn clear(&self, tiid: &str) -> Result<(), RegistryError> {
        self.counters.remove(tiid);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn decrements_down_to_zero() {
        let registry = InMemoryProgressRegistry::new();
        registry.set("tiid1", 2).await.unwrap();
        assert_eq!(registry.decr("tiid1").await.unwrap(), 1);
        assert_eq!(registry.decr("tiid1").await.unwrap(), 0);
        assert!(!registry.is_updating("tiid1").await.unwrap());
    }

    #[tokio::test]
    async fn missing_counter_reads_as_absent() {
        let registry = InMemoryProgressRegistry::new();
        assert_eq!(registry.get("unknown").await.unwrap(), None);
        assert!(!registry.is_updating("unknown").await.unwrap());
    }

    #[tokio::test]
    async fn may_transiently_go_negative() {
        let registry = InMemoryProgressRegistry::new();
        registry.set("tiid1", 0).await.unwrap();
        assert_eq!(registry.decr("tiid1").await.unwrap(), -1);
    }

    #[tokio::test]
    async fn clear_removes_the_counter_entirely() {
        let registry = InMemoryProgressRegistry::new();
        registry.set("tiid1", 3).await.unwrap();
        registry.clear("tiid1").await.unwrap();
        assert_eq!(registry.get("tiid1").await.unwrap(), None);
    }
}
