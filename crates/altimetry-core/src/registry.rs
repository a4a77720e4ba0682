//! The progress registry contract (§4.4).

use async_trait::async_trait;

use crate::error::RegistryError;

/// Tracks, per item, how many metric-providing providers have yet to
/// complete. Atomic across concurrent workers.
#[async_trait]
pub trait ProgressRegistry: Send + Sync {
    /// Initialises the counter for `tiid` to `n`, overwriting any prior
    /// value.
    async fn set(&self, tiid: &str, n: i64) -> Result<(), RegistryError>;

    /// Atomically decrements the counter and returns the new value. A
    /// missing counter is treated as absent both before and after.
    async fn decr(&self, tiid: &str) -> Result<i64, RegistryError>;

    /// Returns the current counter, or `None` if the item is not
    /// currently updating.
    async fn get(&self, tiid: &str) -> Result<Option<i64>, RegistryError>;

    async fn clear(&self, tiid: &str) -> Result<(), RegistryError>;

    /// `true` iff the item has a positive outstanding count.
    async fn is_updating(&self, tiid: &str) -> Result<bool, RegistryError> {
        Ok(self.get(tiid).await?.map(|n| n > 0).unwrap_or(false))
    }
}
