//! Item and collection store contracts (§4.3).

use async_trait::async_trait;

use crate::collection::Collection;
use crate::error::StoreError;
use crate::item::Item;

/// Durable, read-modify-write item storage keyed by opaque `tiid`.
#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn create(&self, item: Item) -> Result<(), StoreError>;

    async fn get(&self, tiid: &str) -> Result<Item, StoreError>;

    /// Last-writer-wins upsert. Callers are responsible for their own
    /// read-modify-write discipline (§5).
    async fn save(&self, item: Item) -> Result<(), StoreError>;

    /// Returns one tiid that currently carries this alias, if any. If more
    /// than one item claims the same alias the implementation picks one and
    /// should log a warning; the core treats this as a data quality issue,
    /// not a store error.
    async fn find_tiid_by_alias(&self, namespace: &str, id: &str) -> Result<Option<String>, StoreError>;

    /// Items whose `needs_aliases` timestamp is set, for orchestrator
    /// admission. Order is not significant.
    async fn items_needing_aliases(&self) -> Result<Vec<String>, StoreError>;
}

/// Durable collection storage.
#[async_trait]
pub trait CollectionStore: Send + Sync {
    async fn create(&self, collection: Collection) -> Result<(), StoreError>;

    async fn get(&self, cid: &str) -> Result<Collection, StoreError>;
}
