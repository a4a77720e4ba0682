//! In-process stores, the default Item/Collection Store backend and the
//! one end-to-end pipeline tests run against.

use altimetry_core::collection::Collection;
use altimetry_core::error::StoreError;
use altimetry_core::item::Item;
use altimetry_core::store::{CollectionStore, ItemStore};
use async_trait::async_trait;
use dashmap::DashMap;
use tracing::warn;

/// Concurrent `tiid -> Item` map plus a secondary `(namespace, id) -> tiid`
/// index for `find_tiid_by_alias`, rebuilt on every `save`/`create`.
#[derive(Default)]
pub struct InMemoryItemStore {
    items: DashMap<String, Item>,
    alias_index: DashMap<(String, String), String>,
}

impl InMemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn reindex(&self, item: &Item) {
        for (ns, id) in item.aliases.tuples() {
            self.alias_index
                .entry((ns, id))
                .and_modify(|existing| {
                    if existing != &item.tiid {
                        warn!(
                            tiid_existing = %existing,
                            tiid_new = %item.tiid,
                            "alias claimed by more than one item; keeping the first"
                        );
                    }
                })
                .or_insert_with(|| item.tiid.clone());
        }
    }
}

#[async_trait]
impl ItemStore for InMemoryItemStore {
    async fn create(&self, item: Item) -> Result<(), StoreError> {
        if self.items.contains_key(&item.tiid) {
            return Err(StoreError::Duplicate(item.tiid));
        }
        self.reindex(&item);
        self.items.insert(item.tiid.clone(), item);
        Ok(())
    }

    async fn get(&self, tiid: &str) -> Result<Item, StoreError> {
        self.items
            .get(tiid)
            .map(|entry| entry.clone())
            .ok_or_else(|| StoreError::NotFound(tiid.to_string()))
    }

    async fn save(&self, item: Item) -> Result<(), StoreError> {
        self.reindex(&item);
        self.items.insert(item.tiid.clone(), item);
        Ok(())
    }

    async fn find_tiid_by_alias(
        &self,
        namespace: &str,
        id: &str,
    ) -> Result<Option<String>, StoreError> {
        let ns = altimetry_core::ids::canonical_namespace(namespace);
        Ok(self
            .alias_index
            .get(&(ns, id.to_string()))
            .map(|entry| entry.clone()))
    }

    async fn items_needing_aliases(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .items
            .iter()
            .filter(|entry| entry.value().needs_aliases.is_some())
            .map(|entry| entry.key().clone())
            .collect())
    }
}

/// Concurrent `cid -> Collection` map.
#[derive(Default)]
pub struct InMemoryCollectionStore {
    collections: DashMap<String, Collection>,
}

impl InMemoryCollectionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CollectionStore for InMemoryCollectionStore {
    async fn create(&self, collection: Collection) -> Result<(), StoreError> {
        if self.collections.contains_key(&collection.cid) {
            return Err(StoreError::Duplicate(collection.cid));
        }
        self.collections.insert(collection.cid.clone(), collection);
        Ok(())
    }

    async fn get(&self, cid: &str) -> Result<Collection, StoreError> {
        self.collections
            .get(cid)
            .map(|entry| entry.clone())
            .ok_or_else(|| StoreError::NotFound(cid.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn item_with_alias(tiid: &str, ns: &str, id: &str) -> Item {
        Item::new(tiid, [(ns.to_string(), id.to_string())], Utc::now())
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = InMemoryItemStore::new();
        store
            .create(item_with_alias("tiid1", "doi", "10.1/a"))
            .await
            .unwrap();
        let fetched = store.get("tiid1").await.unwrap();
        assert_eq!(fetched.tiid, "tiid1");
    }

    #[tokio::test]
    async fn create_rejects_duplicates() {
        let store = InMemoryItemStore::new();
        store
            .create(item_with_alias("tiid1", "doi", "10.1/a"))
            .await
            .unwrap();
        let err = store
            .create(item_with_alias("tiid1", "doi", "10.1/b"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn get_missing_item_is_not_found() {
        let store = InMemoryItemStore::new();
        assert!(matches!(
            store.get("missing").await.unwrap_err(),
            StoreError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn find_tiid_by_alias_after_create_returns_same_tiid() {
        let store = InMemoryItemStore::new();
        store
            .create(item_with_alias("tiid1", "doi", "10.1/a"))
            .await
            .unwrap();
        let found = store.find_tiid_by_alias("DOI", "10.1/a").await.unwrap();
        assert_eq!(found, Some("tiid1".to_string()));
    }

    #[tokio::test]
    async fn items_needing_aliases_reflects_admission_state() {
        let store = InMemoryItemStore::new();
        let item = item_with_alias("tiid1", "doi", "10.1/a");
        store.create(item).await.unwrap();
        assert_eq!(store.items_needing_aliases().await.unwrap(), vec!["tiid1"]);

        let mut updated = store.get("tiid1").await.unwrap();
        updated.needs_aliases = None;
        store.save(updated).await.unwrap();
        assert!(store.items_needing_aliases().await.unwrap().is_empty());
    }
}
