//! PostgreSQL-backed Item Store, the production backend referenced by
//! `DATABASE_URL` (§6, Environment). Items persist as JSONB documents; the
//! core does not commit to a relational schema beyond what's needed to
//! index on `tiid` and on alias.

use altimetry_core::error::StoreError;
use altimetry_core::item::Item;
use altimetry_core::store::ItemStore;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::{instrument, warn};

/// JSONB-backed item store over PostgreSQL. Mirrors the decorator shape the
/// rest of this stack uses for storage backends: a thin wrapper around a
/// connection pool with one table and a GIN index over the alias tuples.
#[derive(Clone)]
pub struct PostgresItemStore {
    pool: PgPool,
}

impl PostgresItemStore {
    #[instrument(name = "postgres_item_store.new", skip(database_url))]
    pub async fn new(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Backend(e.into()))?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Creates the `items` table and its supporting indexes if absent.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS items (
                tiid TEXT PRIMARY KEY,
                needs_aliases TIMESTAMPTZ,
                doc JSONB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.into()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS item_aliases (
                namespace TEXT NOT NULL,
                alias_id TEXT NOT NULL,
                tiid TEXT NOT NULL REFERENCES items(tiid),
                PRIMARY KEY (namespace, alias_id, tiid)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.into()))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS item_aliases_lookup ON item_aliases (namespace, alias_id)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.into()))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS items_needs_aliases ON items (needs_aliases) WHERE needs_aliases IS NOT NULL")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.into()))?;

        Ok(())
    }

    async fn upsert(&self, item: &Item) -> Result<(), StoreError> {
        let doc = serde_json::to_value(item).map_err(|e| StoreError::Backend(e.into()))?;

        let mut tx = self.pool.begin().await.map_err(|e| StoreError::Backend(e.into()))?;

        sqlx::query(
            r#"
            INSERT INTO items (tiid, needs_aliases, doc)
            VALUES ($1, $2, $3)
            ON CONFLICT (tiid) DO UPDATE SET needs_aliases = EXCLUDED.needs_aliases, doc = EXCLUDED.doc
            "#,
        )
        .bind(&item.tiid)
        .bind(item.needs_aliases)
        .bind(doc)
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::Backend(e.into()))?;

        sqlx::query("DELETE FROM item_aliases WHERE tiid = $1")
            .bind(&item.tiid)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Backend(e.into()))?;

        for (ns, id) in item.aliases.tuples() {
            sqlx::query(
                "INSERT INTO item_aliases (namespace, alias_id, tiid) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
            )
            .bind(ns)
            .bind(id)
            .bind(&item.tiid)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Backend(e.into()))?;
        }

        tx.commit().await.map_err(|e| StoreError::Backend(e.into()))?;
        Ok(())
    }
}

#[async_trait]
impl ItemStore for PostgresItemStore {
    #[instrument(name = "postgres_item_store.create", skip(self, item), fields(tiid = %item.tiid))]
    async fn create(&self, item: Item) -> Result<(), StoreError> {
        let existing = sqlx::query("SELECT 1 FROM items WHERE tiid = $1")
            .bind(&item.tiid)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.into()))?;
        if existing.is_some() {
            return Err(StoreError::Duplicate(item.tiid));
        }
        self.upsert(&item).await
    }

    #[instrument(name = "postgres_item_store.get", skip(self))]
    async fn get(&self, tiid: &str) -> Result<Item, StoreError> {
        let row = sqlx::query("SELECT doc FROM items WHERE tiid = $1")
            .bind(tiid)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.into()))?
            .ok_or_else(|| StoreError::NotFound(tiid.to_string()))?;
        let doc: serde_json::Value = row.try_get("doc").map_err(|e| StoreError::Backend(e.into()))?;
        serde_json::from_value(doc).map_err(|e| StoreError::Backend(e.into()))
    }

    #[instrument(name = "postgres_item_store.save", skip(self, item), fields(tiid = %item.tiid))]
    async fn save(&self, item: Item) -> Result<(), StoreError> {
        self.upsert(&item).await
    }

    #[instrument(name = "postgres_item_store.find_tiid_by_alias", skip(self))]
    async fn find_tiid_by_alias(
        &self,
        namespace: &str,
        id: &str,
    ) -> Result<Option<String>, StoreError> {
        let ns = altimetry_core::ids::canonical_namespace(namespace);
        let rows = sqlx::query(
            "SELECT tiid FROM item_aliases WHERE namespace = $1 AND alias_id = $2 ORDER BY tiid",
        )
        .bind(&ns)
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.into()))?;

        if rows.len() > 1 {
            warn!(namespace = %ns, id, claimants = rows.len(), "alias claimed by more than one item");
        }

        Ok(rows
            .first()
            .map(|row| row.try_get::<String, _>("tiid"))
            .transpose()
            .map_err(|e| StoreError::Backend(e.into()))?)
    }

    #[instrument(name = "postgres_item_store.items_needing_aliases", skip(self))]
    async fn items_needing_aliases(&self) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query("SELECT tiid FROM items WHERE needs_aliases IS NOT NULL")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.into()))?;
        rows.into_iter()
            .map(|row| row.try_get::<String, _>("tiid").map_err(|e| StoreError::Backend(e.into())))
            .collect()
    }
}
