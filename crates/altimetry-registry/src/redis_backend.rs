//! Redis-backed Progress Registry, the production backend referenced by
//! `REGISTRY_URL` (§6, Environment).

use altimetry_core::error::RegistryError;
use altimetry_core::registry::ProgressRegistry;
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};

fn counter_key(tiid: &str) -> String {
    format!("altimetry:progress:{tiid}")
}

#[derive(Clone)]
pub struct RedisProgressRegistry {
    conn: ConnectionManager,
}

impl RedisProgressRegistry {
    pub async fn connect(url: &str) -> Result<Self, RegistryError> {
        let client = redis::Client::open(url).map_err(|e| RegistryError::Backend(e.into()))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| RegistryError::Backend(e.into()))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl ProgressRegistry for RedisProgressRegistry {
    async fn set(&self, tiid: &str, n: i64) -> Result<(), RegistryError> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(counter_key(tiid), n)
            .await
            .map_err(|e| RegistryError::Backend(e.into()))
    }

    async fn decr(&self, tiid: &str) -> Result<i64, RegistryError> {
        let mut conn = self.conn.clone();
        conn.decr(counter_key(tiid), 1)
            .await
            .map_err(|e| RegistryError::Backend(e.into()))
    }

    async fn get(&self, tiid: &str) -> Result<Option<i64>, RegistryError> {
        let mut conn = self.conn.clone();
        conn.get(counter_key(tiid))
            .await
            .map_err(|e| RegistryError::Backend(e.into()))
    }

    async fn clear(&self, tiid: &str) -> Result<(), RegistryError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(counter_key(tiid))
            .await
            .map_err(|e| RegistryError::Backend(e.into()))
    }
}
