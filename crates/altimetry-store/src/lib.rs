//! Item Store and Collection Store implementations (spec §4.3).
//!
//! The default, test-oriented implementation is an in-process concurrent
//! map. The `postgres` feature adds a second implementation that persists
//! items as JSONB documents, mirroring the original system's CouchDB-backed
//! store at the capability level (read/write/query-by-alias) without
//! committing to any particular wire schema.

mod in_memory;
#[cfg(feature = "postgres")]
mod postgres;

pub use in_memory::{InMemoryCollectionStore, InMemoryItemStore};
#[cfg(feature = "postgres")]
pub use postgres::PostgresItemStore;
