//! Key-value backends the aggregate cache reads through.
//!
//! A store only needs whole-entry `get` and `set`. Implementations must make
//! `set` atomic per key: a reader sees the old entry or the new one, never a
//! half-written value.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::StoreError;
use crate::models::CacheEntry;
use async_trait::async_trait;

#[async_trait]
pub trait Store: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, StoreError>;

    async fn set(&self, key: &str, entry: CacheEntry) -> Result<(), StoreError>;
}
