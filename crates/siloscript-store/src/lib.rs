//! Durable, partitioned key-value storage for siloscript.
//!
//! A [`Store`] is keyed by `(user, silo, key)` and holds binary-safe values.
//! Three variants are provided: [`MemoryStore`] for tests, [`SqliteStore`]
//! for durable single-node deployments, and [`EncryptingStore`], which wraps
//! any other `Store` with RSA encryption at rest.

mod encrypting;
mod error;
mod memory;
mod sqlite;

pub use encrypting::EncryptingStore;
pub use error::StoreError;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// A partitioned, binary-safe key-value map.
///
/// All three operations may suspend: implementations are free to touch
/// disk, a database, or a worker thread doing cryptography.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    async fn get(&self, user: &str, silo: &str, key: &str) -> Result<Vec<u8>, StoreError>;

    async fn put(&self, user: &str, silo: &str, key: &str, value: Vec<u8>)
        -> Result<(), StoreError>;

    async fn delete(&self, user: &str, silo: &str, key: &str) -> Result<(), StoreError>;
}
