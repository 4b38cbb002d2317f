use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::{Store, StoreError};

/// I store key-value pairs in memory.
///
/// Intended for tests and ephemeral deployments; nothing here survives
/// process restart.
#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<HashMap<(String, String, String), Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(user: &str, silo: &str, key: &str) -> (String, String, String) {
        (user.to_owned(), silo.to_owned(), key.to_owned())
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn get(&self, user: &str, silo: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        self.data
            .lock()
            .await
            .get(&Self::key(user, silo, key))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn put(
        &self,
        user: &str,
        silo: &str,
        key: &str,
        value: Vec<u8>,
    ) -> Result<(), StoreError> {
        self.data
            .lock()
            .await
            .insert(Self::key(user, silo, key), value);
        Ok(())
    }

    async fn delete(&self, user: &str, silo: &str, key: &str) -> Result<(), StoreError> {
        self.data
            .lock()
            .await
            .remove(&Self::key(user, silo, key))
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = MemoryStore::new();
        store.put("jim", "s", "k", b"V".to_vec()).await.unwrap();
        assert_eq!(store.get("jim", "s", "k").await.unwrap(), b"V");
    }

    #[tokio::test]
    async fn missing_key_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.get("jim", "s", "missing").await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let store = MemoryStore::new();
        store.put("jim", "s", "k", b"V".to_vec()).await.unwrap();
        store.delete("jim", "s", "k").await.unwrap();
        assert!(matches!(
            store.get("jim", "s", "k").await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.delete("jim", "s", "missing").await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn scopes_are_independent() {
        let store = MemoryStore::new();
        store.put("jim", "s", "k", b"jim".to_vec()).await.unwrap();
        store.put("bob", "s", "k", b"bob".to_vec()).await.unwrap();
        assert_eq!(store.get("jim", "s", "k").await.unwrap(), b"jim");
        assert_eq!(store.get("bob", "s", "k").await.unwrap(), b"bob");
    }
}
