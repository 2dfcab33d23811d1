//! 메모리 키-값 저장소.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::KeyValueStore;
use crate::error::{DataError, Result};

/// 프로세스 메모리 키-값 저장소.
#[derive(Debug)]
pub struct MemoryKvStore<T> {
    entries: RwLock<BTreeMap<String, T>>,
}

impl<T> Default for MemoryKvStore<T> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<T> MemoryKvStore<T> {
    /// 빈 저장소.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl<T> KeyValueStore<T> for MemoryKvStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn set(&self, key: &str, value: &T) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<T> {
        self.entries
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| DataError::NotFound(key.to_string()))
    }

    async fn has(&self, key: &str) -> Result<bool> {
        Ok(self.entries.read().await.contains_key(key))
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_contract() {
        let store = MemoryKvStore::<String>::new();
        crate::kv::contract::exercise(&store).await;
    }
}
