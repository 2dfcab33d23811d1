//! 키별 잠금 맵.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// 키 문자열별 `Mutex`를 지연 생성해 나눠 주는 맵.
#[derive(Debug, Default, Clone)]
pub struct KeyLocks {
    locks: Arc<RwLock<HashMap<String, Arc<Mutex<()>>>>>,
}

impl KeyLocks {
    /// 빈 맵.
    pub fn new() -> Self {
        Self::default()
    }

    /// 키의 잠금을 획득합니다.
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        self.get_or_create_lock(key).await.lock_owned().await
    }

    /// Lock 획득 또는 생성.
    async fn get_or_create_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let locks = self.locks.read().await;
        if let Some(lock) = locks.get(key) {
            return lock.clone();
        }
        drop(locks);

        let mut locks = self.locks.write().await;
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// 생성된 잠금 수.
    pub async fn len(&self) -> usize {
        self.locks.read().await.len()
    }

    /// 잠금이 하나도 없는지 확인합니다.
    pub async fn is_empty(&self) -> bool {
        self.locks.read().await.is_empty()
    }
}
