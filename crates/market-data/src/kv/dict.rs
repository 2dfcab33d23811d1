//! 단일 파일 사전 키-값 저장소.
//!
//! 파일 하나에 `{키: 인코딩된 값}` JSON 객체를 보관합니다.
//! 처음 접근할 때 읽어 메모리에 두고, 변경할 때마다 파일 전체를 원자적으로 다시 씁니다.

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;

use super::KeyValueStore;
use crate::codec::{Codec, JsonCodec};
use crate::error::{DataError, Result};
use crate::fs;

type Entries = BTreeMap<String, String>;

/// 파일 하나에 모든 항목을 담는 저장소.
pub struct DictFileKvStore<T> {
    path: PathBuf,
    codec: Arc<dyn Codec<T>>,
    entries: Mutex<Option<Entries>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> DictFileKvStore<T>
where
    T: Serialize + DeserializeOwned + 'static,
{
    /// JSON 코덱으로 저장소를 만듭니다.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_codec(path, Arc::new(JsonCodec))
    }
}

impl<T> DictFileKvStore<T> {
    /// 지정한 코덱으로 저장소를 만듭니다.
    pub fn with_codec(path: impl Into<PathBuf>, codec: Arc<dyn Codec<T>>) -> Self {
        Self {
            path: path.into(),
            codec,
            entries: Mutex::new(None),
            _marker: PhantomData,
        }
    }

    /// 파일 경로.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self, slot: &mut Option<Entries>) -> Result<()> {
        if slot.is_some() {
            return Ok(());
        }
        let entries = match fs::read_optional(&self.path).await? {
            Some(text) if !text.trim().is_empty() => serde_json::from_str(&text)?,
            _ => Entries::new(),
        };
        debug!(path = %self.path.display(), count = entries.len(), "사전 파일 로드");
        *slot = Some(entries);
        Ok(())
    }

    async fn flush(&self, entries: &Entries) -> Result<()> {
        fs::atomic_write(self.path.clone(), serde_json::to_string(entries)?).await
    }
}

fn loaded(slot: &mut Option<Entries>) -> Result<&mut Entries> {
    slot.as_mut()
        .ok_or_else(|| DataError::InvalidData("사전 파일이 로드되지 않음".to_string()))
}

#[async_trait]
impl<T> KeyValueStore<T> for DictFileKvStore<T>
where
    T: Send + Sync + 'static,
{
    async fn set(&self, key: &str, value: &T) -> Result<()> {
        let text = self.codec.encode(value)?;
        let mut slot = self.entries.lock().await;
        self.load(&mut slot).await?;
        let entries = loaded(&mut slot)?;
        entries.insert(key.to_string(), text);
        self.flush(entries).await
    }

    async fn get(&self, key: &str) -> Result<T> {
        let mut slot = self.entries.lock().await;
        self.load(&mut slot).await?;
        match loaded(&mut slot)?.get(key) {
            Some(text) => self.codec.decode(text),
            None => Err(DataError::NotFound(key.to_string())),
        }
    }

    async fn has(&self, key: &str) -> Result<bool> {
        let mut slot = self.entries.lock().await;
        self.load(&mut slot).await?;
        Ok(loaded(&mut slot)?.contains_key(key))
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut slot = self.entries.lock().await;
        self.load(&mut slot).await?;
        let entries = loaded(&mut slot)?;
        if entries.remove(key).is_none() {
            return Ok(false);
        }
        self.flush(entries).await?;
        Ok(true)
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut slot = self.entries.lock().await;
        self.load(&mut slot).await?;
        Ok(loaded(&mut slot)?.keys().cloned().collect())
    }
}
