//! 폴더 키-값 저장소.
//!
//! `root/<이스케이프된 키>` 파일 하나에 값 하나를 보관합니다.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::trace;

use super::KeyValueStore;
use crate::codec::{Codec, JsonCodec};
use crate::error::{DataError, Result};
use crate::escape::{escape_key, unescape_key};
use crate::fs;

/// 키당 파일 하나를 쓰는 저장소.
pub struct FolderKvStore<T> {
    root: PathBuf,
    codec: Arc<dyn Codec<T>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> FolderKvStore<T>
where
    T: Serialize + DeserializeOwned + 'static,
{
    /// JSON 코덱으로 저장소를 만듭니다.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_codec(root, Arc::new(JsonCodec))
    }
}

impl<T> FolderKvStore<T> {
    /// 지정한 코덱으로 저장소를 만듭니다.
    pub fn with_codec(root: impl Into<PathBuf>, codec: Arc<dyn Codec<T>>) -> Self {
        Self {
            root: root.into(),
            codec,
            _marker: PhantomData,
        }
    }

    /// 루트 디렉토리.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, key: &str) -> PathBuf {
        self.root.join(escape_key(key))
    }
}

#[async_trait]
impl<T> KeyValueStore<T> for FolderKvStore<T>
where
    T: Send + Sync + 'static,
{
    async fn set(&self, key: &str, value: &T) -> Result<()> {
        let text = self.codec.encode(value)?;
        trace!(key, bytes = text.len(), "KV 파일 기록");
        fs::atomic_write(self.path_of(key), text).await
    }

    async fn get(&self, key: &str) -> Result<T> {
        match fs::read_optional(&self.path_of(key)).await? {
            Some(text) => self.codec.decode(&text),
            None => Err(DataError::NotFound(key.to_string())),
        }
    }

    async fn has(&self, key: &str) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.path_of(key)).await?)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        fs::remove_optional(&self.path_of(key)).await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut keys = fs::list_names(&self.root)
            .await?
            .iter()
            .map(|name| unescape_key(name))
            .collect::<Result<Vec<_>>>()?;
        keys.sort();
        Ok(keys)
    }
}
