//! 폴더 키-시계열 저장소.
//!
//! 키마다 `root/<이스케이프된 키>/` 하위 폴더를 씁니다.
//!
//! - `items` - 인코딩된 항목을 한 줄에 하나씩 (시각 오름차순)
//! - `spans` - `[[start, end], ...]` JSON 배열 (오름차순, 겹침/맞닿음 없음)
//!
//! 공개 연산은 키별 잠금과 `root/.locks/<이스케이프된 키>` 파일 잠금을 함께 잡고
//! 실행하므로, 같은 루트를 공유하는 다른 프로세스와도 직렬화됩니다.
//! 파일은 임시 파일과 원자적 이름 변경으로 교체합니다.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use market_core::{SeriesBuffer, Span, Timestamped};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::OwnedMutexGuard;
use tracing::trace;

use super::SeriesStore;
use crate::codec::{Codec, JsonCodec};
use crate::error::Result;
use crate::escape::{escape_key, unescape_key};
use crate::fs::{self, FileLock, LOCK_DIR};
use crate::lock::KeyLocks;

const ITEMS_FILE: &str = "items";
const SPANS_FILE: &str = "spans";

/// 키당 폴더 하나를 쓰는 시계열 저장소.
pub struct FolderSeriesStore<T> {
    root: PathBuf,
    codec: Arc<dyn Codec<T>>,
    locks: KeyLocks,
    _marker: PhantomData<fn() -> T>,
}

impl<T> FolderSeriesStore<T>
where
    T: Serialize + DeserializeOwned + 'static,
{
    /// JSON 코덱으로 저장소를 만듭니다.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_codec(root, Arc::new(JsonCodec))
    }
}

impl<T> FolderSeriesStore<T> {
    /// 지정한 코덱으로 저장소를 만듭니다.
    pub fn with_codec(root: impl Into<PathBuf>, codec: Arc<dyn Codec<T>>) -> Self {
        Self {
            root: root.into(),
            codec,
            locks: KeyLocks::new(),
            _marker: PhantomData,
        }
    }

    /// 루트 디렉토리.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn dir_of(&self, key: &str) -> PathBuf {
        self.root.join(escape_key(key))
    }

    /// 프로세스 안과 밖 모두에 대해 키를 잠급니다.
    async fn lock(&self, key: &str) -> Result<(OwnedMutexGuard<()>, FileLock)> {
        let guard = self.locks.lock(key).await;
        let file = FileLock::acquire(self.root.join(LOCK_DIR).join(escape_key(key))).await?;
        Ok((guard, file))
    }
}

impl<T> FolderSeriesStore<T>
where
    T: Timestamped + Clone + Send + Sync + 'static,
{
    async fn load(&self, key: &str) -> Result<SeriesBuffer<T>> {
        let dir = self.dir_of(key);
        let spans: Vec<Span> = match fs::read_optional(&dir.join(SPANS_FILE)).await? {
            Some(text) => serde_json::from_str(&text)?,
            None => return Ok(SeriesBuffer::new()),
        };
        let items = match fs::read_optional(&dir.join(ITEMS_FILE)).await? {
            Some(text) => text
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(|line| self.codec.decode(line))
                .collect::<Result<Vec<T>>>()?,
            None => Vec::new(),
        };
        Ok(SeriesBuffer::from_parts(items, spans))
    }

    async fn save(&self, key: &str, buffer: &SeriesBuffer<T>) -> Result<()> {
        let dir = self.dir_of(key);

        let mut items = String::new();
        for item in buffer.items() {
            items.push_str(&self.codec.encode(item)?);
            items.push('\n');
        }
        let spans = serde_json::to_string(buffer.spans())?;
        trace!(key, items = buffer.len(), spans = buffer.spans().len(), "시계열 폴더 기록");

        // 항목을 먼저 기록해야 구간이 항목 없이 남지 않음
        fs::atomic_write(dir.join(ITEMS_FILE), items).await?;
        fs::atomic_write(dir.join(SPANS_FILE), spans).await
    }
}

#[async_trait]
impl<T> SeriesStore<T> for FolderSeriesStore<T>
where
    T: Timestamped + Clone + Send + Sync + 'static,
{
    async fn set(&self, key: &str, start: f64, end: f64, items: Vec<T>) -> Result<()> {
        if start >= end {
            return Ok(());
        }
        let _lock = self.lock(key).await?;
        let mut buffer = self.load(key).await?;
        buffer.set(start, end, items);
        self.save(key, &buffer).await
    }

    async fn get(&self, key: &str, start: f64, end: f64) -> Result<Vec<T>> {
        let _lock = self.lock(key).await?;
        Ok(self.load(key).await?.get(start, end))
    }

    async fn delete(&self, key: &str, start: f64, end: f64) -> Result<()> {
        let _lock = self.lock(key).await?;
        let mut buffer = self.load(key).await?;
        if buffer.delete(start, end).is_empty() {
            return Ok(());
        }
        self.save(key, &buffer).await
    }

    async fn missing_spans(&self, key: &str, start: f64, end: f64) -> Result<Vec<Span>> {
        let _lock = self.lock(key).await?;
        Ok(self.load(key).await?.missing_spans(start, end))
    }

    async fn spans(&self, key: &str) -> Result<Vec<Span>> {
        let _lock = self.lock(key).await?;
        Ok(self.load(key).await?.spans().to_vec())
    }

    async fn clear(&self, key: &str) -> Result<bool> {
        let _lock = self.lock(key).await?;
        match tokio::fs::remove_dir_all(self.dir_of(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
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
