//! 메모리 키-시계열 저장소.

use std::collections::HashMap;

use async_trait::async_trait;
use market_core::{SeriesBuffer, Span, Timestamped};
use tokio::sync::RwLock;

use super::SeriesStore;
use crate::error::Result;

/// 프로세스 메모리 시계열 저장소.
#[derive(Debug)]
pub struct MemorySeriesStore<T> {
    buffers: RwLock<HashMap<String, SeriesBuffer<T>>>,
}

impl<T> Default for MemorySeriesStore<T> {
    fn default() -> Self {
        Self {
            buffers: RwLock::new(HashMap::new()),
        }
    }
}

impl<T> MemorySeriesStore<T> {
    /// 빈 저장소.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl<T> SeriesStore<T> for MemorySeriesStore<T>
where
    T: Timestamped + Clone + Send + Sync + 'static,
{
    async fn set(&self, key: &str, start: f64, end: f64, items: Vec<T>) -> Result<()> {
        if start >= end {
            return Ok(());
        }
        self.buffers
            .write()
            .await
            .entry(key.to_string())
            .or_default()
            .set(start, end, items);
        Ok(())
    }

    async fn get(&self, key: &str, start: f64, end: f64) -> Result<Vec<T>> {
        Ok(self
            .buffers
            .read()
            .await
            .get(key)
            .map(|buffer| buffer.get(start, end))
            .unwrap_or_default())
    }

    async fn delete(&self, key: &str, start: f64, end: f64) -> Result<()> {
        if let Some(buffer) = self.buffers.write().await.get_mut(key) {
            buffer.delete(start, end);
        }
        Ok(())
    }

    async fn missing_spans(&self, key: &str, start: f64, end: f64) -> Result<Vec<Span>> {
        let buffers = self.buffers.read().await;
        Ok(match buffers.get(key) {
            Some(buffer) => buffer.missing_spans(start, end),
            None if start < end => vec![Span::new(start, end)],
            None => Vec::new(),
        })
    }

    async fn spans(&self, key: &str) -> Result<Vec<Span>> {
        Ok(self
            .buffers
            .read()
            .await
            .get(key)
            .map(|buffer| buffer.spans().to_vec())
            .unwrap_or_default())
    }

    async fn clear(&self, key: &str) -> Result<bool> {
        Ok(self.buffers.write().await.remove(key).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self.buffers.read().await.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
