//! 키-시계열 저장소.
//!
//! 키마다 시각 정렬된 항목과 반열린 커버리지 구간 `(start, end]` 목록을 보관합니다.
//! 모든 연산은 키 단위로 원자적이며, 연산 뒤에는 항상 다음이 성립합니다.
//!
//! - 구간은 정렬되어 있고 서로 겹치거나 맞닿지 않음
//! - 저장된 모든 항목의 시각은 어떤 커버리지 구간 안에 있음

mod folder;
mod memory;
mod sql;

use async_trait::async_trait;
use market_core::Span;

use crate::error::Result;

pub use folder::FolderSeriesStore;
pub use memory::MemorySeriesStore;
pub use sql::SqlSeriesStore;

/// 키-시계열 저장소 trait.
#[async_trait]
pub trait SeriesStore<T: Send + Sync + 'static>: Send + Sync {
    /// `items`를 기록하고 `(start, end]`를 커버리지에 흡수합니다.
    ///
    /// 구간 밖의 항목은 무시되고, 같은 시각의 기존 항목은 덮어씁니다.
    async fn set(&self, key: &str, start: f64, end: f64, items: Vec<T>) -> Result<()>;

    /// `start < t <= end`인 항목 (시각 오름차순).
    async fn get(&self, key: &str, start: f64, end: f64) -> Result<Vec<T>>;

    /// `(start, end]`의 항목을 지우고 커버리지를 잘라냅니다.
    async fn delete(&self, key: &str, start: f64, end: f64) -> Result<()>;

    /// `(start, end]` 안의 미커버 구간 (오름차순).
    async fn missing_spans(&self, key: &str, start: f64, end: f64) -> Result<Vec<Span>>;

    /// 현재 커버리지 구간.
    async fn spans(&self, key: &str) -> Result<Vec<Span>>;

    /// 키를 통째로 지웁니다. 키가 있었으면 `true`.
    async fn clear(&self, key: &str) -> Result<bool>;

    /// 모든 키 (정렬됨).
    async fn keys(&self) -> Result<Vec<String>>;
}
