//! 키-값 저장소.
//!
//! 모든 백엔드가 같은 의미를 가집니다:
//! - `get`은 키가 없으면 `DataError::NotFound`
//! - `try_get`은 `NotFound`를 `None`으로 변환
//! - `delete`는 키가 있었는지를 반환

mod dict;
mod folder;
mod memory;
pub(crate) mod sql;

use async_trait::async_trait;

use crate::error::Result;

pub use dict::DictFileKvStore;
pub use folder::FolderKvStore;
pub use memory::MemoryKvStore;
pub use sql::SqlKvStore;

/// 키-값 저장소 trait.
#[async_trait]
pub trait KeyValueStore<T: Send + Sync + 'static>: Send + Sync {
    /// 값을 기록합니다.
    async fn set(&self, key: &str, value: &T) -> Result<()>;

    /// 값을 읽습니다. 없으면 `NotFound`.
    async fn get(&self, key: &str) -> Result<T>;

    /// 값을 읽습니다. 없으면 `None`.
    async fn try_get(&self, key: &str) -> Result<Option<T>> {
        match self.get(key).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// 키 존재 여부.
    async fn has(&self, key: &str) -> Result<bool>;

    /// 키를 지웁니다. 있었으면 `true`.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// 모든 키 (정렬됨).
    async fn keys(&self) -> Result<Vec<String>>;
}
