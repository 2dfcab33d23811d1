//! 시계열 저장소와 캐시.
//!
//! 이 crate는 다음을 제공합니다:
//! - 값 코덱 (스키마 JSON, 태그 JSON)
//! - 키-값 저장소 (메모리, 폴더, 단일 파일 사전, SQLite)
//! - 키-시계열 저장소 (메모리, 폴더, SQLite)
//! - 업스트림 조회를 줄이는 시계열/단일 값 캐시 래퍼
//! - 설정 기반 저장소 팩토리

pub mod cache;
pub mod codec;
pub mod error;
pub mod escape;
pub mod factory;
mod fs;
pub mod kv;
pub mod lock;
pub mod series;

pub use error::{DataError, Result};

pub use cache::{CacheStats, CacheStatsSnapshot, CachedScalar, CachedSeries, SeriesPolicy};
pub use codec::{Codec, JsonCodec, Stamped, TaggedCodec, Value};
pub use factory::StorageFactory;
pub use kv::{DictFileKvStore, FolderKvStore, KeyValueStore, MemoryKvStore, SqlKvStore};
pub use lock::KeyLocks;
pub use series::{FolderSeriesStore, MemorySeriesStore, SeriesStore, SqlSeriesStore};
