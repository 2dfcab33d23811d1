//! 캐시 래퍼.
//!
//! - `CachedSeries` - 업스트림 시계열 조회를 키-시계열 저장소 위에서 최소 호출로 줄임
//! - `CachedScalar` - 키-값 저장소와 TTL로 단일 값을 캐시

mod scalar;
mod series;
mod stats;

pub use scalar::CachedScalar;
pub use series::{CachedSeries, SeriesPolicy};
pub use stats::{CacheStats, CacheStatsSnapshot};
