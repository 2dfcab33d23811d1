//! 시계열 캐시 래퍼.
//!
//! 호출 `(from, to, ctx)` 처리 순서:
//!
//! 1. `now = 현재 시각 - live_delay(ctx)`로 `to`를 자르고 `from <= to`로 맞춤
//! 2. 청크 크기가 있으면 창을 청크 경계로 넓힘 (`ext_to`는 `now`를 넘지 않음)
//! 3. 미커버 구간마다 업스트림을 호출해 저장
//! 4. 저장소에서 `(from, to]`를 읽어 반환
//!
//! 라이브 꼬리(`now`에서 끝나고 기존 커버리지 끝에서 시작하는 미커버 구간)는
//! `should_refresh`가 참일 때만 다시 받습니다. 이때 꼬리가 걸친 청크의 시작부터 다시 받아
//! 이미 저장된 미완성 항목을 덮어씁니다.
//!
//! 같은 키의 `미커버 구간 조회 → 업스트림 호출 → 저장`은 키별 잠금 아래에서 실행됩니다.
//! 업스트림 오류는 그대로 전파되고, 그 전까지 저장된 구간은 유지됩니다.

use std::future::Future;
use std::sync::Arc;

use market_core::SharedClock;
use tracing::{debug, instrument};

use super::stats::CacheStats;
use crate::error::DataError;
use crate::lock::KeyLocks;
use crate::series::SeriesStore;

type KeyFn<C> = Arc<dyn Fn(&C) -> String + Send + Sync>;
type StorageFn<T, C> = Arc<dyn Fn(&C) -> Arc<dyn SeriesStore<T>> + Send + Sync>;
type ChunkFn<C> = Arc<dyn Fn(&C) -> Option<f64> + Send + Sync>;
type DelayFn<C> = Arc<dyn Fn(&C) -> f64 + Send + Sync>;
type RefreshFn<C> = Arc<dyn Fn(f64, f64, &C) -> bool + Send + Sync>;

/// 시계열 캐시 설정 클로저 묶음.
pub struct SeriesPolicy<T, C> {
    key_of: KeyFn<C>,
    storage_of: StorageFn<T, C>,
    chunk_size: ChunkFn<C>,
    live_delay: DelayFn<C>,
    should_refresh: RefreshFn<C>,
}

impl<T, C> Clone for SeriesPolicy<T, C> {
    fn clone(&self) -> Self {
        Self {
            key_of: self.key_of.clone(),
            storage_of: self.storage_of.clone(),
            chunk_size: self.chunk_size.clone(),
            live_delay: self.live_delay.clone(),
            should_refresh: self.should_refresh.clone(),
        }
    }
}

impl<T, C> SeriesPolicy<T, C>
where
    T: Send + Sync + 'static,
{
    /// 키/저장소 선택 함수로 정책을 만듭니다.
    ///
    /// 기본값: 청크 없음, 지연 0, 라이브 꼬리는 항상 갱신.
    pub fn new<K, S>(key_of: K, storage_of: S) -> Self
    where
        K: Fn(&C) -> String + Send + Sync + 'static,
        S: Fn(&C) -> Arc<dyn SeriesStore<T>> + Send + Sync + 'static,
    {
        Self {
            key_of: Arc::new(key_of),
            storage_of: Arc::new(storage_of),
            chunk_size: Arc::new(|_| None),
            live_delay: Arc::new(|_| 0.0),
            should_refresh: Arc::new(|_, _, _| true),
        }
    }

    /// 모든 컨텍스트가 같은 저장소를 쓰는 정책.
    pub fn with_store<K>(key_of: K, store: Arc<dyn SeriesStore<T>>) -> Self
    where
        K: Fn(&C) -> String + Send + Sync + 'static,
    {
        Self::new(key_of, move |_| store.clone())
    }

    /// 컨텍스트별 청크 크기 (초).
    pub fn chunk_size(mut self, f: impl Fn(&C) -> Option<f64> + Send + Sync + 'static) -> Self {
        self.chunk_size = Arc::new(f);
        self
    }

    /// 고정 청크 크기 (초).
    pub fn fixed_chunk(self, secs: f64) -> Self {
        self.chunk_size(move |_| Some(secs))
    }

    /// 업스트림 지연 (초).
    pub fn live_delay(mut self, f: impl Fn(&C) -> f64 + Send + Sync + 'static) -> Self {
        self.live_delay = Arc::new(f);
        self
    }

    /// 라이브 꼬리 갱신 조건 `(start, end, ctx)`.
    pub fn should_refresh(
        mut self,
        f: impl Fn(f64, f64, &C) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.should_refresh = Arc::new(f);
        self
    }
}

/// 업스트림 조회를 키-시계열 저장소로 캐시하는 래퍼.
pub struct CachedSeries<T, C> {
    policy: SeriesPolicy<T, C>,
    clock: SharedClock,
    locks: KeyLocks,
    stats: CacheStats,
}

impl<T, C> CachedSeries<T, C>
where
    T: Send + Sync + 'static,
    C: Sync,
{
    /// 새 래퍼.
    pub fn new(policy: SeriesPolicy<T, C>, clock: SharedClock) -> Self {
        Self {
            policy,
            clock,
            locks: KeyLocks::new(),
            stats: CacheStats::default(),
        }
    }

    /// 동작 카운터.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// 컨텍스트의 저장 키.
    pub fn key_of(&self, ctx: &C) -> String {
        (self.policy.key_of)(ctx)
    }

    /// 컨텍스트의 저장소.
    pub fn storage_of(&self, ctx: &C) -> Arc<dyn SeriesStore<T>> {
        (self.policy.storage_of)(ctx)
    }

    /// `(from, to]` 항목을 반환합니다. 미커버 구간은 `fetch(start, end)`로 채웁니다.
    #[instrument(skip(self, ctx, fetch), fields(key = tracing::field::Empty))]
    pub async fn get<F, Fut, E>(
        &self,
        from: f64,
        to: f64,
        ctx: &C,
        fetch: F,
    ) -> std::result::Result<Vec<T>, E>
    where
        F: Fn(f64, f64) -> Fut,
        Fut: Future<Output = std::result::Result<Vec<T>, E>>,
        E: From<DataError>,
    {
        let now = self.clock.now() - (self.policy.live_delay)(ctx);
        let to = to.min(now);
        let from = from.min(to);
        if from >= to {
            return Ok(Vec::new());
        }

        let key = (self.policy.key_of)(ctx);
        tracing::Span::current().record("key", key.as_str());
        let storage = (self.policy.storage_of)(ctx);
        let chunk = (self.policy.chunk_size)(ctx).filter(|c| c.is_finite() && *c > 0.0);
        let (ext_from, ext_to) = match chunk {
            Some(c) => (floor_to(from, c), ceil_to(to, c).min(now)),
            None => (from, to),
        };

        let _guard = self.locks.lock(&key).await;

        for span in storage.missing_spans(&key, ext_from, ext_to).await? {
            let (mut start, end) = (span.start, span.end);

            if end == now && start > ext_from {
                if !(self.policy.should_refresh)(start, end, ctx) {
                    self.stats.record_skipped_tail();
                    debug!(key = %key, start, end, "라이브 꼬리 갱신 생략");
                    continue;
                }
                if let Some(c) = chunk {
                    start = floor_to(start, c).max(ext_from);
                }
            }

            let items = fetch(start, end).await?;
            debug!(key = %key, start, end, count = items.len(), "업스트림 조회");
            self.stats.record_fetch(items.len());
            storage.set(&key, start, end, items).await?;
        }

        let items = storage.get(&key, from, to).await?;
        self.stats.record_served(items.len());
        Ok(items)
    }
}

fn floor_to(t: f64, chunk: f64) -> f64 {
    (t / chunk).floor() * chunk
}

fn ceil_to(t: f64, chunk: f64) -> f64 {
    (t / chunk).ceil() * chunk
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::MemorySeriesStore;
    use market_core::ManualClock;

    #[test]
    fn test_chunk_rounding() {
        assert_eq!(floor_to(86_400.0 * 3.5, 86_400.0), 86_400.0 * 3.0);
        assert_eq!(ceil_to(86_400.0 * 3.5, 86_400.0), 86_400.0 * 4.0);
        assert_eq!(ceil_to(86_400.0 * 3.0, 86_400.0), 86_400.0 * 3.0);
    }

    #[tokio::test]
    async fn test_future_window_is_clamped_to_now() {
        let clock = ManualClock::shared(1_000.0);
        let store: Arc<dyn SeriesStore<f64>> = Arc::new(MemorySeriesStore::new());
        let cache = CachedSeries::new(
            SeriesPolicy::with_store(|_: &()| "k".to_string(), store.clone()),
            clock,
        );

        let items = cache
            .get(1_500.0, 2_000.0, &(), |_, _| async {
                Ok::<_, DataError>(vec![1.0])
            })
            .await
            .unwrap();
        assert!(items.is_empty());
        assert_eq!(cache.stats().snapshot().fetches, 0);
    }
}
