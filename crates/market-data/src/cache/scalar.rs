//! 단일 값 캐시 래퍼.

use std::future::Future;
use std::sync::Arc;

use market_core::SharedClock;
use tracing::debug;

use crate::codec::Stamped;
use crate::error::DataError;
use crate::kv::KeyValueStore;

type KeyFn<C> = Arc<dyn Fn(&C) -> String + Send + Sync>;
type TtlFn<C> = Arc<dyn Fn(&C) -> f64 + Send + Sync>;

/// 키-값 저장소와 TTL로 값을 캐시하는 래퍼.
///
/// 캐시 항목이 있고 `now - written_at <= ttl(ctx)`이면 그대로 반환하고,
/// 아니면 `fetch`를 호출해 `(값, now)`를 기록합니다.
pub struct CachedScalar<T: Send + Sync + 'static, C> {
    store: Arc<dyn KeyValueStore<Stamped<T>>>,
    key_of: KeyFn<C>,
    ttl: TtlFn<C>,
    clock: SharedClock,
}

impl<T, C> CachedScalar<T, C>
where
    T: Send + Sync + 'static,
    C: Sync,
{
    /// 새 래퍼.
    pub fn new<K, L>(
        store: Arc<dyn KeyValueStore<Stamped<T>>>,
        key_of: K,
        ttl: L,
        clock: SharedClock,
    ) -> Self
    where
        K: Fn(&C) -> String + Send + Sync + 'static,
        L: Fn(&C) -> f64 + Send + Sync + 'static,
    {
        Self {
            store,
            key_of: Arc::new(key_of),
            ttl: Arc::new(ttl),
            clock,
        }
    }

    /// 캐시된 값 또는 새로 받은 값.
    pub async fn get<F, Fut, E>(&self, ctx: &C, fetch: F) -> std::result::Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: From<DataError>,
    {
        let key = (self.key_of)(ctx);
        let now = self.clock.now();

        if let Some(cached) = self.store.try_get(&key).await? {
            if !cached.is_expired(now, (self.ttl)(ctx)) {
                return Ok(cached.value);
            }
            debug!(key = %key, written_at = cached.written_at, "스칼라 캐시 만료");
        }

        let value = fetch().await?;
        let stamped = Stamped::new(value, now);
        self.store.set(&key, &stamped).await?;
        Ok(stamped.value)
    }

    /// 캐시 항목을 지웁니다.
    pub async fn invalidate(&self, ctx: &C) -> std::result::Result<bool, DataError> {
        self.store.delete(&(self.key_of)(ctx)).await
    }
}
