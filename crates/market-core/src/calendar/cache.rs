//! 타임스탬프 열거 캐시.
//!
//! 인터벌별로 이미 열거한 구간과 결과를 `SeriesBuffer`에 보관합니다.
//! 청크 계산은 잠금 안에서 끝까지 수행되므로 캐시에는 완성된 청크만 기록됩니다.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tracing::trace;

use crate::series::SeriesBuffer;
use crate::types::Interval;

/// 인터벌별 타임스탬프 캐시.
#[derive(Debug, Default)]
pub struct TimestampCache {
    inner: Mutex<HashMap<Interval, SeriesBuffer<f64>>>,
}

impl TimestampCache {
    /// 빈 캐시.
    pub fn new() -> Self {
        Self::default()
    }

    /// `(ext_from, ext_to]`의 미열거 구간을 `fill`로 채운 뒤 `(from, to]`를 반환합니다.
    pub fn get_or_fill<F>(
        &self,
        interval: Interval,
        ext_from: f64,
        ext_to: f64,
        from: f64,
        to: f64,
        fill: F,
    ) -> Vec<f64>
    where
        F: Fn(f64, f64) -> Vec<f64>,
    {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let buffer = guard.entry(interval).or_default();

        for gap in buffer.missing_spans(ext_from, ext_to) {
            let stamps = fill(gap.start, gap.end);
            trace!(
                interval = %interval,
                start = gap.start,
                end = gap.end,
                count = stamps.len(),
                "타임스탬프 청크 열거"
            );
            buffer.set(gap.start, gap.end, stamps);
        }

        buffer.get(from, to)
    }

    /// 해당 인터벌에 캐시된 구간 수.
    pub fn cached_spans(&self, interval: Interval) -> usize {
        let guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        guard.get(&interval).map_or(0, |b| b.spans().len())
    }

    /// 캐시를 비웁니다.
    pub fn clear(&self) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_fill_only_missing() {
        let cache = TimestampCache::new();
        let calls = Cell::new(0);
        let fill = |s: f64, e: f64| {
            calls.set(calls.get() + 1);
            let mut t = s.floor() + 1.0;
            let mut out = Vec::new();
            while t <= e {
                out.push(t);
                t += 1.0;
            }
            out
        };

        let first = cache.get_or_fill(Interval::M1, 0.0, 10.0, 2.0, 5.0, fill);
        assert_eq!(first, vec![3.0, 4.0, 5.0]);
        assert_eq!(calls.get(), 1);

        let second = cache.get_or_fill(Interval::M1, 0.0, 10.0, 0.0, 10.0, fill);
        assert_eq!(second.len(), 10);
        assert_eq!(calls.get(), 1);

        cache.get_or_fill(Interval::M1, 0.0, 20.0, 0.0, 20.0, fill);
        assert_eq!(calls.get(), 2);
        assert_eq!(cache.cached_spans(Interval::M1), 1);
    }
}
