//! 캐시 통계.

use std::sync::atomic::{AtomicU64, Ordering};

/// `CachedSeries` 동작 카운터.
#[derive(Debug, Default)]
pub struct CacheStats {
    fetches: AtomicU64,
    fetched_items: AtomicU64,
    served_items: AtomicU64,
    skipped_live_tails: AtomicU64,
}

/// 특정 시점의 카운터 값.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    /// 업스트림 호출 수
    pub fetches: u64,
    /// 업스트림에서 받은 항목 수
    pub fetched_items: u64,
    /// 호출자에게 돌려준 항목 수
    pub served_items: u64,
    /// 갱신 조건을 만족하지 않아 건너뛴 라이브 꼬리 수
    pub skipped_live_tails: u64,
}

impl CacheStats {
    pub(crate) fn record_fetch(&self, items: usize) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        self.fetched_items.fetch_add(items as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_served(&self, items: usize) {
        self.served_items.fetch_add(items as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_skipped_tail(&self) {
        self.skipped_live_tails.fetch_add(1, Ordering::Relaxed);
    }

    /// 현재 값.
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            fetches: self.fetches.load(Ordering::Relaxed),
            fetched_items: self.fetched_items.load(Ordering::Relaxed),
            served_items: self.served_items.load(Ordering::Relaxed),
            skipped_live_tails: self.skipped_live_tails.load(Ordering::Relaxed),
        }
    }
}
