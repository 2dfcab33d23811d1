//! 현재 시각 추상화.
//!
//! 캐시 데코레이터와 백오프 감시자는 `Clock`을 명시적으로 주입받습니다.
//! 테스트에서는 `ManualClock`으로 시간을 고정하거나 전진시킵니다.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Unix 시각(초)을 제공하는 시계.
pub trait Clock: Send + Sync + Debug {
    /// 현재 Unix 시각 (초).
    fn now(&self) -> f64;
}

/// 공유 시계 핸들.
pub type SharedClock = Arc<dyn Clock>;

/// 시스템 시계.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// 공유 핸들로 생성합니다.
    pub fn shared() -> SharedClock {
        Arc::new(SystemClock)
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }
}

/// 수동 시계. `f64` 비트를 원자적으로 보관합니다.
#[derive(Debug)]
pub struct ManualClock {
    bits: AtomicU64,
}

impl ManualClock {
    /// 주어진 시각에서 시작합니다.
    pub fn new(now: f64) -> Self {
        Self {
            bits: AtomicU64::new(now.to_bits()),
        }
    }

    /// 공유 핸들로 생성합니다.
    pub fn shared(now: f64) -> Arc<Self> {
        Arc::new(Self::new(now))
    }

    /// 시각을 설정합니다.
    pub fn set(&self, now: f64) {
        self.bits.store(now.to_bits(), Ordering::SeqCst);
    }

    /// 시각을 `secs`만큼 전진시킵니다.
    pub fn advance(&self, secs: f64) {
        let _ = self
            .bits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |bits| {
                Some((f64::from_bits(bits) + secs).to_bits())
            });
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(100.0);
        assert_eq!(clock.now(), 100.0);
        clock.advance(1.5);
        assert_eq!(clock.now(), 101.5);
        clock.set(7.0);
        assert_eq!(clock.now(), 7.0);
    }

    #[test]
    fn test_system_clock_is_recent() {
        // 2020-01-01 이후
        assert!(SystemClock.now() > 1_577_836_800.0);
    }
}
