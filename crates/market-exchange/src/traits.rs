//! 프로바이더 trait 정의.
//!
//! - `MarketSource` - 업스트림 어댑터가 구현하는 원시 조회 인터페이스
//! - `PricingProvider`, `NewsProvider`, `DataProvider` - 소비자가 쓰는 조회 인터페이스
//! - `MarketProvider` - 세 인터페이스를 모두 가진 프로바이더 (집계용)

use async_trait::async_trait;
use market_core::{Bar, Interval, News, Security, WorkCalendar};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ExchangeError, ExchangeResult};

/// 시세 조회 옵션.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingOptions {
    /// 캘린더 격자에 맞춰 빈 봉을 보간
    pub interpolate: bool,
    /// 보간으로 채울 수 있는 최대 비율
    pub max_fill_ratio: f64,
}

impl Default for PricingOptions {
    fn default() -> Self {
        Self {
            interpolate: false,
            max_fill_ratio: 0.25,
        }
    }
}

impl PricingOptions {
    /// 보간 옵션.
    pub fn interpolated(max_fill_ratio: f64) -> Self {
        Self {
            interpolate: true,
            max_fill_ratio,
        }
    }
}

/// 업스트림 어댑터.
///
/// `get_pricing_raw`는 `native_intervals`에 있는 인터벌만 받습니다.
/// 그 외 인터벌은 `merge_source`가 알려 주는 더 짧은 인터벌을 접어서 만듭니다.
#[async_trait]
pub trait MarketSource: Send + Sync {
    /// 프로바이더 이름 (저장소 이름에 사용).
    fn name(&self) -> &str;

    /// 직접 조회 가능한 인터벌.
    fn native_intervals(&self) -> &[Interval];

    /// 비원시 인터벌을 접어 만들 때 쓰는 더 짧은 인터벌.
    fn merge_source(&self, _interval: Interval) -> Option<Interval> {
        None
    }

    /// 직접 조회 가능한 인터벌인지 확인.
    fn is_native(&self, interval: Interval) -> bool {
        self.native_intervals().contains(&interval)
    }

    /// 원시 봉 조회. 반환하는 봉의 `t`는 업스트림 원본 값입니다.
    async fn get_pricing_raw(
        &self,
        from: f64,
        to: f64,
        security: &Security,
        interval: Interval,
    ) -> ExchangeResult<Vec<Bar>>;

    /// 원시 시각을 캘린더 봉 종료 시각으로 보정합니다. `None`이면 버립니다.
    ///
    /// 기본 규칙은 봉 시작 시각을 받는 업스트림용입니다: `raw`보다 큰 첫 타임스탬프를 고르고,
    /// 그 거리가 인터벌 길이(일봉 이상은 1.5배)를 넘으면 버립니다.
    fn fix_timestamp(&self, raw: f64, interval: Interval, calendar: &WorkCalendar) -> Option<f64> {
        bar_start_to_end(raw, interval, calendar)
    }

    /// 업스트림 지연 (초).
    fn pricing_delay(&self, _security: &Security, _interval: Interval) -> f64 {
        0.0
    }

    /// 인터벌별로 조회 가능한 가장 이른 시각.
    fn interval_start(&self, _interval: Interval, _now: f64) -> f64 {
        0.0
    }

    /// 뉴스 조회.
    async fn get_news(&self, _from: f64, _to: f64, _security: &Security) -> ExchangeResult<Vec<News>> {
        Err(ExchangeError::NotSupported(format!("{} news", self.name())))
    }

    /// 시가총액.
    async fn get_market_cap(&self, _security: &Security) -> ExchangeResult<f64> {
        Err(ExchangeError::NotSupported(format!("{} market cap", self.name())))
    }

    /// 종목 개요.
    async fn get_summary(&self, _security: &Security) -> ExchangeResult<String> {
        Err(ExchangeError::NotSupported(format!("{} summary", self.name())))
    }

    /// 유통 주식 수.
    async fn get_outstanding_parts(&self, _security: &Security) -> ExchangeResult<f64> {
        Err(ExchangeError::NotSupported(format!("{} outstanding parts", self.name())))
    }

    /// 최초 거래 시각.
    async fn get_first_trade_time(&self, _security: &Security) -> ExchangeResult<f64> {
        Err(ExchangeError::NotSupported(format!("{} first trade time", self.name())))
    }
}

/// 봉 시작 시각을 종료 시각으로 옮깁니다.
pub fn bar_start_to_end(raw: f64, interval: Interval, calendar: &WorkCalendar) -> Option<f64> {
    if !raw.is_finite() {
        return None;
    }
    let candidate = calendar.next_timestamp(raw, interval);
    let tolerance = if interval.is_intraday() {
        interval.duration()
    } else {
        1.5 * interval.duration()
    };
    if candidate - raw <= tolerance {
        Some(candidate)
    } else {
        warn!(raw, interval = %interval, candidate, "봉 시각 보정 실패: 버림");
        None
    }
}

/// 시세 조회.
#[async_trait]
pub trait PricingProvider: Send + Sync {
    /// 프로바이더 이름.
    fn name(&self) -> &str;

    /// `(from, to]` 봉 조회. 결과는 시각 오름차순이며 중복이 없습니다.
    async fn get_pricing(
        &self,
        from: f64,
        to: f64,
        security: &Security,
        interval: Interval,
        options: PricingOptions,
    ) -> ExchangeResult<Vec<Bar>>;
}

/// 뉴스 조회.
#[async_trait]
pub trait NewsProvider: Send + Sync {
    /// `(from, to]` 뉴스 조회.
    async fn get_news(&self, from: f64, to: f64, security: &Security) -> ExchangeResult<Vec<News>>;
}

/// 종목 단일 값 조회.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// 시가총액.
    async fn get_market_cap(&self, security: &Security) -> ExchangeResult<f64>;

    /// 종목 개요.
    async fn get_summary(&self, security: &Security) -> ExchangeResult<String>;

    /// 최초 거래 시각.
    async fn get_first_trade_time(&self, security: &Security) -> ExchangeResult<f64>;

    /// 유통 주식 수.
    async fn get_outstanding_parts(&self, security: &Security) -> ExchangeResult<f64>;
}

/// 시세/뉴스/단일 값을 모두 제공하는 프로바이더.
pub trait MarketProvider: PricingProvider + NewsProvider + DataProvider {}

impl<P> MarketProvider for P where P: PricingProvider + NewsProvider + DataProvider {}

#[cfg(test)]
mod tests {
    use super::*;
    use market_core::Security;

    #[test]
    fn test_bar_start_to_end() {
        let calendar = Security::lookup("XNYS", "IBM").unwrap().calendar().unwrap();
        // 2024-01-03 09:30 EST
        let open = 1_704_292_200.0;

        // 시작 시각 → 다음 정각 봉 끝
        assert_eq!(bar_start_to_end(open, Interval::H1, &calendar), Some(open + 3_600.0));
        // 밀리초 오차도 같은 봉
        assert_eq!(bar_start_to_end(open + 0.123, Interval::H1, &calendar), Some(open + 3_600.0));
        // UTC 자정 일봉 → 그날 폐장
        assert_eq!(
            bar_start_to_end(1_704_240_000.0, Interval::D1, &calendar),
            Some(1_704_315_600.0)
        );
        // 폐장 이후 시각은 다음 날 첫 봉과 너무 멀어 버림
        assert_eq!(bar_start_to_end(1_704_315_600.0, Interval::H1, &calendar), None);
        assert_eq!(bar_start_to_end(f64::NAN, Interval::H1, &calendar), None);
    }
}
