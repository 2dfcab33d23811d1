//! OHLCV 봉 및 뉴스 항목.
//!
//! - `Bar` - 봉 종료 시각 `t`와 OHLCV 값
//! - `News` - 발행 시각과 제목/본문
//! - `Timestamped` - 시계열 저장소가 항목의 시각을 꺼내는 trait

use serde::{Deserialize, Serialize};

/// 시계열 항목의 시각 추출자.
pub trait Timestamped {
    /// 항목의 Unix 시각 (초).
    fn timestamp(&self) -> f64;
}

impl Timestamped for f64 {
    fn timestamp(&self) -> f64 {
        *self
    }
}

/// OHLCV 봉.
///
/// `t`는 거래소 현지 시간 기준 **봉의 종료 시각**을 Unix 시각으로 나타낸 값입니다.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// 봉 종료 시각
    pub t: f64,
    /// 시가
    pub open: f64,
    /// 고가
    pub high: f64,
    /// 저가
    pub low: f64,
    /// 종가
    pub close: f64,
    /// 거래량
    pub volume: f64,
}

impl Bar {
    /// 새 봉을 생성합니다.
    pub fn new(t: f64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            t,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// 모든 값이 같은 봉 (테스트/보간용).
    pub fn flat(t: f64, price: f64, volume: f64) -> Self {
        Self::new(t, price, price, price, price, volume)
    }

    /// 저장 가능한 봉인지 확인합니다 (`t > 0`, NaN/무한대 없음).
    pub fn is_valid(&self) -> bool {
        self.t > 0.0
            && self.t.is_finite()
            && [self.open, self.high, self.low, self.close, self.volume]
                .iter()
                .all(|v| v.is_finite())
    }

    /// 더 엄격한 검사: 음수 없음, `low <= {open, close} <= high`.
    pub fn is_consistent(&self) -> bool {
        self.is_valid()
            && self.low >= 0.0
            && self.volume >= 0.0
            && self.low <= self.open.min(self.close)
            && self.open.max(self.close) <= self.high
    }

    /// 분할 조정된 봉을 반환합니다. 가격은 `factor`배, 거래량은 `1/factor`배.
    pub fn adjusted(&self, factor: f64) -> Self {
        Self {
            t: self.t,
            open: self.open * factor,
            high: self.high * factor,
            low: self.low * factor,
            close: self.close * factor,
            volume: self.volume / factor,
        }
    }
}

impl Timestamped for Bar {
    fn timestamp(&self) -> f64 {
        self.t
    }
}

/// 주식 분할 이벤트. `ratio`가 2이면 1주가 2주가 됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Split {
    /// 분할 효력 시각
    pub t: f64,
    /// 분할 비율
    pub ratio: f64,
}

/// 분할 이전 봉들을 분할 이후 기준으로 조정합니다.
pub fn adjust_for_splits(bars: &[Bar], splits: &[Split]) -> Vec<Bar> {
    bars.iter()
        .map(|bar| {
            let factor = splits
                .iter()
                .filter(|s| s.ratio > 0.0 && bar.t < s.t)
                .fold(1.0, |acc, s| acc / s.ratio);
            if factor == 1.0 {
                *bar
            } else {
                bar.adjusted(factor)
            }
        })
        .collect()
}

/// 뉴스 항목. 시각 외의 내용은 불투명하게 다룹니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct News {
    /// 발행 시각
    pub t: f64,
    /// 제목
    pub title: String,
    /// 본문 또는 요약
    pub body: String,
}

impl News {
    /// 새 뉴스 항목을 생성합니다.
    pub fn new(t: f64, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            t,
            title: title.into(),
            body: body.into(),
        }
    }
}

impl Timestamped for News {
    fn timestamp(&self) -> f64 {
        self.t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_validity() {
        assert!(Bar::new(1.0, 1.0, 2.0, 0.5, 1.5, 10.0).is_valid());
        assert!(!Bar::new(0.0, 1.0, 2.0, 0.5, 1.5, 10.0).is_valid());
        assert!(!Bar::new(1.0, f64::NAN, 2.0, 0.5, 1.5, 10.0).is_valid());
        assert!(!Bar::new(1.0, 1.0, f64::INFINITY, 0.5, 1.5, 10.0).is_valid());
    }

    #[test]
    fn test_bar_consistency() {
        assert!(Bar::new(1.0, 1.0, 2.0, 0.5, 1.5, 10.0).is_consistent());
        // 종가가 고가보다 큼
        assert!(!Bar::new(1.0, 1.0, 2.0, 0.5, 2.5, 10.0).is_consistent());
        assert!(!Bar::new(1.0, 1.0, 2.0, 0.5, 1.5, -1.0).is_consistent());
    }

    #[test]
    fn test_split_adjustment() {
        let bars = vec![Bar::flat(10.0, 100.0, 50.0), Bar::flat(30.0, 50.0, 100.0)];
        let adjusted = adjust_for_splits(&bars, &[Split { t: 20.0, ratio: 2.0 }]);

        assert_eq!(adjusted[0].close, 50.0);
        assert_eq!(adjusted[0].volume, 100.0);
        // 분할 이후 봉은 그대로
        assert_eq!(adjusted[1], bars[1]);
    }
}
