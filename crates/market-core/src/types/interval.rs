//! 봉 간격(인터벌) 정의.
//!
//! 인터벌은 실제 길이 순으로 전순서를 가집니다 (`M1 < M5 < ... < MN1`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// 하루의 초 단위 길이.
pub const DAY_SECS: f64 = 86_400.0;

/// 봉 간격.
///
/// 선언 순서가 곧 길이 순서이므로 `Ord` 파생으로 비교합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    /// 1분봉
    M1,
    /// 5분봉
    M5,
    /// 15분봉
    M15,
    /// 30분봉
    M30,
    /// 1시간봉
    H1,
    /// 일봉
    D1,
    /// 주봉
    W1,
    /// 월봉
    MN1,
}

impl Interval {
    /// 모든 인터벌 (짧은 것부터).
    pub const ALL: [Interval; 8] = [
        Interval::M1,
        Interval::M5,
        Interval::M15,
        Interval::M30,
        Interval::H1,
        Interval::D1,
        Interval::W1,
        Interval::MN1,
    ];

    /// 인터벌 길이 (초).
    pub fn duration(&self) -> f64 {
        match self {
            Interval::M1 => 60.0,
            Interval::M5 => 5.0 * 60.0,
            Interval::M15 => 15.0 * 60.0,
            Interval::M30 => 30.0 * 60.0,
            Interval::H1 => 60.0 * 60.0,
            Interval::D1 => DAY_SECS,
            Interval::W1 => 7.0 * DAY_SECS,
            Interval::MN1 => 30.0 * DAY_SECS, // 근사값
        }
    }

    /// 분봉/시간봉인지 확인합니다.
    pub fn is_intraday(&self) -> bool {
        *self < Interval::D1
    }

    /// 짧은 문자열 코드.
    pub fn code(&self) -> &'static str {
        match self {
            Interval::M1 => "1m",
            Interval::M5 => "5m",
            Interval::M15 => "15m",
            Interval::M30 => "30m",
            Interval::H1 => "1h",
            Interval::D1 => "1d",
            Interval::W1 => "1w",
            Interval::MN1 => "1mo",
        }
    }

    /// 문자열 코드에서 파싱합니다.
    pub fn from_code(s: &str) -> Option<Self> {
        Interval::ALL.into_iter().find(|i| i.code() == s)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Interval {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| CoreError::InvalidInterval(s.to_string()))
    }
}
