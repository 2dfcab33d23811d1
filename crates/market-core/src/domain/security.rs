//! 종목 정의.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::exchange::Exchange;
use super::registry;
use crate::calendar::WorkCalendar;
use crate::error::{CoreError, CoreResult};

/// 종목 유형.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityKind {
    /// 보통주
    Stock,
    /// 상장지수펀드
    Etf,
    /// 워런트
    Warrant,
    /// 테스트용
    Test,
}

impl fmt::Display for SecurityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecurityKind::Stock => write!(f, "stock"),
            SecurityKind::Etf => write!(f, "etf"),
            SecurityKind::Warrant => write!(f, "warrant"),
            SecurityKind::Test => write!(f, "test"),
        }
    }
}

/// 거래소에 상장된 종목.
///
/// 거래소는 MIC로만 참조하며, 실제 `Exchange`는 레지스트리에서 조회합니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Security {
    /// 종목 코드 (예: AAPL, 005930)
    pub symbol: String,
    /// 표시 이름
    pub name: String,
    /// 종목 유형
    pub kind: SecurityKind,
    /// 상장 거래소 MIC
    pub mic: String,
}

impl Security {
    /// 새 종목을 생성합니다.
    pub fn new(
        symbol: impl Into<String>,
        name: impl Into<String>,
        kind: SecurityKind,
        mic: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into().to_uppercase(),
            name: name.into(),
            kind,
            mic: mic.into().to_uppercase(),
        }
    }

    /// 레지스트리에서 `MIC`/`SYMBOL`로 종목을 찾습니다.
    pub fn lookup(mic: &str, symbol: &str) -> CoreResult<Self> {
        registry::exchange(mic)?.security(symbol)
    }

    /// 상장 거래소.
    pub fn exchange(&self) -> CoreResult<Arc<Exchange>> {
        registry::exchange(&self.mic)
    }

    /// 상장 거래소의 작업 캘린더.
    pub fn calendar(&self) -> CoreResult<Arc<WorkCalendar>> {
        Ok(self.exchange()?.calendar())
    }

    /// 저장소 키 조각 (`MIC_SYMBOL`).
    pub fn key(&self) -> String {
        format!("{}_{}", self.mic, self.symbol)
    }
}

impl fmt::Display for Security {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.mic, self.symbol)
    }
}

impl FromStr for Security {
    type Err = CoreError;

    /// `MIC:SYMBOL` 형식을 레지스트리에서 조회합니다.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (mic, symbol) = s
            .split_once(':')
            .ok_or_else(|| CoreError::InvalidInput(format!("MIC:SYMBOL 형식이 아님: {s}")))?;
        Security::lookup(mic, symbol)
    }
}
