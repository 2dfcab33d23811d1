//! 거래소 정의.

use std::sync::Arc;

use super::security::{Security, SecurityKind};
use crate::calendar::WorkCalendar;
use crate::error::{CoreError, CoreResult};

/// 거래소: MIC, 이름, 작업 캘린더, 상장 종목.
#[derive(Debug, Clone)]
pub struct Exchange {
    mic: String,
    name: String,
    calendar: Arc<WorkCalendar>,
    listings: Vec<Security>,
}

impl Exchange {
    /// 새 거래소를 생성합니다.
    pub fn new(mic: impl Into<String>, name: impl Into<String>, calendar: WorkCalendar) -> Self {
        Self {
            mic: mic.into().to_uppercase(),
            name: name.into(),
            calendar: Arc::new(calendar),
            listings: Vec::new(),
        }
    }

    /// 상장 종목을 추가합니다.
    pub fn with_listing(
        mut self,
        symbol: impl Into<String>,
        name: impl Into<String>,
        kind: SecurityKind,
    ) -> Self {
        let security = Security::new(symbol, name, kind, self.mic.clone());
        self.listings.push(security);
        self
    }

    /// MIC 코드.
    pub fn mic(&self) -> &str {
        &self.mic
    }

    /// 표시 이름.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 작업 캘린더.
    pub fn calendar(&self) -> Arc<WorkCalendar> {
        Arc::clone(&self.calendar)
    }

    /// 상장 종목 목록.
    pub fn securities(&self) -> &[Security] {
        &self.listings
    }

    /// 종목 코드로 상장 종목을 찾습니다.
    pub fn security(&self, symbol: &str) -> CoreResult<Security> {
        self.listings
            .iter()
            .find(|s| s.symbol.eq_ignore_ascii_case(symbol))
            .cloned()
            .ok_or_else(|| CoreError::UnknownSecurity(format!("{}:{}", self.mic, symbol)))
    }
}
