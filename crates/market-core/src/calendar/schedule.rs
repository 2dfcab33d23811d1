//! 거래소 정규 세션과 예외일 정의.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// 하루의 초.
pub const SECS_PER_DAY: u32 = 86_400;

/// 정규 개장/폐장 시각과 조기 폐장일, 휴장일.
///
/// 시각은 현지 자정 기준 초로 보관합니다. 폐장 `86400`은 다음 날 자정(24:00)을 뜻합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkSchedule {
    open: u32,
    close: u32,
    #[serde(default)]
    early_closes: BTreeMap<NaiveDate, u32>,
    #[serde(default)]
    holidays: BTreeSet<NaiveDate>,
}

impl WorkSchedule {
    /// 개장/폐장 시각(자정 기준 초)으로 스케줄을 만듭니다.
    pub fn new(open: u32, close: u32) -> CoreResult<Self> {
        if open >= close || close > SECS_PER_DAY {
            return Err(CoreError::InvalidInput(format!(
                "잘못된 세션 시간: open={open}, close={close}"
            )));
        }
        Ok(Self {
            open,
            close,
            early_closes: BTreeMap::new(),
            holidays: BTreeSet::new(),
        })
    }

    /// `HH:MM` 형식으로 스케줄을 만듭니다. 폐장에는 `24:00`을 쓸 수 있습니다.
    pub fn from_hours(open: &str, close: &str) -> CoreResult<Self> {
        Self::new(parse_hhmm(open)?, parse_hhmm(close)?)
    }

    /// 휴장일을 추가합니다.
    pub fn with_holidays(mut self, dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.holidays.extend(dates);
        self
    }

    /// 조기 폐장일을 추가합니다.
    ///
    /// 폐장 시각이 개장 이전이거나 정규 폐장 이후인 항목은 거부합니다.
    pub fn with_early_closes(
        mut self,
        closes: impl IntoIterator<Item = (NaiveDate, u32)>,
    ) -> CoreResult<Self> {
        for (date, close) in closes {
            if close <= self.open || close > self.close {
                return Err(CoreError::InvalidInput(format!(
                    "잘못된 조기 폐장: {date} {close}"
                )));
            }
            self.early_closes.insert(date, close);
        }
        Ok(self)
    }

    /// 정규 개장 (자정 기준 초).
    pub fn open(&self) -> u32 {
        self.open
    }

    /// 정규 폐장 (자정 기준 초).
    pub fn close(&self) -> u32 {
        self.close
    }

    /// 정규 세션 길이 (초).
    pub fn session_secs(&self) -> u32 {
        self.close - self.open
    }

    /// 해당 날짜의 폐장 (조기 폐장 반영).
    pub fn close_on(&self, date: NaiveDate) -> u32 {
        self.early_closes.get(&date).copied().unwrap_or(self.close)
    }

    /// 휴장일 여부.
    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }

    /// 휴장일 목록.
    pub fn holidays(&self) -> impl Iterator<Item = &NaiveDate> + '_ {
        self.holidays.iter()
    }

    /// 조기 폐장일 목록.
    pub fn early_closes(&self) -> impl Iterator<Item = (&NaiveDate, &u32)> + '_ {
        self.early_closes.iter()
    }
}

/// `HH:MM` → 자정 기준 초.
pub fn parse_hhmm(s: &str) -> CoreResult<u32> {
    if s == "24:00" {
        return Ok(SECS_PER_DAY);
    }
    NaiveTime::parse_from_str(s, "%H:%M")
        .map(|t| t.num_seconds_from_midnight())
        .map_err(|e| CoreError::InvalidInput(format!("시각 파싱 실패 '{s}': {e}")))
}
