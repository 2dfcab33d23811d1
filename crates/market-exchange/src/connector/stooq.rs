//! Stooq CSV 어댑터.
//!
//! `GET {base}/q/d/l/?s={sym}.us&d1=YYYYMMDD&d2=YYYYMMDD&i=d|w|m`
//!
//! 응답은 `Date,Open,High,Low,Close,Volume` CSV이며 날짜만 있습니다.
//! 날짜는 UTC 자정으로 읽고, 기본 시각 보정이 그날(주/월의 마지막 거래일) 폐장으로 옮깁니다.
//! 데이터가 없으면 본문이 `No data`입니다.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use market_core::{Bar, Interval, Security};
use serde::Deserialize;
use tracing::debug;

use crate::error::{ExchangeError, ExchangeResult};
use crate::http::HttpClient;
use crate::traits::MarketSource;

/// 기본 주소.
pub const STOOQ_BASE_URL: &str = "https://stooq.com";

const NATIVE: [Interval; 3] = [Interval::D1, Interval::W1, Interval::MN1];

/// Stooq 어댑터.
#[derive(Debug, Clone)]
pub struct StooqSource {
    http: HttpClient,
    base_url: String,
}

impl StooqSource {
    /// 기본 주소로 생성.
    pub fn new(http: HttpClient) -> Self {
        Self::with_base_url(http, STOOQ_BASE_URL)
    }

    /// 주소를 지정해 생성.
    pub fn with_base_url(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// 거래소별 Stooq 심볼 (소문자).
    pub fn symbol(security: &Security) -> ExchangeResult<String> {
        let suffix = match security.mic.as_str() {
            "XNYS" | "XNAS" => "us",
            "XETR" => "de",
            other => return Err(ExchangeError::NotSupported(format!("stooq: {other}"))),
        };
        Ok(format!("{}.{}", security.symbol.to_lowercase(), suffix))
    }
}

fn stooq_date(t: f64) -> ExchangeResult<String> {
    DateTime::<Utc>::from_timestamp(t.floor() as i64, 0)
        .map(|dt| dt.format("%Y%m%d").to_string())
        .ok_or_else(|| ExchangeError::Parse(format!("시각 범위 초과: {t}")))
}

/// CSV 본문을 원시 봉으로 읽습니다. `t`는 날짜의 UTC 자정입니다.
fn parse_csv(body: &str) -> ExchangeResult<Vec<Bar>> {
    if body.trim_start().starts_with("No data") {
        return Ok(Vec::new());
    }

    let mut reader = csv::Reader::from_reader(body.as_bytes());
    let mut bars = Vec::new();
    for row in reader.deserialize::<StooqRow>() {
        let row = row?;
        let date = NaiveDate::parse_from_str(&row.date, "%Y-%m-%d")
            .map_err(|e| ExchangeError::Parse(format!("stooq date '{}': {e}", row.date)))?;
        let t = date.and_time(chrono::NaiveTime::MIN).and_utc().timestamp() as f64;
        bars.push(Bar::new(
            t,
            row.open,
            row.high,
            row.low,
            row.close,
            row.volume.unwrap_or(0.0),
        ));
    }
    Ok(bars)
}

#[async_trait]
impl MarketSource for StooqSource {
    fn name(&self) -> &str {
        "stooq"
    }

    fn native_intervals(&self) -> &[Interval] {
        &NATIVE
    }

    async fn get_pricing_raw(
        &self,
        from: f64,
        to: f64,
        security: &Security,
        interval: Interval,
    ) -> ExchangeResult<Vec<Bar>> {
        let code = match interval {
            Interval::D1 => "d",
            Interval::W1 => "w",
            Interval::MN1 => "m",
            other => {
                return Err(ExchangeError::UnsupportedInterval {
                    provider: self.name().to_string(),
                    interval: other,
                })
            }
        };
        let query = [
            ("s", Self::symbol(security)?),
            ("d1", stooq_date(from.max(0.0))?),
            ("d2", stooq_date(to)?),
            ("i", code.to_string()),
        ];
        let body = self
            .http
            .get_text(&format!("{}/q/d/l/", self.base_url), &query)
            .await?;
        let bars = parse_csv(&body)?;
        debug!(symbol = %security.symbol, interval = %interval, count = bars.len(), "Stooq CSV 수신");
        Ok(bars)
    }
}

#[derive(Debug, Deserialize)]
struct StooqRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Open")]
    open: f64,
    #[serde(rename = "High")]
    high: f64,
    #[serde(rename = "Low")]
    low: f64,
    #[serde(rename = "Close")]
    close: f64,
    #[serde(rename = "Volume", default)]
    volume: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_core::SecurityKind;

    #[test]
    fn test_parse_csv() {
        let body = "Date,Open,High,Low,Close,Volume\n\
                    2024-01-02,160.1,162.0,159.5,161.5,4000000\n\
                    2024-01-03,161.0,161.7,160.2,160.9,3500000\n";
        let bars = parse_csv(body).unwrap();
        assert_eq!(bars.len(), 2);
        // 2024-01-02 00:00 UTC
        assert_eq!(bars[0].t, 1_704_153_600.0);
        assert_eq!(bars[1].close, 160.9);
    }

    #[test]
    fn test_parse_csv_without_volume() {
        let body = "Date,Open,High,Low,Close\n2024-01-02,1,2,0.5,1.5\n";
        let bars = parse_csv(body).unwrap();
        assert_eq!(bars[0].volume, 0.0);
    }

    #[test]
    fn test_no_data() {
        assert!(parse_csv("No data").unwrap().is_empty());
        assert!(parse_csv("Date,Open,High,Low,Close\nbad,1,2,3,4\n").is_err());
    }

    #[test]
    fn test_symbol() {
        let ibm = Security::new("IBM", "IBM", SecurityKind::Stock, "XNYS");
        let sap = Security::new("SAP", "SAP SE", SecurityKind::Stock, "XETR");
        let samsung = Security::new("005930", "삼성전자", SecurityKind::Stock, "XKRX");
        assert_eq!(StooqSource::symbol(&ibm).unwrap(), "ibm.us");
        assert_eq!(StooqSource::symbol(&sap).unwrap(), "sap.de");
        assert!(StooqSource::symbol(&samsung).unwrap_err().is_not_supported());
    }

    #[test]
    fn test_stooq_date() {
        assert_eq!(stooq_date(1_704_292_200.0).unwrap(), "20240103");
    }
}
