//! Yahoo Finance 차트 어댑터.
//!
//! # 엔드포인트
//!
//! `GET {base}/v8/finance/chart/{symbol}`
//!
//! | 파라미터 | 값 |
//! |---|---|
//! | `period1`, `period2` | Unix 초 |
//! | `interval` | `1m`, `5m`, `15m`, `30m`, `60m`, `1d`, `1wk`, `1mo` |
//! | `includePrePost` | `false` |
//!
//! 응답: `chart.result[0]`에 `meta`, `timestamp[]`, `indicators.quote[0].{open,high,low,close,volume}[]`.
//! 값 배열에는 `null`이 섞일 수 있으며 해당 봉은 버립니다. 시각은 봉 시작 기준이고,
//! 60분봉은 개장 시각(예: 09:30)에 정렬되어 있습니다.
//!
//! 심볼 접미사: XETR → `.DE`, XKRX → `.KS`.

use async_trait::async_trait;
use market_core::{Bar, Interval, Security};
use serde::Deserialize;
use tracing::debug;

use crate::error::{ExchangeError, ExchangeResult};
use crate::http::HttpClient;
use crate::traits::MarketSource;

/// 기본 API 주소.
pub const YAHOO_BASE_URL: &str = "https://query2.finance.yahoo.com";

const NATIVE: [Interval; 8] = Interval::ALL;
const DAY: f64 = 86_400.0;

/// Yahoo Finance 어댑터.
#[derive(Debug, Clone)]
pub struct YahooSource {
    http: HttpClient,
    base_url: String,
}

impl YahooSource {
    /// 기본 주소로 생성.
    pub fn new(http: HttpClient) -> Self {
        Self::with_base_url(http, YAHOO_BASE_URL)
    }

    /// 주소를 지정해 생성 (테스트용 목 서버 등).
    pub fn with_base_url(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// 거래소별 Yahoo 심볼.
    pub fn symbol(security: &Security) -> String {
        match security.mic.as_str() {
            "XETR" => format!("{}.DE", security.symbol),
            "XKRX" => format!("{}.KS", security.symbol),
            _ => security.symbol.clone(),
        }
    }

    fn interval_code(interval: Interval) -> &'static str {
        match interval {
            Interval::M1 => "1m",
            Interval::M5 => "5m",
            Interval::M15 => "15m",
            Interval::M30 => "30m",
            Interval::H1 => "60m",
            Interval::D1 => "1d",
            Interval::W1 => "1wk",
            Interval::MN1 => "1mo",
        }
    }

    async fn chart(&self, security: &Security, query: &[(&str, String)]) -> ExchangeResult<ChartResult> {
        let url = format!(
            "{}/v8/finance/chart/{}",
            self.base_url,
            urlencoding::encode(&Self::symbol(security))
        );
        let response: ChartResponse = self.http.get_json(&url, query).await?;

        if let Some(error) = response.chart.error {
            return Err(ExchangeError::BadResponse {
                status: 200,
                message: format!("{}: {}", error.code, error.description),
            });
        }
        response
            .chart
            .result
            .and_then(|mut results| (!results.is_empty()).then(|| results.swap_remove(0)))
            .ok_or_else(|| ExchangeError::Parse("yahoo chart: 결과 없음".to_string()))
    }
}

#[async_trait]
impl MarketSource for YahooSource {
    fn name(&self) -> &str {
        "yahoo"
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
        let query = [
            ("period1", (from.floor().max(0.0) as i64).to_string()),
            ("period2", (to.ceil() as i64).to_string()),
            ("interval", Self::interval_code(interval).to_string()),
            ("includePrePost", "false".to_string()),
        ];
        let result = self.chart(security, &query).await?;
        let bars = result.bars();
        debug!(symbol = %security.symbol, interval = %interval, count = bars.len(), "Yahoo 차트 수신");
        Ok(bars)
    }

    /// 일중 봉은 15분 지연.
    fn pricing_delay(&self, _security: &Security, interval: Interval) -> f64 {
        if interval.is_intraday() {
            15.0 * 60.0
        } else {
            0.0
        }
    }

    /// 일중 데이터는 최근 기간만 제공됩니다.
    fn interval_start(&self, interval: Interval, now: f64) -> f64 {
        match interval {
            Interval::M1 => now - 29.0 * DAY,
            Interval::M5 | Interval::M15 | Interval::M30 => now - 59.0 * DAY,
            Interval::H1 => now - 729.0 * DAY,
            _ => 0.0,
        }
    }

    async fn get_first_trade_time(&self, security: &Security) -> ExchangeResult<f64> {
        let query = [("range", "1d".to_string()), ("interval", "1d".to_string())];
        let result = self.chart(security, &query).await?;
        result
            .meta
            .and_then(|meta| meta.first_trade_date)
            .map(|t| t as f64)
            .ok_or_else(|| ExchangeError::Parse("yahoo chart: firstTradeDate 없음".to_string()))
    }
}

// ==================== 응답 타입 ====================

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: Option<ChartMeta>,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Option<Indicators>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    first_trade_date: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

impl ChartResult {
    /// 원시 봉 목록. `null` 값은 NaN이 되어 이후 유효성 검사에서 버려집니다.
    fn bars(&self) -> Vec<Bar> {
        let Some(quote) = self.indicators.as_ref().and_then(|i| i.quote.first()) else {
            return Vec::new();
        };
        let at = |values: &[Option<f64>], i: usize| values.get(i).copied().flatten().unwrap_or(f64::NAN);

        self.timestamp
            .iter()
            .enumerate()
            .map(|(i, t)| {
                Bar::new(
                    *t as f64,
                    at(&quote.open, i),
                    at(&quote.high, i),
                    at(&quote.low, i),
                    at(&quote.close, i),
                    at(&quote.volume, i),
                )
            })
            .collect()
    }
}
