//! Polygon.io REST 어댑터.
//!
//! 미국 거래소(XNYS, XNAS) 종목만 지원합니다.
//!
//! - 집계 봉: `/v2/aggs/ticker/{sym}/range/{mult}/{span}/{from_ms}/{to_ms}` (봉 시작 시각, ms)
//! - 뉴스: `/v2/reference/news`
//! - 종목 상세: `/v3/reference/tickers/{sym}` (시가총액, 개요, 주식 수, 상장일)
//!
//! 원시 인터벌은 1분/5분/일봉이고, 15분/30분/1시간은 5분봉, 주/월봉은 일봉을 접어 만듭니다.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use market_core::{Bar, Interval, News, Security};
use serde::Deserialize;
use tracing::debug;

use crate::error::{ExchangeError, ExchangeResult};
use crate::http::HttpClient;
use crate::traits::MarketSource;

/// 기본 API 주소.
pub const POLYGON_BASE_URL: &str = "https://api.polygon.io";

const NATIVE: [Interval; 3] = [Interval::M1, Interval::M5, Interval::D1];
const SUPPORTED_MICS: [&str; 2] = ["XNYS", "XNAS"];
const HISTORY_SECS: f64 = 2.0 * 365.0 * 86_400.0;
/// 페이지 상한. `next_url`이 끝없이 이어지는 응답 방지.
const MAX_PAGES: usize = 100;

/// Polygon.io 어댑터.
#[derive(Debug, Clone)]
pub struct PolygonSource {
    http: HttpClient,
    api_key: String,
    base_url: String,
}

impl PolygonSource {
    /// 기본 주소로 생성.
    pub fn new(http: HttpClient, api_key: impl Into<String>) -> Self {
        Self::with_base_url(http, api_key, POLYGON_BASE_URL)
    }

    /// 주소를 지정해 생성.
    pub fn with_base_url(
        http: HttpClient,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn check_security(&self, security: &Security) -> ExchangeResult<()> {
        if SUPPORTED_MICS.contains(&security.mic.as_str()) {
            Ok(())
        } else {
            Err(ExchangeError::NotSupported(format!("polygon: {}", security.mic)))
        }
    }

    fn range_of(interval: Interval) -> Option<(u32, &'static str)> {
        match interval {
            Interval::M1 => Some((1, "minute")),
            Interval::M5 => Some((5, "minute")),
            Interval::D1 => Some((1, "day")),
            _ => None,
        }
    }

    async fn ticker_details(&self, security: &Security) -> ExchangeResult<TickerDetails> {
        self.check_security(security)?;
        let url = format!(
            "{}/v3/reference/tickers/{}",
            self.base_url,
            urlencoding::encode(&security.symbol)
        );
        let response: TickerResponse = self
            .http
            .get_json(&url, &[("apiKey", self.api_key.clone())])
            .await?;
        Ok(response.results)
    }
}

fn rfc3339(t: f64) -> ExchangeResult<String> {
    DateTime::<Utc>::from_timestamp(t.floor() as i64, 0)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .ok_or_else(|| ExchangeError::Parse(format!("시각 범위 초과: {t}")))
}

fn missing(field: &str) -> ExchangeError {
    ExchangeError::Parse(format!("polygon ticker: {field} 없음"))
}

#[async_trait]
impl MarketSource for PolygonSource {
    fn name(&self) -> &str {
        "polygon"
    }

    fn native_intervals(&self) -> &[Interval] {
        &NATIVE
    }

    fn merge_source(&self, interval: Interval) -> Option<Interval> {
        match interval {
            Interval::M15 | Interval::M30 | Interval::H1 => Some(Interval::M5),
            Interval::W1 | Interval::MN1 => Some(Interval::D1),
            _ => None,
        }
    }

    async fn get_pricing_raw(
        &self,
        from: f64,
        to: f64,
        security: &Security,
        interval: Interval,
    ) -> ExchangeResult<Vec<Bar>> {
        self.check_security(security)?;
        let (multiplier, span) = Self::range_of(interval).ok_or_else(|| ExchangeError::UnsupportedInterval {
            provider: self.name().to_string(),
            interval,
        })?;

        let mut url = format!(
            "{}/v2/aggs/ticker/{}/range/{}/{}/{}/{}",
            self.base_url,
            urlencoding::encode(&security.symbol),
            multiplier,
            span,
            (from.max(0.0) * 1000.0).floor() as i64,
            (to * 1000.0).ceil() as i64,
        );
        let mut query = vec![
            ("adjusted", "true".to_string()),
            ("sort", "asc".to_string()),
            ("limit", "50000".to_string()),
            ("apiKey", self.api_key.clone()),
        ];

        let mut bars = Vec::new();
        for _ in 0..MAX_PAGES {
            let page: AggsResponse = self.http.get_json(&url, &query).await?;
            bars.extend(page.results.into_iter().map(|agg| {
                Bar::new(agg.t / 1000.0, agg.o, agg.h, agg.l, agg.c, agg.v.unwrap_or(0.0))
            }));
            match page.next_url {
                // next_url에는 커서가 포함되고 키는 빠져 있음
                Some(next) => {
                    url = next;
                    query = vec![("apiKey", self.api_key.clone())];
                }
                None => break,
            }
        }

        debug!(symbol = %security.symbol, interval = %interval, count = bars.len(), "Polygon 집계 수신");
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

    fn interval_start(&self, _interval: Interval, now: f64) -> f64 {
        now - HISTORY_SECS
    }

    async fn get_news(&self, from: f64, to: f64, security: &Security) -> ExchangeResult<Vec<News>> {
        self.check_security(security)?;
        let url = format!("{}/v2/reference/news", self.base_url);
        let query = [
            ("ticker", security.symbol.clone()),
            ("published_utc.gt", rfc3339(from)?),
            ("published_utc.lte", rfc3339(to)?),
            ("order", "asc".to_string()),
            ("limit", "1000".to_string()),
            ("apiKey", self.api_key.clone()),
        ];
        let response: NewsResponse = self.http.get_json(&url, &query).await?;

        let mut news: Vec<News> = response
            .results
            .into_iter()
            .filter_map(|article| {
                let t = DateTime::parse_from_rfc3339(&article.published_utc).ok()?.timestamp() as f64;
                Some(News::new(t, article.title, article.description.unwrap_or_default()))
            })
            .filter(|n| from < n.t && n.t <= to)
            .collect();
        news.sort_by(|a, b| a.t.total_cmp(&b.t));
        Ok(news)
    }

    async fn get_market_cap(&self, security: &Security) -> ExchangeResult<f64> {
        self.ticker_details(security)
            .await?
            .market_cap
            .ok_or_else(|| missing("market_cap"))
    }

    async fn get_summary(&self, security: &Security) -> ExchangeResult<String> {
        self.ticker_details(security)
            .await?
            .description
            .ok_or_else(|| missing("description"))
    }

    async fn get_outstanding_parts(&self, security: &Security) -> ExchangeResult<f64> {
        self.ticker_details(security)
            .await?
            .share_class_shares_outstanding
            .ok_or_else(|| missing("share_class_shares_outstanding"))
    }

    /// 상장일 개장 시각.
    async fn get_first_trade_time(&self, security: &Security) -> ExchangeResult<f64> {
        let list_date = self
            .ticker_details(security)
            .await?
            .list_date
            .ok_or_else(|| missing("list_date"))?;
        let date = NaiveDate::parse_from_str(&list_date, "%Y-%m-%d")
            .map_err(|e| ExchangeError::Parse(format!("list_date '{list_date}': {e}")))?;
        let calendar = security.calendar()?;
        Ok(calendar.local_instant(date, calendar.schedule().open()))
    }
}

// ==================== 응답 타입 ====================

#[derive(Debug, Deserialize)]
struct AggsResponse {
    #[serde(default)]
    results: Vec<Agg>,
    next_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Agg {
    t: f64,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    v: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    results: Vec<NewsArticle>,
}

#[derive(Debug, Deserialize)]
struct NewsArticle {
    published_utc: String,
    title: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TickerResponse {
    results: TickerDetails,
}

#[derive(Debug, Deserialize)]
struct TickerDetails {
    market_cap: Option<f64>,
    description: Option<String>,
    share_class_shares_outstanding: Option<f64>,
    list_date: Option<String>,
}
