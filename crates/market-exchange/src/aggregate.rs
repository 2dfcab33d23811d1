//! 여러 프로바이더를 하나로 묶는 집계 프로바이더.
//!
//! # 시세 폴백
//!
//! 기본 프로바이더가 실패하면, 일봉 이하 인터벌이고 창의 끝이 최근 구간
//! (`now - live_time_frame` 이후)에 걸칠 때만 폴백합니다.
//!
//! ```text
//! from ────────────── cut ────────── to
//!      기본 프로바이더      폴백 목록 (순서대로, 첫 성공)
//! ```
//!
//! 단일 값과 뉴스는 프로바이더를 순서대로 시도하고, 모두 실패하면 마지막 에러를
//! `AllProvidersFailed`로 감싸 반환합니다. `NotSupported`는 다른 에러를 덮어쓰지 않습니다.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use market_core::{AppConfig, Bar, CoreError, Interval, News, Security, SharedClock};
use market_data::StorageFactory;
use tracing::{debug, info, instrument, warn};

use crate::backoff::BackoffSupervisor;
use crate::connector::{PolygonSource, StooqSource, YahooSource};
use crate::engine::CachedProvider;
use crate::error::{ExchangeError, ExchangeResult};
use crate::http::HttpClient;
use crate::traits::{
    DataProvider, MarketProvider, NewsProvider, PricingOptions, PricingProvider,
};

/// 기본 최근 구간 (4일).
pub const DEFAULT_LIVE_TIME_FRAME: f64 = 4.0 * 86_400.0;

/// 집계 프로바이더.
pub struct AggregateProvider {
    primary: Arc<dyn MarketProvider>,
    fallbacks: Vec<Arc<dyn MarketProvider>>,
    live_time_frame: f64,
    clock: SharedClock,
}

impl AggregateProvider {
    /// 폴백 없이 생성.
    pub fn new(primary: Arc<dyn MarketProvider>, clock: SharedClock) -> Self {
        Self {
            primary,
            fallbacks: Vec::new(),
            live_time_frame: DEFAULT_LIVE_TIME_FRAME,
            clock,
        }
    }

    /// 폴백 프로바이더 추가 (추가한 순서대로 시도).
    pub fn with_fallback(mut self, provider: Arc<dyn MarketProvider>) -> Self {
        self.fallbacks.push(provider);
        self
    }

    /// 최근 구간 길이 (초).
    pub fn with_live_time_frame(mut self, secs: f64) -> Self {
        self.live_time_frame = secs;
        self
    }

    /// 설정에서 프로바이더를 구성합니다.
    ///
    /// 프로바이더마다 별도의 백오프 감시자와 HTTP 클라이언트를 둡니다.
    /// 지원 이름: `yahoo`, `polygon` (API 키 필요), `stooq`.
    ///
    /// ```no_run
    /// use market_core::{init_logging, AppConfig, SystemClock};
    /// use market_data::StorageFactory;
    /// use market_exchange::AggregateProvider;
    ///
    /// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = AppConfig::load("config/market.toml")?;
    /// init_logging(&config.logging)?;
    ///
    /// let storage = StorageFactory::from_config(&config.storage).await?;
    /// let _provider = AggregateProvider::from_config(&config, &storage, SystemClock::shared()).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn from_config(
        config: &AppConfig,
        factory: &StorageFactory,
        clock: SharedClock,
    ) -> ExchangeResult<Self> {
        let providers = &config.providers;
        let primary = build_provider(&providers.primary, config, factory, &clock).await?;

        let mut aggregate =
            Self::new(primary, clock.clone()).with_live_time_frame(providers.live_time_frame);
        for name in &providers.fallbacks {
            let fallback = build_provider(name, config, factory, &clock).await?;
            aggregate = aggregate.with_fallback(fallback);
        }

        info!(
            primary = %providers.primary,
            fallbacks = ?providers.fallbacks,
            live_time_frame = providers.live_time_frame,
            "집계 프로바이더 구성"
        );
        Ok(aggregate)
    }

    /// 기본 프로바이더.
    pub fn primary(&self) -> &Arc<dyn MarketProvider> {
        &self.primary
    }

    /// 폴백 프로바이더 목록.
    pub fn fallbacks(&self) -> &[Arc<dyn MarketProvider>] {
        &self.fallbacks
    }

    fn providers(&self) -> impl Iterator<Item = &Arc<dyn MarketProvider>> + '_ {
        std::iter::once(&self.primary).chain(self.fallbacks.iter())
    }

    /// 여러 `(종목, 인터벌)`을 동시에 조회합니다. 결과는 요청 순서입니다.
    pub async fn get_pricing_many(
        &self,
        requests: &[(Security, Interval)],
        from: f64,
        to: f64,
        options: PricingOptions,
    ) -> Vec<ExchangeResult<Vec<Bar>>> {
        join_all(
            requests
                .iter()
                .map(|(security, interval)| self.get_pricing(from, to, security, *interval, options)),
        )
        .await
    }
}

async fn build_provider(
    name: &str,
    config: &AppConfig,
    factory: &StorageFactory,
    clock: &SharedClock,
) -> ExchangeResult<Arc<dyn MarketProvider>> {
    let http = || -> ExchangeResult<HttpClient> {
        let supervisor = BackoffSupervisor::shared(name, config.backoff.clone(), clock.clone());
        HttpClient::new(config.http.clone(), supervisor)
    };
    let ttl = config.providers.scalar_ttl_secs;

    let provider: Arc<dyn MarketProvider> = match name {
        "yahoo" => Arc::new(
            CachedProvider::with_factory(YahooSource::new(http()?), factory, clock.clone(), ttl).await?,
        ),
        "polygon" => {
            let api_key = config.providers.polygon_api_key.clone().ok_or_else(|| {
                CoreError::Config("polygon 프로바이더에는 providers.polygon_api_key가 필요합니다".to_string())
            })?;
            Arc::new(
                CachedProvider::with_factory(
                    PolygonSource::new(http()?, api_key),
                    factory,
                    clock.clone(),
                    ttl,
                )
                .await?,
            )
        }
        "stooq" => Arc::new(
            CachedProvider::with_factory(StooqSource::new(http()?), factory, clock.clone(), ttl).await?,
        ),
        other => {
            return Err(CoreError::Config(format!("알 수 없는 프로바이더: {other}")).into());
        }
    };
    Ok(provider)
}

/// 순차 시도 중 실패 기록. `NotSupported`는 이전의 실제 에러를 덮지 않습니다.
fn record_failure(last: &mut Option<ExchangeError>, provider: &str, what: &str, error: ExchangeError) {
    if error.is_not_supported() {
        debug!(provider, what, "미지원: 다음 프로바이더");
    } else {
        warn!(provider, what, error = %error, "프로바이더 실패: 다음 프로바이더");
    }
    if last.is_none() || !error.is_not_supported() {
        *last = Some(error);
    }
}

fn exhausted(last: Option<ExchangeError>, what: &str) -> ExchangeError {
    let last = last.unwrap_or_else(|| ExchangeError::NotSupported(what.to_string()));
    ExchangeError::AllProvidersFailed(Box::new(last))
}

#[async_trait]
impl PricingProvider for AggregateProvider {
    fn name(&self) -> &str {
        "aggregate"
    }

    #[instrument(skip(self, security, options), fields(security = %security))]
    async fn get_pricing(
        &self,
        from: f64,
        to: f64,
        security: &Security,
        interval: Interval,
        options: PricingOptions,
    ) -> ExchangeResult<Vec<Bar>> {
        let error = match self
            .primary
            .get_pricing(from, to, security, interval, options)
            .await
        {
            Ok(bars) => return Ok(bars),
            Err(e) => e,
        };

        let cut = self.clock.now() - self.live_time_frame;
        if interval > Interval::D1 || to <= cut || self.fallbacks.is_empty() {
            return Err(error);
        }
        warn!(
            provider = %self.primary.name(),
            error = %error,
            cut,
            "기본 프로바이더 실패: 최근 구간을 폴백으로 조회"
        );

        let mut bars = if from < cut {
            self.primary
                .get_pricing(from, cut, security, interval, options)
                .await?
        } else {
            Vec::new()
        };

        let tail_from = from.max(cut);
        let mut last = error;
        for fallback in &self.fallbacks {
            match fallback
                .get_pricing(tail_from, to, security, interval, options)
                .await
            {
                Ok(tail) => {
                    debug!(provider = %fallback.name(), count = tail.len(), "폴백 성공");
                    bars.extend(tail);
                    return Ok(bars);
                }
                Err(e) => {
                    warn!(provider = %fallback.name(), error = %e, "폴백 실패");
                    last = e;
                }
            }
        }
        Err(ExchangeError::AllProvidersFailed(Box::new(last)))
    }
}

#[async_trait]
impl NewsProvider for AggregateProvider {
    async fn get_news(&self, from: f64, to: f64, security: &Security) -> ExchangeResult<Vec<News>> {
        let mut last = None;
        for provider in self.providers() {
            match provider.get_news(from, to, security).await {
                Ok(news) => return Ok(news),
                Err(e) => record_failure(&mut last, provider.name(), "news", e),
            }
        }
        Err(exhausted(last, "news"))
    }
}

#[async_trait]
impl DataProvider for AggregateProvider {
    async fn get_market_cap(&self, security: &Security) -> ExchangeResult<f64> {
        let mut last = None;
        for provider in self.providers() {
            match provider.get_market_cap(security).await {
                Ok(value) => return Ok(value),
                Err(e) => record_failure(&mut last, provider.name(), "market_cap", e),
            }
        }
        Err(exhausted(last, "market_cap"))
    }

    async fn get_summary(&self, security: &Security) -> ExchangeResult<String> {
        let mut last = None;
        for provider in self.providers() {
            match provider.get_summary(security).await {
                Ok(value) => return Ok(value),
                Err(e) => record_failure(&mut last, provider.name(), "summary", e),
            }
        }
        Err(exhausted(last, "summary"))
    }

    async fn get_first_trade_time(&self, security: &Security) -> ExchangeResult<f64> {
        let mut last = None;
        for provider in self.providers() {
            match provider.get_first_trade_time(security).await {
                Ok(value) => return Ok(value),
                Err(e) => record_failure(&mut last, provider.name(), "first_trade_time", e),
            }
        }
        Err(exhausted(last, "first_trade_time"))
    }

    async fn get_outstanding_parts(&self, security: &Security) -> ExchangeResult<f64> {
        let mut last = None;
        for provider in self.providers() {
            match provider.get_outstanding_parts(security).await {
                Ok(value) => return Ok(value),
                Err(e) => record_failure(&mut last, provider.name(), "outstanding_parts", e),
            }
        }
        Err(exhausted(last, "outstanding_parts"))
    }
}
