//! 캐시가 붙은 프로바이더.
//!
//! `CachedProvider`는 `MarketSource` 하나를 감싸 소비자용 trait을 구현합니다.
//!
//! # 시세 조회 흐름
//!
//! 1. 조회 시작을 `interval_start`로 자름
//! 2. `(종목, 인터벌)` 키로 `CachedSeries`를 거쳐 미커버 구간만 업스트림 조회
//!    - 원시 인터벌: 원시 봉 → 유효성 검사 → 시각 보정 → 창 필터 → 정렬/중복 제거
//!    - 그 외: 더 짧은 인터벌을 같은 캐시로 받아 접기
//! 3. 보간 옵션이 있으면 캘린더 격자에 맞춤
//!
//! 단일 값(시가총액 등)은 태그 코덱 키-값 저장소에 TTL로 캐시합니다.

mod fold;
mod interpolate;

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use market_core::{Bar, Interval, News, Security, SharedClock, WorkCalendar};
use market_data::{
    CachedScalar, CachedSeries, KeyValueStore, SeriesPolicy, SeriesStore, Stamped, StorageFactory,
    TaggedCodec, Value,
};
use tracing::{debug, instrument, warn};

use crate::error::{ExchangeError, ExchangeResult};
use crate::traits::{DataProvider, MarketSource, NewsProvider, PricingOptions, PricingProvider};

pub use fold::fold_bars;
pub use interpolate::interpolate;

/// 일중 인터벌 캐시 청크 (1일).
const INTRADAY_CHUNK: f64 = 86_400.0;
/// 일봉 이상 캐시 청크 (365일).
const DAILY_CHUNK: f64 = 365.0 * 86_400.0;
/// 뉴스 캐시 청크 (30일).
const NEWS_CHUNK: f64 = 30.0 * 86_400.0;
/// 뉴스 라이브 꼬리 갱신 주기 (1시간).
const NEWS_REFRESH: f64 = 3_600.0;

/// 시세 캐시 컨텍스트.
#[derive(Debug, Clone)]
pub struct SeriesCtx {
    /// 종목
    pub security: Security,
    /// 인터벌
    pub interval: Interval,
    /// 종목 거래소 캘린더
    pub calendar: Arc<WorkCalendar>,
}

impl SeriesCtx {
    /// 종목의 캘린더를 조회해 컨텍스트를 만듭니다.
    pub fn new(security: &Security, interval: Interval) -> ExchangeResult<Self> {
        Ok(Self {
            security: security.clone(),
            interval,
            calendar: security.calendar()?,
        })
    }

    /// 같은 종목의 다른 인터벌.
    pub fn with_interval(&self, interval: Interval) -> Self {
        Self {
            interval,
            ..self.clone()
        }
    }

    /// 저장 키 (`MIC_SYMBOL_인터벌`).
    pub fn key(&self) -> String {
        format!("{}_{}", self.security.key(), self.interval.code())
    }
}

/// 캐시되는 단일 값 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarField {
    /// 시가총액
    MarketCap,
    /// 종목 개요
    Summary,
    /// 최초 거래 시각
    FirstTradeTime,
    /// 유통 주식 수
    OutstandingParts,
}

impl ScalarField {
    fn code(&self) -> &'static str {
        match self {
            ScalarField::MarketCap => "market_cap",
            ScalarField::Summary => "summary",
            ScalarField::FirstTradeTime => "first_trade_time",
            ScalarField::OutstandingParts => "outstanding_parts",
        }
    }
}

/// 단일 값 캐시 컨텍스트.
#[derive(Debug, Clone)]
pub struct ScalarCtx {
    /// 종목
    pub security: Security,
    /// 값 종류
    pub field: ScalarField,
}

/// 프로바이더가 쓰는 저장소 묶음.
#[derive(Clone)]
pub struct ProviderStores {
    /// 시세 시계열
    pub pricing: Arc<dyn SeriesStore<Bar>>,
    /// 뉴스 시계열
    pub news: Arc<dyn SeriesStore<News>>,
    /// 단일 값 (태그 코덱)
    pub scalars: Arc<dyn KeyValueStore<Stamped<Value>>>,
}

impl ProviderStores {
    /// 팩토리에서 `<이름>_pricing`, `<이름>_news`, `<이름>_scalars` 저장소를 엽니다.
    pub async fn open(factory: &StorageFactory, name: &str) -> ExchangeResult<Self> {
        Ok(Self {
            pricing: factory.series_store(&format!("{name}_pricing")).await?,
            news: factory.series_store(&format!("{name}_news")).await?,
            scalars: factory
                .kv_store_with_codec::<Stamped<Value>>(&format!("{name}_scalars"), Arc::new(TaggedCodec))
                .await?,
        })
    }
}

/// 캐시가 붙은 프로바이더.
pub struct CachedProvider<S> {
    source: Arc<S>,
    pricing: CachedSeries<Bar, SeriesCtx>,
    news: CachedSeries<News, Security>,
    scalars: CachedScalar<Value, ScalarCtx>,
    clock: SharedClock,
}

impl<S> CachedProvider<S>
where
    S: MarketSource + 'static,
{
    /// 새 프로바이더.
    ///
    /// `scalar_ttl`은 시가총액/개요/주식 수의 캐시 유효 시간(초)입니다.
    /// 최초 거래 시각은 만료되지 않습니다.
    pub fn new(source: S, stores: ProviderStores, clock: SharedClock, scalar_ttl: f64) -> Self {
        let source = Arc::new(source);

        let delay_source = Arc::clone(&source);
        let pricing_policy = SeriesPolicy::with_store(SeriesCtx::key, stores.pricing)
            .chunk_size(|ctx: &SeriesCtx| {
                Some(if ctx.interval.is_intraday() {
                    INTRADAY_CHUNK
                } else {
                    DAILY_CHUNK
                })
            })
            .live_delay(move |ctx: &SeriesCtx| delay_source.pricing_delay(&ctx.security, ctx.interval))
            .should_refresh(|start, end, ctx: &SeriesCtx| {
                ctx.calendar.next_timestamp(start, ctx.interval) <= end
            });

        let news_policy = SeriesPolicy::with_store(|security: &Security| security.key(), stores.news)
            .fixed_chunk(NEWS_CHUNK)
            .should_refresh(|start, end, _: &Security| end - start >= NEWS_REFRESH);

        let scalars = CachedScalar::new(
            stores.scalars,
            |ctx: &ScalarCtx| format!("{}_{}", ctx.security.key(), ctx.field.code()),
            move |ctx: &ScalarCtx| match ctx.field {
                ScalarField::FirstTradeTime => f64::INFINITY,
                _ => scalar_ttl,
            },
            clock.clone(),
        );

        Self {
            source,
            pricing: CachedSeries::new(pricing_policy, clock.clone()),
            news: CachedSeries::new(news_policy, clock.clone()),
            scalars,
            clock,
        }
    }

    /// 팩토리 저장소로 프로바이더를 만듭니다.
    pub async fn with_factory(
        source: S,
        factory: &StorageFactory,
        clock: SharedClock,
        scalar_ttl: f64,
    ) -> ExchangeResult<Self> {
        let stores = ProviderStores::open(factory, source.name()).await?;
        Ok(Self::new(source, stores, clock, scalar_ttl))
    }

    /// 감싼 어댑터.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// 시세 캐시 (통계 확인용).
    pub fn pricing_cache(&self) -> &CachedSeries<Bar, SeriesCtx> {
        &self.pricing
    }

    /// 캐시를 거쳐 `(from, to]` 봉을 받습니다.
    async fn cached_pricing(&self, from: f64, to: f64, ctx: &SeriesCtx) -> ExchangeResult<Vec<Bar>> {
        self.pricing
            .get(from, to, ctx, |start, end| self.fetch_pricing(start, end, ctx))
            .await
    }

    /// 미커버 구간 `(start, end]`를 업스트림에서 채웁니다.
    fn fetch_pricing<'a>(
        &'a self,
        start: f64,
        end: f64,
        ctx: &'a SeriesCtx,
    ) -> BoxFuture<'a, ExchangeResult<Vec<Bar>>> {
        Box::pin(async move {
            if self.source.is_native(ctx.interval) {
                // 봉 시작 시각을 주는 업스트림을 위해 한 봉 앞에서부터 요청
                let raw = self
                    .source
                    .get_pricing_raw(
                        start - ctx.interval.duration(),
                        end,
                        &ctx.security,
                        ctx.interval,
                    )
                    .await?;
                return Ok(self.normalize(raw, start, end, ctx));
            }

            let fine = self.source.merge_source(ctx.interval).ok_or_else(|| {
                ExchangeError::UnsupportedInterval {
                    provider: self.source.name().to_string(),
                    interval: ctx.interval,
                }
            })?;

            // 첫 긴 봉을 채우려면 그 이전 긴 봉 시각부터 짧은 봉이 필요
            let first = ctx.calendar.next_timestamp(start, ctx.interval);
            let fine_from = ctx.calendar.add_intervals(first, ctx.interval, -1).min(start);
            let fine_ctx = ctx.with_interval(fine);
            let fine_bars = self.cached_pricing(fine_from, end, &fine_ctx).await?;

            let folded = fold_bars(&fine_bars, fine, ctx.interval, &ctx.calendar, start, end);
            debug!(
                key = %ctx.key(),
                fine = %fine,
                fine_count = fine_bars.len(),
                count = folded.len(),
                "짧은 인터벌 접기"
            );
            Ok(folded)
        })
    }

    /// 원시 봉을 검사/보정하고 `(start, end]`로 자릅니다.
    fn normalize(&self, raw: Vec<Bar>, start: f64, end: f64, ctx: &SeriesCtx) -> Vec<Bar> {
        let mut bars: Vec<Bar> = raw
            .into_iter()
            .filter_map(|bar| {
                if !bar.is_valid() {
                    warn!(provider = %self.source.name(), key = %ctx.key(), ?bar, "유효하지 않은 봉: 버림");
                    return None;
                }
                let t = self.source.fix_timestamp(bar.t, ctx.interval, &ctx.calendar)?;
                Some(Bar { t, ..bar })
            })
            .filter(|bar| start < bar.t && bar.t <= end)
            .collect();

        bars.sort_by(|a, b| a.t.total_cmp(&b.t));
        // 같은 시각은 마지막 봉 유지
        bars.reverse();
        bars.dedup_by(|later, earlier| later.t == earlier.t);
        bars.reverse();
        bars
    }

    async fn cached_scalar<F, Fut>(
        &self,
        security: &Security,
        field: ScalarField,
        fetch: F,
    ) -> ExchangeResult<Value>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = ExchangeResult<Value>>,
    {
        let ctx = ScalarCtx {
            security: security.clone(),
            field,
        };
        self.scalars.get(&ctx, fetch).await
    }
}

#[async_trait]
impl<S> PricingProvider for CachedProvider<S>
where
    S: MarketSource + 'static,
{
    fn name(&self) -> &str {
        self.source.name()
    }

    #[instrument(skip(self, security, options), fields(provider = %self.source.name(), security = %security))]
    async fn get_pricing(
        &self,
        from: f64,
        to: f64,
        security: &Security,
        interval: Interval,
        options: PricingOptions,
    ) -> ExchangeResult<Vec<Bar>> {
        let ctx = SeriesCtx::new(security, interval)?;
        if !ctx.calendar.has_sessions(interval) {
            return Ok(Vec::new());
        }
        let from = from.max(self.source.interval_start(interval, self.clock.now()));
        if from >= to {
            return Ok(Vec::new());
        }

        let bars = self.cached_pricing(from, to, &ctx).await?;
        if !options.interpolate {
            return Ok(bars);
        }

        // 아직 닫히지 않은 봉은 격자에서 제외
        let horizon = self.clock.now() - self.source.pricing_delay(security, interval);
        let grid = ctx.calendar.get_timestamps(from, to.min(horizon), interval);
        interpolate(&bars, &grid, options.max_fill_ratio)
    }
}

#[async_trait]
impl<S> NewsProvider for CachedProvider<S>
where
    S: MarketSource + 'static,
{
    async fn get_news(&self, from: f64, to: f64, security: &Security) -> ExchangeResult<Vec<News>> {
        self.news
            .get(from, to, security, |start, end| {
                self.source.get_news(start, end, security)
            })
            .await
    }
}

#[async_trait]
impl<S> DataProvider for CachedProvider<S>
where
    S: MarketSource + 'static,
{
    async fn get_market_cap(&self, security: &Security) -> ExchangeResult<f64> {
        let value = self
            .cached_scalar(security, ScalarField::MarketCap, move || async move {
                self.source.get_market_cap(security).await.map(Value::Float)
            })
            .await?;
        as_f64(value, ScalarField::MarketCap)
    }

    async fn get_summary(&self, security: &Security) -> ExchangeResult<String> {
        let value = self
            .cached_scalar(security, ScalarField::Summary, move || async move {
                self.source.get_summary(security).await.map(Value::Str)
            })
            .await?;
        match value {
            Value::Str(summary) => Ok(summary),
            other => Err(ExchangeError::Parse(format!("summary 캐시 값 형식 오류: {other:?}"))),
        }
    }

    async fn get_first_trade_time(&self, security: &Security) -> ExchangeResult<f64> {
        let value = self
            .cached_scalar(security, ScalarField::FirstTradeTime, move || async move {
                self.source.get_first_trade_time(security).await.map(Value::Float)
            })
            .await?;
        as_f64(value, ScalarField::FirstTradeTime)
    }

    async fn get_outstanding_parts(&self, security: &Security) -> ExchangeResult<f64> {
        let value = self
            .cached_scalar(security, ScalarField::OutstandingParts, move || async move {
                self.source.get_outstanding_parts(security).await.map(Value::Float)
            })
            .await?;
        as_f64(value, ScalarField::OutstandingParts)
    }
}

fn as_f64(value: Value, field: ScalarField) -> ExchangeResult<f64> {
    value
        .as_f64()
        .ok_or_else(|| ExchangeError::Parse(format!("{} 캐시 값 형식 오류: {value:?}", field.code())))
}
