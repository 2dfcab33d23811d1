//! 시장 데이터 프로바이더.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - 업스트림 어댑터 (Yahoo Finance, Polygon.io, Stooq)
//! - 호스트별 rate limit 백오프 감시자
//! - 캐시가 붙은 프로바이더: 시각 보정, 인터벌 접기, 격자 보간
//! - 폴백 집계 프로바이더

pub mod aggregate;
pub mod backoff;
pub mod connector;
pub mod engine;
pub mod error;
pub mod http;
pub mod traits;

pub use aggregate::{AggregateProvider, DEFAULT_LIVE_TIME_FRAME};
pub use backoff::{BackoffMetrics, BackoffSupervisor};
pub use connector::{PolygonSource, StooqSource, YahooSource};
pub use engine::{fold_bars, interpolate, CachedProvider, ProviderStores, ScalarCtx, ScalarField, SeriesCtx};
pub use error::*;
pub use http::HttpClient;
pub use traits::*;
