//! 프로바이더 에러 타입.

use std::sync::Arc;

use market_core::{CoreError, Interval};
use market_data::DataError;
use thiserror::Error;

/// 프로바이더 관련 에러.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// 요청 한도 초과 (HTTP 429/403)
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// 백오프 대기 중이라 호출하지 않음
    #[error("Backoff pending: {remaining:.1}s remaining")]
    BackoffPending {
        /// 남은 대기 시간 (초)
        remaining: f64,
        /// 백오프를 일으킨 마지막 에러
        #[source]
        last_error: Arc<ExchangeError>,
    },

    /// 백오프 대기 중 조용히 건너뜀
    #[error("Silenced during backoff: {0}")]
    Silenced(String),

    /// 비정상 응답 (2xx 아님)
    #[error("Bad response {status}: {message}")]
    BadResponse { status: u16, message: String },

    /// 지원하지 않는 인터벌
    #[error("Unsupported interval {interval} for {provider}")]
    UnsupportedInterval { provider: String, interval: Interval },

    /// 보간 비율 초과
    #[error("Fill ratio {ratio:.3} exceeds maximum {max:.3}")]
    FillRatioExceeded { ratio: f64, max: f64 },

    /// 저장할 수 없는 봉
    #[error("Invalid bar: {0}")]
    InvalidBar(String),

    /// 지원되지 않는 작업
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// 네트워크/연결 에러
    #[error("Network error: {0}")]
    Network(String),

    /// 타임아웃
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// 파싱/역직렬화 에러
    #[error("Parse error: {0}")]
    Parse(String),

    /// 모든 프로바이더 실패 (마지막 에러 보존)
    #[error("All providers failed: {0}")]
    AllProvidersFailed(#[source] Box<ExchangeError>),

    /// 저장소 에러
    #[error(transparent)]
    Data(#[from] DataError),

    /// 코어 도메인 에러
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// 프로바이더 작업을 위한 Result 타입.
pub type ExchangeResult<T> = Result<T, ExchangeError>;

impl ExchangeError {
    /// 요청 한도 초과인지 확인.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ExchangeError::RateLimited(_))
    }

    /// 작업 미지원인지 확인.
    pub fn is_not_supported(&self) -> bool {
        matches!(self, ExchangeError::NotSupported(_))
    }

    /// 재시도 가능한 에러인지 확인.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExchangeError::Network(_)
                | ExchangeError::Timeout(_)
                | ExchangeError::RateLimited(_)
                | ExchangeError::BackoffPending { .. }
                | ExchangeError::Silenced(_)
        )
    }

    /// 권장 재시도 대기 시간(초).
    pub fn retry_after(&self) -> Option<f64> {
        match self {
            ExchangeError::BackoffPending { remaining, .. } => Some(*remaining),
            ExchangeError::Network(_) => Some(1.0),
            ExchangeError::Timeout(_) => Some(0.5),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExchangeError::Timeout(err.to_string())
        } else if err.is_decode() {
            ExchangeError::Parse(err.to_string())
        } else {
            ExchangeError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(err: serde_json::Error) -> Self {
        ExchangeError::Parse(err.to_string())
    }
}

impl From<csv::Error> for ExchangeError {
    fn from(err: csv::Error) -> Self {
        ExchangeError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_backoff_pending_chains_last_error() {
        let last = Arc::new(ExchangeError::RateLimited("HTTP 429".to_string()));
        let err = ExchangeError::BackoffPending {
            remaining: 12.0,
            last_error: last,
        };

        assert!(err.is_retryable());
        assert_eq!(err.retry_after(), Some(12.0));
        let source = err.source().unwrap();
        assert_eq!(source.to_string(), "Rate limit exceeded: HTTP 429");
    }

    #[test]
    fn test_classification() {
        assert!(ExchangeError::RateLimited(String::new()).is_rate_limited());
        assert!(!ExchangeError::Parse(String::new()).is_retryable());
        assert!(ExchangeError::NotSupported("news".into()).is_not_supported());
        let not_found: ExchangeError = DataError::NotFound("k".into()).into();
        assert!(!not_found.is_retryable());
    }
}
