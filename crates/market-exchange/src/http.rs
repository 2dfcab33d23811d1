//! 업스트림 HTTP 클라이언트.
//!
//! 모든 요청은 호스트별 `BackoffSupervisor`를 거칩니다.
//! - 429/403 → `RateLimited` (감시자가 백오프 처리)
//! - 그 외 2xx 아님 → `BadResponse`
//!
//! 요청/응답 로그 상세도는 `HttpConfig`의 `request_log`/`response_log`로 정합니다.

use std::sync::Arc;
use std::time::Duration;

use market_core::{HttpConfig, HttpLogLevel};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::backoff::BackoffSupervisor;
use crate::error::{ExchangeError, ExchangeResult};

/// 긴 로그에 남기는 본문 최대 길이 (바이트).
const LONG_LOG_LIMIT: usize = 2048;

/// 쿼리 파라미터 목록.
pub type Query<'a> = [(&'a str, String)];

/// 백오프 감시가 붙은 HTTP 클라이언트.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpConfig,
    supervisor: Arc<BackoffSupervisor>,
}

impl HttpClient {
    /// 새 클라이언트 생성.
    pub fn new(config: HttpConfig, supervisor: Arc<BackoffSupervisor>) -> ExchangeResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ExchangeError::Network(format!("HTTP client 생성 실패: {}", e)))?;

        Ok(Self {
            client,
            config,
            supervisor,
        })
    }

    /// 호스트 백오프 감시자.
    pub fn supervisor(&self) -> &Arc<BackoffSupervisor> {
        &self.supervisor
    }

    /// GET 요청 본문을 텍스트로 받습니다.
    ///
    /// 백오프 대기 중 `Silent` 동작이면 `Silenced` 에러를 반환합니다.
    pub async fn get_text(&self, url: &str, query: &Query<'_>) -> ExchangeResult<String> {
        self.supervisor
            .call(|| self.send(url, query))
            .await?
            .ok_or_else(|| ExchangeError::Silenced(self.supervisor.name().to_string()))
    }

    /// GET 요청 본문을 JSON으로 역직렬화합니다.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &Query<'_>,
    ) -> ExchangeResult<T> {
        let body = self.get_text(url, query).await?;
        serde_json::from_str(&body)
            .map_err(|e| ExchangeError::Parse(format!("{}: {}", self.supervisor.name(), e)))
    }

    async fn send(&self, url: &str, query: &Query<'_>) -> ExchangeResult<String> {
        match self.config.request_log {
            HttpLogLevel::None => {}
            HttpLogLevel::Short => debug!(method = "GET", url, "HTTP request"),
            HttpLogLevel::Long => debug!(method = "GET", url, query = ?query, "HTTP request"),
        }

        let response = self.client.get(url).query(query).send().await?;
        let status = response.status();
        let body = response.text().await?;

        match self.config.response_log {
            HttpLogLevel::None => {}
            HttpLogLevel::Short => {
                debug!(url, status = status.as_u16(), bytes = body.len(), "HTTP response")
            }
            HttpLogLevel::Long => debug!(
                url,
                status = status.as_u16(),
                bytes = body.len(),
                body = truncate(&body, LONG_LOG_LIMIT),
                "HTTP response"
            ),
        }

        if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::FORBIDDEN {
            return Err(ExchangeError::RateLimited(format!(
                "{}: HTTP {}",
                self.supervisor.name(),
                status.as_u16()
            )));
        }
        if !status.is_success() {
            return Err(ExchangeError::BadResponse {
                status: status.as_u16(),
                message: truncate(&body, 256).to_string(),
            });
        }
        Ok(body)
    }
}

/// 문자 경계를 지키며 `limit` 바이트 이내로 자릅니다.
fn truncate(text: &str, limit: usize) -> &str {
    if text.len() <= limit {
        return text;
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
