//! 요청 한도 백오프 감시자.
//!
//! 업스트림 호스트 하나당 인스턴스 하나를 두고 모든 호출자가 공유합니다.
//!
//! # 동작
//!
//! ```text
//! 호출 ──[대기 창 안]──> Sleep: 남은 시간 대기 후 진행
//!   │                   Reraise: BackoffPending { remaining }
//!   │                   Silent: Ok(None)
//!   │
//!   └──[대기 창 밖]──> timeout = 직전 timeout × factor (없으면 base)
//!                        │
//!                 RateLimited ──> (now, 에러, timeout) 기록 후 동작 선택
//!                 그 외 에러  ──> 상태 변경 없이 전파
//!                 성공        ──> timeout 초기화
//! ```
//!
//! 상태는 호스트별 잠금 아래에서만 갱신되며, 업스트림 호출 중에는 잠금을 잡지 않습니다.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use market_core::{BackoffBehaviour, BackoffConfig, SharedClock};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{ExchangeError, ExchangeResult};

/// 감시자 내부 상태.
#[derive(Debug, Default)]
struct BackoffState {
    last_failure_at: Option<f64>,
    last_error: Option<Arc<ExchangeError>>,
    last_timeout: Option<f64>,
}

impl BackoffState {
    /// 대기 창 안이면 남은 시간.
    fn remaining(&self, now: f64) -> Option<f64> {
        let failed_at = self.last_failure_at?;
        let timeout = self.last_timeout?;
        let remaining = failed_at + timeout - now;
        (remaining > 0.0).then_some(remaining)
    }
}

/// 호스트별 백오프 감시자.
#[derive(Debug)]
pub struct BackoffSupervisor {
    /// 호스트 이름 (로깅 및 메트릭용)
    name: String,
    config: BackoffConfig,
    clock: SharedClock,
    state: Mutex<BackoffState>,
    /// 백오프 진입 횟수
    trips: AtomicU64,
    /// 대기 창 때문에 막힌 호출 수
    blocked: AtomicU64,
}

impl BackoffSupervisor {
    /// 새 감시자 생성.
    pub fn new(name: impl Into<String>, config: BackoffConfig, clock: SharedClock) -> Self {
        Self {
            name: name.into(),
            config,
            clock,
            state: Mutex::new(BackoffState::default()),
            trips: AtomicU64::new(0),
            blocked: AtomicU64::new(0),
        }
    }

    /// 공유 핸들로 생성.
    pub fn shared(name: impl Into<String>, config: BackoffConfig, clock: SharedClock) -> Arc<Self> {
        Arc::new(Self::new(name, config, clock))
    }

    /// 호스트 이름.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 대기 중 동작.
    pub fn behaviour(&self) -> BackoffBehaviour {
        self.config.behaviour
    }

    /// `op`를 감시하며 호출합니다.
    ///
    /// `Silent` 동작에서 대기 중이면 `Ok(None)`을 반환합니다.
    pub async fn call<T, F, Fut>(&self, op: F) -> ExchangeResult<Option<T>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = ExchangeResult<T>>,
    {
        // Sleep 동작으로 대기를 마쳤으면 시계를 다시 확인하지 않음
        let mut waited = false;

        loop {
            let timeout = {
                let mut state = self.state.lock().await;
                if !waited {
                    if let Some(remaining) = state.remaining(self.clock.now()) {
                        self.blocked.fetch_add(1, Ordering::Relaxed);
                        match self.config.behaviour {
                            BackoffBehaviour::Sleep => {
                                drop(state);
                                debug!(supervisor = %self.name, remaining, "Backoff: sleeping");
                                sleep_secs(remaining).await;
                                waited = true;
                                continue;
                            }
                            BackoffBehaviour::Reraise => {
                                return Err(self.pending(&state, remaining));
                            }
                            BackoffBehaviour::Silent => {
                                debug!(supervisor = %self.name, remaining, "Backoff: silenced");
                                return Ok(None);
                            }
                        }
                    }
                }

                state.last_failure_at = None;
                state.last_error = None;
                match state.last_timeout {
                    Some(last) => last * self.config.backoff_factor,
                    None => self.config.base_timeout_secs,
                }
            };

            match op().await {
                Ok(value) => {
                    self.state.lock().await.last_timeout = None;
                    return Ok(Some(value));
                }
                Err(err) if err.is_rate_limited() => {
                    let err = Arc::new(err);
                    {
                        let mut state = self.state.lock().await;
                        state.last_failure_at = Some(self.clock.now());
                        state.last_error = Some(Arc::clone(&err));
                        state.last_timeout = Some(timeout);
                    }
                    self.trips.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        supervisor = %self.name,
                        timeout,
                        error = %err,
                        "Rate limited: backing off"
                    );

                    match self.config.behaviour {
                        BackoffBehaviour::Sleep => {
                            sleep_secs(timeout).await;
                            waited = true;
                        }
                        BackoffBehaviour::Reraise => {
                            return Err(ExchangeError::BackoffPending {
                                remaining: timeout,
                                last_error: err,
                            });
                        }
                        BackoffBehaviour::Silent => return Ok(None),
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn pending(&self, state: &BackoffState, remaining: f64) -> ExchangeError {
        let last_error = state.last_error.clone().unwrap_or_else(|| {
            Arc::new(ExchangeError::RateLimited(self.name.clone()))
        });
        ExchangeError::BackoffPending {
            remaining,
            last_error,
        }
    }

    /// 수동으로 상태 초기화.
    pub async fn reset(&self) {
        *self.state.lock().await = BackoffState::default();
        tracing::info!(supervisor = %self.name, "Backoff state manually reset");
    }

    /// 메트릭 반환.
    pub async fn metrics(&self) -> BackoffMetrics {
        let state = self.state.lock().await;
        BackoffMetrics {
            name: self.name.clone(),
            trips: self.trips.load(Ordering::Relaxed),
            blocked: self.blocked.load(Ordering::Relaxed),
            last_timeout: state.last_timeout,
            remaining: state.remaining(self.clock.now()),
        }
    }
}

/// 백오프 감시자 메트릭.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffMetrics {
    /// 호스트 이름
    pub name: String,
    /// 백오프 진입 횟수
    pub trips: u64,
    /// 대기 창 때문에 막힌 호출 수
    pub blocked: u64,
    /// 마지막 대기 시간 (초)
    pub last_timeout: Option<f64>,
    /// 현재 남은 대기 시간 (초)
    pub remaining: Option<f64>,
}

async fn sleep_secs(secs: f64) {
    if secs.is_finite() && secs > 0.0 {
        tokio::time::sleep(Duration::from_secs_f64(secs)).await;
    }
}
