//! 구독자 설치.
//!
//! 라이브러리 코드는 `tracing` 매크로만 쓰고, 애플리케이션이 시작할 때
//! `[logging]` 설정으로 한 번 `init_logging`을 호출합니다.
//! `RUST_LOG`가 있으면 설정의 레벨보다 우선합니다.

use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;
use crate::error::{CoreError, CoreResult};

/// 로그 출력 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// 여러 줄, 개발용
    #[default]
    Pretty,
    /// 로그 수집용
    Json,
    /// 한 줄
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            other => Err(CoreError::Config(format!("알 수 없는 로그 형식: {other}"))),
        }
    }
}

fn env_filter(level: &str) -> CoreResult<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| CoreError::Config(format!("잘못된 로그 레벨 '{level}': {e}")))
}

/// 전역 구독자를 설치합니다.
///
/// 형식이나 레벨이 잘못됐거나 이미 구독자가 설치돼 있으면 `CoreError::Config`.
pub fn init_logging(settings: &LoggingConfig) -> CoreResult<()> {
    let format: LogFormat = settings.format.parse()?;
    let filter = env_filter(&settings.level)?;

    let layer = match format {
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Json => fmt::layer().json().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .map_err(|e| CoreError::Config(format!("로깅 초기화 실패: {e}")))?;

    info!(format = ?format, level = %settings.level, "Logging initialized");
    Ok(())
}
