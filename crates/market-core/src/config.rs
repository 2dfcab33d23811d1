//! 설정 관리.
//!
//! 기본값 → TOML 파일 → 환경 변수(`MARKET__SECTION__KEY`) 순으로 덮어씁니다.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::CoreResult;

/// 환경 변수 접두사.
pub const ENV_PREFIX: &str = "MARKET";

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// 저장소 설정
    pub storage: StorageConfig,
    /// 프로바이더 설정
    pub providers: ProvidersConfig,
    /// HTTP 설정
    pub http: HttpConfig,
    /// 백오프 설정
    pub backoff: BackoffConfig,
    /// 로깅 설정
    pub logging: LoggingConfig,
    /// 모델 설정 (코어에서는 사용하지 않음)
    pub models: ModelsConfig,
}

/// 저장소 백엔드 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageLocation {
    /// 폴더 (키당 파일)
    #[default]
    Folder,
    /// SQLite 데이터베이스
    Db,
    /// 프로세스 메모리
    Memory,
}

/// 저장소 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// 백엔드 종류
    pub location: StorageLocation,
    /// 폴더 백엔드 루트
    pub folder_path: PathBuf,
    /// SQLite 파일 경로
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            location: StorageLocation::Folder,
            folder_path: PathBuf::from("./data/cache"),
            db_path: PathBuf::from("./data/cache.db"),
        }
    }
}

/// 프로바이더 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// 최근 구간 폴백 분할 기준 (초)
    pub live_time_frame: f64,
    /// 기본 프로바이더 이름
    pub primary: String,
    /// 폴백 프로바이더 이름 (순서대로)
    pub fallbacks: Vec<String>,
    /// Polygon API 키
    pub polygon_api_key: Option<String>,
    /// 스칼라 캐시 TTL (초)
    pub scalar_ttl_secs: f64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            live_time_frame: 4.0 * 86_400.0,
            primary: "yahoo".to_string(),
            fallbacks: vec!["stooq".to_string()],
            polygon_api_key: None,
            scalar_ttl_secs: 86_400.0,
        }
    }
}

/// HTTP 로그 상세도.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpLogLevel {
    /// 기록 안 함
    #[default]
    None,
    /// 메서드/URL 또는 상태/크기
    Short,
    /// 쿼리와 본문까지
    Long,
}

/// HTTP 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// 요청 로그
    pub request_log: HttpLogLevel,
    /// 응답 로그
    pub response_log: HttpLogLevel,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// User-Agent 헤더
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_log: HttpLogLevel::None,
            response_log: HttpLogLevel::None,
            timeout_secs: 30,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
        }
    }
}

/// 백오프 중 호출 동작.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffBehaviour {
    /// 남은 시간만큼 대기 후 진행
    Sleep,
    /// 대기 중 에러 반환
    #[default]
    Reraise,
    /// 빈 결과 반환
    Silent,
}

/// 백오프 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// 최초 대기 (초)
    pub base_timeout_secs: f64,
    /// 연속 실패 시 배수
    pub backoff_factor: f64,
    /// 대기 중 동작
    pub behaviour: BackoffBehaviour,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_timeout_secs: 60.0,
            backoff_factor: 2.0,
            behaviour: BackoffBehaviour::Reraise,
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// 모델 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// 배치 크기
    pub batch_size: usize,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self { batch_size: 32 }
    }
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let builder = config::Config::builder()
            // 기본값으로 시작
            .add_source(config::Config::try_from(&AppConfig::default())?)
            // 파일에서 로드
            .add_source(config::File::from(path.as_ref()).required(false))
            // 환경 변수로 오버라이드
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> CoreResult<Self> {
        Self::load("config/default.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.storage.location, StorageLocation::Folder);
        assert_eq!(config.providers.live_time_frame, 345_600.0);
        assert_eq!(config.http.request_log, HttpLogLevel::None);
        assert_eq!(config.backoff.behaviour, BackoffBehaviour::Reraise);
        assert!(config.http.user_agent.starts_with("Mozilla/5.0"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[storage]
location = "db"
db_path = "/tmp/market.db"

[http]
request_log = "long"

[backoff]
behaviour = "silent"
base_timeout_secs = 5.0
"#
        )
        .unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.storage.location, StorageLocation::Db);
        assert_eq!(config.storage.db_path, PathBuf::from("/tmp/market.db"));
        assert_eq!(config.http.request_log, HttpLogLevel::Long);
        assert_eq!(config.http.response_log, HttpLogLevel::None);
        assert_eq!(config.backoff.behaviour, BackoffBehaviour::Silent);
        assert_eq!(config.backoff.base_timeout_secs, 5.0);
        // 파일에 없는 값은 기본값
        assert_eq!(config.backoff.backoff_factor, 2.0);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = AppConfig::load("/nonexistent/market.toml").unwrap();
        assert_eq!(config.models.batch_size, 32);
    }
}
