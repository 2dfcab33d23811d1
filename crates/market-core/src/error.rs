//! 코어 도메인 에러 타입.
//!
//! 캘린더, 거래소 레지스트리, 설정 로딩에서 발생하는 에러를 정의합니다.

use thiserror::Error;

/// 코어 도메인 에러.
#[derive(Debug, Error)]
pub enum CoreError {
    /// 영업일이 아닌 날짜에 대해 세션 시각을 요청함
    #[error("영업일이 아님: {0}")]
    NotWorkday(f64),

    /// 레지스트리에 없는 거래소
    #[error("알 수 없는 거래소: {0}")]
    UnknownExchange(String),

    /// 거래소에 상장되지 않은 종목
    #[error("알 수 없는 종목: {0}")]
    UnknownSecurity(String),

    /// 인터벌 문자열 파싱 실패
    #[error("잘못된 인터벌: {0}")]
    InvalidInterval(String),

    /// 잘못된 입력 (스케줄, 시간 범위 등)
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),

    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),
}

/// 코어 작업을 위한 Result 타입.
pub type CoreResult<T> = Result<T, CoreError>;

impl From<config::ConfigError> for CoreError {
    fn from(err: config::ConfigError) -> Self {
        CoreError::Config(err.to_string())
    }
}
