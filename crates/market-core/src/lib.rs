//! # Market Core
//!
//! 시세 캐시 계층의 핵심 도메인 모델과 시간 연산을 제공합니다.
//!
//! - 봉 간격, OHLCV 봉, 뉴스 항목
//! - 종목/거래소 정의와 전역 거래소 레지스트리
//! - 시간대 인식 작업 캘린더와 봉 시각 정렬
//! - 커버리지 구간 대수와 메모리 시계열 버퍼
//! - 주입 가능한 시계, 방향성 이진 탐색
//! - 설정 관리와 로깅 초기화

pub mod calendar;
pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod search;
pub mod series;
pub mod types;

pub use calendar::{WorkCalendar, WorkSchedule};
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use search::{binary_search, search_value, Side};
pub use series::{Coverage, CoverageDelta, SeriesBuffer, Span, TsKey};
pub use types::*;
