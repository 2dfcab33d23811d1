//! 작업 캘린더와 봉 시각 정렬.
//!
//! - `WorkSchedule` - 정규 세션, 조기 폐장일, 휴장일
//! - `WorkCalendar` - 시간대 인식 영업일/타임스탬프 판정과 열거
//! - `TimestampCache` - 인터벌별 열거 결과 메모이즈

mod cache;
pub mod holidays;
mod schedule;
mod work;

pub use cache::TimestampCache;
pub use schedule::{parse_hhmm, WorkSchedule, SECS_PER_DAY};
pub use work::{chunk_size, WorkCalendar};
