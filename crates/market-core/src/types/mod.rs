//! 시스템 전반에서 사용되는 공통 타입.

mod bar;
mod interval;

pub use bar::*;
pub use interval::*;
