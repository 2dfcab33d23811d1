//! 시계열 커버리지와 메모리 버퍼.

mod buffer;
mod coverage;

pub use buffer::{SeriesBuffer, TsKey};
pub use coverage::{Coverage, CoverageDelta, Span};
