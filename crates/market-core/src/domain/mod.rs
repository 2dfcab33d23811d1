//! 종목과 거래소 도메인 모델.

mod exchange;
pub mod registry;
mod security;

pub use exchange::Exchange;
pub use security::{Security, SecurityKind};
