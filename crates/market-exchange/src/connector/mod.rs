//! 업스트림 어댑터.

pub mod polygon;
pub mod stooq;
pub mod yahoo;

pub use polygon::{PolygonSource, POLYGON_BASE_URL};
pub use stooq::{StooqSource, STOOQ_BASE_URL};
pub use yahoo::{YahooSource, YAHOO_BASE_URL};
