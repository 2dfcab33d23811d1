//! 값 코덱.
//!
//! - `JsonCodec` - 선언된 스키마 타입으로 디코딩하는 계약 코덱 (태그 없음)
//! - `TaggedCodec` - 닫힌 값 집합(`Value`)을 명시적 타입 태그와 함께 인코딩
//!
//! 저장소 백엔드는 `Arc<dyn Codec<T>>`를 받아 값을 문자열로 보관합니다.

mod value;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use value::{TaggedCodec, Value};

/// 값 ↔ 문자열 변환기.
pub trait Codec<T>: Send + Sync {
    /// 값을 문자열로 인코딩합니다.
    fn encode(&self, value: &T) -> Result<String>;

    /// 문자열에서 값을 디코딩합니다.
    fn decode(&self, text: &str) -> Result<T>;
}

/// serde 스키마 기반 JSON 코덱.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl<T> Codec<T> for JsonCodec
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &T) -> Result<String> {
        Ok(serde_json::to_string(value)?)
    }

    fn decode(&self, text: &str) -> Result<T> {
        Ok(serde_json::from_str(text)?)
    }
}

/// 기록 시각이 붙은 스칼라 캐시 항목.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stamped<T> {
    /// 캐시된 값
    pub value: T,
    /// 기록 시각 (Unix 초)
    pub written_at: f64,
}

impl<T> Stamped<T> {
    /// 새 항목.
    pub fn new(value: T, written_at: f64) -> Self {
        Self { value, written_at }
    }

    /// `now` 기준 `ttl`초가 지났는지 확인합니다.
    pub fn is_expired(&self, now: f64, ttl: f64) -> bool {
        now - self.written_at > ttl
    }
}
