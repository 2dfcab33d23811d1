//! 태그 기반 값 코덱.
//!
//! 원시 값(null, bool, 정수, 유한 실수, 문자열)은 JSON 그대로,
//! 그 외 값은 `{"$type": <태그>, "$value": <내용>}` 형태로 인코딩합니다.
//! 컨테이너는 재귀적으로 인코딩되며, 열거형은 이름으로, 날짜는 ISO 문자열로,
//! 경로는 문자열로 기록됩니다.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use market_core::{Bar, Interval, News, SecurityKind};
use serde_json::{json, Map as JsonMap, Value as Json};

use super::{Codec, Stamped};
use crate::error::{DataError, Result};

const TYPE_KEY: &str = "$type";
const VALUE_KEY: &str = "$value";

/// 캐시에 저장되는 닫힌 값 집합.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// 값 없음
    Null,
    /// 불리언
    Bool(bool),
    /// 정수
    Int(i64),
    /// 실수 (NaN/무한대 포함)
    Float(f64),
    /// 문자열
    Str(String),
    /// 날짜
    Date(NaiveDate),
    /// UTC 시각
    DateTime(DateTime<Utc>),
    /// 파일 경로
    Path(PathBuf),
    /// 봉 간격
    Interval(Interval),
    /// 종목 유형
    SecurityKind(SecurityKind),
    /// 순서 있는 목록
    List(Vec<Value>),
    /// 문자열 키 맵
    Map(BTreeMap<String, Value>),
    /// 집합 (삽입 순서 유지, 중복 없음)
    Set(Vec<Value>),
    /// 봉 하나
    Bar(Bar),
    /// 봉 목록
    Bars(Vec<Bar>),
    /// 뉴스 하나
    News(News),
    /// 뉴스 목록
    NewsList(Vec<News>),
    /// 기록 시각이 붙은 값
    Stamped(Box<Value>, f64),
}

impl Value {
    /// 중복을 제거한 집합 값을 만듭니다.
    pub fn set(items: impl IntoIterator<Item = Value>) -> Self {
        let mut unique: Vec<Value> = Vec::new();
        for item in items {
            if !unique.contains(&item) {
                unique.push(item);
            }
        }
        Value::Set(unique)
    }

    /// 태그 이름. 원시 값은 `None`.
    pub fn type_tag(&self) -> Option<&'static str> {
        match self {
            Value::Null | Value::Bool(_) | Value::Int(_) | Value::Str(_) => None,
            Value::Float(f) if f.is_finite() => None,
            Value::Float(_) => Some("float"),
            Value::Date(_) => Some("date"),
            Value::DateTime(_) => Some("datetime"),
            Value::Path(_) => Some("path"),
            Value::Interval(_) => Some("interval"),
            Value::SecurityKind(_) => Some("security_kind"),
            Value::List(_) => Some("list"),
            Value::Map(_) => Some("map"),
            Value::Set(_) => Some("set"),
            Value::Bar(_) => Some("bar"),
            Value::Bars(_) => Some("bars"),
            Value::News(_) => Some("news"),
            Value::NewsList(_) => Some("news_list"),
            Value::Stamped(..) => Some("stamped"),
        }
    }

    /// 실수로 읽습니다 (정수 포함).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// 문자열로 읽습니다.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// 봉 목록으로 읽습니다.
    pub fn as_bars(&self) -> Option<&[Bar]> {
        match self {
            Value::Bars(bars) => Some(bars),
            _ => None,
        }
    }

    /// JSON 트리로 변환합니다.
    pub fn to_json(&self) -> Result<Json> {
        let content = match self {
            Value::Null => return Ok(Json::Null),
            Value::Bool(b) => return Ok(Json::Bool(*b)),
            Value::Int(i) => return Ok(Json::from(*i)),
            Value::Str(s) => return Ok(Json::String(s.clone())),
            Value::Float(f) => match serde_json::Number::from_f64(*f) {
                Some(n) => return Ok(Json::Number(n)),
                None => Json::String(non_finite_name(*f).to_string()),
            },
            Value::Date(d) => Json::String(d.format("%Y-%m-%d").to_string()),
            Value::DateTime(dt) => Json::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::Path(p) => Json::String(p.to_string_lossy().into_owned()),
            Value::Interval(i) => serde_json::to_value(i)?,
            Value::SecurityKind(k) => serde_json::to_value(k)?,
            Value::List(items) | Value::Set(items) => Json::Array(
                items
                    .iter()
                    .map(Value::to_json)
                    .collect::<Result<Vec<_>>>()?,
            ),
            Value::Map(map) => {
                let mut out = JsonMap::new();
                for (k, v) in map {
                    out.insert(k.clone(), v.to_json()?);
                }
                Json::Object(out)
            }
            Value::Bar(bar) => serde_json::to_value(bar)?,
            Value::Bars(bars) => serde_json::to_value(bars)?,
            Value::News(news) => serde_json::to_value(news)?,
            Value::NewsList(news) => serde_json::to_value(news)?,
            Value::Stamped(value, written_at) => json!({
                "value": value.to_json()?,
                "written_at": written_at,
            }),
        };

        let tag = self
            .type_tag()
            .ok_or_else(|| DataError::InvalidData("원시 값에 태그 없음".to_string()))?;
        let mut tagged = JsonMap::new();
        tagged.insert(TYPE_KEY.to_string(), Json::String(tag.to_string()));
        tagged.insert(VALUE_KEY.to_string(), content);
        Ok(Json::Object(tagged))
    }

    /// JSON 트리에서 값을 복원합니다.
    pub fn from_json(json: Json) -> Result<Self> {
        match json {
            Json::Null => Ok(Value::Null),
            Json::Bool(b) => Ok(Value::Bool(b)),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Ok(Value::Int(i)),
                None => n
                    .as_f64()
                    .map(Value::Float)
                    .ok_or_else(|| DataError::InvalidData(format!("숫자 변환 실패: {n}"))),
            },
            Json::String(s) => Ok(Value::Str(s)),
            Json::Array(_) => Err(DataError::InvalidData(
                "태그 없는 배열은 지원하지 않음".to_string(),
            )),
            Json::Object(mut obj) => {
                let tag = match obj.remove(TYPE_KEY) {
                    Some(Json::String(tag)) => tag,
                    _ => {
                        return Err(DataError::InvalidData(
                            "$type 태그가 없는 객체".to_string(),
                        ))
                    }
                };
                let content = obj.remove(VALUE_KEY).unwrap_or(Json::Null);
                Self::from_tagged(&tag, content)
            }
        }
    }

    fn from_tagged(tag: &str, content: Json) -> Result<Self> {
        let value = match tag {
            "float" => {
                let name = expect_str(content)?;
                Value::Float(parse_non_finite(&name)?)
            }
            "date" => {
                let text = expect_str(content)?;
                let date = NaiveDate::parse_from_str(&text, "%Y-%m-%d")
                    .map_err(|e| DataError::InvalidData(format!("날짜 파싱 실패: {e}")))?;
                Value::Date(date)
            }
            "datetime" => {
                let text = expect_str(content)?;
                let dt = DateTime::parse_from_rfc3339(&text)
                    .map_err(|e| DataError::InvalidData(format!("시각 파싱 실패: {e}")))?;
                Value::DateTime(dt.with_timezone(&Utc))
            }
            "path" => Value::Path(PathBuf::from(expect_str(content)?)),
            "interval" => Value::Interval(serde_json::from_value(content)?),
            "security_kind" => Value::SecurityKind(serde_json::from_value(content)?),
            "list" | "set" => {
                let items = match content {
                    Json::Array(items) => items
                        .into_iter()
                        .map(Value::from_json)
                        .collect::<Result<Vec<_>>>()?,
                    other => {
                        return Err(DataError::InvalidData(format!("배열이 아님: {other}")))
                    }
                };
                if tag == "set" {
                    Value::set(items)
                } else {
                    Value::List(items)
                }
            }
            "map" => match content {
                Json::Object(obj) => Value::Map(
                    obj.into_iter()
                        .map(|(k, v)| Ok((k, Value::from_json(v)?)))
                        .collect::<Result<BTreeMap<_, _>>>()?,
                ),
                other => return Err(DataError::InvalidData(format!("객체가 아님: {other}"))),
            },
            "bar" => Value::Bar(serde_json::from_value(content)?),
            "bars" => Value::Bars(serde_json::from_value(content)?),
            "news" => Value::News(serde_json::from_value(content)?),
            "news_list" => Value::NewsList(serde_json::from_value(content)?),
            "stamped" => {
                let mut obj = match content {
                    Json::Object(obj) => obj,
                    other => {
                        return Err(DataError::InvalidData(format!("객체가 아님: {other}")))
                    }
                };
                let inner = Value::from_json(obj.remove("value").unwrap_or(Json::Null))?;
                let written_at = obj
                    .get("written_at")
                    .and_then(Json::as_f64)
                    .ok_or_else(|| DataError::InvalidData("written_at 누락".to_string()))?;
                Value::Stamped(Box::new(inner), written_at)
            }
            other => return Err(DataError::InvalidData(format!("알 수 없는 태그: {other}"))),
        };
        Ok(value)
    }
}

fn expect_str(json: Json) -> Result<String> {
    match json {
        Json::String(s) => Ok(s),
        other => Err(DataError::InvalidData(format!("문자열이 아님: {other}"))),
    }
}

fn non_finite_name(f: f64) -> &'static str {
    if f.is_nan() {
        "nan"
    } else if f > 0.0 {
        "inf"
    } else {
        "-inf"
    }
}

fn parse_non_finite(name: &str) -> Result<f64> {
    match name {
        "nan" => Ok(f64::NAN),
        "inf" => Ok(f64::INFINITY),
        "-inf" => Ok(f64::NEG_INFINITY),
        other => Err(DataError::InvalidData(format!("알 수 없는 실수: {other}"))),
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i64 => Int,
    f64 => Float,
    String => Str,
    NaiveDate => Date,
    DateTime<Utc> => DateTime,
    PathBuf => Path,
    Interval => Interval,
    SecurityKind => SecurityKind,
    Bar => Bar,
    Vec<Bar> => Bars,
    News => News,
    Vec<News> => NewsList,
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl TryFrom<Value> for f64 {
    type Error = DataError;

    fn try_from(value: Value) -> Result<Self> {
        value
            .as_f64()
            .ok_or_else(|| DataError::InvalidData(format!("실수가 아님: {value:?}")))
    }
}

impl TryFrom<Value> for String {
    type Error = DataError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(DataError::InvalidData(format!("문자열이 아님: {other:?}"))),
        }
    }
}

impl TryFrom<Value> for Vec<Bar> {
    type Error = DataError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Bars(bars) => Ok(bars),
            other => Err(DataError::InvalidData(format!("봉 목록이 아님: {other:?}"))),
        }
    }
}

/// 태그 기반 JSON 코덱.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaggedCodec;

impl Codec<Value> for TaggedCodec {
    fn encode(&self, value: &Value) -> Result<String> {
        Ok(serde_json::to_string(&value.to_json()?)?)
    }

    fn decode(&self, text: &str) -> Result<Value> {
        Value::from_json(serde_json::from_str(text)?)
    }
}

impl Codec<Stamped<Value>> for TaggedCodec {
    fn encode(&self, stamped: &Stamped<Value>) -> Result<String> {
        let wrapped = Value::Stamped(Box::new(stamped.value.clone()), stamped.written_at);
        Codec::<Value>::encode(self, &wrapped)
    }

    fn decode(&self, text: &str) -> Result<Stamped<Value>> {
        match Codec::<Value>::decode(self, text)? {
            Value::Stamped(value, written_at) => Ok(Stamped::new(*value, written_at)),
            other => Err(DataError::InvalidData(format!(
                "stamped 값이 아님: {:?}",
                other.type_tag()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(value: Value) -> Value {
        let text = Codec::<Value>::encode(&TaggedCodec, &value).unwrap();
        Codec::<Value>::decode(&TaggedCodec, &text).unwrap()
    }

    #[test]
    fn test_primitives_are_untagged() {
        let text = Codec::<Value>::encode(&TaggedCodec, &Value::Int(3)).unwrap();
        assert_eq!(text, "3");
        let text = Codec::<Value>::encode(&TaggedCodec, &Value::from("abc")).unwrap();
        assert_eq!(text, "\"abc\"");
        assert_eq!(roundtrip(Value::Float(2.0)), Value::Float(2.0));
    }

    #[test]
    fn test_tagged_shapes() {
        let text = Codec::<Value>::encode(&TaggedCodec, &Value::Interval(Interval::H1)).unwrap();
        assert_eq!(text, r#"{"$type":"interval","$value":"h1"}"#);

        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let text = Codec::<Value>::encode(&TaggedCodec, &Value::Date(date)).unwrap();
        assert!(text.contains("2024-01-05"));
    }

    #[test]
    fn test_nested_roundtrip() {
        let mut map = BTreeMap::new();
        map.insert("bars".to_string(), Value::Bars(vec![Bar::flat(10.0, 1.0, 2.0)]));
        map.insert("path".to_string(), Value::Path(PathBuf::from("/tmp/x")));
        map.insert(
            "set".to_string(),
            Value::set([Value::Int(1), Value::Int(1), Value::Null]),
        );
        map.insert("nan".to_string(), Value::Float(f64::INFINITY));
        let value = Value::List(vec![
            Value::Map(map),
            Value::DateTime(DateTime::from_timestamp(1_704_067_200, 123_000_000).unwrap()),
            Value::News(News::new(5.0, "title", "body")),
        ]);
        assert_eq!(roundtrip(value.clone()), value);
    }

    #[test]
    fn test_stamped_roundtrip() {
        let stamped = Stamped::new(Value::Float(1.5e12), 100.0);
        let text = Codec::<Stamped<Value>>::encode(&TaggedCodec, &stamped).unwrap();
        let back: Stamped<Value> = TaggedCodec.decode(&text).unwrap();
        assert_eq!(back, stamped);

        assert!(Codec::<Stamped<Value>>::decode(&TaggedCodec, "1").is_err());
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let err = Codec::<Value>::decode(&TaggedCodec, r#"{"$type":"frob","$value":1}"#);
        assert!(matches!(err, Err(DataError::InvalidData(_))));
    }
}
