//! 키 ↔ 파일 이름 이스케이프.
//!
//! - 빈 문자열 → `[[]]`
//! - 예약 장치 이름(`CON`, `PRN`, `AUX`, `NUL`, `COM1..9`, `LPT1..9`)과 `.`/`..` → `[[NAME]]`
//! - 그 외 → 퍼센트 인코딩 (선행 `.`도 인코딩)
//!
//! 퍼센트 인코딩은 `[`를 인코딩하므로 `[[`로 시작하는 이름은 항상 감싼 형태입니다.

use std::borrow::Cow;

use crate::error::{DataError, Result};

const RESERVED: &[&str] = &["CON", "PRN", "AUX", "NUL"];

fn is_reserved(key: &str) -> bool {
    if key == "." || key == ".." {
        return true;
    }
    let upper = key.to_ascii_uppercase();
    if RESERVED.contains(&upper.as_str()) {
        return true;
    }
    let bytes = upper.as_bytes();
    bytes.len() == 4
        && (upper.starts_with("COM") || upper.starts_with("LPT"))
        && (b'1'..=b'9').contains(&bytes[3])
}

/// 키를 안전한 파일 이름으로 변환합니다.
pub fn escape_key(key: &str) -> String {
    if key.is_empty() || is_reserved(key) {
        return format!("[[{key}]]");
    }
    let encoded = urlencoding::encode(key);
    match encoded.strip_prefix('.') {
        Some(rest) => format!("%2E{rest}"),
        None => encoded.into_owned(),
    }
}

/// 파일 이름을 원래 키로 되돌립니다.
pub fn unescape_key(name: &str) -> Result<String> {
    if let Some(inner) = name.strip_prefix("[[").and_then(|s| s.strip_suffix("]]")) {
        return Ok(inner.to_string());
    }
    urlencoding::decode(name)
        .map(Cow::into_owned)
        .map_err(|e| DataError::InvalidData(format!("키 디코딩 실패 '{name}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_names() {
        assert_eq!(escape_key(""), "[[]]");
        assert_eq!(escape_key("CON"), "[[CON]]");
        assert_eq!(escape_key("com7"), "[[com7]]");
        assert_eq!(escape_key("LPT0"), "LPT0");
        assert_eq!(escape_key(".."), "[[..]]");
        assert_eq!(unescape_key("[[]]").unwrap(), "");
        assert_eq!(unescape_key("[[com7]]").unwrap(), "com7");
    }

    #[test]
    fn test_special_characters() {
        let key = "XNAS_AAPL_1h/news:[x]";
        let escaped = escape_key(key);
        assert!(!escaped.contains('/'));
        assert!(!escaped.contains(':'));
        assert_eq!(unescape_key(&escaped).unwrap(), key);

        let hidden = escape_key(".tmp");
        assert!(!hidden.starts_with('.'));
        assert_eq!(unescape_key(&hidden).unwrap(), ".tmp");
    }
}
