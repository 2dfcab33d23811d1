//! 커버리지 구간 대수.
//!
//! 키별로 이미 조회한 반개구간 `(start, end]` 목록을 관리합니다.
//! 목록은 항상 `start` 오름차순이며, 어떤 두 구간도 겹치거나 맞닿지 않습니다.
//! 맞닿은 구간은 흡수 시 하나로 병합됩니다.

use serde::{Deserialize, Serialize};

/// 반개구간 `(start, end]`.
///
/// 직렬화 형식은 `[start, end]` 쌍입니다.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Span {
    /// 시작 (제외)
    pub start: f64,
    /// 끝 (포함)
    pub end: f64,
}

impl Span {
    /// 새 구간을 생성합니다.
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// 빈 구간인지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// `t`가 구간 안에 있는지 확인합니다 (`start < t <= end`).
    pub fn contains(&self, t: f64) -> bool {
        self.start < t && t <= self.end
    }

    /// 구간 길이 (초).
    pub fn len(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

impl From<[f64; 2]> for Span {
    fn from(pair: [f64; 2]) -> Self {
        Span::new(pair[0], pair[1])
    }
}

impl From<Span> for [f64; 2] {
    fn from(span: Span) -> Self {
        [span.start, span.end]
    }
}

/// 커버리지 변경 내역.
///
/// SQL 백엔드는 이 내역을 `(key, start)` 단위 삭제/삽입으로 반영합니다.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoverageDelta {
    /// 제거된 구간
    pub removed: Vec<Span>,
    /// 추가된 구간
    pub added: Vec<Span>,
}

impl CoverageDelta {
    /// 변경이 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

/// 정렬되고 서로소이며 맞닿지 않는 구간 목록.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Coverage {
    spans: Vec<Span>,
}

impl Coverage {
    /// 빈 커버리지.
    pub fn new() -> Self {
        Self::default()
    }

    /// 임의 구간 목록을 정규화하여 커버리지를 만듭니다.
    pub fn from_spans(spans: impl IntoIterator<Item = Span>) -> Self {
        let mut coverage = Self::new();
        for span in spans {
            coverage.absorb(span.start, span.end);
        }
        coverage
    }

    /// 현재 구간 목록.
    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// 구간 목록을 소유권과 함께 반환합니다.
    pub fn into_spans(self) -> Vec<Span> {
        self.spans
    }

    /// 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// `t`가 어떤 구간에 포함되는지 확인합니다.
    pub fn contains(&self, t: f64) -> bool {
        let idx = self.spans.partition_point(|s| s.end < t);
        self.spans.get(idx).is_some_and(|s| s.contains(t))
    }

    /// `(start, end]`를 흡수합니다.
    ///
    /// 겹치거나 맞닿는 기존 구간은 모두 하나로 병합됩니다.
    pub fn absorb(&mut self, start: f64, end: f64) -> CoverageDelta {
        if start >= end {
            return CoverageDelta::default();
        }

        let mut merged = Span::new(start, end);
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.spans.len() + 1);

        for span in self.spans.drain(..) {
            if span.start <= end && span.end >= start {
                merged.start = merged.start.min(span.start);
                merged.end = merged.end.max(span.end);
                removed.push(span);
            } else {
                kept.push(span);
            }
        }

        let idx = kept.partition_point(|s| s.start < merged.start);
        kept.insert(idx, merged);
        self.spans = kept;

        CoverageDelta {
            removed,
            added: vec![merged],
        }
    }

    /// `(start, end]`를 커버리지에서 도려냅니다.
    ///
    /// 경계에 걸친 구간은 분할되며 새 커버리지는 생기지 않습니다.
    pub fn punch(&mut self, start: f64, end: f64) -> CoverageDelta {
        if start >= end {
            return CoverageDelta::default();
        }

        let mut delta = CoverageDelta::default();
        let mut kept = Vec::with_capacity(self.spans.len() + 1);

        for span in self.spans.drain(..) {
            if span.start < end && span.end > start {
                delta.removed.push(span);
                if span.start < start {
                    let left = Span::new(span.start, start);
                    delta.added.push(left);
                    kept.push(left);
                }
                if span.end > end {
                    let right = Span::new(end, span.end);
                    delta.added.push(right);
                    kept.push(right);
                }
            } else {
                kept.push(span);
            }
        }

        self.spans = kept;
        delta
    }

    /// `(start, end]` 안에서 커버되지 않은 구간을 순서대로 반환합니다.
    pub fn missing(&self, start: f64, end: f64) -> Vec<Span> {
        let mut gaps = Vec::new();
        if start >= end {
            return gaps;
        }

        let mut cursor = start;
        for span in &self.spans {
            if span.end <= cursor {
                continue;
            }
            if span.start >= end {
                break;
            }
            if span.start > cursor {
                gaps.push(Span::new(cursor, span.start));
            }
            cursor = cursor.max(span.end);
            if cursor >= end {
                break;
            }
        }

        if cursor < end {
            gaps.push(Span::new(cursor, end));
        }
        gaps
    }

    /// 불변식 검사: 정렬, 비어 있지 않음, 겹치거나 맞닿지 않음.
    pub fn is_normalized(&self) -> bool {
        self.spans.iter().all(|s| !s.is_empty())
            && self.spans.windows(2).all(|w| w[0].end < w[1].start)
    }
}
