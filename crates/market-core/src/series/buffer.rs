//! 메모리 시계열 버퍼.
//!
//! 시각 정렬된 항목 맵과 커버리지를 함께 보관합니다.
//! 메모리 저장소와 캘린더 타임스탬프 캐시가 모두 이 타입을 사용합니다.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::coverage::{Coverage, CoverageDelta, Span};
use crate::types::Timestamped;

/// `f64` 시각을 정렬 키로 쓰기 위한 래퍼.
#[derive(Debug, Clone, Copy)]
pub struct TsKey(pub f64);

impl PartialEq for TsKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TsKey {}

impl PartialOrd for TsKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TsKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// 한 키의 시계열 항목과 커버리지.
#[derive(Debug, Clone)]
pub struct SeriesBuffer<T> {
    items: BTreeMap<TsKey, T>,
    coverage: Coverage,
}

impl<T> Default for SeriesBuffer<T> {
    fn default() -> Self {
        Self {
            items: BTreeMap::new(),
            coverage: Coverage::new(),
        }
    }
}

impl<T: Timestamped + Clone> SeriesBuffer<T> {
    /// 빈 버퍼.
    pub fn new() -> Self {
        Self::default()
    }

    /// 기존 항목과 구간으로 버퍼를 복원합니다.
    ///
    /// 커버리지 밖의 항목은 버립니다.
    pub fn from_parts(
        items: impl IntoIterator<Item = T>,
        spans: impl IntoIterator<Item = Span>,
    ) -> Self {
        let coverage = Coverage::from_spans(spans);
        let items = items
            .into_iter()
            .filter(|item| coverage.contains(item.timestamp()))
            .map(|item| (TsKey(item.timestamp()), item))
            .collect();
        Self { items, coverage }
    }

    /// `items`를 기록하고 `(start, end]`를 커버리지에 흡수합니다.
    ///
    /// 구간 밖의 항목은 무시되고, 같은 시각의 기존 항목은 덮어씁니다.
    /// 빈 구간이면 아무것도 하지 않습니다.
    pub fn set(&mut self, start: f64, end: f64, items: impl IntoIterator<Item = T>) -> CoverageDelta {
        if start >= end {
            return CoverageDelta::default();
        }
        for item in items {
            let t = item.timestamp();
            if start < t && t <= end {
                self.items.insert(TsKey(t), item);
            }
        }
        self.coverage.absorb(start, end)
    }

    /// `(start, end]` 구간의 항목을 시각 오름차순으로 반환합니다.
    pub fn get(&self, start: f64, end: f64) -> Vec<T> {
        self.range(start, end).cloned().collect()
    }

    /// `(start, end]` 구간의 항목 참조 반복자.
    pub fn range(&self, start: f64, end: f64) -> impl Iterator<Item = &T> + '_ {
        let iter = if start < end {
            Some(
                self.items
                    .range(TsKey(start)..=TsKey(end))
                    .filter(move |(k, _)| k.0 > start)
                    .map(|(_, v)| v),
            )
        } else {
            None
        };
        iter.into_iter().flatten()
    }

    /// `(start, end]` 구간의 항목과 커버리지를 지웁니다.
    pub fn delete(&mut self, start: f64, end: f64) -> CoverageDelta {
        if start >= end {
            return CoverageDelta::default();
        }
        self.remove_range(start, end);
        self.coverage.punch(start, end)
    }

    /// `(start, end]` 안의 미커버 구간.
    pub fn missing_spans(&self, start: f64, end: f64) -> Vec<Span> {
        self.coverage.missing(start, end)
    }

    /// 전체 커버리지 구간.
    pub fn spans(&self) -> &[Span] {
        self.coverage.spans()
    }

    /// 커버리지 참조.
    pub fn coverage(&self) -> &Coverage {
        &self.coverage
    }

    /// 전체 항목 (시각 오름차순).
    pub fn items(&self) -> impl Iterator<Item = &T> + '_ {
        self.items.values()
    }

    /// 항목 수.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// 항목도 커버리지도 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.coverage.is_empty()
    }

    fn remove_range(&mut self, start: f64, end: f64) {
        let doomed: Vec<TsKey> = self
            .items
            .range(TsKey(start)..=TsKey(end))
            .filter(|(k, _)| k.0 > start)
            .map(|(k, _)| *k)
            .collect();
        for key in doomed {
            self.items.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Bar;

    #[test]
    fn test_set_get_half_open() {
        let mut buf = SeriesBuffer::new();
        buf.set(0.0, 3.0, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        // 0은 시작 경계라 제외, 4는 구간 밖
        assert_eq!(buf.get(0.0, 10.0), vec![1.0, 2.0, 3.0]);
        assert_eq!(buf.get(1.0, 2.0), vec![2.0]);
        assert!(buf.get(2.0, 2.0).is_empty());
    }

    #[test]
    fn test_set_overwrites_same_timestamp() {
        let mut buf = SeriesBuffer::new();
        buf.set(0.0, 10.0, vec![Bar::flat(5.0, 1.0, 1.0), Bar::flat(7.0, 1.0, 1.0)]);
        buf.set(4.0, 6.0, vec![Bar::flat(5.0, 2.0, 1.0)]);

        let bars = buf.get(0.0, 10.0);
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 2.0);
        assert_eq!(buf.spans(), &[Span::new(0.0, 10.0)]);
    }

    #[test]
    fn test_set_empty_range_is_noop() {
        let mut buf: SeriesBuffer<f64> = SeriesBuffer::new();
        let delta = buf.set(5.0, 5.0, vec![5.0]);
        assert!(delta.is_empty());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_delete_punches_coverage() {
        let mut buf = SeriesBuffer::new();
        buf.set(0.0, 10.0, vec![2.0, 5.0, 8.0]);
        buf.delete(4.0, 6.0);

        assert_eq!(buf.get(0.0, 10.0), vec![2.0, 8.0]);
        assert_eq!(buf.missing_spans(0.0, 10.0), vec![Span::new(4.0, 6.0)]);
    }

    #[test]
    fn test_tskey_orders_negative_and_zero() {
        let mut keys = vec![TsKey(1.0), TsKey(-1.0), TsKey(0.0)];
        keys.sort();
        assert_eq!(keys.iter().map(|k| k.0).collect::<Vec<_>>(), vec![-1.0, 0.0, 1.0]);
    }
}
