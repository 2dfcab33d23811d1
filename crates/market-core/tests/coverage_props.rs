//! 커버리지 불변식 속성 테스트
//!
//! 임의의 set/delete 순서 뒤에도:
//! 1. 구간은 정렬되고 겹치거나 맞닿지 않음
//! 2. 모든 항목은 어떤 구간 안에 있음
//! 3. get 결과는 구간 안, 오름차순, 중복 없음
//! 4. missing + 기존 커버리지가 조회 구간을 정확히 덮음

use market_core::{SeriesBuffer, Span};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Set(f64, f64),
    Delete(f64, f64),
}

fn arb_range() -> impl Strategy<Value = (f64, f64)> {
    (0u32..200, 0u32..60).prop_map(|(start, len)| (start as f64, (start + len) as f64))
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => arb_range().prop_map(|(s, e)| Op::Set(s, e)),
        1 => arb_range().prop_map(|(s, e)| Op::Delete(s, e)),
    ]
}

fn apply(ops: &[Op]) -> SeriesBuffer<f64> {
    let mut buffer = SeriesBuffer::new();
    for op in ops {
        match *op {
            Op::Set(s, e) => {
                // 반 단위 시각도 섞어서 기록
                let items: Vec<f64> = (s as u32..=e as u32)
                    .flat_map(|t| [t as f64, t as f64 + 0.5])
                    .collect();
                buffer.set(s, e, items);
            }
            Op::Delete(s, e) => {
                buffer.delete(s, e);
            }
        }
    }
    buffer
}

proptest! {
    #[test]
    fn spans_stay_normalized(ops in prop::collection::vec(arb_op(), 0..40)) {
        let buffer = apply(&ops);
        prop_assert!(buffer.coverage().is_normalized());
    }

    #[test]
    fn items_lie_inside_coverage(ops in prop::collection::vec(arb_op(), 0..40)) {
        let buffer = apply(&ops);
        for t in buffer.items() {
            prop_assert!(buffer.coverage().contains(*t), "item {} outside coverage", t);
        }
    }

    #[test]
    fn get_is_bounded_sorted_unique(
        ops in prop::collection::vec(arb_op(), 0..40),
        (a, b) in arb_range(),
    ) {
        let buffer = apply(&ops);
        let items = buffer.get(a, b);
        for t in &items {
            prop_assert!(a < *t && *t <= b);
        }
        for pair in items.windows(2) {
            prop_assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn missing_and_coverage_tile_query(
        ops in prop::collection::vec(arb_op(), 0..40),
        (a, b) in arb_range(),
    ) {
        let buffer = apply(&ops);
        let mut pieces: Vec<Span> = buffer.missing_spans(a, b);
        pieces.extend(
            buffer
                .spans()
                .iter()
                .filter(|s| s.end > a && s.start < b)
                .map(|s| Span::new(s.start.max(a), s.end.min(b))),
        );
        pieces.sort_by(|x, y| x.start.total_cmp(&y.start));

        if a >= b {
            prop_assert!(buffer.missing_spans(a, b).is_empty());
        } else {
            let mut cursor = a;
            for piece in &pieces {
                prop_assert_eq!(piece.start, cursor);
                prop_assert!(piece.end > piece.start);
                cursor = piece.end;
            }
            prop_assert_eq!(cursor, b);
        }
    }
}

#[test]
fn coverage_merge_scenario() {
    let mut buffer = SeriesBuffer::new();
    buffer.set(100.0, 200.0, vec![150.0]);
    buffer.set(300.0, 400.0, vec![350.0]);
    assert_eq!(buffer.missing_spans(100.0, 400.0), vec![Span::new(200.0, 300.0)]);

    buffer.set(200.0, 300.0, vec![250.0]);
    assert!(buffer.missing_spans(100.0, 400.0).is_empty());
    assert_eq!(buffer.get(100.0, 400.0), vec![150.0, 250.0, 350.0]);
}

#[test]
fn boundary_and_punch_scenario() {
    let mut buffer = SeriesBuffer::new();
    let items: Vec<f64> = (101..=200).map(f64::from).collect();
    buffer.set(100.0, 200.0, items);

    assert_eq!(buffer.get(100.0, 200.0).len(), 100);
    assert!(buffer.get(99.0, 100.0).is_empty());

    buffer.delete(150.0, 160.0);
    let left: Vec<f64> = (101..=150).map(f64::from).collect();
    let right: Vec<f64> = (161..=200).map(f64::from).collect();
    assert_eq!(buffer.get(100.0, 200.0), [left, right].concat());
    assert_eq!(
        buffer.spans(),
        &[Span::new(100.0, 150.0), Span::new(160.0, 200.0)]
    );
}
