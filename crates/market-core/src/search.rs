//! 정렬된 시각 배열에 대한 방향성 이진 탐색.

/// 탐색 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// 목표보다 작은 원소 중 가장 큰 것
    Lt,
    /// 목표 이하 원소 중 가장 큰 것
    Le,
    /// 목표와 같은 원소
    Eq,
    /// 목표 이상 원소 중 가장 작은 것
    Ge,
    /// 목표보다 큰 원소 중 가장 작은 것
    Gt,
}

/// 오름차순 `values`에서 `side` 조건을 만족하는 가장 가까운 원소의 인덱스를 찾습니다.
///
/// 인덱스는 0부터 시작합니다. 조건을 만족하는 원소가 없으면 `None`.
pub fn binary_search(values: &[f64], target: f64, side: Side) -> Option<usize> {
    match side {
        Side::Lt => values.partition_point(|v| *v < target).checked_sub(1),
        Side::Le => values.partition_point(|v| *v <= target).checked_sub(1),
        Side::Eq => {
            let idx = values.partition_point(|v| *v < target);
            (values.get(idx) == Some(&target)).then_some(idx)
        }
        Side::Ge => {
            let idx = values.partition_point(|v| *v < target);
            (idx < values.len()).then_some(idx)
        }
        Side::Gt => {
            let idx = values.partition_point(|v| *v <= target);
            (idx < values.len()).then_some(idx)
        }
    }
}

/// `binary_search` 결과 원소를 직접 반환합니다.
pub fn search_value(values: &[f64], target: f64, side: Side) -> Option<f64> {
    binary_search(values, target, side).map(|idx| values[idx])
}
