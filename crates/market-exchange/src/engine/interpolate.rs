//! 캘린더 격자 보간.
//!
//! 격자 시각마다 같은 시각의 봉이 있으면 그대로 쓰고, 없으면 앞뒤 봉으로
//! 시가/고가/저가/종가/거래량을 각각 선형 보간합니다. 데이터 범위 밖은 가장 가까운 봉 값을 씁니다.
//! 채운 비율이 `max_fill_ratio`를 넘으면 거부합니다.

use market_core::{binary_search, Bar, Side};
use tracing::debug;

use crate::error::{ExchangeError, ExchangeResult};

/// 같은 시각으로 보는 허용 오차 (초).
const TIME_EPSILON: f64 = 1e-6;

/// `bars`를 `grid`에 맞춰 보간합니다. `bars`는 시각 오름차순이어야 합니다.
pub fn interpolate(bars: &[Bar], grid: &[f64], max_fill_ratio: f64) -> ExchangeResult<Vec<Bar>> {
    if grid.is_empty() {
        return Ok(Vec::new());
    }
    if bars.is_empty() {
        return if max_fill_ratio >= 1.0 {
            Ok(Vec::new())
        } else {
            Err(ExchangeError::FillRatioExceeded {
                ratio: 1.0,
                max: max_fill_ratio,
            })
        };
    }

    let times: Vec<f64> = bars.iter().map(|b| b.t).collect();
    let mut filled = 0usize;
    let mut out = Vec::with_capacity(grid.len());

    for &t in grid {
        let left = binary_search(&times, t + TIME_EPSILON, Side::Le);
        if let Some(i) = left.filter(|i| (times[*i] - t).abs() <= TIME_EPSILON) {
            out.push(Bar { t, ..bars[i] });
            continue;
        }

        filled += 1;
        let right = binary_search(&times, t, Side::Gt);
        let bar = match (left, right) {
            (Some(l), Some(r)) => lerp(&bars[l], &bars[r], t),
            (Some(l), None) => Bar { t, ..bars[l] },
            (None, Some(r)) => Bar { t, ..bars[r] },
            (None, None) => continue,
        };
        out.push(bar);
    }

    let ratio = filled as f64 / grid.len() as f64;
    if ratio > max_fill_ratio {
        return Err(ExchangeError::FillRatioExceeded {
            ratio,
            max: max_fill_ratio,
        });
    }
    debug!(grid = grid.len(), filled, ratio, "격자 보간");
    Ok(out)
}

fn lerp(a: &Bar, b: &Bar, t: f64) -> Bar {
    let w = (t - a.t) / (b.t - a.t);
    let mix = |x: f64, y: f64| x + (y - x) * w;
    Bar::new(
        t,
        mix(a.open, b.open),
        mix(a.high, b.high),
        mix(a.low, b.low),
        mix(a.close, b.close),
        mix(a.volume, b.volume),
    )
}
