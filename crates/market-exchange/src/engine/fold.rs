//! 짧은 인터벌 봉을 긴 인터벌 봉으로 접기.
//!
//! 짧은 봉 `b`는 `b.t` 이상인 가장 작은 긴 인터벌 타임스탬프에 속합니다.
//! 일중 인터벌로 접을 때는 그 타임스탬프가 다른 현지 날짜면 버립니다 (폐장 직전 자투리 봉).
//! 묶음 값: 시가 = 첫 봉, 고가 = 최대, 저가 = 최소, 종가 = 마지막 봉, 거래량 = 합계.

use market_core::{Bar, Interval, WorkCalendar};
use tracing::trace;

/// `fine` 봉들을 `coarse` 인터벌로 접고 `(from, to]` 안의 묶음만 반환합니다.
///
/// 입력은 시각 오름차순이어야 합니다.
pub fn fold_bars(
    bars: &[Bar],
    fine: Interval,
    coarse: Interval,
    calendar: &WorkCalendar,
    from: f64,
    to: f64,
) -> Vec<Bar> {
    trace!(fine = %fine, coarse = %coarse, count = bars.len(), "봉 접기");
    let mut out: Vec<Bar> = Vec::new();

    for bar in bars {
        let key = enclosing_timestamp(calendar, bar.t, coarse);
        if coarse.is_intraday() && calendar.local_date(key) != calendar.local_date(bar.t) {
            trace!(t = bar.t, key, "세션 경계를 넘는 봉 제외");
            continue;
        }
        if !(from < key && key <= to) {
            continue;
        }

        match out.last_mut() {
            Some(group) if group.t == key => {
                group.high = group.high.max(bar.high);
                group.low = group.low.min(bar.low);
                group.close = bar.close;
                group.volume += bar.volume;
            }
            _ => out.push(Bar { t: key, ..*bar }),
        }
    }

    out
}

/// `t` 이상인 가장 작은 `interval` 타임스탬프.
fn enclosing_timestamp(calendar: &WorkCalendar, t: f64, interval: Interval) -> f64 {
    if calendar.is_timestamp(t, interval) {
        t
    } else {
        calendar.next_timestamp(t, interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_core::Security;

    // 2024-01-08 (월) 00:00 UTC
    const MONDAY: f64 = 1_704_672_000.0;

    fn test_calendar() -> std::sync::Arc<WorkCalendar> {
        Security::lookup("TEST", "TEST1").unwrap().calendar().unwrap()
    }

    fn m30_bars(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let v = i as f64;
                Bar::new(MONDAY + (i as f64 + 1.0) * 1_800.0, v, v, v, v, v)
            })
            .collect()
    }

    #[test]
    fn test_fold_pairs_into_hours() {
        let calendar = test_calendar();
        let folded = fold_bars(
            &m30_bars(6),
            Interval::M30,
            Interval::H1,
            &calendar,
            MONDAY,
            MONDAY + 86_400.0,
        );

        assert_eq!(
            folded,
            vec![
                Bar::new(MONDAY + 3_600.0, 0.0, 1.0, 0.0, 1.0, 1.0),
                Bar::new(MONDAY + 7_200.0, 2.0, 3.0, 2.0, 3.0, 5.0),
                Bar::new(MONDAY + 10_800.0, 4.0, 5.0, 4.0, 5.0, 9.0),
            ]
        );
    }

    #[test]
    fn test_trailing_group_past_window_is_dropped() {
        let calendar = test_calendar();
        let folded = fold_bars(
            &m30_bars(5),
            Interval::M30,
            Interval::H1,
            &calendar,
            MONDAY,
            MONDAY + 7_200.0,
        );
        assert_eq!(folded.len(), 2);
        assert_eq!(folded[1].t, MONDAY + 7_200.0);
    }

    #[test]
    fn test_session_straddling_bar_is_dropped() {
        let calendar = Security::lookup("XNYS", "IBM").unwrap().calendar().unwrap();
        // 2024-01-03 15:30, 16:00 EST (30분봉 끝)
        let bars = vec![
            Bar::flat(1_704_313_800.0, 1.0, 1.0),
            Bar::flat(1_704_315_600.0, 2.0, 1.0),
        ];
        let folded = fold_bars(
            &bars,
            Interval::M30,
            Interval::H1,
            &calendar,
            1_704_240_000.0,
            1_704_500_000.0,
        );
        // 15:30 봉은 15:30 시간봉, 16:00 봉은 다음 날로 넘어가므로 제외
        assert_eq!(folded, vec![Bar::flat(1_704_313_800.0, 1.0, 1.0)]);
    }

    #[test]
    fn test_fold_days_into_week() {
        let calendar = Security::lookup("XNYS", "IBM").unwrap().calendar().unwrap();
        // 2024-01-08 (월) ~ 01-12 (금) 폐장 16:00 EST
        let closes: Vec<f64> = (0..5).map(|d| 1_704_747_600.0 + d as f64 * 86_400.0).collect();
        let bars: Vec<Bar> = closes
            .iter()
            .enumerate()
            .map(|(i, t)| Bar::new(*t, 10.0 + i as f64, 20.0, 5.0 + i as f64, 11.0 + i as f64, 100.0))
            .collect();

        let folded = fold_bars(
            &bars,
            Interval::D1,
            Interval::W1,
            &calendar,
            1_704_600_000.0,
            1_705_500_000.0,
        );
        assert_eq!(folded.len(), 1);
        let week = folded[0];
        assert!(calendar.is_timestamp(week.t, Interval::W1));
        assert_eq!((week.open, week.high, week.low, week.close, week.volume), (10.0, 20.0, 5.0, 15.0, 500.0));
    }

    #[test]
    fn test_fold_days_across_month_boundary() {
        let calendar = Security::lookup("XNYS", "IBM").unwrap().calendar().unwrap();
        // 2024-04-29 (월), 04-30 (화), 05-01 (수), 05-02 (목) 폐장 16:00 EDT
        let bars = vec![
            Bar::new(1_714_420_800.0, 1.0, 1.0, 1.0, 1.0, 10.0),
            Bar::new(1_714_507_200.0, 2.0, 2.0, 2.0, 2.0, 20.0),
            Bar::new(1_714_593_600.0, 3.0, 3.0, 3.0, 3.0, 30.0),
            Bar::new(1_714_680_000.0, 4.0, 4.0, 4.0, 4.0, 40.0),
        ];

        let folded = fold_bars(
            &bars,
            Interval::D1,
            Interval::MN1,
            &calendar,
            1_711_929_600.0,
            1_717_300_000.0,
        );

        assert_eq!(folded.len(), 2);
        assert_eq!(folded[0].t, calendar.next_timestamp(1_714_507_200.0, Interval::MN1));
        assert_eq!((folded[0].open, folded[0].close, folded[0].volume), (1.0, 2.0, 30.0));
        assert_eq!(folded[1].t, calendar.next_timestamp(1_714_593_600.0, Interval::MN1));
        assert_eq!((folded[1].open, folded[1].close, folded[1].volume), (3.0, 4.0, 70.0));
        assert!(folded[0].t < folded[1].t);
    }
}
