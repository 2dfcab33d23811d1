//! 거래소 작업 캘린더.
//!
//! 시간대와 `WorkSchedule`로 유효한 봉 종료 시각을 판정하고 열거합니다.
//!
//! 경계 규칙:
//! - 모든 봉과 구간은 시작 제외, 끝 포함 `(start, end]`
//! - 현지 자정 정각은 전날에 속함
//! - 일중 봉은 개장 시각부터 인터벌 배수, `open < t <= close`
//! - 일봉은 해당일 폐장 시각
//! - 주봉/월봉은 주/월의 마지막 영업일 종료 직전 마이크로초

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use tracing::warn;

use super::cache::TimestampCache;
use super::schedule::WorkSchedule;
use crate::error::{CoreError, CoreResult};
use crate::types::Interval;

/// 주봉/월봉 종료 시각의 자정 이전 오프셋.
const END_OF_DAY_EPSILON: f64 = 1e-6;

/// 시간대와 세션 스케줄을 가진 작업 캘린더.
#[derive(Debug)]
pub struct WorkCalendar {
    tz: Tz,
    schedule: WorkSchedule,
    cache: TimestampCache,
}

impl WorkCalendar {
    /// 새 캘린더를 생성합니다.
    pub fn new(tz: Tz, schedule: WorkSchedule) -> Self {
        Self {
            tz,
            schedule,
            cache: TimestampCache::new(),
        }
    }

    /// IANA 시간대 이름으로 캘린더를 생성합니다.
    pub fn with_tz_name(tz: &str, schedule: WorkSchedule) -> CoreResult<Self> {
        let tz: Tz = tz
            .parse()
            .map_err(|e| CoreError::InvalidInput(format!("알 수 없는 시간대 '{tz}': {e}")))?;
        Ok(Self::new(tz, schedule))
    }

    /// 시간대.
    pub fn tz(&self) -> Tz {
        self.tz
    }

    /// 세션 스케줄.
    pub fn schedule(&self) -> &WorkSchedule {
        &self.schedule
    }

    /// `t`가 속한 현지 날짜. 자정 정각은 전날입니다.
    pub fn local_date(&self, t: f64) -> NaiveDate {
        let local = to_utc(t).unwrap_or_default().with_timezone(&self.tz);
        let date = local.date_naive();
        if local.num_seconds_from_midnight() == 0 && local.nanosecond() == 0 {
            date.pred_opt().unwrap_or(date)
        } else {
            date
        }
    }

    /// 현지 날짜의 자정 기준 `secs`초 시각.
    ///
    /// 서머타임으로 존재하지 않는 현지 시각은 한 시간 뒤로 밀립니다.
    pub fn local_instant(&self, date: NaiveDate, secs: u32) -> f64 {
        let naive = date.and_time(NaiveTime::MIN) + Duration::seconds(i64::from(secs));
        self.tz
            .from_local_datetime(&naive)
            .earliest()
            .or_else(|| {
                self.tz
                    .from_local_datetime(&(naive + Duration::hours(1)))
                    .earliest()
            })
            .map(|dt| dt.timestamp() as f64)
            .unwrap_or_else(|| naive.and_utc().timestamp() as f64)
    }

    /// 영업일 여부 (날짜 기준).
    pub fn is_workday_date(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.schedule.is_holiday(date)
    }

    /// `t`의 현지 날짜가 월–금이고 휴장일이 아닌지 확인합니다.
    pub fn is_workday(&self, t: f64) -> bool {
        self.is_workday_date(self.local_date(t))
    }

    fn open_on(&self, date: NaiveDate) -> f64 {
        self.local_instant(date, self.schedule.open())
    }

    fn close_on(&self, date: NaiveDate) -> f64 {
        self.local_instant(date, self.schedule.close_on(date))
    }

    fn end_of_day(&self, date: NaiveDate) -> f64 {
        let next = date.succ_opt().unwrap_or(date);
        self.local_instant(next, 0) - END_OF_DAY_EPSILON
    }

    /// `t`가 속한 날짜의 개장 시각.
    pub fn set_open(&self, t: f64) -> CoreResult<f64> {
        let date = self.local_date(t);
        if !self.is_workday_date(date) {
            return Err(CoreError::NotWorkday(t));
        }
        Ok(self.open_on(date))
    }

    /// `t`가 속한 날짜의 폐장 시각 (조기 폐장 반영).
    pub fn set_close(&self, t: f64) -> CoreResult<f64> {
        let date = self.local_date(t);
        if !self.is_workday_date(date) {
            return Err(CoreError::NotWorkday(t));
        }
        Ok(self.close_on(date))
    }

    fn last_workday_of_week(&self, date: NaiveDate) -> Option<NaiveDate> {
        let monday = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
        (0..5)
            .rev()
            .map(|offset| monday + Duration::days(offset))
            .find(|d| self.is_workday_date(*d))
    }

    fn last_workday_of_month(&self, date: NaiveDate) -> Option<NaiveDate> {
        let first = date.with_day(1)?;
        let next_first = if first.month() == 12 {
            NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)?
        };
        first
            .iter_days()
            .take_while(|d| *d < next_first)
            .filter(|d| self.is_workday_date(*d))
            .last()
    }

    fn next_month(date: NaiveDate) -> NaiveDate {
        let (year, month) = if date.month() == 12 {
            (date.year() + 1, 1)
        } else {
            (date.year(), date.month() + 1)
        };
        NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(date)
    }

    /// 인터벌 봉이 하나라도 들어갈 수 있는 세션인지 확인합니다.
    pub fn has_sessions(&self, interval: Interval) -> bool {
        !interval.is_intraday() || f64::from(self.schedule.session_secs()) >= interval.duration()
    }

    /// `t`가 해당 인터벌의 유효한 봉 종료 시각인지 확인합니다.
    pub fn is_timestamp(&self, t: f64, interval: Interval) -> bool {
        let date = self.local_date(t);
        match interval {
            Interval::W1 => self
                .last_workday_of_week(date)
                .is_some_and(|d| self.end_of_day(d) == t),
            Interval::MN1 => self
                .last_workday_of_month(date)
                .is_some_and(|d| self.end_of_day(d) == t),
            Interval::D1 => self.is_workday_date(date) && self.close_on(date) == t,
            _ => {
                if !self.is_workday_date(date) {
                    return false;
                }
                let open = self.open_on(date);
                let close = self.close_on(date);
                if !(open < t && t <= close) {
                    return false;
                }
                let steps = (t - open) / interval.duration();
                (steps - steps.round()).abs() < 1e-9
            }
        }
    }

    /// `t`보다 큰 가장 작은 유효 타임스탬프.
    ///
    /// 세션보다 긴 일중 인터벌에는 타임스탬프가 없으므로 `f64::INFINITY`를 반환합니다.
    pub fn next_timestamp(&self, t: f64, interval: Interval) -> f64 {
        if !self.has_sessions(interval) {
            warn!(interval = %interval, "세션보다 긴 인터벌");
            return f64::INFINITY;
        }
        if t.is_nan() || t == f64::INFINITY {
            return f64::INFINITY;
        }
        if t > 0.0 && to_utc(t).is_none() {
            warn!(t, "표현할 수 없는 시각");
            return f64::INFINITY;
        }

        let mut date = self.local_date(t);
        match interval {
            Interval::W1 => loop {
                if let Some(last) = self.last_workday_of_week(date) {
                    let candidate = self.end_of_day(last);
                    if candidate > t {
                        return candidate;
                    }
                }
                let monday =
                    date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
                date = monday + Duration::days(7);
            },
            Interval::MN1 => loop {
                if let Some(last) = self.last_workday_of_month(date) {
                    let candidate = self.end_of_day(last);
                    if candidate > t {
                        return candidate;
                    }
                }
                date = Self::next_month(date);
            },
            Interval::D1 => loop {
                if self.is_workday_date(date) {
                    let close = self.close_on(date);
                    if close > t {
                        return close;
                    }
                }
                date += Duration::days(1);
            },
            _ => {
                let duration = interval.duration();
                loop {
                    if self.is_workday_date(date) {
                        let open = self.open_on(date);
                        let close = self.close_on(date);
                        let steps = if t < open {
                            1.0
                        } else {
                            ((t - open) / duration).floor() + 1.0
                        };
                        let candidate = open + steps * duration;
                        if candidate <= close {
                            return candidate;
                        }
                    }
                    date += Duration::days(1);
                }
            }
        }
    }

    /// `(from, to]` 안의 모든 유효 타임스탬프를 오름차순으로 열거합니다.
    ///
    /// 결과는 인터벌별 청크 단위로 메모이즈됩니다.
    pub fn get_timestamps(&self, from: f64, to: f64, interval: Interval) -> Vec<f64> {
        if !from.is_finite() || !to.is_finite() {
            warn!(from, to, "무한 구간은 열거할 수 없음");
            return Vec::new();
        }
        if from >= to || !self.has_sessions(interval) {
            return Vec::new();
        }

        let chunk = chunk_size(interval);
        let ext_from = (from / chunk).floor() * chunk;
        let ext_to = (to / chunk).ceil() * chunk;

        self.cache
            .get_or_fill(interval, ext_from, ext_to, from, to, |s, e| {
                self.enumerate(s, e, interval)
            })
    }

    fn enumerate(&self, from: f64, to: f64, interval: Interval) -> Vec<f64> {
        let mut out = Vec::new();
        let mut t = self.next_timestamp(from, interval);
        while t <= to {
            out.push(t);
            t = self.next_timestamp(t, interval);
        }
        out
    }

    /// `t`에서 `n`개 인터벌 이동한 타임스탬프.
    ///
    /// 양수는 `t`보다 큰 `n`번째, 음수는 `t`보다 작은 `|n|`번째, 0은 `t` 그대로입니다.
    pub fn add_intervals(&self, t: f64, interval: Interval, n: i64) -> f64 {
        if n == 0 {
            return t;
        }
        if !self.has_sessions(interval) {
            return if n > 0 { f64::INFINITY } else { f64::NEG_INFINITY };
        }

        let want = n.unsigned_abs() as usize;
        let mut window = interval.duration() * want as f64 * 2.0;
        loop {
            if n > 0 {
                let stamps = self.get_timestamps(t, t + window, interval);
                if stamps.len() >= want {
                    return stamps[want - 1];
                }
            } else {
                let stamps: Vec<f64> = self
                    .get_timestamps(t - window, t, interval)
                    .into_iter()
                    .filter(|s| *s < t)
                    .collect();
                if stamps.len() >= want {
                    return stamps[stamps.len() - want];
                }
            }
            window *= 2.0;
        }
    }

    /// 메모이즈된 타임스탬프를 비웁니다.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

/// 열거 캐시 청크 크기: 일봉 이상 1000개, 그 외 4000개 인터벌.
pub fn chunk_size(interval: Interval) -> f64 {
    if interval.is_intraday() {
        4000.0 * interval.duration()
    } else {
        1000.0 * interval.duration()
    }
}

fn to_utc(t: f64) -> Option<DateTime<Utc>> {
    let secs = t.floor();
    let nanos = ((t - secs) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(secs as i64, nanos)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(tz: Tz, y: i32, m: u32, d: u32, h: u32, min: u32) -> f64 {
        tz.with_ymd_and_hms(y, m, d, h, min, 0).unwrap().timestamp() as f64
    }

    fn nyse() -> WorkCalendar {
        let schedule = WorkSchedule::from_hours("09:30", "16:00")
            .unwrap()
            .with_holidays(crate::calendar::holidays::nyse_holidays())
            .with_early_closes(crate::calendar::holidays::nyse_early_closes())
            .unwrap();
        WorkCalendar::new(chrono_tz::America::New_York, schedule)
    }

    #[test]
    fn test_workday() {
        let cal = nyse();
        let ny = cal.tz();
        // 2024-01-05 금요일
        assert!(cal.is_workday(ts(ny, 2024, 1, 5, 12, 0)));
        // 2024-01-06 토요일
        assert!(!cal.is_workday(ts(ny, 2024, 1, 6, 12, 0)));
        // 2024-01-15 MLK
        assert!(!cal.is_workday(ts(ny, 2024, 1, 15, 12, 0)));
        // 토요일 자정 정각은 금요일
        assert!(cal.is_workday(ts(ny, 2024, 1, 6, 0, 0)));
    }

    #[test]
    fn test_set_open_close() {
        let cal = nyse();
        let ny = cal.tz();
        let t = ts(ny, 2024, 1, 5, 12, 0);
        assert_eq!(cal.set_open(t).unwrap(), ts(ny, 2024, 1, 5, 9, 30));
        assert_eq!(cal.set_close(t).unwrap(), ts(ny, 2024, 1, 5, 16, 0));
        assert!(matches!(
            cal.set_close(ts(ny, 2024, 1, 6, 12, 0)),
            Err(CoreError::NotWorkday(_))
        ));

        // 크리스마스 이브 조기 폐장
        let eve = ts(ny, 2024, 12, 24, 10, 0);
        assert_eq!(cal.set_close(eve).unwrap(), ts(ny, 2024, 12, 24, 13, 0));
    }

    #[test]
    fn test_intraday_timestamps() {
        let cal = nyse();
        let ny = cal.tz();
        assert!(!cal.is_timestamp(ts(ny, 2024, 1, 5, 9, 30), Interval::M30));
        assert!(cal.is_timestamp(ts(ny, 2024, 1, 5, 10, 0), Interval::M30));
        assert!(cal.is_timestamp(ts(ny, 2024, 1, 5, 16, 0), Interval::M30));
        assert!(!cal.is_timestamp(ts(ny, 2024, 1, 5, 16, 30), Interval::M30));
        assert!(!cal.is_timestamp(ts(ny, 2024, 1, 5, 10, 15), Interval::M30));
        // 1시간봉은 개장 기준 정렬 (10:30, 11:30, ...)
        assert!(cal.is_timestamp(ts(ny, 2024, 1, 5, 10, 30), Interval::H1));
        assert!(!cal.is_timestamp(ts(ny, 2024, 1, 5, 11, 0), Interval::H1));
    }

    #[test]
    fn test_next_timestamp_skips_weekend() {
        let cal = nyse();
        let ny = cal.tz();
        let friday_close = ts(ny, 2024, 1, 5, 16, 0);
        assert_eq!(
            cal.next_timestamp(friday_close, Interval::M30),
            ts(ny, 2024, 1, 8, 10, 0)
        );
        assert_eq!(
            cal.next_timestamp(friday_close, Interval::D1),
            ts(ny, 2024, 1, 8, 16, 0)
        );
        // 휴장일(MLK) 건너뜀
        assert_eq!(
            cal.next_timestamp(ts(ny, 2024, 1, 12, 16, 0), Interval::D1),
            ts(ny, 2024, 1, 16, 16, 0)
        );
    }

    #[test]
    fn test_weekly_and_monthly() {
        let cal = nyse();
        let ny = cal.tz();
        let t = ts(ny, 2024, 3, 25, 12, 0);
        // 2024-03-29 성금요일 → 그 주 마지막 영업일은 목요일
        let week_end = cal.next_timestamp(t, Interval::W1);
        assert_eq!(week_end, ts(ny, 2024, 3, 29, 0, 0) - END_OF_DAY_EPSILON);
        assert!(cal.is_timestamp(week_end, Interval::W1));

        // 3월 마지막 영업일도 28일
        let month_end = cal.next_timestamp(t, Interval::MN1);
        assert_eq!(month_end, week_end);
        assert!(cal.is_timestamp(month_end, Interval::MN1));

        let april_end = cal.next_timestamp(month_end, Interval::MN1);
        assert_eq!(april_end, ts(ny, 2024, 5, 1, 0, 0) - END_OF_DAY_EPSILON);
    }

    #[test]
    fn test_dst_transition() {
        let cal = nyse();
        let ny = cal.tz();
        // 2024-03-08 금요일 (EST) → 2024-03-11 월요일 (EDT)
        let friday_close = ts(ny, 2024, 3, 8, 16, 0);
        let monday_close = cal.next_timestamp(friday_close, Interval::D1);
        assert_eq!(monday_close, ts(ny, 2024, 3, 11, 16, 0));
        assert_eq!(monday_close - friday_close, 3.0 * 86400.0 - 3600.0);
    }

    #[test]
    fn test_get_timestamps_and_add_intervals() {
        let cal = nyse();
        let ny = cal.tz();
        let from = ts(ny, 2024, 1, 5, 9, 0);
        let to = ts(ny, 2024, 1, 5, 12, 0);
        let stamps = cal.get_timestamps(from, to, Interval::M30);
        assert_eq!(stamps.len(), 5);
        assert_eq!(stamps[0], ts(ny, 2024, 1, 5, 10, 0));
        assert_eq!(stamps[4], to);

        assert_eq!(cal.add_intervals(to, Interval::M30, 0), to);
        assert_eq!(
            cal.add_intervals(to, Interval::M30, 9),
            ts(ny, 2024, 1, 8, 10, 0)
        );
        assert_eq!(
            cal.add_intervals(ts(ny, 2024, 1, 8, 10, 0), Interval::M30, -1),
            ts(ny, 2024, 1, 5, 16, 0)
        );
        assert_eq!(
            cal.add_intervals(ts(ny, 2024, 1, 8, 16, 0), Interval::D1, -5),
            ts(ny, 2023, 12, 29, 16, 0)
        );
    }

    #[test]
    fn test_full_day_schedule() {
        let schedule = WorkSchedule::from_hours("00:00", "24:00").unwrap();
        let cal = WorkCalendar::new(chrono_tz::UTC, schedule);
        // 2024-01-05 금요일 자정 종료 = 2024-01-06 00:00 UTC
        let close = 1_704_499_200.0;
        assert!(cal.is_timestamp(close, Interval::D1));
        assert!(cal.is_timestamp(close, Interval::H1));
        assert_eq!(cal.next_timestamp(close, Interval::H1), 1_704_675_600.0);
    }

    #[test]
    fn test_next_timestamp_beyond_representable_range() {
        let cal = nyse();
        assert_eq!(cal.next_timestamp(1e20, Interval::D1), f64::INFINITY);
        assert_eq!(cal.next_timestamp(1e20, Interval::MN1), f64::INFINITY);
        assert_eq!(cal.next_timestamp(f64::NAN, Interval::H1), f64::INFINITY);
    }
}
