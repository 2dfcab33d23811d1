//! 내장 휴장일 테이블.
//!
//! 미국 시장(NYSE/NASDAQ)의 2023–2026년 휴장일과 13:00 조기 폐장일입니다.

use chrono::NaiveDate;

const NYSE_HOLIDAYS: &[(i32, u32, u32)] = &[
    // 2023
    (2023, 1, 2),
    (2023, 1, 16),
    (2023, 2, 20),
    (2023, 4, 7),
    (2023, 5, 29),
    (2023, 6, 19),
    (2023, 7, 4),
    (2023, 9, 4),
    (2023, 11, 23),
    (2023, 12, 25),
    // 2024
    (2024, 1, 1),
    (2024, 1, 15),
    (2024, 2, 19),
    (2024, 3, 29),
    (2024, 5, 27),
    (2024, 6, 19),
    (2024, 7, 4),
    (2024, 9, 2),
    (2024, 11, 28),
    (2024, 12, 25),
    // 2025
    (2025, 1, 1),
    (2025, 1, 9), // 카터 전 대통령 국장
    (2025, 1, 20),
    (2025, 2, 17),
    (2025, 4, 18),
    (2025, 5, 26),
    (2025, 6, 19),
    (2025, 7, 4),
    (2025, 9, 1),
    (2025, 11, 27),
    (2025, 12, 25),
    // 2026
    (2026, 1, 1),
    (2026, 1, 19),
    (2026, 2, 16),
    (2026, 4, 3),
    (2026, 5, 25),
    (2026, 6, 19),
    (2026, 7, 3), // 7/4 토요일 대체
    (2026, 9, 7),
    (2026, 11, 26),
    (2026, 12, 25),
];

const NYSE_EARLY_CLOSES: &[(i32, u32, u32)] = &[
    (2023, 7, 3),
    (2023, 11, 24),
    (2024, 7, 3),
    (2024, 11, 29),
    (2024, 12, 24),
    (2025, 7, 3),
    (2025, 11, 28),
    (2025, 12, 24),
    (2026, 11, 27),
    (2026, 12, 24),
];

/// 미국 조기 폐장 시각 (13:00).
pub const NYSE_EARLY_CLOSE_SECS: u32 = 13 * 3600;

fn to_dates(table: &'static [(i32, u32, u32)]) -> impl Iterator<Item = NaiveDate> {
    table
        .iter()
        .filter_map(|&(y, m, d)| NaiveDate::from_ymd_opt(y, m, d))
}

/// NYSE 휴장일.
pub fn nyse_holidays() -> impl Iterator<Item = NaiveDate> {
    to_dates(NYSE_HOLIDAYS)
}

/// NYSE 조기 폐장일과 폐장 시각.
pub fn nyse_early_closes() -> impl Iterator<Item = (NaiveDate, u32)> {
    to_dates(NYSE_EARLY_CLOSES).map(|d| (d, NYSE_EARLY_CLOSE_SECS))
}
