//! 프로세스 전역 거래소 레지스트리.
//!
//! 첫 접근 시 내장 거래소로 초기화되며, 이후 `register`로 추가할 수 있습니다.
//! 등록된 거래소는 불변입니다.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use chrono_tz::Tz;
use tracing::{debug, warn};

use super::exchange::Exchange;
use super::security::SecurityKind;
use crate::calendar::{holidays, WorkCalendar, WorkSchedule};
use crate::error::{CoreError, CoreResult};

type Registry = RwLock<HashMap<String, Arc<Exchange>>>;

static REGISTRY: OnceLock<Registry> = OnceLock::new();

fn registry() -> &'static Registry {
    REGISTRY.get_or_init(|| {
        let exchanges = builtin_exchanges()
            .into_iter()
            .map(|e| (e.mic().to_string(), Arc::new(e)))
            .collect();
        RwLock::new(exchanges)
    })
}

/// MIC로 거래소를 조회합니다.
pub fn exchange(mic: &str) -> CoreResult<Arc<Exchange>> {
    let guard = registry().read().unwrap_or_else(PoisonError::into_inner);
    guard
        .get(&mic.to_uppercase())
        .cloned()
        .ok_or_else(|| CoreError::UnknownExchange(mic.to_string()))
}

/// 거래소를 등록합니다. 같은 MIC가 있으면 교체합니다.
pub fn register(exchange: Exchange) -> Arc<Exchange> {
    let exchange = Arc::new(exchange);
    let mut guard = registry().write().unwrap_or_else(PoisonError::into_inner);
    if guard
        .insert(exchange.mic().to_string(), Arc::clone(&exchange))
        .is_some()
    {
        warn!(mic = %exchange.mic(), "거래소 교체");
    } else {
        debug!(mic = %exchange.mic(), "거래소 등록");
    }
    exchange
}

/// 등록된 모든 거래소 (MIC 순).
pub fn exchanges() -> Vec<Arc<Exchange>> {
    let guard = registry().read().unwrap_or_else(PoisonError::into_inner);
    let mut all: Vec<_> = guard.values().cloned().collect();
    all.sort_by(|a, b| a.mic().cmp(b.mic()));
    all
}

fn builtin(mic: &str, name: &str, tz: Tz, open: &str, close: &str) -> CoreResult<Exchange> {
    let schedule = WorkSchedule::from_hours(open, close)?;
    let schedule = if tz == chrono_tz::America::New_York {
        schedule
            .with_holidays(holidays::nyse_holidays())
            .with_early_closes(holidays::nyse_early_closes())?
    } else {
        schedule
    };
    Ok(Exchange::new(mic, name, WorkCalendar::new(tz, schedule)))
}

fn builtin_exchanges() -> Vec<Exchange> {
    use SecurityKind::*;

    let specs = [
        ("XNYS", "New York Stock Exchange", chrono_tz::America::New_York, "09:30", "16:00"),
        ("XNAS", "Nasdaq", chrono_tz::America::New_York, "09:30", "16:00"),
        ("XETR", "Xetra", chrono_tz::Europe::Berlin, "09:00", "17:30"),
        ("XKRX", "Korea Exchange", chrono_tz::Asia::Seoul, "09:00", "15:30"),
        ("TEST", "Test Exchange", chrono_tz::UTC, "00:00", "24:00"),
    ];

    specs
        .into_iter()
        .filter_map(|(mic, name, tz, open, close)| match builtin(mic, name, tz, open, close) {
            Ok(exchange) => Some(exchange),
            Err(e) => {
                warn!(mic, error = %e, "내장 거래소 생성 실패");
                None
            }
        })
        .map(|exchange| match exchange.mic() {
            "XNYS" => exchange
                .with_listing("IBM", "International Business Machines", Stock)
                .with_listing("KO", "Coca-Cola", Stock)
                .with_listing("SPY", "SPDR S&P 500 ETF", Etf),
            "XNAS" => exchange
                .with_listing("AAPL", "Apple Inc.", Stock)
                .with_listing("MSFT", "Microsoft", Stock)
                .with_listing("QQQ", "Invesco QQQ", Etf),
            "XETR" => exchange
                .with_listing("SAP", "SAP SE", Stock)
                .with_listing("EXS1", "iShares Core DAX", Etf),
            "XKRX" => exchange.with_listing("005930", "삼성전자", Stock),
            "TEST" => exchange.with_listing("TEST1", "Test Security", Test),
            _ => exchange,
        })
        .collect()
}
