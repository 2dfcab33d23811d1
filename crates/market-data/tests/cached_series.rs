//! 시계열 캐시 래퍼 테스트

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::{ready, Ready};
use market_core::{ManualClock, Span};
use market_data::{CachedSeries, DataError, MemorySeriesStore, SeriesPolicy, SeriesStore};

type Calls = Arc<Mutex<Vec<(f64, f64)>>>;

const DAY: f64 = 86_400.0;
const DAY0: f64 = 19_700.0 * DAY;

/// `(start, end]` 안의 1분 격자.
fn grid(start: f64, end: f64) -> Vec<f64> {
    let mut t = (start / 60.0).floor() * 60.0 + 60.0;
    let mut out = Vec::new();
    while t <= end {
        out.push(t);
        t += 60.0;
    }
    out
}

fn fetcher(calls: &Calls) -> impl Fn(f64, f64) -> Ready<Result<Vec<f64>, DataError>> {
    let calls = calls.clone();
    move |start, end| {
        calls.lock().unwrap().push((start, end));
        ready(Ok(grid(start, end)))
    }
}

fn memory_store() -> Arc<dyn SeriesStore<f64>> {
    Arc::new(MemorySeriesStore::new())
}

#[tokio::test]
async fn test_live_tail_refresh() {
    let now = DAY0 + 36_000.0;
    let clock = ManualClock::shared(now);
    let store = memory_store();
    let cache = CachedSeries::new(
        SeriesPolicy::with_store(|_: &()| "live".to_string(), store.clone())
            .fixed_chunk(DAY)
            .should_refresh(|start, end, _| end - start > 1.0),
        clock.clone(),
    );
    let calls = Calls::default();

    // 첫 호출: 현재 청크 하나를 조회
    let items = cache
        .get(now - 3_600.0, f64::INFINITY, &(), fetcher(&calls))
        .await
        .unwrap();
    assert_eq!(items.len(), 60);
    assert_eq!(*calls.lock().unwrap(), vec![(DAY0, now)]);

    // 바로 다시: 조회 없음
    cache
        .get(now - 3_600.0, f64::INFINITY, &(), fetcher(&calls))
        .await
        .unwrap();
    assert_eq!(calls.lock().unwrap().len(), 1);

    // 갱신 조건 미충족: 꼬리를 건너뜀
    clock.advance(0.5);
    cache
        .get(now - 3_600.0, f64::INFINITY, &(), fetcher(&calls))
        .await
        .unwrap();
    assert_eq!(calls.lock().unwrap().len(), 1);
    assert_eq!(cache.stats().snapshot().skipped_live_tails, 1);

    // 1초 이상 지나면 청크 시작부터 한 번 갱신
    clock.advance(60.0);
    let items = cache
        .get(now - 3_600.0, f64::INFINITY, &(), fetcher(&calls))
        .await
        .unwrap();
    assert_eq!(calls.lock().unwrap().len(), 2);
    assert_eq!(calls.lock().unwrap()[1], (DAY0, now + 60.5));
    assert_eq!(items.len(), 61);
    assert_eq!(items.last().copied(), Some(now + 60.0));
    assert_eq!(store.spans("live").await.unwrap(), vec![Span::new(DAY0, now + 60.5)]);

    let stats = cache.stats().snapshot();
    assert_eq!(stats.fetches, 2);
    assert_eq!(stats.served_items, 60 + 60 + 60 + 61);
}

#[tokio::test]
async fn test_chunk_extension_serves_neighbours() {
    let clock = ManualClock::shared(DAY0 + 36_000.0);
    let cache = CachedSeries::new(
        SeriesPolicy::with_store(|_: &()| "k".to_string(), memory_store()).fixed_chunk(DAY),
        clock,
    );
    let calls = Calls::default();

    let first = cache
        .get(DAY0 - 50_000.0, DAY0 - 40_000.0, &(), fetcher(&calls))
        .await
        .unwrap();
    assert_eq!(*calls.lock().unwrap(), vec![(DAY0 - DAY, DAY0)]);
    assert!(first.iter().all(|t| *t > DAY0 - 50_000.0 && *t <= DAY0 - 40_000.0));

    // 같은 청크 안의 다른 창은 캐시에서
    let second = cache
        .get(DAY0 - 30_000.0, DAY0 - 20_000.0, &(), fetcher(&calls))
        .await
        .unwrap();
    assert_eq!(calls.lock().unwrap().len(), 1);
    assert_eq!(second.first().copied(), Some(DAY0 - 30_000.0 + 60.0));
}

#[tokio::test]
async fn test_live_delay_limits_horizon() {
    let now = DAY0 + 36_000.0;
    let cache = CachedSeries::new(
        SeriesPolicy::with_store(|_: &()| "k".to_string(), memory_store())
            .live_delay(|_| 900.0),
        ManualClock::shared(now),
    );
    let calls = Calls::default();

    let items = cache
        .get(now - 3_600.0, now, &(), fetcher(&calls))
        .await
        .unwrap();
    assert_eq!(*calls.lock().unwrap(), vec![(now - 3_600.0, now - 900.0)]);
    assert_eq!(items.last().copied(), Some(now - 900.0));
}

#[tokio::test]
async fn test_error_keeps_partial_progress() {
    let store = memory_store();
    store.set("k", 100.0, 200.0, vec![150.0]).await.unwrap();
    let cache = CachedSeries::new(
        SeriesPolicy::with_store(|_: &()| "k".to_string(), store.clone()),
        ManualClock::shared(1_000.0),
    );

    let failing = |start: f64, end: f64| {
        ready(if start >= 200.0 {
            Err(DataError::InvalidData("upstream down".to_string()))
        } else {
            Ok(vec![start + 1.0, end])
        })
    };
    let err = cache.get(0.0, 300.0, &(), failing).await.unwrap_err();
    assert!(matches!(err, DataError::InvalidData(_)));

    // 실패 전 구간은 유지
    assert_eq!(
        store.missing_spans("k", 0.0, 300.0).await.unwrap(),
        vec![Span::new(200.0, 300.0)]
    );

    // 다음 호출은 남은 구간만 조회
    let calls = Calls::default();
    let items = cache.get(0.0, 300.0, &(), fetcher(&calls)).await.unwrap();
    assert_eq!(*calls.lock().unwrap(), vec![(200.0, 300.0)]);
    assert_eq!(items[..3], [1.0, 100.0, 150.0]);
}

#[tokio::test]
async fn test_concurrent_callers_fetch_once() {
    let cache = Arc::new(CachedSeries::new(
        SeriesPolicy::with_store(|key: &String| key.clone(), memory_store()),
        ManualClock::shared(10_000.0),
    ));
    let calls = Calls::default();

    let slow = |calls: Calls| {
        move |start: f64, end: f64| {
            let calls = calls.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                calls.lock().unwrap().push((start, end));
                Ok::<_, DataError>(grid(start, end))
            }
        }
    };

    let key = "IBM".to_string();
    let (a, b) = tokio::join!(
        cache.get(0.0, 6_000.0, &key, slow(calls.clone())),
        cache.get(0.0, 6_000.0, &key, slow(calls.clone())),
    );
    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(calls.lock().unwrap().len(), 1);

    // 다른 키는 별도 조회
    let other = "KO".to_string();
    cache
        .get(0.0, 6_000.0, &other, slow(calls.clone()))
        .await
        .unwrap();
    assert_eq!(calls.lock().unwrap().len(), 2);
}
