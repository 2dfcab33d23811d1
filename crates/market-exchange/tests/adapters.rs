//! HTTP 어댑터 통합 테스트 (mockito 서버).

use std::sync::Arc;

use market_core::{BackoffConfig, HttpConfig, Interval, ManualClock, Security, SharedClock};
use market_data::StorageFactory;
use market_exchange::{
    BackoffSupervisor, CachedProvider, DataProvider, ExchangeError, HttpClient, MarketSource, NewsProvider,
    PolygonSource, PricingOptions, PricingProvider, StooqSource, YahooSource,
};
use mockito::Matcher;

// 2024-01-05 (금) 12:00 UTC
const NOW: f64 = 1_704_456_000.0;
// 2024-01-03 09:30 EST
const OPEN_0103: f64 = 1_704_292_200.0;

fn clock() -> SharedClock {
    ManualClock::shared(NOW)
}

fn http(name: &str, clock: &SharedClock) -> HttpClient {
    let supervisor = BackoffSupervisor::shared(name, BackoffConfig::default(), clock.clone());
    HttpClient::new(HttpConfig::default(), supervisor).unwrap()
}

async fn cached<S: MarketSource + 'static>(source: S, clock: SharedClock) -> CachedProvider<S> {
    CachedProvider::with_factory(source, &StorageFactory::Memory, clock, 86_400.0)
        .await
        .unwrap()
}

fn ibm() -> Security {
    Security::lookup("XNYS", "IBM").unwrap()
}

#[tokio::test]
async fn test_yahoo_hourly_bars_shifted_to_bar_end() {
    let mut server = mockito::Server::new_async().await;
    let body = serde_json::json!({
        "chart": {
            "result": [{
                "meta": {"firstTradeDate": -252322200},
                "timestamp": [OPEN_0103 as i64, OPEN_0103 as i64 + 3600, OPEN_0103 as i64 + 7200, OPEN_0103 as i64 + 10800],
                "indicators": {"quote": [{
                    "open":   [160.0, 161.0, 162.0, null],
                    "high":   [161.0, 162.0, 163.0, null],
                    "low":    [159.0, 160.0, 161.0, null],
                    "close":  [161.0, 162.0, 163.0, null],
                    "volume": [1000, 2000, 3000, null]
                }]}
            }],
            "error": null
        }
    });
    let chart = server
        .mock("GET", "/v8/finance/chart/IBM")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("interval".into(), "60m".into()),
            Matcher::UrlEncoded("includePrePost".into(), "false".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .expect(1)
        .create_async()
        .await;

    let clock = clock();
    let provider = cached(YahooSource::with_base_url(http("yahoo", &clock), server.url()), clock).await;
    let ibm = ibm();
    let (from, to) = (OPEN_0103 - 1_800.0, OPEN_0103 + 4.0 * 3_600.0);

    let bars = provider
        .get_pricing(from, to, &ibm, Interval::H1, PricingOptions::default())
        .await
        .unwrap();
    let times: Vec<f64> = bars.iter().map(|b| b.t).collect();
    assert_eq!(times, vec![1_704_295_800.0, 1_704_299_400.0, 1_704_303_000.0]);
    assert_eq!(bars[0].open, 160.0);

    // 두 번째 호출은 캐시에서
    let again = provider
        .get_pricing(from, to, &ibm, Interval::H1, PricingOptions::default())
        .await
        .unwrap();
    assert_eq!(again, bars);
    chart.assert_async().await;
}

#[tokio::test]
async fn test_yahoo_error_body() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v8/finance/chart/IBM")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#)
        .create_async()
        .await;

    let clock = clock();
    let source = YahooSource::with_base_url(http("yahoo", &clock), server.url());
    let err = source
        .get_pricing_raw(OPEN_0103, OPEN_0103 + 3_600.0, &ibm(), Interval::H1)
        .await
        .unwrap_err();
    assert!(matches!(err, ExchangeError::BadResponse { .. }));
}

#[tokio::test]
async fn test_polygon_hours_folded_from_five_minutes() {
    let mut server = mockito::Server::new_async().await;
    let results: Vec<serde_json::Value> = (0..24)
        .map(|i| {
            let p = 100.0 + i as f64;
            serde_json::json!({
                "t": (OPEN_0103 as i64 + i * 300) * 1000,
                "o": p, "h": p + 1.0, "l": p - 1.0, "c": p, "v": 10.0
            })
        })
        .collect();
    let aggs = server
        .mock(
            "GET",
            Matcher::Regex(r"^/v2/aggs/ticker/IBM/range/5/minute/\d+/\d+$".to_string()),
        )
        .match_query(Matcher::UrlEncoded("apiKey".into(), "secret".into()))
        .with_status(200)
        .with_body(serde_json::json!({"status": "OK", "results": results}).to_string())
        .expect(1)
        .create_async()
        .await;

    let clock = clock();
    let source = PolygonSource::with_base_url(http("polygon", &clock), "secret", server.url());
    let provider = cached(source, clock).await;

    let bars = provider
        .get_pricing(OPEN_0103, OPEN_0103 + 2.0 * 3_600.0, &ibm(), Interval::H1, PricingOptions::default())
        .await
        .unwrap();

    assert_eq!(bars.len(), 2);
    assert_eq!(bars[0].t, 1_704_295_800.0);
    assert_eq!(
        (bars[0].open, bars[0].high, bars[0].low, bars[0].close, bars[0].volume),
        (100.0, 112.0, 99.0, 111.0, 120.0)
    );
    assert_eq!(bars[1].t, 1_704_299_400.0);
    assert_eq!(
        (bars[1].open, bars[1].high, bars[1].low, bars[1].close, bars[1].volume),
        (112.0, 124.0, 111.0, 123.0, 120.0)
    );
    aggs.assert_async().await;
}

#[tokio::test]
async fn test_polygon_news_and_ticker_details() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v2/reference/news")
        .match_query(Matcher::UrlEncoded("ticker".into(), "IBM".into()))
        .with_status(200)
        .with_body(
            r#"{"results": [
                {"published_utc": "2024-01-03T15:00:00Z", "title": "first", "description": "a"},
                {"published_utc": "2024-01-03T18:30:00Z", "title": "second"}
            ]}"#,
        )
        .expect(1)
        .create_async()
        .await;
    let details = server
        .mock("GET", "/v3/reference/tickers/IBM")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            r#"{"results": {
                "market_cap": 150000000000.0,
                "description": "International Business Machines",
                "share_class_shares_outstanding": 910000000,
                "list_date": "1962-01-02"
            }}"#,
        )
        .expect(4)
        .create_async()
        .await;

    let clock = clock();
    let source = PolygonSource::with_base_url(http("polygon", &clock), "secret", server.url());
    let provider = cached(source, clock).await;
    let ibm = ibm();

    let news = provider
        .get_news(1_704_240_000.0, 1_704_326_400.0, &ibm)
        .await
        .unwrap();
    let titles: Vec<&str> = news.iter().map(|n| n.title.as_str()).collect();
    assert_eq!(titles, vec!["first", "second"]);
    assert_eq!(news[0].t, 1_704_294_000.0);
    assert_eq!(news[1].body, "");

    assert_eq!(provider.get_market_cap(&ibm).await.unwrap(), 1.5e11);
    assert_eq!(provider.get_market_cap(&ibm).await.unwrap(), 1.5e11);
    assert_eq!(provider.get_summary(&ibm).await.unwrap(), "International Business Machines");
    assert_eq!(provider.get_outstanding_parts(&ibm).await.unwrap(), 9.1e8);
    // 1962-01-02 09:30 EST
    assert_eq!(provider.get_first_trade_time(&ibm).await.unwrap(), -252_322_200.0);
    details.assert_async().await;
}

#[tokio::test]
async fn test_polygon_rejects_other_exchanges() {
    let clock = clock();
    let source = PolygonSource::with_base_url(http("polygon", &clock), "secret", "http://127.0.0.1:9");
    let sap = Security::lookup("XETR", "SAP").unwrap();
    let err = source.get_market_cap(&sap).await.unwrap_err();
    assert!(err.is_not_supported());
}

#[tokio::test]
async fn test_stooq_daily_csv() {
    let mut server = mockito::Server::new_async().await;
    let csv = server
        .mock("GET", "/q/d/l/")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("s".into(), "ibm.us".into()),
            Matcher::UrlEncoded("i".into(), "d".into()),
        ]))
        .with_status(200)
        .with_body(
            "Date,Open,High,Low,Close,Volume\n\
             2024-01-02,162.8,163.2,161.0,163.0,4000000\n\
             2024-01-03,162.9,163.0,160.9,161.5,3800000\n\
             2024-01-04,161.3,163.7,161.1,162.9,4100000\n",
        )
        .expect(1)
        .create_async()
        .await;

    let clock = clock();
    let provider = cached(StooqSource::with_base_url(http("stooq", &clock), server.url()), clock).await;

    // 2024-01-01 00:00 UTC ~ 현재
    let bars = provider
        .get_pricing(1_704_067_200.0, NOW, &ibm(), Interval::D1, PricingOptions::default())
        .await
        .unwrap();
    let times: Vec<f64> = bars.iter().map(|b| b.t).collect();
    // 각 날짜의 16:00 EST 폐장
    assert_eq!(times, vec![1_704_229_200.0, 1_704_315_600.0, 1_704_402_000.0]);
    assert_eq!(bars[1].close, 161.5);
    csv.assert_async().await;

    let samsung = Security::lookup("XKRX", "005930").unwrap();
    let err = provider
        .get_pricing(1_704_067_200.0, NOW, &samsung, Interval::D1, PricingOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_not_supported());
}

#[tokio::test]
async fn test_rate_limit_surfaces_backoff_pending() {
    let mut server = mockito::Server::new_async().await;
    let limited = server
        .mock("GET", "/q/d/l/")
        .match_query(Matcher::Any)
        .with_status(429)
        .expect(1)
        .create_async()
        .await;

    let clock = clock();
    let http = http("stooq", &clock);
    let supervisor: Arc<BackoffSupervisor> = http.supervisor().clone();
    let source = StooqSource::with_base_url(http, server.url());

    for _ in 0..2 {
        let err = source
            .get_pricing_raw(1_704_067_200.0, NOW, &ibm(), Interval::D1)
            .await
            .unwrap_err();
        match err {
            ExchangeError::BackoffPending { remaining, last_error } => {
                assert_eq!(remaining, 60.0);
                assert!(last_error.is_rate_limited());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
    // 대기 중인 두 번째 호출은 요청하지 않음
    let metrics = supervisor.metrics().await;
    assert_eq!((metrics.trips, metrics.blocked), (1, 1));
    limited.assert_async().await;
}
