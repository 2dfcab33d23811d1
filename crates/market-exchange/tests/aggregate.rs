//! 설정 기반 집계 프로바이더 구성.

use market_core::{AppConfig, CoreError, ManualClock};
use market_data::StorageFactory;
use market_exchange::{AggregateProvider, ExchangeError, PricingProvider};

#[tokio::test]
async fn test_default_config_builds_yahoo_with_stooq_fallback() {
    let config = AppConfig::default();
    let aggregate = AggregateProvider::from_config(&config, &StorageFactory::Memory, ManualClock::shared(0.0))
        .await
        .unwrap();

    assert_eq!(aggregate.primary().name(), "yahoo");
    let fallbacks: Vec<&str> = aggregate.fallbacks().iter().map(|p| p.name()).collect();
    assert_eq!(fallbacks, vec!["stooq"]);
}

#[tokio::test]
async fn test_polygon_requires_api_key() {
    let mut config = AppConfig::default();
    config.providers.primary = "polygon".to_string();
    config.providers.fallbacks = vec!["yahoo".to_string()];

    let err = AggregateProvider::from_config(&config, &StorageFactory::Memory, ManualClock::shared(0.0))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, ExchangeError::Core(CoreError::Config(_))));

    config.providers.polygon_api_key = Some("key".to_string());
    let aggregate = AggregateProvider::from_config(&config, &StorageFactory::Memory, ManualClock::shared(0.0))
        .await
        .unwrap();
    assert_eq!(aggregate.primary().name(), "polygon");
}

#[tokio::test]
async fn test_unknown_provider_name() {
    let mut config = AppConfig::default();
    config.providers.fallbacks = vec!["bloomberg".to_string()];

    let err = AggregateProvider::from_config(&config, &StorageFactory::Memory, ManualClock::shared(0.0))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, ExchangeError::Core(CoreError::Config(ref m)) if m.contains("bloomberg")));
}
