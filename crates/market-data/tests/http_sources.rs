//! HTTP-level tests for the source adapters and the service failover path.
//!
//! Each test talks to local wiremock servers. Interval-limited sources are
//! called at most once per test so no rate limiter sleep is involved.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use xrpwatch_market_data::{
    BinanceSource, CoinGeckoSource, CryptoCompareSource, HistoryPeriod, MarketDataConfig,
    MarketDataError, MarketDataService, MarketDataSource, SourceSettings, SYNTHETIC_SOURCE,
};

const TIMEOUT: Duration = Duration::from_secs(5);

/// Config with every source disabled, pointing nowhere.
fn isolated_config() -> MarketDataConfig {
    let mut config = MarketDataConfig::default();
    config.sources.coingecko.enabled = false;
    config.sources.binance.enabled = false;
    config.sources.cryptocompare.enabled = false;
    config.sources.binance.backup_url = None;
    config
}

fn ticker_body() -> serde_json::Value {
    json!({
        "symbol": "XRPUSDT",
        "priceChange": "0.03380000",
        "priceChangePercent": "1.200",
        "lastPrice": "2.85000000",
        "highPrice": "2.90000000",
        "lowPrice": "2.78000000",
        "quoteVolume": "9000000000.00",
        "closeTime": 1700000000000i64
    })
}

#[tokio::test]
async fn test_coingecko_price_through_service() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/simple/price"))
        .and(query_param("ids", "ripple"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ripple": {
                "usd": 2.85,
                "usd_market_cap": 162000000000.0,
                "usd_24h_vol": 9000000000.0,
                "usd_24h_change": 1.2,
                "last_updated_at": 1700000000
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = isolated_config();
    config.sources.coingecko.enabled = true;
    config.sources.coingecko.base_url = server.uri();
    let service = MarketDataService::new(config);

    let price = service.get_current_price().await;
    assert!(price.is_real());
    assert_eq!(price.source(), "COINGECKO");
    assert_eq!(price.data().usd, 2.85);
    assert_eq!(price.data().usd_24h_change, 1.2);
    assert_eq!(price.data().last_updated_at, 1_700_000_000);
    assert!(price.data().usd_24h_high.is_some());

    // Served from cache: the mock expects exactly one request.
    let again = service.get_current_price().await;
    assert_eq!(again, price);
}

#[tokio::test]
async fn test_coingecko_market_chart_history() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/coins/ripple/market_chart"))
        .and(query_param("days", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "prices": [
                [1700003600000i64, 2.85],
                [1700000000000i64, 2.80],
                [1700007200000i64, null],
                [1700000000000i64, 2.81]
            ]
        })))
        .mount(&server)
        .await;

    let source = CoinGeckoSource::new(&SourceSettings::new(server.uri(), 1), "ripple", TIMEOUT);
    let raw = source
        .fetch_history(&server.uri(), HistoryPeriod::Week)
        .await
        .unwrap();
    assert_eq!(raw.points.len(), 4);

    let mut config = isolated_config();
    config.sources.coingecko.enabled = true;
    config.sources.coingecko.base_url = server.uri();
    let service = MarketDataService::new(config);

    let history = service.get_historical_data(HistoryPeriod::Week).await;
    assert!(history.is_real());
    let prices: Vec<(i64, f64)> = history
        .data()
        .prices
        .iter()
        .map(|p| (p.timestamp(), p.price()))
        .collect();
    assert_eq!(
        prices,
        vec![(1_700_000_000_000, 2.81), (1_700_003_600_000, 2.85)]
    );
}

#[tokio::test]
async fn test_binance_backup_after_primary_error() {
    let primary = MockServer::start().await;
    let backup = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v3/ticker/24hr"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&primary)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/ticker/24hr"))
        .and(query_param("symbol", "XRPUSDT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ticker_body()))
        .expect(1)
        .mount(&backup)
        .await;

    let mut config = isolated_config();
    config.sources.binance = SourceSettings::new(primary.uri(), 2).with_backup(backup.uri());
    let service = MarketDataService::new(config);

    let price = service.get_current_price().await;
    assert!(price.is_real());
    assert_eq!(price.source(), "BINANCE");
    assert_eq!(price.data().usd, 2.85);
    assert_eq!(price.data().usd_24h_high, Some(2.9));
    assert_eq!(price.data().usd_24h_low, Some(2.78));
    assert_eq!(price.data().last_updated_at, 1_700_000_000);

    let health = service.source_health();
    assert_eq!(health.len(), 1);
    assert_eq!(health[0].total_failures, 1);
    assert_eq!(health[0].consecutive_failures, 0);
}

#[tokio::test]
async fn test_slow_primary_times_out_and_fails_over() {
    let coingecko = MockServer::start().await;
    let binance = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/simple/price"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "ripple": { "usd": 9.99 } }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&coingecko)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/ticker/24hr"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ticker_body()))
        .expect(1)
        .mount(&binance)
        .await;

    let mut config = isolated_config();
    config.timeout = Duration::from_millis(300);
    config.sources.coingecko.enabled = true;
    config.sources.coingecko.base_url = coingecko.uri();
    config.sources.binance = SourceSettings::new(binance.uri(), 2);
    let service = MarketDataService::new(config);

    let price = service.get_current_price().await;
    assert!(price.is_real());
    assert_eq!(price.source(), "BINANCE");
    assert_eq!(price.data().usd, 2.85);

    let health = service.source_health();
    let coingecko_health = health
        .iter()
        .find(|h| h.source == "COINGECKO")
        .expect("coingecko health");
    assert_eq!(coingecko_health.consecutive_failures, 1);
    assert_eq!(
        coingecko_health.last_error.as_deref(),
        Some("Timeout: COINGECKO")
    );
}

#[tokio::test]
async fn test_refused_connection_is_network_error() {
    // Nothing listens on port 1.
    let url = "http://127.0.0.1:1";
    let source = BinanceSource::new(&SourceSettings::new(url, 2), "XRPUSDT", TIMEOUT);
    let err = source.fetch_price(url).await.unwrap_err();

    assert!(matches!(err, MarketDataError::Network(_)), "got {:?}", err);
    assert!(!err.is_rate_limited());
}

#[tokio::test]
async fn test_binance_429_is_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/ticker/24hr"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let source = BinanceSource::new(&SourceSettings::new(server.uri(), 2), "XRPUSDT", TIMEOUT);
    let err = source.fetch_price(&server.uri()).await.unwrap_err();

    assert!(matches!(err, MarketDataError::RateLimited { .. }));
    assert!(err.is_rate_limited());
}

#[tokio::test]
async fn test_binance_klines_history() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/klines"))
        .and(query_param("interval", "1h"))
        .and(query_param("limit", "168"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            [1700000000000i64, "2.80", "2.86", "2.79", "2.84", "1000", 1700003599999i64],
            [1700003600000i64, "2.84", "2.90", "2.83", "2.88", "1000", 1700007199999i64]
        ])))
        .mount(&server)
        .await;

    let source = BinanceSource::new(&SourceSettings::new(server.uri(), 2), "XRPUSDT", TIMEOUT);
    let raw = source
        .fetch_history(&server.uri(), HistoryPeriod::Week)
        .await
        .unwrap();

    assert_eq!(raw.points.len(), 2);
    assert_eq!(raw.points[1].price, Some(2.88));
}

#[tokio::test]
async fn test_cryptocompare_in_band_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/pricemultifull"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Response": "Error",
            "Message": "You are over your rate limit please upgrade your account!"
        })))
        .mount(&server)
        .await;

    let source =
        CryptoCompareSource::new(&SourceSettings::new(server.uri(), 3), "XRP", TIMEOUT);
    let err = source.fetch_price(&server.uri()).await.unwrap_err();

    match err {
        MarketDataError::ProviderError { message, .. } => {
            assert!(message.contains("rate limit"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_cryptocompare_market_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/pricemultifull"))
        .and(query_param("fsyms", "XRP"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "RAW": {
                "XRP": {
                    "USD": {
                        "PRICE": 2.85,
                        "CHANGE24HOUR": 0.034,
                        "CHANGEPCT24HOUR": 1.2,
                        "VOLUME24HOURTO": 9000000000.0,
                        "MKTCAP": 162000000000.0,
                        "HIGH24HOUR": 2.9,
                        "LOW24HOUR": 2.8,
                        "SUPPLY": 99987000000.0,
                        "CIRCULATINGSUPPLY": 57000000000.0,
                        "LASTUPDATE": 1700000000
                    }
                }
            }
        })))
        .mount(&server)
        .await;

    let mut config = isolated_config();
    config.sources.cryptocompare.enabled = true;
    config.sources.cryptocompare.base_url = server.uri();
    let service = MarketDataService::new(config);

    let market = service.get_market_data().await;
    assert!(market.is_real());
    assert_eq!(market.source(), "CRYPTOCOMPARE");
    assert_eq!(market.data().current_price, 2.85);
    assert_eq!(market.data().circulating_supply, 57e9);
    assert!(market.data().is_well_formed());
}

#[tokio::test]
async fn test_every_source_down_degrades_to_synthetic() {
    let coingecko = MockServer::start().await;
    let binance = MockServer::start().await;
    let cryptocompare = MockServer::start().await;
    for server in [&coingecko, &binance, &cryptocompare] {
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(server)
            .await;
    }

    let mut config = MarketDataConfig::default();
    config.sources.coingecko.base_url = coingecko.uri();
    config.sources.binance = SourceSettings::new(binance.uri(), 2);
    config.sources.cryptocompare.base_url = cryptocompare.uri();
    let service = MarketDataService::new(config);

    let price = service.get_current_price().await;
    assert!(price.is_synthetic());
    assert_eq!(price.source(), SYNTHETIC_SOURCE);
    assert!(price.data().is_well_formed());

    let health = service.source_health();
    assert_eq!(health.len(), 3);
    assert!(health.iter().all(|h| h.consecutive_failures == 1));
}
