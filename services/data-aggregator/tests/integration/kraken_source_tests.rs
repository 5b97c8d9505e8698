//! Kraken source tests against a mock HTTP server

use crate::support::btc_usd;
use chrono::{DateTime, Duration, TimeZone, Utc};
use data_aggregator::{KrakenSource, MarketDataSource, TradeFetcher};
use rust_decimal_macros::dec;
use serde_json::json;
use services_common::{ServiceError, SourceEndpoint};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn since() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 12, 5, 13, 38, 0).unwrap()
}

fn source_for(server: &MockServer) -> KrakenSource {
    KrakenSource::new(SourceEndpoint::with_base_url(server.uri())).unwrap()
}

#[tokio::test]
async fn test_request_carries_pair_and_nanosecond_since() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/0/public/Trades"))
        .and(query_param("pair", "BTCUSD"))
        .and(query_param("since", "1638711480000000000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": [],
            "result": {
                "XXBTZUSD": [
                    ["42882.60000", "0.00068919", 1638711529.240554, "b", "l", "", 1],
                    ["42863.40000", "0.01666028", 1638711562.5, "s", "m", "", 2]
                ],
                "last": "1638711562500000000"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = source_for(&server)
        .get_recent_trades(&btc_usd(), since())
        .await
        .unwrap();

    assert_eq!(page.trades.len(), 2);
    assert_eq!(page.last.as_deref(), Some("1638711562500000000"));
    let first = page.trades.iter().find(|t| t.price == dec!(42882.6)).unwrap();
    assert_eq!(first.volume, dec!(0.00068919));
    assert_eq!(first.timestamp.timestamp(), 1_638_711_529);
}

#[tokio::test]
async fn test_http_error_is_data_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/0/public/Trades"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = source_for(&server).get_recent_trades(&btc_usd(), since()).await;

    let error = result.unwrap_err();
    assert!(matches!(error, ServiceError::DataUnavailable(_)));
    assert!(error.is_transient());
}

#[tokio::test]
async fn test_source_error_list_is_data_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/0/public/Trades"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": ["EAPI:Rate limit exceeded"]
        })))
        .mount(&server)
        .await;

    let result = source_for(&server).get_recent_trades(&btc_usd(), since()).await;

    match result {
        Err(ServiceError::DataUnavailable(message)) => {
            assert!(message.contains("Rate limit"));
        }
        other => panic!("expected DataUnavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn test_garbled_body_is_data_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/0/public/Trades"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let result = source_for(&server).get_recent_trades(&btc_usd(), since()).await;

    assert!(matches!(result, Err(ServiceError::DataUnavailable(_))));
}

#[tokio::test]
async fn test_fetcher_pages_through_http_source() {
    let server = MockServer::start().await;
    let until = since() + Duration::minutes(10);

    Mock::given(method("GET"))
        .and(path("/0/public/Trades"))
        .and(query_param("since", "1638711480000000000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": [],
            "result": {
                "XXBTZUSD": [["100.0", "1.0", 1638711490.0, "b", "l", "", 1]],
                "last": "1638711490000000000"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/0/public/Trades"))
        .and(query_param("since", "1638711490000000001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": [],
            "result": { "XXBTZUSD": [], "last": "1638711490000000000" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    // two requests, one pause between them
    let fetcher = TradeFetcher::new(source_for(&server));
    let series = fetcher.fetch(&btc_usd(), since(), until).await.unwrap();

    assert_eq!(series.len(), 1);
    assert_eq!(series.first().unwrap().price, dec!(100.0));
}
