//! Tests for paged trade retrieval

use crate::support::{ScriptedSource, base_time, btc_usd, trade_at};
use chrono::Duration;
use data_aggregator::TradeFetcher;
use pretty_assertions::assert_eq;
use services_common::{PAGE_REQUEST_DELAY_SECS, ServiceError};
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_overlapping_pages_are_deduplicated() {
    let base = base_time();
    let source = ScriptedSource::new();
    source
        .push_page(vec![
            trade_at(base, 10, "100.0", "1.0"),
            trade_at(base, 0, "99.0", "1.0"),
            trade_at(base, 20, "101.0", "1.0"),
        ])
        .push_page(vec![
            trade_at(base, 20, "555.0", "9.0"),
            trade_at(base, 30, "102.0", "1.0"),
            trade_at(base, 40, "103.0", "1.0"),
        ]);
    let fetcher = TradeFetcher::new(source);

    let series = fetcher
        .fetch(&btc_usd(), base, base + Duration::seconds(300))
        .await
        .unwrap();

    let offsets: Vec<i64> = series
        .iter()
        .map(|trade| (trade.timestamp - base).num_seconds())
        .collect();
    assert_eq!(offsets, vec![0, 10, 20, 30, 40]);
    // first page's copy of the overlapping trade is kept
    assert_eq!(series.as_slice()[2].price.to_string(), "101.0");
    for pair in series.as_slice().windows(2) {
        assert!(pair[0].timestamp < pair[1].timestamp);
    }
}

#[tokio::test(start_paused = true)]
async fn test_cursor_advances_past_latest_trade() {
    let base = base_time();
    let source = ScriptedSource::new();
    source
        .push_page(vec![trade_at(base, 5, "1", "1"), trade_at(base, 20, "1", "1")])
        .push_page(vec![trade_at(base, 40, "1", "1")]);
    let fetcher = TradeFetcher::new(source);

    fetcher
        .fetch(&btc_usd(), base, base + Duration::seconds(300))
        .await
        .unwrap();

    let one_ns = Duration::nanoseconds(1);
    assert_eq!(
        fetcher.source().requests(),
        vec![
            base,
            base + Duration::seconds(20) + one_ns,
            base + Duration::seconds(40) + one_ns,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_stops_once_cursor_passes_until() {
    let base = base_time();
    let source = ScriptedSource::new();
    source
        .push_page(vec![trade_at(base, 30, "1", "1"), trade_at(base, 60, "1", "1")])
        .push_page(vec![trade_at(base, 90, "1", "1")]);
    let fetcher = TradeFetcher::new(source);

    let series = fetcher
        .fetch(&btc_usd(), base, base + Duration::seconds(60))
        .await
        .unwrap();

    assert_eq!(fetcher.source().requests().len(), 1);
    assert_eq!(series.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_quiet_window_yields_empty_series() {
    let base = base_time();
    let fetcher = TradeFetcher::new(ScriptedSource::new());

    let series = fetcher
        .fetch(&btc_usd(), base, base + Duration::seconds(600))
        .await
        .unwrap();

    assert!(series.is_empty());
    assert_eq!(fetcher.source().requests(), vec![base]);
}

#[tokio::test(start_paused = true)]
async fn test_page_ceiling_bounds_requests() {
    let base = base_time();
    let source = ScriptedSource::new();
    for i in 0..5 {
        source.push_page(vec![trade_at(base, i * 10, "1", "1")]);
    }
    let fetcher = TradeFetcher::new(source).with_max_pages(2);

    let series = fetcher
        .fetch(&btc_usd(), base, base + Duration::seconds(3600))
        .await
        .unwrap();

    assert_eq!(fetcher.source().requests().len(), 2);
    assert_eq!(series.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_source_error_aborts_fetch() {
    let base = base_time();
    let source = ScriptedSource::new();
    source
        .push_page(vec![trade_at(base, 10, "1", "1")])
        .push_error("rate limited");
    let fetcher = TradeFetcher::new(source);

    let result = fetcher
        .fetch(&btc_usd(), base, base + Duration::seconds(300))
        .await;

    match result {
        Err(ServiceError::DataUnavailable(message)) => assert_eq!(message, "rate limited"),
        other => panic!("expected DataUnavailable, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_delay_only_between_requests() {
    let base = base_time();
    let source = ScriptedSource::new();
    source
        .push_page(vec![trade_at(base, 10, "1", "1")])
        .push_page(vec![trade_at(base, 20, "1", "1")]);
    let fetcher = TradeFetcher::new(source);
    let delay = std::time::Duration::from_secs(PAGE_REQUEST_DELAY_SECS);
    let started = Instant::now();

    fetcher
        .fetch(&btc_usd(), base, base + Duration::seconds(300))
        .await
        .unwrap();

    // three requests, two pauses
    assert_eq!(fetcher.source().requests().len(), 3);
    let elapsed = started.elapsed();
    assert!(elapsed >= delay * 2);
    assert!(elapsed < delay * 3);
}

#[tokio::test(start_paused = true)]
async fn test_single_request_fetch_does_not_pause() {
    let base = base_time();
    let source = ScriptedSource::new();
    source.push_page(vec![trade_at(base, 60, "1", "1")]);
    let fetcher = TradeFetcher::new(source);
    let started = Instant::now();

    fetcher
        .fetch(&btc_usd(), base, base + Duration::seconds(60))
        .await
        .unwrap();

    assert_eq!(fetcher.source().requests().len(), 1);
    assert!(started.elapsed() < std::time::Duration::from_secs(PAGE_REQUEST_DELAY_SECS));
}

#[tokio::test(start_paused = true)]
async fn test_empty_window_is_rejected() {
    let base = base_time();
    let fetcher = TradeFetcher::new(ScriptedSource::new());

    let result = fetcher.fetch(&btc_usd(), base, base).await;

    assert!(matches!(result, Err(ServiceError::InvalidRequest(_))));
    assert!(fetcher.source().requests().is_empty());
}
