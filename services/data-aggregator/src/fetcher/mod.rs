//! Historical trade retrieval
//!
//! The fetcher pages through a [`MarketDataSource`] one request at a time,
//! pausing between requests to stay inside the source's quota.

pub mod kraken;

pub use kraken::KrakenSource;

use crate::session::Pair;
use crate::{Trade, TradeSeries};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use services_common::{
    DEFAULT_MAX_PAGES, PAGE_REQUEST_DELAY_SECS, ServiceError, ServiceResult,
};
use tracing::{debug, info, warn};

/// One page of trades plus the source's continuation marker
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TradePage {
    /// Trades at or after the requested `since`, any order
    pub trades: Vec<Trade>,
    /// Opaque continuation marker
    pub last: Option<String>,
}

/// Market-data source trait
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Trades for `pair` with timestamp `>= since`.
    ///
    /// Pages may overlap the previous page's tail.
    async fn get_recent_trades(&self, pair: &Pair, since: DateTime<Utc>) -> ServiceResult<TradePage>;
}

#[async_trait]
impl<S: MarketDataSource + ?Sized> MarketDataSource for std::sync::Arc<S> {
    async fn get_recent_trades(&self, pair: &Pair, since: DateTime<Utc>) -> ServiceResult<TradePage> {
        (**self).get_recent_trades(pair, since).await
    }
}

/// Pages a source until a time window is covered
#[derive(Debug)]
pub struct TradeFetcher<S> {
    source: S,
    max_pages: usize,
}

impl<S: MarketDataSource> TradeFetcher<S> {
    /// Create a fetcher over `source`
    pub fn new(source: S) -> Self {
        Self {
            source,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    /// Override the page ceiling
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Underlying source
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Collect every trade for `pair` from `since` until the cursor reaches `until`.
    ///
    /// After each page the cursor moves to one nanosecond past the latest trade
    /// seen so far. Paging also stops when a page brings nothing at or after
    /// the cursor, or after `max_pages` requests. A window without any trades
    /// yields an empty series. Consecutive requests are spaced by a fixed pause.
    ///
    /// # Errors
    /// `InvalidRequest` if `since >= until`; any source error is returned as is
    /// and the pages gathered so far are dropped.
    pub async fn fetch(
        &self,
        pair: &Pair,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> ServiceResult<TradeSeries> {
        if since >= until {
            return Err(ServiceError::InvalidRequest(format!(
                "empty fetch window: since {since} is not before until {until}"
            )));
        }

        let delay = std::time::Duration::from_secs(PAGE_REQUEST_DELAY_SECS);
        let mut cursor = since;
        let mut latest: Option<DateTime<Utc>> = None;
        let mut accumulated: Vec<Trade> = Vec::new();
        let mut pages = 0usize;

        while cursor < until {
            if pages >= self.max_pages {
                warn!(
                    "Stopping {} fetch after {} pages with cursor at {}",
                    pair, pages, cursor
                );
                break;
            }

            if pages > 0 {
                tokio::time::sleep(delay).await;
            }
            let page = self.source.get_recent_trades(pair, cursor).await?;
            pages += 1;

            let page_latest = page
                .trades
                .iter()
                .map(|trade| trade.timestamp)
                .filter(|timestamp| *timestamp >= cursor)
                .max();

            debug!(
                "Page {} for {}: {} trades since {}, continuation {:?}",
                pages,
                pair,
                page.trades.len(),
                cursor,
                page.last
            );

            accumulated.extend(page.trades);

            let Some(page_latest) = page_latest else {
                debug!("No trades at or after {} for {}, window exhausted", cursor, pair);
                break;
            };

            let newest = latest.map_or(page_latest, |latest| latest.max(page_latest));
            latest = Some(newest);
            cursor = newest + Duration::nanoseconds(1);
        }

        let series = TradeSeries::from_unordered(accumulated);

        if series.is_empty() {
            warn!("No trades for {} between {} and {}", pair, since, until);
        } else {
            info!(
                "Fetched {} unique trades for {} in {} pages",
                series.len(),
                pair,
                pages
            );
        }

        Ok(series)
    }
}
