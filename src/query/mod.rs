//! Client query cache: request deduplication, staleness, retries and
//! background refresh on top of any [`SeriesSource`].
//!
//! At most one fetch per [`Fingerprint`](crate::shared::Fingerprint) is in
//! flight at a time; every caller asking for it while the fetch runs shares
//! its result. A failed refresh keeps the last good data, so callers can keep
//! rendering it next to the error.

pub mod cache;
pub mod source;
pub mod subscription;

pub use cache::QueryCache;
pub use source::{source_fn, FetchResult, FnSource, SeriesSource};
pub use subscription::QuerySubscription;

use crate::domain::series::MarketSeriesResponse;
use crate::error::FetchError;
use crate::http::RetryConfig;
use std::sync::Arc;
use std::time::Duration;

/// Timing policy for the query cache.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryConfig {
    /// Age after which a cached result is refetched on the next `get`.
    pub stale_time: Duration,
    /// Background refresh period for subscribed fingerprints.
    pub refetch_interval: Duration,
    /// Retries applied to each fetch before its error is surfaced.
    pub retry: RetryConfig,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(300),
            refetch_interval: Duration::from_secs(300),
            retry: RetryConfig::default(),
        }
    }
}

/// Point-in-time view of one cache entry.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Last successful result, kept across failed refreshes.
    pub data: Option<Arc<MarketSeriesResponse>>,
    /// Error from the latest attempt, cleared by the next success.
    pub error: Option<FetchError>,
    pub is_loading: bool,
    pub is_stale: bool,
}

impl Snapshot {
    /// `Ok` only when the latest attempt succeeded.
    pub fn into_result(self) -> Result<Arc<MarketSeriesResponse>, FetchError> {
        match (self.data, self.error) {
            (_, Some(e)) => Err(e),
            (Some(data), None) => Ok(data),
            (None, None) => Err(FetchError::transport("no data fetched yet")),
        }
    }
}
