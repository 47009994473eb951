//! Altcoin season sub-client: ranged index queries over the query cache.

use crate::client::MarketClient;
use crate::domain::series::{MarketSeriesResponse, Season};
use crate::error::SdkError;
use crate::query::{QuerySubscription, Snapshot};
use crate::shared::SeriesRequest;
use std::sync::Arc;

/// Sub-client for the altcoin season index.
pub struct AltcoinSeason<'a> {
    pub(crate) client: &'a MarketClient,
}

impl<'a> AltcoinSeason<'a> {
    /// Snapshot for `[start, end]`, keeping previous data on a failed refresh.
    pub async fn get(&self, start: i64, end: i64) -> Snapshot {
        self.client
            .cache
            .get(SeriesRequest::altcoin_season(start, end))
            .await
    }

    /// Like [`get`](Self::get) but fails unless the latest attempt succeeded.
    pub async fn fetch(&self, start: i64, end: i64) -> Result<Arc<MarketSeriesResponse>, SdkError> {
        Ok(self.get(start, end).await.into_result()?)
    }

    /// Subscribe with background refresh.
    pub fn watch(&self, start: i64, end: i64) -> QuerySubscription {
        self.client
            .cache
            .watch(SeriesRequest::altcoin_season(start, end))
    }

    /// What is cached right now, without fetching.
    pub fn peek(&self, start: i64, end: i64) -> Snapshot {
        self.client
            .cache
            .peek(SeriesRequest::altcoin_season(start, end))
    }

    /// Season of the latest point in the range.
    pub async fn current_season(&self, start: i64, end: i64) -> Result<Option<Season>, SdkError> {
        let resp = self.fetch(start, end).await?;
        Ok(super::current_season(&resp))
    }

    pub fn invalidate(&self, start: i64, end: i64) {
        self.client
            .cache
            .invalidate(SeriesRequest::altcoin_season(start, end));
    }
}
