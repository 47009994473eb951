//! Dominance sub-client.
//!
//! The upstream endpoint always returns the full history, so requests carry no
//! range and share one cache entry.

use super::DominanceSplit;
use crate::client::MarketClient;
use crate::domain::series::{MarketSeriesResponse, PointMetric};
use crate::error::SdkError;
use crate::query::{QuerySubscription, Snapshot};
use crate::shared::SeriesRequest;
use std::sync::Arc;

/// Sub-client for market dominance.
pub struct Dominance<'a> {
    pub(crate) client: &'a MarketClient,
}

impl<'a> Dominance<'a> {
    pub async fn get(&self) -> Snapshot {
        self.client.cache.get(SeriesRequest::dominance()).await
    }

    pub async fn fetch(&self) -> Result<Arc<MarketSeriesResponse>, SdkError> {
        Ok(self.get().await.into_result()?)
    }

    pub fn watch(&self) -> QuerySubscription {
        self.client.cache.watch(SeriesRequest::dominance())
    }

    pub fn peek(&self) -> Snapshot {
        self.client.cache.peek(SeriesRequest::dominance())
    }

    /// Most recent split.
    pub async fn latest(&self) -> Result<Option<DominanceSplit>, SdkError> {
        let resp = self.fetch().await?;
        Ok(resp.latest().and_then(|p| match &p.metric {
            PointMetric::Dominance(split) => Some(*split),
            _ => None,
        }))
    }
}
