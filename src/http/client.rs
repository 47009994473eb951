//! Upstream fetcher: `MarketHttp`.
//!
//! One request per series kind. Raw bodies go through the payload contract and
//! come back as [`MarketSeriesResponse`]. Successful responses are kept for a
//! freshness window keyed by URL, so identical requests inside the window never
//! reach upstream.

use crate::domain::series::{self, MarketSeriesResponse};
use crate::error::FetchError;
use crate::network::{ALTCOIN_SEASON_PATH, DOMINANCE_PATH, USD_CONVERT_ID};
use crate::shared::{SeriesKind, SeriesRequest};

use async_lock::RwLock;
use reqwest::header::ACCEPT;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Longest slice of an error body carried into a `FetchError`.
const MAX_ERROR_BODY: usize = 256;

type FreshnessCache = Arc<RwLock<HashMap<String, (Arc<MarketSeriesResponse>, Instant)>>>;

/// Low-level HTTP client for the upstream market data API.
#[derive(Clone)]
pub struct MarketHttp {
    base_url: String,
    client: Client,
    freshness_window: Duration,
    fresh: FreshnessCache,
}

impl MarketHttp {
    pub fn new(
        base_url: &str,
        request_timeout: Duration,
        freshness_window: Duration,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| FetchError::transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            freshness_window,
            fresh: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn freshness_window(&self) -> Duration {
        self.freshness_window
    }

    /// Upstream URL for a request. Absent bounds are omitted.
    pub fn series_url(&self, request: &SeriesRequest) -> String {
        let req = request.normalized();
        match req.kind {
            SeriesKind::AltcoinSeason => {
                let mut params = Vec::new();
                if let Some(s) = req.start {
                    params.push(format!("start={}", s));
                }
                if let Some(e) = req.end {
                    params.push(format!("end={}", e));
                }
                params.push(format!("convertId={}", USD_CONVERT_ID));
                format!(
                    "{}{}?{}",
                    self.base_url,
                    ALTCOIN_SEASON_PATH,
                    params.join("&")
                )
            }
            SeriesKind::Dominance => format!("{}{}?range=all", self.base_url, DOMINANCE_PATH),
        }
    }

    // ── Series ───────────────────────────────────────────────────────────

    pub async fn get_altcoin_season(
        &self,
        start: Option<i64>,
        end: Option<i64>,
    ) -> Result<Arc<MarketSeriesResponse>, FetchError> {
        self.fetch(&SeriesRequest::new(SeriesKind::AltcoinSeason, start, end))
            .await
    }

    pub async fn get_dominance(&self) -> Result<Arc<MarketSeriesResponse>, FetchError> {
        self.fetch(&SeriesRequest::dominance()).await
    }

    /// Fetch and validate one series, honoring the freshness window.
    pub async fn fetch(
        &self,
        request: &SeriesRequest,
    ) -> Result<Arc<MarketSeriesResponse>, FetchError> {
        let url = self.series_url(request);

        {
            let cache = self.fresh.read().await;
            if let Some((resp, fetched_at)) = cache.get(&url) {
                if fetched_at.elapsed() < self.freshness_window {
                    tracing::debug!(kind = %request.kind, "Serving series inside freshness window");
                    return Ok(resp.clone());
                }
            }
        }

        tracing::debug!(kind = %request.kind, url = %url, "Fetching series from upstream");
        let resp = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let mut body = resp.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            tracing::debug!(kind = %request.kind, status = status.as_u16(), "Upstream returned error status");
            return Err(FetchError::upstream(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let raw: serde_json::Value = resp.json().await?;
        let decoded = Arc::new(series::decode(request.kind, raw)?);
        tracing::debug!(
            kind = %request.kind,
            points = decoded.points.len(),
            "Fetched series"
        );

        self.remember(url, decoded.clone()).await;
        Ok(decoded)
    }

    /// Drop every response held for the freshness window.
    pub async fn clear_freshness_cache(&self) {
        self.fresh.write().await.clear();
    }

    async fn remember(&self, url: String, resp: Arc<MarketSeriesResponse>) {
        let window = self.freshness_window;
        let mut cache = self.fresh.write().await;
        cache.retain(|_, (_, fetched_at)| fetched_at.elapsed() < window);
        cache.insert(url, (resp, Instant::now()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http() -> MarketHttp {
        MarketHttp::new(
            "https://example.test/data-api/v3/",
            Duration::from_secs(5),
            Duration::from_secs(300),
        )
        .unwrap()
    }

    #[test]
    fn test_altcoin_season_url() {
        let url = http().series_url(&SeriesRequest::altcoin_season(1_700_000_000, 1_700_086_400));
        assert_eq!(
            url,
            "https://example.test/data-api/v3/altcoin-season/chart?start=1700000000&end=1700086400&convertId=2781"
        );
    }

    #[test]
    fn test_altcoin_season_url_without_bounds() {
        let url = http().series_url(&SeriesRequest::new(SeriesKind::AltcoinSeason, None, None));
        assert_eq!(
            url,
            "https://example.test/data-api/v3/altcoin-season/chart?convertId=2781"
        );
    }

    #[test]
    fn test_dominance_url_ignores_bounds() {
        let url = http().series_url(&SeriesRequest::new(SeriesKind::Dominance, Some(1), Some(2)));
        assert_eq!(
            url,
            "https://example.test/data-api/v3/global-metrics/dominance/chart?range=all"
        );
    }
}
