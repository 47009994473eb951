//! Client for the internal proxy endpoint: `ProxyHttp`.
//!
//! The proxy already validated and normalized the series, so bodies decode
//! straight into [`MarketSeriesResponse`].

use crate::domain::series::MarketSeriesResponse;
use crate::error::FetchError;
use crate::network::{PROXY_ALTCOIN_SEASON_ROUTE, PROXY_DOMINANCE_ROUTE};
use crate::shared::{SeriesKind, SeriesRequest};

use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Clone)]
pub struct ProxyHttp {
    base_url: String,
    client: Client,
}

impl ProxyHttp {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| FetchError::transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn route_url(&self, request: &SeriesRequest) -> String {
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
                let mut url = format!("{}{}", self.base_url, PROXY_ALTCOIN_SEASON_ROUTE);
                if !params.is_empty() {
                    url = format!("{}?{}", url, params.join("&"));
                }
                url
            }
            SeriesKind::Dominance => format!("{}{}", self.base_url, PROXY_DOMINANCE_ROUTE),
        }
    }

    pub async fn fetch(
        &self,
        request: &SeriesRequest,
    ) -> Result<Arc<MarketSeriesResponse>, FetchError> {
        let url = self.route_url(request);
        tracing::debug!(kind = %request.kind, url = %url, "Fetching series from proxy");

        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp
                .json::<ErrorBody>()
                .await
                .map(|b| b.error)
                .unwrap_or_else(|_| "no error body".to_string());
            return Err(FetchError::upstream(format!(
                "HTTP {}: {}",
                status.as_u16(),
                message
            )));
        }

        let body: MarketSeriesResponse = resp.json().await?;
        if body.kind != request.kind {
            return Err(FetchError::shape(format!(
                "expected {} series, proxy returned {}",
                request.kind, body.kind
            )));
        }
        Ok(Arc::new(body))
    }
}
