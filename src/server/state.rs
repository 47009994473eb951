use crate::error::FetchError;
use crate::http::MarketHttp;

use super::ProxyConfig;

/// Shared application state, passed to handlers via `axum::extract::State`.
#[derive(Clone)]
pub struct AppState {
    pub upstream: MarketHttp,
}

impl AppState {
    pub fn new(upstream: MarketHttp) -> Self {
        Self { upstream }
    }

    pub fn from_config(config: &ProxyConfig) -> Result<Self, FetchError> {
        let upstream = MarketHttp::new(
            &config.upstream_url,
            config.request_timeout,
            config.freshness_window,
        )?;
        Ok(Self::new(upstream))
    }
}
