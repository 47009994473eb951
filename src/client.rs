//! High-level client: `MarketClient` with nested sub-client accessors.
//!
//! Each series kind has its own sub-client in `domain/<name>/client.rs`.
//! This module keeps the builder, the shared query cache and the accessors.

use crate::domain::altcoin_season::client::AltcoinSeason;
use crate::domain::dominance::client::Dominance;
use crate::error::SdkError;
use crate::http::{MarketHttp, ProxyHttp, RetryConfig};
use crate::query::{QueryCache, QueryConfig, QuerySubscription, SeriesSource, Snapshot};
use crate::shared::{SeriesKind, SeriesRequest};
use crate::ws::ChannelConfig;

use std::sync::Arc;
use std::time::Duration;

// Re-export sub-client types for convenience.
pub use crate::domain::altcoin_season::client::AltcoinSeason as AltcoinSeasonClient;
pub use crate::domain::dominance::client::Dominance as DominanceClient;

/// The primary entry point.
///
/// Cheap to clone; clones share one query cache. Create it once at startup
/// and call [`shutdown`](Self::shutdown) when tearing down.
#[derive(Clone)]
pub struct MarketClient {
    pub(crate) cache: QueryCache,
    pub(crate) channel_config: ChannelConfig,
}

impl MarketClient {
    pub fn builder() -> MarketClientBuilder {
        MarketClientBuilder::default()
    }

    /// Build a client over any series source, e.g. a test double.
    pub fn with_source(source: Arc<dyn SeriesSource>, config: QueryConfig) -> Self {
        Self {
            cache: QueryCache::with_source(source, config),
            channel_config: ChannelConfig::default(),
        }
    }

    // ── Sub-client accessors ─────────────────────────────────────────────

    pub fn altcoin_season(&self) -> AltcoinSeason<'_> {
        AltcoinSeason { client: self }
    }

    pub fn dominance(&self) -> Dominance<'_> {
        Dominance { client: self }
    }

    // ── Generic access ───────────────────────────────────────────────────

    /// Reactive view of one series: `{data, is_loading, error}` plus staleness,
    /// refreshed in the background while the handle is alive.
    pub fn use_series(&self, kind: SeriesKind, start: Option<i64>, end: Option<i64>) -> QuerySubscription {
        self.cache.watch(SeriesRequest::new(kind, start, end))
    }

    pub async fn get(&self, request: SeriesRequest) -> Snapshot {
        self.cache.get(request).await
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Get the live channel config.
    pub fn channel_config(&self) -> &ChannelConfig {
        &self.channel_config
    }

    /// Create a new live channel from the current config.
    ///
    /// The channel is not owned by the client: its lifetime usually follows
    /// whatever screen or task consumes the pushes.
    #[cfg(feature = "ws-native")]
    pub fn live_channel(&self) -> crate::ws::native::LiveChannel {
        crate::ws::native::LiveChannel::new(self.channel_config.clone())
    }

    /// Stop all background refreshes and drop cached entries.
    pub fn shutdown(&self) {
        self.cache.shutdown();
    }
}

// ═════════════════════════════════════════════════════════════════════════════
// Builder
// ═════════════════════════════════════════════════════════════════════════════

pub struct MarketClientBuilder {
    upstream_url: String,
    proxy_url: Option<String>,
    ws_url: String,
    request_timeout: Duration,
    freshness_window: Duration,
    query: QueryConfig,
    channel: ChannelConfig,
}

impl Default for MarketClientBuilder {
    fn default() -> Self {
        Self {
            upstream_url: crate::network::DEFAULT_UPSTREAM_URL.to_string(),
            proxy_url: None,
            ws_url: crate::network::DEFAULT_WS_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            freshness_window: Duration::from_secs(300),
            query: QueryConfig::default(),
            channel: ChannelConfig::default(),
        }
    }
}

impl MarketClientBuilder {
    /// Fetch straight from the upstream API at this base URL.
    pub fn upstream_url(mut self, url: &str) -> Self {
        self.upstream_url = url.to_string();
        self
    }

    /// Fetch through the internal proxy endpoint instead of upstream.
    pub fn proxy_url(mut self, url: &str) -> Self {
        self.proxy_url = Some(url.to_string());
        self
    }

    pub fn ws_url(mut self, url: &str) -> Self {
        self.ws_url = url.to_string();
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Window inside which identical upstream requests are served from memory.
    pub fn freshness_window(mut self, window: Duration) -> Self {
        self.freshness_window = window;
        self
    }

    pub fn stale_time(mut self, stale_time: Duration) -> Self {
        self.query.stale_time = stale_time;
        self
    }

    pub fn refetch_interval(mut self, interval: Duration) -> Self {
        self.query.refetch_interval = interval;
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.query.retry = retry;
        self
    }

    pub fn channel_config(mut self, config: ChannelConfig) -> Self {
        self.channel = config;
        self
    }

    pub fn build(self) -> Result<MarketClient, SdkError> {
        if self.request_timeout.is_zero() {
            return Err(SdkError::Config("request_timeout must be non-zero".into()));
        }

        let source: Arc<dyn SeriesSource> = match &self.proxy_url {
            Some(url) => Arc::new(ProxyHttp::new(url, self.request_timeout)?),
            None => Arc::new(MarketHttp::new(
                &self.upstream_url,
                self.request_timeout,
                self.freshness_window,
            )?),
        };

        Ok(MarketClient {
            cache: QueryCache::with_source(source, self.query),
            channel_config: ChannelConfig {
                url: self.ws_url,
                ..self.channel
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let client = MarketClient::builder().build().unwrap();
        assert_eq!(client.cache().config().stale_time, Duration::from_secs(300));
        assert_eq!(client.cache().config().retry.max_retries, 2);
        assert_eq!(client.channel_config().url, crate::network::DEFAULT_WS_URL);
        assert_eq!(client.channel_config().max_reconnect_attempts, 5);
    }

    #[test]
    fn test_builder_overrides() {
        let client = MarketClient::builder()
            .proxy_url("http://localhost:9999")
            .ws_url("ws://localhost:9999/ws")
            .stale_time(Duration::from_secs(60))
            .retry(RetryConfig::none())
            .build()
            .unwrap();
        assert_eq!(client.cache().config().stale_time, Duration::from_secs(60));
        assert_eq!(client.cache().config().retry.max_retries, 0);
        assert_eq!(client.channel_config().url, "ws://localhost:9999/ws");
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = MarketClient::builder()
            .request_timeout(Duration::ZERO)
            .build();
        assert!(matches!(result, Err(SdkError::Config(_))));
    }
}
