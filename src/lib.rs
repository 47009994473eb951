//! # market-sync
//!
//! Market data acquisition and synchronization: an upstream fetcher with a
//! freshness window, a strict payload contract, a deduplicating query cache
//! with background refresh, and a reconnecting live channel.
//!
//! ## Architecture
//!
//! The crate is organized in layers:
//!
//! 1. **Core**: Newtypes, payload contract, domain models (always available)
//! 2. **HTTP**: `MarketHttp` (upstream) and `ProxyHttp` (internal endpoint)
//! 3. **Query**: `QueryCache` with deduplication, staleness and retries
//! 4. **Live channel**: `tokio-tungstenite` transport driven by a pure state machine
//! 5. **High-Level Client**: `MarketClient` with nested sub-clients
//! 6. **Server**: axum router behind the `market-proxy` binary
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use market_sync::prelude::*;
//!
//! let client = MarketClient::builder()
//!     .proxy_url("http://localhost:8080")
//!     .build()?;
//!
//! let snapshot = client.altcoin_season().get(1_700_000_000, 1_700_086_400).await;
//! let mut live = client.dominance().watch();
//! while let Some(snapshot) = live.changed().await {
//!     // render snapshot.data, keep showing it while snapshot.error is set
//! }
//! ```

// ── Layer 1: Core ────────────────────────────────────────────────────────────

/// Shared newtypes used across all layers.
pub mod shared;

/// Payload contract: declarative shapes and the validator.
pub mod schema;

/// Domain modules (vertical slices): types, wire types, conversions.
pub mod domain;

/// Unified error types.
pub mod error;

/// URL and route constants.
pub mod network;

// ── Layer 2: HTTP ────────────────────────────────────────────────────────────

/// Upstream fetcher, proxy client and retry policy.
pub mod http;

// ── Layer 3: Query ───────────────────────────────────────────────────────────

/// Client query cache.
pub mod query;

// ── Layer 4: Live channel ────────────────────────────────────────────────────

/// Live channel: messages, subscriptions, lifecycle, events.
pub mod ws;

// ── Layer 5: High-Level Client ───────────────────────────────────────────────

/// `MarketClient`: the primary entry point.
#[cfg(feature = "http")]
pub mod client;

// ── Layer 6: Server ──────────────────────────────────────────────────────────

/// Internal proxy endpoint.
#[cfg(feature = "server")]
pub mod server;

// ── Prelude ──────────────────────────────────────────────────────────────────

pub mod prelude {
    // Shared newtypes
    pub use crate::shared::{Fingerprint, SeriesKind, SeriesRequest, Topic};

    // Domain types
    pub use crate::domain::dominance::DominanceSplit;
    pub use crate::domain::series::{
        Band, BandConfig, HistoricalValues, MarketSeriesPoint, MarketSeriesResponse, PointMetric,
        Season, UpstreamStatus,
    };

    // Query
    pub use crate::http::RetryConfig;
    pub use crate::query::{QueryCache, QueryConfig, QuerySubscription, SeriesSource, Snapshot};

    // Live channel
    pub use crate::ws::{ChannelConfig, ChannelEvent, ConnectionState, SubscriptionSet};

    #[cfg(feature = "ws-native")]
    pub use crate::ws::native::LiveChannel;

    // Client
    #[cfg(feature = "http")]
    pub use crate::client::{MarketClient, MarketClientBuilder};
    #[cfg(feature = "http")]
    pub use crate::http::{MarketHttp, ProxyHttp};

    // Errors
    pub use crate::error::{ChannelError, FetchError, FetchErrorKind, SdkError};
    pub use crate::schema::ValidationError;
}
