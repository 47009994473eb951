//! HTTP layer: the upstream fetcher with its freshness window, and a client
//! for the internal proxy endpoint.

#[cfg(feature = "http")]
pub mod client;
#[cfg(feature = "http")]
pub mod proxy;
pub mod retry;

#[cfg(feature = "http")]
pub use client::MarketHttp;
#[cfg(feature = "http")]
pub use proxy::ProxyHttp;
pub use retry::RetryConfig;
