//! Internal proxy endpoint: axum router over the upstream fetcher.
//!
//! Consumers of this service never see upstream shapes or upstream errors:
//! every response is either a validated `MarketSeriesResponse` or a generic
//! `{"error": ...}` body.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::ProxyConfig;
pub use error::ApiError;
pub use routes::router;
pub use state::AppState;
