//! Network URL constants.

/// Default upstream API base URL.
pub const DEFAULT_UPSTREAM_URL: &str = "https://api.coinmarketcap.com/data-api/v3";

/// Default live-channel URL.
pub const DEFAULT_WS_URL: &str = "ws://localhost:8080/ws";

/// Quote currency id sent with index-series requests (USD).
pub const USD_CONVERT_ID: u32 = 2781;

/// Upstream path of the altcoin season index series.
pub const ALTCOIN_SEASON_PATH: &str = "/altcoin-season/chart";

/// Upstream path of the market dominance series.
pub const DOMINANCE_PATH: &str = "/global-metrics/dominance/chart";

/// Internal proxy route for the altcoin season index series.
pub const PROXY_ALTCOIN_SEASON_ROUTE: &str = "/api/market/altcoin-season";

/// Internal proxy route for the market dominance series.
pub const PROXY_DOMINANCE_ROUTE: &str = "/api/market/dominance";
