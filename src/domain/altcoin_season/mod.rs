//! Altcoin season index: share of top altcoins outperforming bitcoin, 0–100.

#[cfg(feature = "http")]
pub mod client;
pub mod convert;
pub mod wire;

use crate::domain::series::{MarketSeriesResponse, Season};

/// Classify the most recent point against the response's bands.
pub fn current_season(response: &MarketSeriesResponse) -> Option<Season> {
    let latest = response.latest()?;
    response.band_config().season(latest.value())
}
