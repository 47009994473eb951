//! Series envelope: the validated, typed form of one upstream response.
//!
//! Every kind-specific slice (`altcoin_season`, `dominance`) converts its wire
//! envelope into the same [`MarketSeriesResponse`], so the cache, the proxy
//! endpoint and the client deal with a single type.

pub mod bands;
pub mod convert;
pub mod wire;

use crate::domain::altcoin_season::wire::AltcoinSeasonEnvelope;
use crate::domain::dominance::wire::DominanceEnvelope;
use crate::domain::dominance::DominanceSplit;
use crate::error::FetchError;
use crate::schema::shapes;
use crate::shared::SeriesKind;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

pub use bands::{Band, BandConfig, Season};

// ─── Points ──────────────────────────────────────────────────────────────────

/// One sample of a series. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSeriesPoint {
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
    pub metric: PointMetric,
}

/// Kind-specific numeric payload of a point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PointMetric {
    AltcoinIndex {
        name: String,
        /// Index value in `[0, 100]`.
        value: f64,
        market_cap: f64,
    },
    Dominance(DominanceSplit),
}

impl MarketSeriesPoint {
    /// The headline scalar: the index value, or the bitcoin share for dominance.
    pub fn value(&self) -> f64 {
        match &self.metric {
            PointMetric::AltcoinIndex { value, .. } => *value,
            PointMetric::Dominance(split) => split.bitcoin,
        }
    }

    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.timestamp, 0).single()
    }
}

/// Named historical snapshots reported alongside the index series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalValues {
    pub now: Option<MarketSeriesPoint>,
    pub yesterday: Option<MarketSeriesPoint>,
    pub last_week: Option<MarketSeriesPoint>,
    pub last_month: Option<MarketSeriesPoint>,
    pub yearly_high: Option<MarketSeriesPoint>,
    pub yearly_low: Option<MarketSeriesPoint>,
    /// Keys upstream added that have no named slot.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, MarketSeriesPoint>,
}

// ─── Envelope ────────────────────────────────────────────────────────────────

/// Upstream status block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamStatus {
    pub timestamp: Option<String>,
    pub error_code: String,
    pub error_message: String,
    /// Upstream-reported latency.
    pub elapsed_ms: Option<u64>,
    /// Upstream-reported request cost.
    pub credit_count: Option<f64>,
}

impl UpstreamStatus {
    pub fn is_success(&self) -> bool {
        self.error_code == "0"
    }
}

/// A validated series: time-ascending points with no duplicate timestamps.
///
/// Never mutated after creation; refreshes replace the whole value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSeriesResponse {
    pub kind: SeriesKind,
    pub points: Vec<MarketSeriesPoint>,
    pub historical: Option<HistoricalValues>,
    pub bands: Option<BandConfig>,
    pub status: UpstreamStatus,
}

impl MarketSeriesResponse {
    pub fn latest(&self) -> Option<&MarketSeriesPoint> {
        self.points.last()
    }

    /// Upstream bands, or the standard 25/75 split when upstream sent none.
    pub fn band_config(&self) -> BandConfig {
        self.bands.clone().unwrap_or_else(BandConfig::standard)
    }
}

// ─── Conversion errors ───────────────────────────────────────────────────────

/// Domain-level violations found while converting a structurally valid payload.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConvertError {
    #[error("field `{field}` is not a decimal: {value:?}")]
    NotDecimal { field: &'static str, value: String },

    #[error("invalid timestamp: {0:?}")]
    BadTimestamp(String),

    #[error("index value {0} outside [0, 100]")]
    IndexOutOfRange(f64),

    #[error("negative dominance component: {0}")]
    NegativeDominance(f64),

    #[error("dominance split must have 3 components, got {0}")]
    DominanceArity(usize),

    #[error("invalid band `{name}`: [{start}, {end}]")]
    InvalidBand { name: String, start: f64, end: f64 },
}

// ─── Decoding ────────────────────────────────────────────────────────────────

/// Turn a raw upstream body into a typed response.
///
/// An error status block is reported as `Upstream` before the body is checked,
/// since error bodies usually omit `data`. Anything that breaks the payload
/// contract is logged and reported as `Shape`.
pub fn decode(kind: SeriesKind, raw: Value) -> Result<MarketSeriesResponse, FetchError> {
    if let Some(code) = raw.pointer("/status/error_code").and_then(Value::as_str) {
        if code != "0" {
            let message = raw
                .pointer("/status/error_message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(FetchError::upstream(format!(
                "error_code {}: {}",
                code, message
            )));
        }
    }

    if let Err(e) = shapes::for_kind(kind).validate(&raw) {
        tracing::warn!(kind = %kind, path = %e.path, "Upstream payload rejected: {}", e);
        return Err(e.into());
    }

    let converted = match kind {
        SeriesKind::AltcoinSeason => serde_json::from_value::<AltcoinSeasonEnvelope>(raw)
            .map_err(|e| FetchError::shape(e.to_string()))?
            .try_into(),
        SeriesKind::Dominance => serde_json::from_value::<DominanceEnvelope>(raw)
            .map_err(|e| FetchError::shape(e.to_string()))?
            .try_into(),
    };

    converted.map_err(|e: ConvertError| {
        tracing::warn!(kind = %kind, "Upstream payload rejected: {}", e);
        e.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchErrorKind;
    use serde_json::json;

    fn altcoin_raw(index: &str) -> Value {
        json!({
            "data": {
                "points": [{
                    "name": "p1",
                    "altcoinIndex": index,
                    "altcoinMarketcap": "1000",
                    "timestamp": "1700000000"
                }],
                "historicalValues": {},
                "dialConfigs": [
                    {"start": 0, "end": 25, "name": "btc"},
                    {"start": 25, "end": 75, "name": "neutral"},
                    {"start": 75, "end": 100, "name": "alt"}
                ]
            },
            "status": {
                "timestamp": "2023-11-14T22:13:20.000Z",
                "error_code": "0",
                "error_message": "SUCCESS",
                "elapsed": "7",
                "credit_count": 0
            }
        })
    }

    #[test]
    fn test_decode_altcoin_season() {
        let resp = decode(SeriesKind::AltcoinSeason, altcoin_raw("42")).unwrap();
        assert_eq!(resp.kind, SeriesKind::AltcoinSeason);
        assert_eq!(resp.points.len(), 1);
        assert_eq!(resp.points[0].value(), 42.0);
        assert_eq!(resp.points[0].timestamp, 1_700_000_000);
        assert_eq!(resp.status.elapsed_ms, Some(7));
        assert_eq!(
            resp.band_config().classify(42.0).map(|b| b.name.as_str()),
            Some("neutral")
        );
    }

    #[test]
    fn test_decode_fractional_credit_count() {
        let mut raw = altcoin_raw("42");
        raw["status"]["credit_count"] = json!(0.5);
        let resp = decode(SeriesKind::AltcoinSeason, raw).unwrap();
        assert_eq!(resp.status.credit_count, Some(0.5));
    }

    #[test]
    fn test_decode_shape_error() {
        let mut raw = altcoin_raw("42");
        raw["data"]["points"][0]["altcoinIndex"] = json!(42);
        let err = decode(SeriesKind::AltcoinSeason, raw).unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::Shape);
        assert!(err.detail.contains("altcoinIndex"));
    }

    #[test]
    fn test_decode_out_of_range_index_is_shape() {
        let err = decode(SeriesKind::AltcoinSeason, altcoin_raw("100.5")).unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::Shape);
    }

    #[test]
    fn test_decode_upstream_error_status() {
        let raw = json!({
            "status": {"error_code": "1008", "error_message": "rate limited"}
        });
        let err = decode(SeriesKind::Dominance, raw).unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::Upstream);
        assert!(err.detail.contains("rate limited"));
    }

    #[test]
    fn test_decode_dominance() {
        let raw = json!({
            "data": {"points": [
                {"dominance": [52.4, 17.0, 30.6], "timestamp": "1700086400"},
                {"dominance": [52.1, 17.3, 30.6], "timestamp": "1700000000"}
            ]},
            "status": {"error_code": "0", "error_message": "SUCCESS"}
        });
        let resp = decode(SeriesKind::Dominance, raw).unwrap();
        assert_eq!(resp.points.len(), 2);
        assert_eq!(resp.points[0].timestamp, 1_700_000_000);
        assert_eq!(resp.latest().map(|p| p.value()), Some(52.4));
        assert!(resp.bands.is_none());
    }

    #[test]
    fn test_response_serde_roundtrip() {
        let resp = decode(SeriesKind::AltcoinSeason, altcoin_raw("42")).unwrap();
        let json = serde_json::to_string(&resp).unwrap();
        let back: MarketSeriesResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(back, resp);
    }
}
