//! Field-level parsing and normalization shared by the series slices.

use super::wire::StatusWire;
use super::{ConvertError, MarketSeriesPoint, UpstreamStatus};
use crate::shared::SeriesKind;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Parse a plain decimal string. Exponents, `NaN` and infinities are rejected.
pub fn parse_decimal(field: &'static str, raw: &str) -> Result<f64, ConvertError> {
    let not_decimal = || ConvertError::NotDecimal {
        field,
        value: raw.to_string(),
    };
    Decimal::from_str(raw)
        .map_err(|_| not_decimal())?
        .to_f64()
        .ok_or_else(not_decimal)
}

/// Parse a Unix-seconds timestamp sent as a string.
pub fn parse_timestamp(raw: &str) -> Result<i64, ConvertError> {
    raw.parse::<i64>()
        .map_err(|_| ConvertError::BadTimestamp(raw.to_string()))
}

/// Sort points by time; among duplicate timestamps the last occurrence wins.
pub fn normalize_points(kind: SeriesKind, mut points: Vec<MarketSeriesPoint>) -> Vec<MarketSeriesPoint> {
    points.sort_by_key(|p| p.timestamp);

    let mut out: Vec<MarketSeriesPoint> = Vec::with_capacity(points.len());
    let mut duplicates = 0usize;
    for point in points {
        match out.last_mut() {
            Some(prev) if prev.timestamp == point.timestamp => {
                *prev = point;
                duplicates += 1;
            }
            _ => out.push(point),
        }
    }

    if duplicates > 0 {
        tracing::warn!(kind = %kind, duplicates, "Dropped duplicate timestamps from series");
    }
    out
}

impl From<StatusWire> for UpstreamStatus {
    fn from(s: StatusWire) -> Self {
        Self {
            timestamp: s.timestamp,
            error_code: s.error_code,
            error_message: s.error_message,
            elapsed_ms: s.elapsed.and_then(|e| e.parse().ok()),
            credit_count: s.credit_count,
        }
    }
}
