//! Conversions from altcoin season wire types to the series envelope.

use super::wire::{AltcoinSeasonEnvelope, AltcoinSeasonPointWire, DialConfigWire};
use crate::domain::series::convert::{normalize_points, parse_decimal, parse_timestamp};
use crate::domain::series::{
    Band, BandConfig, ConvertError, HistoricalValues, MarketSeriesPoint, MarketSeriesResponse,
    PointMetric,
};
use crate::shared::SeriesKind;
use std::collections::BTreeMap;

impl TryFrom<AltcoinSeasonPointWire> for MarketSeriesPoint {
    type Error = ConvertError;

    fn try_from(p: AltcoinSeasonPointWire) -> Result<Self, Self::Error> {
        let value = parse_decimal("altcoinIndex", &p.altcoin_index)?;
        if !(0.0..=100.0).contains(&value) {
            return Err(ConvertError::IndexOutOfRange(value));
        }
        Ok(Self {
            timestamp: parse_timestamp(&p.timestamp)?,
            metric: PointMetric::AltcoinIndex {
                name: p.name,
                value,
                market_cap: parse_decimal("altcoinMarketcap", &p.altcoin_marketcap)?,
            },
        })
    }
}

impl From<DialConfigWire> for Band {
    fn from(d: DialConfigWire) -> Self {
        Band::new(d.start, d.end, d.name)
    }
}

fn historical_values(
    raw: BTreeMap<String, AltcoinSeasonPointWire>,
) -> Result<HistoricalValues, ConvertError> {
    let mut out = HistoricalValues::default();
    for (key, wire) in raw {
        let point = MarketSeriesPoint::try_from(wire)?;
        let slot = match key.as_str() {
            "now" => &mut out.now,
            "yesterday" => &mut out.yesterday,
            "lastWeek" => &mut out.last_week,
            "lastMonth" => &mut out.last_month,
            "yearlyHigh" => &mut out.yearly_high,
            "yearlyLow" => &mut out.yearly_low,
            _ => {
                out.extra.insert(key.clone(), point);
                continue;
            }
        };
        *slot = Some(point);
    }
    Ok(out)
}

impl TryFrom<AltcoinSeasonEnvelope> for MarketSeriesResponse {
    type Error = ConvertError;

    fn try_from(env: AltcoinSeasonEnvelope) -> Result<Self, Self::Error> {
        let points = env
            .data
            .points
            .into_iter()
            .map(MarketSeriesPoint::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let bands = if env.data.dial_configs.is_empty() {
            None
        } else {
            Some(BandConfig::new(
                env.data.dial_configs.into_iter().map(Band::from).collect(),
            )?)
        };

        Ok(Self {
            kind: SeriesKind::AltcoinSeason,
            points: normalize_points(SeriesKind::AltcoinSeason, points),
            historical: Some(historical_values(env.data.historical_values)?),
            bands,
            status: env.status.into(),
        })
    }
}
