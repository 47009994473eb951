//! Conversions from dominance wire types to the series envelope.

use super::wire::{DominanceEnvelope, DominancePointWire};
use super::DominanceSplit;
use crate::domain::series::convert::{normalize_points, parse_timestamp};
use crate::domain::series::{ConvertError, MarketSeriesPoint, MarketSeriesResponse, PointMetric};
use crate::shared::SeriesKind;

impl TryFrom<&[f64]> for DominanceSplit {
    type Error = ConvertError;

    fn try_from(components: &[f64]) -> Result<Self, Self::Error> {
        let [bitcoin, ethereum, others] = components else {
            return Err(ConvertError::DominanceArity(components.len()));
        };
        for &c in components {
            if c.is_nan() || c < 0.0 {
                return Err(ConvertError::NegativeDominance(c));
            }
        }
        Ok(Self {
            bitcoin: *bitcoin,
            ethereum: *ethereum,
            others: *others,
        })
    }
}

impl TryFrom<DominancePointWire> for MarketSeriesPoint {
    type Error = ConvertError;

    fn try_from(p: DominancePointWire) -> Result<Self, Self::Error> {
        Ok(Self {
            timestamp: parse_timestamp(&p.timestamp)?,
            metric: PointMetric::Dominance(DominanceSplit::try_from(p.dominance.as_slice())?),
        })
    }
}

impl TryFrom<DominanceEnvelope> for MarketSeriesResponse {
    type Error = ConvertError;

    fn try_from(env: DominanceEnvelope) -> Result<Self, Self::Error> {
        let points = env
            .data
            .points
            .into_iter()
            .map(MarketSeriesPoint::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            kind: SeriesKind::Dominance,
            points: normalize_points(SeriesKind::Dominance, points),
            historical: None,
            bands: None,
            status: env.status.into(),
        })
    }
}
