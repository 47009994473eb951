//! Named threshold bands used to classify an index value.

use super::convert::parse_decimal;
use super::ConvertError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A named numeric range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub start: f64,
    pub end: f64,
    pub name: String,
}

impl Band {
    pub fn new(start: f64, end: f64, name: impl Into<String>) -> Self {
        Self {
            start,
            end,
            name: name.into(),
        }
    }
}

/// Ordered set of bands.
///
/// The first and last bands are closed at both ends; interior bands are
/// half-open `[start, end)`. When bands touch, the edge band wins the shared
/// boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BandConfig(Vec<Band>);

impl BandConfig {
    pub fn new(mut bands: Vec<Band>) -> Result<Self, ConvertError> {
        for band in &bands {
            if !band.start.is_finite() || !band.end.is_finite() || band.start > band.end {
                return Err(ConvertError::InvalidBand {
                    name: band.name.clone(),
                    start: band.start,
                    end: band.end,
                });
            }
        }
        bands.sort_by(|a, b| a.start.total_cmp(&b.start));
        Ok(Self(bands))
    }

    /// `btc 0–25`, `neutral 25–75`, `alt 75–100`.
    pub fn standard() -> Self {
        Self(vec![
            Band::new(0.0, 25.0, "btc"),
            Band::new(25.0, 75.0, "neutral"),
            Band::new(75.0, 100.0, "alt"),
        ])
    }

    pub fn bands(&self) -> &[Band] {
        &self.0
    }

    pub fn classify(&self, value: f64) -> Option<&Band> {
        if value.is_nan() {
            return None;
        }
        let closed = |b: &Band| value >= b.start && value <= b.end;

        let first = self.0.first()?;
        if closed(first) {
            return Some(first);
        }
        let last = self.0.last()?;
        if closed(last) {
            return Some(last);
        }
        let interior = self.0.len().saturating_sub(1);
        self.0
            .iter()
            .take(interior)
            .skip(1)
            .find(|b| value >= b.start && value < b.end)
    }

    /// Classify a decimal string as upstream sends it.
    pub fn classify_str(&self, raw: &str) -> Option<&Band> {
        parse_decimal("value", raw)
            .ok()
            .and_then(|v| self.classify(v))
    }

    pub fn season(&self, value: f64) -> Option<Season> {
        self.classify(value).and_then(|b| Season::from_band_name(&b.name))
    }

    /// Upper edge of the lowest band (bitcoin season at or below it).
    pub fn lower_threshold(&self) -> Option<f64> {
        self.0.first().map(|b| b.end)
    }

    /// Lower edge of the highest band (altcoin season at or above it).
    pub fn upper_threshold(&self) -> Option<f64> {
        self.0.last().map(|b| b.start)
    }
}

/// Market regime named by a band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Bitcoin,
    Neutral,
    Altcoin,
}

impl Season {
    pub fn from_band_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "btc" | "bitcoin" => Some(Season::Bitcoin),
            "neutral" => Some(Season::Neutral),
            "alt" | "altcoin" => Some(Season::Altcoin),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Season::Bitcoin => "Bitcoin Season",
            Season::Neutral => "Neutral",
            Season::Altcoin => "Altcoin Season",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
