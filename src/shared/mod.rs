//! Shared newtypes used across all layers.
//!
//! These types are serialization-transparent: they serialize/deserialize identically
//! to the raw strings the proxy endpoint and the live channel exchange, so they can
//! be used directly in wire types without conversion overhead.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// ─── SeriesKind ──────────────────────────────────────────────────────────────

/// The market metric series the layer knows how to acquire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeriesKind {
    /// Altcoin season index (0–100) plus altcoin market cap.
    AltcoinSeason,
    /// Bitcoin / Ethereum / others market dominance split.
    Dominance,
}

impl SeriesKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeriesKind::AltcoinSeason => "altcoin-season",
            SeriesKind::Dominance => "dominance",
        }
    }

    /// Whether the upstream endpoint accepts an explicit `[start, end]` range.
    ///
    /// Kinds without range support always return the full available history.
    pub fn supports_range(&self) -> bool {
        matches!(self, SeriesKind::AltcoinSeason)
    }

    /// Human-readable label, used in log lines and client-facing error bodies.
    pub fn label(&self) -> &'static str {
        match self {
            SeriesKind::AltcoinSeason => "altcoin season",
            SeriesKind::Dominance => "dominance",
        }
    }
}

impl fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeriesKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "altcoin-season" => Ok(SeriesKind::AltcoinSeason),
            "dominance" => Ok(SeriesKind::Dominance),
            other => Err(format!("Unknown series kind: {}", other)),
        }
    }
}

// ─── SeriesRequest ───────────────────────────────────────────────────────────

/// A request for one series over an optional inclusive range of Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeriesRequest {
    pub kind: SeriesKind,
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl SeriesRequest {
    pub fn new(kind: SeriesKind, start: Option<i64>, end: Option<i64>) -> Self {
        Self { kind, start, end }
    }

    pub fn altcoin_season(start: i64, end: i64) -> Self {
        Self::new(SeriesKind::AltcoinSeason, Some(start), Some(end))
    }

    pub fn dominance() -> Self {
        Self::new(SeriesKind::Dominance, None, None)
    }

    /// The request with bounds dropped for kinds that ignore them.
    pub fn normalized(&self) -> Self {
        if self.kind.supports_range() {
            *self
        } else {
            Self::new(self.kind, None, None)
        }
    }

    /// Normalized cache key: `kind:start:end`, or `kind` alone for unranged requests.
    pub fn fingerprint(&self) -> Fingerprint {
        let req = self.normalized();
        match (req.start, req.end) {
            (None, None) => Fingerprint(req.kind.as_str().to_string()),
            (start, end) => Fingerprint(format!(
                "{}:{}:{}",
                req.kind,
                bound_key(start),
                bound_key(end)
            )),
        }
    }
}

fn bound_key(bound: Option<i64>) -> String {
    bound.map(|b| b.to_string()).unwrap_or_else(|| "*".to_string())
}

// ─── Fingerprint ─────────────────────────────────────────────────────────────

/// Normalized key identifying a unique request for caching and deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─── Topic ───────────────────────────────────────────────────────────────────

/// Newtype for live-channel topic names (e.g. `"altcoin-season"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Topic(String);

impl Topic {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Topic {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Topic {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<SeriesKind> for Topic {
    fn from(kind: SeriesKind) -> Self {
        Self(kind.as_str().to_string())
    }
}

impl Serialize for Topic {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Topic {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Topic(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_ranged() {
        let req = SeriesRequest::altcoin_season(1_700_000_000, 1_700_086_400);
        assert_eq!(
            req.fingerprint().as_str(),
            "altcoin-season:1700000000:1700086400"
        );
    }

    #[test]
    fn test_fingerprint_unranged_drops_bounds() {
        let req = SeriesRequest::new(SeriesKind::Dominance, Some(1), Some(2));
        assert_eq!(req.fingerprint(), SeriesRequest::dominance().fingerprint());
        assert_eq!(req.fingerprint().as_str(), "dominance");
    }

    #[test]
    fn test_fingerprint_open_bound() {
        let req = SeriesRequest::new(SeriesKind::AltcoinSeason, None, Some(10));
        assert_eq!(req.fingerprint().as_str(), "altcoin-season:*:10");
    }

    #[test]
    fn test_series_kind_roundtrip_str() {
        for kind in [SeriesKind::AltcoinSeason, SeriesKind::Dominance] {
            assert_eq!(kind.as_str().parse::<SeriesKind>().unwrap(), kind);
        }
        assert!("btc".parse::<SeriesKind>().is_err());
    }

    #[test]
    fn test_topic_serializes_as_plain_string() {
        let json = serde_json::to_string(&Topic::new("dominance")).unwrap();
        assert_eq!(json, "\"dominance\"");
    }
}
