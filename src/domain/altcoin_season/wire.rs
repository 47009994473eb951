//! Raw upstream types for the altcoin season chart endpoint.

use crate::domain::series::wire::StatusWire;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AltcoinSeasonEnvelope {
    pub data: AltcoinSeasonData,
    pub status: StatusWire,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AltcoinSeasonData {
    pub points: Vec<AltcoinSeasonPointWire>,
    #[serde(default)]
    pub historical_values: BTreeMap<String, AltcoinSeasonPointWire>,
    #[serde(default)]
    pub dial_configs: Vec<DialConfigWire>,
}

/// Numeric members arrive as decimal strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AltcoinSeasonPointWire {
    pub name: String,
    pub altcoin_index: String,
    pub altcoin_marketcap: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialConfigWire {
    pub start: f64,
    pub end: f64,
    pub name: String,
}
