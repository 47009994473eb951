//! Raw upstream types for the dominance chart endpoint.

use crate::domain::series::wire::StatusWire;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DominanceEnvelope {
    pub data: DominanceData,
    pub status: StatusWire,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DominanceData {
    pub points: Vec<DominancePointWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DominancePointWire {
    /// `[bitcoin, ethereum, others]`.
    pub dominance: Vec<f64>,
    pub timestamp: String,
}
