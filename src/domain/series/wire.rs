//! Wire types shared by every series envelope.

use serde::{Deserialize, Serialize};

/// Upstream `status` block. Only the error members are guaranteed on every kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusWire {
    #[serde(default)]
    pub timestamp: Option<String>,
    pub error_code: String,
    pub error_message: String,
    /// Latency in milliseconds, sent as a string.
    #[serde(default)]
    pub elapsed: Option<String>,
    #[serde(default)]
    pub credit_count: Option<f64>,
}
