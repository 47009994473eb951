//! Market dominance: bitcoin / ethereum / others share of total market cap.

#[cfg(feature = "http")]
pub mod client;
pub mod convert;
pub mod wire;

use serde::{Deserialize, Serialize};

/// Three-way split in percent. Components are non-negative but need not sum
/// to exactly 100 because upstream rounds each one independently.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DominanceSplit {
    pub bitcoin: f64,
    pub ethereum: f64,
    pub others: f64,
}

impl DominanceSplit {
    pub fn total(&self) -> f64 {
        self.bitcoin + self.ethereum + self.others
    }

    /// Combined share of everything except bitcoin.
    pub fn altcoins(&self) -> f64 {
        self.ethereum + self.others
    }
}
