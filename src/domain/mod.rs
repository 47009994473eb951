//! Domain modules organized as vertical slices.
//!
//! `series` holds the envelope every kind converts into. Each kind slice contains:
//! - `mod.rs`: Rich domain types and helpers
//! - `wire.rs`: Raw serde structs matching upstream responses
//! - `convert.rs`: `TryFrom` conversions with validation
//! - `client.rs`: Sub-client over the query cache

pub mod altcoin_season;
pub mod dominance;
pub mod series;
