//! Live update channel: messages, subscriptions, lifecycle, events.
//!
//! The transport lives in `native.rs` (`tokio-tungstenite`, `ws-native`
//! feature). This module defines the wire messages, the events handed to the
//! consumer and the channel configuration; `lifecycle.rs` holds the connection
//! state machine the transport drives.

pub mod lifecycle;
pub mod subscriptions;

#[cfg(feature = "ws-native")]
pub mod native;

use crate::error::ChannelError;
use crate::shared::Topic;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use lifecycle::{Action, ConnectionState, Input, Lifecycle};
pub use subscriptions::SubscriptionSet;

// ─── Outbound messages ───────────────────────────────────────────────────────

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageOut {
    Subscribe { topic: Topic },
    Unsubscribe { topic: Topic },
}

// ─── Inbound messages ────────────────────────────────────────────────────────

/// Raw inbound message: `{"type": <topic>, "payload": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageIn {
    #[serde(rename = "type")]
    pub topic: Topic,
    #[serde(default, alias = "data")]
    pub payload: serde_json::Value,
}

// ─── ChannelEvent ────────────────────────────────────────────────────────────

/// Events emitted by the live channel to the consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    StateChanged(ConnectionState),
    /// A message for a subscribed topic.
    Message {
        topic: Topic,
        payload: serde_json::Value,
    },
    /// The socket closed (a reconnect may follow).
    Closed { code: Option<u16>, reason: String },
    Error(ChannelError),
}

// ─── Config ──────────────────────────────────────────────────────────────────

/// Configuration for the live channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelConfig {
    pub url: String,
    /// Consecutive failed connect attempts before giving up.
    pub max_reconnect_attempts: u32,
    pub base_reconnect_delay_ms: u64,
    pub max_reconnect_delay_ms: u64,
    pub reconnect_jitter_ms: u64,
    /// Bound on a single connect attempt, handshake included.
    pub connect_timeout_ms: u64,
    pub event_capacity: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            url: crate::network::DEFAULT_WS_URL.to_string(),
            max_reconnect_attempts: 5,
            base_reconnect_delay_ms: 1000,
            max_reconnect_delay_ms: 30_000,
            reconnect_jitter_ms: 250,
            connect_timeout_ms: 10_000,
            event_capacity: 256,
        }
    }
}

impl ChannelConfig {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            ..Self::default()
        }
    }

    /// Delay before the next connect attempt: `base * 2^(failures - 1)`,
    /// capped, plus jitter. A clean drop with no failures waits `base`.
    pub fn reconnect_delay(&self, failures: u32) -> Duration {
        let exp = failures.max(1).saturating_sub(1).min(20);
        let base = self
            .base_reconnect_delay_ms
            .saturating_mul(1u64 << exp)
            .min(self.max_reconnect_delay_ms);
        let jitter = if self.reconnect_jitter_ms > 0 {
            rand::random::<u64>() % self.reconnect_jitter_ms
        } else {
            0
        };
        Duration::from_millis(base + jitter)
    }
}
