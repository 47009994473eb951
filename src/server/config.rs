use std::env;
use std::time::Duration;

use crate::network::DEFAULT_UPSTREAM_URL;

/// Proxy configuration derived from environment variables.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub bind: String,
    pub port: u16,
    pub upstream_url: String,
    pub freshness_window: Duration,
    pub request_timeout: Duration,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8080,
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            freshness_window: Duration::from_secs(300),
            request_timeout: Duration::from_secs(30),
        }
    }
}

fn env_str(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_u16(name: &str, default: u16) -> u16 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl ProxyConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind: env_str("MARKET_PROXY_BIND", &defaults.bind),
            port: env_u16("MARKET_PROXY_PORT", defaults.port),
            upstream_url: env_str("MARKET_UPSTREAM_URL", &defaults.upstream_url),
            freshness_window: Duration::from_secs(env_u64(
                "MARKET_FRESHNESS_SECS",
                defaults.freshness_window.as_secs(),
            )),
            request_timeout: Duration::from_secs(env_u64(
                "MARKET_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}
