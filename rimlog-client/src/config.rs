//! Client configuration.
//!
//! The structs here are plain `serde` types so that an application can embed
//! them in its own configuration. The client never reads files itself.

use crate::error::{Result, RimlogError};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Address of the discovery service, `host:port`.
    pub discovery_addr: String,
    /// Timeout applied to discovery, append, trim and read requests.
    ///
    /// Subscribe streams are long-lived and only bounded by the connect timeout.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// How long a discovered topology is reused before discovery is queried
    /// again. `0` queries discovery on every operation.
    #[serde(default = "default_topology_ttl_ms")]
    pub topology_ttl_ms: u64,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub subscription: SubscriptionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    #[serde(default = "default_pool_max_idle_per_host")]
    pub max_idle_per_host: usize,
    #[serde(default = "default_pool_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: default_pool_max_idle_per_host(),
            idle_timeout_ms: default_pool_idle_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionConfig {
    /// Depth of the ordered output channel handed to the caller.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Maximum distance, in gsns, a listener may run ahead of the delivery
    /// cursor before it stops forwarding records.
    ///
    /// `None` leaves the reorder buffer unbounded.
    #[serde(default)]
    pub max_skew: Option<u64>,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            max_skew: None,
        }
    }
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_topology_ttl_ms() -> u64 {
    1_000
}

fn default_pool_max_idle_per_host() -> usize {
    8
}

fn default_pool_idle_timeout_ms() -> u64 {
    90_000
}

fn default_channel_capacity() -> usize {
    1
}

impl ClientConfig {
    pub fn new(discovery_addr: impl Into<String>) -> Self {
        Self {
            discovery_addr: discovery_addr.into(),
            request_timeout_ms: default_request_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            topology_ttl_ms: default_topology_ttl_ms(),
            pool: PoolConfig::default(),
            subscription: SubscriptionConfig::default(),
        }
    }

    pub fn with_topology_ttl(mut self, ttl: Duration) -> Self {
        self.topology_ttl_ms = ttl.as_millis() as u64;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_max_skew(mut self, max_skew: Option<u64>) -> Self {
        self.subscription.max_skew = max_skew;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn topology_ttl(&self) -> Duration {
        Duration::from_millis(self.topology_ttl_ms)
    }

    pub fn validate(&self) -> Result<()> {
        parse_host_port(&self.discovery_addr, "discovery_addr")?;

        if self.request_timeout_ms == 0 {
            return Err(RimlogError::Config(
                "request_timeout_ms must be greater than zero".to_string(),
            ));
        }

        if self.subscription.channel_capacity == 0 {
            return Err(RimlogError::Config(
                "subscription.channel_capacity must be greater than zero".to_string(),
            ));
        }

        if self.subscription.max_skew == Some(0) {
            return Err(RimlogError::Config(
                "subscription.max_skew must be greater than zero when set".to_string(),
            ));
        }

        Ok(())
    }
}

/// Validates a `host:port` address and splits it. IPv6 hosts must be
/// bracketed; the port is mandatory.
pub(crate) fn parse_host_port(value: &str, field: &str) -> Result<(String, u16)> {
    let trimmed = value.trim();
    let invalid = |reason: String| {
        RimlogError::Config(format!("invalid {} '{}': {}", field, trimmed, reason))
    };

    let url = Url::parse(&format!("http://{}", trimmed))
        .map_err(|error| invalid(error.to_string()))?;
    if url.path() != "/"
        || url.query().is_some()
        || url.fragment().is_some()
        || !url.username().is_empty()
        || url.password().is_some()
    {
        return Err(invalid("expected host:port".to_string()));
    }

    let host = url
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| invalid("missing host".to_string()))?;

    // The url parser elides an explicit port that equals the scheme default.
    let explicit_port = trimmed
        .rsplit_once(':')
        .is_some_and(|(_, port)| !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()));
    let port = match url.port() {
        Some(port) => port,
        None if explicit_port => 80,
        None => return Err(invalid("missing port".to_string())),
    };

    Ok((host.to_string(), port))
}
