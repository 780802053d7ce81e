use super::Discovery;
use crate::config::parse_host_port;
use crate::error::{Result, RimlogError};
use crate::types::ServerDescriptor;
use crate::types::wire::{DiscoverResponse, SERVERS_PATH};
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;

/// Queries the discovery service over HTTP.
#[derive(Clone)]
pub struct HttpDiscovery {
    client: Client,
    url: Url,
    timeout: Duration,
}

impl HttpDiscovery {
    pub fn new(client: Client, discovery_addr: &str, timeout: Duration) -> Result<Self> {
        let (host, port) = parse_host_port(discovery_addr, "discovery_addr")?;
        let url = Url::parse(&format!("http://{}:{}{}", host, port, SERVERS_PATH))
            .map_err(|error| RimlogError::Config(error.to_string()))?;

        Ok(Self {
            client,
            url,
            timeout,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Discovery for HttpDiscovery {
    async fn discover_servers(&self) -> Result<Vec<ServerDescriptor>> {
        let response = self
            .client
            .get(self.url.clone())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|error| {
                RimlogError::Discovery(format!(
                    "discovery endpoint {} unreachable: {}",
                    self.url, error
                ))
            })?;

        if !response.status().is_success() {
            return Err(RimlogError::Discovery(format!(
                "discovery request failed: endpoint={} status={}",
                self.url,
                response.status()
            )));
        }

        let payload: DiscoverResponse = response.json().await.map_err(|error| {
            RimlogError::Discovery(format!(
                "invalid discovery response from {}: {}",
                self.url, error
            ))
        })?;

        tracing::debug!(
            "discovered {} data servers via {}",
            payload.servers.len(),
            self.url
        );

        Ok(payload.servers)
    }
}
