use super::Discovery;
use crate::error::Result;
use crate::types::ServerDescriptor;
use async_trait::async_trait;

/// Fixed topology, for deployments without a discovery service.
#[derive(Debug, Clone, Default)]
pub struct StaticDiscovery {
    servers: Vec<ServerDescriptor>,
}

impl StaticDiscovery {
    pub fn new(servers: Vec<ServerDescriptor>) -> Self {
        Self { servers }
    }

    pub fn servers(&self) -> &[ServerDescriptor] {
        &self.servers
    }
}

#[async_trait]
impl Discovery for StaticDiscovery {
    async fn discover_servers(&self) -> Result<Vec<ServerDescriptor>> {
        Ok(self.servers.clone())
    }
}
