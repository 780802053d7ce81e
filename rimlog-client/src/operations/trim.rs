use crate::discovery::Discovery;
use crate::error::Result;
use crate::transport::DataClient;
use crate::types::Gsn;
use std::sync::Arc;

#[derive(Clone)]
pub struct TrimOperation {
    discovery: Arc<dyn Discovery>,
    client: Arc<dyn DataClient>,
}

#[derive(Debug, Clone, Copy)]
pub struct TrimOperationRequest {
    pub gsn: Gsn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimOperationResult {
    /// Number of per-server trim requests started.
    pub dispatched: usize,
}

impl TrimOperation {
    pub fn new(discovery: Arc<dyn Discovery>, client: Arc<dyn DataClient>) -> Self {
        Self { discovery, client }
    }

    /// Sends a trim to every discovered server and returns without waiting
    /// for any of them. Per-server failures are only logged.
    pub async fn run(&self, request: TrimOperationRequest) -> Result<TrimOperationResult> {
        let TrimOperationRequest { gsn } = request;
        let servers = self.discovery.discover_servers().await?;
        let dispatched = servers.len();

        for server in servers {
            let client = self.client.clone();
            tokio::spawn(async move {
                if let Err(error) = client.trim(&server, gsn).await {
                    tracing::debug!(
                        "trim failed: server={} gsn={} error={}",
                        server.address(),
                        gsn,
                        error
                    );
                }
            });
        }

        tracing::debug!("trim dispatched: gsn={} servers={}", gsn, dispatched);
        Ok(TrimOperationResult { dispatched })
    }
}
