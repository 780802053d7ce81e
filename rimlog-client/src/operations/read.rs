use crate::discovery::Discovery;
use crate::error::{Result, RimlogError};
use crate::transport::DataClient;
use crate::types::{CommittedRecord, Gsn, ShardId};
use std::sync::Arc;

#[derive(Clone)]
pub struct ReadOperation {
    discovery: Arc<dyn Discovery>,
    client: Arc<dyn DataClient>,
}

#[derive(Debug, Clone, Copy)]
pub struct ReadOperationRequest {
    pub gsn: Gsn,
    pub shard_id: ShardId,
}

impl ReadOperation {
    pub fn new(discovery: Arc<dyn Discovery>, client: Arc<dyn DataClient>) -> Self {
        Self { discovery, client }
    }

    pub async fn run(&self, request: ReadOperationRequest) -> Result<CommittedRecord> {
        let ReadOperationRequest { gsn, shard_id } = request;

        let servers = self.discovery.discover_servers().await?;
        let Some(owner) = servers.iter().find(|server| server.shard_id == shard_id) else {
            return Err(RimlogError::ShardNotFound(shard_id));
        };

        self.client.read(owner, gsn).await.inspect_err(|error| {
            if error.is_transport() {
                self.discovery.invalidate();
            }
        })
    }
}
