use crate::discovery::Discovery;
use crate::error::{Result, RimlogError};
use crate::placement::ShardPolicy;
use crate::sequencer::ClientSequencer;
use crate::transport::DataClient;
use crate::types::wire::AppendRequest;
use crate::types::{AppendResult, Csn, Gsn, ShardId};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppendOperation {
    discovery: Arc<dyn Discovery>,
    client: Arc<dyn DataClient>,
    policy: Arc<dyn ShardPolicy>,
    sequencer: Arc<ClientSequencer>,
}

#[derive(Debug, Clone)]
pub struct AppendOperationRequest {
    pub record: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendOperationResult {
    pub gsn: Gsn,
    pub shard_id: ShardId,
    pub csn: Csn,
}

impl From<AppendOperationResult> for AppendResult {
    fn from(result: AppendOperationResult) -> Self {
        Self {
            gsn: result.gsn,
            shard_id: result.shard_id,
        }
    }
}

impl AppendOperation {
    pub fn new(
        discovery: Arc<dyn Discovery>,
        client: Arc<dyn DataClient>,
        policy: Arc<dyn ShardPolicy>,
        sequencer: Arc<ClientSequencer>,
    ) -> Self {
        Self {
            discovery,
            client,
            policy,
            sequencer,
        }
    }

    pub async fn run(&self, request: AppendOperationRequest) -> Result<AppendOperationResult> {
        let AppendOperationRequest { record } = request;

        let servers = self.discovery.discover_servers().await?;
        if servers.is_empty() {
            return Err(RimlogError::NoServersAvailable);
        }

        let target = self
            .policy
            .select(&servers, &record)
            .ok_or(RimlogError::NoServersAvailable)?
            .clone();

        // The csn is consumed even if the append below fails.
        let (client_id, csn) = self.sequencer.next();

        let gsn = match self
            .client
            .append(
                &target,
                AppendRequest {
                    client_id,
                    csn,
                    record,
                },
            )
            .await
        {
            Ok(gsn) => gsn,
            Err(error) => {
                tracing::debug!(
                    "append failed: server={} client_id={} csn={} error={}",
                    target.address(),
                    client_id,
                    csn,
                    error
                );
                if error.is_transport() {
                    self.discovery.invalidate();
                }
                return Err(error);
            }
        };

        tracing::trace!(
            "append committed: gsn={} shard_id={} csn={}",
            gsn,
            target.shard_id,
            csn
        );

        Ok(AppendOperationResult {
            gsn,
            shard_id: target.shard_id,
            csn,
        })
    }
}
