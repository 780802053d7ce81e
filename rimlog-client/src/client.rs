use crate::config::ClientConfig;
use crate::discovery::{CachedDiscovery, Discovery, HttpDiscovery};
use crate::error::Result;
use crate::operations::{
    AppendOperation, AppendOperationRequest, ReadOperation, ReadOperationRequest,
    SubscribeOperation, SubscribeOperationRequest, TrimOperation, TrimOperationRequest,
};
use crate::placement::{RandomShardPolicy, ShardPolicy};
use crate::sequencer::ClientSequencer;
use crate::subscription::Subscription;
use crate::transport::{DataClient, HttpDataClient, build_http_client};
use crate::types::{AppendResult, ClientId, CommittedRecord, Csn, Gsn, ServerDescriptor, ShardId};
use std::sync::Arc;

pub struct ClientBuilder {
    config: ClientConfig,
    discovery: Option<Arc<dyn Discovery>>,
    data_client: Option<Arc<dyn DataClient>>,
    shard_policy: Option<Arc<dyn ShardPolicy>>,
    client_id: Option<ClientId>,
}

impl ClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            discovery: None,
            data_client: None,
            shard_policy: None,
            client_id: None,
        }
    }

    /// Replaces the HTTP discovery service as the topology source.
    ///
    /// The topology cache configured by `topology_ttl_ms` still applies.
    pub fn discovery(mut self, discovery: Arc<dyn Discovery>) -> Self {
        self.discovery = Some(discovery);
        self
    }

    pub fn data_client(mut self, data_client: Arc<dyn DataClient>) -> Self {
        self.data_client = Some(data_client);
        self
    }

    pub fn shard_policy(mut self, policy: Arc<dyn ShardPolicy>) -> Self {
        self.shard_policy = Some(policy);
        self
    }

    /// Pins the client id instead of drawing a random one.
    pub fn client_id(mut self, client_id: ClientId) -> Self {
        self.client_id = Some(client_id);
        self
    }

    pub fn build(self) -> Result<Client> {
        let ClientBuilder {
            config,
            discovery,
            data_client,
            shard_policy,
            client_id,
        } = self;
        config.validate()?;

        let mut http = None;
        let source: Arc<dyn Discovery> = match discovery {
            Some(discovery) => discovery,
            None => Arc::new(HttpDiscovery::new(
                shared_http(&mut http, &config)?,
                &config.discovery_addr,
                config.request_timeout(),
            )?),
        };
        let discovery: Arc<dyn Discovery> = if config.topology_ttl_ms > 0 {
            Arc::new(CachedDiscovery::new(source, config.topology_ttl()))
        } else {
            source
        };

        let data_client: Arc<dyn DataClient> = match data_client {
            Some(data_client) => data_client,
            None => Arc::new(HttpDataClient::new(
                shared_http(&mut http, &config)?,
                config.request_timeout(),
            )),
        };

        let shard_policy = shard_policy.unwrap_or_else(|| Arc::new(RandomShardPolicy));
        let sequencer = Arc::new(match client_id {
            Some(client_id) => ClientSequencer::with_client_id(client_id),
            None => ClientSequencer::new(),
        });

        tracing::info!(
            "rimlog client ready: client_id={} discovery_addr={} topology_ttl_ms={}",
            sequencer.client_id(),
            config.discovery_addr,
            config.topology_ttl_ms
        );

        Ok(Client {
            append: AppendOperation::new(
                discovery.clone(),
                data_client.clone(),
                shard_policy,
                sequencer.clone(),
            ),
            subscribe: SubscribeOperation::new(
                discovery.clone(),
                data_client.clone(),
                config.subscription.clone(),
            ),
            trim: TrimOperation::new(discovery.clone(), data_client.clone()),
            read: ReadOperation::new(discovery.clone(), data_client),
            discovery,
            sequencer,
        })
    }
}

/// Discovery and the data servers share one pooled HTTP client.
fn shared_http(
    slot: &mut Option<reqwest::Client>,
    config: &ClientConfig,
) -> Result<reqwest::Client> {
    if let Some(client) = slot {
        return Ok(client.clone());
    }
    let client = build_http_client(config)?;
    *slot = Some(client.clone());
    Ok(client)
}

/// Entry point for appending to, subscribing to and trimming the log.
///
/// Cheap to clone; clones share the client id, the csn counter, the topology
/// cache and the connection pool.
#[derive(Clone)]
pub struct Client {
    sequencer: Arc<ClientSequencer>,
    discovery: Arc<dyn Discovery>,
    append: AppendOperation,
    subscribe: SubscribeOperation,
    trim: TrimOperation,
    read: ReadOperation,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        ClientBuilder::new(config).build()
    }

    pub fn builder(config: ClientConfig) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    pub fn client_id(&self) -> ClientId {
        self.sequencer.client_id()
    }

    /// The csn the next append will carry.
    pub fn next_csn(&self) -> Csn {
        self.sequencer.peek()
    }

    /// Appends one record to a data server chosen by the shard policy.
    pub async fn append(&self, record: impl Into<String>) -> Result<AppendResult> {
        let result = self
            .append
            .run(AppendOperationRequest {
                record: record.into(),
            })
            .await?;
        Ok(result.into())
    }

    /// Opens an ordered stream of committed records starting at `from_gsn`.
    pub async fn subscribe(&self, from_gsn: Gsn) -> Result<Subscription> {
        self.subscribe
            .run(SubscribeOperationRequest { from_gsn })
            .await
    }

    /// Asks every data server to drop records below `gsn`.
    ///
    /// Returns once the requests are dispatched, with the number of servers
    /// they were sent to.
    pub async fn trim(&self, gsn: Gsn) -> Result<usize> {
        let result = self.trim.run(TrimOperationRequest { gsn }).await?;
        Ok(result.dispatched)
    }

    pub async fn read(&self, gsn: Gsn, shard_id: ShardId) -> Result<CommittedRecord> {
        self.read.run(ReadOperationRequest { gsn, shard_id }).await
    }

    /// Current topology, as served by the discovery layer.
    pub async fn servers(&self) -> Result<Vec<ServerDescriptor>> {
        self.discovery.discover_servers().await
    }
}
