use super::{DataClient, RecordStream, ndjson};
use crate::config::ClientConfig;
use crate::error::{Result, RimlogError};
use crate::types::wire::{
    APPEND_PATH, AppendRequest, AppendResponse, NDJSON_CONTENT_TYPE, RECORDS_PATH, ReadResponse,
    SUBSCRIBE_PATH, TRIM_PATH, TrimRequest,
};
use crate::types::{CommittedRecord, Gsn, ServerDescriptor};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url, header};
use std::time::Duration;

/// Builds the HTTP client shared by discovery and every data server call.
///
/// Keep-alive connections are pooled per host, so repeated operations
/// against the same server reuse a connection. No client-wide timeout is set:
/// subscribe bodies stay open for the lifetime of a subscription.
pub fn build_http_client(config: &ClientConfig) -> Result<Client> {
    Client::builder()
        .connect_timeout(config.connect_timeout())
        .pool_max_idle_per_host(config.pool.max_idle_per_host)
        .pool_idle_timeout(Duration::from_millis(config.pool.idle_timeout_ms))
        .tcp_nodelay(true)
        .build()
        .map_err(|error| RimlogError::Config(format!("Failed to build HTTP client: {}", error)))
}

#[derive(Clone)]
pub struct HttpDataClient {
    client: Client,
    request_timeout: Duration,
}

impl HttpDataClient {
    pub fn new(client: Client, request_timeout: Duration) -> Self {
        Self {
            client,
            request_timeout,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Ok(Self::new(
            build_http_client(config)?,
            config.request_timeout(),
        ))
    }

    fn server_url(&self, server: &ServerDescriptor, path: &str) -> Result<Url> {
        Url::parse(&format!("http://{}{}", server.address(), path))
            .map_err(|error| RimlogError::transport(server.address(), error))
    }
}

#[async_trait]
impl DataClient for HttpDataClient {
    async fn append(&self, server: &ServerDescriptor, request: AppendRequest) -> Result<Gsn> {
        let url = self.server_url(server, APPEND_PATH)?;
        let response = self
            .client
            .post(url)
            .timeout(self.request_timeout)
            .json(&request)
            .send()
            .await
            .map_err(|error| RimlogError::transport(server.address(), error))?;

        if !response.status().is_success() {
            return Err(RimlogError::transport(
                server.address(),
                format!(
                    "append failed: status={} client_id={} csn={}",
                    response.status(),
                    request.client_id,
                    request.csn
                ),
            ));
        }

        let payload: AppendResponse = response
            .json()
            .await
            .map_err(|error| RimlogError::transport(server.address(), error))?;

        Ok(payload.gsn)
    }

    async fn subscribe(&self, server: &ServerDescriptor, from_gsn: Gsn) -> Result<RecordStream> {
        let mut url = self.server_url(server, SUBSCRIBE_PATH)?;
        url.query_pairs_mut()
            .append_pair("from_gsn", &from_gsn.to_string());

        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, NDJSON_CONTENT_TYPE)
            .send()
            .await
            .map_err(|error| RimlogError::transport(server.address(), error))?;

        if !response.status().is_success() {
            return Err(RimlogError::transport(
                server.address(),
                format!(
                    "subscribe failed: status={} from_gsn={}",
                    response.status(),
                    from_gsn
                ),
            ));
        }

        Ok(ndjson::decode_records(
            server.address(),
            response.bytes_stream(),
        ))
    }

    async fn trim(&self, server: &ServerDescriptor, gsn: Gsn) -> Result<()> {
        let url = self.server_url(server, TRIM_PATH)?;
        let response = self
            .client
            .post(url)
            .timeout(self.request_timeout)
            .json(&TrimRequest { gsn })
            .send()
            .await
            .map_err(|error| RimlogError::transport(server.address(), error))?;

        if !response.status().is_success() {
            return Err(RimlogError::transport(
                server.address(),
                format!("trim failed: status={} gsn={}", response.status(), gsn),
            ));
        }

        Ok(())
    }

    async fn read(&self, server: &ServerDescriptor, gsn: Gsn) -> Result<CommittedRecord> {
        let url = self.server_url(server, &format!("{}/{}", RECORDS_PATH, gsn))?;
        let response = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|error| RimlogError::transport(server.address(), error))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(RimlogError::RecordNotFound {
                gsn,
                shard_id: server.shard_id,
            });
        }

        if !response.status().is_success() {
            return Err(RimlogError::transport(
                server.address(),
                format!("read failed: status={} gsn={}", response.status(), gsn),
            ));
        }

        let payload: ReadResponse = response
            .json()
            .await
            .map_err(|error| RimlogError::transport(server.address(), error))?;

        Ok(CommittedRecord {
            gsn: payload.gsn,
            record: payload.record,
        })
    }
}
