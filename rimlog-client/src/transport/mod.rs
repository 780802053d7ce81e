//! Data server transport
//!
//! One request per operation against a single data server. Implementations
//! decide how connections are established and reused.

pub mod http;
pub mod ndjson;

use crate::error::Result;
use crate::types::wire::AppendRequest;
use crate::types::{CommittedRecord, Gsn, ServerDescriptor};
use async_trait::async_trait;
use futures::stream::BoxStream;

pub use http::{HttpDataClient, build_http_client};

/// Records reported by one data server on a subscribe stream.
///
/// The stream ends on end-of-segment; an `Err` item means the connection
/// failed and no further items follow.
pub type RecordStream = BoxStream<'static, Result<CommittedRecord>>;

/// Trait for the RPC surface of a data server
#[async_trait]
pub trait DataClient: Send + Sync {
    /// Append a record and return the gsn the server assigned to it
    async fn append(&self, server: &ServerDescriptor, request: AppendRequest) -> Result<Gsn>;

    /// Open a stream of committed records starting at `from_gsn`
    async fn subscribe(&self, server: &ServerDescriptor, from_gsn: Gsn) -> Result<RecordStream>;

    /// Ask the server to delete records below `gsn`
    async fn trim(&self, server: &ServerDescriptor, gsn: Gsn) -> Result<()>;

    /// Read a single committed record held by this server
    async fn read(&self, server: &ServerDescriptor, gsn: Gsn) -> Result<CommittedRecord>;
}
