//! Topology discovery
//!
//! Provides a trait-based abstraction over how the client learns the set of
//! live data servers (the discovery service over HTTP, a fixed list, or a
//! cached view of either).

pub mod cached;
pub mod http;
pub mod static_list;

use crate::error::Result;
use crate::types::ServerDescriptor;
use async_trait::async_trait;

pub use cached::CachedDiscovery;
pub use http::HttpDiscovery;
pub use static_list::StaticDiscovery;

/// Trait for topology sources
#[async_trait]
pub trait Discovery: Send + Sync {
    /// Return the data servers that are currently live
    async fn discover_servers(&self) -> Result<Vec<ServerDescriptor>>;

    /// Drop any cached view so the next call re-resolves the topology
    fn invalidate(&self) {}
}
