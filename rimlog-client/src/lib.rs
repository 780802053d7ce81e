//! Rimlog Client - Client library for a sharded, globally ordered log service

pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod operations;
pub mod placement;
pub mod reassembly;
pub mod sequencer;
pub mod subscription;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{Client, ClientBuilder};
pub use config::{ClientConfig, PoolConfig, SubscriptionConfig};
pub use discovery::{CachedDiscovery, Discovery, HttpDiscovery, StaticDiscovery};
pub use error::{Result, RimlogError};
pub use operations::*;
pub use placement::{RandomShardPolicy, RoundRobinShardPolicy, ShardPolicy};
pub use reassembly::{IngestDecision, ReorderBuffer};
pub use sequencer::ClientSequencer;
pub use subscription::Subscription;
pub use transport::{DataClient, HttpDataClient, RecordStream, build_http_client};
pub use types::{AppendResult, ClientId, CommittedRecord, Csn, Gsn, ServerDescriptor, ShardId};
