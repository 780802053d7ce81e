//! Shard placement for appends.
//!
//! A [`ShardPolicy`] picks the data server an append is sent to. Policies are
//! injected into the client, so callers can route records by payload, by
//! shard, or by any other rule without touching the append path.

use crate::types::ServerDescriptor;
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Trait for choosing the target server of an append.
pub trait ShardPolicy: Send + Sync {
    /// Selects one member of `servers` for `record`.
    ///
    /// Returns `None` only when `servers` is empty. The append path never
    /// calls a policy with an empty set.
    fn select<'a>(
        &self,
        servers: &'a [ServerDescriptor],
        record: &str,
    ) -> Option<&'a ServerDescriptor>;
}

/// Uniform random choice, independent of the payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomShardPolicy;

impl ShardPolicy for RandomShardPolicy {
    fn select<'a>(
        &self,
        servers: &'a [ServerDescriptor],
        _record: &str,
    ) -> Option<&'a ServerDescriptor> {
        if servers.is_empty() {
            return None;
        }

        let idx = rand::rng().random_range(0..servers.len());
        servers.get(idx)
    }
}

/// Rotates through the servers in order.
#[derive(Debug, Default)]
pub struct RoundRobinShardPolicy {
    counter: AtomicUsize,
}

impl RoundRobinShardPolicy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ShardPolicy for RoundRobinShardPolicy {
    fn select<'a>(
        &self,
        servers: &'a [ServerDescriptor],
        _record: &str,
    ) -> Option<&'a ServerDescriptor> {
        if servers.is_empty() {
            return None;
        }

        let idx = self.counter.fetch_add(1, Ordering::Relaxed) % servers.len();
        servers.get(idx)
    }
}
