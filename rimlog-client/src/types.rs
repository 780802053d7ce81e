//! Core data types shared by every client operation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Global sequence number assigned by the data servers at commit time.
///
/// Gsns are strictly increasing across the whole log. Trimming can leave
/// holes below the trim point.
pub type Gsn = u64;

/// Client sequence number attached to every append issued by one client.
pub type Csn = u64;

/// Best-effort unique identifier of a client instance.
pub type ClientId = u32;

/// Identifier of an independently addressable partition of the log.
pub type ShardId = u32;

/// A data server as reported by the discovery service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerDescriptor {
    pub ip: String,
    pub port: u16,
    pub shard_id: ShardId,
}

impl ServerDescriptor {
    pub fn new(ip: impl Into<String>, port: u16, shard_id: ShardId) -> Self {
        Self {
            ip: ip.into(),
            port,
            shard_id,
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

impl fmt::Display for ServerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} (shard {})", self.ip, self.port, self.shard_id)
    }
}

/// A record that has been committed and ordered by the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedRecord {
    pub gsn: Gsn,
    pub record: String,
}

impl CommittedRecord {
    pub fn new(gsn: Gsn, record: impl Into<String>) -> Self {
        Self {
            gsn,
            record: record.into(),
        }
    }
}

/// Outcome of a successful append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendResult {
    pub gsn: Gsn,
    pub shard_id: ShardId,
}

/// JSON payloads exchanged with the discovery service and the data servers.
pub mod wire {
    use super::{ClientId, CommittedRecord, Csn, Gsn, ServerDescriptor};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct DiscoverResponse {
        #[serde(default)]
        pub servers: Vec<ServerDescriptor>,
    }

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct AppendRequest {
        pub client_id: ClientId,
        pub csn: Csn,
        pub record: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct AppendResponse {
        pub gsn: Gsn,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct SubscribeQuery {
        pub from_gsn: Gsn,
    }

    /// One line of a subscribe stream.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct SubscribeFrame {
        pub gsn: Gsn,
        pub record: String,
    }

    impl From<SubscribeFrame> for CommittedRecord {
        fn from(frame: SubscribeFrame) -> Self {
            CommittedRecord {
                gsn: frame.gsn,
                record: frame.record,
            }
        }
    }

    impl From<CommittedRecord> for SubscribeFrame {
        fn from(record: CommittedRecord) -> Self {
            SubscribeFrame {
                gsn: record.gsn,
                record: record.record,
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct TrimRequest {
        pub gsn: Gsn,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ReadResponse {
        pub gsn: Gsn,
        pub record: String,
    }

    pub const SERVERS_PATH: &str = "/api/v1/servers";
    pub const APPEND_PATH: &str = "/api/v1/append";
    pub const SUBSCRIBE_PATH: &str = "/api/v1/subscribe";
    pub const TRIM_PATH: &str = "/api/v1/trim";
    pub const RECORDS_PATH: &str = "/api/v1/records";

    pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";
}
