use crate::types::{Gsn, ShardId};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RimlogError>;

#[derive(Error, Debug)]
pub enum RimlogError {
    #[error("Discovery error: {0}")]
    Discovery(String),

    #[error("No data servers available")]
    NoServersAvailable,

    #[error("Transport error: server={address} {message}")]
    Transport { address: String, message: String },

    #[error("Shard not found: {0}")]
    ShardNotFound(ShardId),

    #[error("Record not found: gsn={gsn} shard={shard_id}")]
    RecordNotFound { gsn: Gsn, shard_id: ShardId },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RimlogError {
    pub(crate) fn transport(address: impl Into<String>, message: impl std::fmt::Display) -> Self {
        RimlogError::Transport {
            address: address.into(),
            message: message.to_string(),
        }
    }

    /// Whether the error came from talking to a single data server.
    pub fn is_transport(&self) -> bool {
        matches!(self, RimlogError::Transport { .. })
    }
}
