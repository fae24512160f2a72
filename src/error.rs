//! bpcluster Error Types

use thiserror::Error;

use crate::cluster::MemberId;

/// Result type alias for bpcluster operations
pub type Result<T> = std::result::Result<T, Error>;

/// bpcluster error types
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    // Membership errors
    #[error("Member not found: {0}")]
    MemberNotFound(MemberId),

    #[error("No peer to sync chain")]
    NoSyncPeerAvailable,

    #[error("Duplicated attribute of BP member: existing {existing}, new {candidate}")]
    DuplicateMemberAttribute { existing: String, candidate: String },

    #[error("Peer ID of local BP {name} is {configured}, but this node is {actual}")]
    InvalidSelfPeerIdentity {
        name: String,
        configured: String,
        actual: String,
    },

    #[error("Invalid BP member {name}: {reason}")]
    InvalidMember { name: String, reason: String },

    #[error("Runtime members of cluster are not loaded yet")]
    RuntimeMembersUnset,

    #[error("Members {members:?} do not match conf state {conf_state:?}")]
    ConfStateMismatch {
        members: Vec<MemberId>,
        conf_state: Vec<u64>,
    },

    // Snapshot errors
    #[error("Failed to decode snapshot: {0}")]
    SnapshotDecode(#[source] bincode::Error),

    #[error("Failed to encode snapshot: {0}")]
    SnapshotEncode(#[source] bincode::Error),

    // Status projection errors
    #[error("Status serialization error: {0}")]
    Status(#[from] serde_json::Error),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if this error is retryable
    ///
    /// Validation failures are final for the given input. A conf-state
    /// mismatch may clear once the engine catches up with the applied entries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::ConfStateMismatch { .. })
    }
}
