//! Block Producer Member
//!
//! Identity record of a single Raft participant.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Raft member identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct MemberId(pub u64);

impl MemberId {
    /// Get the raw u64 value
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Hex form used in log lines
    pub fn to_hex(&self) -> String {
        format!("{:x}", self.0)
    }
}

impl std::fmt::Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for MemberId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<MemberId> for u64 {
    fn from(id: MemberId) -> Self {
        id.0
    }
}

/// Network peer identity of a node
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct PeerId(String);

impl PeerId {
    /// Wrap a network peer ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw peer ID
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the unset peer ID
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PeerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A block producer taking part in Raft consensus
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Member {
    /// Raft member ID
    pub id: MemberId,
    /// Human readable BP name, unique in the cluster
    pub name: String,
    /// Raft endpoint URL
    pub url: String,
    /// Network peer identity
    pub peer_id: PeerId,
}

impl Member {
    /// Create a member with an explicit ID
    pub fn new(id: MemberId, name: impl Into<String>, url: impl Into<String>, peer_id: PeerId) -> Self {
        Self {
            id,
            name: name.into(),
            url: url.into(),
            peer_id,
        }
    }

    /// Derive the member ID from the chain identity and member attributes.
    ///
    /// The ID is the first 8 bytes (big-endian) of
    /// `SHA-256(chain_id || name || url || peer_id || timestamp)`.
    pub fn calculate_id(&mut self, chain_id: &[u8], timestamp: i64) {
        let mut hasher = Sha256::new();
        hasher.update(chain_id);
        hasher.update(self.name.as_bytes());
        hasher.update(self.url.as_bytes());
        hasher.update(self.peer_id.as_str().as_bytes());
        hasher.update(timestamp.to_be_bytes());
        let digest = hasher.finalize();

        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        self.id = MemberId(u64::from_be_bytes(head));
    }

    /// Check that the member attributes are usable
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(self.invalid("name cannot be empty"));
        }

        if self.peer_id.is_empty() {
            return Err(self.invalid("peer_id cannot be empty"));
        }

        let host = self
            .url
            .strip_prefix("http://")
            .or_else(|| self.url.strip_prefix("https://"))
            .ok_or_else(|| self.invalid("url must start with http:// or https://"))?;
        if host.is_empty() || host.starts_with('/') {
            return Err(self.invalid("url has no host"));
        }

        Ok(())
    }

    /// True if any identity-bearing attribute collides with `other`
    pub fn has_duplicated_attr(&self, other: &Member) -> bool {
        self.id == other.id
            || self.name == other.name
            || self.url == other.url
            || self.peer_id == other.peer_id
    }

    fn invalid(&self, reason: &str) -> Error {
        Error::InvalidMember {
            name: self.name.clone(),
            reason: reason.to_string(),
        }
    }
}

impl std::fmt::Display for Member {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "name={}, id={}, url={}, peer_id={}",
            self.name,
            self.id.to_hex(),
            self.url,
            self.peer_id
        )
    }
}
