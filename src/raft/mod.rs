//! Raft Engine Interface
//!
//! Types and traits through which the cluster talks to the Raft engine
//! and the rest of the node. Replication and elections live elsewhere.

mod conf;
mod snapshot;

pub use conf::{ConfChange, ConfState};
pub use snapshot::{ChainSnapshot, RaftSnapshot, SnapshotData, SnapshotMetadata};

use serde_json::value::RawValue;

use crate::cluster::{MemberId, PeerId};

/// Running Raft engine as seen by the cluster
pub trait RaftEngine: Send + Sync {
    /// Member ID of the current leader, `MemberId(0)` if none is known
    fn leader(&self) -> MemberId;

    /// Engine status as a JSON document, passed through unmodified
    fn status(&self) -> serde_json::Result<Box<RawValue>>;
}

/// Block production side of the node
pub trait BlockProducer: Send + Sync {
    /// Network identity of this node
    fn local_peer_id(&self) -> PeerId;
}
