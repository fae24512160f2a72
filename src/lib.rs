//! bpcluster - Raft Block Producer Cluster Membership
//!
//! Membership-tracking core of a Raft-based blockchain consensus node.
//!
//! # Architecture
//!
//! A node starts with the block producers (BPs) listed in its static
//! configuration. Once the Raft engine restores a snapshot or applies a
//! configuration change, the membership learned at runtime becomes
//! authoritative for the rest of the process lifetime.
//!
//! # Features
//!
//! - Member registry indexed by member ID, name and peer ID
//! - Validation of configured BPs (duplicate attributes, local peer ID)
//! - Snapshot restore and conf-change application
//! - Quorum computation from the configured cluster size
//! - Leader name resolution and consensus status projection

pub mod cluster;
pub mod config;
pub mod error;
pub mod raft;

pub use config::BpClusterConfig;
pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::cluster::{Cluster, ConsensusInfo, Effective, Member, MemberId, Members, PeerId, RaftInfo};
    pub use crate::config::BpClusterConfig;
    pub use crate::error::{Error, Result};
    pub use crate::raft::{BlockProducer, ConfChange, ConfState, RaftEngine, RaftSnapshot, SnapshotData};
}
