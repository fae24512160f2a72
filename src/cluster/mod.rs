//! Cluster Membership Module
//!
//! Block producer membership of the Raft cluster: the member registry,
//! the cluster controller reconciling configured and runtime members,
//! and status projection.

mod controller;
mod member;
mod members;
pub mod status;

pub use controller::{Cluster, ClusterSummary, Effective};
pub use member::{Member, MemberId, PeerId};
pub use members::Members;
pub use status::{ConsensusInfo, PeerInfo, RaftInfo};
