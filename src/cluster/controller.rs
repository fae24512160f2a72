//! Raft Cluster Controller
//!
//! Reconciles the statically configured BP membership with the runtime
//! membership learned from snapshots and configuration changes.
//!
//! All mutable state sits in one `ClusterState` behind a single mutex.
//! Every public method takes that lock exactly once and never takes another
//! lock while holding it. The attached [`RaftEngine`] is queried under the
//! lock, so the engine must not call back into the cluster from
//! `leader()` or `status()`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::cluster::member::{Member, MemberId, PeerId};
use crate::cluster::members::Members;
use crate::cluster::status::{self, ConsensusInfo, JsonEncoder, RaftInfo, StatusEncoder};
use crate::config::BpClusterConfig;
use crate::error::{Error, Result};
use crate::raft::{BlockProducer, ConfChange, ConfState, RaftEngine, RaftSnapshot, SnapshotData};

/// Which registry answers membership reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effective {
    /// Members from static configuration
    Config,
    /// Members restored from a snapshot or changed at runtime. Terminal.
    Runtime,
}

impl std::fmt::Display for Effective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Effective::Config => write!(f, "CONFIG"),
            Effective::Runtime => write!(f, "RUNTIME"),
        }
    }
}

struct ClusterState {
    config_members: Members,
    members: Members,
    effective: Effective,
    node_id: Option<MemberId>,
    raft: Option<Arc<dyn RaftEngine>>,
    applied_index: u64,
    applied_term: u64,
    runtime_since: Option<DateTime<Utc>>,
}

impl ClusterState {
    fn new() -> Self {
        Self {
            config_members: Members::new(),
            members: Members::new(),
            effective: Effective::Config,
            node_id: None,
            raft: None,
            applied_index: 0,
            applied_term: 0,
            runtime_since: None,
        }
    }

    fn effective_members(&self) -> &Members {
        match self.effective {
            Effective::Config => &self.config_members,
            Effective::Runtime => &self.members,
        }
    }

    fn activate_runtime(&mut self) {
        if self.effective == Effective::Config {
            tracing::info!("runtime members of cluster are now effective");
            self.runtime_since = Some(Utc::now());
        }
        self.effective = Effective::Runtime;
    }

    fn add_runtime_member(&mut self, member: Member) {
        self.members.add(member);
        self.activate_runtime();
    }

    fn remove_runtime_member(&mut self, member: &Member) {
        self.members.remove(member);
        self.activate_runtime();
    }

    fn is_match(&self, conf_state: &ConfState) -> bool {
        let mut voters: Vec<u64> = conf_state.voters.clone();
        voters.sort_unstable();
        voters.dedup();

        voters.len() == self.members.len()
            && voters
                .iter()
                .all(|id| self.members.get_member(MemberId(*id)).is_some())
    }
}

/// Raft cluster of block producers
pub struct Cluster {
    chain_id: Vec<u8>,
    chain_timestamp: i64,
    node_name: String,
    size: u16,
    producer: Arc<dyn BlockProducer>,
    state: Mutex<ClusterState>,
}

impl Cluster {
    /// Create a cluster with empty membership; the config view is effective
    pub fn new(
        chain_id: impl Into<Vec<u8>>,
        node_name: impl Into<String>,
        size: u16,
        chain_timestamp: i64,
        producer: Arc<dyn BlockProducer>,
    ) -> Self {
        Self {
            chain_id: chain_id.into(),
            chain_timestamp,
            node_name: node_name.into(),
            size,
            producer,
            state: Mutex::new(ClusterState::new()),
        }
    }

    /// Create a cluster and add every configured BP as a config member
    pub fn from_config(config: &BpClusterConfig, producer: Arc<dyn BlockProducer>) -> Result<Self> {
        let cluster = Self::new(
            config.chain.id.as_bytes(),
            config.node.name.clone(),
            config.cluster_size(),
            config.chain.timestamp,
            producer,
        );

        for bp in &config.cluster.bps {
            let member = cluster.new_member(&bp.name, &bp.url, PeerId::new(bp.peer_id.clone()));
            cluster.add_member(member, true)?;
        }

        tracing::info!("{}", cluster);
        Ok(cluster)
    }

    /// Build a member whose ID is derived from this chain's identity
    pub fn new_member(&self, name: &str, url: &str, peer_id: PeerId) -> Member {
        let mut member = Member::new(MemberId(0), name, url, peer_id);
        member.calculate_id(&self.chain_id, self.chain_timestamp);
        member
    }

    /// Attach the running Raft engine
    pub fn attach_raft(&self, raft: Arc<dyn RaftEngine>) {
        self.state.lock().raft = Some(raft);
    }

    /// Record the member ID of this node
    pub fn set_node_id(&self, id: MemberId) {
        self.state.lock().node_id = Some(id);
    }

    /// Member ID of this node, once known
    pub fn node_id(&self) -> Option<MemberId> {
        self.state.lock().node_id
    }

    /// BP name of this node
    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    /// Statically configured number of BPs
    pub fn size(&self) -> u16 {
        self.size
    }

    /// Chain identity member IDs are derived from
    pub fn chain_id(&self) -> &[u8] {
        &self.chain_id
    }

    /// Index and term of the last recovered snapshot
    pub fn applied(&self) -> (u64, u64) {
        let state = self.state.lock();
        (state.applied_index, state.applied_term)
    }

    /// Registry currently answering membership reads
    pub fn effective(&self) -> Effective {
        self.state.lock().effective
    }

    /// Majority of the configured cluster size
    pub fn quorum(&self) -> u16 {
        self.size / 2 + 1
    }

    /// Add a member.
    ///
    /// Config members are checked for duplicated attributes and, for the
    /// local node, for a matching peer ID. Runtime members are trusted and
    /// make the runtime view effective.
    pub fn add_member(&self, member: Member, from_config: bool) -> Result<()> {
        tracing::debug!("add member to members: fromconfig={}, member={{{}}}", from_config, member);

        let mut state = self.state.lock();

        if !from_config {
            state.add_runtime_member(member);
            return Ok(());
        }

        state.config_members.has_duplicated_member(&member)?;

        if member.name == self.node_name {
            let actual = self.producer.local_peer_id();
            if member.peer_id != actual {
                return Err(Error::InvalidSelfPeerIdentity {
                    name: member.name,
                    configured: member.peer_id.to_string(),
                    actual: actual.to_string(),
                });
            }
            state.node_id = Some(member.id);
        }

        state.config_members.add(member);
        Ok(())
    }

    /// Remove a runtime member and make the runtime view effective
    pub fn remove_member(&self, member: &Member) {
        self.state.lock().remove_runtime_member(member);
    }

    /// Replace the runtime members with the ones carried by `snapshot`.
    ///
    /// Nothing changes if the payload cannot be decoded.
    pub fn recover(&self, snapshot: &RaftSnapshot) -> Result<()> {
        let data = SnapshotData::decode(&snapshot.data)?;

        tracing::info!("cluster recover from snapshot: {}", data);

        let mut state = self.state.lock();
        state.members.reset();
        state.activate_runtime();
        for member in data.members {
            state.members.add(member);
        }
        state.applied_index = snapshot.metadata.index;
        state.applied_term = snapshot.metadata.term;

        Ok(())
    }

    /// True if `conf_state` lists exactly the runtime member IDs
    pub fn is_match(&self, conf_state: &ConfState) -> bool {
        self.state.lock().is_match(conf_state)
    }

    /// Apply a committed membership change and check it against the
    /// engine's conf state. A mismatch leaves the change applied.
    pub fn apply_conf_change(&self, change: &ConfChange, conf_state: &ConfState) -> Result<()> {
        tracing::info!("apply conf change: {}", change);

        let mut state = self.state.lock();
        match change {
            ConfChange::AddMember(m) => state.add_runtime_member(m.clone()),
            ConfChange::RemoveMember(m) => state.remove_runtime_member(m),
        }

        if !state.is_match(conf_state) {
            let mut members = state.members.ids();
            members.sort();
            tracing::error!(
                "members of cluster do not match conf state: members={}, confstate={:?}",
                state.members,
                conf_state.voters
            );
            return Err(Error::ConfStateMismatch {
                members,
                conf_state: conf_state.voters.clone(),
            });
        }

        Ok(())
    }

    /// Peer ID of any member other than this node
    pub fn get_any_peer_address_to_sync(&self) -> Result<PeerId> {
        let state = self.state.lock();
        let peer = state
            .effective_members()
            .iter()
            .find(|m| m.name != self.node_name)
            .map(|m| m.peer_id.clone());
        peer.ok_or(Error::NoSyncPeerAvailable)
    }

    /// Effective member with the given ID
    pub fn member(&self, id: MemberId) -> Option<Arc<Member>> {
        self.state.lock().effective_members().get_member(id)
    }

    /// Effective member with the given name
    pub fn member_by_name(&self, name: &str) -> Option<Arc<Member>> {
        self.state.lock().effective_members().get_member_by_name(name)
    }

    /// Peer ID of the effective member with the given ID
    pub fn member_peer_address(&self, id: MemberId) -> Result<PeerId> {
        self.state.lock().effective_members().get_member_peer_address(id)
    }

    /// Member ID of the effective member using `peer_id`
    pub fn member_id_by_peer(&self, peer_id: &PeerId) -> Option<MemberId> {
        self.state.lock().effective_members().get_member_id_by_peer(peer_id)
    }

    /// Members of the effective view, unordered
    pub fn effective_members(&self) -> Vec<Arc<Member>> {
        self.state.lock().effective_members().to_vec()
    }

    /// Members from static configuration, unordered
    pub fn config_members(&self) -> Vec<Arc<Member>> {
        self.state.lock().config_members.to_vec()
    }

    /// Runtime members; fails until a snapshot or conf change has been applied
    pub fn runtime_members(&self) -> Result<Vec<Arc<Member>>> {
        let state = self.state.lock();
        match state.effective {
            Effective::Runtime => Ok(state.members.to_vec()),
            Effective::Config => Err(Error::RuntimeMembersUnset),
        }
    }

    /// Name of the current leader, or `id=<N>` if it is not a known member
    pub fn leader_name(&self) -> String {
        let state = self.state.lock();
        self.resolve_leader(&state)
    }

    /// Leader information, optionally with the raw engine status
    pub fn raft_info(&self, with_status: bool) -> RaftInfo {
        let state = self.state.lock();
        self.raft_info_locked(&state, with_status)
    }

    /// Consensus summary for status reporting
    pub fn consensus_info(&self) -> ConsensusInfo {
        self.consensus_info_with(&JsonEncoder)
    }

    /// Consensus summary using `encoder`; never fails
    pub fn consensus_info_with<E: StatusEncoder>(&self, encoder: &E) -> ConsensusInfo {
        let state = self.state.lock();
        let raft_info = self.raft_info_locked(&state, true);
        let members: Vec<&Member> = state.effective_members().iter().map(|m| &**m).collect();
        status::consensus_info(encoder, &raft_info, &members)
    }

    /// Snapshot of the cluster configuration and membership
    pub fn summary(&self) -> ClusterSummary {
        let state = self.state.lock();

        let sorted = |mbrs: &Members| {
            let mut list: Vec<Member> = mbrs.iter().map(|m| (**m).clone()).collect();
            list.sort_by_key(|m| m.id);
            list
        };

        ClusterSummary {
            size: self.size,
            quorum: self.quorum(),
            node_name: self.node_name.clone(),
            node_id: state.node_id,
            effective: state.effective,
            config_members: sorted(&state.config_members),
            runtime_members: sorted(&state.members),
            applied_index: state.applied_index,
            applied_term: state.applied_term,
            runtime_since: state.runtime_since,
        }
    }

    fn resolve_leader(&self, state: &ClusterState) -> String {
        let leader = state.raft.as_ref().map(|r| r.leader()).unwrap_or_default();

        match state.effective_members().get_member(leader) {
            Some(m) => m.name.clone(),
            None => format!("id={}", leader),
        }
    }

    fn raft_info_locked(&self, state: &ClusterState, with_status: bool) -> RaftInfo {
        let status = match (&state.raft, with_status) {
            (Some(raft), true) => match raft.status() {
                Ok(raw) => Some(raw),
                Err(e) => {
                    tracing::error!("failed to marshal raft consensus status: {}", e);
                    None
                }
            },
            _ => None,
        };

        RaftInfo {
            leader: self.resolve_leader(state),
            total: self.size.to_string(),
            name: self.node_name.clone(),
            raft_id: state.node_id.unwrap_or_default().to_string(),
            status,
        }
    }
}

impl std::fmt::Display for Cluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        write!(
            f,
            "raft cluster configure: total={}, NodeName={}, RaftID={}, config members: {}, runtime members: {}",
            self.size,
            self.node_name,
            state.node_id.unwrap_or_default().to_hex(),
            state.config_members,
            state.members
        )
    }
}

/// Cluster summary information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub size: u16,
    pub quorum: u16,
    pub node_name: String,
    pub node_id: Option<MemberId>,
    pub effective: Effective,
    pub config_members: Vec<Member>,
    pub runtime_members: Vec<Member>,
    pub applied_index: u64,
    pub applied_term: u64,
    pub runtime_since: Option<DateTime<Utc>>,
}
