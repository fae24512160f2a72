//! Snapshot Payload
//!
//! Membership and chain position carried inside a Raft snapshot.

use serde::{Deserialize, Serialize};

use crate::cluster::Member;
use crate::error::{Error, Result};
use crate::raft::ConfState;

/// Chain position a snapshot was taken at
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub block_no: u64,
    pub block_hash: Vec<u8>,
}

/// Decoded snapshot payload
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SnapshotData {
    pub chain: ChainSnapshot,
    pub members: Vec<Member>,
}

impl SnapshotData {
    /// Payload for `members` at the given chain position
    pub fn new(chain: ChainSnapshot, members: Vec<Member>) -> Self {
        Self { chain, members }
    }

    /// Serialize with bincode
    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(Error::SnapshotEncode)
    }

    /// Deserialize a bincode payload
    pub fn decode(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data).map_err(Error::SnapshotDecode)
    }
}

impl std::fmt::Display for SnapshotData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "chain:no={}, members:[", self.chain.block_no)?;
        for member in &self.members {
            write!(f, "{{{}}}", member)?;
        }
        write!(f, "]")
    }
}

/// Raft-level snapshot metadata
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub index: u64,
    pub term: u64,
    pub conf_state: ConfState,
}

/// Snapshot as delivered by the Raft engine; `data` holds an encoded [`SnapshotData`]
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RaftSnapshot {
    pub data: Vec<u8>,
    pub metadata: SnapshotMetadata,
}

impl RaftSnapshot {
    /// Wrap a payload, taking the conf state from its member list
    pub fn new(data: &SnapshotData, index: u64, term: u64) -> Result<Self> {
        let conf_state = ConfState::new(data.members.iter().map(|m| m.id.as_u64()).collect());
        Ok(Self {
            data: data.encode()?,
            metadata: SnapshotMetadata {
                index,
                term,
                conf_state,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{MemberId, PeerId};

    #[test]
    fn test_snapshot_payload() {
        let data = SnapshotData::new(
            ChainSnapshot {
                block_no: 42,
                block_hash: vec![0xab; 32],
            },
            vec![Member::new(MemberId(7), "bp7", "http://bp7:11007", PeerId::from("p7"))],
        );

        let snap = RaftSnapshot::new(&data, 100, 3).unwrap();
        assert_eq!(snap.metadata.index, 100);
        assert_eq!(snap.metadata.conf_state.voters, vec![7]);
        assert_eq!(SnapshotData::decode(&snap.data).unwrap(), data);
        assert!(data.to_string().contains("name=bp7"));
    }

    #[test]
    fn test_decode_garbage() {
        let err = SnapshotData::decode(&[0xff, 0xff, 0xff]).unwrap_err();
        assert!(matches!(err, Error::SnapshotDecode(_)));
    }
}
