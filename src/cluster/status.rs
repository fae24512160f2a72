//! Status Projection
//!
//! Leader and consensus summaries exposed to status/RPC reporting.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::cluster::member::Member;
use crate::error::Result;

/// Consensus implementation tag reported in [`ConsensusInfo::consensus_type`]
pub const CONSENSUS_NAME: &str = "raft";

/// Leader information of the Raft cluster
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RaftInfo {
    /// Leader name, or `id=<N>` if the leader is not a known member
    pub leader: String,
    /// Configured cluster size
    pub total: String,
    /// Local node name
    pub name: String,
    /// Local member ID
    pub raft_id: String,
    /// Raw Raft engine status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Box<RawValue>>,
}

/// Per-BP record listed in [`ConsensusInfo::bps`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "RaftID")]
    pub raft_id: String,
    #[serde(rename = "PeerID")]
    pub peer_id: String,
}

impl From<&Member> for PeerInfo {
    fn from(m: &Member) -> Self {
        Self {
            name: m.name.clone(),
            raft_id: m.id.to_string(),
            peer_id: m.peer_id.to_string(),
        }
    }
}

/// Consensus summary of the node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusInfo {
    #[serde(rename = "Type")]
    pub consensus_type: String,
    /// Serialized [`RaftInfo`]
    #[serde(rename = "Info", default)]
    pub info: String,
    /// Serialized [`PeerInfo`] per effective member
    #[serde(rename = "Bps", default)]
    pub bps: Vec<String>,
}

impl Default for ConsensusInfo {
    fn default() -> Self {
        Self {
            consensus_type: CONSENSUS_NAME.to_string(),
            info: String::new(),
            bps: Vec::new(),
        }
    }
}

/// Serializer used for status records
pub trait StatusEncoder {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> serde_json::Result<String>;
}

/// Compact JSON encoding
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoder;

impl StatusEncoder for JsonEncoder {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> serde_json::Result<String> {
        serde_json::to_string(value)
    }
}

/// Build the consensus summary; any encoding failure yields the default record
pub fn consensus_info<E: StatusEncoder>(encoder: &E, raft_info: &RaftInfo, members: &[&Member]) -> ConsensusInfo {
    match try_consensus_info(encoder, raft_info, members) {
        Ok(info) => info,
        Err(e) => {
            tracing::error!("failed to marshal raft consensus info: {}", e);
            ConsensusInfo::default()
        }
    }
}

fn try_consensus_info<E: StatusEncoder>(encoder: &E, raft_info: &RaftInfo, members: &[&Member]) -> Result<ConsensusInfo> {
    let info = encoder.encode(raft_info)?;

    let bps = members
        .iter()
        .map(|m| {
            encoder.encode(&PeerInfo::from(*m)).map_err(|e| {
                tracing::error!("failed to marshal raft consensus bp {}", m.id.to_hex());
                e
            })
        })
        .collect::<serde_json::Result<Vec<_>>>()?;

    Ok(ConsensusInfo {
        info,
        bps,
        ..ConsensusInfo::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{MemberId, PeerId};
    use serde::ser::Error as _;

    struct FailingEncoder;

    impl StatusEncoder for FailingEncoder {
        fn encode<T: Serialize + ?Sized>(&self, _value: &T) -> serde_json::Result<String> {
            Err(serde_json::Error::custom("encoder fault"))
        }
    }

    fn raft_info(status: Option<&str>) -> RaftInfo {
        RaftInfo {
            leader: "bp1".to_string(),
            total: "3".to_string(),
            name: "bp2".to_string(),
            raft_id: "2".to_string(),
            status: status.map(|s| RawValue::from_string(s.to_string()).unwrap()),
        }
    }

    #[test]
    fn test_raft_info_fields() {
        let json = serde_json::to_string(&raft_info(None)).unwrap();
        assert_eq!(json, r#"{"Leader":"bp1","Total":"3","Name":"bp2","RaftId":"2"}"#);

        // Status is passed through untouched
        let json = serde_json::to_string(&raft_info(Some(r#"{"term":5,"lead":1}"#))).unwrap();
        assert!(json.ends_with(r#""Status":{"term":5,"lead":1}}"#));
    }

    #[test]
    fn test_consensus_info() {
        let m1 = Member::new(MemberId(1), "bp1", "http://bp1:1", PeerId::from("p1"));
        let m2 = Member::new(MemberId(2), "bp2", "http://bp2:1", PeerId::from("p2"));

        let cons = consensus_info(&JsonEncoder, &raft_info(None), &[&m1, &m2]);
        assert_eq!(cons.consensus_type, "raft");
        assert_eq!(cons.bps.len(), 2);
        assert_eq!(cons.bps[0], r#"{"Name":"bp1","RaftID":"1","PeerID":"p1"}"#);

        let info: RaftInfo = serde_json::from_str(&cons.info).unwrap();
        assert_eq!(info.leader, "bp1");

        let json = serde_json::to_value(&cons).unwrap();
        assert_eq!(json["Type"], "raft");
        assert_eq!(json["Bps"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_consensus_info_degrades_on_fault() {
        let m1 = Member::new(MemberId(1), "bp1", "http://bp1:1", PeerId::from("p1"));

        let cons = consensus_info(&FailingEncoder, &raft_info(None), &[&m1]);
        assert_eq!(cons, ConsensusInfo::default());
        assert_eq!(cons.consensus_type, CONSENSUS_NAME);
        assert!(cons.bps.is_empty());
    }
}
