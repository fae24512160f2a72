//! Members Registry
//!
//! Indexed set of BP members, queryable by member ID, name and peer ID.

use std::collections::HashMap;
use std::sync::Arc;

use crate::cluster::member::{Member, MemberId, PeerId};
use crate::error::{Error, Result};

/// Registry of Raft members
///
/// The three tables always describe the same set of members as long as the
/// caller rejects duplicates before calling [`Members::add`].
#[derive(Debug, Default, Clone)]
pub struct Members {
    by_id: HashMap<MemberId, Arc<Member>>,
    by_name: HashMap<String, Arc<Member>>,
    /// Peer ID to member ID mapping
    by_peer: HashMap<PeerId, MemberId>,
    /// Endpoint URLs in add order. Never pruned on remove.
    urls: Vec<String>,
}

impl Members {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all tables and the URL list
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Insert or overwrite a member under all keys
    pub fn add(&mut self, member: Member) {
        tracing::debug!("added raft member {}", member.id.to_hex());

        let member = Arc::new(member);
        self.urls.push(member.url.clone());
        self.by_peer.insert(member.peer_id.clone(), member.id);
        self.by_name.insert(member.name.clone(), Arc::clone(&member));
        self.by_id.insert(member.id, member);
    }

    /// Remove a member from all key tables
    pub fn remove(&mut self, member: &Member) {
        tracing::debug!("removed raft member {}", member.id.to_hex());

        self.by_id.remove(&member.id);
        self.by_name.remove(&member.name);
        self.by_peer.remove(&member.peer_id);
    }

    /// Member with the given ID
    pub fn get_member(&self, id: MemberId) -> Option<Arc<Member>> {
        self.by_id.get(&id).cloned()
    }

    /// Member with the given name
    pub fn get_member_by_name(&self, name: &str) -> Option<Arc<Member>> {
        self.by_name.get(name).cloned()
    }

    /// Member ID registered for `peer_id`
    pub fn get_member_id_by_peer(&self, peer_id: &PeerId) -> Option<MemberId> {
        self.by_peer.get(peer_id).copied()
    }

    /// Peer ID of the member with the given ID
    pub fn get_member_peer_address(&self, id: MemberId) -> Result<PeerId> {
        self.by_id
            .get(&id)
            .map(|m| m.peer_id.clone())
            .ok_or(Error::MemberNotFound(id))
    }

    /// Fail if `candidate` shares an identity attribute with any member
    pub fn has_duplicated_member(&self, candidate: &Member) -> Result<()> {
        match self.by_id.values().find(|prev| prev.has_duplicated_attr(candidate)) {
            Some(prev) => {
                tracing::error!(
                    "duplicated attribute for new member: old={{{}}}, new={{{}}}",
                    prev,
                    candidate
                );
                Err(Error::DuplicateMemberAttribute {
                    existing: prev.to_string(),
                    candidate: candidate.to_string(),
                })
            }
            None => Ok(()),
        }
    }

    /// Unordered list of all members
    pub fn to_vec(&self) -> Vec<Arc<Member>> {
        self.by_id.values().cloned().collect()
    }

    /// Iterate over members in no particular order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Member>> {
        self.by_id.values()
    }

    /// IDs of all members, unordered
    pub fn ids(&self) -> Vec<MemberId> {
        self.by_id.keys().copied().collect()
    }

    /// Endpoint URLs of every add so far
    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// True if there are no members
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl std::fmt::Display for Members {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for member in self.by_id.values() {
            write!(f, "{{{}}}", member)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};
    use std::collections::HashSet;

    fn member(n: u64) -> Member {
        Member::new(
            MemberId(n),
            format!("bp{}", n),
            format!("http://127.0.0.1:{}", 10000 + n),
            PeerId::new(format!("peer-{}", n)),
        )
    }

    fn assert_tables_agree(mbrs: &Members) {
        let ids: HashSet<MemberId> = mbrs.by_id.keys().copied().collect();
        let by_name: HashSet<MemberId> = mbrs.by_name.values().map(|m| m.id).collect();
        let by_peer: HashSet<MemberId> = mbrs.by_peer.values().copied().collect();

        assert_eq!(mbrs.by_id.len(), mbrs.by_name.len());
        assert_eq!(mbrs.by_id.len(), mbrs.by_peer.len());
        assert_eq!(ids, by_name);
        assert_eq!(ids, by_peer);

        for m in mbrs.by_id.values() {
            assert!(Arc::ptr_eq(m, &mbrs.by_name[&m.name]));
            assert_eq!(mbrs.by_peer[&m.peer_id], m.id);
        }
    }

    #[test]
    fn test_add_and_lookup() {
        let mut mbrs = Members::new();
        mbrs.add(member(1));
        mbrs.add(member(2));

        assert_eq!(mbrs.len(), 2);
        assert_eq!(mbrs.get_member(MemberId(1)).unwrap().name, "bp1");
        assert_eq!(mbrs.get_member_by_name("bp2").unwrap().id, MemberId(2));
        assert_eq!(mbrs.get_member_id_by_peer(&PeerId::from("peer-2")), Some(MemberId(2)));
        assert_eq!(mbrs.get_member_peer_address(MemberId(1)).unwrap(), PeerId::from("peer-1"));

        // Absence is a normal outcome for plain lookups
        assert!(mbrs.get_member(MemberId(3)).is_none());
        assert!(mbrs.get_member_by_name("bp3").is_none());
        assert!(matches!(
            mbrs.get_member_peer_address(MemberId(3)),
            Err(Error::MemberNotFound(MemberId(3)))
        ));
    }

    #[test]
    fn test_remove_keeps_url_history() {
        let mut mbrs = Members::new();
        mbrs.add(member(1));
        mbrs.add(member(2));
        mbrs.remove(&member(1));

        assert_eq!(mbrs.len(), 1);
        assert!(mbrs.get_member(MemberId(1)).is_none());
        assert!(mbrs.get_member_by_name("bp1").is_none());
        assert!(mbrs.get_member_id_by_peer(&PeerId::from("peer-1")).is_none());
        assert_tables_agree(&mbrs);

        // URL list is append-only
        assert_eq!(mbrs.urls().len(), 2);
        assert_eq!(mbrs.urls()[0], "http://127.0.0.1:10001");

        mbrs.add(member(1));
        assert_eq!(mbrs.urls().len(), 3);
    }

    #[test]
    fn test_random_add_remove_sequence() {
        let mut rng = StdRng::seed_from_u64(0x5eed_b0c1);
        let mut mbrs = Members::new();
        let mut present: Vec<u64> = Vec::new();
        let mut adds = 0;

        for _ in 0..500 {
            let n = rng.gen_range(1..=20u64);
            if present.contains(&n) {
                mbrs.remove(&member(n));
                present.retain(|p| *p != n);
            } else if rng.gen_bool(0.7) {
                mbrs.add(member(n));
                present.push(n);
                adds += 1;
            } else if let Some(victim) = present.choose(&mut rng).copied() {
                mbrs.remove(&member(victim));
                present.retain(|p| *p != victim);
            }

            assert_tables_agree(&mbrs);
            assert_eq!(mbrs.len(), present.len());
            assert_eq!(mbrs.urls().len(), adds);
        }
    }

    #[test]
    fn test_has_duplicated_member() {
        let mut mbrs = Members::new();
        mbrs.add(member(1));

        assert!(mbrs.has_duplicated_member(&member(2)).is_ok());

        let mut same_peer = member(2);
        same_peer.peer_id = PeerId::from("peer-1");
        assert!(matches!(
            mbrs.has_duplicated_member(&same_peer),
            Err(Error::DuplicateMemberAttribute { .. })
        ));

        let mut same_url = member(2);
        same_url.url = "http://127.0.0.1:10001".to_string();
        assert!(mbrs.has_duplicated_member(&same_url).is_err());
    }

    #[test]
    fn test_reset_and_display() {
        let mut mbrs = Members::new();
        assert_eq!(mbrs.to_string(), "[]");

        mbrs.add(member(1));
        assert!(mbrs.to_string().contains("name=bp1"));
        assert_eq!(mbrs.to_vec().len(), 1);

        mbrs.reset();
        assert!(mbrs.is_empty());
        assert!(mbrs.urls().is_empty());
        assert!(mbrs.ids().is_empty());
    }
}
