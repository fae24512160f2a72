//! Configuration Change Types

use serde::{Deserialize, Serialize};

use crate::cluster::Member;

/// Voter IDs the Raft engine reports after applying a configuration change
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfState {
    pub voters: Vec<u64>,
}

impl ConfState {
    /// Conf state with the given voter IDs
    pub fn new(voters: Vec<u64>) -> Self {
        Self { voters }
    }
}

impl From<Vec<u64>> for ConfState {
    fn from(voters: Vec<u64>) -> Self {
        Self { voters }
    }
}

/// A committed membership change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfChange {
    /// Add a BP to the runtime membership
    AddMember(Member),
    /// Remove a BP from the runtime membership
    RemoveMember(Member),
}

impl std::fmt::Display for ConfChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfChange::AddMember(m) => write!(f, "add {{{}}}", m),
            ConfChange::RemoveMember(m) => write!(f, "remove {{{}}}", m),
        }
    }
}
