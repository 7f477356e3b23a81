//! Diplomacy table.
//!
//! Alliances are symmetric. Pairs are stored normalized (lower ID first) in a
//! `BTreeSet`, so iteration and hashing are in a fixed order on every peer.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::hash::{StateHash, StateHasher};
use crate::player::PlayerId;

/// Set of allied player pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllianceTable {
    pairs: BTreeSet<(PlayerId, PlayerId)>,
}

const fn normalize(a: PlayerId, b: PlayerId) -> (PlayerId, PlayerId) {
    if a.index() <= b.index() {
        (a, b)
    } else {
        (b, a)
    }
}

impl AllianceTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `a` and `b` are allied. A player is always allied with
    /// itself.
    #[must_use]
    pub fn are_allied(&self, a: PlayerId, b: PlayerId) -> bool {
        a == b || self.pairs.contains(&normalize(a, b))
    }

    /// Forms or breaks an alliance. Returns true if the table changed.
    pub fn set_allied(&mut self, a: PlayerId, b: PlayerId, allied: bool) -> bool {
        if a == b {
            return false;
        }
        let pair = normalize(a, b);
        if allied {
            self.pairs.insert(pair)
        } else {
            self.pairs.remove(&pair)
        }
    }

    /// Allies of `player`, in ID order.
    #[must_use]
    pub fn allies_of(&self, player: PlayerId) -> Vec<PlayerId> {
        self.pairs
            .iter()
            .filter_map(|&(a, b)| {
                if a == player {
                    Some(b)
                } else if b == player {
                    Some(a)
                } else {
                    None
                }
            })
            .collect()
    }

    /// Iterates allied pairs in order.
    pub fn pairs(&self) -> impl Iterator<Item = (PlayerId, PlayerId)> + '_ {
        self.pairs.iter().copied()
    }
}

impl StateHash for AllianceTable {
    fn hash_state(&self, hasher: &mut StateHasher) {
        hasher.write_u64(self.pairs.len() as u64);
        for (a, b) in &self.pairs {
            hasher.write_u32(a.index());
            hasher.write_u32(b.index());
        }
    }
}
