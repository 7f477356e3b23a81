//! Players, their owned-object bookkeeping and score.
//!
//! Players live in a [`PlayerList`] arena and are referenced everywhere by
//! [`PlayerId`]; entities never hold a direct reference to their owner.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::{EntityId, EntityKind};
use crate::hash::{StateHash, StateHasher};

/// Index of a player in the [`PlayerList`].
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(u32);

impl PlayerId {
    /// Creates a player ID from a raw index.
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Raw index.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlayerId({})", self.0)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kill and loss counters per entity kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    /// Enemy objects destroyed by this player.
    pub kills: BTreeMap<EntityKind, u32>,
    /// Own objects lost.
    pub losses: BTreeMap<EntityKind, u32>,
}

impl Score {
    /// Total kills across all kinds.
    #[must_use]
    pub fn total_kills(&self) -> u32 {
        self.kills.values().sum()
    }

    /// Total losses across all kinds.
    #[must_use]
    pub fn total_losses(&self) -> u32 {
        self.losses.values().sum()
    }
}

/// A super weapon owned by a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuperWeapon {
    /// Rules name.
    pub name: String,
    /// Owning player.
    pub owner: PlayerId,
    /// Full recharge time.
    pub recharge_ticks: u32,
    /// Ticks until ready.
    pub remaining_ticks: u32,
}

impl SuperWeapon {
    /// Returns true once fully charged.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.remaining_ticks == 0
    }

    /// Advances the charge by one tick.
    pub fn charge(&mut self) {
        self.remaining_ticks = self.remaining_ticks.saturating_sub(1);
    }

    /// Empties the charge after firing.
    pub fn reset(&mut self) {
        self.remaining_ticks = self.recharge_ticks;
    }
}

/// A participant in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    id: PlayerId,
    /// Display name.
    pub name: String,
    /// Faction/country name.
    pub country: String,
    /// Combatants can win or lose; neutral and special players cannot.
    pub is_combatant: bool,
    /// Observers only watch.
    pub is_observer: bool,
    /// Set once by end-of-game evaluation.
    pub is_defeated: bool,
    /// Spendable credits.
    pub credits: u32,
    /// Ticks until the player's units may cheer again.
    pub cheer_cooldown_ticks: u32,
    /// Kill/loss counters.
    pub score: Score,
    /// Credits spent on objects currently or previously owned.
    pub purchase_value: u64,
    /// Super weapons.
    pub super_weapons: Vec<SuperWeapon>,
    owned: Vec<EntityId>,
}

impl Player {
    fn new(id: PlayerId, name: &str, country: &str, is_combatant: bool) -> Self {
        Self {
            id,
            name: name.to_string(),
            country: country.to_string(),
            is_combatant,
            is_observer: false,
            is_defeated: false,
            credits: 0,
            cheer_cooldown_ticks: 0,
            score: Score::default(),
            purchase_value: 0,
            super_weapons: Vec::new(),
            owned: Vec::new(),
        }
    }

    /// Player ID.
    #[must_use]
    pub const fn id(&self) -> PlayerId {
        self.id
    }

    /// Owned objects in acquisition order.
    #[must_use]
    pub fn owned_objects(&self) -> &[EntityId] {
        &self.owned
    }

    /// Returns true if the player owns `entity`.
    #[must_use]
    pub fn owns(&self, entity: EntityId) -> bool {
        self.owned.contains(&entity)
    }

    /// Starts a cheer if the previous one has cooled down, then blocks further
    /// cheers for `cooldown_ticks`. Returns false while cooling down.
    pub fn try_cheer(&mut self, cooldown_ticks: u32) -> bool {
        if self.cheer_cooldown_ticks > 0 {
            return false;
        }
        self.cheer_cooldown_ticks = cooldown_ticks;
        true
    }

    pub(crate) fn add_owned_object(&mut self, entity: EntityId) {
        if !self.owns(entity) {
            self.owned.push(entity);
        }
    }

    pub(crate) fn remove_owned_object(&mut self, entity: EntityId) {
        self.owned.retain(|&e| e != entity);
    }

    pub(crate) fn record_kill(&mut self, kind: EntityKind) {
        *self.score.kills.entry(kind).or_insert(0) += 1;
    }

    pub(crate) fn record_loss(&mut self, kind: EntityKind) {
        *self.score.losses.entry(kind).or_insert(0) += 1;
    }
}

impl StateHash for Player {
    fn hash_state(&self, hasher: &mut StateHasher) {
        hasher.write_u32(self.id.0);
        hasher.write_str(&self.name);
        hasher.write_bool(self.is_combatant);
        hasher.write_bool(self.is_observer);
        hasher.write_bool(self.is_defeated);
        hasher.write_u32(self.credits);
        hasher.write_u32(self.cheer_cooldown_ticks);
        hasher.write_u64(self.purchase_value);
        hasher.write_u32(self.score.total_kills());
        hasher.write_u32(self.score.total_losses());
        hasher.write_u64(self.owned.len() as u64);
        for id in &self.owned {
            hasher.write_u64(id.as_u64());
        }
        for sw in &self.super_weapons {
            hasher.write_str(&sw.name);
            hasher.write_u32(sw.remaining_ticks);
        }
    }
}

/// Arena of players in join order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerList {
    players: Vec<Player>,
}

impl PlayerList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a player and returns its ID.
    pub fn add(&mut self, name: &str, country: &str, is_combatant: bool) -> PlayerId {
        #[allow(clippy::cast_possible_truncation)]
        let id = PlayerId::new(self.players.len() as u32);
        self.players.push(Player::new(id, name, country, is_combatant));
        id
    }

    /// Looks up a player.
    #[must_use]
    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id.0 as usize)
    }

    /// Looks up a player mutably.
    #[must_use]
    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(id.0 as usize)
    }

    /// Iterates players in join order.
    pub fn iter(&self) -> impl Iterator<Item = &Player> + '_ {
        self.players.iter()
    }

    /// Iterates players mutably in join order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Player> + '_ {
        self.players.iter_mut()
    }

    /// Iterates combatants in join order.
    pub fn combatants(&self) -> impl Iterator<Item = &Player> + '_ {
        self.players.iter().filter(|p| p.is_combatant)
    }

    /// Iterates combatants mutably in join order.
    pub fn combatants_mut(&mut self) -> impl Iterator<Item = &mut Player> + '_ {
        self.players.iter_mut().filter(|p| p.is_combatant)
    }

    /// Number of players.
    #[must_use]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Returns true if there are no players.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
