//! State hash and debug snapshot.
//!
//! [`Simulation::state_hash`] is the cheap cross-peer comparison: peers
//! exchange it every tick and a mismatch means desync.
//! [`Simulation::debug_state`] is the rich counterpart used offline to find
//! where two diverged runs differ. It is never hashed.
//!
//! Both only walk ordered structures: the world's `BTreeMap`, the player
//! list, the alliance set and the trait registry in registration order.

use glam::IVec2;
use serde::Serialize;

use super::{LocalViewer, Simulation};
use crate::capability::{TraitHandle, TraitId};
use crate::entity::{
    Entity, EntityId, EntityKind, Health, LifecycleState, Placement, ProjectileState,
};
use crate::hash::{StateHash, StateHasher};
use crate::player::{Player, PlayerId};

/// One trait's debug state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraitDebug {
    /// Trait type name.
    pub id: TraitId,
    /// Whatever the trait reports; `null` if nothing.
    pub state: serde_json::Value,
}

impl TraitDebug {
    fn of(handle: &TraitHandle) -> Self {
        Self {
            id: handle.id(),
            state: handle.debug_state().unwrap_or(serde_json::Value::Null),
        }
    }
}

/// One entity's debug state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityDebug {
    /// Identity.
    pub id: EntityId,
    /// Rules name.
    pub name: String,
    /// Type tag.
    pub kind: EntityKind,
    /// Owner.
    pub owner: Option<PlayerId>,
    /// Lifecycle state.
    pub state: LifecycleState,
    /// Hit points.
    pub health: Health,
    /// Placement, if placed.
    pub placement: Option<Placement>,
    /// Projectile state, for projectiles.
    pub projectile: Option<ProjectileState>,
    /// Entity-local traits.
    pub traits: Vec<TraitDebug>,
}

impl EntityDebug {
    fn of(entity: &Entity) -> Self {
        Self {
            id: entity.id(),
            name: entity.name().to_string(),
            kind: entity.kind(),
            owner: entity.owner(),
            state: entity.state(),
            health: entity.health(),
            placement: entity.placement(),
            projectile: entity.projectile().cloned(),
            traits: entity.traits().iter().map(TraitDebug::of).collect(),
        }
    }
}

/// Nested snapshot of the simulation for replay-diff tooling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebugState {
    /// Ticks completed.
    pub tick: u64,
    /// Simulated milliseconds elapsed.
    pub elapsed_ms: u64,
    /// Whether the game has ended.
    pub ended: bool,
    /// Last value drawn from the random source.
    pub rng_last_value: u32,
    /// Next identity to be allocated.
    pub next_id: u64,
    /// Entities registered in the world, in identity order.
    pub world: Vec<EntityDebug>,
    /// Off-world entities, in identity order.
    pub off_world: Vec<EntityDebug>,
    /// Updatable set, in insertion order.
    pub updatables: Vec<EntityId>,
    /// Players, in join order.
    pub players: Vec<Player>,
    /// Allied pairs.
    pub alliances: Vec<(PlayerId, PlayerId)>,
    /// Global traits, in registration order.
    pub traits: Vec<TraitDebug>,
    /// Countdown ticks remaining, if running.
    pub countdown: Option<u32>,
    /// Presentation-only viewer state.
    pub viewer: LocalViewer,
}

impl Simulation {
    /// Folds the reachable deterministic state into one integer.
    ///
    /// In order: the last random value, the next identity, every live world
    /// entity in identity order, every player in join order, the alliance
    /// table, then each global trait's optional hash in registration order.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = StateHasher::new();
        hasher.write_u32(self.rng.last_value());
        hasher.write_u64(self.arena.next_id());
        for entity in self.world.live() {
            entity.hash_state(&mut hasher);
        }
        for player in self.players.iter() {
            player.hash_state(&mut hasher);
        }
        self.alliances.hash_state(&mut hasher);
        for t in self.traits.iter() {
            if let Some(h) = t.state_hash() {
                hasher.write_u64(h);
            }
        }
        hasher.finish()
    }

    /// Builds the debug snapshot.
    #[must_use]
    pub fn debug_state(&self) -> DebugState {
        DebugState {
            tick: self.tick,
            elapsed_ms: self.elapsed_ms,
            ended: self.ended,
            rng_last_value: self.rng.last_value(),
            next_id: self.arena.next_id(),
            world: self.world.iter().map(EntityDebug::of).collect(),
            off_world: self.arena.iter().map(EntityDebug::of).collect(),
            updatables: self.updatables.clone(),
            players: self.players.iter().cloned().collect(),
            alliances: self.alliances.pairs().collect(),
            traits: self.traits.iter().map(TraitDebug::of).collect(),
            countdown: self.countdown.remaining(),
            viewer: self.viewer.clone(),
        }
    }

    /// Placement tile of a spawned entity, for callers that only need the
    /// position.
    #[must_use]
    pub fn tile_of(&self, id: EntityId) -> Option<IVec2> {
        self.world
            .get_by_id(id)
            .ok()
            .and_then(Entity::placement)
            .map(|p| p.tile)
    }
}
