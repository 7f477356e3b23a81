//! Entity types for the simulation kernel.
//!
//! - [`EntityId`]: permanent identity, assigned once and never reused
//! - [`EntityKind`]: type tag (building, infantry, projectile, ...)
//! - [`LifecycleFlags`] / [`LifecycleState`]: where the entity is in its
//!   lifecycle
//! - [`Entity`]: the complete entity container, including its own ordered
//!   [`TraitRegistry`]
//!
//! # Lifecycle
//!
//! ```text
//! Unregistered --spawn--> Spawned --unspawn--> Unregistered
//!                           |  ^
//!                       limbo  unlimbo
//!                           v  |
//!                          Limbo
//! Spawned | Limbo | Unregistered --destroy--> Destroyed --dispose--> Disposed
//! ```
//!
//! Transitions are driven by [`Simulation`](crate::simulation::Simulation);
//! the entity only records the resulting flags.

pub mod components;

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::capability::{Capability, TraitRegistry};
use crate::hash::{StateHash, StateHasher};
use crate::player::PlayerId;
use crate::rules::ObjectRules;

pub use components::{Health, LimboData, Placement, ProjectileState};

/// Unique identifier for an entity.
///
/// Identities are allocated monotonically by the simulation and never reused,
/// even after the entity is disposed.
///
/// ```
/// use rampart_core::entity::EntityId;
///
/// let id1 = EntityId::new(1);
/// let id2 = EntityId::new(2);
///
/// assert!(id1 < id2);
/// assert_eq!(id1.as_u64(), 1);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Creates a new `EntityId` from a raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl From<EntityId> for u64 {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

/// Entity type tag.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Structure occupying a footprint of tiles.
    Building,
    /// Foot soldier.
    Infantry,
    /// Ground or naval vehicle.
    Vehicle,
    /// Aircraft.
    Aircraft,
    /// Walls, ore and other tile overlays.
    Overlay,
    /// Trees and other terrain objects.
    Terrain,
    /// Craters and scorch marks.
    Smudge,
    /// In-flight weapon.
    Projectile,
    /// Falling wreckage.
    Debris,
}

impl EntityKind {
    /// Returns true for infantry, vehicles and aircraft.
    #[must_use]
    pub const fn is_unit(self) -> bool {
        matches!(self, Self::Infantry | Self::Vehicle | Self::Aircraft)
    }

    /// Returns true for buildings and units: objects that count towards a
    /// player's survival.
    #[must_use]
    pub const fn is_techno(self) -> bool {
        matches!(self, Self::Building) || self.is_unit()
    }

    /// Returns true if entities of this kind need a per-tick update even
    /// without a tick trait.
    #[must_use]
    pub const fn always_updates(self) -> bool {
        matches!(self, Self::Projectile | Self::Debris)
    }

    const fn discriminant(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Building => "Building",
            Self::Infantry => "Infantry",
            Self::Vehicle => "Vehicle",
            Self::Aircraft => "Aircraft",
            Self::Overlay => "Overlay",
            Self::Terrain => "Terrain",
            Self::Smudge => "Smudge",
            Self::Projectile => "Projectile",
            Self::Debris => "Debris",
        };
        write!(f, "{name}")
    }
}

bitflags! {
    /// Raw lifecycle flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct LifecycleFlags: u32 {
        /// Registered in the world and placed.
        const SPAWNED = 1 << 0;
        /// Withdrawn from the world with state retained.
        const LIMBO = 1 << 1;
        /// Destroyed; terminal.
        const DESTROYED = 1 << 2;
        /// Traits torn down; terminal and irreversible.
        const DISPOSED = 1 << 3;
        /// Falling out of the sky; still spawned.
        const CRASHING = 1 << 4;
        /// Left behind as rubble after destruction.
        const RUBBLE = 1 << 5;
    }
}

/// The single lifecycle state an entity is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    /// Created, or unspawned, and not in limbo.
    Unregistered,
    /// Live in the world.
    Spawned,
    /// Withdrawn from the world with identity and state retained.
    Limbo,
    /// Destroyed but not yet disposed.
    Destroyed,
    /// Disposed.
    Disposed,
}

/// A simulated world object.
///
/// # Invariants
///
/// - `id` never changes.
/// - Exactly one [`LifecycleState`] applies at any instant; see
///   [`Entity::state`].
pub struct Entity {
    id: EntityId,
    rules: ObjectRules,
    owner: Option<PlayerId>,
    original_owner: Option<PlayerId>,
    flags: LifecycleFlags,
    health: Health,
    placement: Option<Placement>,
    projectile: Option<ProjectileState>,
    limbo: Option<LimboData>,
    traits: TraitRegistry,
    purchase_value: u32,
}

impl Entity {
    /// Creates an unregistered entity from its rules.
    #[must_use]
    pub fn new(id: EntityId, rules: ObjectRules) -> Self {
        let health = Health::full(rules.max_health);
        Self {
            id,
            rules,
            owner: None,
            original_owner: None,
            flags: LifecycleFlags::empty(),
            health,
            placement: None,
            projectile: None,
            limbo: None,
            traits: TraitRegistry::new(),
            purchase_value: 0,
        }
    }

    /// Returns the entity's identity.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Returns the entity's type tag.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.rules.kind
    }

    /// Returns the rules name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.rules.name
    }

    /// Returns the entity's rules.
    #[must_use]
    pub const fn rules(&self) -> &ObjectRules {
        &self.rules
    }

    /// Current owner.
    #[must_use]
    pub const fn owner(&self) -> Option<PlayerId> {
        self.owner
    }

    /// First owner the entity ever had. Used for loss accounting when the
    /// entity has since been captured or mind-controlled.
    #[must_use]
    pub const fn original_owner(&self) -> Option<PlayerId> {
        self.original_owner
    }

    pub(crate) fn set_owner(&mut self, owner: Option<PlayerId>) {
        if self.original_owner.is_none() {
            self.original_owner = owner;
        }
        self.owner = owner;
    }

    /// Raw lifecycle flags.
    #[must_use]
    pub const fn flags(&self) -> LifecycleFlags {
        self.flags
    }

    pub(crate) fn flags_mut(&mut self) -> &mut LifecycleFlags {
        &mut self.flags
    }

    /// Derived lifecycle state.
    #[must_use]
    pub const fn state(&self) -> LifecycleState {
        if self.flags.contains(LifecycleFlags::DISPOSED) {
            LifecycleState::Disposed
        } else if self.flags.contains(LifecycleFlags::DESTROYED) {
            LifecycleState::Destroyed
        } else if self.flags.contains(LifecycleFlags::SPAWNED) {
            LifecycleState::Spawned
        } else if self.flags.contains(LifecycleFlags::LIMBO) {
            LifecycleState::Limbo
        } else {
            LifecycleState::Unregistered
        }
    }

    /// Returns true if the entity is live in the world.
    #[must_use]
    pub const fn is_spawned(&self) -> bool {
        self.flags.contains(LifecycleFlags::SPAWNED)
    }

    /// Returns true once the entity has been destroyed.
    #[must_use]
    pub const fn is_destroyed(&self) -> bool {
        self.flags.contains(LifecycleFlags::DESTROYED)
    }

    /// Returns true once the entity has been disposed.
    #[must_use]
    pub const fn is_disposed(&self) -> bool {
        self.flags.contains(LifecycleFlags::DISPOSED)
    }

    /// Returns true while the entity is crashing.
    #[must_use]
    pub const fn is_crashing(&self) -> bool {
        self.flags.contains(LifecycleFlags::CRASHING)
    }

    /// Marks the entity as crashing (or not).
    pub fn set_crashing(&mut self, crashing: bool) {
        self.flags.set(LifecycleFlags::CRASHING, crashing);
    }

    /// Returns true if the entity remains as rubble.
    #[must_use]
    pub const fn is_rubble(&self) -> bool {
        self.flags.contains(LifecycleFlags::RUBBLE)
    }

    /// Hit points.
    #[must_use]
    pub const fn health(&self) -> Health {
        self.health
    }

    /// Mutable hit points.
    pub fn health_mut(&mut self) -> &mut Health {
        &mut self.health
    }

    /// Placement handle, if placed.
    #[must_use]
    pub const fn placement(&self) -> Option<Placement> {
        self.placement
    }

    pub(crate) fn set_placement(&mut self, placement: Option<Placement>) {
        self.placement = placement;
    }

    /// Projectile state, for projectiles.
    #[must_use]
    pub const fn projectile(&self) -> Option<&ProjectileState> {
        self.projectile.as_ref()
    }

    /// Mutable projectile state.
    pub fn projectile_mut(&mut self) -> Option<&mut ProjectileState> {
        self.projectile.as_mut()
    }

    pub(crate) fn set_projectile(&mut self, projectile: ProjectileState) {
        self.projectile = Some(projectile);
    }

    /// Limbo record, while in limbo.
    #[must_use]
    pub const fn limbo_data(&self) -> Option<&LimboData> {
        self.limbo.as_ref()
    }

    pub(crate) fn set_limbo_data(&mut self, data: Option<LimboData>) {
        self.limbo = data;
    }

    /// Entity-local traits.
    #[must_use]
    pub const fn traits(&self) -> &TraitRegistry {
        &self.traits
    }

    pub(crate) fn traits_mut(&mut self) -> &mut TraitRegistry {
        &mut self.traits
    }

    /// Returns true if the entity needs a per-tick update.
    #[must_use]
    pub fn needs_update(&self) -> bool {
        self.kind().always_updates() || !self.traits.filter(Capability::Tick).is_empty()
    }

    /// Credits this entity was bought for.
    #[must_use]
    pub const fn purchase_value(&self) -> u32 {
        self.purchase_value
    }

    pub(crate) fn set_purchase_value(&mut self, value: u32) {
        self.purchase_value = value;
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("name", &self.rules.name)
            .field("kind", &self.rules.kind)
            .field("owner", &self.owner)
            .field("state", &self.state())
            .field("traits", &self.traits)
            .finish_non_exhaustive()
    }
}

impl StateHash for Entity {
    fn hash_state(&self, hasher: &mut StateHasher) {
        hasher.write_u64(self.id.as_u64());
        hasher.write_u32(self.kind().discriminant());
        hasher.write_str(&self.rules.name);
        hasher.write_opt_u64(self.owner.map(|p| u64::from(p.index())));
        hasher.write_u32(self.flags.bits());
        self.health.hash_state(hasher);
        match &self.placement {
            Some(placement) => {
                hasher.write_u32(1);
                placement.hash_state(hasher);
            }
            None => hasher.write_u32(0),
        }
        if let Some(projectile) = &self.projectile {
            projectile.hash_state(hasher);
        }
        hasher.write_u32(self.purchase_value);
        for t in self.traits.iter() {
            if let Some(h) = t.state_hash() {
                hasher.write_u64(h);
            }
        }
    }
}
