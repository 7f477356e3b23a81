//! Object construction seam.
//!
//! The kernel never builds entities itself. The simulation's factory entry
//! points allocate an identity, ask an [`ObjectFactory`] for the entity, then
//! do the kernel-side bookkeeping (ownership, purchase value, projectile
//! state). [`RulesObjectFactory`] is the default: it builds entities straight
//! from [`RulesLookup`] data and attaches any traits registered for the
//! object name.

use std::collections::BTreeMap;
use std::fmt;

use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::capability::TraitHandle;
use crate::entity::{Entity, EntityId, EntityKind};
use crate::error::RulesError;
use crate::hash::{StateHash, StateHasher};
use crate::rules::RulesLookup;

/// What a weapon or order is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    /// A specific object.
    Object(EntityId),
    /// A map tile.
    Tile(IVec2),
}

impl Target {
    /// The targeted object, if any.
    #[must_use]
    pub const fn object(&self) -> Option<EntityId> {
        match self {
            Self::Object(id) => Some(*id),
            Self::Tile(_) => None,
        }
    }
}

impl StateHash for Target {
    fn hash_state(&self, hasher: &mut StateHasher) {
        match self {
            Self::Object(id) => {
                hasher.write_u32(0);
                hasher.write_u64(id.as_u64());
            }
            Self::Tile(tile) => {
                hasher.write_u32(1);
                hasher.write_i32(tile.x);
                hasher.write_i32(tile.y);
            }
        }
    }
}

/// Builds entities for the simulation.
pub trait ObjectFactory {
    /// Builds an unregistered entity with identity `id`.
    ///
    /// Missing rules are reported as [`RulesError::MissingRules`]; the caller
    /// logs and skips.
    fn create(
        &mut self,
        id: EntityId,
        name: &str,
        kind: EntityKind,
        rules: &dyn RulesLookup,
    ) -> Result<Entity, RulesError>;
}

type TraitBuilder = Box<dyn Fn(EntityId) -> TraitHandle>;

/// Default factory: entity from rules, plus per-name trait builders.
#[derive(Default)]
pub struct RulesObjectFactory {
    builders: BTreeMap<String, Vec<TraitBuilder>>,
}

impl RulesObjectFactory {
    /// Creates a factory with no trait builders.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a builder whose trait is attached to every object named
    /// `name`. Builders run in registration order.
    pub fn with_trait(
        &mut self,
        name: &str,
        builder: impl Fn(EntityId) -> TraitHandle + 'static,
    ) -> &mut Self {
        self.builders
            .entry(name.to_string())
            .or_default()
            .push(Box::new(builder));
        self
    }
}

impl fmt::Debug for RulesObjectFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.builders.iter().map(|(name, b)| (name, b.len())))
            .finish()
    }
}

impl ObjectFactory for RulesObjectFactory {
    fn create(
        &mut self,
        id: EntityId,
        name: &str,
        kind: EntityKind,
        rules: &dyn RulesLookup,
    ) -> Result<Entity, RulesError> {
        let object_rules = rules.require_object(name, kind)?.clone();
        let mut entity = Entity::new(id, object_rules);
        if let Some(builders) = self.builders.get(name) {
            for build in builders {
                entity.traits_mut().add(build(id));
            }
        }
        Ok(entity)
    }
}
