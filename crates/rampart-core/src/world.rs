//! World registry: the authoritative identity-to-entity table for entities
//! that are in the world.
//!
//! The registry only enforces identity invariants. Lifecycle bookkeeping
//! (flags, notifications, occupation) is the simulation's job; see
//! [`Simulation::spawn`](crate::simulation::Simulation::spawn).
//!
//! # Observation events
//!
//! Insertions and removals are reported to [`WorldObserver`]s. These are for
//! presentation consumers (minimap, render lists) only and are never used for
//! simulation decisions.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::entity::{Entity, EntityId};
use crate::error::{KernelError, KernelResult};

/// Presentation-level change notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldChange {
    /// An entity was inserted.
    Spawned(EntityId),
    /// An entity was removed.
    Removed(EntityId),
}

/// Observer of [`WorldChange`]s.
pub type WorldObserver = Rc<dyn Fn(WorldChange)>;

/// Identity-to-entity table.
///
/// Entities are stored in a `BTreeMap`, so every iteration is in identity
/// order, which is also allocation order.
#[derive(Default)]
pub struct World {
    entities: BTreeMap<EntityId, Entity>,
    observers: Vec<WorldObserver>,
}

impl World {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an entity.
    ///
    /// # Errors
    ///
    /// [`KernelError::DuplicateId`] if the identity is already registered.
    /// The rejected entity is dropped; check [`has_id`](World::has_id) first
    /// to keep it.
    pub fn spawn(&mut self, entity: Entity) -> KernelResult<()> {
        let id = entity.id();
        if self.entities.contains_key(&id) {
            return Err(KernelError::DuplicateId(id));
        }
        self.entities.insert(id, entity);
        self.notify(WorldChange::Spawned(id));
        Ok(())
    }

    /// Unregisters and returns an entity.
    ///
    /// # Errors
    ///
    /// [`KernelError::NotRegistered`] if the identity is absent.
    pub fn remove(&mut self, id: EntityId) -> KernelResult<Entity> {
        let entity = self
            .entities
            .remove(&id)
            .ok_or(KernelError::NotRegistered(id))?;
        self.notify(WorldChange::Removed(id));
        Ok(entity)
    }

    /// Looks up a registered entity.
    ///
    /// # Errors
    ///
    /// [`KernelError::NotFound`] if the identity is absent.
    pub fn get_by_id(&self, id: EntityId) -> KernelResult<&Entity> {
        self.entities.get(&id).ok_or(KernelError::NotFound(id))
    }

    /// Looks up a registered entity mutably.
    ///
    /// # Errors
    ///
    /// [`KernelError::NotFound`] if the identity is absent.
    pub fn get_by_id_mut(&mut self, id: EntityId) -> KernelResult<&mut Entity> {
        self.entities.get_mut(&id).ok_or(KernelError::NotFound(id))
    }

    /// Returns true if `id` is registered.
    #[must_use]
    pub fn has_id(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Iterates registered entities in identity order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.values()
    }

    /// Iterates registered entities that are live (not rubble).
    pub fn live(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.values().filter(|e| !e.is_destroyed())
    }

    /// Number of registered entities, rubble included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Adds a presentation observer.
    pub fn observe(&mut self, observer: impl Fn(WorldChange) + 'static) {
        self.observers.push(Rc::new(observer));
    }

    fn notify(&self, change: WorldChange) {
        for observer in &self.observers {
            observer(change);
        }
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("entities", &self.entities.len())
            .field("observers", &self.observers.len())
            .finish()
    }
}
