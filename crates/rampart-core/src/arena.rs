//! Off-world entity storage and identity allocation.
//!
//! Every entity lives in exactly one place: the [`World`](crate::world::World)
//! while it is spawned (or left behind as rubble), and the [`Arena`]
//! otherwise. The arena holds entities that were created but not spawned,
//! unspawned entities and entities in limbo. Disposed entities are dropped
//! outright unless they linger in the world as rubble; since identities are
//! never reused, an allocated identity held by neither store is retired.
//!
//! # Identity allocation
//!
//! The arena owns the next-identity counter. Identities are allocated
//! monotonically and never reused, and the counter is part of the state hash.
//!
//! ```
//! use rampart_core::arena::Arena;
//!
//! let mut arena = Arena::new();
//! let a = arena.allocate_id();
//! let b = arena.allocate_id();
//! assert!(a < b);
//! assert_eq!(arena.next_id(), b.as_u64() + 1);
//! ```

use std::collections::BTreeMap;

use crate::entity::{Entity, EntityId};
use crate::error::{KernelError, KernelResult};

/// Store for entities that are not in the world.
///
/// Storage is a `BTreeMap`, so iteration is in identity order.
#[derive(Debug)]
pub struct Arena {
    /// Next identity to hand out.
    next_id: u64,
    entities: BTreeMap<EntityId, Entity>,
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl Arena {
    /// Creates an empty arena. The first allocated identity is 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 1,
            entities: BTreeMap::new(),
        }
    }

    /// Allocates a fresh identity.
    pub fn allocate_id(&mut self) -> EntityId {
        let id = EntityId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// The identity the next allocation will return.
    #[must_use]
    pub const fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Returns true if `id` has been handed out by this arena.
    #[must_use]
    pub const fn was_allocated(&self, id: EntityId) -> bool {
        id.as_u64() >= 1 && id.as_u64() < self.next_id
    }

    /// Stores an entity.
    ///
    /// # Errors
    ///
    /// [`KernelError::DuplicateId`] if the identity is already stored.
    pub fn insert(&mut self, entity: Entity) -> KernelResult<()> {
        let id = entity.id();
        if self.entities.contains_key(&id) {
            return Err(KernelError::DuplicateId(id));
        }
        self.entities.insert(id, entity);
        Ok(())
    }

    /// Removes and returns an entity.
    pub fn take(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    /// Looks up an entity.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Looks up an entity mutably.
    #[must_use]
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Returns true if `id` is stored here.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Iterates stored entities in identity order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.values()
    }

    /// Number of stored entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
