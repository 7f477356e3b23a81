//! Synchronous event bus.
//!
//! The bus is the kernel's output surface: rendering, trigger scripting,
//! replication and audio layers subscribe here. It is strictly synchronous and
//! single-threaded; [`EventBus::dispatch`] returns after every subscriber ran.
//!
//! # Subscription model
//!
//! There is one wildcard list and one type-keyed multimap:
//!
//! - [`EventBus::subscribe_all`] handlers see every event
//! - [`EventBus::subscribe`] handlers see only events of one [`EventType`]
//!
//! Dispatch calls the wildcard handlers first, then the typed ones, each in
//! subscription order.
//!
//! # Re-entrancy
//!
//! Dispatch iterates a snapshot of both lists taken before the first handler
//! runs. A handler may subscribe or unsubscribe (itself or others) while the
//! dispatch is in flight: new handlers take effect from the next dispatch, and
//! removed handlers still receive the event currently being delivered.
//!
//! # Example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use rampart_core::entity::EntityId;
//! use rampart_core::event::{EventBus, EventType, GameEvent};
//!
//! let bus = EventBus::new();
//! let seen = Rc::new(Cell::new(0));
//!
//! let counter = Rc::clone(&seen);
//! let sub = bus.subscribe(EventType::ObjectSpawned, move |_| counter.set(counter.get() + 1));
//!
//! bus.dispatch(&GameEvent::ObjectSpawned { target: EntityId::new(1) });
//! sub.unsubscribe();
//! bus.dispatch(&GameEvent::ObjectSpawned { target: EntityId::new(2) });
//!
//! assert_eq!(seen.get(), 1);
//! ```

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::capability::TraitId;
use crate::entity::EntityId;
use crate::player::PlayerId;

// =============================================================================
// Events
// =============================================================================

/// Who or what caused a destruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AttackerInfo {
    /// Attacking object, if it still exists.
    pub object: Option<EntityId>,
    /// Player credited with the kill.
    pub player: Option<PlayerId>,
}

impl AttackerInfo {
    /// Attribution to a player without a specific object.
    #[must_use]
    pub const fn player(player: PlayerId) -> Self {
        Self {
            object: None,
            player: Some(player),
        }
    }
}

/// How an object died.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeathKind {
    /// Regular destruction. Rubble-leaving buildings leave rubble.
    #[default]
    Normal,
    /// Erased from time (chrono weapons). Never leaves rubble.
    Temporal,
}

/// Event published on the bus.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum GameEvent {
    /// An entity entered the world.
    ObjectSpawned {
        /// Spawned entity.
        target: EntityId,
    },
    /// An entity left the world.
    ObjectUnspawned {
        /// Unspawned entity.
        target: EntityId,
    },
    /// An entity was withdrawn into limbo.
    ObjectLimboed {
        /// Limboed entity.
        target: EntityId,
    },
    /// An entity returned from limbo.
    ObjectUnlimboed {
        /// Unlimboed entity.
        target: EntityId,
        /// Tile it reappeared on.
        tile: IVec2,
    },
    /// An entity was destroyed.
    ObjectDestroyed {
        /// Destroyed entity.
        target: EntityId,
        /// Attribution, if any.
        attacker: Option<AttackerInfo>,
    },
    /// An entity changed owner.
    ObjectOwnerChanged {
        /// Affected entity.
        target: EntityId,
        /// Previous owner.
        old_owner: Option<PlayerId>,
        /// New owner.
        new_owner: Option<PlayerId>,
    },
    /// A trait was attached to an entity after creation.
    ObjectTraitAdded {
        /// Host entity.
        target: EntityId,
        /// Attached trait.
        trait_id: TraitId,
    },
    /// A player lost all buildings and units.
    PlayerDefeated {
        /// Defeated player.
        player: PlayerId,
    },
    /// The game is over.
    GameEnded {
        /// Undefeated combatants, in player order.
        winners: Vec<PlayerId>,
    },
    /// Two players formed or broke an alliance.
    AllianceChanged {
        /// First player.
        first: PlayerId,
        /// Second player.
        second: PlayerId,
        /// Whether they are now allied.
        allied: bool,
    },
    /// The countdown timer reached zero.
    CountdownExpired,
}

/// Discriminant of a [`GameEvent`], used as the typed subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// See [`GameEvent::ObjectSpawned`].
    ObjectSpawned,
    /// See [`GameEvent::ObjectUnspawned`].
    ObjectUnspawned,
    /// See [`GameEvent::ObjectLimboed`].
    ObjectLimboed,
    /// See [`GameEvent::ObjectUnlimboed`].
    ObjectUnlimboed,
    /// See [`GameEvent::ObjectDestroyed`].
    ObjectDestroyed,
    /// See [`GameEvent::ObjectOwnerChanged`].
    ObjectOwnerChanged,
    /// See [`GameEvent::ObjectTraitAdded`].
    ObjectTraitAdded,
    /// See [`GameEvent::PlayerDefeated`].
    PlayerDefeated,
    /// See [`GameEvent::GameEnded`].
    GameEnded,
    /// See [`GameEvent::AllianceChanged`].
    AllianceChanged,
    /// See [`GameEvent::CountdownExpired`].
    CountdownExpired,
}

impl GameEvent {
    /// Returns the event's discriminant.
    #[must_use]
    pub const fn event_type(&self) -> EventType {
        match self {
            Self::ObjectSpawned { .. } => EventType::ObjectSpawned,
            Self::ObjectUnspawned { .. } => EventType::ObjectUnspawned,
            Self::ObjectLimboed { .. } => EventType::ObjectLimboed,
            Self::ObjectUnlimboed { .. } => EventType::ObjectUnlimboed,
            Self::ObjectDestroyed { .. } => EventType::ObjectDestroyed,
            Self::ObjectOwnerChanged { .. } => EventType::ObjectOwnerChanged,
            Self::ObjectTraitAdded { .. } => EventType::ObjectTraitAdded,
            Self::PlayerDefeated { .. } => EventType::PlayerDefeated,
            Self::GameEnded { .. } => EventType::GameEnded,
            Self::AllianceChanged { .. } => EventType::AllianceChanged,
            Self::CountdownExpired => EventType::CountdownExpired,
        }
    }

    /// The entity the event is about, for object events.
    #[must_use]
    pub const fn target(&self) -> Option<EntityId> {
        match self {
            Self::ObjectSpawned { target }
            | Self::ObjectUnspawned { target }
            | Self::ObjectLimboed { target }
            | Self::ObjectUnlimboed { target, .. }
            | Self::ObjectDestroyed { target, .. }
            | Self::ObjectOwnerChanged { target, .. }
            | Self::ObjectTraitAdded { target, .. } => Some(*target),
            _ => None,
        }
    }
}

// =============================================================================
// EventBus
// =============================================================================

type Handler = Rc<dyn Fn(&GameEvent)>;

#[derive(Default)]
struct BusInner {
    next_id: Cell<u64>,
    any: RefCell<Vec<(u64, Handler)>>,
    typed: RefCell<BTreeMap<EventType, Vec<(u64, Handler)>>>,
}

impl BusInner {
    fn allocate_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    fn remove(&self, id: u64) {
        self.any.borrow_mut().retain(|(sid, _)| *sid != id);
        for list in self.typed.borrow_mut().values_mut() {
            list.retain(|(sid, _)| *sid != id);
        }
    }
}

/// Synchronous publish/subscribe channel.
///
/// Cloning an `EventBus` yields another handle to the same subscriber lists,
/// which is how handlers obtain a bus to (un)subscribe from while dispatching.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Rc<BusInner>,
}

impl EventBus {
    /// Creates a bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to every event.
    pub fn subscribe_all(&self, handler: impl Fn(&GameEvent) + 'static) -> Subscription {
        let id = self.inner.allocate_id();
        self.inner.any.borrow_mut().push((id, Rc::new(handler)));
        self.subscription(id)
    }

    /// Subscribes to events of one type.
    pub fn subscribe(
        &self,
        event_type: EventType,
        handler: impl Fn(&GameEvent) + 'static,
    ) -> Subscription {
        let id = self.inner.allocate_id();
        self.inner
            .typed
            .borrow_mut()
            .entry(event_type)
            .or_default()
            .push((id, Rc::new(handler)));
        self.subscription(id)
    }

    fn subscription(&self, id: u64) -> Subscription {
        Subscription {
            bus: Rc::downgrade(&self.inner),
            id,
        }
    }

    /// Delivers `event` to the wildcard subscribers, then to the subscribers
    /// of its type.
    pub fn dispatch(&self, event: &GameEvent) {
        let snapshot: Vec<Handler> = {
            let any = self.inner.any.borrow();
            let typed = self.inner.typed.borrow();
            any.iter()
                .chain(typed.get(&event.event_type()).into_iter().flatten())
                .map(|(_, h)| Rc::clone(h))
                .collect()
        };
        for handler in &snapshot {
            handler(event);
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.any.borrow().len()
            + self
                .inner
                .typed
                .borrow()
                .values()
                .map(Vec::len)
                .sum::<usize>()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Handle returned by a subscription.
///
/// Dropping the handle keeps the subscription alive; call
/// [`unsubscribe`](Subscription::unsubscribe) to remove it.
#[derive(Debug, Clone)]
#[must_use = "dropping a Subscription keeps the handler subscribed; keep it to unsubscribe later"]
pub struct Subscription {
    bus: Weak<BusInner>,
    id: u64,
}

impl Subscription {
    /// Removes the handler. Does nothing if the bus is gone or the handler
    /// was already removed.
    pub fn unsubscribe(&self) {
        if let Some(inner) = self.bus.upgrade() {
            inner.remove(self.id);
        }
    }
}
