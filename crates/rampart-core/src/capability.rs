//! Capability-based trait dispatch.
//!
//! A *trait* (in the game sense, not the Rust keyword) is a behavior object
//! attached either to one entity or to the simulation as a whole. Cross-cutting
//! subsystems such as power, radar, production, shroud or super weapons are
//! written as traits and never referenced statically by the kernel.
//!
//! # Declared capabilities
//!
//! Each trait declares, once, the closed set of notifications it handles via
//! [`GameTrait::capabilities`]. A [`TraitRegistry`] routes a notification only
//! to traits that declared the matching [`Capability`]; no runtime
//! introspection is involved.
//!
//! # Registry cache
//!
//! [`TraitRegistry::filter`] returns a shared, ordered slice of the traits
//! declaring a capability. Results are cached per capability and the *whole*
//! cache is dropped on any `add`, `add_to_front` or `remove`, so a filter
//! result is never stale. Order always follows registration order, which is
//! part of the committed simulation state.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use rampart_core::capability::{Capabilities, Capability, GameTrait, TraitId, TraitRegistry};
//!
//! struct Radar;
//!
//! impl GameTrait for Radar {
//!     fn id(&self) -> TraitId {
//!         TraitId::from_static("radar")
//!     }
//!     fn capabilities(&self) -> Capabilities {
//!         Capabilities::TICK | Capabilities::OWNER_CHANGE
//!     }
//! }
//!
//! let mut registry = TraitRegistry::new();
//! registry.add(Rc::new(Radar));
//!
//! assert_eq!(registry.filter(Capability::Tick).len(), 1);
//! assert!(registry.filter(Capability::Destroy).is_empty());
//! assert!(registry.find_type::<Radar>().is_some());
//! ```

use std::any::Any;
use std::borrow::Cow;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::error::{KernelError, KernelResult};
use crate::event::AttackerInfo;
use crate::factory::Target;
use crate::player::PlayerId;
use crate::simulation::Simulation;

// =============================================================================
// Capability
// =============================================================================

/// A named notification contract a trait may implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// Per-tick update.
    Tick,
    /// Entity entered the world.
    Spawn,
    /// Entity left the world.
    Unspawn,
    /// Entity was destroyed.
    Destroy,
    /// Entity changed owner.
    OwnerChange,
    /// Entity fired at a target.
    Attack,
}

impl Capability {
    /// Number of capabilities.
    pub const COUNT: usize = 6;

    /// All capabilities, in index order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Tick,
        Self::Spawn,
        Self::Unspawn,
        Self::Destroy,
        Self::OwnerChange,
        Self::Attack,
    ];

    /// Returns the dense index of this capability.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns the flag for this capability.
    #[must_use]
    pub const fn flag(self) -> Capabilities {
        match self {
            Self::Tick => Capabilities::TICK,
            Self::Spawn => Capabilities::SPAWN,
            Self::Unspawn => Capabilities::UNSPAWN,
            Self::Destroy => Capabilities::DESTROY,
            Self::OwnerChange => Capabilities::OWNER_CHANGE,
            Self::Attack => Capabilities::ATTACK,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tick => write!(f, "Tick"),
            Self::Spawn => write!(f, "Spawn"),
            Self::Unspawn => write!(f, "Unspawn"),
            Self::Destroy => write!(f, "Destroy"),
            Self::OwnerChange => write!(f, "OwnerChange"),
            Self::Attack => write!(f, "Attack"),
        }
    }
}

bitflags! {
    /// Set of capabilities a trait declares at construction.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Capabilities: u32 {
        /// See [`Capability::Tick`].
        const TICK = 1 << 0;
        /// See [`Capability::Spawn`].
        const SPAWN = 1 << 1;
        /// See [`Capability::Unspawn`].
        const UNSPAWN = 1 << 2;
        /// See [`Capability::Destroy`].
        const DESTROY = 1 << 3;
        /// See [`Capability::OwnerChange`].
        const OWNER_CHANGE = 1 << 4;
        /// See [`Capability::Attack`].
        const ATTACK = 1 << 5;
    }
}

impl Capabilities {
    /// Returns true if `capability` is declared.
    #[must_use]
    pub const fn has(self, capability: Capability) -> bool {
        self.contains(capability.flag())
    }
}

// =============================================================================
// Trait identity
// =============================================================================

/// Name of a trait type, used for logging and debug snapshots.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraitId(Cow<'static, str>);

impl TraitId {
    /// Creates a trait ID from any string.
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self(Cow::Owned(id.to_string()))
    }

    /// Creates a trait ID from a static string without allocating.
    #[must_use]
    pub const fn from_static(id: &'static str) -> Self {
        Self(Cow::Borrowed(id))
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TraitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TraitId({:?})", self.0)
    }
}

impl fmt::Display for TraitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&'static str> for TraitId {
    fn from(s: &'static str) -> Self {
        Self::from_static(s)
    }
}

/// Where a trait is attached when it receives a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Host {
    /// Registered in the simulation's global registry.
    Global,
    /// Attached to this entity.
    Entity(EntityId),
}

// =============================================================================
// GameTrait
// =============================================================================

/// Type-identity helper so registries can find traits by concrete type.
///
/// Blanket-implemented for every `'static` type; never implement it by hand.
pub trait AsAny {
    /// Borrows `self` as `Any`.
    fn as_any(&self) -> &dyn Any;
    /// Converts a shared handle into a shared `Any` handle.
    fn into_any_rc(self: Rc<Self>) -> Rc<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any_rc(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

/// A capability-bearing behavior object.
///
/// Handlers take `&self`: a trait that keeps mutable state does so through
/// `Cell`/`RefCell`, which lets the kernel hand it `&mut Simulation` while the
/// trait itself stays registered. Every handler receives the simulation, so a
/// trait can observe and mutate entities, players and other traits through the
/// kernel API.
///
/// Handlers are only invoked for capabilities listed in
/// [`capabilities`](GameTrait::capabilities). An `Err` from a handler is an
/// invariant violation and aborts the tick.
///
/// All default handlers do nothing.
pub trait GameTrait: AsAny + 'static {
    /// Trait type name.
    fn id(&self) -> TraitId;

    /// Declared capabilities.
    fn capabilities(&self) -> Capabilities;

    /// Per-tick update. `host` tells a trait whether it runs globally or for an
    /// entity's own update.
    fn on_tick(&self, _sim: &mut Simulation, _host: Host) -> KernelResult<()> {
        Ok(())
    }

    /// `entity` was spawned into the world.
    fn on_spawn(&self, _sim: &mut Simulation, _entity: EntityId) -> KernelResult<()> {
        Ok(())
    }

    /// `entity` was withdrawn from the world.
    fn on_unspawn(&self, _sim: &mut Simulation, _entity: EntityId) -> KernelResult<()> {
        Ok(())
    }

    /// `entity` was destroyed.
    fn on_destroy(
        &self,
        _sim: &mut Simulation,
        _entity: EntityId,
        _attacker: Option<&AttackerInfo>,
    ) -> KernelResult<()> {
        Ok(())
    }

    /// `entity` moved from `old_owner` to its current owner.
    fn on_owner_change(
        &self,
        _sim: &mut Simulation,
        _entity: EntityId,
        _old_owner: Option<PlayerId>,
    ) -> KernelResult<()> {
        Ok(())
    }

    /// `attacker` fired at `target`.
    fn on_attack(
        &self,
        _sim: &mut Simulation,
        _attacker: EntityId,
        _target: &Target,
    ) -> KernelResult<()> {
        Ok(())
    }

    /// Optional contribution to the state hash.
    fn state_hash(&self) -> Option<u64> {
        None
    }

    /// Optional structured state for replay-diff tooling.
    fn debug_state(&self) -> Option<serde_json::Value> {
        None
    }
}

/// Shared handle to a registered trait.
pub type TraitHandle = Rc<dyn GameTrait>;

// =============================================================================
// TraitRegistry
// =============================================================================

type FilterCache = [Option<Rc<[TraitHandle]>>; Capability::COUNT];

/// Ordered collection of traits with a per-capability filter cache.
#[derive(Default)]
pub struct TraitRegistry {
    traits: Vec<TraitHandle>,
    cache: RefCell<FilterCache>,
}

impl TraitRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a trait.
    pub fn add(&mut self, handle: TraitHandle) {
        self.traits.push(handle);
        self.invalidate();
    }

    /// Prepends a trait so it observes notifications before all others.
    pub fn add_to_front(&mut self, handle: TraitHandle) {
        self.traits.insert(0, handle);
        self.invalidate();
    }

    /// Removes a trait by handle identity. Returns false if it was absent.
    pub fn remove(&mut self, handle: &TraitHandle) -> bool {
        let Some(pos) = self.traits.iter().position(|t| Rc::ptr_eq(t, handle)) else {
            return false;
        };
        self.traits.remove(pos);
        self.invalidate();
        true
    }

    /// Removes every trait.
    pub fn clear(&mut self) {
        self.traits.clear();
        self.invalidate();
    }

    fn invalidate(&mut self) {
        *self.cache.get_mut() = FilterCache::default();
    }

    /// Returns the traits declaring `capability`, in registration order.
    ///
    /// The returned slice is a snapshot: mutating the registry afterwards does
    /// not affect it.
    #[must_use]
    pub fn filter(&self, capability: Capability) -> Rc<[TraitHandle]> {
        let mut cache = self.cache.borrow_mut();
        let slot = &mut cache[capability.index()];
        if let Some(hit) = slot {
            return Rc::clone(hit);
        }
        let built: Rc<[TraitHandle]> = self
            .traits
            .iter()
            .filter(|t| t.capabilities().has(capability))
            .cloned()
            .collect();
        *slot = Some(Rc::clone(&built));
        built
    }

    /// Returns the first trait declaring `capability`.
    #[must_use]
    pub fn find(&self, capability: Capability) -> Option<TraitHandle> {
        self.filter(capability).first().cloned()
    }

    /// Returns the first trait declaring `capability`, or fails.
    ///
    /// Absence is a programming error, not a runtime condition.
    pub fn get(&self, capability: Capability) -> KernelResult<TraitHandle> {
        self.find(capability)
            .ok_or_else(|| KernelError::MissingCapability(capability.to_string()))
    }

    /// Returns every trait whose concrete type is `T`, in registration order.
    #[must_use]
    pub fn filter_type<T: GameTrait>(&self) -> Vec<Rc<T>> {
        self.traits
            .iter()
            .filter_map(|t| AsAny::into_any_rc(Rc::clone(t)).downcast::<T>().ok())
            .collect()
    }

    /// Returns the first trait whose concrete type is `T`.
    #[must_use]
    pub fn find_type<T: GameTrait>(&self) -> Option<Rc<T>> {
        self.traits
            .iter()
            .find_map(|t| AsAny::into_any_rc(Rc::clone(t)).downcast::<T>().ok())
    }

    /// Returns the first trait whose concrete type is `T`, or fails.
    pub fn get_type<T: GameTrait>(&self) -> KernelResult<Rc<T>> {
        self.find_type::<T>()
            .ok_or_else(|| KernelError::MissingCapability(std::any::type_name::<T>().to_string()))
    }

    /// Returns true if `handle` is registered.
    #[must_use]
    pub fn contains(&self, handle: &TraitHandle) -> bool {
        self.traits.iter().any(|t| Rc::ptr_eq(t, handle))
    }

    /// Iterates all traits in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &TraitHandle> + '_ {
        self.traits.iter()
    }

    /// Returns the number of registered traits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.traits.len()
    }

    /// Returns true if no trait is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.traits.is_empty()
    }

    /// Union of the capabilities of every registered trait.
    #[must_use]
    pub fn declared(&self) -> Capabilities {
        self.traits
            .iter()
            .fold(Capabilities::empty(), |acc, t| acc | t.capabilities())
    }

    #[cfg(test)]
    fn cached_slots(&self) -> usize {
        self.cache.borrow().iter().filter(|s| s.is_some()).count()
    }
}

impl fmt::Debug for TraitRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.traits.iter().map(|t| t.id()))
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct Ticker;

    impl GameTrait for Ticker {
        fn id(&self) -> TraitId {
            TraitId::from_static("ticker")
        }
        fn capabilities(&self) -> Capabilities {
            Capabilities::TICK
        }
    }

    struct Watcher(&'static str);

    impl GameTrait for Watcher {
        fn id(&self) -> TraitId {
            TraitId::from_static(self.0)
        }
        fn capabilities(&self) -> Capabilities {
            Capabilities::SPAWN | Capabilities::DESTROY
        }
    }

    fn ids(slice: &[TraitHandle]) -> Vec<String> {
        slice.iter().map(|t| t.id().to_string()).collect()
    }

    mod capability_tests {
        use super::*;

        #[test]
        fn index_matches_all_order() {
            for (i, cap) in Capability::ALL.iter().enumerate() {
                assert_eq!(cap.index(), i);
            }
        }

        #[test]
        fn flags_are_distinct() {
            let union = Capability::ALL
                .iter()
                .fold(Capabilities::empty(), |acc, c| acc | c.flag());
            assert_eq!(union.bits().count_ones() as usize, Capability::COUNT);
        }

        #[test]
        fn display_format() {
            assert_eq!(Capability::OwnerChange.to_string(), "OwnerChange");
        }
    }

    mod trait_id_tests {
        use super::*;

        #[test]
        fn static_and_owned_equality() {
            assert_eq!(TraitId::from_static("power"), TraitId::new("power"));
        }

        #[test]
        fn debug_format() {
            assert_eq!(format!("{:?}", TraitId::new("radar")), "TraitId(\"radar\")");
        }
    }

    mod registry_tests {
        use super::*;

        #[test]
        fn filter_includes_tick_trait_once() {
            let mut registry = TraitRegistry::new();
            let ticker: TraitHandle = Rc::new(Ticker);
            registry.add(Rc::clone(&ticker));

            let ticks = registry.filter(Capability::Tick);
            assert_eq!(ticks.len(), 1);
            assert!(Rc::ptr_eq(&ticks[0], &ticker));
        }

        #[test]
        fn cache_invalidated_by_unrelated_mutation() {
            let mut registry = TraitRegistry::new();
            let ticker: TraitHandle = Rc::new(Ticker);
            registry.add(Rc::clone(&ticker));
            assert_eq!(registry.filter(Capability::Tick).len(), 1);

            // Unrelated add/remove must not leave a stale tick filter behind.
            let watcher: TraitHandle = Rc::new(Watcher("w"));
            registry.add(Rc::clone(&watcher));
            assert_eq!(registry.filter(Capability::Tick).len(), 1);
            assert!(registry.remove(&watcher));
            assert_eq!(registry.filter(Capability::Tick).len(), 1);

            assert!(registry.remove(&ticker));
            assert!(registry.filter(Capability::Tick).is_empty());

            registry.add(Rc::clone(&watcher));
            assert!(registry.filter(Capability::Tick).is_empty());
            assert_eq!(registry.filter(Capability::Spawn).len(), 1);
        }

        #[test]
        fn any_mutation_clears_whole_cache() {
            let mut registry = TraitRegistry::new();
            registry.add(Rc::new(Ticker));
            let _ = registry.filter(Capability::Tick);
            let _ = registry.filter(Capability::Spawn);
            assert_eq!(registry.cached_slots(), 2);

            registry.add(Rc::new(Watcher("w")));
            assert_eq!(registry.cached_slots(), 0);
        }

        #[test]
        fn snapshot_survives_mutation() {
            let mut registry = TraitRegistry::new();
            registry.add(Rc::new(Ticker));
            let snapshot = registry.filter(Capability::Tick);
            registry.clear();
            assert_eq!(snapshot.len(), 1);
            assert!(registry.filter(Capability::Tick).is_empty());
        }

        #[test]
        fn order_follows_registration() {
            let mut registry = TraitRegistry::new();
            registry.add(Rc::new(Watcher("b")));
            registry.add(Rc::new(Watcher("c")));
            registry.add_to_front(Rc::new(Watcher("a")));

            assert_eq!(ids(&registry.filter(Capability::Spawn)), vec!["a", "b", "c"]);
        }

        #[test]
        fn remove_absent_returns_false() {
            let mut registry = TraitRegistry::new();
            let ticker: TraitHandle = Rc::new(Ticker);
            assert!(!registry.remove(&ticker));
        }

        #[test]
        fn get_missing_capability_fails() {
            let registry = TraitRegistry::new();
            assert!(matches!(
                registry.get(Capability::Attack),
                Err(KernelError::MissingCapability(ref s)) if s == "Attack"
            ));
        }

        #[test]
        fn find_returns_first_match() {
            let mut registry = TraitRegistry::new();
            registry.add(Rc::new(Watcher("first")));
            registry.add(Rc::new(Watcher("second")));
            let found = registry.find(Capability::Destroy).unwrap();
            assert_eq!(found.id().as_str(), "first");
        }

        #[test]
        fn type_identity_lookup() {
            let mut registry = TraitRegistry::new();
            registry.add(Rc::new(Watcher("x")));
            registry.add(Rc::new(Ticker));
            registry.add(Rc::new(Watcher("y")));

            assert!(registry.find_type::<Ticker>().is_some());
            let watchers = registry.filter_type::<Watcher>();
            assert_eq!(watchers.len(), 2);
            assert_eq!(watchers[0].0, "x");
            assert_eq!(watchers[1].0, "y");
        }

        #[test]
        fn get_type_missing_fails() {
            let registry = TraitRegistry::new();
            assert!(matches!(
                registry.get_type::<Ticker>(),
                Err(KernelError::MissingCapability(_))
            ));
        }

        #[test]
        fn declared_is_union() {
            let mut registry = TraitRegistry::new();
            registry.add(Rc::new(Ticker));
            registry.add(Rc::new(Watcher("w")));
            let declared = registry.declared();
            assert!(declared.has(Capability::Tick));
            assert!(declared.has(Capability::Destroy));
            assert!(!declared.has(Capability::Attack));
        }
    }
}
