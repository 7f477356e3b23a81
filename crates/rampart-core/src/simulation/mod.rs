//! The simulation root and its fixed-order tick scheduler.
//!
//! [`Simulation`] composes the world registry, the off-world arena, the
//! global trait registry, the event bus, the seeded random source, players,
//! alliances and the external collaborators. It exposes the entity lifecycle
//! API (see [`lifecycle`]) and runs one tick per [`Simulation::step`].
//!
//! # Tick order
//!
//! Every peer runs exactly this sequence each tick:
//!
//! 1. AI hook ([`BotHook`])
//! 2. End-of-game evaluation, at most once per `end_check_interval_ms`
//! 3. Per-entity update over a snapshot of the updatable set
//! 4. Combatant cooldowns
//! 5. Global tick broadcast, in trait registration order
//! 6. Local viewer selection pruning (presentation only)
//! 7. After-tick queue drain
//! 8. Trigger hook ([`TriggerHook`])
//! 9. Countdown timer
//! 10. Tick and elapsed-time advance
//!
//! # Example
//!
//! ```
//! use glam::IVec2;
//! use rampart_core::config::SimulationConfig;
//! use rampart_core::entity::EntityKind;
//! use rampart_core::rules::{ObjectRules, RulesTable};
//! use rampart_core::simulation::Simulation;
//!
//! let mut rules = RulesTable::new();
//! rules.insert_object(ObjectRules::new("MTNK", EntityKind::Vehicle, 300)).unwrap();
//!
//! let mut sim = Simulation::new(SimulationConfig::with_seeds(1, 2), rules);
//! let player = sim.add_player("alice", "Americans", true);
//! let tank = sim
//!     .create_unit_for_player("MTNK", EntityKind::Vehicle, player)
//!     .unwrap()
//!     .unwrap();
//! sim.spawn(tank, IVec2::new(4, 4)).unwrap();
//!
//! for _ in 0..10 {
//!     sim.step().unwrap();
//! }
//! assert_eq!(sim.tick(), 10);
//! assert!(sim.entity(tank).unwrap().is_spawned());
//! ```

pub mod lifecycle;
pub mod snapshot;

use std::fmt;
use std::mem;

use serde::Serialize;
use tracing::{info, trace};

use crate::alliance::AllianceTable;
use crate::arena::Arena;
use crate::capability::{Capability, Host, TraitHandle, TraitRegistry};
use crate::collab::{BotHook, CountdownTimer, TriggerHook};
use crate::config::SimulationConfig;
use crate::entity::{Entity, EntityId};
use crate::error::{KernelError, KernelResult};
use crate::event::{AttackerInfo, EventBus, GameEvent};
use crate::factory::{ObjectFactory, RulesObjectFactory};
use crate::player::{Player, PlayerId, PlayerList};
use crate::rng::GameRng;
use crate::rules::RulesLookup;
use crate::spatial::{GridOccupancy, TileOccupation};
use crate::world::World;

pub use snapshot::{DebugState, EntityDebug, TraitDebug};

/// Deferred callback run once after the current tick's global broadcast.
pub type AfterTick = Box<dyn FnOnce(&mut Simulation) -> KernelResult<()>>;

/// The local viewer's player and selection.
///
/// Presentation-only: excluded from the state hash.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LocalViewer {
    /// Player the local user controls, if any.
    pub player: Option<PlayerId>,
    /// Selected entities, in selection order.
    pub selection: Vec<EntityId>,
}

/// The deterministic simulation root.
///
/// # Determinism
///
/// Given the same configuration (including both seeds), the same rules and
/// the same ordered sequence of API calls, two instances produce identical
/// [`state_hash`](Simulation::state_hash) values after every tick:
///
/// - entities are iterated in identity order (`BTreeMap`)
/// - the updatable set, traits and players are iterated in insertion order
/// - randomness is drawn only through [`rng_mut`](Simulation::rng_mut)
pub struct Simulation {
    config: SimulationConfig,
    tick: u64,
    elapsed_ms: u64,
    last_end_check_ms: u64,
    ended: bool,
    rng: GameRng,
    arena: Arena,
    world: World,
    updatables: Vec<EntityId>,
    traits: TraitRegistry,
    events: EventBus,
    players: PlayerList,
    alliances: AllianceTable,
    rules: Box<dyn RulesLookup>,
    factory: Box<dyn ObjectFactory>,
    occupation: Box<dyn TileOccupation>,
    bot: Option<Box<dyn BotHook>>,
    triggers: Option<Box<dyn TriggerHook>>,
    countdown: CountdownTimer,
    after_tick: Vec<AfterTick>,
    viewer: LocalViewer,
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("tick", &self.tick)
            .field("elapsed_ms", &self.elapsed_ms)
            .field("ended", &self.ended)
            .field("world", &self.world)
            .field("arena", &format!("[{} off-world]", self.arena.len()))
            .field("traits", &self.traits)
            .field("players", &self.players.len())
            .field("after_tick", &format!("[{} queued]", self.after_tick.len()))
            .finish_non_exhaustive()
    }
}

impl Simulation {
    /// Creates a simulation at tick 0 with the default factory and a grid
    /// occupancy sized from `config`.
    ///
    /// The configuration is expected to be validated already; see
    /// [`SimulationConfig::validate`].
    #[must_use]
    pub fn new(config: SimulationConfig, rules: impl RulesLookup + 'static) -> Self {
        let occupation = GridOccupancy::new(config.map_width, config.map_height);
        Self {
            rng: GameRng::new(config.seeds),
            config,
            tick: 0,
            elapsed_ms: 0,
            last_end_check_ms: 0,
            ended: false,
            arena: Arena::new(),
            world: World::new(),
            updatables: Vec::new(),
            traits: TraitRegistry::new(),
            events: EventBus::new(),
            players: PlayerList::new(),
            alliances: AllianceTable::new(),
            rules: Box::new(rules),
            factory: Box::new(RulesObjectFactory::new()),
            occupation: Box::new(occupation),
            bot: None,
            triggers: None,
            countdown: CountdownTimer::new(),
            after_tick: Vec::new(),
            viewer: LocalViewer::default(),
        }
    }

    /// Replaces the object factory.
    #[must_use]
    pub fn with_factory(mut self, factory: impl ObjectFactory + 'static) -> Self {
        self.factory = Box::new(factory);
        self
    }

    /// Replaces the tile-occupation service.
    #[must_use]
    pub fn with_occupation(mut self, occupation: impl TileOccupation + 'static) -> Self {
        self.occupation = Box::new(occupation);
        self
    }

    /// Installs the AI hook.
    pub fn set_bot_hook(&mut self, hook: impl BotHook + 'static) {
        self.bot = Some(Box::new(hook));
    }

    /// Installs the trigger hook.
    pub fn set_trigger_hook(&mut self, hook: impl TriggerHook + 'static) {
        self.triggers = Some(Box::new(hook));
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Session configuration.
    #[must_use]
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Ticks completed so far.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Simulated milliseconds elapsed.
    #[must_use]
    pub const fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Returns true once the game has ended.
    #[must_use]
    pub const fn is_ended(&self) -> bool {
        self.ended
    }

    /// The session random source. This is the only sanctioned source of
    /// randomness for simulation code.
    pub fn rng_mut(&mut self) -> &mut GameRng {
        &mut self.rng
    }

    /// The world registry.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Presentation observers may be attached here.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Off-world entity storage.
    #[must_use]
    pub const fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Looks up an entity wherever it lives.
    ///
    /// # Errors
    ///
    /// - [`KernelError::Disposed`] if the identity was allocated but its
    ///   entity has been disposed and dropped
    /// - [`KernelError::NotFound`] if no entity ever had this identity
    pub fn entity(&self, id: EntityId) -> KernelResult<&Entity> {
        if self.world.has_id(id) {
            return self.world.get_by_id(id);
        }
        self.arena.get(id).ok_or_else(|| self.missing(id))
    }

    /// Looks up an entity mutably wherever it lives.
    ///
    /// # Errors
    ///
    /// As [`entity`](Simulation::entity).
    pub fn entity_mut(&mut self, id: EntityId) -> KernelResult<&mut Entity> {
        if self.world.has_id(id) {
            return self.world.get_by_id_mut(id);
        }
        let missing = self.missing(id);
        self.arena.get_mut(id).ok_or(missing)
    }

    fn missing(&self, id: EntityId) -> KernelError {
        if self.arena.was_allocated(id) {
            KernelError::Disposed(id)
        } else {
            KernelError::NotFound(id)
        }
    }

    /// Returns true if `id` names a destroyed entity, whether it lingers as
    /// rubble or has already been dropped.
    #[must_use]
    pub fn is_destroyed(&self, id: EntityId) -> bool {
        match self.entity(id) {
            Ok(entity) => entity.is_destroyed(),
            Err(err) => err == KernelError::Disposed(id),
        }
    }

    /// Entities receiving per-tick updates, in insertion order.
    #[must_use]
    pub fn updatables(&self) -> &[EntityId] {
        &self.updatables
    }

    /// The global trait registry.
    #[must_use]
    pub const fn traits(&self) -> &TraitRegistry {
        &self.traits
    }

    /// Registers a global trait after all others.
    pub fn add_trait(&mut self, handle: TraitHandle) {
        trace!(trait_id = %handle.id(), "global trait added");
        self.traits.add(handle);
    }

    /// Registers a global trait before all others.
    pub fn add_trait_to_front(&mut self, handle: TraitHandle) {
        trace!(trait_id = %handle.id(), "global trait added to front");
        self.traits.add_to_front(handle);
    }

    /// Unregisters a global trait. Returns false if it was not registered.
    pub fn remove_trait(&mut self, handle: &TraitHandle) -> bool {
        self.traits.remove(handle)
    }

    /// The event bus.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Adds a player and returns its ID.
    pub fn add_player(&mut self, name: &str, country: &str, is_combatant: bool) -> PlayerId {
        self.players.add(name, country, is_combatant)
    }

    /// All players.
    #[must_use]
    pub const fn players(&self) -> &PlayerList {
        &self.players
    }

    /// All players, mutably.
    pub fn players_mut(&mut self) -> &mut PlayerList {
        &mut self.players
    }

    /// Looks up a player.
    ///
    /// # Errors
    ///
    /// [`KernelError::UnknownPlayer`] if the ID does not resolve.
    pub fn player(&self, id: PlayerId) -> KernelResult<&Player> {
        self.players.get(id).ok_or(KernelError::UnknownPlayer(id))
    }

    pub(crate) fn player_mut(&mut self, id: PlayerId) -> KernelResult<&mut Player> {
        self.players.get_mut(id).ok_or(KernelError::UnknownPlayer(id))
    }

    /// The alliance table.
    #[must_use]
    pub const fn alliances(&self) -> &AllianceTable {
        &self.alliances
    }

    /// The rules lookup.
    #[must_use]
    pub fn rules(&self) -> &dyn RulesLookup {
        self.rules.as_ref()
    }

    /// The tile-occupation service.
    #[must_use]
    pub fn occupation(&self) -> &dyn TileOccupation {
        self.occupation.as_ref()
    }

    /// The countdown timer.
    #[must_use]
    pub const fn countdown(&self) -> &CountdownTimer {
        &self.countdown
    }

    /// The countdown timer, mutably.
    pub fn countdown_mut(&mut self) -> &mut CountdownTimer {
        &mut self.countdown
    }

    /// The local viewer.
    #[must_use]
    pub const fn viewer(&self) -> &LocalViewer {
        &self.viewer
    }

    /// The local viewer, mutably.
    pub fn viewer_mut(&mut self) -> &mut LocalViewer {
        &mut self.viewer
    }

    /// Queues `callback` to run once at step 7 of the current tick. Callbacks
    /// queued while the queue drains run in the next tick.
    pub fn after_tick(&mut self, callback: impl FnOnce(&mut Self) -> KernelResult<()> + 'static) {
        self.after_tick.push(Box::new(callback));
    }

    // -------------------------------------------------------------------------
    // Tick
    // -------------------------------------------------------------------------

    /// Runs one tick.
    ///
    /// # Errors
    ///
    /// Any [`KernelError`] raised by a trait, hook or callback aborts the tick
    /// immediately. The simulation must then be considered desynced.
    pub fn step(&mut self) -> KernelResult<()> {
        trace!(tick = self.tick, "tick start");

        // 1. AI
        if let Some(mut bot) = self.bot.take() {
            let result = bot.update(self);
            self.bot = Some(bot);
            result?;
        }

        // 2. End of game
        let interval = u64::from(self.config.end_check_interval_ms);
        if !self.ended && self.elapsed_ms - self.last_end_check_ms >= interval {
            self.last_end_check_ms = self.elapsed_ms;
            self.check_end_of_game()?;
        }

        // 3. Per-entity updates over a stable snapshot
        let snapshot = self.updatables.clone();
        for id in snapshot {
            if self.entity(id).is_ok_and(Entity::is_spawned) {
                self.update_entity(id)?;
            }
        }

        // 4. Cooldowns. Kept running after the game has ended.
        for player in self.players.combatants_mut() {
            player.cheer_cooldown_ticks = player.cheer_cooldown_ticks.saturating_sub(1);
        }

        // 5. Global tick broadcast
        let global = self.traits.filter(Capability::Tick);
        for t in global.iter() {
            t.on_tick(self, Host::Global)?;
        }

        // 6. Selection pruning (presentation)
        self.prune_selection();

        // 7. After-tick queue
        let queue = mem::take(&mut self.after_tick);
        for callback in queue {
            callback(self)?;
        }

        // 8. Triggers
        if let Some(mut triggers) = self.triggers.take() {
            let result = triggers.update(self);
            self.triggers = Some(triggers);
            result?;
        }

        // 9. Countdown
        if self.countdown.update() {
            self.events.dispatch(&GameEvent::CountdownExpired);
        }

        // 10. Advance
        self.tick += 1;
        self.elapsed_ms += u64::from(self.config.tick_duration_ms);
        Ok(())
    }

    /// An entity's own update: its tick traits, then built-in per-kind work.
    fn update_entity(&mut self, id: EntityId) -> KernelResult<()> {
        let local = self.entity(id)?.traits().filter(Capability::Tick);
        for t in local.iter() {
            if !self.entity(id).is_ok_and(Entity::is_spawned) {
                return Ok(());
            }
            t.on_tick(self, Host::Entity(id))?;
        }

        // A tick trait may have destroyed its own host.
        let Ok(entity) = self.entity_mut(id) else {
            return Ok(());
        };
        if !entity.is_spawned() {
            return Ok(());
        }
        let owner = entity.owner();
        let detonated = match entity.projectile_mut() {
            Some(projectile) => {
                projectile.remaining_ticks = projectile.remaining_ticks.saturating_sub(1);
                (projectile.remaining_ticks == 0).then_some(projectile.source)
            }
            None => None,
        };
        if let Some(source) = detonated {
            trace!(entity = %id, "projectile detonated");
            let attacker = AttackerInfo {
                object: source,
                player: owner,
            };
            self.destroy(id, Some(attacker))?;
        }
        Ok(())
    }

    fn check_end_of_game(&mut self) -> KernelResult<()> {
        if self.players.combatants().next().is_none() {
            return Ok(());
        }

        let newly_defeated: Vec<PlayerId> = self
            .players
            .combatants()
            .filter(|p| !p.is_defeated)
            .filter(|p| {
                !p.owned_objects().iter().any(|&id| {
                    self.entity(id)
                        .is_ok_and(|e| e.kind().is_techno() && !e.is_destroyed())
                })
            })
            .map(Player::id)
            .collect();

        for id in newly_defeated {
            let player = self.player_mut(id)?;
            player.is_defeated = true;
            player.is_observer = true;
            info!(player = %id, name = %player.name, "player defeated");
            self.events.dispatch(&GameEvent::PlayerDefeated { player: id });
        }

        let remaining: Vec<PlayerId> = self
            .players
            .combatants()
            .filter(|p| !p.is_defeated)
            .map(Player::id)
            .collect();
        let all_allied = remaining
            .iter()
            .all(|&a| remaining.iter().all(|&b| self.alliances.are_allied(a, b)));

        if all_allied {
            self.ended = true;
            info!(tick = self.tick, winners = ?remaining, "game ended");
            self.events.dispatch(&GameEvent::GameEnded { winners: remaining });
        }
        Ok(())
    }

    fn prune_selection(&mut self) {
        let world = &self.world;
        self.viewer
            .selection
            .retain(|&id| world.get_by_id(id).is_ok_and(Entity::is_spawned));
    }
}

#[cfg(test)]
mod tests {
    use glam::IVec2;

    use super::*;
    use crate::entity::EntityKind;
    use crate::rules::{ObjectRules, RulesTable};

    fn sim() -> Simulation {
        let mut rules = RulesTable::new();
        rules
            .insert_object(ObjectRules::new("MTNK", EntityKind::Vehicle, 300))
            .unwrap();
        Simulation::new(SimulationConfig::with_seeds(7, 11), rules)
    }

    mod step_tests {
        use super::*;

        #[test]
        fn step_advances_tick_and_elapsed() {
            let mut sim = sim();
            sim.step().unwrap();
            sim.step().unwrap();
            assert_eq!(sim.tick(), 2);
            assert_eq!(sim.elapsed_ms(), 132);
        }

        #[test]
        fn entity_lookup_checks_both_stores() {
            let mut sim = sim();
            let id = sim.create_object("MTNK", EntityKind::Vehicle).unwrap().unwrap();
            assert!(sim.entity(id).is_ok());
            assert!(!sim.world().has_id(id));

            sim.spawn(id, IVec2::new(1, 1)).unwrap();
            assert!(sim.world().has_id(id));
            assert!(sim.entity(id).is_ok());
            assert_eq!(
                sim.entity(EntityId::new(99)).unwrap_err(),
                KernelError::NotFound(EntityId::new(99))
            );
        }

        #[test]
        fn cooldowns_decrement_for_combatants_only() {
            let mut sim = sim();
            let alice = sim.add_player("alice", "Americans", true);
            let neutral = sim.add_player("@@neutral", "Neutral", false);
            sim.players_mut().get_mut(alice).unwrap().cheer_cooldown_ticks = 3;
            sim.players_mut().get_mut(neutral).unwrap().cheer_cooldown_ticks = 3;

            sim.step().unwrap();
            assert_eq!(sim.player(alice).unwrap().cheer_cooldown_ticks, 2);
            assert_eq!(sim.player(neutral).unwrap().cheer_cooldown_ticks, 3);
        }

        #[test]
        fn selection_pruned_to_spawned() {
            let mut sim = sim();
            let a = sim.create_object("MTNK", EntityKind::Vehicle).unwrap().unwrap();
            let b = sim.create_object("MTNK", EntityKind::Vehicle).unwrap().unwrap();
            sim.spawn(a, IVec2::new(1, 1)).unwrap();
            sim.spawn(b, IVec2::new(2, 2)).unwrap();
            sim.viewer_mut().selection = vec![a, b];

            sim.unspawn(b).unwrap();
            sim.step().unwrap();
            assert_eq!(sim.viewer().selection, vec![a]);
        }

        #[test]
        fn bot_hook_runs_each_tick() {
            let mut sim = sim();
            let id = sim.create_object("MTNK", EntityKind::Vehicle).unwrap().unwrap();
            sim.set_bot_hook(move |sim: &mut Simulation| -> KernelResult<()> {
                if sim.tick() == 1 {
                    sim.spawn(id, IVec2::new(3, 3))?;
                }
                Ok(())
            });
            sim.step().unwrap();
            assert!(!sim.entity(id).unwrap().is_spawned());
            sim.step().unwrap();
            assert!(sim.entity(id).unwrap().is_spawned());
        }

        #[test]
        fn hook_error_aborts_tick() {
            let mut sim = sim();
            sim.set_trigger_hook(|_: &mut Simulation| -> KernelResult<()> {
                Err(KernelError::NotFound(EntityId::new(1)))
            });
            assert!(sim.step().is_err());
            assert_eq!(sim.tick(), 0);
        }

        #[test]
        fn countdown_expiry_dispatches_once() {
            use std::cell::Cell;
            use std::rc::Rc;

            use crate::event::EventType;

            let mut sim = sim();
            let fired = Rc::new(Cell::new(0));
            let counter = Rc::clone(&fired);
            let _sub = sim
                .events()
                .subscribe(EventType::CountdownExpired, move |_| counter.set(counter.get() + 1));
            sim.countdown_mut().start(3);
            for _ in 0..6 {
                sim.step().unwrap();
            }
            assert_eq!(fired.get(), 1);
        }
    }

    mod end_of_game_tests {
        use super::*;

        fn ticks_per_check(sim: &Simulation) -> u64 {
            let cfg = sim.config();
            u64::from(cfg.end_check_interval_ms.div_ceil(cfg.tick_duration_ms)) + 1
        }

        #[test]
        fn player_without_units_is_defeated_and_game_ends() {
            let mut sim = sim();
            let alice = sim.add_player("alice", "Americans", true);
            let bob = sim.add_player("bob", "Russians", true);
            let tank = sim
                .create_unit_for_player("MTNK", EntityKind::Vehicle, alice)
                .unwrap()
                .unwrap();
            sim.spawn(tank, IVec2::new(5, 5)).unwrap();

            for _ in 0..ticks_per_check(&sim) {
                sim.step().unwrap();
            }

            assert!(!sim.player(alice).unwrap().is_defeated);
            let bob = sim.player(bob).unwrap();
            assert!(bob.is_defeated);
            assert!(bob.is_observer);
            assert!(sim.is_ended());
        }

        #[test]
        fn allied_survivors_end_the_game() {
            let mut sim = sim();
            let a = sim.add_player("a", "Americans", true);
            let b = sim.add_player("b", "British", true);
            for p in [a, b] {
                let id = sim
                    .create_unit_for_player("MTNK", EntityKind::Vehicle, p)
                    .unwrap()
                    .unwrap();
                sim.spawn(id, IVec2::new(1, 1)).unwrap();
            }

            for _ in 0..ticks_per_check(&sim) {
                sim.step().unwrap();
            }
            assert!(!sim.is_ended());

            sim.on_alliance_change(a, b, true).unwrap();
            for _ in 0..ticks_per_check(&sim) {
                sim.step().unwrap();
            }
            assert!(sim.is_ended());
        }

        #[test]
        fn no_check_before_interval() {
            let mut sim = sim();
            sim.add_player("alone", "Americans", true);
            sim.step().unwrap();
            assert!(!sim.is_ended());
        }
    }
}
