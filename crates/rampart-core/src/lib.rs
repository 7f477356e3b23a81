//! # Rampart Core
//!
//! Deterministic lockstep simulation kernel for the Rampart RTS.
//!
//! Every peer in a multiplayer session runs its own [`Simulation`] from the
//! same seeds and the same ordered command stream. Nothing here depends on
//! wall-clock time, hash-map iteration order or an unseeded random source, so
//! the peers stay bit-identical and can compare
//! [`Simulation::state_hash`] every tick to detect desync.
//!
//! ## Architecture
//!
//! - **Entities**: buildings, units, projectiles and terrain objects with an
//!   explicit lifecycle (unregistered, spawned, limbo, destroyed, disposed)
//! - **Traits**: capability-declaring behavior objects attached to an entity
//!   or to the simulation, notified in a fixed order (see [`capability`])
//! - **Scheduler**: a fixed ten-step tick (see [`simulation`])
//! - **Events**: a typed, synchronous bus for consumers outside the kernel
//!
//! ## Usage
//!
//! ```rust
//! use glam::IVec2;
//! use rampart_core::{EntityKind, ObjectRules, RulesTable, Simulation, SimulationConfig};
//!
//! let mut rules = RulesTable::new();
//! rules.insert_object(ObjectRules::new("E1", EntityKind::Infantry, 125)).unwrap();
//!
//! let mut sim = Simulation::new(SimulationConfig::with_seeds(42, 7), rules);
//! let player = sim.add_player("alice", "Americans", true);
//! let rifle = sim
//!     .create_unit_for_player("E1", EntityKind::Infantry, player)
//!     .unwrap()
//!     .unwrap();
//! sim.spawn(rifle, IVec2::new(10, 10)).unwrap();
//! sim.step().unwrap();
//!
//! let hash = sim.state_hash();
//! # let _ = hash;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod alliance;
pub mod arena;
pub mod capability;
pub mod collab;
pub mod config;
pub mod entity;
pub mod error;
pub mod event;
pub mod factory;
pub mod hash;
pub mod player;
pub mod rng;
pub mod rules;
pub mod simulation;
pub mod spatial;
pub mod traits;
pub mod world;

pub use capability::{Capabilities, Capability, GameTrait, Host, TraitHandle, TraitId};
pub use config::SimulationConfig;
pub use entity::{Entity, EntityId, EntityKind, LifecycleState};
pub use error::{ConfigError, KernelError, KernelResult, RulesError};
pub use event::{AttackerInfo, DeathKind, EventBus, EventType, GameEvent};
pub use factory::Target;
pub use player::PlayerId;
pub use rules::{ObjectRules, RulesLookup, RulesTable};
pub use simulation::Simulation;

#[cfg(test)]
mod tests;
