//! Power grid trait.
//!
//! Every spawned object with non-zero `power` in its rules contributes to its
//! owner's balance: positive values are output, negative values drain. The
//! balance follows the object through spawn, unspawn (which includes limbo,
//! rubble and destruction) and owner changes.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use glam::IVec2;
//! use rampart_core::config::SimulationConfig;
//! use rampart_core::entity::EntityKind;
//! use rampart_core::rules::{ObjectRules, RulesTable};
//! use rampart_core::simulation::Simulation;
//! use rampart_core::traits::PowerGrid;
//!
//! let mut rules = RulesTable::new();
//! rules
//!     .insert_object(ObjectRules::new("POWR", EntityKind::Building, 400).with_power(100))
//!     .unwrap();
//!
//! let mut sim = Simulation::new(SimulationConfig::with_seeds(1, 2), rules);
//! let grid = Rc::new(PowerGrid::new());
//! sim.add_trait(grid.clone());
//!
//! let alice = sim.add_player("alice", "Americans", true);
//! let plant = sim
//!     .create_unit_for_player("POWR", EntityKind::Building, alice)
//!     .unwrap()
//!     .unwrap();
//! sim.spawn(plant, IVec2::new(3, 3)).unwrap();
//!
//! assert_eq!(grid.balance(alice).output, 100);
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;

use serde::Serialize;
use tracing::trace;

use crate::capability::{Capabilities, GameTrait, TraitId};
use crate::entity::EntityId;
use crate::error::KernelResult;
use crate::hash::{StateHash, StateHasher};
use crate::player::PlayerId;
use crate::simulation::Simulation;

/// One player's power totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PowerBalance {
    /// Sum of positive contributions.
    pub output: i32,
    /// Sum of negative contributions, as a positive number.
    pub drain: i32,
}

impl PowerBalance {
    /// Output minus drain.
    #[must_use]
    pub const fn surplus(&self) -> i32 {
        self.output.saturating_sub(self.drain)
    }

    /// Returns true when drain exceeds output.
    #[must_use]
    pub const fn is_low(&self) -> bool {
        self.drain > self.output
    }

    /// Adds (`sign > 0`) or removes one contribution. Totals saturate and
    /// never go negative, whatever the rules data says.
    fn apply(&mut self, power: i32, sign: i32) {
        let (total, amount) = if power >= 0 {
            (&mut self.output, power)
        } else {
            (&mut self.drain, power.saturating_neg())
        };
        *total = if sign > 0 {
            total.saturating_add(amount)
        } else {
            total.saturating_sub(amount).max(0)
        };
    }
}

/// Global trait tracking per-player power.
#[derive(Debug, Default)]
pub struct PowerGrid {
    balances: RefCell<BTreeMap<PlayerId, PowerBalance>>,
}

impl PowerGrid {
    /// Creates an empty grid.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current balance of `player`. Zero if it owns nothing powered.
    #[must_use]
    pub fn balance(&self, player: PlayerId) -> PowerBalance {
        self.balances
            .borrow()
            .get(&player)
            .copied()
            .unwrap_or_default()
    }

    fn adjust(&self, player: Option<PlayerId>, power: i32, sign: i32) {
        let Some(player) = player else {
            return;
        };
        if power == 0 {
            return;
        }
        let mut balances = self.balances.borrow_mut();
        let balance = balances.entry(player).or_default();
        balance.apply(power, sign);
        trace!(%player, power, sign, output = balance.output, drain = balance.drain, "power adjusted");
        if *balance == PowerBalance::default() {
            balances.remove(&player);
        }
    }
}

impl GameTrait for PowerGrid {
    fn id(&self) -> TraitId {
        TraitId::from_static("power_grid")
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::SPAWN | Capabilities::UNSPAWN | Capabilities::OWNER_CHANGE
    }

    fn on_spawn(&self, sim: &mut Simulation, entity: EntityId) -> KernelResult<()> {
        let entity = sim.entity(entity)?;
        self.adjust(entity.owner(), entity.rules().power, 1);
        Ok(())
    }

    fn on_unspawn(&self, sim: &mut Simulation, entity: EntityId) -> KernelResult<()> {
        let entity = sim.entity(entity)?;
        self.adjust(entity.owner(), entity.rules().power, -1);
        Ok(())
    }

    fn on_owner_change(
        &self,
        sim: &mut Simulation,
        entity: EntityId,
        old_owner: Option<PlayerId>,
    ) -> KernelResult<()> {
        let entity = sim.entity(entity)?;
        if !entity.is_spawned() {
            return Ok(());
        }
        let power = entity.rules().power;
        self.adjust(old_owner, power, -1);
        self.adjust(entity.owner(), power, 1);
        Ok(())
    }

    fn state_hash(&self) -> Option<u64> {
        let mut hasher = StateHasher::new();
        self.hash_state(&mut hasher);
        Some(hasher.finish())
    }

    fn debug_state(&self) -> Option<serde_json::Value> {
        let balances: BTreeMap<String, PowerBalance> = self
            .balances
            .borrow()
            .iter()
            .map(|(p, b)| (p.to_string(), *b))
            .collect();
        serde_json::to_value(balances).ok()
    }
}

impl StateHash for PowerGrid {
    fn hash_state(&self, hasher: &mut StateHasher) {
        for (player, balance) in self.balances.borrow().iter() {
            hasher.write_u32(player.index());
            hasher.write_i32(balance.output);
            hasher.write_i32(balance.drain);
        }
    }
}
