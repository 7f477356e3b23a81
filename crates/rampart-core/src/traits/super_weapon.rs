//! Super weapon recharge.

use tracing::debug;

use crate::capability::{Capabilities, GameTrait, Host, TraitId};
use crate::error::KernelResult;
use crate::simulation::Simulation;

/// Global tick trait that advances every player's super weapon charge by one
/// tick. Defeated players' weapons stop charging.
#[derive(Debug, Default, Clone, Copy)]
pub struct SuperWeaponCharge;

impl SuperWeaponCharge {
    /// Creates the trait.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl GameTrait for SuperWeaponCharge {
    fn id(&self) -> TraitId {
        TraitId::from_static("super_weapon_charge")
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::TICK
    }

    fn on_tick(&self, sim: &mut Simulation, host: Host) -> KernelResult<()> {
        if host != Host::Global {
            return Ok(());
        }
        for player in sim.players_mut().iter_mut().filter(|p| !p.is_defeated) {
            for weapon in &mut player.super_weapons {
                let was_ready = weapon.is_ready();
                weapon.charge();
                if !was_ready && weapon.is_ready() {
                    debug!(player = %weapon.owner, name = %weapon.name, "super weapon ready");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::config::SimulationConfig;
    use crate::rules::{RulesTable, SuperWeaponRules};

    #[test]
    fn charges_once_per_tick() {
        let mut rules = RulesTable::new();
        rules.insert_super_weapon(SuperWeaponRules {
            name: "NukeSpecial".into(),
            recharge_ticks: 3,
        });
        let mut sim = Simulation::new(SimulationConfig::with_seeds(1, 1), rules);
        sim.add_trait(Rc::new(SuperWeaponCharge::new()));
        let alice = sim.add_player("alice", "Russians", true);
        assert!(sim.create_super_weapon("NukeSpecial", alice).unwrap());
        assert!(!sim.create_super_weapon("Missing", alice).unwrap());

        sim.step().unwrap();
        sim.step().unwrap();
        assert!(!sim.player(alice).unwrap().super_weapons[0].is_ready());
        sim.step().unwrap();
        assert!(sim.player(alice).unwrap().super_weapons[0].is_ready());
    }
}
