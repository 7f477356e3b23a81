//! Shared fixtures for the scenario tests.

use std::cell::RefCell;
use std::rc::Rc;

use crate::capability::{Capabilities, GameTrait, Host, TraitId};
use crate::config::SimulationConfig;
use crate::entity::{EntityId, EntityKind};
use crate::error::KernelResult;
use crate::event::{AttackerInfo, Subscription};
use crate::factory::Target;
use crate::player::PlayerId;
use crate::rules::{ObjectRules, RulesTable, WeaponRules};
use crate::simulation::Simulation;

/// Ordered log shared between recorders, hooks and event subscribers.
pub type Log = Rc<RefCell<Vec<String>>>;

pub fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

/// Drains and returns everything logged so far.
pub fn take(log: &Log) -> Vec<String> {
    std::mem::take(&mut *log.borrow_mut())
}

/// A small Red Alert style rules set.
pub fn rules() -> RulesTable {
    let mut rules = RulesTable::new();
    for object in [
        ObjectRules::new("MTNK", EntityKind::Vehicle, 300).with_cost(800),
        ObjectRules::new("E1", EntityKind::Infantry, 125).with_cost(200),
        ObjectRules::new("GAPOWR", EntityKind::Building, 750)
            .with_cost(800)
            .with_footprint(2, 2)
            .with_power(200)
            .with_rubble(),
        ObjectRules::new("GAWEAP", EntityKind::Building, 1000)
            .with_cost(2000)
            .with_footprint(3, 3)
            .with_power(-30),
        ObjectRules::new("120mm", EntityKind::Projectile, 0),
        ObjectRules::new("TREE01", EntityKind::Terrain, 0),
    ] {
        rules.insert_object(object).unwrap();
    }
    rules.insert_weapon(WeaponRules {
        name: "105mm".into(),
        projectile: "120mm".into(),
        flight_ticks: 3,
    });
    rules
}

pub fn sim_with_seeds(game: u64, map: u64) -> Simulation {
    Simulation::new(SimulationConfig::with_seeds(game, map), rules())
}

pub fn sim() -> Simulation {
    sim_with_seeds(42, 7)
}

/// Creates and spawns a unit for `owner`.
pub fn spawn_unit(sim: &mut Simulation, name: &str, kind: EntityKind, owner: PlayerId) -> EntityId {
    let id = sim
        .create_unit_for_player(name, kind, owner)
        .unwrap()
        .unwrap();
    sim.spawn(id, glam::IVec2::new(8, 8)).unwrap();
    id
}

/// Logs every event type dispatched on the bus as `event:<Type>`.
pub fn record_events(sim: &Simulation, log: &Log) -> Subscription {
    let sink = Rc::clone(log);
    sim.events()
        .subscribe_all(move |event| sink.borrow_mut().push(format!("event:{:?}", event.event_type())))
}

/// Trait that logs each notification it receives as `<label>:<what>`.
pub struct Recorder {
    label: &'static str,
    capabilities: Capabilities,
    log: Log,
}

impl Recorder {
    pub fn new(label: &'static str, capabilities: Capabilities, log: &Log) -> Rc<Self> {
        Rc::new(Self {
            label,
            capabilities,
            log: Rc::clone(log),
        })
    }

    fn push(&self, what: &str) {
        self.log.borrow_mut().push(format!("{}:{what}", self.label));
    }
}

impl GameTrait for Recorder {
    fn id(&self) -> TraitId {
        TraitId::new(self.label)
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn on_tick(&self, _sim: &mut Simulation, host: Host) -> KernelResult<()> {
        match host {
            Host::Global => self.push("tick"),
            Host::Entity(id) => self.push(&format!("tick({id})")),
        }
        Ok(())
    }

    fn on_spawn(&self, _sim: &mut Simulation, _entity: EntityId) -> KernelResult<()> {
        self.push("spawn");
        Ok(())
    }

    fn on_unspawn(&self, _sim: &mut Simulation, _entity: EntityId) -> KernelResult<()> {
        self.push("unspawn");
        Ok(())
    }

    fn on_destroy(
        &self,
        _sim: &mut Simulation,
        _entity: EntityId,
        _attacker: Option<&AttackerInfo>,
    ) -> KernelResult<()> {
        self.push("destroy");
        Ok(())
    }

    fn on_owner_change(
        &self,
        _sim: &mut Simulation,
        _entity: EntityId,
        _old_owner: Option<PlayerId>,
    ) -> KernelResult<()> {
        self.push("owner");
        Ok(())
    }

    fn on_attack(&self, _sim: &mut Simulation, _attacker: EntityId, _target: &Target) -> KernelResult<()> {
        self.push("attack");
        Ok(())
    }
}

