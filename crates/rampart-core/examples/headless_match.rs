//! Runs a short scripted skirmish without any presentation layer and prints
//! the per-tick state hash, the way a dedicated lockstep peer would.
//!
//! ```text
//! RUST_LOG=rampart_core=debug cargo run --example headless_match
//! ```

use std::rc::Rc;

use anyhow::Context;
use glam::IVec2;
use rampart_core::event::EventType;
use rampart_core::traits::{PowerGrid, SuperWeaponCharge};
use rampart_core::{
    AttackerInfo, EntityKind, KernelResult, RulesTable, Simulation, SimulationConfig,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

const RULES: &str = r#"{
    "objects": [
        { "name": "MTNK", "kind": "Vehicle", "max_health": 300, "cost": 800 },
        { "name": "E1", "kind": "Infantry", "max_health": 125, "cost": 200 },
        { "name": "GAPOWR", "kind": "Building", "max_health": 750, "cost": 800,
          "leaves_rubble": true, "footprint": [2, 2], "power": 200 },
        { "name": "120mm", "kind": "Projectile" }
    ],
    "weapons": [
        { "name": "105mm", "projectile": "120mm", "flight_ticks": 4 }
    ],
    "super_weapons": [
        { "name": "NukeSpecial", "recharge_ticks": 90 }
    ]
}"#;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let rules = RulesTable::from_json(RULES).context("parsing rules")?;
    let config = SimulationConfig::from_json(r#"{ "seeds": { "game": 1986, "map": 7 } }"#)
        .context("parsing config")?;

    let mut sim = Simulation::new(config, rules);
    let power = Rc::new(PowerGrid::new());
    sim.add_trait(power.clone());
    sim.add_trait(Rc::new(SuperWeaponCharge::new()));

    let allies = sim.add_player("allies", "Americans", true);
    let soviets = sim.add_player("soviets", "Russians", true);
    sim.create_super_weapon("NukeSpecial", soviets)?;

    let _defeats = sim.events().subscribe(EventType::PlayerDefeated, |event| {
        info!(?event, "defeat");
    });

    let plant = sim
        .create_unit_for_player("GAPOWR", EntityKind::Building, allies)?
        .context("no rules for GAPOWR")?;
    sim.spawn(plant, IVec2::new(10, 10))?;
    let tank = sim
        .create_unit_for_player("MTNK", EntityKind::Vehicle, allies)?
        .context("no rules for MTNK")?;
    sim.spawn(tank, IVec2::new(14, 12))?;

    let mut riflemen = Vec::new();
    for i in 0..4 {
        let rifle = sim
            .create_unit_for_player("E1", EntityKind::Infantry, soviets)?
            .context("no rules for E1")?;
        sim.spawn(rifle, IVec2::new(30 + i, 30))?;
        riflemen.push(rifle);
    }

    // The tank fires at the next rifleman every 20 ticks; each shell kills.
    sim.set_bot_hook(move |sim: &mut Simulation| -> KernelResult<()> {
        if sim.tick() % 20 != 0 {
            return Ok(());
        }
        let Some(&victim) = riflemen.iter().find(|&&r| !sim.is_destroyed(r)) else {
            return Ok(());
        };
        let tile = sim.tile_of(victim).unwrap_or_default();
        let target = sim.create_target(Some(victim), tile);
        if let Some(shell) = sim.create_projectile("105mm", tank, target)? {
            sim.spawn(shell, IVec2::new(14, 12))?;
            sim.notify_attack(tank, target)?;
            sim.after_tick(move |sim| {
                sim.destroy(victim, Some(AttackerInfo {
                    object: Some(tank),
                    player: Some(allies),
                }))
            });
        }
        Ok(())
    });

    while !sim.is_ended() && sim.tick() < 600 {
        sim.step()?;
        if sim.tick() % 30 == 0 {
            info!(tick = sim.tick(), hash = %format!("{:016x}", sim.state_hash()), "checkpoint");
        }
    }

    let grid = power.balance(allies);
    info!(
        tick = sim.tick(),
        ended = sim.is_ended(),
        power_output = grid.output,
        kills = sim.player(allies)?.score.total_kills(),
        "match over"
    );
    println!("{}", serde_json::to_string_pretty(&sim.debug_state())?);
    Ok(())
}
