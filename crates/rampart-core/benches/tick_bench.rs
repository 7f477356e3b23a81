use std::rc::Rc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glam::IVec2;
use rampart_core::entity::EntityKind;
use rampart_core::rules::{ObjectRules, RulesTable, WeaponRules};
use rampart_core::simulation::Simulation;
use rampart_core::traits::{PowerGrid, SuperWeaponCharge};
use rampart_core::SimulationConfig;

fn populated(units: i32) -> Simulation {
    let mut rules = RulesTable::new();
    rules
        .insert_object(ObjectRules::new("MTNK", EntityKind::Vehicle, 300).with_cost(800))
        .unwrap();
    rules
        .insert_object(ObjectRules::new("GAPOWR", EntityKind::Building, 750).with_power(200))
        .unwrap();
    rules
        .insert_object(ObjectRules::new("120mm", EntityKind::Projectile, 0))
        .unwrap();
    rules.insert_weapon(WeaponRules {
        name: "105mm".into(),
        projectile: "120mm".into(),
        flight_ticks: 8,
    });

    let mut sim = Simulation::new(SimulationConfig::with_seeds(1, 2), rules);
    sim.add_trait(Rc::new(PowerGrid::new()));
    sim.add_trait(Rc::new(SuperWeaponCharge::new()));
    let players = [
        sim.add_player("alice", "Americans", true),
        sim.add_player("bob", "Russians", true),
    ];

    for i in 0..units {
        let owner = players[(i % 2) as usize];
        let name = if i % 10 == 0 { "GAPOWR" } else { "MTNK" };
        let kind = if i % 10 == 0 { EntityKind::Building } else { EntityKind::Vehicle };
        let id = sim.create_unit_for_player(name, kind, owner).unwrap().unwrap();
        sim.spawn(id, IVec2::new(i % 64, (i / 64) % 64)).unwrap();
    }
    sim
}

fn bench_step(c: &mut Criterion) {
    let mut sim = populated(500);

    c.bench_function("step_500_units", |b| {
        b.iter(|| {
            // Keep some projectiles in flight so the updatable set is not empty.
            let source = rampart_core::EntityId::new(2);
            let target = sim.create_target(None, IVec2::new(30, 30));
            if let Some(shell) = sim.create_projectile("105mm", source, target).unwrap() {
                sim.spawn(shell, IVec2::new(1, 1)).unwrap();
            }
            sim.step().unwrap();
        })
    });
}

fn bench_state_hash(c: &mut Criterion) {
    let sim = populated(2000);

    c.bench_function("state_hash_2000_units", |b| {
        b.iter(|| black_box(sim.state_hash()))
    });
}

fn bench_lifecycle_churn(c: &mut Criterion) {
    let mut sim = populated(0);
    let owner = rampart_core::PlayerId::new(0);

    c.bench_function("create_spawn_destroy", |b| {
        b.iter(|| {
            let id = sim
                .create_unit_for_player("MTNK", EntityKind::Vehicle, owner)
                .unwrap()
                .unwrap();
            sim.spawn(id, black_box(IVec2::new(5, 5))).unwrap();
            sim.destroy(id, None).unwrap();
        })
    });
}

criterion_group!(benches, bench_step, bench_state_hash, bench_lifecycle_churn);
criterion_main!(benches);
