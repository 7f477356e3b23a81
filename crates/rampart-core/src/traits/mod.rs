//! Built-in global traits.
//!
//! The kernel never references these statically. They are ordinary
//! [`GameTrait`](crate::capability::GameTrait)s a session registers with
//! [`Simulation::add_trait`](crate::simulation::Simulation::add_trait):
//!
//! - [`PowerGrid`]: per-player power output and drain from spawned buildings
//! - [`SuperWeaponCharge`]: recharges every player's super weapons each tick
//!
//! Both rely on the notification order of the lifecycle API: the power grid
//! still sees an entity's owner in its unspawn handler because ownership is
//! released only after the unspawn notifications of a destroy.

mod power;
mod super_weapon;

pub use power::{PowerBalance, PowerGrid};
pub use super_weapon::SuperWeaponCharge;
