//! Per-entity state components.
//!
//! These hold the plain data an entity carries besides its traits. They are
//! all hashed into the state hash through [`Entity`](super::Entity).

use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::factory::Target;
use crate::hash::{StateHash, StateHasher};

/// Hit points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    /// Current hit points.
    pub current: u32,
    /// Maximum hit points from rules.
    pub max: u32,
}

impl Health {
    /// Full health.
    #[must_use]
    pub const fn full(max: u32) -> Self {
        Self { current: max, max }
    }

    /// Returns true if no hit points remain.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.current == 0
    }
}

impl StateHash for Health {
    fn hash_state(&self, hasher: &mut StateHasher) {
        hasher.write_u32(self.current);
        hasher.write_u32(self.max);
    }
}

/// Placement handle owned by the tile-occupation collaborator.
///
/// The kernel only stores it and folds it into the hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    /// Top-left tile.
    pub tile: IVec2,
    /// Footprint in tiles (width, height); at least 1x1.
    pub footprint: IVec2,
    /// Set when the requested tile was outside the map and a clamped
    /// placeholder was substituted.
    pub placeholder: bool,
}

impl Placement {
    /// A 1x1 placement at `tile`.
    #[must_use]
    pub const fn at(tile: IVec2) -> Self {
        Self {
            tile,
            footprint: IVec2::ONE,
            placeholder: false,
        }
    }

    /// Center tile of the footprint. Saturates at the `i32` bounds, so
    /// untrusted far-off coordinates stay off the map instead of wrapping.
    #[must_use]
    pub fn center_tile(&self) -> IVec2 {
        self.tile.saturating_add(self.footprint / 2)
    }
}

impl StateHash for Placement {
    fn hash_state(&self, hasher: &mut StateHasher) {
        hasher.write_i32(self.tile.x);
        hasher.write_i32(self.tile.y);
        hasher.write_i32(self.footprint.x);
        hasher.write_i32(self.footprint.y);
        hasher.write_bool(self.placeholder);
    }
}

/// In-flight projectile state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectileState {
    /// Firing entity, if any. Loose projectiles have none.
    pub source: Option<EntityId>,
    /// What the projectile is flying at.
    pub target: Target,
    /// Weapon that fired it.
    pub weapon: String,
    /// Ticks until detonation.
    pub remaining_ticks: u32,
}

impl StateHash for ProjectileState {
    fn hash_state(&self, hasher: &mut StateHasher) {
        hasher.write_opt_u64(self.source.map(EntityId::as_u64));
        self.target.hash_state(hasher);
        hasher.write_str(&self.weapon);
        hasher.write_u32(self.remaining_ticks);
    }
}

/// State retained while an entity is in limbo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimboData {
    /// Whether the entity was selected by the local viewer.
    pub selected: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_full() {
        let health = Health::full(300);
        assert_eq!(health.current, 300);
        assert!(!health.is_zero());
    }

    #[test]
    fn center_tile_of_footprint() {
        let placement = Placement {
            tile: IVec2::new(10, 10),
            footprint: IVec2::new(3, 2),
            placeholder: false,
        };
        assert_eq!(placement.center_tile(), IVec2::new(11, 11));
        assert_eq!(Placement::at(IVec2::new(4, 5)).center_tile(), IVec2::new(4, 5));
    }

    #[test]
    fn center_tile_saturates() {
        let placement = Placement {
            tile: IVec2::new(i32::MAX, i32::MIN),
            footprint: IVec2::new(2, 2),
            placeholder: false,
        };
        assert_eq!(placement.center_tile(), IVec2::new(i32::MAX, i32::MIN + 1));
    }

    #[test]
    fn placement_serialization_roundtrip() {
        let placement = Placement::at(IVec2::new(1, 2));
        let json = serde_json::to_string(&placement).unwrap();
        let back: Placement = serde_json::from_str(&json).unwrap();
        assert_eq!(placement, back);
    }

    #[test]
    fn placeholder_changes_hash() {
        let a = Placement::at(IVec2::new(1, 2));
        let b = Placement { placeholder: true, ..a };
        let mut ha = StateHasher::new();
        a.hash_state(&mut ha);
        let mut hb = StateHasher::new();
        b.hash_state(&mut hb);
        assert_ne!(ha.finish(), hb.finish());
    }
}
