//! Tile occupation.
//!
//! Tile geometry is owned by an external collaborator; the kernel only
//! registers placements on spawn, unregisters them on unspawn, and asks range
//! questions. [`GridOccupancy`] is a plain rectangular grid implementation.
//!
//! Query results are always sorted by entity ID so callers can feed them into
//! simulation decisions without further ordering.

use std::collections::BTreeMap;

use glam::IVec2;

use crate::entity::{EntityId, Placement};

/// Tile-occupation service.
pub trait TileOccupation {
    /// Map size in tiles.
    fn map_size(&self) -> IVec2;

    /// Returns true if `tile` lies on the map.
    fn contains(&self, tile: IVec2) -> bool {
        let size = self.map_size();
        tile.x >= 0 && tile.y >= 0 && tile.x < size.x && tile.y < size.y
    }

    /// Records that `id` occupies `placement`.
    fn register(&mut self, id: EntityId, placement: &Placement);

    /// Forgets `id`. Does nothing if it was not registered.
    fn unregister(&mut self, id: EntityId);

    /// Entities whose footprint covers `tile`, sorted by ID.
    fn occupants(&self, tile: IVec2) -> Vec<EntityId>;

    /// Entities whose center tile lies within `range` tiles (Euclidean) of
    /// `center`, sorted by ID.
    fn query_range(&self, center: IVec2, range: i32) -> Vec<EntityId>;
}

/// Rectangular grid occupancy.
///
/// Placements are kept in a `BTreeMap`, so both queries are already in ID
/// order.
#[derive(Debug, Clone, Default)]
pub struct GridOccupancy {
    size: IVec2,
    placements: BTreeMap<EntityId, Placement>,
}

impl GridOccupancy {
    /// Creates an empty grid of `width` x `height` tiles.
    #[must_use]
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            size: IVec2::new(width, height),
            placements: BTreeMap::new(),
        }
    }

    /// Number of registered placements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.placements.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// Placement registered for `id`.
    #[must_use]
    pub fn placement(&self, id: EntityId) -> Option<&Placement> {
        self.placements.get(&id)
    }
}

fn covers(placement: &Placement, tile: IVec2) -> bool {
    let min = placement.tile;
    let max = placement.tile.saturating_add(placement.footprint);
    tile.x >= min.x && tile.y >= min.y && tile.x < max.x && tile.y < max.y
}

impl TileOccupation for GridOccupancy {
    fn map_size(&self) -> IVec2 {
        self.size
    }

    fn register(&mut self, id: EntityId, placement: &Placement) {
        self.placements.insert(id, *placement);
    }

    fn unregister(&mut self, id: EntityId) {
        self.placements.remove(&id);
    }

    fn occupants(&self, tile: IVec2) -> Vec<EntityId> {
        self.placements
            .iter()
            .filter(|(_, p)| covers(p, tile))
            .map(|(id, _)| *id)
            .collect()
    }

    fn query_range(&self, center: IVec2, range: i32) -> Vec<EntityId> {
        let range_sq = i64::from(range) * i64::from(range);
        self.placements
            .iter()
            .filter(|(_, p)| {
                let c = p.center_tile();
                let dx = i64::from(c.x) - i64::from(center.x);
                let dy = i64::from(c.y) - i64::from(center.y);
                dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy)) <= range_sq
            })
            .map(|(id, _)| *id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn building(x: i32, y: i32) -> Placement {
        Placement {
            tile: IVec2::new(x, y),
            footprint: IVec2::new(2, 2),
            placeholder: false,
        }
    }

    #[test]
    fn contains_checks_bounds() {
        let grid = GridOccupancy::new(10, 8);
        assert!(grid.contains(IVec2::new(0, 0)));
        assert!(grid.contains(IVec2::new(9, 7)));
        assert!(!grid.contains(IVec2::new(10, 0)));
        assert!(!grid.contains(IVec2::new(-1, 3)));
    }

    #[test]
    fn footprint_occupants() {
        let mut grid = GridOccupancy::new(10, 10);
        grid.register(EntityId::new(2), &building(4, 4));
        grid.register(EntityId::new(1), &Placement::at(IVec2::new(5, 5)));

        assert_eq!(grid.occupants(IVec2::new(5, 5)), vec![EntityId::new(1), EntityId::new(2)]);
        assert_eq!(grid.occupants(IVec2::new(4, 4)), vec![EntityId::new(2)]);
        assert!(grid.occupants(IVec2::new(6, 6)).is_empty());
    }

    #[test]
    fn range_query_sorted_by_id() {
        let mut grid = GridOccupancy::new(64, 64);
        grid.register(EntityId::new(9), &Placement::at(IVec2::new(10, 10)));
        grid.register(EntityId::new(3), &Placement::at(IVec2::new(12, 10)));
        grid.register(EntityId::new(5), &Placement::at(IVec2::new(30, 30)));

        assert_eq!(
            grid.query_range(IVec2::new(10, 10), 2),
            vec![EntityId::new(3), EntityId::new(9)]
        );
        assert_eq!(grid.query_range(IVec2::new(10, 10), 1), vec![EntityId::new(9)]);
    }

    #[test]
    fn queries_at_coordinate_extremes() {
        let mut grid = GridOccupancy::new(64, 64);
        let far = Placement {
            tile: IVec2::new(i32::MAX - 1, i32::MIN),
            footprint: IVec2::new(3, 3),
            placeholder: false,
        };
        grid.register(EntityId::new(1), &far);

        assert_eq!(grid.occupants(IVec2::new(i32::MAX - 1, i32::MIN)), vec![EntityId::new(1)]);
        assert!(grid.query_range(IVec2::new(i32::MIN, i32::MAX), i32::MAX).is_empty());
        assert_eq!(
            grid.query_range(IVec2::new(i32::MAX, i32::MIN), 2),
            vec![EntityId::new(1)]
        );
    }

    #[test]
    fn unregister_removes() {
        let mut grid = GridOccupancy::new(4, 4);
        grid.register(EntityId::new(1), &Placement::at(IVec2::new(1, 1)));
        grid.unregister(EntityId::new(1));
        grid.unregister(EntityId::new(1));
        assert!(grid.is_empty());
    }
}
