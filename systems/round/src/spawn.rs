//! Spawn point lists and placement checks.

use std::f32::consts::TAU;

use glam::Vec2;
use outbreak_core::{CharacterView, Faction, SpatialQuery};

/// Number of points probed on the ring around a spawn candidate.
const BORDER_PROBES: u32 = 16;

/// Spawn points grouped by faction.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpawnPoints {
    human: Vec<Vec2>,
    infected: Vec<Vec2>,
}

impl SpawnPoints {
    /// Creates spawn lists from the provided points.
    #[must_use]
    pub fn new(human: Vec<Vec2>, infected: Vec<Vec2>) -> Self {
        Self { human, infected }
    }

    /// Spawn points reserved for the faction.
    #[must_use]
    pub fn for_faction(&self, faction: Faction) -> &[Vec2] {
        match faction {
            Faction::Human => &self.human,
            Faction::Infected => &self.infected,
        }
    }
}

/// Placement rules shared by every spawn check.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Clearance {
    pub(crate) characters: f32,
    pub(crate) border: f32,
}

fn point_rejected(point: Vec2, excluded_zone: Option<u32>, spatial: &impl SpatialQuery) -> bool {
    if spatial.point_blocked(point) {
        return true;
    }
    excluded_zone.is_some_and(|zone| spatial.zone_at(point) == Some(zone))
}

/// Reports whether a character may appear at `point`.
pub(crate) fn is_spawnable(
    point: Vec2,
    excluded_zone: Option<u32>,
    clearance: Clearance,
    characters: &CharacterView,
    spatial: &impl SpatialQuery,
) -> bool {
    if characters
        .iter()
        .any(|character| character.position.distance(point) <= clearance.characters)
    {
        return false;
    }
    if point_rejected(point, excluded_zone, spatial) {
        return false;
    }

    (0..BORDER_PROBES).all(|probe| {
        let angle = probe as f32 * TAU / BORDER_PROBES as f32;
        let ring = point + Vec2::new(angle.cos(), angle.sin()) * clearance.border;
        !point_rejected(ring, excluded_zone, spatial)
    })
}

#[cfg(test)]
mod tests {
    use outbreak_core::{CharacterSnapshot, ClientId, Role};

    use super::*;

    struct WallAtX(f32);

    impl SpatialQuery for WallAtX {
        fn point_blocked(&self, point: Vec2) -> bool {
            point.x >= self.0
        }

        fn zone_at(&self, point: Vec2) -> Option<u32> {
            (point.y < 0.0).then_some(7)
        }
    }

    const CLEARANCE: Clearance = Clearance {
        characters: 60.0,
        border: 30.0,
    };

    #[test]
    fn rejects_points_near_walls_or_characters() {
        let wall = WallAtX(200.0);
        let empty = CharacterView::default();
        assert!(is_spawnable(Vec2::new(100.0, 100.0), None, CLEARANCE, &empty, &wall));
        assert!(!is_spawnable(Vec2::new(180.0, 100.0), None, CLEARANCE, &empty, &wall));

        let crowded = CharacterView::from_snapshots(vec![CharacterSnapshot {
            client: ClientId::new(1),
            position: Vec2::new(140.0, 100.0),
            role: Role::Soldier,
            previous_role: Role::None,
            health: 10,
            armor: 0,
            has_heal_boom: false,
        }]);
        assert!(!is_spawnable(Vec2::new(100.0, 100.0), None, CLEARANCE, &crowded, &wall));
    }

    #[test]
    fn excluded_zone_applies_to_the_ring() {
        let wall = WallAtX(1_000.0);
        let empty = CharacterView::default();
        assert!(is_spawnable(Vec2::new(100.0, 20.0), None, CLEARANCE, &empty, &wall));
        assert!(!is_spawnable(Vec2::new(100.0, 20.0), Some(7), CLEARANCE, &empty, &wall));
        assert!(is_spawnable(Vec2::new(100.0, 20.0), Some(3), CLEARANCE, &empty, &wall));
    }
}
