//! Read-only snapshots of live world entities.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::{closest_point_on_segment, ClientId, EntityId, Faction, Role};

/// Immutable representation of a single character's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CharacterSnapshot {
    /// Identity controlling the character.
    pub client: ClientId,
    /// World-space position of the character.
    pub position: Vec2,
    /// Role currently held by the controlling identity.
    pub role: Role,
    /// Last human role held before the identity was infected.
    pub previous_role: Role,
    /// Remaining health points.
    pub health: i32,
    /// Remaining armor points.
    pub armor: i32,
    /// Whether the single heal burst charge is still available.
    pub has_heal_boom: bool,
}

impl CharacterSnapshot {
    /// Faction the character fights for.
    #[must_use]
    pub fn faction(&self) -> Faction {
        self.role.faction()
    }

    /// Combined health and armor.
    #[must_use]
    pub const fn health_armor_sum(&self) -> i32 {
        self.health + self.armor
    }
}

/// Read-only snapshot describing all live characters.
#[derive(Clone, Debug, Default)]
pub struct CharacterView {
    snapshots: Vec<CharacterSnapshot>,
}

impl CharacterView {
    /// Creates a new character view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<CharacterSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.client);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &CharacterSnapshot> {
        self.snapshots.iter()
    }

    /// Snapshot of the character controlled by `client`, if alive.
    #[must_use]
    pub fn get(&self, client: ClientId) -> Option<&CharacterSnapshot> {
        self.snapshots
            .binary_search_by_key(&client, |snapshot| snapshot.client)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Number of live characters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether no character is alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Finds the character whose body touches the segment closest to `from`.
    ///
    /// Characters are treated as circles of `radius`; `exclude` is skipped.
    /// Returns the hit character together with the contact point on the
    /// segment.
    #[must_use]
    pub fn intersect(
        &self,
        from: Vec2,
        to: Vec2,
        radius: f32,
        exclude: Option<ClientId>,
    ) -> Option<(&CharacterSnapshot, Vec2)> {
        let mut closest: Option<(&CharacterSnapshot, Vec2, f32)> = None;
        for snapshot in &self.snapshots {
            if Some(snapshot.client) == exclude {
                continue;
            }

            let contact = closest_point_on_segment(from, to, snapshot.position);
            if snapshot.position.distance(contact) >= radius {
                continue;
            }

            let along = from.distance(contact);
            match closest {
                Some((_, _, best)) if best <= along => {}
                _ => closest = Some((snapshot, contact, along)),
            }
        }
        closest.map(|(snapshot, contact, _)| (snapshot, contact))
    }
}

/// Short-lived cosmetic entity that growth fields may clean up.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CosmeticSnapshot {
    /// Identifier of the cosmetic entity.
    pub entity: EntityId,
    /// World-space position of the entity.
    pub position: Vec2,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn character(id: u32, x: f32, y: f32) -> CharacterSnapshot {
        CharacterSnapshot {
            client: ClientId::new(id),
            position: Vec2::new(x, y),
            role: Role::Smoker,
            previous_role: Role::Soldier,
            health: 10,
            armor: 0,
            has_heal_boom: false,
        }
    }

    #[test]
    fn intersect_returns_character_nearest_to_origin() {
        let view = CharacterView::from_snapshots(vec![
            character(2, 300.0, 10.0),
            character(1, 150.0, -5.0),
            character(3, 200.0, 100.0),
        ]);

        let (hit, contact) = view
            .intersect(Vec2::ZERO, Vec2::new(400.0, 0.0), 28.0, None)
            .expect("a character is hit");
        assert_eq!(hit.client, ClientId::new(1));
        assert_eq!(contact, Vec2::new(150.0, 0.0));
    }

    #[test]
    fn intersect_skips_excluded_identity() {
        let view = CharacterView::from_snapshots(vec![character(1, 50.0, 0.0)]);
        assert!(view
            .intersect(Vec2::ZERO, Vec2::new(100.0, 0.0), 28.0, Some(ClientId::new(1)))
            .is_none());
    }

    #[test]
    fn snapshots_round_trip_through_bincode() {
        let snapshot = character(9, 12.5, -3.0);
        let bytes = bincode::serialize(&snapshot).expect("serialize");
        let restored: CharacterSnapshot = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(restored, snapshot);
    }

    #[test]
    fn lookup_by_identity() {
        let view = CharacterView::from_snapshots(vec![character(4, 0.0, 0.0), character(2, 0.0, 0.0)]);
        assert!(view.get(ClientId::new(4)).is_some());
        assert!(view.get(ClientId::new(3)).is_none());
        assert_eq!(view.len(), 2);
    }
}
