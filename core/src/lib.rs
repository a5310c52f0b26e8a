#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Outbreak round simulation.
//!
//! This crate defines the vocabulary that connects the authoritative world,
//! the pure simulation systems, and adapters. Systems read immutable views
//! ([`CharacterView`], [`Population`]) together with a [`SimClock`], consult
//! the static map through [`SpatialQuery`], draw randomness from a shared
//! [`RandomSource`], and respond exclusively by appending [`Effect`] values to
//! an output buffer. Nothing a system emits returns a value to it.

mod effect;
mod grid;
mod random;
mod spatial;
mod view;

use glam::Vec2;
use serde::{Deserialize, Serialize};

pub use effect::{
    BanReason, DamageMode, Effect, Emote, Notice, RoundOutcome, ScoreEvent, Sound, Visual,
};
pub use grid::DenseGrid;
pub use random::{RandomSource, SimRng};
pub use spatial::{closest_point_on_segment, SegmentHit, SpatialQuery};
pub use view::{CharacterSnapshot, CharacterView, CosmeticSnapshot};

/// Side length of a single map tile measured in world units.
pub const TILE_SIZE: f32 = 32.0;

/// Upper bound on simultaneously connected identities.
pub const MAX_CLIENTS: usize = 64;

/// Discrete simulation step counter.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Tick(u64);

impl Tick {
    /// The first tick of a simulation.
    pub const ZERO: Self = Self(0);

    /// Wraps a raw tick count.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the raw tick count.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns the tick `ticks` steps after this one.
    #[must_use]
    pub const fn advance(self, ticks: u64) -> Self {
        Self(self.0.saturating_add(ticks))
    }

    /// Number of ticks between `earlier` and this tick, saturating at zero.
    #[must_use]
    pub const fn elapsed_since(self, earlier: Tick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

/// Read-only access to the global tick counter and its rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimClock {
    now: Tick,
    ticks_per_second: u32,
}

impl SimClock {
    /// Creates a clock positioned at `now`.
    #[must_use]
    pub const fn new(now: Tick, ticks_per_second: u32) -> Self {
        Self {
            now,
            ticks_per_second,
        }
    }

    /// Current simulation tick.
    #[must_use]
    pub const fn now(&self) -> Tick {
        self.now
    }

    /// Number of ticks that make up one nominal second.
    #[must_use]
    pub const fn ticks_per_second(&self) -> u32 {
        self.ticks_per_second
    }

    /// Converts a duration in seconds into whole ticks, truncating.
    #[must_use]
    pub fn seconds(&self, seconds: f32) -> u64 {
        if seconds <= 0.0 {
            return 0;
        }
        (seconds * self.ticks_per_second as f32) as u64
    }

    /// Returns the clock advanced by a single tick.
    #[must_use]
    pub const fn next(self) -> Self {
        Self {
            now: self.now.advance(1),
            ticks_per_second: self.ticks_per_second,
        }
    }
}

/// Identity of a connected participant.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ClientId(u32);

impl ClientId {
    /// Creates a new identity with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identity.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier assigned to transient world entities such as fields, beams and cosmetics.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates a new entity identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// One flag per potential target identity.
///
/// Identities beyond [`MAX_CLIENTS`] are reported as already hit so they are
/// never affected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HitMask(u64);

impl HitMask {
    /// Creates an empty mask.
    #[must_use]
    pub const fn new() -> Self {
        Self(0)
    }

    /// Reports whether the identity was already affected.
    #[must_use]
    pub fn contains(&self, client: ClientId) -> bool {
        match bit_for(client) {
            Some(bit) => self.0 & bit != 0,
            None => true,
        }
    }

    /// Records the identity as affected.
    pub fn insert(&mut self, client: ClientId) {
        if let Some(bit) = bit_for(client) {
            self.0 |= bit;
        }
    }

    /// Number of identities recorded.
    #[must_use]
    pub const fn len(&self) -> u32 {
        self.0.count_ones()
    }

    /// Reports whether no identity was recorded yet.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

fn bit_for(client: ClientId) -> Option<u64> {
    let index = usize::try_from(client.get()).ok()?;
    if index < MAX_CLIENTS {
        Some(1_u64 << index)
    } else {
        None
    }
}

/// Location of a single map tile expressed as column and row.
///
/// Coordinates are signed so that field-local offsets around a seed can
/// extend past the map origin without wrapping.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TileCoord {
    column: i32,
    row: i32,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(column: i32, row: i32) -> Self {
        Self { column, row }
    }

    /// Tile containing the provided world position.
    #[must_use]
    pub fn from_world(position: Vec2) -> Self {
        Self {
            column: (position.x.round() / TILE_SIZE).floor() as i32,
            row: (position.y.round() / TILE_SIZE).floor() as i32,
        }
    }

    /// Zero-based column index of the tile.
    #[must_use]
    pub const fn column(&self) -> i32 {
        self.column
    }

    /// Zero-based row index of the tile.
    #[must_use]
    pub const fn row(&self) -> i32 {
        self.row
    }

    /// World-space center of the tile.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        Vec2::new(
            (self.column as f32 + 0.5) * TILE_SIZE,
            (self.row as f32 + 0.5) * TILE_SIZE,
        )
    }

    /// Returns the tile shifted by the provided offsets.
    #[must_use]
    pub const fn offset(self, columns: i32, rows: i32) -> Self {
        Self {
            column: self.column + columns,
            row: self.row + rows,
        }
    }

    /// Computes the Manhattan distance between two tiles.
    #[must_use]
    pub fn manhattan_distance(self, other: TileCoord) -> u32 {
        self.column.abs_diff(other.column) + self.row.abs_diff(other.row)
    }
}

/// The two opposing populations of a round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    /// Survivors trying to outlast the round.
    Human,
    /// Identities spreading the infection.
    Infected,
}

/// Population groups that cap how many humans may hold similar roles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RoleCategory {
    /// Area-denial and construction roles.
    Defender,
    /// Mobile damage dealers.
    Support,
    /// Healers.
    Medic,
    /// Objective carriers.
    Hero,
    /// Experimental support role.
    Sciogist,
    /// Beam healers able to spawn heal bursts.
    Reviver,
}

impl RoleCategory {
    /// Every category in declaration order.
    pub const ALL: [RoleCategory; 6] = [
        Self::Defender,
        Self::Support,
        Self::Medic,
        Self::Hero,
        Self::Sciogist,
        Self::Reviver,
    ];
}

/// Gameplay archetype assigned to an identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    /// No role assigned yet.
    None,
    /// Builds walls that block the infected.
    Engineer,
    /// Throws bombs.
    Soldier,
    /// Teleports and mines.
    Scientist,
    /// Fires bouncing poison lasers.
    Biologist,
    /// Laser that detonates on impact.
    Catapult,
    /// Experimental support fielder.
    Sciogist,
    /// Automatic fire and poison bombs.
    Mercenary,
    /// Long-range rifle.
    Sniper,
    /// Mobile assassin with an immobilizing laser.
    Ninja,
    /// Heals and revives infected allies.
    Medic,
    /// Carries the objective flags.
    Hero,
    /// Slowing laser walls.
    Looper,
    /// Immobilizing laser.
    Police,
    /// Laser healer carrying a heal burst.
    Reviver,
    /// Long hook infected.
    Smoker,
    /// Jumping infected.
    Hunter,
    /// Flying infected.
    Bat,
    /// Explodes on death.
    Boomer,
    /// Invisible infected.
    Ghost,
    /// Web-hooking infected.
    Spider,
    /// Grows stronger by feeding.
    Ghoul,
    /// Leaves slime behind.
    Slug,
    /// Delays its own death.
    Voodoo,
    /// Sticky infected.
    Slime,
    /// Spawns other infected near herself.
    Witch,
    /// Cannot die for good.
    Undead,
}

impl Role {
    /// Every non-infected role that can be assigned.
    pub const HUMAN: [Role; 14] = [
        Self::Engineer,
        Self::Soldier,
        Self::Scientist,
        Self::Biologist,
        Self::Catapult,
        Self::Sciogist,
        Self::Mercenary,
        Self::Sniper,
        Self::Ninja,
        Self::Medic,
        Self::Hero,
        Self::Looper,
        Self::Police,
        Self::Reviver,
    ];

    /// Every infected role that can be assigned.
    pub const INFECTED: [Role; 12] = [
        Self::Smoker,
        Self::Hunter,
        Self::Bat,
        Self::Boomer,
        Self::Ghost,
        Self::Spider,
        Self::Ghoul,
        Self::Slug,
        Self::Voodoo,
        Self::Slime,
        Self::Witch,
        Self::Undead,
    ];

    /// Faction the role belongs to. Role-less identities count as human.
    #[must_use]
    pub fn faction(self) -> Faction {
        if Self::INFECTED.contains(&self) {
            Faction::Infected
        } else {
            Faction::Human
        }
    }

    /// Reports whether the role belongs to the infected faction.
    #[must_use]
    pub fn is_infected(self) -> bool {
        self.faction() == Faction::Infected
    }

    /// Reports whether the role is an assigned human role.
    #[must_use]
    pub fn is_human_role(self) -> bool {
        self != Self::None && self.faction() == Faction::Human
    }

    /// Population cap category for human roles.
    #[must_use]
    pub fn category(self) -> Option<RoleCategory> {
        match self {
            Self::Engineer
            | Self::Soldier
            | Self::Scientist
            | Self::Biologist
            | Self::Catapult
            | Self::Looper
            | Self::Police => Some(RoleCategory::Defender),
            Self::Mercenary | Self::Sniper | Self::Ninja => Some(RoleCategory::Support),
            Self::Medic => Some(RoleCategory::Medic),
            Self::Hero => Some(RoleCategory::Hero),
            Self::Sciogist => Some(RoleCategory::Sciogist),
            Self::Reviver => Some(RoleCategory::Reviver),
            _ => None,
        }
    }
}

/// Head counts of the in-game population.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Population {
    /// In-game identities that are not infected.
    pub humans: u32,
    /// In-game identities that are infected.
    pub infected: u32,
    /// Identities watching without playing.
    pub spectators: u32,
}

impl Population {
    /// Number of identities actively playing.
    #[must_use]
    pub const fn active(&self) -> u32 {
        self.humans + self.infected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_from_world_floors_rounded_position() {
        assert_eq!(TileCoord::from_world(Vec2::new(31.4, 0.0)), TileCoord::new(0, 0));
        assert_eq!(TileCoord::from_world(Vec2::new(31.6, 64.0)), TileCoord::new(1, 2));
        assert_eq!(TileCoord::from_world(Vec2::new(-1.0, -33.0)), TileCoord::new(-1, -2));
    }

    #[test]
    fn tile_center_sits_half_a_tile_in() {
        assert_eq!(TileCoord::new(2, 1).center(), Vec2::new(80.0, 48.0));
    }

    #[test]
    fn hit_mask_records_identities_once() {
        let mut mask = HitMask::new();
        assert!(!mask.contains(ClientId::new(3)));
        mask.insert(ClientId::new(3));
        mask.insert(ClientId::new(3));
        assert!(mask.contains(ClientId::new(3)));
        assert_eq!(mask.len(), 1);
    }

    #[test]
    fn hit_mask_treats_out_of_range_identities_as_hit() {
        let mask = HitMask::new();
        assert!(mask.contains(ClientId::new(MAX_CLIENTS as u32)));
    }

    #[test]
    fn roles_map_to_factions_and_categories() {
        assert_eq!(Role::None.faction(), Faction::Human);
        assert!(!Role::None.is_human_role());
        assert!(Role::Witch.is_infected());
        assert_eq!(Role::Police.category(), Some(RoleCategory::Defender));
        assert_eq!(Role::Ninja.category(), Some(RoleCategory::Support));
        assert_eq!(Role::Smoker.category(), None);
        assert!(Role::HUMAN.iter().all(|role| role.category().is_some()));
    }

    #[test]
    fn clock_converts_seconds_to_ticks() {
        let clock = SimClock::new(Tick::new(7), 50);
        assert_eq!(clock.seconds(0.25), 12);
        assert_eq!(clock.seconds(-1.0), 0);
        assert_eq!(clock.next().now(), Tick::new(8));
    }

    #[test]
    fn tick_elapsed_saturates() {
        assert_eq!(Tick::new(3).elapsed_since(Tick::new(10)), 0);
        assert_eq!(Tick::new(10).elapsed_since(Tick::new(3)), 7);
    }
}
