#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Map-scale cellular automaton that burns the map at the end of a round.

use std::ops::BitOr;

use outbreak_core::{
    CharacterView, DamageMode, DenseGrid, Effect, RandomSource, Sound, SpatialQuery, TileCoord,
};
use tracing::debug;

/// Probability that a newly burning tile detonates visibly.
const DETONATION_CHANCE: f32 = 0.1;

const NEIGHBOURS: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Flag set describing a single flood tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TileFlags(u8);

impl TileFlags {
    /// Tile may still catch fire.
    pub const PASSABLE: Self = Self(1);
    /// Tile is burning; characters on it are eliminated.
    pub const BURNED: Self = Self(2);
    /// Tile is solid geometry and never burns.
    pub const STATIC_BLOCKED: Self = Self(4);
    /// Tile catches fire at the end of the current pass.
    pub const PENDING: Self = Self(8);
    /// Tile starts every flood already burning.
    pub const IGNITION: Self = Self(16);

    /// Reports whether every flag in `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Sets the flags in `other`.
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Clears the flags in `other`.
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// Raw bit representation.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for TileFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Flood state of every map tile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapFlood {
    tiles: DenseGrid<TileFlags>,
}

impl MapFlood {
    /// Creates a flood map where every tile is passable.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            tiles: DenseGrid::new(width, height, TileFlags::PASSABLE),
        }
    }

    /// Creates a flood map whose solid tiles are taken from the geometry.
    #[must_use]
    pub fn from_geometry(width: u32, height: u32, spatial: &impl SpatialQuery) -> Self {
        let tiles = DenseGrid::from_fn(width, height, |column, row| {
            let center = TileCoord::new(column as i32, row as i32).center();
            if spatial.point_blocked(center) {
                TileFlags::STATIC_BLOCKED
            } else {
                TileFlags::PASSABLE
            }
        });
        Self { tiles }
    }

    /// Number of columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.tiles.width()
    }

    /// Number of rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.tiles.height()
    }

    /// Flags of the tile, if it lies on the map.
    #[must_use]
    pub fn flags(&self, tile: TileCoord) -> Option<TileFlags> {
        self.tiles.get(tile.column(), tile.row()).copied()
    }

    /// Marks a tile as an ignition point that burns from the start of every
    /// flood. Solid or off-map tiles are ignored.
    pub fn seed(&mut self, tile: TileCoord) {
        if let Some(flags) = self.tiles.get_mut(tile.column(), tile.row()) {
            if flags.contains(TileFlags::STATIC_BLOCKED) {
                return;
            }
            *flags = TileFlags::BURNED | TileFlags::IGNITION;
        }
    }

    /// Number of tiles currently burning.
    #[must_use]
    pub fn burned_count(&self) -> usize {
        self.tiles
            .cells()
            .iter()
            .filter(|flags| flags.contains(TileFlags::BURNED))
            .count()
    }

    /// Performs one propagation pass and reports whether any tile changed.
    pub fn step_once(&mut self, rng: &mut impl RandomSource, out: &mut Vec<Effect>) -> bool {
        let width = i32::try_from(self.width()).unwrap_or(0);
        let height = i32::try_from(self.height()).unwrap_or(0);
        let mut changed = false;

        for row in 0..height {
            for column in 0..width {
                let ignites = self
                    .tiles
                    .get(column, row)
                    .is_some_and(|flags| flags.contains(TileFlags::PASSABLE))
                    && NEIGHBOURS.iter().any(|(dc, dr)| {
                        self.tiles
                            .get(column + dc, row + dr)
                            .is_some_and(|flags| flags.contains(TileFlags::BURNED))
                    });
                if !ignites {
                    continue;
                }

                if let Some(flags) = self.tiles.get_mut(column, row) {
                    flags.remove(TileFlags::PASSABLE);
                    flags.insert(TileFlags::PENDING);
                }
                changed = true;

                if rng.chance(DETONATION_CHANCE) {
                    let at = TileCoord::new(column, row).center();
                    out.push(Effect::Explosion {
                        at,
                        owner: None,
                        mode: DamageMode::Game,
                    });
                    out.push(Effect::Sound {
                        at,
                        sound: Sound::GrenadeExplode,
                    });
                }
            }
        }

        for flags in self.tiles.cells_mut() {
            if flags.contains(TileFlags::PENDING) {
                flags.remove(TileFlags::PENDING);
                flags.insert(TileFlags::BURNED);
            }
        }

        if !changed {
            debug!(burned = self.burned_count(), "flood propagation complete");
        }
        changed
    }

    /// Restores every non-solid tile. Ignition points start burning again.
    pub fn reset(&mut self) {
        for flags in self.tiles.cells_mut() {
            if flags.contains(TileFlags::STATIC_BLOCKED) {
                continue;
            }
            *flags = if flags.contains(TileFlags::IGNITION) {
                TileFlags::BURNED | TileFlags::IGNITION
            } else {
                TileFlags::PASSABLE
            };
        }
    }

    /// Eliminates every infected character standing on a burning tile.
    ///
    /// Positions outside the map are clamped to the nearest border tile.
    pub fn eliminate(&self, characters: &CharacterView, out: &mut Vec<Effect>) {
        let max_column = i32::try_from(self.width()).unwrap_or(0) - 1;
        let max_row = i32::try_from(self.height()).unwrap_or(0) - 1;
        if max_column < 0 || max_row < 0 {
            return;
        }

        for character in characters.iter() {
            if !character.role.is_infected() {
                continue;
            }
            let tile = TileCoord::from_world(character.position);
            let clamped = TileCoord::new(
                tile.column().clamp(0, max_column),
                tile.row().clamp(0, max_row),
            );
            if self
                .flags(clamped)
                .is_some_and(|flags| flags.contains(TileFlags::BURNED))
            {
                out.push(Effect::Eliminate {
                    target: character.client,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_combine_and_clear() {
        let mut flags = TileFlags::PASSABLE | TileFlags::PENDING;
        assert!(flags.contains(TileFlags::PENDING));
        flags.remove(TileFlags::PENDING);
        assert_eq!(flags, TileFlags::PASSABLE);
        assert_eq!((TileFlags::BURNED | TileFlags::IGNITION).bits(), 18);
    }

    #[test]
    fn seeding_skips_solid_and_off_map_tiles() {
        let mut flood = MapFlood::new(3, 3);
        if let Some(flags) = flood.tiles.get_mut(1, 1) {
            *flags = TileFlags::STATIC_BLOCKED;
        }
        flood.seed(TileCoord::new(1, 1));
        flood.seed(TileCoord::new(5, 5));
        assert_eq!(flood.burned_count(), 0);
        flood.seed(TileCoord::new(0, 0));
        assert_eq!(flood.burned_count(), 1);
    }

    #[test]
    fn reset_reignites_ignition_tiles() {
        let mut flood = MapFlood::new(4, 1);
        flood.seed(TileCoord::new(0, 0));
        let mut rng = outbreak_core::SimRng::seeded(1);
        let mut out = Vec::new();
        while flood.step_once(&mut rng, &mut out) {}
        assert_eq!(flood.burned_count(), 4);

        flood.reset();
        assert_eq!(flood.burned_count(), 1);
        assert_eq!(
            flood.flags(TileCoord::new(1, 0)),
            Some(TileFlags::PASSABLE)
        );
    }
}
