//! Static tile geometry parsed from ASCII rows.

use std::str::FromStr;

use glam::Vec2;
use outbreak_core::{DenseGrid, SpatialQuery, TileCoord};
use thiserror::Error;

/// Static contents of a single tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tile {
    /// Walkable floor.
    Open,
    /// Solid geometry.
    Solid,
    /// Walkable floor tagged with a teleport zone.
    Zone(u32),
}

/// Failures raised while parsing a map.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapError {
    /// The map contains no rows.
    #[error("map contains no rows")]
    Empty,
    /// A row differs in length from the first row.
    #[error("row {row} has {found} tiles, expected {expected}")]
    RaggedRow {
        /// Zero-based row index.
        row: usize,
        /// Length of the first row.
        expected: usize,
        /// Length of the offending row.
        found: usize,
    },
    /// A glyph outside the map alphabet.
    #[error("unknown glyph {glyph:?} at column {column}, row {row}")]
    UnknownGlyph {
        /// Offending character.
        glyph: char,
        /// Zero-based column index.
        column: usize,
        /// Zero-based row index.
        row: usize,
    },
}

/// Tile map together with the markers placed on it.
#[derive(Clone, Debug, PartialEq)]
pub struct TileMap {
    tiles: DenseGrid<Tile>,
    human_spawns: Vec<TileCoord>,
    infected_spawns: Vec<TileCoord>,
    ignition: Vec<TileCoord>,
}

impl TileMap {
    /// Parses ASCII rows.
    ///
    /// `#` is solid, `.` is open, `H` and `Z` are human and infected spawns,
    /// `X` marks a flood ignition tile and `1` to `9` tag open tiles with a
    /// teleport zone. Blank lines are ignored.
    pub fn parse(text: &str) -> Result<Self, MapError> {
        let rows: Vec<Vec<char>> = text
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .map(|line| line.chars().collect())
            .collect();
        let width = rows.first().map(Vec::len).ok_or(MapError::Empty)?;

        let mut glyphs = Vec::with_capacity(width * rows.len());
        let mut human_spawns = Vec::new();
        let mut infected_spawns = Vec::new();
        let mut ignition = Vec::new();
        for (row, line) in rows.iter().enumerate() {
            if line.len() != width {
                return Err(MapError::RaggedRow {
                    row,
                    expected: width,
                    found: line.len(),
                });
            }
            for (column, &glyph) in line.iter().enumerate() {
                let coord = TileCoord::new(column as i32, row as i32);
                let tile = match glyph {
                    '#' => Tile::Solid,
                    '.' => Tile::Open,
                    'H' => {
                        human_spawns.push(coord);
                        Tile::Open
                    }
                    'Z' => {
                        infected_spawns.push(coord);
                        Tile::Open
                    }
                    'X' => {
                        ignition.push(coord);
                        Tile::Open
                    }
                    '1'..='9' => Tile::Zone(glyph.to_digit(10).unwrap_or(0)),
                    _ => {
                        return Err(MapError::UnknownGlyph { glyph, column, row });
                    }
                };
                glyphs.push(tile);
            }
        }

        let width = u32::try_from(width).unwrap_or(u32::MAX);
        let height = u32::try_from(rows.len()).unwrap_or(u32::MAX);
        let mut cells = glyphs.into_iter();
        let tiles = DenseGrid::from_fn(width, height, |_, _| cells.next().unwrap_or(Tile::Solid));
        Ok(Self {
            tiles,
            human_spawns,
            infected_spawns,
            ignition,
        })
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

    /// Tile at the coordinate, if it lies on the map.
    #[must_use]
    pub fn tile(&self, coord: TileCoord) -> Option<Tile> {
        self.tiles.get(coord.column(), coord.row()).copied()
    }

    /// Tiles marked as human spawns, in reading order.
    #[must_use]
    pub fn human_spawns(&self) -> &[TileCoord] {
        &self.human_spawns
    }

    /// Tiles marked as infected spawns, in reading order.
    #[must_use]
    pub fn infected_spawns(&self) -> &[TileCoord] {
        &self.infected_spawns
    }

    /// Tiles the end-of-round flood ignites from.
    #[must_use]
    pub fn ignition(&self) -> &[TileCoord] {
        &self.ignition
    }
}

impl FromStr for TileMap {
    type Err = MapError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::parse(text)
    }
}

impl SpatialQuery for TileMap {
    fn point_blocked(&self, point: Vec2) -> bool {
        let tile = TileCoord::from_world(point);
        !matches!(self.tile(tile), Some(Tile::Open | Tile::Zone(_)))
    }

    fn zone_at(&self, point: Vec2) -> Option<u32> {
        match self.tile(TileCoord::from_world(point)) {
            Some(Tile::Zone(zone)) => Some(zone),
            _ => None,
        }
    }
}
