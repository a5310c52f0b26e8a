#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that grows localized area pulses across the tile grid.
//!
//! A [`GrowthField`] claims tiles outward from a seed, one Manhattan step per
//! tick, and affects every character standing on a freshly claimed tile once.
//! The field owns its buffers exclusively and communicates only through the
//! [`Effect`] sink.

use glam::Vec2;
use outbreak_core::{
    CharacterView, ClientId, CosmeticSnapshot, DamageMode, DenseGrid, Effect, Emote, Faction,
    HitMask, RandomSource, SimClock, Sound, SpatialQuery, Tick, TileCoord, Visual, TILE_SIZE,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

const NEIGHBOURS: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Tuning shared by every growth field.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthConfig {
    /// Fraction of a second, as a divisor, during which a claimed tile stays fresh.
    pub freshness_divisor: u32,
    /// Largest aim length that still allows relocating a blocked seed.
    pub aim_tolerance: f32,
    /// Immobilization applied by freeze fields, in seconds.
    pub freeze_seconds: f32,
    /// Total damage applied by poison fields.
    pub poison_damage: i32,
    /// Damage dealt by electric fields at the end of their lifetime.
    pub electric_base_damage: i32,
    /// Extra electric damage that decays linearly over the field's lifetime.
    pub electric_falloff_damage: i32,
    /// Knockback applied by electric fields.
    pub electric_knockback: f32,
    /// Armor granted by heal fields.
    pub heal_armor: i32,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            freshness_divisor: 4,
            aim_tolerance: 1.1,
            freeze_seconds: 3.0,
            poison_damage: 8,
            electric_base_damage: 5,
            electric_falloff_damage: 20,
            electric_knockback: 10.0,
            heal_armor: 1,
        }
    }
}

/// Closed set of area pulse variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GrowthEffect {
    /// Immobilizes infected characters and clears slime.
    Freeze,
    /// Poisons infected characters.
    Poison,
    /// Grants armor to humans.
    HealHumans,
    /// Pacifies infected characters.
    Love,
    /// Detonates along the wavefront without infecting.
    Boom,
    /// Detonates along the wavefront, hurting the owner too.
    Merc,
    /// Detonates along the wavefront, hurting everyone.
    BoomAll,
    /// Arcs between tiles and shocks infected characters.
    Electric,
}

/// Cosmetic or explosive event fired when a tile is claimed.
#[derive(Clone, Copy, Debug, PartialEq)]
enum ClaimVisual {
    HammerHit,
    Death,
    Love,
    Explosion(DamageMode),
    Arc,
}

/// On-claim handler table entry.
#[derive(Clone, Copy, Debug, PartialEq)]
struct ClaimPolicy {
    probability: f32,
    visual: ClaimVisual,
    fires_on_seed: bool,
    growth_sound: Option<Sound>,
}

/// Consequence applied to a character caught by the wavefront.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TargetAction {
    Freeze,
    Poison,
    Heal,
    Love,
    Shock,
}

/// On-target-hit handler table entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct TargetPolicy {
    faction: Faction,
    action: TargetAction,
    emote: Option<Emote>,
    clears_cosmetics: bool,
}

impl GrowthEffect {
    fn claim_policy(self) -> ClaimPolicy {
        let (probability, visual, fires_on_seed, growth_sound) = match self {
            Self::Freeze => (0.1, ClaimVisual::HammerHit, true, None),
            Self::Poison => (0.1, ClaimVisual::Death, true, Some(Sound::PlayerDie)),
            Self::HealHumans => (0.1, ClaimVisual::Death, false, None),
            Self::Love => (0.2, ClaimVisual::Love, false, None),
            Self::Boom => (0.2, ClaimVisual::Explosion(DamageMode::NoInfection), false, None),
            Self::Merc => (0.2, ClaimVisual::Explosion(DamageMode::SelfHarm), false, None),
            Self::BoomAll => (0.2, ClaimVisual::Explosion(DamageMode::All), false, None),
            Self::Electric => (0.1, ClaimVisual::Arc, true, None),
        };
        ClaimPolicy {
            probability,
            visual,
            fires_on_seed,
            growth_sound,
        }
    }

    fn target_policy(self) -> Option<TargetPolicy> {
        let infected = |action, emote| TargetPolicy {
            faction: Faction::Infected,
            action,
            emote,
            clears_cosmetics: false,
        };
        match self {
            Self::Freeze => Some(TargetPolicy {
                clears_cosmetics: true,
                ..infected(TargetAction::Freeze, Some(Emote::Question))
            }),
            Self::Poison => Some(infected(TargetAction::Poison, Some(Emote::Drop))),
            Self::HealHumans => Some(TargetPolicy {
                faction: Faction::Human,
                action: TargetAction::Heal,
                emote: Some(Emote::Eyes),
                clears_cosmetics: false,
            }),
            Self::Love => Some(infected(TargetAction::Love, Some(Emote::Hearts))),
            Self::Electric => Some(infected(TargetAction::Shock, None)),
            Self::Boom | Self::Merc | Self::BoomAll => None,
        }
    }
}

/// State of a single field-local tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cell {
    /// Not yet reached by the wavefront.
    Unvisited,
    /// Permanently impassable for this field.
    Blocked,
    /// Claimed by the wavefront at the recorded tick.
    Claimed(Tick),
}

impl Cell {
    fn claimed_before(self, tick: Tick) -> bool {
        matches!(self, Self::Claimed(at) if at < tick)
    }
}

/// Parameters describing where and how a field is created.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldSpawn {
    /// Identity credited with the field's effects.
    pub owner: ClientId,
    /// World-space point where the pulse originates.
    pub origin: Vec2,
    /// Direction used to relocate a seed embedded in solid geometry.
    pub aim: Vec2,
    /// Growth distance in tiles, which is also the lifetime in ticks.
    pub radius: u32,
    /// Pulse variant.
    pub effect: GrowthEffect,
}

/// Exported view of a field for external serialization.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldSnapshot {
    /// Identity credited with the field's effects.
    pub owner: ClientId,
    /// Pulse variant.
    pub effect: GrowthEffect,
    /// World-space point where the pulse originated.
    pub origin: Vec2,
    /// Tile the wavefront grows from.
    pub seed: TileCoord,
    /// Growth distance in tiles.
    pub radius: u32,
    /// Reference tick the lifetime is measured from.
    pub start_tick: Tick,
}

/// One localized, time-stamped expansion from a seed tile.
#[derive(Clone, Debug)]
pub struct GrowthField {
    config: GrowthConfig,
    owner: ClientId,
    effect: GrowthEffect,
    origin: Vec2,
    seed: TileCoord,
    radius: u32,
    start_tick: Tick,
    cells: DenseGrid<Cell>,
    endpoints: DenseGrid<Vec2>,
    hits: HitMask,
}

impl GrowthField {
    /// Creates a field and claims its seed tile at the current tick.
    pub fn new(
        config: GrowthConfig,
        spawn: FieldSpawn,
        clock: SimClock,
        spatial: &impl SpatialQuery,
        rng: &mut impl RandomSource,
        out: &mut Vec<Effect>,
    ) -> Self {
        let seed = seed_tile(&config, spawn.origin, spawn.aim, spatial);
        let radius = spawn.radius;
        let side = radius * 2 + 1;
        let span = i32::try_from(radius).unwrap_or(i32::MAX);
        let reach = radius as f32 * TILE_SIZE;
        let seed_center = seed.center();

        let cells = DenseGrid::from_fn(side, side, |column, row| {
            let tile = seed.offset(column as i32 - span, row as i32 - span);
            let center = tile.center();
            if spatial.point_blocked(center) || center.distance(seed_center) > reach {
                Cell::Blocked
            } else {
                Cell::Unvisited
            }
        });

        let mut field = Self {
            config,
            owner: spawn.owner,
            effect: spawn.effect,
            origin: spawn.origin,
            seed,
            radius,
            start_tick: clock.now(),
            cells,
            endpoints: DenseGrid::new(side, side, Vec2::ZERO),
            hits: HitMask::new(),
        };

        if let Some(cell) = field.cells.get_mut(span, span) {
            *cell = Cell::Claimed(clock.now());
        }
        field.claim_seed(span, rng, out);

        debug!(
            owner = spawn.owner.get(),
            effect = ?spawn.effect,
            column = seed.column(),
            row = seed.row(),
            radius,
            "growth field seeded"
        );
        field
    }

    /// Performs one growth step and applies the pulse to characters and
    /// cosmetics standing on freshly claimed tiles.
    pub fn advance(
        &mut self,
        clock: SimClock,
        characters: &CharacterView,
        cosmetics: &[CosmeticSnapshot],
        rng: &mut impl RandomSource,
        out: &mut Vec<Effect>,
    ) {
        let now = clock.now();
        let side = self.side();
        let mut claimed_any = false;
        let mut sources = Vec::with_capacity(NEIGHBOURS.len());

        for row in 0..side {
            for column in 0..side {
                if self.cells.get(column, row) != Some(&Cell::Unvisited) {
                    continue;
                }

                sources.clear();
                for (dc, dr) in NEIGHBOURS {
                    let neighbour = (column + dc, row + dr);
                    if self
                        .cells
                        .get(neighbour.0, neighbour.1)
                        .is_some_and(|cell| cell.claimed_before(now))
                    {
                        sources.push(neighbour);
                    }
                }
                if sources.is_empty() {
                    continue;
                }

                if let Some(cell) = self.cells.get_mut(column, row) {
                    *cell = Cell::Claimed(now);
                }
                claimed_any = true;
                self.claim(column, row, &sources, clock, rng, out);
            }
        }

        let claim = self.effect.claim_policy();
        if claimed_any {
            if let Some(sound) = claim.growth_sound {
                if rng.chance(0.1) {
                    out.push(Effect::Sound {
                        at: self.origin,
                        sound,
                    });
                }
            }
        }

        self.affect_targets(clock, characters, cosmetics, out);
    }

    /// Reports whether the field outlived its radius.
    #[must_use]
    pub fn is_expired(&self, now: Tick) -> bool {
        now.elapsed_since(self.start_tick) > u64::from(self.radius)
    }

    /// Shifts the lifetime reference while the simulation is paused.
    pub fn tick_paused(&mut self) {
        self.start_tick = self.start_tick.advance(1);
    }

    /// State of the world tile, if it lies inside the field's bounds.
    #[must_use]
    pub fn cell_at(&self, tile: TileCoord) -> Option<Cell> {
        let (column, row) = self.local(tile)?;
        self.cells.get(column, row).copied()
    }

    /// Number of tiles claimed so far, seed included.
    #[must_use]
    pub fn claimed_count(&self) -> usize {
        self.cells
            .cells()
            .iter()
            .filter(|cell| matches!(cell, Cell::Claimed(_)))
            .count()
    }

    /// Tile the wavefront grows from.
    #[must_use]
    pub const fn seed(&self) -> TileCoord {
        self.seed
    }

    /// Exports the field's position, bounds and owner.
    #[must_use]
    pub fn snapshot(&self) -> FieldSnapshot {
        FieldSnapshot {
            owner: self.owner,
            effect: self.effect,
            origin: self.origin,
            seed: self.seed,
            radius: self.radius,
            start_tick: self.start_tick,
        }
    }

    fn side(&self) -> i32 {
        i32::try_from(self.cells.width()).unwrap_or(0)
    }

    fn span(&self) -> i32 {
        i32::try_from(self.radius).unwrap_or(i32::MAX)
    }

    fn local(&self, tile: TileCoord) -> Option<(i32, i32)> {
        let column = self.span() + tile.column() - self.seed.column();
        let row = self.span() + tile.row() - self.seed.row();
        let _ = self.cells.index(column, row)?;
        Some((column, row))
    }

    fn tile(&self, column: i32, row: i32) -> TileCoord {
        self.seed.offset(column - self.span(), row - self.span())
    }

    fn jittered(&self, column: i32, row: i32, rng: &mut impl RandomSource) -> Vec2 {
        let half = (TILE_SIZE / 2.0) as i32;
        let jitter = Vec2::new(
            rng.uniform_int(-half, half) as f32,
            rng.uniform_int(-half, half) as f32,
        );
        self.tile(column, row).center() + jitter
    }

    fn claim_seed(&mut self, span: i32, rng: &mut impl RandomSource, out: &mut Vec<Effect>) {
        let policy = self.effect.claim_policy();
        if !policy.fires_on_seed {
            return;
        }

        let center = self.seed.center();
        match policy.visual {
            ClaimVisual::Arc => {
                let endpoint = self.jittered(span, span, rng);
                if let Some(slot) = self.endpoints.get_mut(span, span) {
                    *slot = endpoint;
                }
            }
            visual => {
                if rng.chance(policy.probability) {
                    self.emit_visual(visual, center, out);
                }
            }
        }
    }

    fn claim(
        &mut self,
        column: i32,
        row: i32,
        sources: &[(i32, i32)],
        clock: SimClock,
        rng: &mut impl RandomSource,
        out: &mut Vec<Effect>,
    ) {
        let policy = self.effect.claim_policy();
        let endpoint = self.jittered(column, row, rng);

        if policy.visual != ClaimVisual::Arc {
            if rng.chance(policy.probability) {
                self.emit_visual(policy.visual, endpoint, out);
            }
            return;
        }

        if let Some(slot) = self.endpoints.get_mut(column, row) {
            *slot = endpoint;
        }
        let source = rng
            .pick_index(sources.len())
            .and_then(|index| sources.get(index))
            .and_then(|&(source_column, source_row)| {
                self.endpoints.get(source_column, source_row).copied()
            });
        if let Some(from) = source {
            out.push(Effect::Visual {
                visual: Visual::LaserDot {
                    from,
                    to: endpoint,
                    duration_ticks: u64::from(clock.ticks_per_second() / 6),
                },
            });
        }
        if rng.chance(policy.probability) {
            out.push(Effect::Sound {
                at: endpoint,
                sound: Sound::RifleBounce,
            });
        }
    }

    fn emit_visual(&self, visual: ClaimVisual, at: Vec2, out: &mut Vec<Effect>) {
        let effect = match visual {
            ClaimVisual::HammerHit => Effect::Visual {
                visual: Visual::HammerHit { at },
            },
            ClaimVisual::Death => Effect::Visual {
                visual: Visual::Death {
                    at,
                    owner: self.owner,
                },
            },
            ClaimVisual::Love => Effect::Visual {
                visual: Visual::Love { at },
            },
            ClaimVisual::Explosion(mode) => Effect::Explosion {
                at,
                owner: Some(self.owner),
                mode,
            },
            ClaimVisual::Arc => return,
        };
        out.push(effect);
    }

    fn is_fresh(&self, tile: TileCoord, clock: SimClock) -> bool {
        let window = u64::from(clock.ticks_per_second() / self.config.freshness_divisor.max(1));
        match self.cell_at(tile) {
            Some(Cell::Claimed(at)) => clock.now().elapsed_since(at) < window,
            _ => false,
        }
    }

    fn affect_targets(
        &mut self,
        clock: SimClock,
        characters: &CharacterView,
        cosmetics: &[CosmeticSnapshot],
        out: &mut Vec<Effect>,
    ) {
        let Some(policy) = self.effect.target_policy() else {
            return;
        };

        for character in characters.iter() {
            if self.hits.contains(character.client) || character.faction() != policy.faction {
                continue;
            }
            if !self.is_fresh(TileCoord::from_world(character.position), clock) {
                continue;
            }

            self.hits.insert(character.client);
            self.apply(policy.action, character.client, character.position, clock, out);
            if let Some(emote) = policy.emote {
                out.push(Effect::Emote {
                    target: character.client,
                    emote,
                });
            }
        }

        if policy.clears_cosmetics {
            for cosmetic in cosmetics {
                if self.is_fresh(TileCoord::from_world(cosmetic.position), clock) {
                    out.push(Effect::DespawnCosmetic {
                        entity: cosmetic.entity,
                    });
                }
            }
        }
    }

    fn apply(
        &self,
        action: TargetAction,
        target: ClientId,
        position: Vec2,
        clock: SimClock,
        out: &mut Vec<Effect>,
    ) {
        let effect = match action {
            TargetAction::Freeze => Effect::Immobilize {
                target,
                seconds: self.config.freeze_seconds,
                from: self.owner,
            },
            TargetAction::Poison => Effect::Poison {
                target,
                amount: self.config.poison_damage,
                from: self.owner,
            },
            TargetAction::Heal => Effect::IncreaseArmor {
                target,
                amount: self.config.heal_armor,
            },
            TargetAction::Love => Effect::Love { target },
            TargetAction::Shock => {
                let elapsed = clock.now().elapsed_since(self.start_tick);
                let direction = (position - self.seed.center()).normalize_or_zero();
                Effect::Damage {
                    target,
                    amount: self.shock_damage(elapsed),
                    from: Some(self.owner),
                    force: direction * self.config.electric_knockback,
                    mode: DamageMode::NoInfection,
                }
            }
        };
        out.push(effect);
    }

    fn shock_damage(&self, elapsed: u64) -> i32 {
        let base = self.config.electric_base_damage as f32;
        let falloff = self.config.electric_falloff_damage as f32;
        if self.radius == 0 {
            return (base + falloff) as i32;
        }
        let radius = u64::from(self.radius);
        let remaining = (radius - elapsed.min(radius)) as f32;
        (base + falloff * remaining / radius as f32) as i32
    }
}

fn seed_tile(config: &GrowthConfig, origin: Vec2, aim: Vec2, spatial: &impl SpatialQuery) -> TileCoord {
    let tile = TileCoord::from_world(origin);
    if spatial.point_blocked(tile.center()) && aim.length() <= config.aim_tolerance {
        let relocated = TileCoord::from_world(origin + aim * TILE_SIZE);
        debug!(
            from_column = tile.column(),
            from_row = tile.row(),
            to_column = relocated.column(),
            to_row = relocated.row(),
            "growth seed relocated out of solid geometry"
        );
        return relocated;
    }
    tile
}

#[cfg(test)]
mod tests {
    use super::*;
    use outbreak_core::SimRng;

    struct OpenArena;

    impl SpatialQuery for OpenArena {
        fn point_blocked(&self, _point: Vec2) -> bool {
            false
        }
    }

    fn spawn(effect: GrowthEffect, radius: u32) -> FieldSpawn {
        FieldSpawn {
            owner: ClientId::new(0),
            origin: TileCoord::new(10, 10).center(),
            aim: Vec2::ZERO,
            radius,
            effect,
        }
    }

    #[test]
    fn handler_tables_cover_lifecycle_points() {
        assert!(GrowthEffect::Boom.target_policy().is_none());
        assert_eq!(
            GrowthEffect::HealHumans.target_policy().map(|policy| policy.faction),
            Some(Faction::Human)
        );
        assert!(GrowthEffect::Freeze
            .target_policy()
            .is_some_and(|policy| policy.clears_cosmetics));
        assert!(!GrowthEffect::Poison
            .target_policy()
            .is_some_and(|policy| policy.clears_cosmetics));
        assert_eq!(
            GrowthEffect::Merc.claim_policy().visual,
            ClaimVisual::Explosion(DamageMode::SelfHarm)
        );
    }

    #[test]
    fn shock_damage_decays_with_lifetime() {
        let mut rng = SimRng::seeded(3);
        let mut out = Vec::new();
        let field = GrowthField::new(
            GrowthConfig::default(),
            spawn(GrowthEffect::Electric, 4),
            SimClock::new(Tick::ZERO, 50),
            &OpenArena,
            &mut rng,
            &mut out,
        );
        assert_eq!(field.shock_damage(0), 25);
        assert_eq!(field.shock_damage(1), 20);
        assert_eq!(field.shock_damage(2), 15);
        assert_eq!(field.shock_damage(4), 5);
        assert_eq!(field.shock_damage(9), 5);
    }

    #[test]
    fn seed_is_claimed_at_creation_tick() {
        let mut rng = SimRng::seeded(1);
        let mut out = Vec::new();
        let field = GrowthField::new(
            GrowthConfig::default(),
            spawn(GrowthEffect::Love, 3),
            SimClock::new(Tick::new(40), 50),
            &OpenArena,
            &mut rng,
            &mut out,
        );
        assert_eq!(field.cell_at(field.seed()), Some(Cell::Claimed(Tick::new(40))));
        assert_eq!(field.claimed_count(), 1);
        assert!(out.is_empty(), "love fields stay silent at creation");
    }

    #[test]
    fn pause_extends_lifetime() {
        let mut rng = SimRng::seeded(1);
        let mut out = Vec::new();
        let mut field = GrowthField::new(
            GrowthConfig::default(),
            spawn(GrowthEffect::Boom, 1),
            SimClock::new(Tick::ZERO, 50),
            &OpenArena,
            &mut rng,
            &mut out,
        );
        assert!(field.is_expired(Tick::new(2)));
        field.tick_paused();
        assert!(!field.is_expired(Tick::new(2)));
        assert!(field.is_expired(Tick::new(3)));
    }
}
