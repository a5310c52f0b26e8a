#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for the Outbreak round simulation.

mod characters;
mod entities;
mod map;

use std::{collections::BTreeMap, collections::VecDeque, f32::consts::TAU};

use glam::Vec2;
use outbreak_core::{
    CharacterView, ClientId, DamageMode, Effect, Faction, Role, RoundOutcome, SimClock, SimRng,
    Sound, SpatialQuery, Tick, Visual,
};
use outbreak_system_beam::{Beam, BeamConfig, BeamContext, BeamSpawn, RoleTuning};
use outbreak_system_flood::MapFlood;
use outbreak_system_growth_field::{FieldSpawn, GrowthConfig, GrowthEffect, GrowthField};
use outbreak_system_round::{RoundConfig, RoundMemory, RoundStateMachine, SpawnPoints, Team};
use tracing::{debug, info, warn};

pub use characters::{Character, MAX_ARMOR, MAX_HEALTH};
pub use map::{MapError, Tile, TileMap};

use crate::entities::EntityRegistry;

const HEAL_BOOM_RADIUS: u32 = 4;
const WITCH_SPAWN_DISTANCE: f32 = 64.0;
const WITCH_SPAWN_PROBES: u32 = 8;

/// Tuning for every system the world drives.
#[derive(Clone, Debug, PartialEq)]
pub struct WorldConfig {
    /// Simulation rate.
    pub ticks_per_second: u32,
    /// Seed of the shared random source.
    pub seed: u64,
    /// Round rules.
    pub round: RoundConfig,
    /// Area pulse tuning.
    pub growth: GrowthConfig,
    /// Beam travel tuning.
    pub beam: BeamConfig,
    /// Per-role beam tuning.
    pub roles: RoleTuning,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            ticks_per_second: 50,
            seed: 0,
            round: RoundConfig::default(),
            growth: GrowthConfig::default(),
            beam: BeamConfig::default(),
            roles: RoleTuning::default(),
        }
    }
}

/// Requests the world accepts from drivers.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// An identity joined or rejoined the server.
    Connect {
        /// Joining identity.
        client: ClientId,
        /// Team the identity starts on.
        team: Team,
    },
    /// An identity left the server.
    Disconnect {
        /// Leaving identity.
        client: ClientId,
    },
    /// An identity switched between playing and spectating.
    SetTeam {
        /// Identity switching.
        client: ClientId,
        /// New team.
        team: Team,
    },
    /// Places the identity's character on the map.
    Spawn {
        /// Identity spawning.
        client: ClientId,
    },
    /// Moves a character to a new position.
    MoveCharacter {
        /// Identity controlling the character.
        client: ClientId,
        /// Destination in world units.
        to: Vec2,
    },
    /// Detonates an area pulse.
    Explode {
        /// Identity credited with the pulse.
        owner: ClientId,
        /// World-space origin.
        origin: Vec2,
        /// Direction the pulse was aimed in.
        aim: Vec2,
        /// Radius in tiles.
        radius: u32,
        /// Pulse variant.
        effect: GrowthEffect,
    },
    /// Fires a beam from the owner's character.
    FireBeam {
        /// Identity firing.
        owner: ClientId,
        /// Travel direction.
        direction: Vec2,
        /// Distance budget.
        energy: f32,
        /// Damage on a plain hit.
        damage: i32,
    },
    /// Drops a short-lived cosmetic entity.
    PlaceCosmetic {
        /// World-space position.
        position: Vec2,
    },
    /// Freezes or resumes the simulation.
    SetPaused {
        /// Whether the world should be paused.
        paused: bool,
    },
    /// Ends the running round on the next tick.
    EndRound,
    /// Advances the simulation by one tick.
    Tick,
}

/// Represents the authoritative round world.
#[derive(Debug)]
pub struct World {
    map: TileMap,
    growth: GrowthConfig,
    beam: BeamConfig,
    roles: RoleTuning,
    clock: SimClock,
    rng: SimRng,
    round: RoundStateMachine,
    memory: RoundMemory,
    characters: BTreeMap<ClientId, Character>,
    entities: EntityRegistry,
    paused: bool,
    last_outcome: Option<RoundOutcome>,
}

impl World {
    /// Creates a world on the provided map.
    #[must_use]
    pub fn new(map: TileMap, config: WorldConfig) -> Self {
        let mut flood = MapFlood::from_geometry(map.width(), map.height(), &map);
        for tile in map.ignition() {
            flood.seed(*tile);
        }
        let spawns = SpawnPoints::new(
            map.human_spawns().iter().map(|tile| tile.center()).collect(),
            map.infected_spawns().iter().map(|tile| tile.center()).collect(),
        );

        Self {
            growth: config.growth,
            beam: config.beam,
            roles: config.roles,
            clock: SimClock::new(Tick::ZERO, config.ticks_per_second),
            rng: SimRng::seeded(config.seed),
            round: RoundStateMachine::new(config.round, flood, spawns),
            memory: RoundMemory::new(),
            characters: BTreeMap::new(),
            entities: EntityRegistry::default(),
            paused: false,
            last_outcome: None,
            map,
        }
    }

    fn character_view(&self) -> CharacterView {
        let roster = self.round.roster();
        let snapshots = self
            .characters
            .values()
            .map(|character| {
                let (role, previous_role) = roster
                    .get(character.client())
                    .map_or((Role::None, Role::None), |player| {
                        (player.role(), player.previous_role())
                    });
                character.snapshot(role, previous_role)
            })
            .collect();
        CharacterView::from_snapshots(snapshots)
    }

    fn spawn(&mut self, client: ClientId, out: &mut Vec<Effect>) {
        if self.round.roster().get(client).is_none() {
            warn!(client = client.get(), "spawn requested for unknown identity");
            return;
        }
        if self.characters.contains_key(&client) {
            return;
        }

        let view = self.character_view();
        let World {
            ref mut round,
            ref characters,
            ref map,
            ref mut rng,
            ..
        } = *self;
        let position = round.pre_spawn(
            client,
            &view,
            map,
            rng,
            |witch| {
                characters
                    .get(&witch)
                    .and_then(|character| beside(character.position(), map))
            },
            out,
        );

        let Some(position) = position else {
            return;
        };
        let role = self
            .round
            .roster()
            .get(client)
            .map_or(Role::None, |player| player.role());
        let _ = self
            .characters
            .insert(client, Character::spawn(client, position, role));
        out.push(Effect::Visual {
            visual: Visual::PlayerSpawn { at: position },
        });
        debug!(
            client = client.get(),
            ?role,
            x = position.x,
            y = position.y,
            "character spawned"
        );
    }

    fn kill(&mut self, target: ClientId, out: &mut Vec<Effect>) {
        if let Some(character) = self.characters.remove(&target) {
            out.push(Effect::Sound {
                at: character.position(),
                sound: Sound::PlayerDie,
            });
            out.push(Effect::Visual {
                visual: Visual::Death {
                    at: character.position(),
                    owner: target,
                },
            });
        }
    }

    fn faction_of(&self, client: ClientId) -> Option<Faction> {
        self.round
            .roster()
            .get(client)
            .map(|player| player.role().faction())
    }

    /// Self-inflicted damage is halved. Apart from `All`, no mode hurts
    /// teammates of the attacker.
    fn damage_dealt(
        &self,
        target: ClientId,
        amount: i32,
        from: Option<ClientId>,
        mode: DamageMode,
    ) -> i32 {
        if amount <= 0 {
            return 0;
        }
        let Some(attacker) = from else {
            return amount;
        };
        if attacker == target {
            return (amount / 2).max(1);
        }
        let teammates = matches!(
            (self.faction_of(attacker), self.faction_of(target)),
            (Some(a), Some(b)) if a == b
        );
        if teammates && mode != DamageMode::All {
            return 0;
        }
        amount
    }

    fn spawn_field(&mut self, spawn: FieldSpawn, out: &mut Vec<Effect>) {
        let field = GrowthField::new(self.growth, spawn, self.clock, &self.map, &mut self.rng, out);
        let _ = self.entities.insert_field(field);
    }

    /// Applies an effect to world state and collects the effects it triggers.
    fn apply_effect(&mut self, effect: &Effect, out: &mut Vec<Effect>) {
        let now = self.clock.now();
        match *effect {
            Effect::Damage {
                target,
                amount,
                from,
                mode,
                ..
            } => {
                let amount = self.damage_dealt(target, amount, from, mode);
                let died = amount > 0
                    && self
                        .characters
                        .get_mut(&target)
                        .is_some_and(|character| character.take_damage(amount));
                if died {
                    self.kill(target, out);
                }
            }
            Effect::Poison {
                target,
                amount,
                from,
            } => {
                if let Some(character) = self.characters.get_mut(&target) {
                    character.poison(amount, from, now);
                }
            }
            Effect::Immobilize {
                target, seconds, ..
            } => {
                let until = now.advance(self.clock.seconds(seconds));
                if let Some(character) = self.characters.get_mut(&target) {
                    character.freeze_until(until);
                }
            }
            Effect::Unfreeze { target } => {
                if let Some(character) = self.characters.get_mut(&target) {
                    character.unfreeze();
                }
            }
            Effect::IncreaseArmor { target, amount } => {
                if let Some(character) = self.characters.get_mut(&target) {
                    character.add_armor(amount);
                }
            }
            Effect::SetHealthArmor {
                target,
                health,
                armor,
            } => {
                if let Some(character) = self.characters.get_mut(&target) {
                    character.set_health_armor(health, armor);
                }
            }
            Effect::SetRole { target, role } => {
                if !self.round.set_role(target, role) {
                    warn!(client = target.get(), ?role, "role change for unknown identity");
                }
                if let Some(character) = self.characters.get_mut(&target) {
                    character.on_role_change(role);
                }
            }
            Effect::Eliminate { target } => self.kill(target, out),
            Effect::SpawnHealBoom { at, owner } => {
                let spawn = FieldSpawn {
                    owner,
                    origin: at,
                    aim: Vec2::ZERO,
                    radius: HEAL_BOOM_RADIUS,
                    effect: GrowthEffect::HealHumans,
                };
                self.spawn_field(spawn, out);
            }
            Effect::ConsumeHealBoom { owner } => {
                if let Some(character) = self.characters.get_mut(&owner) {
                    character.consume_heal_boom();
                }
            }
            Effect::DespawnCosmetic { entity } => self.entities.mark_destroyed(entity),
            Effect::RoundEnded { outcome } => {
                self.characters.clear();
                self.last_outcome = Some(outcome);
            }
            Effect::Love { .. }
            | Effect::Explosion { .. }
            | Effect::Sound { .. }
            | Effect::Visual { .. }
            | Effect::Emote { .. }
            | Effect::Notice { .. }
            | Effect::Score { .. }
            | Effect::RoundWinner { .. }
            | Effect::Ban { .. } => {}
        }
    }

    /// Applies queued effects in order and forwards each one to `out`.
    fn resolve(&mut self, effects: Vec<Effect>, out: &mut Vec<Effect>) {
        let mut queue = VecDeque::from(effects);
        let mut triggered = Vec::new();
        while let Some(effect) = queue.pop_front() {
            self.apply_effect(&effect, &mut triggered);
            out.push(effect);
            queue.extend(triggered.drain(..));
        }
    }

    fn step(&mut self, out: &mut Vec<Effect>) {
        let clock = self.clock;
        self.clock = clock.next();

        if self.paused {
            self.round.tick_paused();
            for (_, field) in self.entities.fields_mut() {
                field.tick_paused();
            }
            for (_, beam) in self.entities.beams_mut() {
                beam.tick_paused();
            }
            return;
        }

        let now = clock.now();
        let view = self.character_view();
        let mut pending = Vec::new();
        let outcome = self.round.tick(
            clock,
            &view,
            &mut self.memory,
            &mut self.rng,
            &mut pending,
        );

        for character in self.characters.values_mut() {
            if let Some(damage) = character.tick_poison(now, clock.ticks_per_second()) {
                pending.push(damage);
            }
        }

        let cosmetics = self.entities.cosmetics();
        let mut expired = Vec::new();
        for (id, field) in self.entities.fields_mut() {
            if field.is_expired(now) {
                expired.push(id);
                continue;
            }
            field.advance(clock, &view, &cosmetics, &mut self.rng, &mut pending);
        }

        let context = BeamContext {
            clock,
            spatial: &self.map,
            characters: &view,
            population: self.round.roster().population(),
        };
        for (id, beam) in self.entities.beams_mut() {
            beam.tick(&context, &mut pending);
            if beam.is_destroyed() {
                expired.push(id);
            }
        }

        for id in expired {
            self.entities.mark_destroyed(id);
        }
        self.resolve(pending, out);
        let removed = self.entities.sweep();
        if removed > 0 {
            debug!(tick = now.get(), removed, "entities swept");
        }
        if let Some(outcome) = outcome {
            info!(tick = now.get(), round = self.round.round_id(), ?outcome, "round finished");
        }
    }
}

fn beside(anchor: Vec2, map: &TileMap) -> Option<Vec2> {
    (0..WITCH_SPAWN_PROBES)
        .map(|probe| {
            let angle = probe as f32 * TAU / WITCH_SPAWN_PROBES as f32;
            anchor + Vec2::new(angle.cos(), angle.sin()) * WITCH_SPAWN_DISTANCE
        })
        .find(|point| !map.point_blocked(*point))
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// Every effect produced while handling the command is applied to the world
/// and then forwarded to `out_effects` in emission order.
pub fn apply(world: &mut World, command: Command, out_effects: &mut Vec<Effect>) {
    let mut pending = Vec::new();
    match command {
        Command::Connect { client, team } => {
            world
                .round
                .on_client_connect(client, team, &mut world.memory);
        }
        Command::Disconnect { client } => {
            world.round.on_client_drop(client, &mut pending);
            let _ = world.characters.remove(&client);
        }
        Command::SetTeam { client, team } => {
            world.round.set_team(client, team);
            if team == Team::Spectator {
                let _ = world.characters.remove(&client);
            }
        }
        Command::Spawn { client } => world.spawn(client, &mut pending),
        Command::MoveCharacter { client, to } => {
            let now = world.clock.now();
            let blocked = world.map.point_blocked(to);
            match world.characters.get_mut(&client) {
                Some(character) if !blocked && !character.is_frozen(now) => {
                    character.move_to(to);
                }
                Some(_) => {}
                None => warn!(client = client.get(), "move requested without a character"),
            }
        }
        Command::Explode {
            owner,
            origin,
            aim,
            radius,
            effect,
        } => {
            let spawn = FieldSpawn {
                owner,
                origin,
                aim,
                radius,
                effect,
            };
            world.spawn_field(spawn, &mut pending);
        }
        Command::FireBeam {
            owner,
            direction,
            energy,
            damage,
        } => {
            let Some(position) = world.characters.get(&owner).map(Character::position) else {
                warn!(client = owner.get(), "beam fired without a character");
                return;
            };
            let view = world.character_view();
            let context = BeamContext {
                clock: world.clock,
                spatial: &world.map,
                characters: &view,
                population: world.round.roster().population(),
            };
            let spawn = BeamSpawn {
                owner,
                position,
                direction,
                energy,
                damage,
            };
            let beam = Beam::fire(world.beam, world.roles, spawn, &context, &mut pending);
            let _ = world.entities.insert_beam(beam);
        }
        Command::PlaceCosmetic { position } => {
            let _ = world.entities.insert_cosmetic(position);
        }
        Command::SetPaused { paused } => {
            if world.paused != paused {
                info!(tick = world.clock.now().get(), paused, "pause toggled");
            }
            world.paused = paused;
        }
        Command::EndRound => world.round.request_end(),
        Command::Tick => {
            world.step(out_effects);
            return;
        }
    }
    world.resolve(pending, out_effects);
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use outbreak_core::{
        CharacterView, ClientId, CosmeticSnapshot, Population, RoundOutcome, Tick,
    };
    use outbreak_system_beam::BeamSnapshot;
    use outbreak_system_growth_field::FieldSnapshot;
    use outbreak_system_round::{Roster, RoundSnapshot};

    use super::{Character, TileMap, World};

    /// Tick the next [`super::Command::Tick`] will simulate.
    #[must_use]
    pub fn tick(world: &World) -> Tick {
        world.clock.now()
    }

    /// Reports whether the simulation is paused.
    #[must_use]
    pub fn is_paused(world: &World) -> bool {
        world.paused
    }

    /// Provides read-only access to the static map.
    #[must_use]
    pub fn map(world: &World) -> &TileMap {
        &world.map
    }

    /// Captures a read-only view of every live character.
    #[must_use]
    pub fn character_view(world: &World) -> CharacterView {
        world.character_view()
    }

    /// Character controlled by the identity, if spawned.
    #[must_use]
    pub fn character(world: &World, client: ClientId) -> Option<&Character> {
        world.characters.get(&client)
    }

    /// Connected identities and their roles.
    #[must_use]
    pub fn roster(world: &World) -> &Roster {
        world.round.roster()
    }

    /// Head counts of connected identities.
    #[must_use]
    pub fn population(world: &World) -> Population {
        world.round.roster().population()
    }

    /// Exported round state.
    #[must_use]
    pub fn round(world: &World) -> RoundSnapshot {
        world.round.snapshot()
    }

    /// Outcome of the most recently finished round.
    #[must_use]
    pub fn last_outcome(world: &World) -> Option<RoundOutcome> {
        world.last_outcome
    }

    /// Reports whether votes may currently be called.
    #[must_use]
    pub fn voting_allowed(world: &World) -> bool {
        world.round.voting_allowed()
    }

    /// Exported state of every live growth field.
    #[must_use]
    pub fn fields(world: &World) -> Vec<FieldSnapshot> {
        world
            .entities
            .fields()
            .map(|(_, field)| field.snapshot())
            .collect()
    }

    /// Exported state of every live beam.
    #[must_use]
    pub fn beams(world: &World) -> Vec<BeamSnapshot> {
        world
            .entities
            .beams()
            .filter(|(id, _)| !world.entities.is_marked(*id))
            .map(|(_, beam)| beam.snapshot())
            .collect()
    }

    /// Cosmetics still alive.
    #[must_use]
    pub fn cosmetics(world: &World) -> Vec<CosmeticSnapshot> {
        world.entities.cosmetics()
    }

    /// Number of live transient entities.
    #[must_use]
    pub fn entity_count(world: &World) -> usize {
        world.entities.len()
    }
}
