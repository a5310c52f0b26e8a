//! Headless bots that drive a world through whole rounds.

use glam::Vec2;
use outbreak_core::{
    CharacterView, ClientId, Effect, Notice, RandomSource, Role, RoundOutcome, SimRng,
};
use outbreak_system_growth_field::GrowthEffect;
use outbreak_system_round::Team;
use outbreak_world::{self as world, query, Command, World};
use tracing::{debug, info};

const STEP_DISTANCE: f32 = 12.0;
const ACTION_CHANCE: f32 = 0.03;
const BEAM_ENERGY: f32 = 600.0;
const BEAM_DAMAGE: i32 = 3;

/// Built-in arena used when no map file is provided.
pub(crate) const DEFAULT_MAP: &str = "\
####################
#..................#
#.H......1.......Z.#
#..................#
#....##......##....#
#.........X........#
#....##......##....#
#..................#
#.H......2.......Z.#
#..................#
####################
";

/// Session limits and population.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct SessionOptions {
    pub(crate) seed: u64,
    pub(crate) players: u32,
    pub(crate) spectators: u32,
    pub(crate) rounds: u32,
    pub(crate) max_ticks: u64,
}

/// What happened during a session.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct SessionSummary {
    pub(crate) ticks: u64,
    pub(crate) outcomes: Vec<RoundOutcome>,
    pub(crate) infections: u32,
    pub(crate) eliminations: u32,
}

/// Action a bot takes with its role's weapon.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Weapon {
    Beam,
    Pulse(GrowthEffect, u32),
}

fn weapon_for(role: Role) -> Option<Weapon> {
    let weapon = match role {
        Role::Medic
        | Role::Police
        | Role::Ninja
        | Role::Reviver
        | Role::Catapult
        | Role::Biologist
        | Role::Sniper => Weapon::Beam,
        Role::Soldier => Weapon::Pulse(GrowthEffect::Boom, 3),
        Role::Mercenary => Weapon::Pulse(GrowthEffect::Merc, 2),
        Role::Scientist => Weapon::Pulse(GrowthEffect::Electric, 3),
        Role::Engineer => Weapon::Pulse(GrowthEffect::Freeze, 2),
        Role::Looper => Weapon::Pulse(GrowthEffect::Love, 2),
        Role::Sciogist => Weapon::Pulse(GrowthEffect::Poison, 3),
        Role::Hero => Weapon::Pulse(GrowthEffect::HealHumans, 2),
        _ => return None,
    };
    Some(weapon)
}

fn nearest_opponent(
    view: &CharacterView,
    client: ClientId,
    position: Vec2,
    infected: bool,
) -> Option<Vec2> {
    view.iter()
        .filter(|other| other.client != client && other.role.is_infected() != infected)
        .map(|other| other.position)
        .min_by(|a, b| a.distance(position).total_cmp(&b.distance(position)))
}

fn bot_commands(world: &World, script: &mut SimRng, clients: &[ClientId]) -> Vec<Command> {
    let view = query::character_view(world);
    let roster = query::roster(world);
    let mut commands = Vec::new();

    for &client in clients {
        let Some(player) = roster.get(client).filter(|player| player.in_game()) else {
            continue;
        };
        let Some(character) = view.get(client) else {
            commands.push(Command::Spawn { client });
            continue;
        };

        let angle = script.uniform01() * std::f32::consts::TAU;
        let step = Vec2::new(angle.cos(), angle.sin()) * STEP_DISTANCE;
        commands.push(Command::MoveCharacter {
            client,
            to: character.position + step,
        });

        if !script.chance(ACTION_CHANCE) {
            continue;
        }
        let aim = nearest_opponent(&view, client, character.position, player.is_infected())
            .map_or(step, |target| target - character.position);
        match weapon_for(player.role()) {
            Some(Weapon::Beam) => commands.push(Command::FireBeam {
                owner: client,
                direction: aim,
                energy: BEAM_ENERGY,
                damage: BEAM_DAMAGE,
            }),
            Some(Weapon::Pulse(effect, radius)) => commands.push(Command::Explode {
                owner: client,
                origin: character.position,
                aim,
                radius,
                effect,
            }),
            None => {}
        }
    }
    commands
}

fn record(effects: &[Effect], summary: &mut SessionSummary) {
    for effect in effects {
        match effect {
            Effect::RoundEnded { outcome } => {
                summary.outcomes.push(*outcome);
                info!(
                    round = summary.outcomes.len(),
                    tick = summary.ticks,
                    ?outcome,
                    "round over"
                );
            }
            Effect::Notice {
                notice: Notice::Infected { .. },
                ..
            } => summary.infections += 1,
            Effect::Eliminate { .. } => summary.eliminations += 1,
            _ => {}
        }
    }
}

/// Connects the bots and runs until enough rounds finished or the tick
/// budget ran out.
pub(crate) fn run(world: &mut World, options: SessionOptions) -> SessionSummary {
    let mut script = SimRng::seeded(options.seed ^ 0x5eed_b075);
    let mut summary = SessionSummary::default();
    let mut effects = Vec::new();

    let total = options.players + options.spectators;
    let clients: Vec<ClientId> = (0..total).map(ClientId::new).collect();
    for &client in &clients {
        let team = if client.get() < options.players {
            Team::Game
        } else {
            Team::Spectator
        };
        world::apply(world, Command::Connect { client, team }, &mut effects);
    }

    while summary.ticks < options.max_ticks
        && summary.outcomes.len() < usize::try_from(options.rounds).unwrap_or(usize::MAX)
    {
        effects.clear();
        for command in bot_commands(world, &mut script, &clients) {
            world::apply(world, command, &mut effects);
        }
        world::apply(world, Command::Tick, &mut effects);
        summary.ticks += 1;
        record(&effects, &mut summary);
    }

    debug!(
        ticks = summary.ticks,
        rounds = summary.outcomes.len(),
        "session finished"
    );
    summary
}

#[cfg(test)]
mod tests {
    use outbreak_system_round::RoundConfig;
    use outbreak_world::{TileMap, WorldConfig};

    use super::*;

    fn options(seed: u64) -> SessionOptions {
        SessionOptions {
            seed,
            players: 6,
            spectators: 1,
            rounds: 2,
            max_ticks: 5_000,
        }
    }

    fn world(seed: u64) -> World {
        let map = TileMap::parse(DEFAULT_MAP).expect("built-in map parses");
        let config = WorldConfig {
            ticks_per_second: 10,
            seed,
            round: RoundConfig {
                infection_delay_seconds: 3,
                time_limit_minutes: 1,
                ..RoundConfig::default()
            },
            ..WorldConfig::default()
        };
        World::new(map, config)
    }

    #[test]
    fn bots_finish_requested_rounds() {
        let summary = run(&mut world(3), options(3));
        assert_eq!(summary.outcomes.len(), 2);
        assert!(summary.infections >= 2);
        assert!(summary.ticks < 5_000);
    }

    #[test]
    fn sessions_are_deterministic() {
        let first = run(&mut world(9), options(9));
        let second = run(&mut world(9), options(9));
        assert_eq!(first, second);
    }

    #[test]
    fn every_human_role_has_a_weapon() {
        assert!(Role::HUMAN.iter().all(|role| weapon_for(*role).is_some()));
        assert!(Role::INFECTED.iter().all(|role| weapon_for(*role).is_none()));
    }
}
