use glam::Vec2;
use outbreak_core::{
    CharacterSnapshot, ClientId, Effect, Notice, RandomSource, RoundOutcome, SimRng,
};
use outbreak_system_growth_field::GrowthEffect;
use outbreak_system_round::{RoundConfig, Team};
use outbreak_world::{self as world, query, Command, TileMap, World, WorldConfig};

const ARENA: &str = "\
#############
#...........#
#.H.......Z.#
#...........#
#.....X.....#
#...........#
#.H.......Z.#
#...........#
#############
";

const PLAYERS: u32 = 5;
const TICKS: u32 = 900;

fn config() -> WorldConfig {
    WorldConfig {
        ticks_per_second: 10,
        seed: 0x0b7e_a4,
        round: RoundConfig {
            infection_delay_seconds: 2,
            time_limit_minutes: 1,
            ..RoundConfig::default()
        },
        ..WorldConfig::default()
    }
}

#[derive(Debug, PartialEq)]
struct ReplayOutcome {
    effects: Vec<Effect>,
    characters: Vec<CharacterSnapshot>,
    last_outcome: Option<RoundOutcome>,
}

fn replay(script_seed: u64) -> ReplayOutcome {
    let map = TileMap::parse(ARENA).expect("arena parses");
    let mut world = World::new(map, config());
    let mut script = SimRng::seeded(script_seed);
    let mut effects = Vec::new();

    for id in 0..PLAYERS {
        world::apply(
            &mut world,
            Command::Connect {
                client: ClientId::new(id),
                team: Team::Game,
            },
            &mut effects,
        );
    }

    for tick in 0..TICKS {
        for command in driver_commands(&world, &mut script, tick) {
            world::apply(&mut world, command, &mut effects);
        }
        world::apply(&mut world, Command::Tick, &mut effects);
    }

    ReplayOutcome {
        effects,
        characters: query::character_view(&world).iter().copied().collect(),
        last_outcome: query::last_outcome(&world),
    }
}

fn driver_commands(world: &World, script: &mut SimRng, tick: u32) -> Vec<Command> {
    let mut commands = Vec::new();
    for id in 0..PLAYERS {
        let client = ClientId::new(id);
        let Some(character) = query::character(world, client) else {
            commands.push(Command::Spawn { client });
            continue;
        };

        let angle = script.uniform01() * std::f32::consts::TAU;
        let step = Vec2::new(angle.cos(), angle.sin()) * 12.0;
        commands.push(Command::MoveCharacter {
            client,
            to: character.position() + step,
        });

        if script.chance(0.02) {
            commands.push(Command::FireBeam {
                owner: client,
                direction: step,
                energy: 400.0,
                damage: 3,
            });
        }
        if tick % 97 == id {
            commands.push(Command::Explode {
                owner: client,
                origin: character.position(),
                aim: step,
                radius: 3,
                effect: GrowthEffect::Poison,
            });
        }
    }
    if tick % 50 == 0 {
        commands.push(Command::PlaceCosmetic {
            position: Vec2::new(200.0, 150.0),
        });
    }
    commands
}

#[test]
fn scripted_round_replays_identically() {
    let first = replay(7);
    let second = replay(7);
    assert_eq!(first, second, "replay diverged between runs");
}

#[test]
fn scripted_round_reaches_an_outcome() {
    let outcome = replay(11);

    assert!(outcome.last_outcome.is_some());
    assert!(outcome.effects.iter().any(|effect| matches!(
        effect,
        Effect::Notice {
            notice: Notice::Infected { .. },
            ..
        }
    )));
    assert!(outcome
        .effects
        .iter()
        .any(|effect| matches!(effect, Effect::RoundEnded { .. })));
}

#[test]
fn pausing_freezes_the_round_clock() {
    let map = TileMap::parse(ARENA).expect("arena parses");
    let mut world = World::new(map, config());
    let mut effects = Vec::new();
    for id in 0..2 {
        world::apply(
            &mut world,
            Command::Connect {
                client: ClientId::new(id),
                team: Team::Game,
            },
            &mut effects,
        );
    }
    world::apply(&mut world, Command::Tick, &mut effects);
    let start = query::round(&world).round_start;

    world::apply(&mut world, Command::SetPaused { paused: true }, &mut effects);
    for _ in 0..40 {
        world::apply(&mut world, Command::Tick, &mut effects);
    }
    assert!(query::is_paused(&world));
    assert!(query::voting_allowed(&world), "infection never triggered");
    assert_eq!(query::round(&world).round_start, start.advance(40));
}
