use glam::Vec2;
use outbreak_core::{
    CharacterSnapshot, CharacterView, ClientId, DamageMode, Effect, Notice, Population, Role,
    ScoreEvent, SimClock, Sound, SpatialQuery, Tick, Visual,
};
use outbreak_system_beam::{Beam, BeamConfig, BeamContext, BeamSpawn, RoleTuning};

const TICKS_PER_SECOND: u32 = 50;
const OWNER: ClientId = ClientId::new(1);
const TARGET: ClientId = ClientId::new(2);

struct WallAtX(f32);

impl SpatialQuery for WallAtX {
    fn point_blocked(&self, point: Vec2) -> bool {
        point.x >= self.0
    }
}

fn snapshot(client: ClientId, position: Vec2, role: Role) -> CharacterSnapshot {
    CharacterSnapshot {
        client,
        position,
        role,
        previous_role: Role::Engineer,
        health: 10,
        armor: 10,
        has_heal_boom: false,
    }
}

fn shooter(role: Role) -> CharacterSnapshot {
    snapshot(OWNER, Vec2::new(0.0, 0.0), role)
}

fn zombie() -> CharacterSnapshot {
    snapshot(TARGET, Vec2::new(60.0, 0.0), Role::Smoker)
}

fn infected(count: u32) -> Population {
    Population {
        humans: 1,
        infected: count,
        spectators: 0,
    }
}

/// Solid only between two x coordinates.
struct Slab(f32, f32);

impl SpatialQuery for Slab {
    fn point_blocked(&self, point: Vec2) -> bool {
        point.x >= self.0 && point.x <= self.1
    }
}

fn fire_at<S: SpatialQuery>(
    wall: &S,
    view: &CharacterView,
    population: Population,
    config: BeamConfig,
    energy: f32,
) -> (Beam, Vec<Effect>) {
    let context = BeamContext {
        clock: SimClock::new(Tick::new(100), TICKS_PER_SECOND),
        spatial: wall,
        characters: view,
        population,
    };
    let mut out = Vec::new();
    let beam = Beam::fire(
        config,
        RoleTuning::default(),
        BeamSpawn {
            owner: OWNER,
            position: Vec2::ZERO,
            direction: Vec2::X,
            energy,
            damage: 20,
        },
        &context,
        &mut out,
    );
    (beam, out)
}

fn hit(shooter: CharacterSnapshot, target: CharacterSnapshot, population: Population) -> Vec<Effect> {
    let view = CharacterView::from_snapshots(vec![shooter, target]);
    let (_, out) = fire_at(
        &WallAtX(1_000.0),
        &view,
        population,
        BeamConfig::default(),
        400.0,
    );
    out
}

#[test]
fn reflects_off_wall_and_loses_energy() {
    let wall = WallAtX(100.0);
    let view = CharacterView::default();
    let (mut beam, out) = fire_at(&wall, &view, Population::default(), BeamConfig::default(), 300.0);

    assert_eq!(beam.bounces(), 1);
    assert!(beam.energy() > 190.0 && beam.energy() < 205.0, "energy {}", beam.energy());
    assert!(out.iter().any(|effect| matches!(
        effect,
        Effect::Sound {
            sound: Sound::RifleBounce,
            ..
        }
    )));
    let after_first = beam.energy();

    let context = BeamContext {
        clock: SimClock::new(Tick::new(108), TICKS_PER_SECOND),
        spatial: &wall,
        characters: &view,
        population: Population::default(),
    };
    let mut out = Vec::new();
    beam.tick(&context, &mut out);
    assert!(beam.energy() < after_first);
    assert!(beam.snapshot().to.x < 0.0, "second segment travels back");
    assert!(beam.bounces() <= 1);

    let context = BeamContext {
        clock: SimClock::new(Tick::new(116), TICKS_PER_SECOND),
        ..context
    };
    beam.tick(&context, &mut out);
    assert!(beam.is_destroyed());
}

#[test]
fn energy_is_spent_up_to_the_reflected_position() {
    let slab = Slab(100.0, 101.0);
    let view = CharacterView::default();
    let (beam, _) = fire_at(&slab, &view, Population::default(), BeamConfig::default(), 300.0);

    assert_eq!(beam.bounces(), 1);
    let position = beam.snapshot().to;
    assert!(position.x > 103.0, "reflection carried the beam past the slab: {position}");
    assert!(beam.energy() > 195.0 && beam.energy() < 197.0, "energy {}", beam.energy());
}

#[test]
fn exceeding_bounce_budget_spends_energy() {
    let wall = WallAtX(100.0);
    let view = CharacterView::default();
    let config = BeamConfig {
        max_bounces: 0,
        ..BeamConfig::default()
    };
    let (beam, _) = fire_at(&wall, &view, Population::default(), config, 300.0);
    assert_eq!(beam.bounces(), 1);
    assert!(beam.energy() < 0.0);
}

#[test]
fn characters_behind_walls_are_not_hit() {
    let wall = WallAtX(100.0);
    let view = CharacterView::from_snapshots(vec![snapshot(TARGET, Vec2::new(150.0, 0.0), Role::Smoker)]);
    let (_, out) = fire_at(&wall, &view, Population::default(), BeamConfig::default(), 300.0);
    assert!(!out.iter().any(|effect| matches!(effect, Effect::Damage { .. })));
}

#[test]
fn plain_hit_damages_target_and_ends_beam() {
    let view = CharacterView::from_snapshots(vec![shooter(Role::Sniper), zombie()]);
    let (beam, out) = fire_at(&WallAtX(1_000.0), &view, infected(1), BeamConfig::default(), 400.0);

    assert_eq!(
        out,
        vec![Effect::Damage {
            target: TARGET,
            amount: 20,
            from: Some(OWNER),
            force: Vec2::ZERO,
            mode: DamageMode::NoInfection,
        }]
    );
    assert!(beam.energy() < 0.0);
    assert_eq!(beam.snapshot().to, Vec2::new(60.0, 0.0));
}

#[test]
fn medic_revive_requires_health() {
    let mut medic = shooter(Role::Medic);
    medic.health = 10;
    medic.armor = 7;
    let out = hit(medic, zombie(), infected(6));
    assert_eq!(
        out,
        vec![Effect::Notice {
            recipient: Some(OWNER),
            notice: Notice::NeedHealth { minimum: 18 },
        }]
    );
}

#[test]
fn medic_revive_requires_infected_population() {
    let out = hit(shooter(Role::Medic), zombie(), infected(4));
    assert_eq!(
        out,
        vec![Effect::Notice {
            recipient: Some(OWNER),
            notice: Notice::TooFewInfected { minimum: 5 },
        }]
    );
}

#[test]
fn medic_revive_restores_previous_role() {
    let out = hit(shooter(Role::Medic), zombie(), infected(5));
    assert!(out.contains(&Effect::SetRole {
        target: TARGET,
        role: Role::Engineer,
    }));
    assert!(out.contains(&Effect::SetHealthArmor {
        target: TARGET,
        health: 1,
        armor: 0,
    }));
    assert!(out.contains(&Effect::Damage {
        target: OWNER,
        amount: 34,
        from: Some(OWNER),
        force: Vec2::ZERO,
        mode: DamageMode::SelfHarm,
    }));
    assert!(out.contains(&Effect::Score {
        client: OWNER,
        event: ScoreEvent::MedicRevive,
    }));
}

#[test]
fn medic_ignores_human_targets() {
    let human = snapshot(TARGET, Vec2::new(60.0, 0.0), Role::Hero);
    assert!(hit(shooter(Role::Medic), human, infected(9)).is_empty());
}

#[test]
fn police_and_ninja_immobilize_for_their_durations() {
    let police = hit(shooter(Role::Police), zombie(), infected(2));
    assert!(police.contains(&Effect::Immobilize {
        target: TARGET,
        seconds: 5.0,
        from: OWNER,
    }));
    assert!(police.contains(&Effect::Sound {
        at: Vec2::new(60.0, 0.0),
        sound: Sound::PlayerPainLong,
    }));

    let ninja = hit(shooter(Role::Ninja), zombie(), infected(2));
    assert!(ninja.contains(&Effect::Immobilize {
        target: TARGET,
        seconds: 2.0,
        from: OWNER,
    }));
}

#[test]
fn police_immobilize_human_targets_too() {
    let human = snapshot(TARGET, Vec2::new(60.0, 0.0), Role::Engineer);
    let out = hit(shooter(Role::Police), human, infected(2));
    assert!(out.contains(&Effect::Immobilize {
        target: TARGET,
        seconds: 5.0,
        from: OWNER,
    }));
    assert!(out.contains(&Effect::Visual {
        visual: Visual::PlayerSpawn {
            at: Vec2::new(60.0, 0.0),
        },
    }));
}

#[test]
fn reviver_spends_heal_boom_when_charged() {
    let mut reviver = shooter(Role::Reviver);
    reviver.has_heal_boom = true;
    let patient = snapshot(TARGET, Vec2::new(60.0, 12.0), Role::Smoker);
    let out = hit(reviver, patient, infected(6));
    assert!(out.contains(&Effect::SpawnHealBoom {
        at: Vec2::new(60.0, 12.0),
        owner: OWNER,
    }));
    assert!(out.contains(&Effect::Sound {
        at: Vec2::new(60.0, 12.0),
        sound: Sound::GrenadeExplode,
    }));
    assert!(out.contains(&Effect::ConsumeHealBoom { owner: OWNER }));
    assert!(!out.iter().any(|effect| matches!(effect, Effect::Damage { .. })));
}

#[test]
fn reviver_falls_back_to_damage_and_immobilize() {
    let mut reviver = shooter(Role::Reviver);
    reviver.has_heal_boom = true;
    let out = hit(reviver, zombie(), infected(5));
    assert!(out.contains(&Effect::Damage {
        target: TARGET,
        amount: 3,
        from: Some(OWNER),
        force: Vec2::ZERO,
        mode: DamageMode::NoInfection,
    }));
    assert!(out.contains(&Effect::Immobilize {
        target: TARGET,
        seconds: 1.0,
        from: OWNER,
    }));
}

#[test]
fn catapult_detonates_at_impact() {
    let out = hit(shooter(Role::Catapult), zombie(), infected(1));
    assert!(out.contains(&Effect::Explosion {
        at: Vec2::new(60.0, 0.0),
        owner: Some(OWNER),
        mode: DamageMode::NoInfection,
    }));
    assert!(out.iter().any(|effect| matches!(effect, Effect::Damage { amount: 20, .. })));
}
