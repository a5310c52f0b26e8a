//! Terminal hit dispatch keyed by the firing identity's role.

use glam::Vec2;
use outbreak_core::{
    CharacterSnapshot, DamageMode, Effect, Notice, Role, ScoreEvent, Sound, SpatialQuery, Visual,
};
use tracing::info;

use crate::{owner_role, Beam, BeamContext};

/// Consequence of a beam reaching a character.
#[derive(Clone, Copy, Debug, PartialEq)]
enum HitPolicy {
    Damage,
    Revive,
    Immobilize { seconds: f32 },
    HealBoom,
    Detonate,
}

fn hit_policy(role: Role, beam: &Beam) -> HitPolicy {
    match role {
        Role::Medic => HitPolicy::Revive,
        Role::Police => HitPolicy::Immobilize {
            seconds: beam.tuning.police_freeze_seconds,
        },
        Role::Ninja => HitPolicy::Immobilize {
            seconds: beam.tuning.ninja_freeze_seconds,
        },
        Role::Reviver => HitPolicy::HealBoom,
        Role::Catapult => HitPolicy::Detonate,
        _ => HitPolicy::Damage,
    }
}

pub(crate) fn resolve<S: SpatialQuery>(
    beam: &Beam,
    target: &CharacterSnapshot,
    context: &BeamContext<'_, S>,
    out: &mut Vec<Effect>,
) {
    match hit_policy(owner_role(beam.owner, context.characters), beam) {
        HitPolicy::Damage => damage(beam, target, beam.damage, out),
        HitPolicy::Detonate => {
            damage(beam, target, beam.damage, out);
            out.push(Effect::Explosion {
                at: beam.position,
                owner: Some(beam.owner),
                mode: DamageMode::NoInfection,
            });
        }
        HitPolicy::Immobilize { seconds } => immobilize(beam, target, seconds, out),
        HitPolicy::Revive => revive(beam, target, context, out),
        HitPolicy::HealBoom => {
            let charged = context
                .characters
                .get(beam.owner)
                .is_some_and(|owner| owner.has_heal_boom);
            if charged && context.population.infected > beam.tuning.heal_boom_min_infected {
                out.push(Effect::SpawnHealBoom {
                    at: target.position,
                    owner: beam.owner,
                });
                out.push(Effect::Sound {
                    at: target.position,
                    sound: Sound::GrenadeExplode,
                });
                out.push(Effect::ConsumeHealBoom { owner: beam.owner });
            } else {
                damage(beam, target, beam.tuning.reviver_damage, out);
                immobilize(beam, target, beam.tuning.reviver_freeze_seconds, out);
            }
        }
    }
}

fn damage(beam: &Beam, target: &CharacterSnapshot, amount: i32, out: &mut Vec<Effect>) {
    out.push(Effect::Damage {
        target: target.client,
        amount,
        from: Some(beam.owner),
        force: Vec2::ZERO,
        mode: DamageMode::NoInfection,
    });
}

fn immobilize(beam: &Beam, target: &CharacterSnapshot, seconds: f32, out: &mut Vec<Effect>) {
    out.push(Effect::Immobilize {
        target: target.client,
        seconds,
        from: beam.owner,
    });
    out.push(Effect::Sound {
        at: target.position,
        sound: Sound::PlayerPainLong,
    });
    out.push(Effect::Visual {
        visual: Visual::PlayerSpawn {
            at: target.position,
        },
    });
}

fn revive<S: SpatialQuery>(
    beam: &Beam,
    target: &CharacterSnapshot,
    context: &BeamContext<'_, S>,
    out: &mut Vec<Effect>,
) {
    if !target.role.is_infected() {
        return;
    }
    let Some(medic) = context.characters.get(beam.owner) else {
        return;
    };

    let tuning = &beam.tuning;
    if medic.health_armor_sum() <= tuning.revive_threshold {
        out.push(Effect::Notice {
            recipient: Some(beam.owner),
            notice: Notice::NeedHealth {
                minimum: tuning.revive_threshold + 1,
            },
        });
        return;
    }
    if context.population.infected < tuning.revive_min_infected {
        out.push(Effect::Notice {
            recipient: Some(beam.owner),
            notice: Notice::TooFewInfected {
                minimum: tuning.revive_min_infected,
            },
        });
        return;
    }

    info!(
        medic = beam.owner.get(),
        patient = target.client.get(),
        role = ?target.previous_role,
        "medic revived infected identity"
    );
    out.extend([
        Effect::SetRole {
            target: target.client,
            role: target.previous_role,
        },
        Effect::SetHealthArmor {
            target: target.client,
            health: 1,
            armor: 0,
        },
        Effect::Unfreeze {
            target: target.client,
        },
        Effect::Damage {
            target: beam.owner,
            amount: tuning.revive_self_damage,
            from: Some(beam.owner),
            force: Vec2::ZERO,
            mode: DamageMode::SelfHarm,
        },
        Effect::Notice {
            recipient: None,
            notice: Notice::Revived {
                medic: beam.owner,
                patient: target.client,
            },
        },
        Effect::Score {
            client: beam.owner,
            event: ScoreEvent::MedicRevive,
        },
    ]);
}
