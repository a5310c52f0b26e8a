#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that simulates directed energy beams.
//!
//! A [`Beam`] travels in straight segments, reflects off static geometry at an
//! energy cost and terminates on the first character it touches. Terminal
//! hits dispatch on the firer's role; see [`RoleTuning`] for the knobs.

mod hit;

use glam::Vec2;
use outbreak_core::{
    CharacterView, ClientId, DamageMode, Effect, Population, Role, SimClock, Sound, SpatialQuery,
    Tick,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Travel and reflection tuning.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeamConfig {
    /// Delay between two consecutive segments, in milliseconds.
    pub bounce_delay_ms: u32,
    /// Energy deducted on every reflection on top of the travelled distance.
    pub bounce_cost: f32,
    /// Number of reflections allowed before the beam dies.
    pub max_bounces: u32,
    /// Radius of the circle a character occupies for hit tests.
    pub hit_radius: f32,
    /// Length of the probe used to reflect off a surface.
    pub probe_distance: f32,
}

impl Default for BeamConfig {
    fn default() -> Self {
        Self {
            bounce_delay_ms: 150,
            bounce_cost: 0.0,
            max_bounces: 1,
            hit_radius: 28.0,
            probe_distance: 4.0,
        }
    }
}

/// Gates and magnitudes for role-specific terminal hits.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleTuning {
    /// A medic must hold strictly more health and armor than this to revive.
    pub revive_threshold: i32,
    /// Infected population required before a medic may revive.
    pub revive_min_infected: u32,
    /// Damage a medic inflicts on itself for every revival.
    pub revive_self_damage: i32,
    /// A reviver spends its heal burst only above this infected population.
    pub heal_boom_min_infected: u32,
    /// Immobilization applied by police beams, in seconds.
    pub police_freeze_seconds: f32,
    /// Immobilization applied by ninja beams, in seconds.
    pub ninja_freeze_seconds: f32,
    /// Immobilization applied by a reviver without a heal burst, in seconds.
    pub reviver_freeze_seconds: f32,
    /// Damage dealt by a reviver without a heal burst.
    pub reviver_damage: i32,
}

impl Default for RoleTuning {
    fn default() -> Self {
        Self {
            revive_threshold: 17,
            revive_min_infected: 5,
            revive_self_damage: 34,
            heal_boom_min_infected: 5,
            police_freeze_seconds: 5.0,
            ninja_freeze_seconds: 2.0,
            reviver_freeze_seconds: 1.0,
            reviver_damage: 3,
        }
    }
}

/// Parameters describing a freshly fired beam.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BeamSpawn {
    /// Identity that fired the beam.
    pub owner: ClientId,
    /// World-space muzzle position.
    pub position: Vec2,
    /// Travel direction; normalized on fire.
    pub direction: Vec2,
    /// Distance budget shared by every segment.
    pub energy: f32,
    /// Damage dealt by a plain hit.
    pub damage: i32,
}

/// World state a beam consults while travelling.
#[derive(Debug)]
pub struct BeamContext<'a, S> {
    /// Current tick and rate.
    pub clock: SimClock,
    /// Static geometry.
    pub spatial: &'a S,
    /// Live characters.
    pub characters: &'a CharacterView,
    /// Current head counts.
    pub population: Population,
}

/// Exported view of a beam segment for external serialization.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BeamSnapshot {
    /// Identity that fired the beam.
    pub owner: ClientId,
    /// Start of the latest segment.
    pub from: Vec2,
    /// End of the latest segment.
    pub to: Vec2,
    /// Tick the latest segment was evaluated at.
    pub start_tick: Tick,
}

/// A directed energy beam that reflects off static geometry.
#[derive(Clone, Debug)]
pub struct Beam {
    config: BeamConfig,
    tuning: RoleTuning,
    owner: ClientId,
    from: Vec2,
    position: Vec2,
    direction: Vec2,
    energy: f32,
    bounces: u32,
    damage: i32,
    eval_tick: Tick,
    destroyed: bool,
}

impl Beam {
    /// Fires a beam and immediately evaluates its first segment.
    pub fn fire<S: SpatialQuery>(
        config: BeamConfig,
        tuning: RoleTuning,
        spawn: BeamSpawn,
        context: &BeamContext<'_, S>,
        out: &mut Vec<Effect>,
    ) -> Self {
        let mut beam = Self {
            config,
            tuning,
            owner: spawn.owner,
            from: spawn.position,
            position: spawn.position,
            direction: spawn.direction.normalize_or_zero(),
            energy: spawn.energy,
            bounces: 0,
            damage: spawn.damage,
            eval_tick: context.clock.now(),
            destroyed: false,
        };
        beam.do_bounce(context, out);
        beam
    }

    /// Evaluates the next segment once the inter-bounce delay has elapsed.
    pub fn tick<S: SpatialQuery>(&mut self, context: &BeamContext<'_, S>, out: &mut Vec<Effect>) {
        if self.destroyed {
            return;
        }
        let delay = u64::from(context.clock.ticks_per_second())
            * u64::from(self.config.bounce_delay_ms)
            / 1000;
        if context.clock.now() > self.eval_tick.advance(delay) {
            self.do_bounce(context, out);
        }
    }

    /// Advances the beam by one segment.
    ///
    /// A beam whose energy already went negative is destroyed instead.
    pub fn do_bounce<S: SpatialQuery>(
        &mut self,
        context: &BeamContext<'_, S>,
        out: &mut Vec<Effect>,
    ) {
        self.eval_tick = context.clock.now();
        if self.energy < 0.0 {
            self.destroyed = true;
            return;
        }

        let candidate = self.position + self.direction * self.energy;
        let geometry = context
            .spatial
            .first_intersection(self.position, candidate);
        let end = geometry.map_or(candidate, |hit| hit.before);

        if let Some((target, contact)) = context.characters.intersect(
            self.position,
            end,
            self.config.hit_radius,
            Some(self.owner),
        ) {
            self.from = self.position;
            self.position = contact;
            self.energy = -1.0;
            debug!(
                owner = self.owner.get(),
                target = target.client.get(),
                "beam struck character"
            );
            hit::resolve(self, target, context, out);
            return;
        }

        self.from = self.position;
        self.position = end;
        if geometry.is_none() {
            self.energy = -1.0;
            return;
        }

        let (probed, velocity) = context.spatial.move_point(
            end,
            self.direction * self.config.probe_distance,
            1.0,
        );
        self.position = probed;
        self.direction = velocity.normalize_or_zero();
        self.energy -= self.from.distance(self.position) + self.config.bounce_cost;
        self.bounces += 1;

        out.push(Effect::Sound {
            at: self.position,
            sound: Sound::RifleBounce,
        });
        if owner_role(self.owner, context.characters) == Role::Catapult {
            out.push(Effect::Explosion {
                at: self.position,
                owner: Some(self.owner),
                mode: DamageMode::NoInfection,
            });
        }

        if self.bounces > self.config.max_bounces {
            self.energy = -1.0;
        }
    }

    /// Shifts the evaluation reference while the simulation is paused.
    pub fn tick_paused(&mut self) {
        self.eval_tick = self.eval_tick.advance(1);
    }

    /// Reports whether the beam ran out of energy and was evaluated again.
    #[must_use]
    pub const fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Remaining distance budget. Negative once the beam is spent.
    #[must_use]
    pub const fn energy(&self) -> f32 {
        self.energy
    }

    /// Number of reflections performed so far.
    #[must_use]
    pub const fn bounces(&self) -> u32 {
        self.bounces
    }

    /// Exports the latest segment and the firing identity.
    #[must_use]
    pub fn snapshot(&self) -> BeamSnapshot {
        BeamSnapshot {
            owner: self.owner,
            from: self.from,
            to: self.position,
            start_tick: self.eval_tick,
        }
    }
}

fn owner_role(owner: ClientId, characters: &CharacterView) -> Role {
    characters
        .get(owner)
        .map_or(Role::None, |character| character.role)
}
