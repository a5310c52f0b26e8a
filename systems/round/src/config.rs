//! Round tuning and its validation.

use std::collections::{BTreeMap, BTreeSet};

use outbreak_core::{Role, RoleCategory};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Problems detected while validating a [`RoundConfig`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// A round can never start without players.
    #[error("minimum player count must be at least one")]
    ZeroMinPlayers,
    /// The infection must be announced at least one second ahead.
    #[error("infection delay must be positive")]
    ZeroInfectionDelay,
    /// No human role could ever be assigned.
    #[error("every human role is disabled")]
    NoHumanRoles,
    /// An infected weight names a human role or carries an invalid weight.
    #[error("invalid infected weight {weight} for {role:?}")]
    InvalidWeight {
        /// Offending role.
        role: Role,
        /// Offending weight.
        weight: f64,
    },
}

/// Tuning for the round state machine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundConfig {
    /// Active players required before a round may start.
    pub min_players: u32,
    /// Seconds between the round start and the initial infection.
    pub infection_delay_seconds: u32,
    /// Minutes until the flood starts; zero disables the flood.
    pub time_limit_minutes: u32,
    /// Counts spectators towards the initial infected population.
    pub ignore_spectators: bool,
    /// Lifts the rule that avoids repeating recent human roles.
    pub fun_round: bool,
    /// Maximum number of humans per role category.
    pub category_caps: BTreeMap<RoleCategory, u32>,
    /// Human roles that may be assigned.
    pub enabled_roles: BTreeSet<Role>,
    /// Relative draw weight of every available infected role.
    pub infected_weights: BTreeMap<Role, f64>,
    /// Infected population required before ghouls appear.
    pub ghoul_threshold: u32,
    /// Minimum distance between a spawn point and any character.
    pub spawn_clearance: f32,
    /// Radius of the ring probed around a spawn point.
    pub spawn_border_radius: f32,
    /// Probability that an infected spawns next to a witch.
    pub witch_spawn_probability: f32,
    /// Armor granted to humans receiving their role at the infection trigger.
    pub start_armor: i32,
    /// Ban length for the last infected leaving a running round.
    pub leaver_ban_minutes: u32,
}

impl Default for RoundConfig {
    fn default() -> Self {
        let category_caps = BTreeMap::from([
            (RoleCategory::Defender, 4),
            (RoleCategory::Support, 4),
            (RoleCategory::Medic, 2),
            (RoleCategory::Hero, 2),
            (RoleCategory::Sciogist, 2),
            (RoleCategory::Reviver, 2),
        ]);
        let infected_weights = Role::INFECTED
            .iter()
            .map(|role| (*role, 20.0))
            .collect();

        Self {
            min_players: 2,
            infection_delay_seconds: 10,
            time_limit_minutes: 5,
            ignore_spectators: false,
            fun_round: false,
            category_caps,
            enabled_roles: Role::HUMAN.iter().copied().collect(),
            infected_weights,
            ghoul_threshold: 3,
            spawn_clearance: 60.0,
            spawn_border_radius: 30.0,
            witch_spawn_probability: 0.66,
            start_armor: 10,
            leaver_ban_minutes: 5,
        }
    }
}

impl RoundConfig {
    /// Checks the tuning for values the state machine cannot honor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_players == 0 {
            return Err(ConfigError::ZeroMinPlayers);
        }
        if self.infection_delay_seconds == 0 {
            return Err(ConfigError::ZeroInfectionDelay);
        }
        if !self.enabled_roles.iter().any(|role| role.is_human_role()) {
            return Err(ConfigError::NoHumanRoles);
        }
        for (role, weight) in &self.infected_weights {
            if !role.is_infected() || !weight.is_finite() || *weight < 0.0 {
                return Err(ConfigError::InvalidWeight {
                    role: *role,
                    weight: *weight,
                });
            }
        }
        Ok(())
    }

    /// Population cap for the category. Missing categories are closed.
    #[must_use]
    pub fn cap(&self, category: RoleCategory) -> u32 {
        self.category_caps.get(&category).copied().unwrap_or(0)
    }

    /// Draw weight of an infected role. Missing roles are unavailable.
    #[must_use]
    pub fn infected_weight(&self, role: Role) -> f64 {
        self.infected_weights.get(&role).copied().unwrap_or(0.0)
    }
}
