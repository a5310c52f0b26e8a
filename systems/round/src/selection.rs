//! Weighted role draws and the initial infected head count.

use outbreak_core::{Population, RandomSource, Role};

use crate::{config::RoundConfig, roster::PlayerState, roster::Roster};

/// Number of identities infected when the infection starts.
#[must_use]
pub fn first_infected_target(population: Population, ignore_spectators: bool) -> u32 {
    let base = match population.active() {
        0..=1 => 0,
        2..=3 => 1,
        4..=8 => 2,
        _ => 3,
    };
    if ignore_spectators {
        base + population.spectators
    } else {
        base
    }
}

/// A candidate role with its eligibility and draw weight.
#[derive(Clone, Copy, Debug, PartialEq)]
struct RoleRule {
    role: Role,
    eligible: bool,
    weight: f64,
}

fn draw(rules: &[RoleRule], rng: &mut impl RandomSource) -> Option<Role> {
    let weights: Vec<f64> = rules
        .iter()
        .map(|rule| if rule.eligible { rule.weight } else { 0.0 })
        .collect();
    rng.weighted_choice(&weights)
        .and_then(|index| rules.get(index))
        .map(|rule| rule.role)
}

/// Reports whether `role` is enabled and its category is under its cap.
#[must_use]
pub fn is_choosable(config: &RoundConfig, roster: &Roster, role: Role) -> bool {
    let Some(category) = role.category() else {
        return false;
    };
    let counts = roster.category_counts();
    config.enabled_roles.contains(&role)
        && counts.get(&category).copied().unwrap_or(0) < config.cap(category)
}

/// Draws a human role for `player`, avoiding the two most recent ones outside
/// fun rounds. Returns `None` when every category is full.
pub(crate) fn choose_human_role(
    config: &RoundConfig,
    roster: &Roster,
    player: &PlayerState,
    rng: &mut impl RandomSource,
) -> Option<Role> {
    let recent = player.recent_human_roles();
    let rules: Vec<RoleRule> = Role::HUMAN
        .iter()
        .map(|&role| RoleRule {
            role,
            eligible: is_choosable(config, roster, role)
                && (config.fun_round || !recent.contains(&Some(role))),
            weight: 1.0,
        })
        .collect();
    draw(&rules, rng)
}

/// Draws an infected role weighted by the configured probabilities.
pub(crate) fn choose_infected_role(
    config: &RoundConfig,
    roster: &Roster,
    rng: &mut impl RandomSource,
) -> Role {
    let infected = roster.population().infected;
    let rules: Vec<RoleRule> = Role::INFECTED
        .iter()
        .map(|&role| {
            let eligible = match role {
                Role::Ghoul => infected >= config.ghoul_threshold,
                Role::Witch | Role::Undead => infected > 2 && roster.holder_of(role).is_none(),
                _ => true,
            };
            RoleRule {
                role,
                eligible,
                weight: config.infected_weight(role),
            }
        })
        .collect();
    draw(&rules, rng).unwrap_or(Role::Smoker)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use outbreak_core::{ClientId, RoleCategory, SimRng};

    use super::*;
    use crate::roster::Team;

    fn population(active: u32, spectators: u32) -> Population {
        Population {
            humans: active,
            infected: 0,
            spectators,
        }
    }

    #[test]
    fn target_steps_with_population() {
        assert_eq!(first_infected_target(population(0, 0), false), 0);
        assert_eq!(first_infected_target(population(1, 0), false), 0);
        assert_eq!(first_infected_target(population(3, 0), false), 1);
        assert_eq!(first_infected_target(population(8, 0), false), 2);
        assert_eq!(first_infected_target(population(9, 0), false), 3);
        assert_eq!(first_infected_target(population(9, 2), false), 3);
        assert_eq!(first_infected_target(population(9, 2), true), 5);
    }

    #[test]
    fn recent_roles_are_avoided_outside_fun_rounds() {
        let config = RoundConfig {
            enabled_roles: [Role::Medic, Role::Hero].into_iter().collect(),
            ..RoundConfig::default()
        };
        let mut roster = Roster::new();
        let client = ClientId::new(0);
        roster.connect(client, Team::Game);
        let _ = roster.set_role(client, Role::Medic);
        let _ = roster.set_role(client, Role::None);
        let player = *roster.get(client).expect("connected");

        let mut rng = SimRng::seeded(4);
        for _ in 0..16 {
            assert_eq!(
                choose_human_role(&config, &roster, &player, &mut rng),
                Some(Role::Hero)
            );
        }

        let fun = RoundConfig {
            fun_round: true,
            ..config
        };
        let picks: Vec<_> = (0..64)
            .filter_map(|_| choose_human_role(&fun, &roster, &player, &mut rng))
            .collect();
        assert!(picks.contains(&Role::Medic));
    }

    #[test]
    fn full_categories_deny_assignment() {
        let config = RoundConfig {
            enabled_roles: [Role::Hero].into_iter().collect(),
            category_caps: BTreeMap::from([(RoleCategory::Hero, 1)]),
            ..RoundConfig::default()
        };
        let mut roster = Roster::new();
        roster.connect(ClientId::new(0), Team::Game);
        roster.connect(ClientId::new(1), Team::Game);
        let _ = roster.set_role(ClientId::new(0), Role::Hero);
        let player = *roster.get(ClientId::new(1)).expect("connected");

        let mut rng = SimRng::seeded(1);
        assert_eq!(choose_human_role(&config, &roster, &player, &mut rng), None);
    }

    #[test]
    fn special_infected_roles_need_a_crowd() {
        let weights = BTreeMap::from([(Role::Witch, 1.0), (Role::Ghoul, 1.0)]);
        let config = RoundConfig {
            infected_weights: weights,
            ghoul_threshold: 5,
            ..RoundConfig::default()
        };
        let mut roster = Roster::new();
        roster.connect(ClientId::new(0), Team::Game);
        let _ = roster.set_role(ClientId::new(0), Role::Bat);

        let mut rng = SimRng::seeded(8);
        assert_eq!(choose_infected_role(&config, &roster, &mut rng), Role::Smoker);

        for id in 1..=3 {
            roster.connect(ClientId::new(id), Team::Game);
            let _ = roster.set_role(ClientId::new(id), Role::Bat);
        }
        assert_eq!(choose_infected_role(&config, &roster, &mut rng), Role::Witch);

        let _ = roster.set_role(ClientId::new(3), Role::Witch);
        assert_eq!(choose_infected_role(&config, &roster, &mut rng), Role::Smoker);
    }
}
