//! Connected identities, their teams and their roles.

use std::collections::BTreeMap;

use outbreak_core::{ClientId, Population, Role, RoleCategory};
use serde::{Deserialize, Serialize};

/// Whether an identity plays or watches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    /// Plays the round.
    Game,
    /// Watches the round.
    Spectator,
}

/// Round-relevant state of a single identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlayerState {
    client: ClientId,
    team: Team,
    role: Role,
    previous_role: Role,
    recent_human_roles: [Option<Role>; 2],
}

impl PlayerState {
    fn new(client: ClientId, team: Team) -> Self {
        Self {
            client,
            team,
            role: Role::None,
            previous_role: Role::None,
            recent_human_roles: [None; 2],
        }
    }

    /// Identity of the player.
    #[must_use]
    pub const fn client(&self) -> ClientId {
        self.client
    }

    /// Team the player belongs to.
    #[must_use]
    pub const fn team(&self) -> Team {
        self.team
    }

    /// Role currently held.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Last human role held before the current infection.
    #[must_use]
    pub const fn previous_role(&self) -> Role {
        self.previous_role
    }

    /// The two most recently assigned human roles, newest first.
    #[must_use]
    pub const fn recent_human_roles(&self) -> [Option<Role>; 2] {
        self.recent_human_roles
    }

    /// Reports whether the player takes part in the round.
    #[must_use]
    pub fn in_game(&self) -> bool {
        self.team == Team::Game
    }

    /// Reports whether the player currently fights for the infected.
    #[must_use]
    pub fn is_infected(&self) -> bool {
        self.role.is_infected()
    }
}

/// Every connected identity, ordered by id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Roster {
    players: BTreeMap<ClientId, PlayerState>,
}

impl Roster {
    /// Creates an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an identity, or moves an existing one to `team`.
    pub fn connect(&mut self, client: ClientId, team: Team) {
        let _ = self
            .players
            .entry(client)
            .and_modify(|player| player.team = team)
            .or_insert_with(|| PlayerState::new(client, team));
    }

    /// Removes an identity and returns its last state.
    pub fn disconnect(&mut self, client: ClientId) -> Option<PlayerState> {
        self.players.remove(&client)
    }

    /// State of the identity, if connected.
    #[must_use]
    pub fn get(&self, client: ClientId) -> Option<&PlayerState> {
        self.players.get(&client)
    }

    /// Iterator over every connected identity in id order.
    pub fn iter(&self) -> impl Iterator<Item = &PlayerState> {
        self.players.values()
    }

    /// Identities matching `filter`, in id order.
    #[must_use]
    pub fn clients_where(&self, filter: impl Fn(&PlayerState) -> bool) -> Vec<ClientId> {
        self.players
            .values()
            .filter(|player| filter(player))
            .map(|player| player.client)
            .collect()
    }

    /// Assigns a role and keeps the role history up to date.
    ///
    /// Returns `false` when the identity is unknown.
    pub fn set_role(&mut self, client: ClientId, role: Role) -> bool {
        let Some(player) = self.players.get_mut(&client) else {
            return false;
        };
        if role.is_infected() && player.role.is_human_role() {
            player.previous_role = player.role;
        }
        if role.is_human_role() && player.role != role {
            player.recent_human_roles = [Some(role), player.recent_human_roles[0]];
        }
        player.role = role;
        true
    }

    /// Head counts of the connected identities.
    #[must_use]
    pub fn population(&self) -> Population {
        let mut population = Population::default();
        for player in self.players.values() {
            match (player.team, player.is_infected()) {
                (Team::Spectator, _) => population.spectators += 1,
                (Team::Game, true) => population.infected += 1,
                (Team::Game, false) => population.humans += 1,
            }
        }
        population
    }

    /// In-game humans per role category.
    #[must_use]
    pub fn category_counts(&self) -> BTreeMap<RoleCategory, u32> {
        let mut counts = BTreeMap::new();
        for player in self.players.values().filter(|player| player.in_game()) {
            if let Some(category) = player.role.category() {
                *counts.entry(category).or_insert(0) += 1;
            }
        }
        counts
    }

    /// In-game identity holding `role`, if any.
    #[must_use]
    pub fn holder_of(&self, role: Role) -> Option<ClientId> {
        self.players
            .values()
            .find(|player| player.in_game() && player.role == role)
            .map(|player| player.client)
    }

    /// Number of connected identities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Reports whether nobody is connected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
