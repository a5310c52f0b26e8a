#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Round state machine: phases, fair infection, win conditions and spawns.
//!
//! [`RoundStateMachine`] owns the roster and the map flood. It is driven once
//! per tick and reports every consequence through the [`Effect`] sink; the
//! per-identity [`RoundMemory`] is passed in by the caller so it can outlive
//! connections.

mod config;
mod memory;
mod roster;
mod selection;
mod spawn;

use glam::Vec2;
use outbreak_core::{
    BanReason, CharacterView, ClientId, Effect, Emote, Faction, Notice, RandomSource, Role,
    RoleCategory, RoundOutcome, ScoreEvent, SimClock, SpatialQuery, Tick,
};
use outbreak_system_flood::MapFlood;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use config::{ConfigError, RoundConfig};
pub use memory::{RoundMemory, SessionRecord};
pub use roster::{PlayerState, Roster, Team};
pub use selection::{first_infected_target, is_choosable};
pub use spawn::SpawnPoints;

use crate::spawn::Clearance;

/// Phases a round moves through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoundPhase {
    /// Waiting for enough players.
    Warmup,
    /// Enough players joined; counting down to the infection.
    InfectionPending,
    /// The infection spreads.
    InfectionActive,
    /// The map burns.
    FloodActive,
    /// The round finished during the current tick.
    RoundEnded,
}

/// Exported round state for external serialization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundSnapshot {
    /// Current phase.
    pub phase: RoundPhase,
    /// Sequential round number.
    pub round_id: u64,
    /// Tick the round countdown started at.
    pub round_start: Tick,
    /// Number of identities infected when the infection starts.
    pub first_infected_target: u32,
    /// Role categories still under their caps.
    pub available_categories: Vec<RoleCategory>,
    /// Identity holding the witch role, if any.
    pub witch: Option<ClientId>,
}

/// Owns round phases, role assignment and the end-of-round flood.
#[derive(Clone, Debug)]
pub struct RoundStateMachine {
    config: RoundConfig,
    roster: Roster,
    flood: MapFlood,
    spawns: SpawnPoints,
    phase: RoundPhase,
    round_id: u64,
    round_start: Tick,
    infection_started: bool,
    infected_quit: bool,
    flood_started: bool,
    first_infected_target: u32,
    end_requested: bool,
}

impl RoundStateMachine {
    /// Creates a machine in warmup for the provided map.
    #[must_use]
    pub fn new(config: RoundConfig, flood: MapFlood, spawns: SpawnPoints) -> Self {
        Self {
            config,
            roster: Roster::new(),
            flood,
            spawns,
            phase: RoundPhase::Warmup,
            round_id: 0,
            round_start: Tick::ZERO,
            infection_started: false,
            infected_quit: false,
            flood_started: false,
            first_infected_target: 0,
            end_requested: false,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// Sequential round number.
    #[must_use]
    pub const fn round_id(&self) -> u64 {
        self.round_id
    }

    /// Tick the round countdown started at.
    #[must_use]
    pub const fn round_start(&self) -> Tick {
        self.round_start
    }

    /// Reports whether the initial infection already ran this round.
    #[must_use]
    pub const fn infection_started(&self) -> bool {
        self.infection_started
    }

    /// Reports whether the map is burning.
    #[must_use]
    pub const fn flood_started(&self) -> bool {
        self.flood_started
    }

    /// Number of identities infected when the infection starts.
    #[must_use]
    pub const fn first_infected_target(&self) -> u32 {
        self.first_infected_target
    }

    /// Connected identities.
    #[must_use]
    pub const fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Map flood state.
    #[must_use]
    pub const fn flood(&self) -> &MapFlood {
        &self.flood
    }

    /// Tuning in effect.
    #[must_use]
    pub const fn config(&self) -> &RoundConfig {
        &self.config
    }

    /// Votes may only be called before the infection starts.
    #[must_use]
    pub const fn voting_allowed(&self) -> bool {
        !self.infection_started
    }

    /// Registers a connecting identity, or moves it to `team`.
    pub fn on_client_connect(&mut self, client: ClientId, team: Team, memory: &mut RoundMemory) {
        self.roster.connect(client, team);
        memory.on_connect(client);
        debug!(client = client.get(), ?team, "identity joined round");
    }

    /// Moves an identity between playing and spectating.
    pub fn set_team(&mut self, client: ClientId, team: Team) {
        if self.roster.get(client).is_some() {
            self.roster.connect(client, team);
        }
    }

    /// Applies a role change requested by gameplay, such as a revival.
    ///
    /// Returns `false` when the identity is unknown.
    pub fn set_role(&mut self, client: ClientId, role: Role) -> bool {
        self.roster.set_role(client, role)
    }

    /// Ends the round on the next tick.
    pub fn request_end(&mut self) {
        self.end_requested = true;
    }

    /// Handles an identity leaving the server.
    ///
    /// The last infected leaving a running round is banned, and the initial
    /// infection is re-armed when too few infected remain.
    pub fn on_client_drop(&mut self, client: ClientId, out: &mut Vec<Effect>) {
        let Some(player) = self.roster.get(client).copied() else {
            return;
        };

        if player.in_game() && player.is_infected() && self.infection_started {
            let population = self.roster.population();
            self.first_infected_target =
                first_infected_target(population, self.config.ignore_spectators);
            if population.infected == 1 && population.humans > 0 {
                warn!(
                    client = client.get(),
                    round = self.round_id,
                    "last infected left a running round"
                );
                out.push(Effect::Ban {
                    client,
                    minutes: self.config.leaver_ban_minutes,
                    reason: BanReason::Leaver,
                });
                if population.infected <= self.first_infected_target {
                    self.infection_started = false;
                    self.infected_quit = true;
                }
            }
        }

        let _ = self.roster.disconnect(client);
    }

    /// Advances the round by one tick.
    ///
    /// Returns the outcome when the round finished during this tick.
    pub fn tick(
        &mut self,
        clock: SimClock,
        characters: &CharacterView,
        memory: &mut RoundMemory,
        rng: &mut impl RandomSource,
        out: &mut Vec<Effect>,
    ) -> Option<RoundOutcome> {
        let now = clock.now();
        if self.phase == RoundPhase::RoundEnded {
            self.begin_next_round(now, out);
        }
        self.sync_sessions(memory, out);

        if self.end_requested {
            self.end_requested = false;
            return Some(self.end_round(RoundOutcome::Requested, out));
        }

        let population = self.roster.population();
        if population.active() < self.config.min_players {
            self.round_start = now;
            self.phase = RoundPhase::Warmup;
            if self.infection_started {
                out.push(Effect::Notice {
                    recipient: None,
                    notice: Notice::WaitForPlayers,
                });
                return Some(self.end_round(RoundOutcome::TooFewPlayers, out));
            }
            return None;
        }

        let ticks_per_second = u64::from(clock.ticks_per_second());
        let delay = ticks_per_second * u64::from(self.config.infection_delay_seconds);
        let trigger = self.round_start.advance(delay);
        if now >= trigger {
            self.run_infection(now == trigger, characters, memory, rng, out);
        } else {
            self.first_infected_target =
                first_infected_target(population, self.config.ignore_spectators);
            self.phase = RoundPhase::InfectionPending;
            let spectators = self
                .roster
                .clients_where(|player| !player.in_game() && player.role() != Role::None);
            for client in spectators {
                self.assign(client, Role::None, out);
            }
        }

        let population = self.roster.population();
        let elapsed = now.elapsed_since(self.round_start);
        if self.infection_started && population.humans == 0 && population.infected > 1 {
            out.push(Effect::Notice {
                recipient: None,
                notice: Notice::InfectedWon {
                    seconds: elapsed / ticks_per_second.max(1),
                },
            });
            return Some(self.end_round(RoundOutcome::InfectedWon, out));
        }

        let limit = u64::from(self.config.time_limit_minutes) * 60 * ticks_per_second;
        if self.infection_started && !self.flood_started && limit > 0 && elapsed >= limit {
            self.start_flood(characters, out);
        }

        if self.flood_started {
            return self.step_flood(characters, rng, out);
        }
        None
    }

    /// Shifts the round countdown while the simulation is paused.
    pub fn tick_paused(&mut self) {
        self.round_start = self.round_start.advance(1);
    }

    /// Picks where an identity appears, converting it to the infected once
    /// the infection started.
    ///
    /// `witch_spawn` resolves a spawn location next to the given witch.
    pub fn pre_spawn<S: SpatialQuery>(
        &mut self,
        client: ClientId,
        characters: &CharacterView,
        spatial: &S,
        rng: &mut impl RandomSource,
        mut witch_spawn: impl FnMut(ClientId) -> Option<Vec2>,
        out: &mut Vec<Effect>,
    ) -> Option<Vec2> {
        if !self.roster.get(client)?.in_game() {
            return None;
        }
        if self.infection_started {
            self.infect(client, rng, out);
        }

        let infected = self
            .roster
            .get(client)
            .is_some_and(PlayerState::is_infected);
        if infected && self.flood_started {
            return None;
        }

        if self.infection_started && infected && rng.chance(self.config.witch_spawn_probability) {
            let witches = self.roster.clients_where(|player| {
                player.in_game()
                    && player.role() == Role::Witch
                    && player.client() != client
                    && characters.get(player.client()).is_some()
            });
            if let Some(point) = witches.into_iter().find_map(&mut witch_spawn) {
                return Some(point);
            }
        }

        let faction = if infected {
            Faction::Infected
        } else {
            Faction::Human
        };
        let points = self.spawns.for_faction(faction);
        let shift = rng.pick_index(points.len())?;
        let found = (0..points.len())
            .filter_map(|offset| points.get((offset + shift) % points.len()).copied())
            .find(|point| self.is_spawnable(*point, None, characters, spatial));
        if found.is_none() {
            debug!(client = client.get(), ?faction, "no spawn point available");
        }
        found
    }

    /// Reports whether a character may appear at `point`.
    ///
    /// The point and a ring around it must be free of geometry and of the
    /// excluded teleport zone, and no character may stand within the
    /// configured clearance.
    #[must_use]
    pub fn is_spawnable<S: SpatialQuery>(
        &self,
        point: Vec2,
        excluded_zone: Option<u32>,
        characters: &CharacterView,
        spatial: &S,
    ) -> bool {
        let clearance = Clearance {
            characters: self.config.spawn_clearance,
            border: self.config.spawn_border_radius,
        };
        spawn::is_spawnable(point, excluded_zone, clearance, characters, spatial)
    }

    /// Exports the round state and the role availability mask.
    #[must_use]
    pub fn snapshot(&self) -> RoundSnapshot {
        let counts = self.roster.category_counts();
        let available_categories = RoleCategory::ALL
            .iter()
            .copied()
            .filter(|category| {
                counts.get(category).copied().unwrap_or(0) < self.config.cap(*category)
            })
            .collect();
        RoundSnapshot {
            phase: self.phase,
            round_id: self.round_id,
            round_start: self.round_start,
            first_infected_target: self.first_infected_target,
            available_categories,
            witch: self.roster.holder_of(Role::Witch),
        }
    }

    fn assign(&mut self, client: ClientId, role: Role, out: &mut Vec<Effect>) {
        if self.roster.set_role(client, role) {
            out.push(Effect::SetRole {
                target: client,
                role,
            });
        }
    }

    fn infect(&mut self, client: ClientId, rng: &mut impl RandomSource, out: &mut Vec<Effect>) {
        if self.roster.get(client).map_or(true, PlayerState::is_infected) {
            return;
        }
        let role = selection::choose_infected_role(&self.config, &self.roster, rng);
        debug!(client = client.get(), ?role, "identity infected");
        self.assign(client, role, out);
    }

    fn sync_sessions(&mut self, memory: &mut RoundMemory, out: &mut Vec<Effect>) {
        for client in self.roster.clients_where(|_| true) {
            let current = self.roster.get(client).map_or(Role::None, PlayerState::role);
            if let Some(role) = memory.sync(client, self.round_id, self.infection_started, current)
            {
                info!(
                    client = client.get(),
                    ?role,
                    round = self.round_id,
                    "restored infected role after reconnect"
                );
                self.assign(client, role, out);
            }
        }
    }

    fn run_infection(
        &mut self,
        trigger: bool,
        characters: &CharacterView,
        memory: &mut RoundMemory,
        rng: &mut impl RandomSource,
        out: &mut Vec<Effect>,
    ) {
        let role_less = self
            .roster
            .clients_where(|player| player.in_game() && player.role() == Role::None);
        for client in role_less {
            if !trigger {
                self.infect(client, rng, out);
                continue;
            }

            let Some(player) = self.roster.get(client).copied() else {
                continue;
            };
            match selection::choose_human_role(&self.config, &self.roster, &player, rng) {
                Some(role) => {
                    debug!(client = client.get(), ?role, "human role assigned");
                    self.assign(client, role, out);
                    if characters.get(client).is_some() {
                        out.push(Effect::IncreaseArmor {
                            target: client,
                            amount: self.config.start_armor,
                        });
                    }
                }
                None => debug!(client = client.get(), "every human role category is full"),
            }
        }

        if trigger {
            for client in self.roster.clients_where(|player| !player.in_game()) {
                self.infect(client, rng, out);
            }
        }

        if !self.infection_started {
            self.run_infection_passes(memory, rng, out);
            self.infection_started = true;
            self.infected_quit = false;
            info!(
                round = self.round_id,
                infected = self.roster.population().infected,
                "infection started"
            );
        }
        if !self.flood_started {
            self.phase = RoundPhase::InfectionActive;
        }
    }

    fn needs_more_infected(&self) -> bool {
        let population = self.roster.population();
        population.humans > 1 && population.infected < self.first_infected_target
    }

    fn run_infection_passes(
        &mut self,
        memory: &mut RoundMemory,
        rng: &mut impl RandomSource,
        out: &mut Vec<Effect>,
    ) {
        let mut fair = self.roster.clients_where(|player| {
            player.in_game() && !player.is_infected() && !memory.was_infected_before(player.client())
        });
        while !fair.is_empty() && self.needs_more_infected() {
            let Some(index) = rng.pick_index(fair.len()) else {
                break;
            };
            let client = fair.remove(index);
            memory.mark_infected(client);
            self.infect_first(client, rng, out);
        }

        let mut unfair = self
            .roster
            .clients_where(|player| player.in_game() && !player.is_infected());
        while !unfair.is_empty() && self.needs_more_infected() {
            let Some(index) = rng.pick_index(unfair.len()) else {
                break;
            };
            let client = unfair.remove(index);
            self.infect_first(client, rng, out);
        }
        for client in unfair {
            memory.clear_infected(client);
        }
    }

    fn infect_first(&mut self, client: ClientId, rng: &mut impl RandomSource, out: &mut Vec<Effect>) {
        self.infect(client, rng, out);
        if self.infected_quit {
            out.push(Effect::Eliminate { target: client });
        }
        out.push(Effect::Notice {
            recipient: None,
            notice: Notice::Infected { victim: client },
        });
        info!(client = client.get(), round = self.round_id, "initial infection");
    }

    fn start_flood(&mut self, characters: &CharacterView, out: &mut Vec<Effect>) {
        for character in characters.iter() {
            let emote = if character.role.is_infected() {
                Emote::Ghost
            } else {
                Emote::Eyes
            };
            out.push(Effect::Emote {
                target: character.client,
                emote,
            });
        }
        self.flood_started = true;
        self.phase = RoundPhase::FloodActive;
        info!(round = self.round_id, "flood started");
    }

    fn step_flood(
        &mut self,
        characters: &CharacterView,
        rng: &mut impl RandomSource,
        out: &mut Vec<Effect>,
    ) -> Option<RoundOutcome> {
        let changed = self.flood.step_once(rng, out);
        self.flood.eliminate(characters, out);
        if changed {
            return None;
        }

        let survivors = self
            .roster
            .clients_where(|player| player.in_game() && !player.is_infected());
        if survivors.is_empty() {
            out.push(Effect::Notice {
                recipient: None,
                notice: Notice::InfectedWon {
                    seconds: u64::from(self.config.time_limit_minutes) * 60,
                },
            });
            return Some(self.end_round(RoundOutcome::InfectedWon, out));
        }

        let count = u32::try_from(survivors.len()).unwrap_or(u32::MAX);
        out.push(Effect::Notice {
            recipient: None,
            notice: Notice::HumansWon { survivors: count },
        });
        for client in survivors {
            out.push(Effect::Score {
                client,
                event: ScoreEvent::HumanSurvive,
            });
            out.push(Effect::RoundWinner { client });
            out.push(Effect::Notice {
                recipient: Some(client),
                notice: Notice::Survived,
            });
        }
        Some(self.end_round(RoundOutcome::HumansWon { survivors: count }, out))
    }

    fn end_round(&mut self, outcome: RoundOutcome, out: &mut Vec<Effect>) -> RoundOutcome {
        out.push(Effect::RoundEnded { outcome });
        self.infection_started = false;
        self.flood_started = false;
        self.flood.reset();
        self.phase = RoundPhase::RoundEnded;
        info!(round = self.round_id, ?outcome, "round ended");
        outcome
    }

    fn begin_next_round(&mut self, now: Tick, out: &mut Vec<Effect>) {
        self.round_id += 1;
        self.round_start = now;
        self.infected_quit = false;
        self.phase = RoundPhase::Warmup;
        let assigned = self
            .roster
            .clients_where(|player| player.role() != Role::None);
        for client in assigned {
            self.assign(client, Role::None, out);
        }
        debug!(round = self.round_id, "next round prepared");
    }
}
