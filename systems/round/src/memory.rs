//! Per-identity memory that outlives a connection.

use std::collections::{BTreeMap, BTreeSet};

use outbreak_core::{ClientId, Role};

/// Role an identity held in a given round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionRecord {
    round_id: Option<u64>,
    role: Role,
    processed: bool,
}

impl SessionRecord {
    /// Round the role was recorded in.
    #[must_use]
    pub const fn round_id(&self) -> Option<u64> {
        self.round_id
    }

    /// Role held at the last update.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }
}

/// Memory of every identity seen by the server, keyed by identity.
///
/// Tracks the role held in the current round, so reconnecting cannot shed an
/// infection, and which identities were fairly infected in the previous round.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoundMemory {
    sessions: BTreeMap<ClientId, SessionRecord>,
    infected_before: BTreeSet<ClientId>,
}

impl RoundMemory {
    /// Creates an empty memory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the identity's session as not yet reconciled with the round.
    pub fn on_connect(&mut self, client: ClientId) {
        self.sessions
            .entry(client)
            .or_insert(SessionRecord {
                round_id: None,
                role: Role::None,
                processed: false,
            })
            .processed = false;
    }

    /// Session recorded for the identity.
    #[must_use]
    pub fn session(&self, client: ClientId) -> Option<&SessionRecord> {
        self.sessions.get(&client)
    }

    /// Reconciles the session with the live role.
    ///
    /// Returns the infected role to restore when the identity reconnected in
    /// the same round after being infected.
    pub fn sync(
        &mut self,
        client: ClientId,
        round_id: u64,
        infection_started: bool,
        current_role: Role,
    ) -> Option<Role> {
        let record = self.sessions.entry(client).or_insert(SessionRecord {
            round_id: None,
            role: Role::None,
            processed: true,
        });

        let mut restored = None;
        if !record.processed {
            if infection_started && record.round_id == Some(round_id) && record.role.is_infected()
            {
                restored = Some(record.role);
            }
            record.processed = true;
        }

        record.role = restored.unwrap_or(current_role);
        record.round_id = Some(round_id);
        restored
    }

    /// Reports whether the identity was fairly infected last time.
    #[must_use]
    pub fn was_infected_before(&self, client: ClientId) -> bool {
        self.infected_before.contains(&client)
    }

    /// Records that the identity was fairly infected.
    pub fn mark_infected(&mut self, client: ClientId) {
        let _ = self.infected_before.insert(client);
    }

    /// Makes the identity eligible for the fair pass again.
    pub fn clear_infected(&mut self, client: ClientId) {
        let _ = self.infected_before.remove(&client);
    }
}
