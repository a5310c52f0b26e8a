//! Live characters and the gameplay state effects act upon.

use glam::Vec2;
use outbreak_core::{CharacterSnapshot, ClientId, DamageMode, Effect, Role, Tick};

/// Health granted on spawn.
pub const MAX_HEALTH: i32 = 10;
/// Armor ceiling.
pub const MAX_ARMOR: i32 = 10;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Poison {
    remaining: i32,
    from: Option<ClientId>,
    next: Tick,
}

/// A spawned character controlled by an identity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Character {
    client: ClientId,
    position: Vec2,
    health: i32,
    armor: i32,
    has_heal_boom: bool,
    frozen_until: Option<Tick>,
    poison: Poison,
}

impl Character {
    pub(crate) fn spawn(client: ClientId, position: Vec2, role: Role) -> Self {
        Self {
            client,
            position,
            health: MAX_HEALTH,
            armor: 0,
            has_heal_boom: role == Role::Reviver,
            frozen_until: None,
            poison: Poison::default(),
        }
    }

    /// Identity controlling the character.
    #[must_use]
    pub const fn client(&self) -> ClientId {
        self.client
    }

    /// World-space position.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Remaining health.
    #[must_use]
    pub const fn health(&self) -> i32 {
        self.health
    }

    /// Remaining armor.
    #[must_use]
    pub const fn armor(&self) -> i32 {
        self.armor
    }

    /// Reports whether the heal burst charge is still available.
    #[must_use]
    pub const fn has_heal_boom(&self) -> bool {
        self.has_heal_boom
    }

    /// Reports whether the character cannot move at `now`.
    #[must_use]
    pub fn is_frozen(&self, now: Tick) -> bool {
        self.frozen_until.is_some_and(|until| now < until)
    }

    pub(crate) fn move_to(&mut self, position: Vec2) {
        self.position = position;
    }

    /// Armor absorbs damage before health. Returns `true` once the character
    /// ran out of health.
    pub(crate) fn take_damage(&mut self, amount: i32) -> bool {
        let amount = amount.max(0);
        let absorbed = amount.min(self.armor);
        self.armor -= absorbed;
        self.health -= amount - absorbed;
        self.health <= 0
    }

    pub(crate) fn add_armor(&mut self, amount: i32) {
        self.armor = (self.armor + amount).clamp(0, MAX_ARMOR);
    }

    pub(crate) fn set_health_armor(&mut self, health: i32, armor: i32) {
        self.health = health.min(MAX_HEALTH);
        self.armor = armor.clamp(0, MAX_ARMOR);
    }

    pub(crate) fn freeze_until(&mut self, until: Tick) {
        self.frozen_until = Some(self.frozen_until.map_or(until, |current| current.max(until)));
    }

    pub(crate) fn unfreeze(&mut self) {
        self.frozen_until = None;
    }

    pub(crate) fn poison(&mut self, amount: i32, from: ClientId, now: Tick) {
        if self.poison.remaining <= 0 {
            self.poison.next = now;
        }
        self.poison.remaining = self.poison.remaining.max(amount);
        self.poison.from = Some(from);
    }

    /// One point of poison damage per second while poison remains.
    pub(crate) fn tick_poison(&mut self, now: Tick, ticks_per_second: u32) -> Option<Effect> {
        if self.poison.remaining <= 0 || now < self.poison.next {
            return None;
        }
        self.poison.remaining -= 1;
        self.poison.next = now.advance(u64::from(ticks_per_second.max(1)));
        Some(Effect::Damage {
            target: self.client,
            amount: 1,
            from: self.poison.from,
            force: Vec2::ZERO,
            mode: DamageMode::NoInfection,
        })
    }

    pub(crate) fn consume_heal_boom(&mut self) {
        self.has_heal_boom = false;
    }

    pub(crate) fn on_role_change(&mut self, role: Role) {
        if role == Role::Reviver {
            self.has_heal_boom = true;
        }
    }

    pub(crate) fn snapshot(&self, role: Role, previous_role: Role) -> CharacterSnapshot {
        CharacterSnapshot {
            client: self.client,
            position: self.position,
            role,
            previous_role,
            health: self.health,
            armor: self.armor,
            has_heal_boom: self.has_heal_boom,
        }
    }
}
