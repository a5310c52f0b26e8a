//! Fire-and-forget requests emitted by the simulation systems.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::{ClientId, EntityId, Role};

/// Side effects requested by systems.
///
/// Effects describe gameplay consequences (damage, status changes), cosmetic
/// or audio events, and notifications. The emitting system never observes the
/// outcome of an effect.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Deals damage to a character.
    Damage {
        /// Character receiving the damage.
        target: ClientId,
        /// Amount of health and armor removed.
        amount: i32,
        /// Identity credited with the damage, if any.
        from: Option<ClientId>,
        /// Knockback impulse applied alongside the damage.
        force: Vec2,
        /// Rules governing who may be hurt.
        mode: DamageMode,
    },
    /// Applies damage over time.
    Poison {
        /// Character being poisoned.
        target: ClientId,
        /// Total damage dealt over the poison's lifetime.
        amount: i32,
        /// Identity credited with the poison.
        from: ClientId,
    },
    /// Prevents a character from moving for a while.
    Immobilize {
        /// Character being immobilized.
        target: ClientId,
        /// Duration of the immobilization in seconds.
        seconds: f32,
        /// Identity credited with the immobilization.
        from: ClientId,
    },
    /// Lifts an active immobilization.
    Unfreeze {
        /// Character being released.
        target: ClientId,
    },
    /// Grants additional armor.
    IncreaseArmor {
        /// Character receiving the armor.
        target: ClientId,
        /// Armor points granted.
        amount: i32,
    },
    /// Applies the "love" status that pacifies an infected character.
    Love {
        /// Character receiving the status.
        target: ClientId,
    },
    /// Overwrites health and armor.
    SetHealthArmor {
        /// Character being updated.
        target: ClientId,
        /// New health value.
        health: i32,
        /// New armor value.
        armor: i32,
    },
    /// Assigns a new role to an identity.
    SetRole {
        /// Identity being updated.
        target: ClientId,
        /// Role to assign.
        role: Role,
    },
    /// Kills a character outright.
    Eliminate {
        /// Character being eliminated.
        target: ClientId,
    },
    /// Creates an explosion at a point.
    Explosion {
        /// World-space center of the explosion.
        at: Vec2,
        /// Identity credited with the explosion, if any.
        owner: Option<ClientId>,
        /// Rules governing who may be hurt.
        mode: DamageMode,
    },
    /// Plays a positional sound.
    Sound {
        /// World-space origin of the sound.
        at: Vec2,
        /// Sound to play.
        sound: Sound,
    },
    /// Shows a purely visual event.
    Visual {
        /// Event to display.
        visual: Visual,
    },
    /// Shows an emote above a character.
    Emote {
        /// Character expressing the emote.
        target: ClientId,
        /// Emote to display.
        emote: Emote,
    },
    /// Spawns a companion heal burst.
    SpawnHealBoom {
        /// World-space center of the burst.
        at: Vec2,
        /// Identity that spent the charge.
        owner: ClientId,
    },
    /// Consumes the single heal burst charge held by an identity.
    ConsumeHealBoom {
        /// Identity that spent the charge.
        owner: ClientId,
    },
    /// Removes a short-lived cosmetic entity.
    DespawnCosmetic {
        /// Entity being removed.
        entity: EntityId,
    },
    /// Delivers a textual notice.
    Notice {
        /// Recipient of the notice, or everyone when absent.
        recipient: Option<ClientId>,
        /// Notice to deliver.
        notice: Notice,
    },
    /// Records a scoring event.
    Score {
        /// Identity credited with the score.
        client: ClientId,
        /// Reason for the score.
        event: ScoreEvent,
    },
    /// Records an identity among the round winners.
    RoundWinner {
        /// Winning identity.
        client: ClientId,
    },
    /// Bans an identity for a while.
    Ban {
        /// Identity being banned.
        client: ClientId,
        /// Ban duration in minutes.
        minutes: u32,
        /// Reason for the ban.
        reason: BanReason,
    },
    /// Announces that the round finished.
    RoundEnded {
        /// How the round finished.
        outcome: RoundOutcome,
    },
}

/// Rules that decide which characters an instance of damage may hurt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageMode {
    /// Hurts characters without spreading the infection.
    NoInfection,
    /// Hurts everyone including the owner.
    SelfHarm,
    /// Hurts every character regardless of faction.
    All,
    /// Damage dealt by the game itself.
    Game,
}

/// Positional sounds requested by systems.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sound {
    /// A beam ricochet.
    RifleBounce,
    /// A character dying.
    PlayerDie,
    /// A drawn-out pain cry.
    PlayerPainLong,
    /// A grenade detonating.
    GrenadeExplode,
}

/// Visual events requested by systems.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Visual {
    /// Small impact spark.
    HammerHit {
        /// Position of the spark.
        at: Vec2,
    },
    /// Death burst.
    Death {
        /// Position of the burst.
        at: Vec2,
        /// Identity the burst is attributed to.
        owner: ClientId,
    },
    /// Floating hearts.
    Love {
        /// Position of the hearts.
        at: Vec2,
    },
    /// Spawn marker.
    PlayerSpawn {
        /// Position of the marker.
        at: Vec2,
    },
    /// Short-lived arc between two points.
    LaserDot {
        /// Start of the arc.
        from: Vec2,
        /// End of the arc.
        to: Vec2,
        /// Lifetime of the arc in ticks.
        duration_ticks: u64,
    },
}

/// Emotes shown above characters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Emote {
    /// Confusion.
    Question,
    /// Sickness.
    Drop,
    /// Affection.
    Hearts,
    /// Alertness.
    Eyes,
    /// Doom.
    Ghost,
}

/// Notices routed to players.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notice {
    /// Revival denied because the medic is too hurt.
    NeedHealth {
        /// Health and armor required.
        minimum: i32,
    },
    /// Revival denied because too few infected remain.
    TooFewInfected {
        /// Infected population required.
        minimum: u32,
    },
    /// A medic revived an infected identity.
    Revived {
        /// Medic performing the revival.
        medic: ClientId,
        /// Identity revived.
        patient: ClientId,
    },
    /// An identity was infected by the round's initial selection.
    Infected {
        /// Identity infected.
        victim: ClientId,
    },
    /// The round cannot proceed until more players join.
    WaitForPlayers,
    /// The infected faction won.
    InfectedWon {
        /// Round duration in seconds.
        seconds: u64,
    },
    /// The human faction won.
    HumansWon {
        /// Number of surviving humans.
        survivors: u32,
    },
    /// Personal notice that the recipient survived the round.
    Survived,
}

/// Scoring events recorded by the round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScoreEvent {
    /// A medic revived an infected identity.
    MedicRevive,
    /// A human survived until the end of the round.
    HumanSurvive,
}

/// Reasons an identity may be banned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BanReason {
    /// Left the round as the only infected identity.
    Leaver,
}

/// How a round finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoundOutcome {
    /// The infected faction won.
    InfectedWon,
    /// Some humans survived the flood.
    HumansWon {
        /// Number of surviving humans.
        survivors: u32,
    },
    /// The round was aborted because too few players remained.
    TooFewPlayers,
    /// The round was ended on request.
    Requested,
}
