#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Horde survival simulation.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters and systems submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! for systems to react to deterministically. Systems consume event streams,
//! query immutable snapshots such as [`AgentView`], and respond exclusively
//! with new command batches.
//!
//! The physics engine is an external collaborator reached through the
//! [`physics::PhysicsQuery`] and [`physics::PhysicsPort`] traits.

pub mod physics;

use std::{fmt, str::FromStr, time::Duration};

use glam::Vec3;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::physics::BodyHandle;

/// Number of agent slots allocated by a default pool.
pub const MAX_POOL_SIZE: usize = 50;

/// Location dead agents are parked at, far below the playable arena.
pub const OFF_MAP_POSITION: Vec3 = Vec3::new(0.0, -1_000.0, 0.0);

/// Duration of the cosmetic hit flash applied after an agent takes damage.
pub const HIT_FLASH_DURATION: Duration = Duration::from_millis(150);

/// Cooldown between attacks for enemy types without an override.
pub const DEFAULT_ATTACK_COOLDOWN: Duration = Duration::from_secs(2);

/// Damage dealt per attack by enemy types without a damage range.
pub const DEFAULT_ATTACK_DAMAGE: u32 = 10;

/// Health the player starts every run with.
pub const DEFAULT_PLAYER_HEALTH: u32 = 100;

/// Label of the random stream that samples spawn-point candidates.
pub const RNG_STREAM_SPAWN_POINTS: &str = "spawn-points";

/// Label of the random stream that draws enemy types from wave weights.
pub const RNG_STREAM_WAVE_MIX: &str = "wave-mix";

/// Label of the random stream that rolls attack damage.
pub const RNG_STREAM_ATTACK_DAMAGE: &str = "attack-damage";

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Marks the beginning of a game session so waves may be scheduled.
    StartSession,
    /// Returns the run to its pre-session state, recycling every agent.
    ResetRun,
    /// Updates the authoritative player position.
    MovePlayer {
        /// New player position in world units.
        position: Vec3,
    },
    /// Requests that a wave enter the spawning state.
    StartWave {
        /// One-based number of the wave being started.
        wave: WaveNumber,
        /// Number of agents the wave intends to spawn.
        total: u32,
    },
    /// Requests the `Spawning -> Active` transition once a wave was fully issued.
    FinishSpawning,
    /// Requests the `Active -> BetweenWaves` transition once a wave was cleared.
    ClearWave,
    /// Broadcasts the remaining seconds before the next wave begins.
    AnnounceCountdown {
        /// Number of the wave that will start when the countdown ends.
        next_wave: WaveNumber,
        /// Whole seconds left on the countdown.
        seconds_remaining: u32,
    },
    /// Declares the run won because the wave table was exhausted.
    DeclareVictory,
    /// Requests that a pooled agent be brought to life at the provided point.
    SpawnAgent {
        /// Enemy type to assign to the agent.
        kind: EnemyKind,
        /// Ground position the agent's feet are placed at.
        position: Vec3,
    },
    /// Applies damage to a live agent.
    DamageAgent {
        /// Identifier of the agent being damaged.
        agent: AgentId,
        /// Amount of health removed.
        amount: u32,
    },
    /// Forces an agent back into the pool without a kill being scored.
    ReleaseAgent {
        /// Identifier of the agent being released.
        agent: AgentId,
    },
    /// Writes a steering decision to an agent's physics body.
    SteerAgent {
        /// Identifier of the steered agent.
        agent: AgentId,
        /// Desired velocity whose vertical component is ignored; `None` leaves
        /// the body's velocity untouched for this tick.
        velocity: Option<Vec3>,
        /// Facing angle around the vertical axis in radians.
        yaw: f32,
    },
    /// Applies an instantaneous impulse to an agent's physics body.
    ImpulseAgent {
        /// Identifier of the agent receiving the impulse.
        agent: AgentId,
        /// Impulse vector in world units.
        impulse: Vec3,
    },
    /// Applies damage dealt by an agent to the player.
    DamagePlayer {
        /// Agent that performed the attack.
        agent: AgentId,
        /// Amount of health removed from the player.
        amount: u32,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Announces that a game session began.
    SessionStarted,
    /// Announces that the run was reset and every agent recycled.
    RunReset,
    /// Announces that a wave began spawning.
    WaveStarted {
        /// Number of the wave that started.
        wave: WaveNumber,
        /// Number of agents the wave intends to spawn.
        total: u32,
    },
    /// Reports every accepted wave state transition.
    WaveStatusChanged {
        /// Wave the transition belongs to.
        wave: WaveNumber,
        /// State left by the transition.
        from: WaveStatus,
        /// State entered by the transition.
        to: WaveStatus,
    },
    /// Reports a wave transition that the current state does not allow.
    WaveTransitionRejected {
        /// State the rejected command attempted to enter.
        requested: WaveStatus,
        /// State the world remained in.
        current: WaveStatus,
    },
    /// Announces that every agent of a wave died.
    WaveCleared {
        /// Number of the cleared wave.
        wave: WaveNumber,
    },
    /// Presentation notification for the between-waves countdown.
    CountdownTick {
        /// Number of the wave that starts when the countdown ends.
        next_wave: WaveNumber,
        /// Whole seconds left on the countdown.
        seconds_remaining: u32,
    },
    /// Announces that the final configured wave was cleared.
    AllWavesCompleted {
        /// Number of waves that were cleared during the run.
        waves: u32,
    },
    /// Confirms that a pooled agent came to life.
    AgentSpawned {
        /// Stable identifier of the slot that was acquired.
        agent: AgentId,
        /// Enemy type assigned to the agent.
        kind: EnemyKind,
        /// Ground position the agent spawned at.
        position: Vec3,
    },
    /// Reports that a spawn request could not be honoured.
    AgentSpawnRejected {
        /// Enemy type that was requested.
        kind: EnemyKind,
        /// Specific reason the spawn failed.
        reason: SpawnRejection,
    },
    /// Reports damage applied to an agent that is still alive.
    AgentHit {
        /// Identifier of the damaged agent.
        agent: AgentId,
        /// Damage that was applied.
        amount: u32,
        /// Health left after the hit.
        remaining: u32,
    },
    /// Reports that an agent's health reached zero.
    AgentDied {
        /// Identifier of the agent that died.
        agent: AgentId,
        /// Enemy type of the agent that died.
        kind: EnemyKind,
    },
    /// Reports that a live agent was returned to the pool without a kill.
    AgentReleased {
        /// Identifier of the released agent.
        agent: AgentId,
    },
    /// Reports damage applied to the player.
    PlayerDamaged {
        /// Agent that performed the attack.
        agent: AgentId,
        /// Damage that was applied.
        amount: u32,
        /// Player health left after the attack.
        remaining: u32,
    },
    /// Announces that the player's health reached zero and the run is over.
    PlayerDied,
}

/// Reasons a spawn request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpawnRejection {
    /// Every pool slot is occupied by a live agent.
    PoolExhausted,
    /// The current wave is not in the spawning state.
    NotSpawning,
    /// The run already ended.
    RunOver,
}

/// Unique identifier assigned to a pool slot for the lifetime of the pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(u32);

impl AgentId {
    /// Creates a new agent identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// One-based number of a wave within a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WaveNumber(u32);

impl WaveNumber {
    /// The first wave of every run.
    pub const FIRST: Self = Self(1);

    /// Creates a new wave number.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the wave number.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Returns the number of the wave that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for WaveNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Types of hostile agents that may be spawned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EnemyKind {
    /// Baseline walker.
    Standard,
    /// Slow, durable agent with a heavier hitbox.
    Brute,
    /// Rare heavy agent that uses the direct targeting path.
    Boss,
}

impl EnemyKind {
    /// Every enemy kind in declaration order.
    pub const ALL: [Self; 3] = [Self::Standard, Self::Brute, Self::Boss];

    /// Canonical lowercase name of the kind.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Brute => "brute",
            Self::Boss => "boss",
        }
    }
}

impl fmt::Display for EnemyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown enemy type name.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown enemy type `{0}`")]
pub struct ParseEnemyKindError(String);

impl FromStr for EnemyKind {
    type Err = ParseEnemyKindError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ParseEnemyKindError(trimmed.to_owned()))
    }
}

/// Collision volume attached to an agent's physics body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ColliderShape {
    /// Vertical capsule.
    Capsule {
        /// Radius of the capsule's hemispheres and cylinder.
        radius: f32,
        /// Half the height of the cylindrical segment.
        half_height: f32,
    },
    /// Axis-aligned box.
    Cuboid {
        /// Half extents of the box along each axis.
        half_extents: Vec3,
    },
}

impl ColliderShape {
    /// Half extents of the axis-aligned box enclosing the shape.
    #[must_use]
    pub fn half_extents(&self) -> Vec3 {
        match *self {
            Self::Capsule {
                radius,
                half_height,
            } => Vec3::new(radius, half_height + radius, radius),
            Self::Cuboid { half_extents } => half_extents,
        }
    }

    /// Horizontal radius of the circle enclosing the shape's footprint.
    #[must_use]
    pub fn footprint_radius(&self) -> f32 {
        let extents = self.half_extents();
        extents.x.max(extents.z)
    }
}

/// Inclusive range of damage rolled per attack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DamageRange {
    min: u32,
    max: u32,
}

impl DamageRange {
    /// Creates a damage range, swapping the bounds when provided out of order.
    #[must_use]
    pub const fn new(min: u32, max: u32) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// Smallest damage value that may be rolled.
    #[must_use]
    pub const fn min(&self) -> u32 {
        self.min
    }

    /// Largest damage value that may be rolled.
    #[must_use]
    pub const fn max(&self) -> u32 {
        self.max
    }
}

/// Static per-type statistics. Immutable at runtime.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemyTypeConfig {
    /// Health assigned when the agent spawns.
    pub health: u32,
    /// Collision volume of the agent's physics body.
    pub collider: ColliderShape,
    /// Height of the hitbox centre above the agent's feet.
    pub hitbox_offset: f32,
    /// Vertical offset applied to the rendered model.
    pub visual_offset: f32,
    /// Horizontal movement speed in world units per second.
    pub speed: f32,
    /// Horizontal distance at which the agent stops and attacks.
    pub attack_range: f32,
    /// Damage rolled per attack; `None` deals [`DEFAULT_ATTACK_DAMAGE`].
    pub damage: Option<DamageRange>,
    /// Cooldown between attacks; `None` uses [`DEFAULT_ATTACK_COOLDOWN`].
    pub attack_cooldown: Option<Duration>,
}

impl EnemyTypeConfig {
    /// Statistics of the baseline walker.
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            health: 100,
            collider: ColliderShape::Capsule {
                radius: 0.4,
                half_height: 0.5,
            },
            hitbox_offset: 0.9,
            visual_offset: -0.9,
            speed: 3.0,
            attack_range: 1.5,
            damage: Some(DamageRange::new(8, 12)),
            attack_cooldown: None,
        }
    }

    /// Statistics of the brute.
    #[must_use]
    pub const fn brute() -> Self {
        Self {
            health: 300,
            collider: ColliderShape::Cuboid {
                half_extents: Vec3::new(0.6, 1.1, 0.6),
            },
            hitbox_offset: 1.1,
            visual_offset: -1.1,
            speed: 2.0,
            attack_range: 2.0,
            damage: Some(DamageRange::new(15, 25)),
            attack_cooldown: Some(Duration::from_secs(3)),
        }
    }

    /// Statistics of the boss.
    #[must_use]
    pub const fn boss() -> Self {
        Self {
            health: 2_000,
            collider: ColliderShape::Capsule {
                radius: 1.0,
                half_height: 1.5,
            },
            hitbox_offset: 2.5,
            visual_offset: -2.5,
            speed: 2.5,
            attack_range: 3.0,
            damage: Some(DamageRange::new(30, 45)),
            attack_cooldown: None,
        }
    }

    /// Cooldown between attacks after applying the default.
    #[must_use]
    pub fn cooldown(&self) -> Duration {
        self.attack_cooldown.unwrap_or(DEFAULT_ATTACK_COOLDOWN)
    }
}

/// Lookup table mapping enemy kinds to their statistics.
#[derive(Clone, Debug, PartialEq)]
pub struct EnemyTypeTable {
    entries: Vec<(EnemyKind, EnemyTypeConfig)>,
}

impl EnemyTypeTable {
    /// Creates a table from explicit entries. Later duplicates are ignored.
    #[must_use]
    pub fn new(entries: Vec<(EnemyKind, EnemyTypeConfig)>) -> Self {
        Self { entries }
    }

    /// Retrieves the statistics registered for the provided kind.
    #[must_use]
    pub fn get(&self, kind: EnemyKind) -> Option<&EnemyTypeConfig> {
        self.entries
            .iter()
            .find(|(entry, _)| *entry == kind)
            .map(|(_, config)| config)
    }

    /// Statistics used when a kind has no entry: the table's standard entry,
    /// or the built-in standard statistics.
    #[must_use]
    pub fn fallback(&self) -> EnemyTypeConfig {
        self.get(EnemyKind::Standard)
            .copied()
            .unwrap_or_else(EnemyTypeConfig::standard)
    }
}

impl Default for EnemyTypeTable {
    fn default() -> Self {
        Self::new(vec![
            (EnemyKind::Standard, EnemyTypeConfig::standard()),
            (EnemyKind::Brute, EnemyTypeConfig::brute()),
            (EnemyKind::Boss, EnemyTypeConfig::boss()),
        ])
    }
}

/// Describes a single wave: its size, cadence, and weighted type mix.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WaveConfig {
    zombie_count: u32,
    spawn_delay: Duration,
    type_weights: Vec<(EnemyKind, u32)>,
}

impl WaveConfig {
    /// Creates a wave description.
    #[must_use]
    pub fn new(zombie_count: u32, spawn_delay: Duration, type_weights: Vec<(EnemyKind, u32)>) -> Self {
        Self {
            zombie_count,
            spawn_delay,
            type_weights,
        }
    }

    /// Number of agents the wave spawns.
    #[must_use]
    pub const fn zombie_count(&self) -> u32 {
        self.zombie_count
    }

    /// Delay between consecutive spawns.
    #[must_use]
    pub const fn spawn_delay(&self) -> Duration {
        self.spawn_delay
    }

    /// Weighted type mix in declaration order.
    #[must_use]
    pub fn type_weights(&self) -> &[(EnemyKind, u32)] {
        &self.type_weights
    }

    /// Sum of every weight in the mix.
    #[must_use]
    pub fn total_weight(&self) -> u64 {
        self.type_weights
            .iter()
            .map(|(_, weight)| u64::from(*weight))
            .sum()
    }

    /// Resolves a draw in `[0, total_weight)` to an enemy kind by subtracting
    /// weights in declaration order until the draw falls under an entry.
    #[must_use]
    pub fn select_kind(&self, draw: u64) -> Option<EnemyKind> {
        let mut remaining = draw;
        for (kind, weight) in &self.type_weights {
            let weight = u64::from(*weight);
            if remaining < weight {
                return Some(*kind);
            }
            remaining -= weight;
        }
        None
    }
}

/// Ordered, validated list of waves indexed by wave number minus one.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WaveTable {
    waves: Vec<WaveConfig>,
}

impl WaveTable {
    /// Validates and wraps the provided waves.
    pub fn new(waves: Vec<WaveConfig>) -> Result<Self, WaveTableError> {
        if waves.is_empty() {
            return Err(WaveTableError::Empty);
        }

        for (index, wave) in waves.iter().enumerate() {
            let number = WaveNumber::new(u32::try_from(index).unwrap_or(u32::MAX).saturating_add(1));
            if wave.zombie_count() == 0 {
                return Err(WaveTableError::ZeroCount { wave: number });
            }
            if wave.spawn_delay().is_zero() {
                return Err(WaveTableError::ZeroCadence { wave: number });
            }
            if wave.total_weight() == 0 {
                return Err(WaveTableError::NoWeights { wave: number });
            }
        }

        Ok(Self { waves })
    }

    /// Retrieves the configuration of the provided wave, if the table has one.
    #[must_use]
    pub fn get(&self, wave: WaveNumber) -> Option<&WaveConfig> {
        let index = usize::try_from(wave.get()).ok()?.checked_sub(1)?;
        self.waves.get(index)
    }

    /// Configuration of the final wave in the table.
    #[must_use]
    pub fn last(&self) -> Option<&WaveConfig> {
        self.waves.last()
    }

    /// Number of waves in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.waves.len()
    }

    /// Reports whether the table holds no waves. Validated tables never do.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waves.is_empty()
    }
}

impl Default for WaveTable {
    fn default() -> Self {
        let waves = vec![
            WaveConfig::new(5, Duration::from_millis(1_500), vec![(EnemyKind::Standard, 1)]),
            WaveConfig::new(
                8,
                Duration::from_millis(1_300),
                vec![(EnemyKind::Standard, 4), (EnemyKind::Brute, 1)],
            ),
            WaveConfig::new(
                12,
                Duration::from_millis(1_100),
                vec![(EnemyKind::Standard, 3), (EnemyKind::Brute, 1)],
            ),
            WaveConfig::new(
                16,
                Duration::from_millis(1_000),
                vec![(EnemyKind::Standard, 3), (EnemyKind::Brute, 2)],
            ),
            WaveConfig::new(
                20,
                Duration::from_millis(900),
                vec![
                    (EnemyKind::Standard, 6),
                    (EnemyKind::Brute, 3),
                    (EnemyKind::Boss, 1),
                ],
            ),
        ];
        Self { waves }
    }
}

/// Reasons a wave table fails validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum WaveTableError {
    /// The table contains no waves.
    #[error("wave table must contain at least one wave")]
    Empty,
    /// A wave spawns no agents.
    #[error("wave {wave} spawns no agents")]
    ZeroCount {
        /// Offending wave.
        wave: WaveNumber,
    },
    /// A wave has a zero spawn delay.
    #[error("wave {wave} has a zero spawn delay")]
    ZeroCadence {
        /// Offending wave.
        wave: WaveNumber,
    },
    /// A wave has no positive type weight.
    #[error("wave {wave} has no positive type weight")]
    NoWeights {
        /// Offending wave.
        wave: WaveNumber,
    },
}

/// States of the wave scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WaveStatus {
    /// No wave has started yet.
    Idle,
    /// A wave is issuing spawns on its cadence.
    Spawning,
    /// A wave has been fully issued and is being fought.
    Active,
    /// A wave was cleared and the next one has not started.
    BetweenWaves,
}

impl WaveStatus {
    /// Reports whether the state machine permits moving to `next`.
    ///
    /// Transitions only run `Idle -> Spawning -> Active -> BetweenWaves ->
    /// Spawning`; returning to `Idle` happens exclusively through a run reset.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Spawning)
                | (Self::Spawning, Self::Active)
                | (Self::Active, Self::BetweenWaves)
                | (Self::BetweenWaves, Self::Spawning)
        )
    }
}

/// Authoritative wave bookkeeping held by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaveRuntimeState {
    /// Wave currently being spawned or fought; `None` before the first wave.
    pub current_wave: Option<WaveNumber>,
    /// Current scheduler state.
    pub status: WaveStatus,
    /// Live agents spawned this wave minus those that died.
    pub zombies_remaining: u32,
    /// Number of agents the current wave intends to spawn.
    pub total_in_wave: u32,
    /// Number of agents successfully spawned this wave.
    pub spawned_so_far: u32,
}

impl Default for WaveRuntimeState {
    fn default() -> Self {
        Self {
            current_wave: None,
            status: WaveStatus::Idle,
            zombies_remaining: 0,
            total_in_wave: 0,
            spawned_so_far: 0,
        }
    }
}

/// Outcome of the current run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunOutcome {
    /// The run is still being played.
    InProgress,
    /// The player's health reached zero.
    Defeated,
    /// Every configured wave was cleared.
    Victorious,
}

/// Immutable representation of a single live agent used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgentSnapshot {
    /// Stable identifier of the agent's pool slot.
    pub id: AgentId,
    /// Enemy type assigned to the agent.
    pub kind: EnemyKind,
    /// Position of the agent's feet as of the last tick.
    pub position: Vec3,
    /// Health remaining.
    pub health: u32,
    /// Indicates whether the cosmetic hit flash is showing.
    pub is_hit: bool,
    /// Facing angle around the vertical axis in radians.
    pub yaw: f32,
    /// Physics body backing the agent, if one exists.
    pub body: Option<BodyHandle>,
    /// Statistics resolved for the agent when it spawned.
    pub stats: EnemyTypeConfig,
}

/// Read-only snapshot describing every live agent.
#[derive(Clone, Debug, Default)]
pub struct AgentView {
    snapshots: Vec<AgentSnapshot>,
}

impl AgentView {
    /// Creates a new agent view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<AgentSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &AgentSnapshot> {
        self.snapshots.iter()
    }

    /// Retrieves the snapshot of the provided agent, if it is alive.
    #[must_use]
    pub fn get(&self, agent: AgentId) -> Option<&AgentSnapshot> {
        self.snapshots
            .binary_search_by_key(&agent, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Number of live agents captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view captured no live agents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<AgentSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of the player used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerSnapshot {
    /// Player position in world units.
    pub position: Vec3,
    /// Health remaining.
    pub health: u32,
    /// Indicates whether the player can still be attacked.
    pub alive: bool,
}

/// Distance between two points projected onto the horizontal XZ plane.
#[must_use]
pub fn planar_distance(a: Vec3, b: Vec3) -> f32 {
    let dx = b.x - a.x;
    let dz = b.z - a.z;
    (dx * dx + dz * dz).sqrt()
}

/// Derives the seed of a named random stream from a run-wide seed.
#[must_use]
pub fn derive_stream_seed(global_seed: u64, label: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(global_seed.to_le_bytes());
    hasher.update(label.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[0..8]);
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{de::DeserializeOwned, Serialize};

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn wave_table_round_trips_through_bincode() {
        assert_round_trip(&WaveTable::default());
    }

    #[test]
    fn wave_status_round_trips_through_bincode() {
        assert_round_trip(&WaveStatus::BetweenWaves);
    }

    #[test]
    fn wave_status_only_moves_forward() {
        use WaveStatus::*;
        assert!(Idle.can_transition_to(Spawning));
        assert!(Spawning.can_transition_to(Active));
        assert!(Active.can_transition_to(BetweenWaves));
        assert!(BetweenWaves.can_transition_to(Spawning));

        assert!(!Idle.can_transition_to(Active));
        assert!(!Spawning.can_transition_to(Spawning));
        assert!(!Active.can_transition_to(Spawning));
        assert!(!BetweenWaves.can_transition_to(Idle));
        assert!(!Spawning.can_transition_to(BetweenWaves));
    }

    #[test]
    fn select_kind_subtracts_weights_in_order() {
        let wave = WaveConfig::new(
            10,
            Duration::from_secs(1),
            vec![(EnemyKind::Standard, 3), (EnemyKind::Brute, 1), (EnemyKind::Boss, 2)],
        );
        assert_eq!(wave.total_weight(), 6);
        assert_eq!(wave.select_kind(0), Some(EnemyKind::Standard));
        assert_eq!(wave.select_kind(2), Some(EnemyKind::Standard));
        assert_eq!(wave.select_kind(3), Some(EnemyKind::Brute));
        assert_eq!(wave.select_kind(4), Some(EnemyKind::Boss));
        assert_eq!(wave.select_kind(5), Some(EnemyKind::Boss));
        assert_eq!(wave.select_kind(6), None);
    }

    #[test]
    fn zero_weight_entries_are_never_selected() {
        let wave = WaveConfig::new(
            1,
            Duration::from_secs(1),
            vec![(EnemyKind::Boss, 0), (EnemyKind::Standard, 1)],
        );
        assert_eq!(wave.select_kind(0), Some(EnemyKind::Standard));
    }

    #[test]
    fn wave_table_rejects_invalid_waves() {
        assert_eq!(WaveTable::new(Vec::new()), Err(WaveTableError::Empty));

        let zero_count = WaveConfig::new(0, Duration::from_secs(1), vec![(EnemyKind::Standard, 1)]);
        assert_eq!(
            WaveTable::new(vec![zero_count]),
            Err(WaveTableError::ZeroCount {
                wave: WaveNumber::FIRST
            })
        );

        let valid = WaveConfig::new(1, Duration::from_secs(1), vec![(EnemyKind::Standard, 1)]);
        let no_weights = WaveConfig::new(3, Duration::from_secs(1), vec![(EnemyKind::Brute, 0)]);
        assert_eq!(
            WaveTable::new(vec![valid, no_weights]),
            Err(WaveTableError::NoWeights {
                wave: WaveNumber::new(2)
            })
        );
    }

    #[test]
    fn wave_table_is_indexed_by_wave_number() {
        let table = WaveTable::default();
        assert!(table.get(WaveNumber::new(0)).is_none());
        assert_eq!(
            table.get(WaveNumber::FIRST).map(WaveConfig::zombie_count),
            Some(5)
        );
        assert!(table.get(WaveNumber::new(table.len() as u32 + 1)).is_none());
        assert_eq!(table.last().map(WaveConfig::zombie_count), Some(20));
    }

    #[test]
    fn enemy_kind_parses_case_insensitively() {
        assert_eq!("Brute".parse::<EnemyKind>(), Ok(EnemyKind::Brute));
        assert_eq!(" boss ".parse::<EnemyKind>(), Ok(EnemyKind::Boss));
        let error = "runner".parse::<EnemyKind>().expect_err("unknown kind");
        assert_eq!(error.to_string(), "unknown enemy type `runner`");
    }

    #[test]
    fn type_table_falls_back_to_standard_entry() {
        let custom = EnemyTypeConfig {
            health: 42,
            ..EnemyTypeConfig::standard()
        };
        let table = EnemyTypeTable::new(vec![(EnemyKind::Standard, custom)]);
        assert!(table.get(EnemyKind::Boss).is_none());
        assert_eq!(table.fallback().health, 42);

        let empty = EnemyTypeTable::new(Vec::new());
        assert_eq!(empty.fallback(), EnemyTypeConfig::standard());
    }

    #[test]
    fn footprint_covers_the_widest_horizontal_extent() {
        let table = EnemyTypeTable::default();
        let radius = |kind| table.get(kind).expect("registered").collider.footprint_radius();

        assert_eq!(radius(EnemyKind::Standard), 0.4);
        assert_eq!(radius(EnemyKind::Brute), 0.6);
        assert_eq!(radius(EnemyKind::Boss), 1.0);
    }

    #[test]
    fn damage_range_orders_bounds() {
        let range = DamageRange::new(12, 4);
        assert_eq!(range.min(), 4);
        assert_eq!(range.max(), 12);
    }

    #[test]
    fn stream_seeds_differ_per_label() {
        let a = derive_stream_seed(7, RNG_STREAM_SPAWN_POINTS);
        let b = derive_stream_seed(7, RNG_STREAM_WAVE_MIX);
        assert_ne!(a, b);
        assert_eq!(a, derive_stream_seed(7, RNG_STREAM_SPAWN_POINTS));
    }

    #[test]
    fn planar_distance_ignores_height() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(3.0, 25.0, 4.0);
        assert!((planar_distance(a, b) - 5.0).abs() < 1e-6);
    }
}
