#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative game state for the Horde survival simulation.
//!
//! The [`World`] is the single source of truth for the agent pool, the player,
//! the score, and the wave bookkeeping. It is mutated exclusively through
//! [`apply`] and observed through the [`query`] module.

mod pool;

use std::time::Duration;

use glam::Vec3;
use horde_core::{
    physics::{BodyDesc, BodyHandle, BodyKind, CollisionGroups, PhysicsPort},
    AgentId, Command, EnemyKind, EnemyTypeTable, Event, RunOutcome, SpawnRejection, WaveNumber,
    WaveRuntimeState, WaveStatus, DEFAULT_PLAYER_HEALTH, MAX_POOL_SIZE,
};
use tracing::{debug, info, warn};

pub use pool::{Agent, DamageOutcome, EnemyPool, Released};

/// Configuration parameters required to construct a world.
#[derive(Clone, Debug)]
pub struct WorldConfig {
    pool_capacity: usize,
    player_health: u32,
    enemy_types: EnemyTypeTable,
}

impl WorldConfig {
    /// Creates a new configuration.
    #[must_use]
    pub fn new(pool_capacity: usize, player_health: u32, enemy_types: EnemyTypeTable) -> Self {
        Self {
            pool_capacity,
            player_health,
            enemy_types,
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self::new(
            MAX_POOL_SIZE,
            DEFAULT_PLAYER_HEALTH,
            EnemyTypeTable::default(),
        )
    }
}

#[derive(Clone, Debug)]
struct Player {
    position: Vec3,
    health: u32,
    max_health: u32,
}

/// Represents the authoritative Horde world state.
#[derive(Clone, Debug)]
pub struct World {
    clock: Duration,
    session_started: bool,
    pool: EnemyPool,
    enemy_types: EnemyTypeTable,
    player: Player,
    score: u32,
    wave: WaveRuntimeState,
    outcome: RunOutcome,
}

impl World {
    /// Creates a world using the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(WorldConfig::default())
    }

    /// Creates a world using the provided configuration.
    #[must_use]
    pub fn with_config(config: WorldConfig) -> Self {
        Self {
            clock: Duration::ZERO,
            session_started: false,
            pool: EnemyPool::with_capacity(config.pool_capacity),
            enemy_types: config.enemy_types,
            player: Player {
                position: Vec3::ZERO,
                health: config.player_health,
                max_health: config.player_health,
            },
            score: 0,
            wave: WaveRuntimeState::default(),
            outcome: RunOutcome::InProgress,
        }
    }

    fn advance<P>(&mut self, physics: &P, dt: Duration)
    where
        P: PhysicsPort + ?Sized,
    {
        self.clock = self.clock.saturating_add(dt);

        for agent in self.pool.live_mut() {
            let Some(body) = agent.body() else {
                continue;
            };
            if let Some(center) = physics.body_position(body) {
                let offset = agent.stats().hitbox_offset;
                agent.set_position(center - Vec3::Y * offset);
            }
        }

        self.pool.expire_hit_flashes(self.clock);
    }

    fn reset<P>(&mut self, physics: &mut P)
    where
        P: PhysicsPort + ?Sized,
    {
        for body in self.pool.recycle_all() {
            let _ = physics.remove_body(body);
        }
        self.session_started = false;
        self.player.health = self.player.max_health;
        self.score = 0;
        self.wave = WaveRuntimeState::default();
        self.outcome = RunOutcome::InProgress;
    }

    fn transition(&mut self, to: WaveStatus, out_events: &mut Vec<Event>) -> bool {
        let from = self.wave.status;
        let Some(wave) = self.wave.current_wave else {
            reject_transition(to, from, out_events);
            return false;
        };
        if !from.can_transition_to(to) {
            reject_transition(to, from, out_events);
            return false;
        }

        self.wave.status = to;
        out_events.push(Event::WaveStatusChanged { wave, from, to });
        true
    }

    fn start_wave(&mut self, wave: WaveNumber, total: u32, out_events: &mut Vec<Event>) {
        let from = self.wave.status;
        if !self.session_started
            || self.outcome != RunOutcome::InProgress
            || !from.can_transition_to(WaveStatus::Spawning)
        {
            reject_transition(WaveStatus::Spawning, from, out_events);
            return;
        }

        self.wave.current_wave = Some(wave);
        self.wave.status = WaveStatus::Spawning;
        self.wave.total_in_wave = total;
        self.wave.spawned_so_far = 0;
        info!(wave = wave.get(), total, "wave started");
        out_events.push(Event::WaveStatusChanged {
            wave,
            from,
            to: WaveStatus::Spawning,
        });
        out_events.push(Event::WaveStarted { wave, total });
    }

    fn spawn_agent<P>(
        &mut self,
        physics: &mut P,
        kind: EnemyKind,
        position: Vec3,
        out_events: &mut Vec<Event>,
    ) where
        P: PhysicsPort + ?Sized,
    {
        let rejection = if self.outcome != RunOutcome::InProgress {
            Some(SpawnRejection::RunOver)
        } else if self.wave.status != WaveStatus::Spawning {
            Some(SpawnRejection::NotSpawning)
        } else {
            None
        };
        if let Some(reason) = rejection {
            out_events.push(Event::AgentSpawnRejected { kind, reason });
            return;
        }

        let stats = match self.enemy_types.get(kind) {
            Some(stats) => *stats,
            None => {
                warn!(%kind, "no statistics registered for enemy type, using fallback");
                self.enemy_types.fallback()
            }
        };

        let Some(agent) = self.pool.acquire(kind, stats, position) else {
            warn!(
                %kind,
                capacity = self.pool.capacity(),
                "agent pool exhausted, spawn deferred"
            );
            out_events.push(Event::AgentSpawnRejected {
                kind,
                reason: SpawnRejection::PoolExhausted,
            });
            return;
        };

        let body = physics.create_body(&BodyDesc {
            kind: BodyKind::Dynamic,
            shape: stats.collider,
            position: position + Vec3::Y * stats.hitbox_offset,
            groups: CollisionGroups::AGENT,
        });
        let _ = self.pool.set_physics_handle(agent, Some(body));

        self.wave.spawned_so_far = self.wave.spawned_so_far.saturating_add(1);
        self.wave.zombies_remaining = self.wave.zombies_remaining.saturating_add(1);
        debug!(agent = agent.get(), %kind, "agent spawned");
        out_events.push(Event::AgentSpawned {
            agent,
            kind,
            position,
        });
    }

    fn damage_agent<P>(
        &mut self,
        physics: &mut P,
        agent: AgentId,
        amount: u32,
        out_events: &mut Vec<Event>,
    ) where
        P: PhysicsPort + ?Sized,
    {
        match self.pool.damage(agent, amount, self.clock) {
            DamageOutcome::Ignored => {}
            DamageOutcome::Hit { remaining } => out_events.push(Event::AgentHit {
                agent,
                amount,
                remaining,
            }),
            DamageOutcome::Killed { kind, body } => {
                if let Some(body) = body {
                    let _ = physics.remove_body(body);
                }
                self.score = self.score.saturating_add(1);
                self.wave.zombies_remaining = self.wave.zombies_remaining.saturating_sub(1);
                out_events.push(Event::AgentDied { agent, kind });
            }
        }
    }

    fn release_agent<P>(&mut self, physics: &mut P, agent: AgentId, out_events: &mut Vec<Event>)
    where
        P: PhysicsPort + ?Sized,
    {
        let Some(released) = self.pool.release(agent) else {
            return;
        };
        if let Some(body) = released.body {
            let _ = physics.remove_body(body);
        }
        if released.was_active {
            self.wave.zombies_remaining = self.wave.zombies_remaining.saturating_sub(1);
            out_events.push(Event::AgentReleased { agent });
        }
    }

    fn live_body(&self, agent: AgentId) -> Option<BodyHandle> {
        self.pool
            .get(agent)
            .filter(|slot| !slot.is_dead())
            .and_then(Agent::body)
    }

    fn damage_player(&mut self, agent: AgentId, amount: u32, out_events: &mut Vec<Event>) {
        if self.outcome != RunOutcome::InProgress || self.player.health == 0 {
            return;
        }
        if !self.pool.get(agent).is_some_and(|slot| !slot.is_dead()) {
            return;
        }

        self.player.health = self.player.health.saturating_sub(amount);
        out_events.push(Event::PlayerDamaged {
            agent,
            amount,
            remaining: self.player.health,
        });

        if self.player.health == 0 {
            self.outcome = RunOutcome::Defeated;
            info!(score = self.score, "player died, run over");
            out_events.push(Event::PlayerDied);
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

fn reject_transition(requested: WaveStatus, current: WaveStatus, out_events: &mut Vec<Event>) {
    warn!(?requested, ?current, "wave transition rejected");
    out_events.push(Event::WaveTransitionRejected { requested, current });
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// Physics side effects (body creation and removal, velocities, impulses)
/// are written to `physics`; every observable change is reported through
/// `out_events`.
pub fn apply<P>(world: &mut World, physics: &mut P, command: Command, out_events: &mut Vec<Event>)
where
    P: PhysicsPort + ?Sized,
{
    match command {
        Command::Tick { dt } => {
            world.advance(physics, dt);
            out_events.push(Event::TimeAdvanced { dt });
        }
        Command::StartSession => {
            if world.session_started || world.outcome != RunOutcome::InProgress {
                return;
            }
            world.session_started = true;
            info!("session started");
            out_events.push(Event::SessionStarted);
        }
        Command::ResetRun => {
            world.reset(physics);
            info!("run reset");
            out_events.push(Event::RunReset);
        }
        Command::MovePlayer { position } => {
            world.player.position = position;
        }
        Command::StartWave { wave, total } => {
            world.start_wave(wave, total, out_events);
        }
        Command::FinishSpawning => {
            let _ = world.transition(WaveStatus::Active, out_events);
        }
        Command::ClearWave => {
            if world.wave.zombies_remaining > 0 {
                reject_transition(WaveStatus::BetweenWaves, world.wave.status, out_events);
                return;
            }
            if world.transition(WaveStatus::BetweenWaves, out_events) {
                if let Some(wave) = world.wave.current_wave {
                    info!(wave = wave.get(), score = world.score, "wave cleared");
                    out_events.push(Event::WaveCleared { wave });
                }
            }
        }
        Command::AnnounceCountdown {
            next_wave,
            seconds_remaining,
        } => {
            if world.wave.status == WaveStatus::BetweenWaves {
                out_events.push(Event::CountdownTick {
                    next_wave,
                    seconds_remaining,
                });
            }
        }
        Command::DeclareVictory => {
            if world.wave.status != WaveStatus::BetweenWaves
                || world.outcome != RunOutcome::InProgress
            {
                return;
            }
            world.outcome = RunOutcome::Victorious;
            let waves = world.wave.current_wave.map_or(0, |wave| wave.get());
            info!(waves, score = world.score, "all waves completed");
            out_events.push(Event::AllWavesCompleted { waves });
        }
        Command::SpawnAgent { kind, position } => {
            world.spawn_agent(physics, kind, position, out_events);
        }
        Command::DamageAgent { agent, amount } => {
            world.damage_agent(physics, agent, amount, out_events);
        }
        Command::ReleaseAgent { agent } => {
            world.release_agent(physics, agent, out_events);
        }
        Command::SteerAgent {
            agent,
            velocity,
            yaw,
        } => {
            let Some(body) = world.live_body(agent) else {
                return;
            };
            if let Some(slot) = world.pool.get_mut(agent) {
                slot.set_yaw(yaw);
            }
            if let Some(velocity) = velocity {
                let Some(current) = physics.body_velocity(body) else {
                    return;
                };
                let _ = physics.set_velocity(body, Vec3::new(velocity.x, current.y, velocity.z));
            }
        }
        Command::ImpulseAgent { agent, impulse } => {
            if let Some(body) = world.live_body(agent) {
                let _ = physics.apply_impulse(body, impulse);
            }
        }
        Command::DamagePlayer { agent, amount } => {
            world.damage_player(agent, amount, out_events);
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use horde_core::{
        AgentView, EnemyTypeTable, PlayerSnapshot, RunOutcome, WaveRuntimeState,
    };

    use super::{EnemyPool, World};

    /// Total simulated time processed by the world.
    #[must_use]
    pub fn clock(world: &World) -> Duration {
        world.clock
    }

    /// Reports whether a session is in progress.
    #[must_use]
    pub fn session_started(world: &World) -> bool {
        world.session_started
    }

    /// Copy of the authoritative wave bookkeeping.
    #[must_use]
    pub fn wave_state(world: &World) -> WaveRuntimeState {
        world.wave
    }

    /// Outcome of the current run.
    #[must_use]
    pub fn outcome(world: &World) -> RunOutcome {
        world.outcome
    }

    /// Number of agents killed during the run.
    #[must_use]
    pub fn score(world: &World) -> u32 {
        world.score
    }

    /// Captures the player's position and health.
    #[must_use]
    pub fn player(world: &World) -> PlayerSnapshot {
        PlayerSnapshot {
            position: world.player.position,
            health: world.player.health,
            alive: world.player.health > 0,
        }
    }

    /// Captures a read-only view of every live agent.
    #[must_use]
    pub fn agent_view(world: &World) -> AgentView {
        AgentView::from_snapshots(world.pool.live_snapshots())
    }

    /// Provides read-only access to every pool slot.
    #[must_use]
    pub fn pool(world: &World) -> &EnemyPool {
        &world.pool
    }

    /// Statistics table used to resolve spawned agents.
    #[must_use]
    pub fn enemy_types(world: &World) -> &EnemyTypeTable {
        &world.enemy_types
    }
}
