//! Headless session driver that pumps the world and its systems.

use std::time::Duration;

use horde_core::{
    derive_stream_seed, planar_distance, AgentId, Command, Event, RunOutcome, WaveNumber,
    WaveStatus, WaveTable, DEFAULT_ATTACK_DAMAGE, RNG_STREAM_ATTACK_DAMAGE,
    RNG_STREAM_SPAWN_POINTS, RNG_STREAM_WAVE_MIX,
};
use horde_physics_headless::HeadlessPhysics;
use horde_system_attack::{Attack, Config as AttackConfig};
use horde_system_spawn_points::{
    Config as SpawnPointConfig, SpawnPointFinder, DEFAULT_MAX_RADIUS, DEFAULT_MIN_RADIUS,
};
use horde_system_steering::{Config as SteeringConfig, Steering};
use horde_system_waves::{Config as WavesConfig, FinalWavePolicy, SpawnRetryPolicy, Waves};
use horde_world::{self as world, query, World};
use tracing::{debug, info};

use crate::arena;

/// Player weapon that periodically damages the closest agent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct AutoFire {
    interval: Duration,
    damage: u32,
}

impl AutoFire {
    pub(crate) const fn new(interval: Duration, damage: u32) -> Self {
        Self { interval, damage }
    }
}

/// Parameters of a headless session.
#[derive(Clone, Debug)]
pub(crate) struct SessionConfig {
    pub(crate) seed: u64,
    pub(crate) tick: Duration,
    pub(crate) retry: SpawnRetryPolicy,
    pub(crate) final_wave: FinalWavePolicy,
    pub(crate) auto_fire: Option<AutoFire>,
    pub(crate) elevated: bool,
}

/// State of a session once it stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Summary {
    pub(crate) elapsed: Duration,
    pub(crate) wave: Option<WaveNumber>,
    pub(crate) status: WaveStatus,
    pub(crate) outcome: RunOutcome,
    pub(crate) score: u32,
    pub(crate) player_health: u32,
    pub(crate) events: usize,
}

/// World, physics and systems wired together in tick order.
#[derive(Debug)]
pub(crate) struct Session {
    world: World,
    physics: HeadlessPhysics,
    waves: Waves,
    steering: Steering,
    attack: Attack,
    tick: Duration,
    auto_fire: Option<AutoFire>,
    next_shot_at: Duration,
    events: usize,
}

impl Session {
    /// Builds the arena, derives every random stream from the seed and
    /// starts the session.
    pub(crate) fn new(config: SessionConfig) -> Self {
        let arena = arena::build(config.elevated);

        let finder = SpawnPointFinder::new(SpawnPointConfig::new(
            glam::Vec3::ZERO,
            DEFAULT_MIN_RADIUS,
            DEFAULT_MAX_RADIUS,
            derive_stream_seed(config.seed, RNG_STREAM_SPAWN_POINTS),
        ));
        let waves = Waves::new(
            WavesConfig::new(
                WaveTable::default(),
                derive_stream_seed(config.seed, RNG_STREAM_WAVE_MIX),
            )
            .with_retry_policy(config.retry)
            .with_final_wave_policy(config.final_wave),
            finder,
        );
        let attack = Attack::new(AttackConfig::new(
            DEFAULT_ATTACK_DAMAGE,
            derive_stream_seed(config.seed, RNG_STREAM_ATTACK_DAMAGE),
        ));

        let mut session = Self {
            world: World::new(),
            physics: arena.physics,
            waves,
            steering: Steering::new(SteeringConfig::default()),
            attack,
            tick: config.tick,
            auto_fire: config.auto_fire,
            next_shot_at: Duration::ZERO,
            events: 0,
        };
        session.submit(Command::MovePlayer {
            position: arena.player_position,
        });
        session.submit(Command::StartSession);
        session
    }

    /// Runs ticks until `duration` of simulated time elapsed or the run ended.
    pub(crate) fn run_for(&mut self, duration: Duration) -> Summary {
        while query::clock(&self.world) < duration && !self.is_over() {
            self.frame();
        }
        self.summary()
    }

    /// Reports the current state of the run.
    pub(crate) fn summary(&self) -> Summary {
        let wave = query::wave_state(&self.world);
        Summary {
            elapsed: query::clock(&self.world),
            wave: wave.current_wave,
            status: wave.status,
            outcome: query::outcome(&self.world),
            score: query::score(&self.world),
            player_health: query::player(&self.world).health,
            events: self.events,
        }
    }

    fn is_over(&self) -> bool {
        query::outcome(&self.world) != RunOutcome::InProgress
    }

    fn frame(&mut self) {
        self.physics.step(self.tick);

        let mut events = Vec::new();
        world::apply(
            &mut self.world,
            &mut self.physics,
            Command::Tick { dt: self.tick },
            &mut events,
        );
        if let Some(command) = self.fire() {
            world::apply(&mut self.world, &mut self.physics, command, &mut events);
        }
        self.pump(events);
    }

    fn submit(&mut self, command: Command) {
        let mut events = Vec::new();
        world::apply(&mut self.world, &mut self.physics, command, &mut events);
        self.pump(events);
    }

    fn pump(&mut self, mut events: Vec<Event>) {
        loop {
            for event in &events {
                self.record(event);
            }

            let agents = query::agent_view(&self.world);
            let player = query::player(&self.world);
            let mut commands = Vec::new();
            self.waves.handle(
                &events,
                &query::wave_state(&self.world),
                query::outcome(&self.world),
                &self.physics,
                &mut commands,
            );
            self.steering
                .handle(&events, &agents, &player, &self.physics, &mut commands);
            self.attack.handle(&events, &agents, &player, &mut commands);
            if commands.is_empty() {
                break;
            }

            events.clear();
            for command in commands {
                world::apply(&mut self.world, &mut self.physics, command, &mut events);
            }
        }
    }

    fn fire(&mut self) -> Option<Command> {
        let weapon = self.auto_fire?;
        let now = query::clock(&self.world);
        if now < self.next_shot_at {
            return None;
        }

        let player = query::player(&self.world);
        if !player.alive {
            return None;
        }
        let target = nearest_agent(&self.world, player.position)?;
        self.next_shot_at = now.saturating_add(weapon.interval);
        Some(Command::DamageAgent {
            agent: target,
            amount: weapon.damage,
        })
    }

    fn record(&mut self, event: &Event) {
        self.events = self.events.saturating_add(1);
        match event {
            Event::TimeAdvanced { .. } => {}
            Event::CountdownTick {
                next_wave,
                seconds_remaining,
            } => info!(
                next_wave = next_wave.get(),
                seconds_remaining, "next wave incoming"
            ),
            Event::PlayerDamaged {
                agent,
                amount,
                remaining,
            } => info!(agent = agent.get(), amount, remaining, "player hit"),
            other => debug!(
                clock_ms = query::clock(&self.world).as_millis() as u64,
                event = ?other,
                "event"
            ),
        }
    }
}

fn nearest_agent(world: &World, from: glam::Vec3) -> Option<AgentId> {
    query::agent_view(world)
        .iter()
        .map(|agent| (planar_distance(agent.position, from), agent.id))
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, id)| id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use horde_core::DEFAULT_PLAYER_HEALTH;

    fn config(seed: u64, auto_fire: Option<AutoFire>) -> SessionConfig {
        SessionConfig {
            seed,
            tick: Duration::from_millis(50),
            retry: SpawnRetryPolicy::default(),
            final_wave: FinalWavePolicy::Victory,
            auto_fire,
            elevated: false,
        }
    }

    #[test]
    fn session_starts_and_schedules_the_first_wave() {
        let mut session = Session::new(config(1, None));

        let summary = session.run_for(Duration::from_secs(4));

        assert_eq!(summary.wave, Some(WaveNumber::FIRST));
        assert_eq!(summary.status, WaveStatus::Spawning);
        assert_eq!(summary.outcome, RunOutcome::InProgress);
        assert!(summary.elapsed >= Duration::from_secs(4));
    }

    #[test]
    fn same_seed_replays_the_same_run() {
        let weapon = Some(AutoFire::new(Duration::from_millis(400), 40));
        let first = Session::new(config(7, weapon)).run_for(Duration::from_secs(30));
        let second = Session::new(config(7, weapon)).run_for(Duration::from_secs(30));

        assert_eq!(first, second);
    }

    #[test]
    fn auto_fire_scores_kills() {
        let weapon = Some(AutoFire::new(Duration::from_millis(250), 1_000));
        let mut session = Session::new(config(3, weapon));

        let summary = session.run_for(Duration::from_secs(15));

        assert!(summary.score > 0);
    }

    #[test]
    fn unarmed_player_is_overrun() {
        let mut session = Session::new(config(5, None));

        let summary = session.run_for(Duration::from_secs(180));

        assert!(summary.player_health < DEFAULT_PLAYER_HEALTH);
        assert_eq!(summary.score, 0);
    }

    #[test]
    fn shots_wait_for_an_agent() {
        let weapon = AutoFire::new(Duration::from_secs(1), 10);
        let mut session = Session::new(config(2, Some(weapon)));

        assert_eq!(session.fire(), None);
        assert_eq!(session.next_shot_at, Duration::ZERO);
    }
}
