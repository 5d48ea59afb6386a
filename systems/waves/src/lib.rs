#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wave scheduler that drives spawning, progress tracking, and pauses.
//!
//! The scheduler runs the `Idle -> Spawning -> Active -> BetweenWaves ->
//! Spawning` cycle. Every deadline lives inside the phase that owns it, so
//! leaving a phase discards its timers and a stale deadline can never fire.
//! The world validates each requested transition independently.

use std::time::Duration;

use horde_core::{
    physics::PhysicsQuery, Command, EnemyKind, EnemyTypeTable, Event, RunOutcome, SpawnRejection,
    WaveConfig, WaveNumber, WaveRuntimeState, WaveStatus, WaveTable,
};
use horde_system_spawn_points::SpawnPointFinder;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

/// Delay between the session start and the first wave.
pub const INITIAL_DELAY: Duration = Duration::from_secs(3);

/// Time a cleared wave is displayed before the countdown starts.
pub const CLEARED_DISPLAY: Duration = Duration::from_secs(5);

/// Length of the countdown preceding the next wave.
pub const COUNTDOWN: Duration = Duration::from_secs(25);

/// Consecutive spawn-point search failures tolerated by the default retry policy.
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 20;

/// Behaviour once the last configured wave was cleared.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FinalWavePolicy {
    /// Declare the run won.
    #[default]
    Victory,
    /// Keep starting new waves with the last configuration.
    RepeatLast,
}

/// Behaviour when a spawn attempt fails for lack of a point or a pool slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpawnRetryPolicy {
    /// Retry the same agent on the next tick.
    ///
    /// An exhausted pool pauses the cadence until a slot frees and never
    /// abandons the wave. The rest of the wave is abandoned only after
    /// `max_consecutive_failures` spawn-point searches failed in a row.
    RetryNextTick {
        /// Failed spawn-point searches in a row after which the wave stops
        /// spawning.
        max_consecutive_failures: u32,
    },
    /// Count the failed agent as issued and wait for the next cadence slot.
    Skip,
}

impl Default for SpawnRetryPolicy {
    fn default() -> Self {
        Self::RetryNextTick {
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
        }
    }
}

/// Coarse scheduler phase exposed for inspection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Waiting for a session to start.
    Dormant,
    /// Session started; the first wave begins after the initial delay.
    AwaitingFirstWave,
    /// Issuing spawns for the current wave.
    Spawning,
    /// Waiting for the current wave to be cleared.
    Active,
    /// Pausing between two waves.
    BetweenWaves,
    /// Every configured wave was cleared.
    Finished,
    /// The run ended or drifted out of sync; nothing is scheduled.
    Halted,
}

/// Configuration parameters required to construct the wave scheduler.
#[derive(Clone, Debug)]
pub struct Config {
    table: WaveTable,
    initial_delay: Duration,
    cleared_display: Duration,
    countdown: Duration,
    final_wave: FinalWavePolicy,
    retry: SpawnRetryPolicy,
    enemy_types: EnemyTypeTable,
    rng_seed: u64,
}

impl Config {
    /// Creates a configuration for the provided wave table and type-mix seed.
    #[must_use]
    pub fn new(table: WaveTable, rng_seed: u64) -> Self {
        Self {
            table,
            initial_delay: INITIAL_DELAY,
            cleared_display: CLEARED_DISPLAY,
            countdown: COUNTDOWN,
            final_wave: FinalWavePolicy::default(),
            retry: SpawnRetryPolicy::default(),
            enemy_types: EnemyTypeTable::default(),
            rng_seed,
        }
    }

    /// Overrides the behaviour once the table is exhausted.
    #[must_use]
    pub fn with_final_wave_policy(mut self, policy: FinalWavePolicy) -> Self {
        self.final_wave = policy;
        self
    }

    /// Overrides the spawn retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, policy: SpawnRetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Overrides the statistics used to size each kind's spawn clearance.
    /// Should match the table the world spawns agents with.
    #[must_use]
    pub fn with_enemy_types(mut self, enemy_types: EnemyTypeTable) -> Self {
        self.enemy_types = enemy_types;
        self
    }

    /// Overrides the initial delay and the two halves of the between-waves pause.
    #[must_use]
    pub fn with_pauses(
        mut self,
        initial_delay: Duration,
        cleared_display: Duration,
        countdown: Duration,
    ) -> Self {
        self.initial_delay = initial_delay;
        self.cleared_display = cleared_display;
        self.countdown = countdown;
        self
    }

    /// Wave table driving the scheduler.
    #[must_use]
    pub fn table(&self) -> &WaveTable {
        &self.table
    }
}

#[derive(Clone, Debug)]
struct SpawnProgress {
    wave: WaveNumber,
    config: WaveConfig,
    issued: u32,
    next_spawn_at: Duration,
    pending: Option<EnemyKind>,
    retry: Option<EnemyKind>,
    failures: u32,
}

#[derive(Clone, Debug)]
enum Stage {
    Dormant,
    AwaitingFirstWave {
        starts_at: Duration,
    },
    Spawning(SpawnProgress),
    Active {
        wave: WaveNumber,
    },
    BetweenWaves {
        cleared: WaveNumber,
        countdown_at: Duration,
        starts_at: Duration,
        announced: Option<u32>,
    },
    Finished,
    Halted,
}

/// Wave scheduler system.
#[derive(Debug)]
pub struct Waves {
    config: Config,
    clock: Duration,
    stage: Stage,
    mix: ChaCha8Rng,
    finder: SpawnPointFinder,
}

impl Waves {
    /// Creates a scheduler that finds spawn points with `finder`.
    #[must_use]
    pub fn new(config: Config, finder: SpawnPointFinder) -> Self {
        Self {
            mix: ChaCha8Rng::seed_from_u64(config.rng_seed),
            config,
            clock: Duration::ZERO,
            stage: Stage::Dormant,
            finder,
        }
    }

    /// Current coarse phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        match self.stage {
            Stage::Dormant => Phase::Dormant,
            Stage::AwaitingFirstWave { .. } => Phase::AwaitingFirstWave,
            Stage::Spawning(_) => Phase::Spawning,
            Stage::Active { .. } => Phase::Active,
            Stage::BetweenWaves { .. } => Phase::BetweenWaves,
            Stage::Finished => Phase::Finished,
            Stage::Halted => Phase::Halted,
        }
    }

    /// Consumes world events and the authoritative wave state, emitting wave
    /// transition and spawn commands.
    pub fn handle<P>(
        &mut self,
        events: &[Event],
        wave_state: &WaveRuntimeState,
        outcome: RunOutcome,
        physics: &P,
        out: &mut Vec<Command>,
    ) where
        P: PhysicsQuery + ?Sized,
    {
        let mut elapsed = Duration::ZERO;
        let mut advanced = false;
        for event in events {
            if let Event::TimeAdvanced { dt } = event {
                elapsed = elapsed.saturating_add(*dt);
                advanced = true;
            } else {
                self.observe(event);
            }
        }

        if outcome != RunOutcome::InProgress {
            if !matches!(self.stage, Stage::Dormant | Stage::Finished | Stage::Halted) {
                info!(?outcome, "run over, wave scheduling halted");
                self.stage = Stage::Halted;
            }
            return;
        }

        if advanced {
            self.clock = self.clock.saturating_add(elapsed);
            self.advance(physics, out);
        }

        self.settle(wave_state, out);
    }

    fn observe(&mut self, event: &Event) {
        match event {
            Event::RunReset => {
                self.stage = Stage::Dormant;
                self.mix = ChaCha8Rng::seed_from_u64(self.config.rng_seed);
                self.finder.reset();
            }
            Event::SessionStarted => {
                if matches!(self.stage, Stage::Dormant) {
                    self.stage = Stage::AwaitingFirstWave {
                        starts_at: self.clock.saturating_add(self.config.initial_delay),
                    };
                }
            }
            Event::PlayerDied => self.stage = Stage::Halted,
            Event::AgentSpawned { .. } => {
                if let Stage::Spawning(progress) = &mut self.stage {
                    if progress.pending.take().is_some() {
                        progress.issued = progress.issued.saturating_add(1);
                        progress.failures = 0;
                    }
                }
            }
            Event::AgentSpawnRejected { kind, reason } => {
                let Stage::Spawning(progress) = &mut self.stage else {
                    return;
                };
                if progress.pending.take().is_none() {
                    return;
                }
                match reason {
                    SpawnRejection::PoolExhausted => {
                        defer_until_slot_frees(progress, self.config.retry, *kind);
                    }
                    SpawnRejection::NotSpawning | SpawnRejection::RunOver => {
                        warn!(?reason, "world refused spawning, wave scheduling halted");
                        self.stage = Stage::Halted;
                    }
                }
            }
            Event::WaveTransitionRejected { requested, current } => {
                warn!(
                    ?requested,
                    ?current,
                    "world rejected a scheduled wave transition"
                );
            }
            _ => {}
        }
    }

    fn advance<P>(&mut self, physics: &P, out: &mut Vec<Command>)
    where
        P: PhysicsQuery + ?Sized,
    {
        let now = self.clock;
        match &mut self.stage {
            Stage::AwaitingFirstWave { starts_at } => {
                if now >= *starts_at {
                    self.start_wave(WaveNumber::FIRST, out);
                }
            }
            Stage::BetweenWaves {
                cleared,
                countdown_at,
                starts_at,
                announced,
            } => {
                let next_wave = cleared.next();
                if now >= *starts_at {
                    self.start_wave(next_wave, out);
                } else if now >= *countdown_at {
                    let remaining = *starts_at - now;
                    let seconds = u32::try_from(
                        remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0),
                    )
                    .unwrap_or(u32::MAX);
                    if *announced != Some(seconds) {
                        *announced = Some(seconds);
                        out.push(Command::AnnounceCountdown {
                            next_wave,
                            seconds_remaining: seconds,
                        });
                    }
                }
            }
            _ => {}
        }

        self.drive_spawning(physics, out);
    }

    fn drive_spawning<P>(&mut self, physics: &P, out: &mut Vec<Command>)
    where
        P: PhysicsQuery + ?Sized,
    {
        let now = self.clock;
        let Stage::Spawning(progress) = &mut self.stage else {
            return;
        };
        if progress.pending.is_some() || progress.issued >= progress.config.zombie_count() {
            return;
        }

        let kind = match progress.retry.take() {
            Some(kind) => kind,
            None if now >= progress.next_spawn_at => {
                progress.next_spawn_at = progress
                    .next_spawn_at
                    .saturating_add(progress.config.spawn_delay());
                draw_kind(&mut self.mix, &progress.config)
            }
            None => return,
        };

        let body_radius = self
            .config
            .enemy_types
            .get(kind)
            .copied()
            .unwrap_or_else(|| self.config.enemy_types.fallback())
            .collider
            .footprint_radius();
        match self.finder.find_safe_spawn_point_for(physics, body_radius) {
            Some(position) => {
                progress.pending = Some(kind);
                out.push(Command::SpawnAgent { kind, position });
            }
            None => {
                if record_failure(progress, self.config.retry, kind) {
                    self.abandon(out);
                }
            }
        }
    }

    fn settle(&mut self, wave_state: &WaveRuntimeState, out: &mut Vec<Command>) {
        match &self.stage {
            Stage::Spawning(progress)
                if progress.pending.is_none()
                    && progress.retry.is_none()
                    && progress.issued >= progress.config.zombie_count() =>
            {
                let wave = progress.wave;
                debug!(wave = wave.get(), "wave fully issued");
                out.push(Command::FinishSpawning);
                self.stage = Stage::Active { wave };
            }
            Stage::Active { wave }
                if wave_state.status == WaveStatus::Active && wave_state.zombies_remaining == 0 =>
            {
                let wave = *wave;
                out.push(Command::ClearWave);
                self.enter_between_waves(wave, out);
            }
            _ => {}
        }
    }

    fn enter_between_waves(&mut self, cleared: WaveNumber, out: &mut Vec<Command>) {
        let exhausted = self.config.table.get(cleared.next()).is_none();
        if exhausted && self.config.final_wave == FinalWavePolicy::Victory {
            out.push(Command::DeclareVictory);
            self.stage = Stage::Finished;
            return;
        }

        let countdown_at = self.clock.saturating_add(self.config.cleared_display);
        self.stage = Stage::BetweenWaves {
            cleared,
            countdown_at,
            starts_at: countdown_at.saturating_add(self.config.countdown),
            announced: None,
        };
    }

    fn start_wave(&mut self, wave: WaveNumber, out: &mut Vec<Command>) {
        let config = match self.config.table.get(wave) {
            Some(config) => config.clone(),
            None => match (self.config.final_wave, self.config.table.last()) {
                (FinalWavePolicy::RepeatLast, Some(last)) => last.clone(),
                _ => {
                    self.stage = Stage::Finished;
                    return;
                }
            },
        };

        out.push(Command::StartWave {
            wave,
            total: config.zombie_count(),
        });
        self.stage = Stage::Spawning(SpawnProgress {
            wave,
            config,
            issued: 0,
            next_spawn_at: self.clock,
            pending: None,
            retry: None,
            failures: 0,
        });
    }

    fn abandon(&mut self, out: &mut Vec<Command>) {
        let Stage::Spawning(progress) = &self.stage else {
            return;
        };
        let wave = progress.wave;
        warn!(
            wave = wave.get(),
            issued = progress.issued,
            total = progress.config.zombie_count(),
            failures = progress.failures,
            "spawning kept failing, abandoning the rest of the wave"
        );
        out.push(Command::FinishSpawning);
        self.stage = Stage::Active { wave };
    }
}

/// Applies the retry policy to a failed spawn-point search. Returns `true`
/// when the rest of the wave must be abandoned.
fn record_failure(progress: &mut SpawnProgress, policy: SpawnRetryPolicy, kind: EnemyKind) -> bool {
    match policy {
        SpawnRetryPolicy::RetryNextTick {
            max_consecutive_failures,
        } => {
            progress.failures = progress.failures.saturating_add(1);
            if progress.failures >= max_consecutive_failures {
                return true;
            }
            progress.retry = Some(kind);
            false
        }
        SpawnRetryPolicy::Skip => {
            skip(progress, kind);
            false
        }
    }
}

/// Applies the retry policy to a spawn the world refused for lack of a slot.
/// Slots free up as agents die, so retrying never gives up.
fn defer_until_slot_frees(
    progress: &mut SpawnProgress,
    policy: SpawnRetryPolicy,
    kind: EnemyKind,
) {
    match policy {
        SpawnRetryPolicy::RetryNextTick { .. } => progress.retry = Some(kind),
        SpawnRetryPolicy::Skip => skip(progress, kind),
    }
}

fn skip(progress: &mut SpawnProgress, kind: EnemyKind) {
    progress.issued = progress.issued.saturating_add(1);
    debug!(wave = progress.wave.get(), %kind, "spawn skipped");
}

fn draw_kind(rng: &mut ChaCha8Rng, config: &WaveConfig) -> EnemyKind {
    let total = config.total_weight();
    if total == 0 {
        return EnemyKind::Standard;
    }
    config
        .select_kind(rng.gen_range(0..total))
        .unwrap_or(EnemyKind::Standard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weighted_draws_follow_the_table() {
        let config = WaveConfig::new(
            10,
            Duration::from_millis(100),
            vec![(EnemyKind::Standard, 3), (EnemyKind::Brute, 1)],
        );
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let brutes = (0..4_000)
            .filter(|_| draw_kind(&mut rng, &config) == EnemyKind::Brute)
            .count();
        assert!((800..1_200).contains(&brutes), "brutes drawn: {brutes}");
    }

    #[test]
    fn zero_weights_fall_back_to_standard() {
        let config = WaveConfig::new(1, Duration::from_millis(100), vec![(EnemyKind::Boss, 0)]);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(draw_kind(&mut rng, &config), EnemyKind::Standard);
    }

    #[test]
    fn retry_policy_abandons_after_the_bound() {
        let mut progress = SpawnProgress {
            wave: WaveNumber::FIRST,
            config: WaveConfig::new(3, Duration::from_millis(100), vec![(EnemyKind::Standard, 1)]),
            issued: 0,
            next_spawn_at: Duration::ZERO,
            pending: None,
            retry: None,
            failures: 0,
        };
        let policy = SpawnRetryPolicy::RetryNextTick {
            max_consecutive_failures: 2,
        };

        assert!(!record_failure(&mut progress, policy, EnemyKind::Brute));
        assert_eq!(progress.retry, Some(EnemyKind::Brute));
        assert!(record_failure(&mut progress, policy, EnemyKind::Brute));

        let mut skipped = progress.clone();
        skipped.failures = 0;
        assert!(!record_failure(&mut skipped, SpawnRetryPolicy::Skip, EnemyKind::Standard));
        assert_eq!(skipped.issued, 1);
    }

    #[test]
    fn exhausted_pool_never_counts_toward_the_bound() {
        let mut progress = SpawnProgress {
            wave: WaveNumber::FIRST,
            config: WaveConfig::new(3, Duration::from_millis(100), vec![(EnemyKind::Standard, 1)]),
            issued: 0,
            next_spawn_at: Duration::ZERO,
            pending: None,
            retry: None,
            failures: 0,
        };
        let policy = SpawnRetryPolicy::RetryNextTick {
            max_consecutive_failures: 1,
        };

        for _ in 0..1_000 {
            defer_until_slot_frees(&mut progress, policy, EnemyKind::Brute);
        }
        assert_eq!(progress.failures, 0);
        assert_eq!(progress.issued, 0);
        assert_eq!(progress.retry, Some(EnemyKind::Brute));

        defer_until_slot_frees(&mut progress, SpawnRetryPolicy::Skip, EnemyKind::Standard);
        assert_eq!(progress.issued, 1);
    }
}
