#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a headless Horde session.

mod arena;
mod session;

use std::time::Duration;

use anyhow::{ensure, Context, Result};
use clap::{Parser, ValueEnum};
use horde_system_waves::{FinalWavePolicy, SpawnRetryPolicy, DEFAULT_MAX_CONSECUTIVE_FAILURES};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::session::{AutoFire, Session, SessionConfig};

const DEFAULT_LOG_FILTER: &str = "info";

/// How failed spawns are handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum RetryMode {
    /// Retry on the next tick. Only failed point searches count toward the bound.
    Retry,
    /// Count the failed agent as issued.
    Skip,
}

/// What happens after the last configured wave.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum FinalWaveMode {
    /// Declare the run won.
    Victory,
    /// Keep repeating the last wave.
    RepeatLast,
}

/// Runs a headless wave-survival session and logs the event stream.
#[derive(Debug, Parser)]
#[command(author, version, about = "Headless Horde session", long_about = None)]
struct Args {
    /// Global seed every random stream is derived from.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Simulated seconds to run before stopping.
    #[arg(long, default_value_t = 300.0)]
    seconds: f64,

    /// Simulation ticks per second.
    #[arg(long, default_value_t = 60)]
    tick_rate: u32,

    /// Handling of spawns that fail for lack of a point or a pool slot.
    #[arg(long, value_enum, default_value_t = RetryMode::Retry)]
    retry: RetryMode,

    /// Consecutive failed spawn-point searches after which a retried wave
    /// stops spawning. A full pool waits for a free slot instead.
    #[arg(long, default_value_t = DEFAULT_MAX_CONSECUTIVE_FAILURES)]
    max_failures: u32,

    /// Behaviour once the wave table is exhausted.
    #[arg(long, value_enum, default_value_t = FinalWaveMode::Victory)]
    final_wave: FinalWaveMode,

    /// Player shots per second at the closest agent; zero disables auto-fire.
    #[arg(long, default_value_t = 2.0)]
    fire_rate: f64,

    /// Damage dealt by each player shot.
    #[arg(long, default_value_t = 40)]
    fire_damage: u32,

    /// Places the player on a raised platform that agents have to climb.
    #[arg(long, default_value_t = false)]
    elevated: bool,
}

impl Args {
    fn session_config(&self) -> Result<SessionConfig> {
        ensure!(self.tick_rate > 0, "tick rate must be positive");
        ensure!(
            self.fire_rate.is_finite() && self.fire_rate >= 0.0,
            "fire rate must be a non-negative number"
        );

        let auto_fire = if self.fire_rate > 0.0 {
            let interval = Duration::try_from_secs_f64(self.fire_rate.recip())
                .context("fire rate is out of range")?;
            Some(AutoFire::new(interval, self.fire_damage))
        } else {
            None
        };

        let retry = match self.retry {
            RetryMode::Retry => SpawnRetryPolicy::RetryNextTick {
                max_consecutive_failures: self.max_failures,
            },
            RetryMode::Skip => SpawnRetryPolicy::Skip,
        };
        let final_wave = match self.final_wave {
            FinalWaveMode::Victory => FinalWavePolicy::Victory,
            FinalWaveMode::RepeatLast => FinalWavePolicy::RepeatLast,
        };

        Ok(SessionConfig {
            seed: self.seed,
            tick: Duration::from_secs(1) / self.tick_rate,
            retry,
            final_wave,
            auto_fire,
            elevated: self.elevated,
        })
    }

    fn duration(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.seconds).context("session length must be non-negative")
    }
}

/// Entry point for the Horde command-line interface.
fn main() -> Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = args.session_config()?;
    let duration = args.duration()?;
    info!(seed = args.seed, seconds = args.seconds, "starting session");

    let summary = Session::new(config).run_for(duration);
    info!(
        elapsed_ms = summary.elapsed.as_millis() as u64,
        wave = summary.wave.map_or(0, |wave| wave.get()),
        status = ?summary.status,
        outcome = ?summary.outcome,
        score = summary.score,
        player_health = summary.player_health,
        events = summary.events,
        "session finished"
    );
    Ok(())
}
