#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that lets agents in range damage the player.

use std::{collections::BTreeMap, time::Duration};

use horde_core::{
    planar_distance, AgentId, AgentSnapshot, AgentView, Command, Event, PlayerSnapshot,
    DEFAULT_ATTACK_DAMAGE,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Configuration parameters required to construct the attack system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    default_damage: u32,
    rng_seed: u64,
}

impl Config {
    /// Creates a configuration using the provided fallback damage and seed.
    #[must_use]
    pub const fn new(default_damage: u32, rng_seed: u64) -> Self {
        Self {
            default_damage,
            rng_seed,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_ATTACK_DAMAGE, 0)
    }
}

/// Attack resolver that emits player damage for agents whose cooldown elapsed.
#[derive(Debug)]
pub struct Attack {
    config: Config,
    clock: Duration,
    ready_at: BTreeMap<AgentId, Duration>,
    rng: ChaCha8Rng,
}

impl Attack {
    /// Creates a new attack system.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            clock: Duration::ZERO,
            ready_at: BTreeMap::new(),
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
        }
    }

    /// Consumes world events and emits `Command::DamagePlayer` for every agent
    /// that is in range with its cooldown elapsed.
    pub fn handle(
        &mut self,
        events: &[Event],
        agents: &AgentView,
        player: &PlayerSnapshot,
        out: &mut Vec<Command>,
    ) {
        let mut elapsed = Duration::ZERO;
        for event in events {
            match event {
                Event::TimeAdvanced { dt } => elapsed = elapsed.saturating_add(*dt),
                Event::RunReset => {
                    self.ready_at.clear();
                    self.rng = ChaCha8Rng::seed_from_u64(self.config.rng_seed);
                }
                Event::AgentSpawned { agent, .. }
                | Event::AgentDied { agent, .. }
                | Event::AgentReleased { agent } => {
                    let _ = self.ready_at.remove(agent);
                }
                _ => {}
            }
        }

        if elapsed.is_zero() {
            return;
        }
        self.clock = self.clock.saturating_add(elapsed);

        if !player.alive {
            return;
        }

        for agent in agents.iter() {
            if planar_distance(agent.position, player.position) > agent.stats.attack_range {
                continue;
            }
            let ready = self
                .ready_at
                .get(&agent.id)
                .map_or(true, |deadline| self.clock >= *deadline);
            if !ready {
                continue;
            }

            let amount = self.roll_damage(agent);
            let _ = self
                .ready_at
                .insert(agent.id, self.clock.saturating_add(agent.stats.cooldown()));
            out.push(Command::DamagePlayer {
                agent: agent.id,
                amount,
            });
        }
    }

    fn roll_damage(&mut self, agent: &AgentSnapshot) -> u32 {
        match agent.stats.damage {
            Some(range) => self.rng.gen_range(range.min()..=range.max()),
            None => self.config.default_damage,
        }
    }
}
