//! Fixed-capacity pool of recyclable agent slots.
//!
//! Slots are allocated once and never destroyed. A slot's [`AgentId`] is
//! assigned at construction and survives every acquire/release cycle.
//! All operations assume a single writer: the simulation thread that owns
//! the [`crate::World`].

use std::time::Duration;

use glam::Vec3;
use horde_core::{
    physics::BodyHandle, AgentId, AgentSnapshot, EnemyKind, EnemyTypeConfig, HIT_FLASH_DURATION,
    OFF_MAP_POSITION,
};

/// Single pool slot describing one hostile agent.
#[derive(Clone, Debug)]
pub struct Agent {
    id: AgentId,
    kind: EnemyKind,
    stats: EnemyTypeConfig,
    position: Vec3,
    health: u32,
    is_dead: bool,
    is_hit: bool,
    hit_expires_at: Option<Duration>,
    yaw: f32,
    body: Option<BodyHandle>,
}

impl Agent {
    fn dormant(id: AgentId) -> Self {
        Self {
            id,
            kind: EnemyKind::Standard,
            stats: EnemyTypeConfig::standard(),
            position: OFF_MAP_POSITION,
            health: 0,
            is_dead: true,
            is_hit: false,
            hit_expires_at: None,
            yaw: 0.0,
            body: None,
        }
    }

    /// Stable identifier of the slot.
    #[must_use]
    pub const fn id(&self) -> AgentId {
        self.id
    }

    /// Enemy type assigned by the most recent acquire.
    #[must_use]
    pub const fn kind(&self) -> EnemyKind {
        self.kind
    }

    /// Statistics resolved by the most recent acquire.
    #[must_use]
    pub const fn stats(&self) -> &EnemyTypeConfig {
        &self.stats
    }

    /// Position of the agent's feet.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Health remaining.
    #[must_use]
    pub const fn health(&self) -> u32 {
        self.health
    }

    /// Reports whether the slot is free for reuse.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.is_dead
    }

    /// Reports whether the cosmetic hit flash is showing.
    #[must_use]
    pub const fn is_hit(&self) -> bool {
        self.is_hit
    }

    /// Physics body associated with the slot.
    #[must_use]
    pub const fn body(&self) -> Option<BodyHandle> {
        self.body
    }

    pub(crate) fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub(crate) fn set_yaw(&mut self, yaw: f32) {
        self.yaw = yaw;
    }

    fn flash(&mut self, now: Duration) {
        self.is_hit = true;
        self.hit_expires_at = Some(now.saturating_add(HIT_FLASH_DURATION));
    }

    fn retire(&mut self) -> Option<BodyHandle> {
        self.is_dead = true;
        self.health = 0;
        self.position = OFF_MAP_POSITION;
        self.body.take()
    }

    fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            id: self.id,
            kind: self.kind,
            position: self.position,
            health: self.health,
            is_hit: self.is_hit,
            yaw: self.yaw,
            body: self.body,
            stats: self.stats,
        }
    }
}

/// Result of applying damage to a slot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DamageOutcome {
    /// The slot was unknown or already dead; nothing changed.
    Ignored,
    /// The agent survived the hit.
    Hit {
        /// Health left after the hit.
        remaining: u32,
    },
    /// The hit reduced the agent's health to zero.
    Killed {
        /// Enemy type of the agent that died.
        kind: EnemyKind,
        /// Physics body detached from the slot, to be removed by the caller.
        body: Option<BodyHandle>,
    },
}

/// Result of forcing a slot back into the pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Released {
    /// Indicates whether the slot held a live agent before the release.
    pub was_active: bool,
    /// Physics body detached from the slot, to be removed by the caller.
    pub body: Option<BodyHandle>,
}

/// Fixed-capacity arena of agent slots.
#[derive(Clone, Debug)]
pub struct EnemyPool {
    slots: Vec<Agent>,
}

impl EnemyPool {
    /// Allocates `capacity` dead slots parked off the map.
    ///
    /// # Panics
    ///
    /// Panics when `capacity` is zero or exceeds the identifier range.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "enemy pool requires at least one slot");
        let slots = (0..capacity)
            .map(|index| {
                let id = u32::try_from(index).expect("pool capacity exceeds identifier range");
                Agent::dormant(AgentId::new(id))
            })
            .collect();
        Self { slots }
    }

    /// Number of slots allocated by the pool.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots currently holding a live agent.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|agent| !agent.is_dead).count()
    }

    /// Retrieves the slot with the provided identifier.
    #[must_use]
    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        let index = usize::try_from(id.get()).ok()?;
        self.slots.get(index).filter(|agent| agent.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        let index = usize::try_from(id.get()).ok()?;
        self.slots.get_mut(index).filter(|agent| agent.id == id)
    }

    /// Iterator over every slot, dead or alive, in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.slots.iter()
    }

    pub(crate) fn live_mut(&mut self) -> impl Iterator<Item = &mut Agent> {
        self.slots.iter_mut().filter(|agent| !agent.is_dead)
    }

    /// Brings the first dead slot to life with the provided type and position.
    ///
    /// Returns `None` when every slot is alive; the pool is left unchanged.
    pub fn acquire(
        &mut self,
        kind: EnemyKind,
        stats: EnemyTypeConfig,
        position: Vec3,
    ) -> Option<AgentId> {
        let agent = self.slots.iter_mut().find(|agent| agent.is_dead)?;
        agent.kind = kind;
        agent.stats = stats;
        agent.position = position;
        agent.health = stats.health.max(1);
        agent.is_dead = false;
        agent.is_hit = false;
        agent.hit_expires_at = None;
        agent.yaw = 0.0;
        agent.body = None;
        Some(agent.id)
    }

    /// Reduces the health of a live agent, clamped at zero.
    ///
    /// Every accepted hit restarts the slot's flash deadline. Damage against
    /// unknown or dead slots is ignored.
    pub fn damage(&mut self, id: AgentId, amount: u32, now: Duration) -> DamageOutcome {
        let Some(agent) = self.get_mut(id) else {
            return DamageOutcome::Ignored;
        };
        if agent.is_dead {
            return DamageOutcome::Ignored;
        }

        agent.health = agent.health.saturating_sub(amount);
        agent.flash(now);

        if agent.health > 0 {
            return DamageOutcome::Hit {
                remaining: agent.health,
            };
        }

        let kind = agent.kind;
        let body = agent.retire();
        DamageOutcome::Killed { kind, body }
    }

    /// Forces a slot dead, zeroes its health, and parks it off the map.
    ///
    /// Returns `None` for unknown identifiers.
    pub fn release(&mut self, id: AgentId) -> Option<Released> {
        let agent = self.get_mut(id)?;
        let was_active = !agent.is_dead;
        let body = agent.retire();
        Some(Released { was_active, body })
    }

    /// Associates a physics body with a slot. Returns `false` for unknown ids.
    pub fn set_physics_handle(&mut self, id: AgentId, body: Option<BodyHandle>) -> bool {
        match self.get_mut(id) {
            Some(agent) => {
                agent.body = body;
                true
            }
            None => false,
        }
    }

    /// Clears every hit flash whose deadline has passed.
    pub fn expire_hit_flashes(&mut self, now: Duration) {
        for agent in &mut self.slots {
            if agent.hit_expires_at.is_some_and(|deadline| deadline <= now) {
                agent.is_hit = false;
                agent.hit_expires_at = None;
            }
        }
    }

    /// Snapshots of every live agent in identifier order.
    #[must_use]
    pub fn live_snapshots(&self) -> Vec<AgentSnapshot> {
        self.slots
            .iter()
            .filter(|agent| !agent.is_dead)
            .map(Agent::snapshot)
            .collect()
    }

    /// Kills every slot and clears all flash state, returning detached bodies.
    pub(crate) fn recycle_all(&mut self) -> Vec<BodyHandle> {
        let mut bodies = Vec::new();
        for agent in &mut self.slots {
            if let Some(body) = agent.retire() {
                bodies.push(body);
            }
            agent.is_hit = false;
            agent.hit_expires_at = None;
            agent.yaw = 0.0;
        }
        bodies
    }
}
