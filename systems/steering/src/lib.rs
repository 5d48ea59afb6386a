#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that steers live agents toward the player.
//!
//! Each tick every agent seeks the player on the horizontal plane, probes the
//! environment with a centre ray and two whiskers, blends a tangential
//! avoidance vector into its desired velocity, and may climb walls when the
//! player stands above it. Agents that stop making progress receive an upward
//! impulse. Boss agents skip avoidance and seek directly.

use std::{collections::BTreeMap, f32::consts::FRAC_PI_6, time::Duration};

use glam::{Quat, Vec3};
use horde_core::{
    physics::{BodyHandle, CollisionGroups, PhysicsQuery, RayHit, RayQuery},
    AgentId, AgentSnapshot, AgentView, Command, EnemyKind, Event, PlayerSnapshot,
};
use tracing::debug;

/// Length of every obstacle probe ray.
pub const PROBE_DISTANCE: f32 = 1.5;

/// Angle between the centre ray and each whisker, in radians.
pub const WHISKER_ANGLE: f32 = FRAC_PI_6;

/// Hits whose normal has a smaller vertical component count as walls.
pub const WALL_NORMAL_THRESHOLD: f32 = 0.7;

/// Height the player must stand above an agent before it tries to climb.
pub const CLIMB_HEIGHT_ADVANTAGE: f32 = 1.0;

/// Minimum time between two wall climbs of the same agent.
pub const CLIMB_COOLDOWN: Duration = Duration::from_secs(4);

/// Forward component of the wall climb impulse.
pub const CLIMB_FORWARD_IMPULSE: f32 = 2.0;

/// Upward component of the wall climb impulse.
pub const CLIMB_UPWARD_IMPULSE: f32 = 6.0;

/// Share of the agent's speed contributed by the avoidance vector.
pub const AVOIDANCE_BLEND: f32 = 0.75;

/// Weight of a centre ray hit in the avoidance sum.
pub const CENTER_RAY_WEIGHT: f32 = 1.0;

/// Weight of a whisker hit in the avoidance sum.
pub const WHISKER_RAY_WEIGHT: f32 = 0.5;

/// Squared displacement below which an agent counts as not moving.
pub const STUCK_DISTANCE_SQUARED: f32 = 0.01;

/// Time an agent must fail to move before it is kicked loose.
pub const STUCK_WINDOW: Duration = Duration::from_millis(1_500);

/// Minimum time between two unstuck impulses of the same agent.
pub const UNSTUCK_COOLDOWN: Duration = Duration::from_secs(3);

/// Magnitude of the vertical unstuck impulse.
pub const UNSTUCK_IMPULSE: f32 = 8.0;

/// Configuration parameters required to construct the steering system.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    probe_distance: f32,
    whisker_angle: f32,
    climb_cooldown: Duration,
    stuck_window: Duration,
    unstuck_cooldown: Duration,
}

impl Config {
    /// Creates a configuration with the provided probe geometry and the
    /// default timers.
    #[must_use]
    pub const fn new(probe_distance: f32, whisker_angle: f32) -> Self {
        Self {
            probe_distance,
            whisker_angle,
            climb_cooldown: CLIMB_COOLDOWN,
            stuck_window: STUCK_WINDOW,
            unstuck_cooldown: UNSTUCK_COOLDOWN,
        }
    }

    /// Overrides the wall climb cooldown.
    #[must_use]
    pub const fn with_climb_cooldown(mut self, cooldown: Duration) -> Self {
        self.climb_cooldown = cooldown;
        self
    }

    /// Overrides the stuck window and the cooldown between unstuck impulses.
    #[must_use]
    pub const fn with_stuck_timers(mut self, window: Duration, cooldown: Duration) -> Self {
        self.stuck_window = window;
        self.unstuck_cooldown = cooldown;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(PROBE_DISTANCE, WHISKER_ANGLE)
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Memory {
    anchor: Option<Vec3>,
    stuck_for: Duration,
    unstuck_ready_at: Duration,
    climb_ready_at: Duration,
}

/// Steering system that converts agent state into velocity and impulse commands.
#[derive(Debug)]
pub struct Steering {
    config: Config,
    clock: Duration,
    memory: BTreeMap<AgentId, Memory>,
}

impl Steering {
    /// Creates a new steering system.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            clock: Duration::ZERO,
            memory: BTreeMap::new(),
        }
    }

    /// Number of agents with stuck or cooldown trackers.
    #[must_use]
    pub fn tracked_agents(&self) -> usize {
        self.memory.len()
    }

    /// Consumes world events and emits steering commands for every live agent.
    pub fn handle<P>(
        &mut self,
        events: &[Event],
        agents: &AgentView,
        player: &PlayerSnapshot,
        physics: &P,
        out: &mut Vec<Command>,
    ) where
        P: PhysicsQuery + ?Sized,
    {
        let mut elapsed = Duration::ZERO;
        for event in events {
            match event {
                Event::TimeAdvanced { dt } => elapsed = elapsed.saturating_add(*dt),
                Event::RunReset => self.memory.clear(),
                Event::AgentSpawned { agent, .. }
                | Event::AgentDied { agent, .. }
                | Event::AgentReleased { agent } => {
                    let _ = self.memory.remove(agent);
                }
                _ => {}
            }
        }

        if elapsed.is_zero() {
            return;
        }

        self.clock = self.clock.saturating_add(elapsed);
        self.memory.retain(|agent, _| agents.get(*agent).is_some());

        for agent in agents.iter() {
            self.steer(agent, player, physics, elapsed, out);
        }
    }

    fn steer<P>(
        &mut self,
        agent: &AgentSnapshot,
        player: &PlayerSnapshot,
        physics: &P,
        dt: Duration,
        out: &mut Vec<Command>,
    ) where
        P: PhysicsQuery + ?Sized,
    {
        let Some(body) = agent.body else {
            return;
        };
        let Some(centre) = physics.body_position(body) else {
            return;
        };

        let feet = centre - Vec3::Y * agent.stats.hitbox_offset;
        let offset = player.position - feet;
        let planar = Vec3::new(offset.x, 0.0, offset.z);
        let distance = planar.length();
        let yaw = if distance > f32::EPSILON {
            offset.x.atan2(offset.z)
        } else {
            agent.yaw
        };

        let speed = agent.stats.speed;
        let desired = if distance > agent.stats.attack_range {
            planar.normalize_or_zero() * speed
        } else {
            Vec3::ZERO
        };

        if agent.kind == EnemyKind::Boss {
            out.push(Command::SteerAgent {
                agent: agent.id,
                velocity: Some(desired),
                yaw,
            });
            return;
        }

        let config = self.config;
        let clock = self.clock;
        let memory = self.memory.entry(agent.id).or_default();

        let Some(direction) = desired.try_normalize() else {
            *memory = Memory {
                climb_ready_at: memory.climb_ready_at,
                ..Memory::default()
            };
            out.push(Command::SteerAgent {
                agent: agent.id,
                velocity: Some(Vec3::ZERO),
                yaw,
            });
            return;
        };

        let center_hit = probe(physics, &config, centre, direction, body);
        let climb = center_hit.is_some_and(|hit| hit.normal.y.abs() < WALL_NORMAL_THRESHOLD)
            && player.position.y - feet.y >= CLIMB_HEIGHT_ADVANTAGE
            && clock >= memory.climb_ready_at;

        let velocity = if climb {
            memory.climb_ready_at = clock.saturating_add(config.climb_cooldown);
            debug!(agent = agent.id.get(), "wall climb");
            out.push(Command::ImpulseAgent {
                agent: agent.id,
                impulse: direction * CLIMB_FORWARD_IMPULSE + Vec3::Y * CLIMB_UPWARD_IMPULSE,
            });
            None
        } else {
            let mut avoidance = Vec3::ZERO;
            if let Some(hit) = center_hit {
                avoidance += tangent(hit.normal, direction) * CENTER_RAY_WEIGHT;
            }
            for angle in [config.whisker_angle, -config.whisker_angle] {
                let whisker = Quat::from_rotation_y(angle) * direction;
                if let Some(hit) = probe(physics, &config, centre, whisker, body) {
                    avoidance += tangent(hit.normal, direction) * WHISKER_RAY_WEIGHT;
                }
            }
            Some(blend(desired, avoidance, speed))
        };

        out.push(Command::SteerAgent {
            agent: agent.id,
            velocity,
            yaw,
        });

        let anchor = *memory.anchor.get_or_insert(feet);
        if feet.distance_squared(anchor) < STUCK_DISTANCE_SQUARED {
            memory.stuck_for = memory.stuck_for.saturating_add(dt);
        } else {
            memory.anchor = Some(feet);
            memory.stuck_for = Duration::ZERO;
        }

        if memory.stuck_for >= config.stuck_window && clock >= memory.unstuck_ready_at {
            memory.anchor = Some(feet);
            memory.stuck_for = Duration::ZERO;
            memory.unstuck_ready_at = clock.saturating_add(config.unstuck_cooldown);
            debug!(agent = agent.id.get(), "unstuck impulse");
            out.push(Command::ImpulseAgent {
                agent: agent.id,
                impulse: Vec3::Y * UNSTUCK_IMPULSE,
            });
        }
    }
}

fn probe<P>(
    physics: &P,
    config: &Config,
    origin: Vec3,
    direction: Vec3,
    body: BodyHandle,
) -> Option<RayHit>
where
    P: PhysicsQuery + ?Sized,
{
    physics.cast_ray(&RayQuery {
        origin,
        direction,
        max_distance: config.probe_distance,
        filter: CollisionGroups::ENVIRONMENT,
        exclude: Some(body),
    })
}

/// Horizontal direction along the hit surface, oriented with the travel
/// direction. Floor and ceiling hits yield zero.
fn tangent(normal: Vec3, direction: Vec3) -> Vec3 {
    let flat = Vec3::new(normal.x, 0.0, normal.z).normalize_or_zero();
    let tangent = Vec3::new(-flat.z, 0.0, flat.x);
    if tangent.dot(direction) < 0.0 {
        -tangent
    } else {
        tangent
    }
}

fn blend(desired: Vec3, avoidance: Vec3, speed: f32) -> Vec3 {
    let Some(avoid) = avoidance.try_normalize() else {
        return desired;
    };
    let blended = desired + avoid * speed * AVOIDANCE_BLEND;
    blended
        .try_normalize()
        .map_or(desired, |direction| direction * speed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use horde_core::{
        physics::{ColliderRef, OverlapHit},
        EnemyTypeConfig,
    };

    struct StubPhysics {
        centre: Option<Vec3>,
        wall: Option<RayHit>,
    }

    impl PhysicsQuery for StubPhysics {
        fn cast_ray(&self, _ray: &RayQuery) -> Option<RayHit> {
            self.wall
        }

        fn intersect_sphere(
            &self,
            _center: Vec3,
            _radius: f32,
            _filter: CollisionGroups,
            _out: &mut Vec<OverlapHit>,
        ) {
        }

        fn body_position(&self, _body: BodyHandle) -> Option<Vec3> {
            self.centre
        }

        fn body_velocity(&self, _body: BodyHandle) -> Option<Vec3> {
            self.centre.map(|_| Vec3::ZERO)
        }
    }

    fn snapshot(kind: EnemyKind, stats: EnemyTypeConfig, body: Option<BodyHandle>) -> AgentSnapshot {
        AgentSnapshot {
            id: AgentId::new(0),
            kind,
            position: Vec3::new(10.0, 0.0, 0.0),
            health: stats.health,
            is_hit: false,
            yaw: 0.0,
            body,
            stats,
        }
    }

    fn player() -> PlayerSnapshot {
        PlayerSnapshot {
            position: Vec3::ZERO,
            health: 100,
            alive: true,
        }
    }

    fn tick() -> [Event; 1] {
        [Event::TimeAdvanced {
            dt: Duration::from_millis(100),
        }]
    }

    fn wall_hit() -> RayHit {
        RayHit {
            distance: 0.5,
            normal: Vec3::X,
            collider: ColliderRef::new(1),
            groups: CollisionGroups::ENVIRONMENT,
        }
    }

    #[test]
    fn ignores_batches_without_time() {
        let mut steering = Steering::new(Config::default());
        let view = AgentView::from_snapshots(vec![snapshot(
            EnemyKind::Standard,
            EnemyTypeConfig::standard(),
            Some(BodyHandle::new(0)),
        )]);
        let physics = StubPhysics {
            centre: Some(Vec3::new(10.0, 0.9, 0.0)),
            wall: None,
        };
        let mut out = Vec::new();

        steering.handle(&[Event::SessionStarted], &view, &player(), &physics, &mut out);

        assert!(out.is_empty());
    }

    #[test]
    fn missing_body_is_a_no_op() {
        let mut steering = Steering::new(Config::default());
        let view = AgentView::from_snapshots(vec![snapshot(
            EnemyKind::Standard,
            EnemyTypeConfig::standard(),
            None,
        )]);
        let physics = StubPhysics {
            centre: Some(Vec3::new(10.0, 0.9, 0.0)),
            wall: None,
        };
        let mut out = Vec::new();
        steering.handle(&tick(), &view, &player(), &physics, &mut out);
        assert!(out.is_empty());

        let view = AgentView::from_snapshots(vec![snapshot(
            EnemyKind::Standard,
            EnemyTypeConfig::standard(),
            Some(BodyHandle::new(4)),
        )]);
        let torn_down = StubPhysics {
            centre: None,
            wall: None,
        };
        steering.handle(&tick(), &view, &player(), &torn_down, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn agents_in_range_stop_and_face_the_player() {
        let mut steering = Steering::new(Config::default());
        let view = AgentView::from_snapshots(vec![snapshot(
            EnemyKind::Standard,
            EnemyTypeConfig::standard(),
            Some(BodyHandle::new(0)),
        )]);
        let physics = StubPhysics {
            centre: Some(Vec3::new(0.0, 0.9, 1.0)),
            wall: None,
        };
        let mut out = Vec::new();

        steering.handle(&tick(), &view, &player(), &physics, &mut out);

        match out.as_slice() {
            [Command::SteerAgent {
                velocity: Some(velocity),
                yaw,
                ..
            }] => {
                assert_eq!(*velocity, Vec3::ZERO);
                assert!((yaw.abs() - std::f32::consts::PI).abs() < 1e-5);
            }
            other => panic!("unexpected commands: {other:?}"),
        }
    }

    #[test]
    fn bosses_seek_directly_through_obstacles() {
        let mut steering = Steering::new(Config::default());
        let view = AgentView::from_snapshots(vec![snapshot(
            EnemyKind::Boss,
            EnemyTypeConfig::boss(),
            Some(BodyHandle::new(0)),
        )]);
        let physics = StubPhysics {
            centre: Some(Vec3::new(10.0, 2.5, 0.0)),
            wall: Some(wall_hit()),
        };
        let mut out = Vec::new();

        steering.handle(&tick(), &view, &player(), &physics, &mut out);

        let speed = EnemyTypeConfig::boss().speed;
        match out.as_slice() {
            [Command::SteerAgent {
                velocity: Some(velocity),
                ..
            }] => {
                assert!(velocity.abs_diff_eq(Vec3::new(-speed, 0.0, 0.0), 1e-5));
            }
            other => panic!("unexpected commands: {other:?}"),
        }
        assert_eq!(steering.tracked_agents(), 0);
    }

    #[test]
    fn avoidance_keeps_speed_and_turns_along_the_wall() {
        let mut steering = Steering::new(Config::default());
        let stats = EnemyTypeConfig::standard();
        let view = AgentView::from_snapshots(vec![snapshot(
            EnemyKind::Standard,
            stats,
            Some(BodyHandle::new(0)),
        )]);
        let physics = StubPhysics {
            centre: Some(Vec3::new(10.0, 0.9, 0.0)),
            wall: Some(wall_hit()),
        };
        let mut out = Vec::new();

        steering.handle(&tick(), &view, &player(), &physics, &mut out);

        let velocity = out
            .iter()
            .find_map(|command| match command {
                Command::SteerAgent { velocity, .. } => *velocity,
                _ => None,
            })
            .expect("steer command");
        assert!((velocity.length() - stats.speed).abs() < 1e-4);
        assert!(velocity.x < 0.0);
        assert!(velocity.z.abs() > 0.1);
        assert_eq!(velocity.y, 0.0);
    }

    #[test]
    fn stuck_agents_are_kicked_after_the_window_and_cooldown() {
        let mut steering = Steering::new(Config::default());
        let view = AgentView::from_snapshots(vec![snapshot(
            EnemyKind::Standard,
            EnemyTypeConfig::standard(),
            Some(BodyHandle::new(0)),
        )]);
        let physics = StubPhysics {
            centre: Some(Vec3::new(10.0, 0.9, 0.0)),
            wall: None,
        };

        let mut kicks = Vec::new();
        for step in 1..=45 {
            let mut out = Vec::new();
            steering.handle(&tick(), &view, &player(), &physics, &mut out);
            let kicked = out.iter().any(|command| {
                matches!(
                    command,
                    Command::ImpulseAgent { impulse, .. } if *impulse == Vec3::Y * UNSTUCK_IMPULSE
                )
            });
            if kicked {
                kicks.push(step);
            }
        }

        assert_eq!(kicks, vec![15, 45]);
    }

    fn unstuck_kick(out: &[Command]) -> bool {
        out.iter().any(|command| {
            matches!(
                command,
                Command::ImpulseAgent { impulse, .. } if *impulse == Vec3::Y * UNSTUCK_IMPULSE
            )
        })
    }

    fn player_at(x: f32) -> PlayerSnapshot {
        PlayerSnapshot {
            position: Vec3::new(x, 0.0, 0.0),
            ..player()
        }
    }

    fn stationary_agent() -> (AgentView, StubPhysics) {
        let view = AgentView::from_snapshots(vec![snapshot(
            EnemyKind::Standard,
            EnemyTypeConfig::standard(),
            Some(BodyHandle::new(0)),
        )]);
        let physics = StubPhysics {
            centre: Some(Vec3::new(10.0, 0.9, 0.0)),
            wall: None,
        };
        (view, physics)
    }

    /// Ticks with the player far away and returns the 1-based ticks that kicked.
    fn chase(
        steering: &mut Steering,
        view: &AgentView,
        physics: &StubPhysics,
        ticks: usize,
    ) -> Vec<usize> {
        let mut kicks = Vec::new();
        for step in 1..=ticks {
            let mut out = Vec::new();
            steering.handle(&tick(), view, &player(), physics, &mut out);
            if unstuck_kick(&out) {
                kicks.push(step);
            }
        }
        kicks
    }

    #[test]
    fn reaching_the_player_restarts_the_stuck_window() {
        let mut steering = Steering::new(Config::default());
        let (view, physics) = stationary_agent();

        assert!(chase(&mut steering, &view, &physics, 14).is_empty());

        let mut out = Vec::new();
        steering.handle(&tick(), &view, &player_at(9.0), &physics, &mut out);
        assert!(!unstuck_kick(&out));
        assert!(out.iter().any(|command| matches!(
            command,
            Command::SteerAgent { velocity: Some(velocity), .. } if *velocity == Vec3::ZERO
        )));

        assert_eq!(chase(&mut steering, &view, &physics, 15), vec![15]);
    }

    #[test]
    fn reaching_the_player_clears_the_unstuck_cooldown() {
        let mut steering = Steering::new(Config::default());
        let (view, physics) = stationary_agent();

        assert_eq!(chase(&mut steering, &view, &physics, 15), vec![15]);

        let mut out = Vec::new();
        steering.handle(&tick(), &view, &player_at(9.0), &physics, &mut out);

        // Well inside the three second cooldown of the first kick.
        assert_eq!(chase(&mut steering, &view, &physics, 15), vec![15]);
    }

    #[test]
    fn reset_and_death_forget_agent_trackers() {
        let mut steering = Steering::new(Config::default());
        let view = AgentView::from_snapshots(vec![snapshot(
            EnemyKind::Standard,
            EnemyTypeConfig::standard(),
            Some(BodyHandle::new(0)),
        )]);
        let physics = StubPhysics {
            centre: Some(Vec3::new(10.0, 0.9, 0.0)),
            wall: None,
        };
        let mut out = Vec::new();

        steering.handle(&tick(), &view, &player(), &physics, &mut out);
        assert_eq!(steering.tracked_agents(), 1);

        steering.handle(&[Event::RunReset], &view, &player(), &physics, &mut out);
        assert_eq!(steering.tracked_agents(), 0);

        steering.handle(&tick(), &view, &player(), &physics, &mut out);
        steering.handle(
            &[Event::AgentDied {
                agent: AgentId::new(0),
                kind: EnemyKind::Standard,
            }],
            &view,
            &player(),
            &physics,
            &mut out,
        );
        assert_eq!(steering.tracked_agents(), 0);
    }

    #[test]
    fn tangent_follows_travel_direction() {
        let along = tangent(Vec3::X, Vec3::new(-0.8, 0.0, 0.6));
        assert!(along.z > 0.0);
        let against = tangent(Vec3::X, Vec3::new(-0.8, 0.0, -0.6));
        assert!(against.z < 0.0);
        assert_eq!(tangent(Vec3::Y, Vec3::X), Vec3::ZERO);
    }
}
