//! Static arena geometry used by headless sessions.

use glam::Vec3;
use horde_core::physics::{BodyDesc, BodyKind, CollisionGroups, PhysicsPort};
use horde_core::ColliderShape;
use horde_physics_headless::HeadlessPhysics;

/// Distance from the arena centre to the inner face of each boundary wall.
const ARENA_HALF_EXTENT: f32 = 40.0;

const WALL_HEIGHT: f32 = 4.0;
const WALL_HALF_THICKNESS: f32 = 0.5;

/// Pillars ring the player close enough to force avoidance on the approach.
const PILLAR_RING_RADIUS: f32 = 10.0;
const PILLAR_COUNT: u32 = 6;
const PILLAR_HALF_EXTENTS: Vec3 = Vec3::new(0.6, 1.5, 0.6);

/// Crates sit inside the spawn annulus and reject spawn points that overlap them.
const CRATE_POSITIONS: [Vec3; 4] = [
    Vec3::new(20.0, 0.5, 4.0),
    Vec3::new(-18.0, 0.5, 12.0),
    Vec3::new(6.0, 0.5, -24.0),
    Vec3::new(-26.0, 0.5, -9.0),
];
const CRATE_HALF_EXTENTS: Vec3 = Vec3::new(0.5, 0.5, 0.5);

/// Low enough for a climb impulse to clear, high enough to trigger one.
const PLATFORM_HALF_EXTENTS: Vec3 = Vec3::new(3.0, 0.75, 3.0);

const PLAYER_RADIUS: f32 = 0.4;
const PLAYER_HALF_HEIGHT: f32 = 0.5;

/// Physics backend populated with the arena and the player's position.
#[derive(Debug)]
pub(crate) struct Arena {
    pub(crate) physics: HeadlessPhysics,
    pub(crate) player_position: Vec3,
}

/// Builds the arena. An elevated arena places the player on a central platform.
pub(crate) fn build(elevated: bool) -> Arena {
    let mut physics = HeadlessPhysics::new();

    let wall_center = ARENA_HALF_EXTENT + WALL_HALF_THICKNESS;
    let span = ARENA_HALF_EXTENT + 2.0 * WALL_HALF_THICKNESS;
    let half_height = WALL_HEIGHT / 2.0;
    for sign in [-1.0, 1.0] {
        let _ = physics.add_static_box(
            Vec3::new(sign * wall_center, half_height, 0.0),
            Vec3::new(WALL_HALF_THICKNESS, half_height, span),
            CollisionGroups::ENVIRONMENT,
        );
        let _ = physics.add_static_box(
            Vec3::new(0.0, half_height, sign * wall_center),
            Vec3::new(span, half_height, WALL_HALF_THICKNESS),
            CollisionGroups::ENVIRONMENT,
        );
    }

    for index in 0..PILLAR_COUNT {
        let angle = std::f32::consts::TAU * index as f32 / PILLAR_COUNT as f32;
        let center = Vec3::new(
            PILLAR_RING_RADIUS * angle.cos(),
            PILLAR_HALF_EXTENTS.y,
            PILLAR_RING_RADIUS * angle.sin(),
        );
        let _ = physics.add_static_box(center, PILLAR_HALF_EXTENTS, CollisionGroups::ENVIRONMENT);
    }

    for position in CRATE_POSITIONS {
        let _ = physics.add_static_box(position, CRATE_HALF_EXTENTS, CollisionGroups::PROP);
    }

    let player_position = if elevated {
        let _ = physics.add_static_box(
            Vec3::new(0.0, PLATFORM_HALF_EXTENTS.y, 0.0),
            PLATFORM_HALF_EXTENTS,
            CollisionGroups::ENVIRONMENT,
        );
        Vec3::new(0.0, 2.0 * PLATFORM_HALF_EXTENTS.y, 0.0)
    } else {
        Vec3::ZERO
    };

    let _ = physics.create_body(&BodyDesc {
        kind: BodyKind::Kinematic,
        shape: ColliderShape::Capsule {
            radius: PLAYER_RADIUS,
            half_height: PLAYER_HALF_HEIGHT,
        },
        position: player_position + Vec3::Y * (PLAYER_HALF_HEIGHT + PLAYER_RADIUS),
        groups: CollisionGroups::PLAYER,
    });

    Arena {
        physics,
        player_position,
    }
}
