use std::time::Duration;

use glam::Vec3;
use horde_core::{
    physics::{
        BodyDesc, BodyKind, CollisionGroups, PhysicsPort, PhysicsQuery, RayQuery,
    },
    ColliderShape,
};
use horde_physics_headless::{HeadlessPhysics, GROUND_COLLIDER};

fn cube(position: Vec3) -> BodyDesc {
    BodyDesc {
        kind: BodyKind::Dynamic,
        shape: ColliderShape::Cuboid {
            half_extents: Vec3::splat(0.5),
        },
        position,
        groups: CollisionGroups::AGENT,
    }
}

fn down_from(origin: Vec3) -> RayQuery {
    RayQuery {
        origin,
        direction: Vec3::NEG_Y,
        max_distance: 100.0,
        filter: CollisionGroups::ENVIRONMENT,
        exclude: None,
    }
}

#[test]
fn downward_ray_reports_ground_distance() {
    let physics = HeadlessPhysics::new();
    let hit = physics
        .cast_ray(&down_from(Vec3::new(3.0, 50.0, -4.0)))
        .expect("ground hit");
    assert!((hit.distance - 50.0).abs() < 1e-4);
    assert_eq!(hit.normal, Vec3::Y);
    assert_eq!(hit.collider, GROUND_COLLIDER);
}

#[test]
fn ray_stops_at_box_top_before_ground() {
    let mut physics = HeadlessPhysics::new();
    let roof = physics.add_static_box(
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::splat(1.0),
        CollisionGroups::ENVIRONMENT,
    );
    let hit = physics
        .cast_ray(&down_from(Vec3::new(0.0, 10.0, 0.0)))
        .expect("roof hit");
    assert_eq!(hit.collider, roof);
    assert!((hit.distance - 8.0).abs() < 1e-4);
}

#[test]
fn ray_filter_and_exclusion_skip_colliders() {
    let mut physics = HeadlessPhysics::without_ground();
    let body = physics.create_body(&cube(Vec3::new(0.0, 0.0, 3.0)));
    let forward = RayQuery {
        origin: Vec3::ZERO,
        direction: Vec3::Z,
        max_distance: 10.0,
        filter: CollisionGroups::ENVIRONMENT,
        exclude: None,
    };
    assert!(physics.cast_ray(&forward).is_none(), "agents are filtered out");

    let all = RayQuery {
        filter: CollisionGroups::ALL,
        ..forward
    };
    let hit = physics.cast_ray(&all).expect("agent hit");
    assert_eq!(hit.normal, Vec3::NEG_Z);

    let excluded = RayQuery {
        exclude: Some(body),
        ..all
    };
    assert!(physics.cast_ray(&excluded).is_none());
}

#[test]
fn sphere_query_reports_ground_and_props() {
    let mut physics = HeadlessPhysics::new();
    let crate_box = physics.add_static_box(
        Vec3::new(2.0, 0.5, 0.0),
        Vec3::splat(0.5),
        CollisionGroups::PROP,
    );

    let mut hits = Vec::new();
    physics.intersect_sphere(Vec3::new(0.0, 0.1, 0.0), 0.5, CollisionGroups::ALL, &mut hits);
    assert_eq!(hits.len(), 1);
    assert!(hits[0].groups.is_environment_only());

    hits.clear();
    physics.intersect_sphere(Vec3::new(1.3, 0.1, 0.0), 0.5, CollisionGroups::ALL, &mut hits);
    assert!(hits.iter().any(|hit| hit.collider == crate_box));
}

#[test]
fn dynamic_bodies_fall_and_rest_on_ground() {
    let mut physics = HeadlessPhysics::new();
    let body = physics.create_body(&cube(Vec3::new(0.0, 3.0, 0.0)));
    for _ in 0..240 {
        physics.step(Duration::from_millis(16));
    }
    let position = physics.body_position(body).expect("body");
    assert!((position.y - 0.5).abs() < 1e-4);
    assert_eq!(physics.body_velocity(body).map(|v| v.y), Some(0.0));
}

#[test]
fn walls_push_bodies_back_and_cancel_velocity() {
    let mut physics = HeadlessPhysics::new();
    let _ = physics.add_static_box(
        Vec3::new(0.0, 1.0, 2.0),
        Vec3::new(5.0, 1.0, 0.5),
        CollisionGroups::ENVIRONMENT,
    );
    let body = physics.create_body(&cube(Vec3::new(0.0, 0.5, 0.0)));
    assert!(physics.set_velocity(body, Vec3::new(0.0, 0.0, 3.0)));

    for _ in 0..60 {
        physics.step(Duration::from_millis(16));
    }

    let position = physics.body_position(body).expect("body");
    assert!(position.z <= 1.0 + 1e-4, "body stays in front of the wall");
    assert_eq!(physics.body_velocity(body).map(|v| v.z), Some(0.0));
}

#[test]
fn impulses_and_removal_follow_body_lifetime() {
    let mut physics = HeadlessPhysics::new().with_gravity(0.0);
    let body = physics.create_body(&cube(Vec3::new(0.0, 0.5, 0.0)));
    assert!(physics.apply_impulse(body, Vec3::new(0.0, 8.0, 0.0)));
    assert_eq!(physics.body_velocity(body), Some(Vec3::new(0.0, 8.0, 0.0)));

    assert!(physics.remove_body(body));
    assert_eq!(physics.body_count(), 0);
    assert!(!physics.remove_body(body));
    assert!(!physics.apply_impulse(body, Vec3::Y));
    assert!(physics.body_position(body).is_none());
}
