#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic in-process physics backend for headless Horde sessions.
//!
//! The backend models an optional infinite ground plane, static boxes, and
//! dynamic or kinematic bodies approximated by axis-aligned boxes. It is not a
//! general purpose engine: dynamic bodies fall under gravity and are pushed
//! out of static geometry, but never collide with each other.

use std::{collections::BTreeMap, time::Duration};

use glam::Vec3;
use horde_core::physics::{
    BodyDesc, BodyHandle, BodyKind, ColliderRef, CollisionGroups, OverlapHit, PhysicsPort,
    PhysicsQuery, RayHit, RayQuery,
};

/// Gravitational acceleration applied along the vertical axis by default.
pub const DEFAULT_GRAVITY: f32 = -9.81;

/// Collider reference reported for hits against the ground plane.
pub const GROUND_COLLIDER: ColliderRef = ColliderRef::new(0);

#[derive(Clone, Copy, Debug, PartialEq)]
struct Aabb {
    center: Vec3,
    half_extents: Vec3,
}

impl Aabb {
    fn min(&self) -> Vec3 {
        self.center - self.half_extents
    }

    fn max(&self) -> Vec3 {
        self.center + self.half_extents
    }

    fn overlaps_sphere(&self, center: Vec3, radius: f32) -> bool {
        let closest = center.clamp(self.min(), self.max());
        closest.distance_squared(center) <= radius * radius
    }

    /// Slab test. Origins inside the box report a hit at distance zero facing
    /// back along the ray.
    fn intersect_ray(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<(f32, Vec3)> {
        let min = self.min();
        let max = self.max();
        let mut t_near = f32::NEG_INFINITY;
        let mut t_far = f32::INFINITY;
        let mut normal = Vec3::ZERO;

        for axis in 0..3 {
            let start = origin[axis];
            let step = direction[axis];
            if step.abs() <= f32::EPSILON {
                if start < min[axis] || start > max[axis] {
                    return None;
                }
                continue;
            }

            let inverse = step.recip();
            let mut entry = (min[axis] - start) * inverse;
            let mut exit = (max[axis] - start) * inverse;
            if entry > exit {
                std::mem::swap(&mut entry, &mut exit);
            }
            if entry > t_near {
                t_near = entry;
                normal = Vec3::ZERO;
                normal[axis] = -step.signum();
            }
            t_far = t_far.min(exit);
            if t_near > t_far {
                return None;
            }
        }

        if t_far < 0.0 {
            return None;
        }
        if t_near < 0.0 {
            return Some((0.0, -direction));
        }
        (t_near <= max_distance).then_some((t_near, normal))
    }

    /// Smallest translation that moves `self` out of `obstacle`.
    fn separation(&self, obstacle: &Self) -> Option<Vec3> {
        let delta = self.center - obstacle.center;
        let overlap = self.half_extents + obstacle.half_extents - delta.abs();
        if overlap.min_element() <= 0.0 {
            return None;
        }

        let mut axis = 0;
        for candidate in 1..3 {
            if overlap[candidate] < overlap[axis] {
                axis = candidate;
            }
        }
        let mut correction = Vec3::ZERO;
        correction[axis] = if delta[axis] >= 0.0 {
            overlap[axis]
        } else {
            -overlap[axis]
        };
        Some(correction)
    }
}

#[derive(Clone, Debug)]
struct StaticCollider {
    collider: ColliderRef,
    groups: CollisionGroups,
    bounds: Aabb,
}

#[derive(Clone, Debug)]
struct Body {
    kind: BodyKind,
    collider: ColliderRef,
    groups: CollisionGroups,
    bounds: Aabb,
    velocity: Vec3,
}

/// Headless implementation of the physics port.
#[derive(Clone, Debug)]
pub struct HeadlessPhysics {
    gravity: f32,
    ground: Option<f32>,
    statics: Vec<StaticCollider>,
    bodies: BTreeMap<BodyHandle, Body>,
    next_body: u32,
    next_collider: u32,
}

impl HeadlessPhysics {
    /// Creates a backend with a ground plane at height zero and default gravity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            gravity: DEFAULT_GRAVITY,
            ground: Some(0.0),
            statics: Vec::new(),
            bodies: BTreeMap::new(),
            next_body: 0,
            next_collider: GROUND_COLLIDER.get() + 1,
        }
    }

    /// Creates a backend with nothing below the bodies.
    #[must_use]
    pub fn without_ground() -> Self {
        Self {
            ground: None,
            ..Self::new()
        }
    }

    /// Overrides the vertical gravitational acceleration.
    #[must_use]
    pub fn with_gravity(mut self, gravity: f32) -> Self {
        self.gravity = gravity;
        self
    }

    /// Adds an immovable box and returns its collider reference.
    pub fn add_static_box(
        &mut self,
        center: Vec3,
        half_extents: Vec3,
        groups: CollisionGroups,
    ) -> ColliderRef {
        let collider = self.allocate_collider();
        self.statics.push(StaticCollider {
            collider,
            groups,
            bounds: Aabb {
                center,
                half_extents: half_extents.abs(),
            },
        });
        collider
    }

    /// Teleports a body, typically a kinematic player body. Returns `false`
    /// when the body does not exist.
    pub fn set_body_position(&mut self, body: BodyHandle, position: Vec3) -> bool {
        match self.bodies.get_mut(&body) {
            Some(entry) => {
                entry.bounds.center = position;
                true
            }
            None => false,
        }
    }

    /// Number of bodies currently simulated.
    #[must_use]
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Integrates every dynamic body by `dt`.
    pub fn step(&mut self, dt: Duration) {
        let seconds = dt.as_secs_f32();
        for body in self.bodies.values_mut() {
            if body.kind != BodyKind::Dynamic {
                continue;
            }

            body.velocity.y += self.gravity * seconds;
            body.bounds.center += body.velocity * seconds;

            for obstacle in &self.statics {
                let Some(correction) = body.bounds.separation(&obstacle.bounds) else {
                    continue;
                };
                body.bounds.center += correction;
                for axis in 0..3 {
                    if body.velocity[axis] * correction[axis] < 0.0 {
                        body.velocity[axis] = 0.0;
                    }
                }
            }

            if let Some(ground) = self.ground {
                let floor = ground + body.bounds.half_extents.y;
                if body.bounds.center.y < floor {
                    body.bounds.center.y = floor;
                    body.velocity.y = body.velocity.y.max(0.0);
                }
            }
        }
    }

    fn allocate_collider(&mut self) -> ColliderRef {
        let collider = ColliderRef::new(self.next_collider);
        self.next_collider += 1;
        collider
    }

    fn boxes(
        &self,
    ) -> impl Iterator<Item = (ColliderRef, CollisionGroups, Option<BodyHandle>, Aabb)> + '_ {
        let statics = self
            .statics
            .iter()
            .map(|entry| (entry.collider, entry.groups, None, entry.bounds));
        let bodies = self
            .bodies
            .iter()
            .map(|(handle, body)| (body.collider, body.groups, Some(*handle), body.bounds));
        statics.chain(bodies)
    }
}

impl Default for HeadlessPhysics {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsQuery for HeadlessPhysics {
    fn cast_ray(&self, ray: &RayQuery) -> Option<RayHit> {
        let direction = ray.direction.try_normalize()?;
        let mut closest: Option<RayHit> = None;

        if let Some(ground) = self.ground {
            if ray.filter.intersects(CollisionGroups::ENVIRONMENT)
                && direction.y < 0.0
                && ray.origin.y >= ground
            {
                let distance = (ray.origin.y - ground) / -direction.y;
                if distance <= ray.max_distance {
                    closest = Some(RayHit {
                        distance,
                        normal: Vec3::Y,
                        collider: GROUND_COLLIDER,
                        groups: CollisionGroups::ENVIRONMENT,
                    });
                }
            }
        }

        for (collider, groups, owner, bounds) in self.boxes() {
            if !groups.intersects(ray.filter) || (owner.is_some() && owner == ray.exclude) {
                continue;
            }
            let Some((distance, normal)) =
                bounds.intersect_ray(ray.origin, direction, ray.max_distance)
            else {
                continue;
            };
            if closest.map_or(true, |hit| distance < hit.distance) {
                closest = Some(RayHit {
                    distance,
                    normal,
                    collider,
                    groups,
                });
            }
        }

        closest
    }

    fn intersect_sphere(
        &self,
        center: Vec3,
        radius: f32,
        filter: CollisionGroups,
        out: &mut Vec<OverlapHit>,
    ) {
        if let Some(ground) = self.ground {
            if filter.intersects(CollisionGroups::ENVIRONMENT) && center.y - radius <= ground {
                out.push(OverlapHit {
                    collider: GROUND_COLLIDER,
                    groups: CollisionGroups::ENVIRONMENT,
                });
            }
        }

        for (collider, groups, _, bounds) in self.boxes() {
            if groups.intersects(filter) && bounds.overlaps_sphere(center, radius) {
                out.push(OverlapHit { collider, groups });
            }
        }
    }

    fn body_position(&self, body: BodyHandle) -> Option<Vec3> {
        self.bodies.get(&body).map(|entry| entry.bounds.center)
    }

    fn body_velocity(&self, body: BodyHandle) -> Option<Vec3> {
        self.bodies.get(&body).map(|entry| entry.velocity)
    }
}

impl PhysicsPort for HeadlessPhysics {
    fn create_body(&mut self, desc: &BodyDesc) -> BodyHandle {
        let handle = BodyHandle::new(self.next_body);
        self.next_body += 1;
        let collider = self.allocate_collider();
        let _ = self.bodies.insert(
            handle,
            Body {
                kind: desc.kind,
                collider,
                groups: desc.groups,
                bounds: Aabb {
                    center: desc.position,
                    half_extents: desc.shape.half_extents(),
                },
                velocity: Vec3::ZERO,
            },
        );
        handle
    }

    fn remove_body(&mut self, body: BodyHandle) -> bool {
        self.bodies.remove(&body).is_some()
    }

    fn apply_impulse(&mut self, body: BodyHandle, impulse: Vec3) -> bool {
        match self.bodies.get_mut(&body) {
            Some(entry) if entry.kind == BodyKind::Dynamic => {
                entry.velocity += impulse;
                true
            }
            Some(_) => true,
            None => false,
        }
    }

    fn set_velocity(&mut self, body: BodyHandle, velocity: Vec3) -> bool {
        match self.bodies.get_mut(&body) {
            Some(entry) => {
                entry.velocity = velocity;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slab_test_reports_entry_face_normal() {
        let bounds = Aabb {
            center: Vec3::new(5.0, 0.0, 0.0),
            half_extents: Vec3::ONE,
        };
        let (distance, normal) = bounds
            .intersect_ray(Vec3::ZERO, Vec3::X, 10.0)
            .expect("hit");
        assert!((distance - 4.0).abs() < 1e-5);
        assert_eq!(normal, Vec3::NEG_X);

        assert!(bounds.intersect_ray(Vec3::ZERO, Vec3::X, 3.0).is_none());
        assert!(bounds.intersect_ray(Vec3::ZERO, Vec3::NEG_X, 10.0).is_none());
    }

    #[test]
    fn separation_uses_shallowest_axis() {
        let obstacle = Aabb {
            center: Vec3::ZERO,
            half_extents: Vec3::ONE,
        };
        let body = Aabb {
            center: Vec3::new(0.0, 1.2, 0.2),
            half_extents: Vec3::splat(0.5),
        };
        let correction = body.separation(&obstacle).expect("overlap");
        assert!((correction.y - 0.3).abs() < 1e-5);
        assert_eq!(correction.x, 0.0);
        assert_eq!(correction.z, 0.0);
    }
}
