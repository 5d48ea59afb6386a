//! Boundary contracts for the external physics engine.
//!
//! The simulation never integrates bodies itself. It asks a physics backend
//! for ray casts and overlap queries, reads back authoritative body state,
//! and writes velocities and impulses for the next engine step.

use std::ops::BitOr;

use glam::Vec3;

use crate::ColliderShape;

/// Opaque reference to a rigid body owned by the physics backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(u32);

impl BodyHandle {
    /// Creates a new body handle with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the handle.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Opaque reference to a collider owned by the physics backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColliderRef(u32);

impl ColliderRef {
    /// Creates a new collider reference with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the reference.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Bit set of collision categories used for membership and query filters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CollisionGroups(u32);

impl CollisionGroups {
    /// Matches nothing.
    pub const NONE: Self = Self(0);
    /// Static level geometry: ground, walls, ramps.
    pub const ENVIRONMENT: Self = Self(1 << 0);
    /// Pooled hostile agents.
    pub const AGENT: Self = Self(1 << 1);
    /// The player character.
    pub const PLAYER: Self = Self(1 << 2);
    /// Dynamic props and pickups placed in the arena.
    pub const PROP: Self = Self(1 << 3);
    /// Matches every category.
    pub const ALL: Self = Self(u32::MAX);

    /// Reports whether every bit of `other` is set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Reports whether `self` and `other` share at least one bit.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Reports whether the groups consist solely of environment geometry.
    #[must_use]
    pub const fn is_environment_only(self) -> bool {
        self.0 != 0 && self.0 & !Self::ENVIRONMENT.0 == 0
    }
}

impl BitOr for CollisionGroups {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Parameters of a single ray cast.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayQuery {
    /// Starting point of the ray.
    pub origin: Vec3,
    /// Unit direction of travel.
    pub direction: Vec3,
    /// Maximum distance along `direction` that is tested.
    pub max_distance: f32,
    /// Categories the ray may hit.
    pub filter: CollisionGroups,
    /// Body whose colliders are ignored, typically the caster's own.
    pub exclude: Option<BodyHandle>,
}

/// Closest intersection reported by a ray cast.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    /// Distance from the ray origin to the hit point.
    pub distance: f32,
    /// Unit surface normal at the hit point.
    pub normal: Vec3,
    /// Collider that was hit.
    pub collider: ColliderRef,
    /// Categories the hit collider belongs to.
    pub groups: CollisionGroups,
}

/// Collider reported by an overlap query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OverlapHit {
    /// Collider overlapping the query volume.
    pub collider: ColliderRef,
    /// Categories the collider belongs to.
    pub groups: CollisionGroups,
}

/// How the physics backend integrates a body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BodyKind {
    /// Affected by gravity, velocities, and impulses.
    Dynamic,
    /// Moved only by explicit position updates.
    Kinematic,
}

/// Description of a body to create.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyDesc {
    /// Integration mode of the body.
    pub kind: BodyKind,
    /// Collision volume attached to the body.
    pub shape: ColliderShape,
    /// Initial centre of the body.
    pub position: Vec3,
    /// Categories the body's collider belongs to.
    pub groups: CollisionGroups,
}

/// Read-only queries the simulation issues against the physics backend.
pub trait PhysicsQuery {
    /// Returns the closest hit along the ray, if any.
    fn cast_ray(&self, ray: &RayQuery) -> Option<RayHit>;

    /// Appends every collider overlapping the sphere to `out`.
    fn intersect_sphere(
        &self,
        center: Vec3,
        radius: f32,
        filter: CollisionGroups,
        out: &mut Vec<OverlapHit>,
    );

    /// Authoritative centre of a body, or `None` when the body does not exist.
    fn body_position(&self, body: BodyHandle) -> Option<Vec3>;

    /// Linear velocity of a body, or `None` when the body does not exist.
    fn body_velocity(&self, body: BodyHandle) -> Option<Vec3>;
}

/// Mutating operations the world performs on the physics backend.
///
/// Mutators report `false` when the targeted body does not exist.
pub trait PhysicsPort: PhysicsQuery {
    /// Creates a body and returns its handle.
    fn create_body(&mut self, desc: &BodyDesc) -> BodyHandle;

    /// Removes a body and its collider.
    fn remove_body(&mut self, body: BodyHandle) -> bool;

    /// Adds an instantaneous impulse to a body.
    fn apply_impulse(&mut self, body: BodyHandle, impulse: Vec3) -> bool;

    /// Overwrites a body's linear velocity.
    fn set_velocity(&mut self, body: BodyHandle, velocity: Vec3) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_compose_with_bitor() {
        let mixed = CollisionGroups::ENVIRONMENT | CollisionGroups::PROP;
        assert!(mixed.contains(CollisionGroups::PROP));
        assert!(mixed.intersects(CollisionGroups::ENVIRONMENT));
        assert!(!mixed.intersects(CollisionGroups::AGENT));
        assert!(!mixed.is_environment_only());
        assert!(CollisionGroups::ENVIRONMENT.is_environment_only());
        assert!(!CollisionGroups::NONE.is_environment_only());
    }
}
