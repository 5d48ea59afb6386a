#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Locates collision-free ground positions for new agents.
//!
//! Candidates are sampled in an annulus around the arena centre, dropped onto
//! the ground with a downward ray cast, and accepted only when a small sphere
//! around the candidate overlaps nothing but environment geometry. Points are
//! never cached because the arena contents change between calls.

use std::f32::consts::TAU;

use glam::Vec3;
use horde_core::physics::{CollisionGroups, OverlapHit, PhysicsQuery, RayQuery};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::warn;

/// Number of candidates tried before a search gives up.
pub const MAX_ATTEMPTS: usize = 10;

/// Inner radius of the default spawn annulus.
pub const DEFAULT_MIN_RADIUS: f32 = 15.0;

/// Outer radius of the default spawn annulus.
pub const DEFAULT_MAX_RADIUS: f32 = 35.0;

/// Height above the arena centre from which ground probes are cast.
pub const PROBE_HEIGHT: f32 = 50.0;

/// Vertical gap left between the ground and a returned point.
pub const SAFETY_OFFSET: f32 = 0.1;

/// Smallest radius of the clearance sphere tested around each candidate.
pub const CLEARANCE_RADIUS: f32 = 0.5;

/// Configuration parameters required to construct the spawn point finder.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    center: Vec3,
    min_radius: f32,
    max_radius: f32,
    max_attempts: usize,
    probe_height: f32,
    safety_offset: f32,
    clearance_radius: f32,
    rng_seed: u64,
}

impl Config {
    /// Creates a configuration sampling the provided annulus around `center`.
    ///
    /// Radii given in the wrong order are swapped.
    #[must_use]
    pub fn new(center: Vec3, min_radius: f32, max_radius: f32, rng_seed: u64) -> Self {
        let (min_radius, max_radius) = if min_radius <= max_radius {
            (min_radius, max_radius)
        } else {
            (max_radius, min_radius)
        };
        Self {
            center,
            min_radius,
            max_radius,
            max_attempts: MAX_ATTEMPTS,
            probe_height: PROBE_HEIGHT,
            safety_offset: SAFETY_OFFSET,
            clearance_radius: CLEARANCE_RADIUS,
            rng_seed,
        }
    }

    /// Overrides the number of candidates tried per search.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Overrides the radius of the clearance sphere.
    #[must_use]
    pub const fn with_clearance_radius(mut self, clearance_radius: f32) -> Self {
        self.clearance_radius = clearance_radius;
        self
    }

    /// Centre of the sampled annulus.
    #[must_use]
    pub const fn center(&self) -> Vec3 {
        self.center
    }

    /// Inner radius of the sampled annulus.
    #[must_use]
    pub const fn min_radius(&self) -> f32 {
        self.min_radius
    }

    /// Outer radius of the sampled annulus.
    #[must_use]
    pub const fn max_radius(&self) -> f32 {
        self.max_radius
    }

    /// Number of candidates tried per search.
    #[must_use]
    pub const fn max_attempts(&self) -> usize {
        self.max_attempts
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Vec3::ZERO, DEFAULT_MIN_RADIUS, DEFAULT_MAX_RADIUS, 0)
    }
}

/// Samples and validates spawn points against the physics backend.
#[derive(Clone, Debug)]
pub struct SpawnPointFinder {
    config: Config,
    rng: ChaCha8Rng,
    overlaps: Vec<OverlapHit>,
}

impl SpawnPointFinder {
    /// Creates a new finder using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            overlaps: Vec::new(),
        }
    }

    /// Configuration the finder was created with.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Rewinds the random stream to its initial seed.
    pub fn reset(&mut self) {
        self.rng = ChaCha8Rng::seed_from_u64(self.config.rng_seed);
    }

    /// Returns the first candidate that stands on ground and is clear of
    /// non-environment colliders, or `None` once every attempt failed.
    pub fn find_safe_spawn_point<P>(&mut self, physics: &P) -> Option<Vec3>
    where
        P: PhysicsQuery + ?Sized,
    {
        self.find_safe_spawn_point_for(physics, 0.0)
    }

    /// Like [`Self::find_safe_spawn_point`], but widens the clearance sphere
    /// to `body_radius` when the body to spawn is larger than the configured
    /// clearance.
    pub fn find_safe_spawn_point_for<P>(&mut self, physics: &P, body_radius: f32) -> Option<Vec3>
    where
        P: PhysicsQuery + ?Sized,
    {
        let clearance = self.config.clearance_radius.max(body_radius);
        for _ in 0..self.config.max_attempts {
            let column = self.sample_column();
            if let Some(point) = self.validate(physics, column, clearance) {
                return Some(point);
            }
        }

        warn!(
            attempts = self.config.max_attempts,
            "no safe spawn point found"
        );
        None
    }

    fn sample_column(&mut self) -> Vec3 {
        let angle = self.rng.gen_range(0.0..TAU);
        let radius = if self.config.min_radius < self.config.max_radius {
            self.rng
                .gen_range(self.config.min_radius..=self.config.max_radius)
        } else {
            self.config.min_radius
        };
        let (sin, cos) = angle.sin_cos();
        Vec3::new(
            self.config.center.x + cos * radius,
            self.config.center.y,
            self.config.center.z + sin * radius,
        )
    }

    fn validate<P>(&mut self, physics: &P, column: Vec3, clearance: f32) -> Option<Vec3>
    where
        P: PhysicsQuery + ?Sized,
    {
        let origin = column + Vec3::Y * self.config.probe_height;
        // Ground may sit below the arena centre.
        let hit = physics.cast_ray(&RayQuery {
            origin,
            direction: Vec3::NEG_Y,
            max_distance: self.config.probe_height * 2.0,
            filter: CollisionGroups::ENVIRONMENT,
            exclude: None,
        })?;

        let ground_y = origin.y - hit.distance;
        let candidate = Vec3::new(origin.x, ground_y + self.config.safety_offset, origin.z);

        self.overlaps.clear();
        physics.intersect_sphere(
            candidate,
            clearance,
            CollisionGroups::ALL,
            &mut self.overlaps,
        );
        if self
            .overlaps
            .iter()
            .any(|overlap| !overlap.groups.is_environment_only())
        {
            return None;
        }

        Some(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_stay_inside_the_annulus() {
        let center = Vec3::new(4.0, 0.0, -2.0);
        let mut finder = SpawnPointFinder::new(Config::new(center, 15.0, 35.0, 7));
        for _ in 0..500 {
            let column = finder.sample_column();
            let distance = horde_core::planar_distance(center, column);
            assert!((15.0 - 1e-3..=35.0 + 1e-3).contains(&distance));
        }
    }

    #[test]
    fn degenerate_annulus_samples_a_circle() {
        let mut finder = SpawnPointFinder::new(Config::new(Vec3::ZERO, 20.0, 20.0, 3));
        let column = finder.sample_column();
        assert!((horde_core::planar_distance(Vec3::ZERO, column) - 20.0).abs() < 1e-3);
    }

    #[test]
    fn swapped_radii_are_reordered() {
        let config = Config::new(Vec3::ZERO, 30.0, 10.0, 0);
        assert_eq!(config.min_radius(), 10.0);
        assert_eq!(config.max_radius(), 30.0);
    }

    #[test]
    fn reset_replays_the_sample_sequence() {
        let mut finder = SpawnPointFinder::new(Config::default());
        let first: Vec<_> = (0..4).map(|_| finder.sample_column()).collect();
        finder.reset();
        let second: Vec<_> = (0..4).map(|_| finder.sample_column()).collect();
        assert_eq!(first, second);
    }
}
