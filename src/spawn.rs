//! Spawn context for procedural generation.
//!
//! All randomness in the installation flows through a [`SpawnContext`] seeded
//! explicitly, so a scene can be regenerated deterministically for tests while
//! the app seeds from entropy.

use crate::config::SPIRAL_TURNS;
use glam::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

/// Seedable RNG wrapper with helpers for the sampling patterns the
/// generators share: chaos-sphere shells, cone surfaces and spiral strands.
pub struct SpawnContext {
    rng: SmallRng,
}

impl SpawnContext {
    /// Create a context from an explicit seed.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Create a context seeded from system entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
        }
    }

    // ========== Random primitives ==========

    /// Random f32 between 0.0 and 1.0.
    #[inline]
    pub fn random(&mut self) -> f32 {
        self.rng.gen()
    }

    /// Random f32 in the given range.
    #[inline]
    pub fn random_range(&mut self, min: f32, max: f32) -> f32 {
        self.rng.gen_range(min..max)
    }

    /// Random angle in [0, 2π).
    #[inline]
    pub fn random_angle(&mut self) -> f32 {
        self.rng.gen_range(0.0..TAU)
    }

    /// Probability check drawing its own independent sample.
    #[inline]
    pub fn chance(&mut self, probability: f32) -> bool {
        self.rng.gen::<f32>() < probability
    }

    // ========== Position helpers ==========

    /// A point in a spherical shell around the origin.
    ///
    /// Direction is uniform on the sphere (`phi = acos(2u - 1)`); the caller
    /// supplies the radial distance, which the chaos distributions bias
    /// toward the outer shell.
    pub fn on_sphere_at(&mut self, distance: f32) -> Vec3 {
        let theta = self.random_angle();
        let phi = (2.0 * self.rng.gen::<f32>() - 1.0).acos();
        Vec3::new(
            distance * phi.sin() * theta.cos(),
            distance * phi.sin() * theta.sin(),
            distance * phi.cos(),
        )
    }

    /// Chaos position for foliage: outer-shell biased radius in
    /// `[0.6, 1.0] * chaos_radius`, mass concentrated near the shell by the
    /// 0.3 power bias.
    pub fn chaos_position(&mut self, chaos_radius: f32) -> Vec3 {
        let r = chaos_radius * (0.6 + self.rng.gen::<f32>().powf(0.3) * 0.4);
        self.on_sphere_at(r)
    }

    /// Chaos position in a shell `[min_frac, max_frac] * chaos_radius`,
    /// with a uniform radial draw. Used by ribbons (0.8..1.2) and
    /// ornaments (0.5..1.0).
    pub fn chaos_shell(&mut self, chaos_radius: f32, min_frac: f32, max_frac: f32) -> Vec3 {
        let r = chaos_radius * self.random_range(min_frac, max_frac);
        self.on_sphere_at(r)
    }

    /// Area-uniform radial fraction for disk sampling.
    #[inline]
    pub fn disk_fraction(&mut self) -> f32 {
        self.rng.gen::<f32>().sqrt()
    }
}

/// A point on the spiral strand shared by ribbon particles and ribbon
/// polylines. `t` runs 0 at the base to 1 at the apex; the radius tapers
/// linearly to zero with a 1.1 overhang past the foliage cone.
pub fn spiral_point(
    strand: u32,
    strand_count: u32,
    t: f32,
    height: f32,
    radius: f32,
) -> Vec3 {
    let start_angle = (strand as f32 / strand_count as f32) * TAU;
    let angle = start_angle + t * TAU * SPIRAL_TURNS;
    let r = radius * (1.0 - t) * 1.1;
    Vec3::new(angle.cos() * r, t * height, angle.sin() * r)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_from_seed() {
        let mut a = SpawnContext::from_seed(7);
        let mut b = SpawnContext::from_seed(7);
        for _ in 0..32 {
            assert_eq!(a.random().to_bits(), b.random().to_bits());
        }
    }

    #[test]
    fn test_chaos_position_in_shell() {
        let mut ctx = SpawnContext::from_seed(1);
        for _ in 0..500 {
            let p = ctx.chaos_position(25.0);
            let len = p.length();
            assert!(len <= 25.0 + 1e-3);
            assert!(len >= 0.6 * 25.0 - 1e-3);
            assert!(p.is_finite());
        }
    }

    #[test]
    fn test_chaos_shell_bounds() {
        let mut ctx = SpawnContext::from_seed(2);
        for _ in 0..500 {
            let p = ctx.chaos_shell(25.0, 0.5, 1.0);
            let len = p.length();
            assert!(len >= 0.5 * 25.0 - 1e-3 && len <= 25.0 + 1e-3);
        }
    }

    #[test]
    fn test_on_sphere_distance() {
        let mut ctx = SpawnContext::from_seed(3);
        for _ in 0..100 {
            let p = ctx.on_sphere_at(4.0);
            assert!((p.length() - 4.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_chance_is_roughly_calibrated() {
        let mut ctx = SpawnContext::from_seed(4);
        let hits = (0..20_000).filter(|_| ctx.chance(0.02)).count();
        // 2% of 20k is 400; allow generous slack.
        assert!(hits > 250 && hits < 600, "hits = {}", hits);
    }

    #[test]
    fn test_spiral_endpoints() {
        let base = spiral_point(0, 8, 0.0, 12.0, 5.0);
        assert!((base.y).abs() < 1e-6);
        assert!((base.length() - 5.0 * 1.1).abs() < 1e-4);

        let apex = spiral_point(0, 8, 1.0, 12.0, 5.0);
        assert!((apex.y - 12.0).abs() < 1e-6);
        assert!(apex.x.abs() < 1e-4 && apex.z.abs() < 1e-4);
    }

    #[test]
    fn test_spiral_strands_offset() {
        let a = spiral_point(0, 8, 0.5, 12.0, 5.0);
        let b = spiral_point(4, 8, 0.5, 12.0, 5.0);
        // Opposite strands at the same t sit on opposite sides.
        assert!((a.x + b.x).abs() < 1e-4);
        assert!((a.z + b.z).abs() < 1e-4);
    }
}
