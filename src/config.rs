//! Scene configuration: dimensions, counts, palette and the ornament catalog.
//!
//! Everything here is static for a session. Generation reads it once at mount
//! and the renderers never look at it again.

use glam::Vec3;

use crate::error::ConfigError;
use crate::ornaments::OrnamentKind;

/// Dimensions and population counts for the installation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeConfig {
    /// Cone height in world units.
    pub height: f32,
    /// Cone base radius.
    pub radius: f32,
    /// Radius of the dispersed chaos sphere.
    pub chaos_radius: f32,
    /// Number of foliage point particles.
    pub foliage_count: u32,
    /// Number of instanced ornaments.
    pub ornament_count: u32,
    /// Number of spiral ribbon strands.
    pub ribbon_count: u32,
    /// Points per ribbon strand.
    pub ribbon_points: u32,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            height: 12.0,
            radius: 5.0,
            chaos_radius: 25.0,
            foliage_count: 120_000,
            ornament_count: 200,
            ribbon_count: 8,
            ribbon_points: 60,
        }
    }
}

impl TreeConfig {
    /// Reject configurations that would produce corrupt or empty buffers.
    ///
    /// Generation calls this before allocating anything, so a bad config
    /// fails fast instead of rendering garbage.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.foliage_count == 0 {
            return Err(ConfigError::ZeroCount("foliage_count"));
        }
        if self.ornament_count == 0 {
            return Err(ConfigError::ZeroCount("ornament_count"));
        }
        if self.ribbon_count == 0 {
            return Err(ConfigError::ZeroCount("ribbon_count"));
        }
        if self.ribbon_points < 2 {
            return Err(ConfigError::RibbonTooShort(self.ribbon_points));
        }
        if self.height <= 0.0 {
            return Err(ConfigError::NonPositiveDimension("height", self.height));
        }
        if self.radius <= 0.0 {
            return Err(ConfigError::NonPositiveDimension("radius", self.radius));
        }
        if self.chaos_radius <= 0.0 {
            return Err(ConfigError::NonPositiveDimension("chaos_radius", self.chaos_radius));
        }
        Ok(())
    }

    /// Cone radius at a given height, tapering linearly to zero at the apex.
    #[inline]
    pub fn radius_at(&self, h: f32) -> f32 {
        self.radius * (1.0 - h / self.height)
    }
}

/// Tuning knobs for the foliage shader.
///
/// These were hand-tuned by eye in the original installation; they are plain
/// data here so they can be adjusted without touching WGSL.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tuning {
    /// Exponent of the twinkle pulse. High values give rare, sharp spikes.
    pub twinkle_exponent: f32,
    /// Red channel threshold above which a particle counts as gold.
    pub gold_threshold_r: f32,
    /// Green channel threshold above which a particle counts as gold.
    pub gold_threshold_g: f32,
    /// Global point size multiplier.
    pub point_scale: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            twinkle_exponent: 15.0,
            gold_threshold_r: 0.6,
            gold_threshold_g: 0.5,
            point_scale: 20.0,
        }
    }
}

/// Number of turns each spiral makes from base to apex.
pub const SPIRAL_TURNS: f32 = 2.5;

/// Named palette of the installation.
pub mod palette {
    use super::hex;
    use glam::Vec3;

    pub fn emerald_deep() -> Vec3 {
        hex(0x011a12)
    }
    pub fn emerald_bright() -> Vec3 {
        hex(0x004d40)
    }
    pub fn gold_high() -> Vec3 {
        hex(0xFFD700)
    }
    pub fn gold_soft() -> Vec3 {
        hex(0xD4AF37)
    }
    pub fn diamond_white() -> Vec3 {
        Vec3::ONE
    }
    /// Near-black green used as the clear color.
    pub fn luxury_black() -> Vec3 {
        hex(0x011612)
    }
}

/// Convert a 24-bit RGB value to a linear-ish [0,1] color vector.
pub fn hex(rgb: u32) -> Vec3 {
    Vec3::new(
        ((rgb >> 16) & 0xFF) as f32 / 255.0,
        ((rgb >> 8) & 0xFF) as f32 / 255.0,
        (rgb & 0xFF) as f32 / 255.0,
    )
}

/// One entry in the ornament catalog.
#[derive(Debug, Clone, Copy)]
pub struct OrnamentProp {
    pub kind: OrnamentKind,
    /// Inverse responsiveness. Heavier ornaments lag and float less.
    pub weight: f32,
    pub color: u32,
}

/// The fixed ornament catalog, cycled by index modulo during placement.
pub const ORNAMENT_CATALOG: &[OrnamentProp] = &[
    // Gold variations
    OrnamentProp { kind: OrnamentKind::Box, weight: 2.5, color: 0xFFD700 },
    OrnamentProp { kind: OrnamentKind::Box, weight: 2.2, color: 0xD4AF37 },
    OrnamentProp { kind: OrnamentKind::Box, weight: 2.8, color: 0xCFB53B },
    OrnamentProp { kind: OrnamentKind::Sphere, weight: 1.1, color: 0xFFD700 },
    OrnamentProp { kind: OrnamentKind::Sphere, weight: 1.3, color: 0xB45309 },
    // Emerald variations
    OrnamentProp { kind: OrnamentKind::Box, weight: 2.4, color: 0x064e3b },
    OrnamentProp { kind: OrnamentKind::Box, weight: 2.6, color: 0x065f46 },
    OrnamentProp { kind: OrnamentKind::Sphere, weight: 1.0, color: 0x004d40 },
    OrnamentProp { kind: OrnamentKind::Sphere, weight: 1.2, color: 0x013220 },
    OrnamentProp { kind: OrnamentKind::Sphere, weight: 0.9, color: 0x0f766e },
    // Deep red variations
    OrnamentProp { kind: OrnamentKind::Sphere, weight: 1.0, color: 0x8B0000 },
    OrnamentProp { kind: OrnamentKind::Sphere, weight: 1.1, color: 0x6b0000 },
    OrnamentProp { kind: OrnamentKind::Sphere, weight: 1.0, color: 0x4d0000 },
    // Lights
    OrnamentProp { kind: OrnamentKind::Light, weight: 0.5, color: 0xffffff },
    OrnamentProp { kind: OrnamentKind::Light, weight: 0.6, color: 0xfff9e6 },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(TreeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_counts_rejected() {
        let mut c = TreeConfig::default();
        c.foliage_count = 0;
        assert_eq!(c.validate(), Err(ConfigError::ZeroCount("foliage_count")));

        let mut c = TreeConfig::default();
        c.ribbon_count = 0;
        assert_eq!(c.validate(), Err(ConfigError::ZeroCount("ribbon_count")));
    }

    #[test]
    fn test_negative_dimensions_rejected() {
        let mut c = TreeConfig::default();
        c.height = -3.0;
        assert!(matches!(
            c.validate(),
            Err(ConfigError::NonPositiveDimension("height", _))
        ));

        let mut c = TreeConfig::default();
        c.chaos_radius = 0.0;
        assert!(matches!(
            c.validate(),
            Err(ConfigError::NonPositiveDimension("chaos_radius", _))
        ));
    }

    #[test]
    fn test_single_point_ribbon_rejected() {
        let mut c = TreeConfig::default();
        c.ribbon_points = 1;
        assert_eq!(c.validate(), Err(ConfigError::RibbonTooShort(1)));
    }

    #[test]
    fn test_radius_taper() {
        let c = TreeConfig::default();
        assert!((c.radius_at(0.0) - c.radius).abs() < 1e-6);
        assert!(c.radius_at(c.height).abs() < 1e-6);
        assert!((c.radius_at(c.height * 0.5) - c.radius * 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_hex_parsing() {
        let gold = hex(0xFFD700);
        assert!((gold.x - 1.0).abs() < 1e-6);
        assert!((gold.y - 215.0 / 255.0).abs() < 1e-6);
        assert!(gold.z.abs() < 1e-6);
        assert_eq!(hex(0x000000), Vec3::ZERO);
        assert_eq!(hex(0xFFFFFF), Vec3::ONE);
    }

    #[test]
    fn test_gold_palette_passes_gold_threshold() {
        let t = Tuning::default();
        let gold = palette::gold_high();
        assert!(gold.x > t.gold_threshold_r && gold.y > t.gold_threshold_g);
        let emerald = palette::emerald_bright();
        assert!(!(emerald.x > t.gold_threshold_r && emerald.y > t.gold_threshold_g));
    }
}
