//! Scene assembly: generated particle data, formation drivers and the
//! three renderers, updated and drawn as one unit.

use glam::Mat4;
use log::info;

use crate::animation::{FormationDriver, FormationState};
use crate::config::{TreeConfig, Tuning};
use crate::error::ConfigError;
use crate::foliage::{FoliageData, FoliageState};
use crate::ornaments::{self, OrnamentState};
use crate::ribbons::{self, RibbonState};
use crate::spawn::SpawnContext;

/// The whole morphing tree: data, drivers and GPU state.
///
/// Foliage and ribbons share one driver; ornaments run their own slower one
/// so heavy pieces visibly settle last.
pub struct Scene {
    foliage: FoliageState,
    ornaments: OrnamentState,
    ribbons: RibbonState,
    formation: FormationState,
    foliage_driver: FormationDriver,
    ornament_driver: FormationDriver,
}

impl Scene {
    pub fn new(
        device: &wgpu::Device,
        config: &TreeConfig,
        tuning: Tuning,
        seed: Option<u64>,
        surface_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut ctx = match seed {
            Some(seed) => SpawnContext::from_seed(seed),
            None => SpawnContext::from_entropy(),
        };

        let foliage_data = FoliageData::generate(config, &mut ctx)?;
        let ornament_data = ornaments::generate(config, &mut ctx)?;
        let ribbon_data = ribbons::generate(config, &mut ctx)?;
        info!(
            "generated scene: {} foliage, {} ornaments, {} ribbons",
            foliage_data.len(),
            ornament_data.len(),
            ribbon_data.len()
        );

        Ok(Self {
            foliage: FoliageState::new(device, &foliage_data, tuning, surface_format, depth_format),
            ornaments: OrnamentState::new(
                device,
                config,
                ornament_data,
                surface_format,
                depth_format,
            ),
            ribbons: RibbonState::new(device, ribbon_data, surface_format, depth_format),
            formation: FormationState::Chaos,
            foliage_driver: FormationDriver::new(FormationDriver::FOLIAGE_RATE),
            ornament_driver: FormationDriver::new(FormationDriver::ORNAMENT_RATE),
        })
    }

    pub fn formation(&self) -> FormationState {
        self.formation
    }

    pub fn set_formation(&mut self, state: FormationState) {
        self.formation = state;
    }

    pub fn toggle_formation(&mut self) {
        self.formation = self.formation.toggled();
        info!("formation target -> {:?}", self.formation);
    }

    /// Tick drivers and push all per-frame GPU data.
    pub fn update(&mut self, queue: &wgpu::Queue, view: Mat4, proj: Mat4, time: f32, dt: f32) {
        let foliage_progress = self.foliage_driver.tick(self.formation, dt);
        let ornament_progress = self.ornament_driver.tick(self.formation, dt);
        let view_proj = proj * view;

        self.foliage.update(queue, view, proj, foliage_progress, time);
        self.ornaments.update(queue, view_proj, ornament_progress, time);
        self.ribbons.update(queue, view_proj, foliage_progress, time);
    }

    /// Opaque meshes first so the additive passes depth-test against them.
    pub fn draw<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>) {
        self.ornaments.draw(render_pass);
        self.foliage.draw(render_pass);
        self.ribbons.draw(render_pass);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formation_toggle_round_trip() {
        assert_eq!(FormationState::Chaos.toggled(), FormationState::Formed);
        assert_eq!(FormationState::Chaos.toggled().toggled(), FormationState::Chaos);
    }

    #[test]
    fn test_generation_scenario_counts() {
        // 1000 particles over 4 strands of 10 points.
        let cfg = TreeConfig {
            foliage_count: 1000,
            ribbon_count: 4,
            ribbon_points: 10,
            ..TreeConfig::default()
        };
        let mut ctx = SpawnContext::from_seed(99);
        let foliage = FoliageData::generate(&cfg, &mut ctx).unwrap();
        let ornaments = ornaments::generate(&cfg, &mut ctx).unwrap();
        let ribbons = ribbons::generate(&cfg, &mut ctx).unwrap();
        assert_eq!(foliage.len(), 1000);
        assert_eq!(ornaments.len(), cfg.ornament_count as usize);
        assert_eq!(ribbons.len(), 4);
        assert!(ribbons.iter().all(|r| r.target.len() == 10));
    }
}
