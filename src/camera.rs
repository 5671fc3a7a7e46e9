//! Orbit camera.

use glam::{Mat4, Vec3};

/// Yaw/pitch/distance orbit around a target point.
///
/// View and projection are kept separate because the foliage billboards
/// offset their quad corners in view space.
pub struct Camera {
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
    pub target: Vec3,
}

impl Camera {
    pub const MIN_DISTANCE: f32 = 10.0;
    pub const MAX_DISTANCE: f32 = 50.0;

    pub fn new() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.2,
            distance: 25.0,
            target: Vec3::new(0.0, 4.0, 0.0),
        }
    }

    pub fn position(&self) -> Vec3 {
        let x = self.distance * self.pitch.cos() * self.yaw.sin();
        let y = self.distance * self.pitch.sin();
        let z = self.distance * self.pitch.cos() * self.yaw.cos();
        self.target + Vec3::new(x, y, z)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    pub fn proj_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(50.0_f32.to_radians(), aspect, 0.1, 200.0)
    }

    /// Apply a mouse drag in physical pixels.
    pub fn orbit(&mut self, dx: f32, dy: f32) {
        self.yaw -= dx * 0.005;
        self.pitch += dy * 0.005;
        // Stay below the pole and above the floor plane.
        self.pitch = self.pitch.clamp(-0.1, 1.4);
    }

    /// Apply a scroll-wheel zoom in line units.
    pub fn zoom(&mut self, scroll: f32) {
        self.distance -= scroll * 1.5;
        self.distance = self.distance.clamp(Self::MIN_DISTANCE, Self::MAX_DISTANCE);
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_at_distance() {
        let cam = Camera::new();
        let d = (cam.position() - cam.target).length();
        assert!((d - cam.distance).abs() < 1e-4);
    }

    #[test]
    fn test_zoom_clamped() {
        let mut cam = Camera::new();
        cam.zoom(1000.0);
        assert_eq!(cam.distance, Camera::MIN_DISTANCE);
        cam.zoom(-1000.0);
        assert_eq!(cam.distance, Camera::MAX_DISTANCE);
    }

    #[test]
    fn test_orbit_pitch_clamped() {
        let mut cam = Camera::new();
        cam.orbit(0.0, 10_000.0);
        assert!(cam.pitch <= 1.4);
        cam.orbit(0.0, -20_000.0);
        assert!(cam.pitch >= -0.1);
    }
}
