//! Formation progress drivers.
//!
//! The whole installation has exactly two external states; everything else is
//! the continuous trajectory of one or more smoothed scalars toward them.

/// The external two-valued state selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormationState {
    /// Dispersed sphere-distributed arrangement.
    #[default]
    Chaos,
    /// Assembled cone-shaped arrangement.
    Formed,
}

impl FormationState {
    /// The progress value this state pulls toward.
    #[inline]
    pub fn target_value(self) -> f32 {
        match self {
            FormationState::Chaos => 0.0,
            FormationState::Formed => 1.0,
        }
    }

    /// Flip between the two states.
    #[inline]
    pub fn toggled(self) -> Self {
        match self {
            FormationState::Chaos => FormationState::Formed,
            FormationState::Formed => FormationState::Chaos,
        }
    }
}

/// Exponentially smoothed approach of a scalar toward the current target.
///
/// The step factor is capped at 1 so a long frame can land exactly on the
/// target but never overshoot it. Foliage/ribbons and ornaments each own an
/// independent driver with a slightly different rate, giving the deliberate
/// parallax between particle and ornament convergence.
#[derive(Debug, Clone, Copy)]
pub struct FormationDriver {
    progress: f32,
    rate: f32,
}

impl FormationDriver {
    /// Smoothing rate for the foliage and ribbon driver.
    pub const FOLIAGE_RATE: f32 = 1.5;
    /// Smoothing rate for the ornament driver.
    pub const ORNAMENT_RATE: f32 = 1.2;

    pub fn new(rate: f32) -> Self {
        Self { progress: 0.0, rate }
    }

    /// Current progress in [0, 1].
    #[inline]
    pub fn progress(&self) -> f32 {
        self.progress
    }

    /// Advance one frame toward `target` given elapsed frame time `dt`.
    ///
    /// Returns the updated progress. `dt <= 0` leaves the value unchanged.
    pub fn tick(&mut self, target: FormationState, dt: f32) -> f32 {
        if dt > 0.0 {
            let t = target.target_value();
            let step = (dt * self.rate).min(1.0);
            self.progress += (t - self.progress) * step;
            self.progress = self.progress.clamp(0.0, 1.0);
        }
        self.progress
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_values() {
        assert_eq!(FormationState::Chaos.target_value(), 0.0);
        assert_eq!(FormationState::Formed.target_value(), 1.0);
        assert_eq!(FormationState::Chaos.toggled(), FormationState::Formed);
    }

    #[test]
    fn test_converges_within_ten_unit_ticks() {
        let mut driver = FormationDriver::new(FormationDriver::FOLIAGE_RATE);
        for _ in 0..10 {
            driver.tick(FormationState::Formed, 1.0);
        }
        assert!(driver.progress() > 0.99, "progress = {}", driver.progress());
    }

    #[test]
    fn test_monotone_approach_and_bounds() {
        let mut driver = FormationDriver::new(FormationDriver::ORNAMENT_RATE);
        let mut last = driver.progress();
        for _ in 0..100 {
            let p = driver.tick(FormationState::Formed, 0.016);
            assert!(p >= last);
            assert!((0.0..=1.0).contains(&p));
            last = p;
        }
        // Reverse direction: monotone back down, still bounded.
        for _ in 0..100 {
            let p = driver.tick(FormationState::Chaos, 0.016);
            assert!(p <= last);
            assert!((0.0..=1.0).contains(&p));
            last = p;
        }
    }

    #[test]
    fn test_never_overshoots_on_huge_dt() {
        let mut driver = FormationDriver::new(FormationDriver::FOLIAGE_RATE);
        let p = driver.tick(FormationState::Formed, 100.0);
        assert_eq!(p, 1.0);
        let p = driver.tick(FormationState::Chaos, 100.0);
        assert_eq!(p, 0.0);
    }

    #[test]
    fn test_zero_dt_is_noop() {
        let mut driver = FormationDriver::new(FormationDriver::FOLIAGE_RATE);
        driver.tick(FormationState::Formed, 0.5);
        let before = driver.progress();
        driver.tick(FormationState::Formed, 0.0);
        assert_eq!(driver.progress(), before);
    }

    #[test]
    fn test_random_dt_sequence_stays_bounded() {
        let mut driver = FormationDriver::new(FormationDriver::FOLIAGE_RATE);
        let dts = [0.0, 0.016, 2.0, 0.33, 5.0, 0.001, 0.7];
        let targets = [FormationState::Formed, FormationState::Chaos];
        for i in 0..200 {
            let p = driver.tick(targets[i % 2], dts[i % dts.len()]);
            assert!((0.0..=1.0).contains(&p));
        }
    }
}
