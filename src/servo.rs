use crate::error::{AngleOutOfRange, InvalidBounds};

/// What `Servo::set_angle` does with a target outside the bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AngleMode {
    #[default]
    Reject,
    Clamp,
}

/// A single bounded actuator channel. Pure state, no I/O.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Servo {
    min_angle: f64,
    max_angle: f64,
    angle: f64,
}

impl Servo {
    pub fn new(min_angle: f64, max_angle: f64, angle: f64) -> Result<Self, InvalidBounds> {
        let valid = min_angle.is_finite()
            && max_angle.is_finite()
            && min_angle <= max_angle
            && (min_angle..=max_angle).contains(&angle);
        if !valid {
            return Err(InvalidBounds { min: min_angle, max: max_angle, angle });
        }
        Ok(Self { min_angle, max_angle, angle })
    }

    pub fn min_angle(&self) -> f64 {
        self.min_angle
    }

    pub fn max_angle(&self) -> f64 {
        self.max_angle
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// Validates `target` against the bounds without touching the stored angle.
    pub fn check(&self, target: f64) -> Result<(), AngleOutOfRange> {
        if (self.min_angle..=self.max_angle).contains(&target) {
            Ok(())
        } else {
            Err(self.out_of_range(target))
        }
    }

    /// Stores `target` and returns the angle actually stored.
    ///
    /// With `AngleMode::Clamp` an out-of-range target is pulled onto the
    /// nearest bound. NaN is rejected in either mode.
    pub fn set_angle(&mut self, target: f64, mode: AngleMode) -> Result<f64, AngleOutOfRange> {
        let stored = match (self.check(target), mode) {
            (Ok(()), _) => target,
            (Err(_), AngleMode::Clamp) if !target.is_nan() => {
                target.clamp(self.min_angle, self.max_angle)
            }
            (Err(e), _) => return Err(e),
        };
        self.angle = stored;
        Ok(stored)
    }

    fn out_of_range(&self, angle: f64) -> AngleOutOfRange {
        AngleOutOfRange { angle, min: self.min_angle, max: self.max_angle }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn servo() -> Servo {
        Servo::new(10.0, 170.0, 90.0).unwrap()
    }

    #[test]
    fn reject_leaves_angle_unchanged() {
        let mut s = servo();
        let err = s.set_angle(999.0, AngleMode::Reject).unwrap_err();
        assert_eq!(err, AngleOutOfRange { angle: 999.0, min: 10.0, max: 170.0 });
        assert_eq!(s.angle(), 90.0);
    }

    #[test]
    fn clamp_pulls_onto_bounds() {
        let mut s = servo();
        assert_eq!(s.set_angle(-5.0, AngleMode::Clamp).unwrap(), 10.0);
        assert_eq!(s.set_angle(500.0, AngleMode::Clamp).unwrap(), 170.0);
        assert_eq!(s.angle(), 170.0);
    }

    #[test]
    fn in_range_targets_are_stored_in_both_modes() {
        let mut s = servo();
        assert_eq!(s.set_angle(10.0, AngleMode::Reject).unwrap(), 10.0);
        assert_eq!(s.set_angle(170.0, AngleMode::Clamp).unwrap(), 170.0);
    }

    #[test]
    fn nan_is_rejected_even_when_clamping() {
        let mut s = servo();
        assert!(s.set_angle(f64::NAN, AngleMode::Clamp).is_err());
        assert_eq!(s.angle(), 90.0);
    }

    #[test]
    fn unchanged_iff_out_of_range_and_rejecting() {
        let bounds = [(0.0, 0.0), (10.0, 170.0), (-90.0, 90.0), (0.0, 180.0)];
        let targets = [-200.0, -90.0, -0.5, 0.0, 10.0, 89.9, 90.0, 170.0, 180.0, 180.1, 1e9];
        for (min, max) in bounds {
            for target in targets {
                let mut s = Servo::new(min, max, min).unwrap();
                let outside = target < min || target > max;
                let res = s.set_angle(target, AngleMode::Reject);
                assert_eq!(res.is_err(), outside, "target {target} in [{min}, {max}]");
                if outside {
                    assert_eq!(s.angle(), min);
                } else {
                    assert_eq!(s.angle(), target);
                }
            }
        }
    }

    #[test]
    fn construction_validates_bounds() {
        assert!(Servo::new(170.0, 10.0, 90.0).is_err());
        assert!(Servo::new(10.0, 170.0, 5.0).is_err());
        assert!(Servo::new(f64::NEG_INFINITY, 170.0, 5.0).is_err());
        assert!(Servo::new(0.0, 180.0, 0.0).is_ok());
    }
}
