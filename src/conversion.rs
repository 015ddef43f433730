use crate::servo::Servo;

/// Maps a servo's real-world angle range onto the single wire byte
/// (`min_angle` -> 0, `max_angle` -> 255).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleScale {
    pub min_angle: f64,
    pub max_angle: f64,
}

impl AngleScale {
    pub const BYTE_MAX: u8 = u8::MAX;

    pub fn new(min_angle: f64, max_angle: f64) -> Self {
        Self { min_angle, max_angle }
    }

    pub fn for_servo(servo: &Servo) -> Self {
        Self::new(servo.min_angle(), servo.max_angle())
    }

    /// Convert an angle to its wire byte, saturating at the range ends.
    pub fn to_byte(&self, angle: f64) -> u8 {
        let span = self.max_angle - self.min_angle;
        if span <= 0.0 {
            return 0;
        }
        let rel = ((angle - self.min_angle) / span).clamp(0.0, 1.0);
        (rel * f64::from(Self::BYTE_MAX)).round() as u8
    }

    /// Convert a wire byte back to the angle it stands for.
    pub fn from_byte(&self, value: u8) -> f64 {
        let span = self.max_angle - self.min_angle;
        self.min_angle + span * f64::from(value) / f64::from(Self::BYTE_MAX)
    }

    /// Angle covered by one byte step.
    pub fn resolution(&self) -> f64 {
        (self.max_angle - self.min_angle) / f64::from(Self::BYTE_MAX)
    }
}
