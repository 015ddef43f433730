/// Number of actuator channels on the arm.
pub const CHANNEL_COUNT: usize = 7;

/// One target angle per channel, in channel order.
pub type Angles = [f64; CHANNEL_COUNT];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameId(pub u64);

impl std::fmt::Display for FrameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
