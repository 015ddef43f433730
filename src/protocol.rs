//! Wire format of a single servo command.
//!
//! Each command is two raw bytes, `[channel, value]`, where `value` is the
//! target angle scaled onto 0..=255 over the servo's range. There is no
//! start byte and no checksum; the link is point-to-point serial.

use crate::{conversion::AngleScale, servo::Servo};

pub const COMMAND_LEN: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoCommand {
    pub channel: u8,
    pub value: u8,
}

impl ServoCommand {
    /// Build the command moving `servo` on `channel` to `angle`.
    ///
    /// `channel` must fit in a byte; the arm has far fewer channels.
    pub fn for_angle(channel: usize, servo: &Servo, angle: f64) -> Self {
        Self {
            channel: channel as u8,
            value: AngleScale::for_servo(servo).to_byte(angle),
        }
    }

    pub fn encode(&self) -> [u8; COMMAND_LEN] {
        [self.channel, self.value]
    }
}
