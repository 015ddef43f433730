use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use tracing::{debug, info, warn};

use crate::{
    error::{InvalidBounds, RobotError},
    link::SerialLink,
    model::{Angles, CHANNEL_COUNT},
    protocol::ServoCommand,
    servo::{AngleMode, Servo},
};

#[derive(Debug, Clone, Copy)]
pub struct RobotConfig {
    /// Wait after link-up before the firmware accepts commands.
    pub settle_delay: Duration,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self { settle_delay: Duration::from_secs(3) }
    }
}

/// Bounds and start angles of the stock arm, base first, gripper last.
pub fn default_arm_servos() -> Result<[Servo; CHANNEL_COUNT], InvalidBounds> {
    Ok([
        Servo::new(10.0, 170.0, 90.0)?,
        Servo::new(10.0, 170.0, 170.0)?,
        Servo::new(10.0, 170.0, 35.0)?,
        Servo::new(10.0, 170.0, 90.0)?,
        Servo::new(10.0, 170.0, 90.0)?,
        Servo::new(10.0, 170.0, 90.0)?,
        Servo::new(0.0, 180.0, 0.0)?,
    ])
}

/// The arm: its servos plus the link commands go out on.
///
/// Lock order is always servos then link, and the link lock is never held
/// while taking the servo lock, so interactive and playback callers cannot
/// deadlock. Holding the servo lock across the send keeps the stored angle
/// in step with the order commands hit the wire.
pub struct Robot {
    servos: Mutex<[Servo; CHANNEL_COUNT]>,
    link: Arc<SerialLink>,
    cfg: RobotConfig,
}

impl Robot {
    pub fn new(servos: [Servo; CHANNEL_COUNT], link: Arc<SerialLink>, cfg: RobotConfig) -> Self {
        Self { servos: Mutex::new(servos), link, cfg }
    }

    pub fn default_arm(link: Arc<SerialLink>, cfg: RobotConfig) -> Result<Self, InvalidBounds> {
        Ok(Self::new(default_arm_servos()?, link, cfg))
    }

    fn servos_guard(&self) -> MutexGuard<'_, [Servo; CHANNEL_COUNT]> {
        self.servos.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn channel_count(&self) -> usize {
        CHANNEL_COUNT
    }

    pub fn link(&self) -> &Arc<SerialLink> {
        &self.link
    }

    pub fn config(&self) -> RobotConfig {
        self.cfg
    }

    pub fn servo(&self, index: usize) -> Result<Servo, RobotError> {
        self.servos_guard()
            .get(index)
            .copied()
            .ok_or(RobotError::InvalidChannel { index, count: CHANNEL_COUNT })
    }

    pub fn servos(&self) -> [Servo; CHANNEL_COUNT] {
        *self.servos_guard()
    }

    /// Angles the actuators last acknowledged receiving.
    pub fn angles(&self) -> Angles {
        let servos = *self.servos_guard();
        servos.map(|s| s.angle())
    }

    /// Validates a full set of angles against every servo's bounds.
    pub fn check_angles(&self, angles: &Angles) -> Result<(), RobotError> {
        let servos = self.servos_guard();
        for (channel, (servo, angle)) in servos.iter().zip(angles).enumerate() {
            servo
                .check(*angle)
                .map_err(|source| RobotError::InvalidAngle { channel, source })?;
        }
        Ok(())
    }

    /// Sends `angle` on channel `index`. The stored angle only changes
    /// once the command has been written.
    pub fn set_servo_angle(&self, index: usize, angle: f64) -> Result<(), RobotError> {
        let mut servos = self.servos_guard();
        self.send_locked(&mut servos, index, angle)
    }

    fn send_locked(
        &self,
        servos: &mut [Servo; CHANNEL_COUNT],
        index: usize,
        angle: f64,
    ) -> Result<(), RobotError> {
        let servo = servos
            .get_mut(index)
            .ok_or(RobotError::InvalidChannel { index, count: CHANNEL_COUNT })?;
        servo
            .check(angle)
            .map_err(|source| RobotError::InvalidAngle { channel: index, source })?;

        let cmd = ServoCommand::for_angle(index, servo, angle);
        self.link
            .send(&cmd.encode())
            .map_err(|source| RobotError::LinkDown { channel: index, source })?;
        debug!(channel = index, angle, value = cmd.value, "servo command sent");

        servo
            .set_angle(angle, AngleMode::Reject)
            .map_err(|source| RobotError::InvalidAngle { channel: index, source })?;
        Ok(())
    }

    /// Waits the settle delay and then pushes every servo's current angle,
    /// one channel at a time in channel order.
    ///
    /// Channels written before a failure are not rolled back; they are
    /// listed in `PartialInitialization`. A failure on the first channel
    /// is `LinkDown`.
    pub async fn initialize_servo_angles(&self) -> Result<(), RobotError> {
        info!("waiting {:?} for firmware to settle", self.cfg.settle_delay);
        tokio::time::sleep(self.cfg.settle_delay).await;

        let mut succeeded = Vec::with_capacity(CHANNEL_COUNT);
        for channel in 0..CHANNEL_COUNT {
            let res = {
                let mut servos = self.servos_guard();
                let angle = servos[channel].angle();
                self.send_locked(&mut servos, channel, angle)
            };
            match res {
                Ok(()) => succeeded.push(channel),
                Err(RobotError::LinkDown { source, .. }) if !succeeded.is_empty() => {
                    warn!("initialization stopped at channel {channel}: {source}");
                    return Err(RobotError::PartialInitialization { succeeded, channel, source });
                }
                Err(e) => {
                    warn!("initialization failed: {e}");
                    return Err(e);
                }
            }
        }

        info!("initialized {} servo channels", succeeded.len());
        Ok(())
    }
}
