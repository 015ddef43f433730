use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use serial_arm_controller::{
    FrameSequence, IoError, LinkConfig, PortIo, Robot, RobotConfig, SerialLink, SerialTransport,
    Sequencer,
};

/// Prints every command instead of writing to a port.
struct DummyTransport {
    sent: Arc<Mutex<usize>>,
}

struct DummyPort {
    sent: Arc<Mutex<usize>>,
}

impl PortIo for DummyPort {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), IoError> {
        *self.sent.lock().map_err(|_| IoError::Other("poisoned".into()))? += 1;
        println!("  -> channel {} value {}", bytes[0], bytes[1]);
        Ok(())
    }
}

impl SerialTransport for DummyTransport {
    fn open(&self, config: &LinkConfig) -> Result<Box<dyn PortIo>, IoError> {
        println!("opening {} at {} baud", config.port, config.baud_rate);
        Ok(Box::new(DummyPort { sent: Arc::clone(&self.sent) }))
    }
}

fn main() -> anyhow::Result<()> {
    let sent = Arc::new(Mutex::new(0));
    let link = Arc::new(SerialLink::new(DummyTransport { sent: Arc::clone(&sent) }));
    link.configure("COM3", 9600)?;
    link.open()?;

    let robot = Arc::new(Robot::default_arm(
        Arc::clone(&link),
        RobotConfig { settle_delay: Duration::from_millis(100) },
    )?);
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?
        .block_on(robot.initialize_servo_angles())?;

    robot.set_servo_angle(6, 120.0)?;

    let mut seq = FrameSequence::new();
    seq.append("home", robot.angles(), 200);
    seq.append("reach", [120.0, 60.0, 90.0, 90.0, 90.0, 90.0, 180.0], 200);
    seq.append("release", [120.0, 60.0, 90.0, 90.0, 90.0, 90.0, 0.0], 200);
    println!("{}", seq.to_json()?);

    let sequencer = Sequencer::new();
    for event in sequencer.play(&seq, Arc::clone(&robot))? {
        println!("frame {} {:?}", event.frame_id, event.status);
    }
    println!("sequencer {:?}", sequencer.state());

    link.close()?;
    println!("{} commands sent", *sent.lock().map_err(|_| anyhow::anyhow!("poisoned"))?);
    Ok(())
}
