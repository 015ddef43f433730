#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use serial_arm_controller::{IoError, LinkConfig, PortIo, SerialTransport};

/// Records every write; optionally reports the device unplugged once a
/// given number of writes have gone through.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    writes: Arc<Mutex<Vec<Vec<u8>>>>,
    fail_after: Arc<Mutex<Option<usize>>>,
}

impl RecordingTransport {
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.writes.lock().unwrap().clone()
    }

    pub fn fail_after(&self, writes: Option<usize>) {
        *self.fail_after.lock().unwrap() = writes;
    }
}

struct RecordingPort {
    transport: RecordingTransport,
}

impl PortIo for RecordingPort {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), IoError> {
        let mut writes = self.transport.writes.lock().unwrap();
        if *self.transport.fail_after.lock().unwrap() == Some(writes.len()) {
            return Err(IoError::Disconnected);
        }
        writes.push(bytes.to_vec());
        Ok(())
    }
}

impl SerialTransport for RecordingTransport {
    fn open(&self, config: &LinkConfig) -> Result<Box<dyn PortIo>, IoError> {
        if config.port.is_empty() {
            return Err(IoError::NotFound(config.port.clone()));
        }
        Ok(Box::new(RecordingPort { transport: self.clone() }))
    }
}
