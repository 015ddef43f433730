use crate::{error::IoError, link::LinkConfig};

/// Opens OS serial handles. One implementation talks to real ports, tests
/// supply their own.
pub trait SerialTransport: Send + Sync + 'static {
    fn open(&self, config: &LinkConfig) -> Result<Box<dyn PortIo>, IoError>;
}

/// An open serial handle. Dropping it releases the port.
pub trait PortIo: Send {
    /// Blocking write of the whole buffer.
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), IoError>;
}
