use std::io::{ErrorKind, Write};

use serialport::SerialPort;

use crate::{
    error::IoError,
    link::LinkConfig,
    transport::{PortIo, SerialTransport},
};

/// Real OS serial ports through the `serialport` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeTransport;

impl SerialTransport for NativeTransport {
    fn open(&self, config: &LinkConfig) -> Result<Box<dyn PortIo>, IoError> {
        let port = serialport::new(config.port.as_str(), config.baud_rate)
            .timeout(config.write_timeout)
            .open()
            .map_err(|e| open_error(&config.port, e))?;

        Ok(Box::new(NativePort { port }))
    }
}

struct NativePort {
    port: Box<dyn SerialPort>,
}

impl PortIo for NativePort {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), IoError> {
        self.port.write_all(bytes).map_err(write_error)?;
        self.port.flush().map_err(write_error)
    }
}

fn open_error(port: &str, e: serialport::Error) -> IoError {
    match e.kind() {
        serialport::ErrorKind::NoDevice => IoError::NotFound(port.to_string()),
        serialport::ErrorKind::Io(ErrorKind::NotFound) => IoError::NotFound(port.to_string()),
        serialport::ErrorKind::Io(ErrorKind::PermissionDenied) => {
            IoError::AccessDenied(port.to_string())
        }
        _ => IoError::Other(e.description),
    }
}

// EIO, ENXIO, ENODEV on unix; ERROR_GEN_FAILURE, ERROR_BAD_COMMAND,
// ERROR_DEVICE_NOT_CONNECTED on windows.
#[cfg(unix)]
const VANISHED_OS_ERRORS: &[i32] = &[5, 6, 19];
#[cfg(windows)]
const VANISHED_OS_ERRORS: &[i32] = &[22, 31, 1167];
#[cfg(not(any(unix, windows)))]
const VANISHED_OS_ERRORS: &[i32] = &[];

fn write_error(e: std::io::Error) -> IoError {
    let vanished = matches!(
        e.kind(),
        ErrorKind::BrokenPipe
            | ErrorKind::NotConnected
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::UnexpectedEof
            | ErrorKind::WriteZero
            | ErrorKind::NotFound
    ) || e
        .raw_os_error()
        .is_some_and(|code| VANISHED_OS_ERRORS.contains(&code));

    if vanished {
        IoError::Disconnected
    } else {
        IoError::Other(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unplug_errors_classify_as_disconnected() {
        let e = std::io::Error::new(ErrorKind::BrokenPipe, "gone");
        assert_eq!(write_error(e), IoError::Disconnected);
    }

    #[test]
    fn timeouts_stay_distinct_from_unplug() {
        let e = std::io::Error::new(ErrorKind::TimedOut, "slow");
        assert!(matches!(write_error(e), IoError::Other(_)));
    }

    #[test]
    fn missing_port_maps_to_not_found() {
        let e = serialport::Error::new(serialport::ErrorKind::NoDevice, "no such device");
        assert_eq!(open_error("COM9", e), IoError::NotFound("COM9".into()));
    }

    #[test]
    fn opening_a_nonexistent_port_fails() {
        let cfg = LinkConfig {
            port: "/dev/this-port-does-not-exist".into(),
            ..LinkConfig::default()
        };
        assert!(NativeTransport.open(&cfg).is_err());
    }
}
