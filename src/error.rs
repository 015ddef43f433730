use thiserror::Error;

use crate::model::FrameId;

#[derive(Debug, Error, Clone, PartialEq)]
#[error("angle {angle} outside [{min}, {max}]")]
pub struct AngleOutOfRange {
    pub angle: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("invalid servo bounds: min {min}, max {max}, angle {angle}")]
pub struct InvalidBounds {
    pub min: f64,
    pub max: f64,
    pub angle: f64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("serial port is open, close it before reconfiguring")]
    PortBusy,
    #[error("serial port name is empty")]
    InvalidPort,
    #[error("invalid baud rate: {0}")]
    InvalidBaud(u32),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IoError {
    #[error("serial port not found: {0}")]
    NotFound(String),
    #[error("access to serial port denied: {0}")]
    AccessDenied(String),
    #[error("serial port already open")]
    AlreadyOpen,
    #[error("serial port not open")]
    NotOpen,
    #[error("serial device disconnected")]
    Disconnected,
    #[error("serial i/o error: {0}")]
    Other(String),
}

impl IoError {
    /// True when the OS handle vanished underneath an open link.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, IoError::Disconnected)
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RobotError {
    #[error("channel {index} out of range (robot has {count} channels)")]
    InvalidChannel { index: usize, count: usize },
    #[error("invalid angle for channel {channel}: {source}")]
    InvalidAngle {
        channel: usize,
        #[source]
        source: AngleOutOfRange,
    },
    #[error("link down while sending channel {channel}: {source}")]
    LinkDown {
        channel: usize,
        #[source]
        source: IoError,
    },
    #[error("initialization stopped at channel {channel} after channels {succeeded:?}: {source}")]
    PartialInitialization {
        succeeded: Vec<usize>,
        channel: usize,
        #[source]
        source: IoError,
    },
}

impl RobotError {
    pub fn is_link_fault(&self) -> bool {
        matches!(
            self,
            RobotError::LinkDown { .. } | RobotError::PartialInitialization { .. }
        )
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("frame {0} not found")]
pub struct FrameNotFound(pub FrameId);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PersistError {
    #[error("frame storage i/o: {0}")]
    Io(String),
    #[error("malformed frame data: {0}")]
    Format(String),
    #[error("duplicate frame id {0}")]
    DuplicateId(FrameId),
    #[error("frame id {0} exceeds the largest storable id")]
    IdOutOfRange(FrameId),
    #[error("frame {0} has a non-finite angle")]
    NonFiniteAngle(FrameId),
}

impl From<std::io::Error> for PersistError {
    fn from(e: std::io::Error) -> Self {
        PersistError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for PersistError {
    fn from(e: serde_json::Error) -> Self {
        PersistError::Format(e.to_string())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SequencerError {
    #[error("playback already running")]
    Busy,
    #[error("sequencer faulted at frame {0}, reset required")]
    Faulted(FrameId),
    #[error("serial link is not open")]
    LinkDown,
    #[error("playback runtime: {0}")]
    Runtime(String),
}
