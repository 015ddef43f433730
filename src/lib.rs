pub mod conversion;
pub mod error;
pub mod frames;
pub mod link;
pub mod model;
pub mod protocol;
pub mod robot;
pub mod sequencer;
pub mod servo;
pub mod transport;
pub mod transport_serialport;

pub use conversion::AngleScale;
pub use error::{
    AngleOutOfRange, ConfigError, FrameNotFound, InvalidBounds, IoError, PersistError, RobotError,
    SequencerError,
};
pub use frames::{Frame, FrameEdit, FrameRow, FrameSequence};
pub use link::{CloseOutcome, ConnectionState, LinkConfig, SerialLink};
pub use model::{Angles, FrameId, CHANNEL_COUNT};
pub use protocol::ServoCommand;
pub use robot::{default_arm_servos, Robot, RobotConfig};
pub use sequencer::{FrameStatus, PlaybackEvent, PlaybackHandle, PlayerState, Sequencer};
pub use servo::{AngleMode, Servo};
pub use transport::{PortIo, SerialTransport};
pub use transport_serialport::NativeTransport;
