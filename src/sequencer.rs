use std::{
    sync::{Arc, Mutex, MutexGuard},
    thread::JoinHandle,
};

use tokio::{
    runtime::Builder,
    sync::{mpsc, watch},
    time,
};
use tracing::{debug, info, warn};

use crate::{
    error::{RobotError, SequencerError},
    frames::{Frame, FrameSequence},
    model::FrameId,
    robot::Robot,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Playing,
    Faulted { frame_id: FrameId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// Every channel was written.
    Applied,
    /// The frame holds an angle outside a servo's bounds; nothing was sent.
    Skipped,
    /// The link failed while writing the frame. Playback stopped.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackEvent {
    pub frame_id: FrameId,
    pub status: FrameStatus,
}

struct Shared {
    state: Mutex<PlayerState>,
    cancel: watch::Sender<bool>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, PlayerState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// The state guard is held across the send so a cancel cannot land on
    /// the next run.
    fn cancel(&self) {
        let state = self.state();
        if *state == PlayerState::Playing {
            self.cancel.send_replace(true);
        }
    }
}

/// Replays frame sequences on a robot from a background thread.
///
/// `Idle -> Playing -> Idle` on completion or cancel, `Playing -> Faulted`
/// on a link fault. `Faulted` only goes back to `Idle` through `reset`.
pub struct Sequencer {
    shared: Arc<Shared>,
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl Sequencer {
    pub fn new() -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared { state: Mutex::new(PlayerState::Idle), cancel }),
        }
    }

    pub fn state(&self) -> PlayerState {
        *self.shared.state()
    }

    /// Starts playback of a snapshot of `sequence`. Events arrive on the
    /// returned handle, one per frame reached.
    pub fn play(
        &self,
        sequence: &FrameSequence,
        robot: Arc<Robot>,
    ) -> Result<PlaybackHandle, SequencerError> {
        let cancel_rx = {
            let mut state = self.shared.state();
            match *state {
                PlayerState::Idle => {}
                PlayerState::Playing => return Err(SequencerError::Busy),
                PlayerState::Faulted { frame_id } => return Err(SequencerError::Faulted(frame_id)),
            }
            *state = PlayerState::Playing;
            self.shared.cancel.send_replace(false);
            self.shared.cancel.subscribe()
        };

        let runtime = match Builder::new_current_thread().enable_time().build() {
            Ok(rt) => rt,
            Err(e) => {
                *self.shared.state() = PlayerState::Idle;
                return Err(SequencerError::Runtime(e.to_string()));
            }
        };

        let frames = sequence.frames().to_vec();
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::clone(&self.shared);
        info!("playback started: {} frames", frames.len());

        let thread = std::thread::spawn(move || {
            let end = runtime.block_on(run(frames, &robot, cancel_rx, &tx));
            *shared.state() = end;
            match end {
                PlayerState::Faulted { frame_id } => warn!("playback faulted at frame {frame_id}"),
                _ => info!("playback finished"),
            }
            drop(tx);
        });

        Ok(PlaybackHandle { events: rx, shared: Arc::clone(&self.shared), thread: Some(thread) })
    }

    /// Stops playback at the next frame boundary. No-op unless playing.
    pub fn cancel(&self) {
        self.shared.cancel();
    }

    /// Leaves `Faulted`. The robot's link must already be open again.
    pub fn reset(&self, robot: &Robot) -> Result<(), SequencerError> {
        let mut state = self.shared.state();
        match *state {
            PlayerState::Idle => Ok(()),
            PlayerState::Playing => Err(SequencerError::Busy),
            PlayerState::Faulted { frame_id } => {
                if !robot.link().is_open() {
                    return Err(SequencerError::LinkDown);
                }
                info!("sequencer reset after fault at frame {frame_id}");
                *state = PlayerState::Idle;
                Ok(())
            }
        }
    }
}

async fn run(
    frames: Vec<Frame>,
    robot: &Robot,
    mut cancel: watch::Receiver<bool>,
    events: &mpsc::UnboundedSender<PlaybackEvent>,
) -> PlayerState {
    let emit = |frame_id, status| {
        // A dropped handle does not stop playback.
        let _ = events.send(PlaybackEvent { frame_id, status });
    };

    for frame in &frames {
        if *cancel.borrow() {
            info!("playback cancelled before frame {}", frame.id());
            return PlayerState::Idle;
        }

        if let Err(e) = robot.check_angles(frame.angles()) {
            warn!("skipping frame {}: {e}", frame.id());
            emit(frame.id(), FrameStatus::Skipped);
            continue;
        }

        if let Err(e) = apply(frame, robot) {
            warn!("frame {} failed: {e}", frame.id());
            emit(frame.id(), FrameStatus::Failed);
            return PlayerState::Faulted { frame_id: frame.id() };
        }
        debug!("frame {} applied, holding {} ms", frame.id(), frame.duration_ms());
        emit(frame.id(), FrameStatus::Applied);

        tokio::select! {
            _ = time::sleep(frame.duration()) => {}
            _ = cancel.wait_for(|cancelled| *cancelled) => {
                info!("playback cancelled during frame {}", frame.id());
                return PlayerState::Idle;
            }
        }
    }

    PlayerState::Idle
}

fn apply(frame: &Frame, robot: &Robot) -> Result<(), RobotError> {
    for (channel, angle) in frame.angles().iter().enumerate() {
        robot.set_servo_angle(channel, *angle)?;
    }
    Ok(())
}

/// Receiving end of one playback run.
pub struct PlaybackHandle {
    events: mpsc::UnboundedReceiver<PlaybackEvent>,
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
}

impl PlaybackHandle {
    pub async fn recv(&mut self) -> Option<PlaybackEvent> {
        self.events.recv().await
    }

    pub fn cancel(&self) {
        self.shared.cancel();
    }

    /// Blocks until the playback thread has finished and returns the
    /// state it left the sequencer in.
    pub fn join(mut self) -> PlayerState {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("playback thread panicked");
            }
        }
        *self.shared.state()
    }
}

/// Blocking iteration; not for use inside an async context.
impl Iterator for PlaybackHandle {
    type Item = PlaybackEvent;

    fn next(&mut self) -> Option<PlaybackEvent> {
        self.events.blocking_recv()
    }
}
