use std::{
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::{
    error::{ConfigError, IoError},
    transport::{PortIo, SerialTransport},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    pub port: String,
    pub baud_rate: u32,
    pub write_timeout: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: 9600,
            write_timeout: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Open { port: String, baud_rate: u32 },
    /// The handle vanished during a send; `open` again to recover.
    Lost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    Closed,
    AlreadyClosed,
}

struct LinkInner {
    config: LinkConfig,
    port: Option<Box<dyn PortIo>>,
}

/// The single serial connection to the arm.
///
/// Every operation takes the one internal lock for the duration of the OS
/// call, so interactive commands, playback and connect/disconnect are
/// serialized against each other. Share it as `Arc<SerialLink>`.
pub struct SerialLink {
    transport: Box<dyn SerialTransport>,
    inner: Mutex<LinkInner>,
    state_tx: watch::Sender<ConnectionState>,
}

impl SerialLink {
    pub fn new<T: SerialTransport>(transport: T) -> Self {
        Self::with_config(transport, LinkConfig::default())
    }

    pub fn with_config<T: SerialTransport>(transport: T, config: LinkConfig) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Closed);
        Self {
            transport: Box::new(transport),
            inner: Mutex::new(LinkInner { config, port: None }),
            state_tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, LinkInner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn configure(&self, port: &str, baud_rate: u32) -> Result<(), ConfigError> {
        let mut inner = self.lock();
        if inner.port.is_some() {
            return Err(ConfigError::PortBusy);
        }
        if port.trim().is_empty() {
            return Err(ConfigError::InvalidPort);
        }
        if baud_rate == 0 {
            return Err(ConfigError::InvalidBaud(baud_rate));
        }
        inner.config.port = port.to_string();
        inner.config.baud_rate = baud_rate;
        info!("serial link configured for {port} at {baud_rate} baud");
        Ok(())
    }

    pub fn config(&self) -> LinkConfig {
        self.lock().config.clone()
    }

    pub fn is_open(&self) -> bool {
        self.lock().port.is_some()
    }

    pub fn open(&self) -> Result<(), IoError> {
        let mut inner = self.lock();
        if inner.port.is_some() {
            return Err(IoError::AlreadyOpen);
        }
        let port = self.transport.open(&inner.config).map_err(|e| {
            warn!("failed to open {}: {e}", inner.config.port);
            e
        })?;
        inner.port = Some(port);
        info!("opened {} at {} baud", inner.config.port, inner.config.baud_rate);
        self.state_tx.send_replace(ConnectionState::Open {
            port: inner.config.port.clone(),
            baud_rate: inner.config.baud_rate,
        });
        Ok(())
    }

    /// Releases the handle. Closing a closed link succeeds with
    /// `CloseOutcome::AlreadyClosed`.
    pub fn close(&self) -> Result<CloseOutcome, IoError> {
        let mut inner = self.lock();
        match inner.port.take() {
            Some(port) => {
                drop(port);
                info!("closed {}", inner.config.port);
                self.state_tx.send_replace(ConnectionState::Closed);
                Ok(CloseOutcome::Closed)
            }
            None => {
                self.state_tx.send_if_modified(|state| {
                    if *state == ConnectionState::Closed {
                        false
                    } else {
                        *state = ConnectionState::Closed;
                        true
                    }
                });
                Ok(CloseOutcome::AlreadyClosed)
            }
        }
    }

    /// Blocking write of the full buffer. A vanished device drops the
    /// handle, so the link reads as closed afterwards.
    pub fn send(&self, bytes: &[u8]) -> Result<(), IoError> {
        let mut inner = self.lock();
        let port = inner.port.as_mut().ok_or(IoError::NotOpen)?;
        match port.write_all(bytes) {
            Ok(()) => Ok(()),
            Err(e) => {
                if e.is_disconnect() {
                    inner.port = None;
                    warn!("{} disconnected during write", inner.config.port);
                    self.state_tx.send_replace(ConnectionState::Lost);
                } else {
                    warn!("write to {} failed: {e}", inner.config.port);
                }
                Err(e)
            }
        }
    }

    /// Connection state changes, for display.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }
}
