//! Error types for the MIDI input subsystem.

use crate::access::DeviceId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("MIDI access denied: {0}")]
    AccessDenied(String),

    #[error("MIDI unsupported: {0}")]
    Unsupported(String),

    #[error("Unknown MIDI input device: {0}")]
    UnknownDevice(DeviceId),

    #[error("MIDI port error: {0}")]
    MidiPort(String),

    #[error("MIDI device error: {0}")]
    MidiDevice(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Access errors degrade the instrument to no-MIDI mode instead of failing startup.
    pub fn is_access_error(&self) -> bool {
        matches!(self, Error::AccessDenied(_) | Error::Unsupported(_))
    }
}

/// Failure reported by a sound engine entry point.
///
/// These never leave the dispatcher; a rejected message is logged and counted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("note {0} outside 0-127")]
    NoteOutOfRange(u8),

    #[error("velocity {0} outside 0-127")]
    VelocityOutOfRange(u8),

    #[error("engine rejected call: {0}")]
    Rejected(String),
}

#[cfg(feature = "midi-io")]
impl From<midir::InitError> for Error {
    fn from(e: midir::InitError) -> Self {
        Error::Unsupported(e.to_string())
    }
}

#[cfg(feature = "midi-io")]
impl From<midir::PortInfoError> for Error {
    fn from(e: midir::PortInfoError) -> Self {
        Error::MidiDevice(e.to_string())
    }
}

#[cfg(feature = "midi-io")]
impl From<midir::ConnectError<midir::MidiInput>> for Error {
    fn from(e: midir::ConnectError<midir::MidiInput>) -> Self {
        Error::MidiPort(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
