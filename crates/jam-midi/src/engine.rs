//! Control surface of the sound engine the dispatcher drives.
//!
//! The engine itself (voices, envelopes, audio graph) lives outside this crate.
//! Entry points take `&self`: the engine is shared across every device callback
//! and is responsible for its own synchronization. Implementations must be
//! bounded-latency; the dispatcher calls them directly from device callbacks.

use crate::error::EngineError;
use crate::utils::{note_to_hz, velocity_to_gain};
use std::sync::Arc;
use tracing::info;

/// Highest valid MIDI note number / velocity.
pub const MAX_DATA_VALUE: u8 = 127;

pub trait SoundEngine: Send + Sync {
    fn note_on(&self, note: u8, velocity: u8) -> Result<(), EngineError>;

    fn note_off(&self, note: u8, velocity: u8) -> Result<(), EngineError>;
}

impl<E: SoundEngine + ?Sized> SoundEngine for Arc<E> {
    #[inline]
    fn note_on(&self, note: u8, velocity: u8) -> Result<(), EngineError> {
        (**self).note_on(note, velocity)
    }

    #[inline]
    fn note_off(&self, note: u8, velocity: u8) -> Result<(), EngineError> {
        (**self).note_off(note, velocity)
    }
}

impl<E: SoundEngine + ?Sized> SoundEngine for &E {
    #[inline]
    fn note_on(&self, note: u8, velocity: u8) -> Result<(), EngineError> {
        (**self).note_on(note, velocity)
    }

    #[inline]
    fn note_off(&self, note: u8, velocity: u8) -> Result<(), EngineError> {
        (**self).note_off(note, velocity)
    }
}

/// Range check for engines that only accept 7-bit data bytes.
#[inline]
pub fn check_note_args(note: u8, velocity: u8) -> Result<(), EngineError> {
    if note > MAX_DATA_VALUE {
        return Err(EngineError::NoteOutOfRange(note));
    }
    if velocity > MAX_DATA_VALUE {
        return Err(EngineError::VelocityOutOfRange(velocity));
    }
    Ok(())
}

/// Engine that only traces the calls it receives. Used by the demos.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingEngine;

impl SoundEngine for LoggingEngine {
    fn note_on(&self, note: u8, velocity: u8) -> Result<(), EngineError> {
        check_note_args(note, velocity)?;
        info!(
            "note on  {:3} ({:7.2} Hz) gain {:.2}",
            note,
            note_to_hz(note),
            velocity_to_gain(velocity)
        );
        Ok(())
    }

    fn note_off(&self, note: u8, velocity: u8) -> Result<(), EngineError> {
        check_note_args(note, velocity)?;
        info!("note off {:3} ({:7.2} Hz)", note, note_to_hz(note));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_note_args() {
        assert!(check_note_args(0, 0).is_ok());
        assert!(check_note_args(127, 127).is_ok());
        assert_eq!(
            check_note_args(128, 0),
            Err(EngineError::NoteOutOfRange(128))
        );
        assert_eq!(
            check_note_args(60, 200),
            Err(EngineError::VelocityOutOfRange(200))
        );
    }

    #[test]
    fn test_logging_engine_validates() {
        let engine = LoggingEngine;
        assert!(engine.note_on(60, 100).is_ok());
        assert!(engine.note_off(60, 0).is_ok());
        assert!(engine.note_on(200, 100).is_err());
    }

    #[test]
    fn test_shared_engine_forwards() {
        let engine: Arc<dyn SoundEngine> = Arc::new(LoggingEngine);
        assert!(engine.note_on(64, 1).is_ok());
        assert!((&engine).note_off(64, 1).is_ok());
    }
}
