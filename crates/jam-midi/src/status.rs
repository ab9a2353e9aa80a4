//! MIDI availability, as shown to the surrounding application.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MidiStatus {
    /// Access has not been requested yet.
    #[default]
    Pending,
    Ready {
        devices: usize,
    },
    AccessDenied,
    Unsupported,
}

impl MidiStatus {
    /// Status for a failed access request, `None` for errors that are not access errors.
    pub fn from_error(error: &Error) -> Option<Self> {
        match error {
            Error::AccessDenied(_) => Some(MidiStatus::AccessDenied),
            Error::Unsupported(_) => Some(MidiStatus::Unsupported),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, MidiStatus::Ready { .. })
    }
}

impl fmt::Display for MidiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MidiStatus::Pending => f.write_str("MIDI pending"),
            MidiStatus::Ready { devices: 1 } => f.write_str("ready (1 MIDI input)"),
            MidiStatus::Ready { devices } => write!(f, "ready ({} MIDI inputs)", devices),
            MidiStatus::AccessDenied => f.write_str("MIDI access denied"),
            MidiStatus::Unsupported => f.write_str("MIDI unsupported"),
        }
    }
}

/// Called once per status transition.
pub type StatusCallback = Arc<dyn Fn(MidiStatus) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_error() {
        assert_eq!(
            MidiStatus::from_error(&Error::AccessDenied("no".into())),
            Some(MidiStatus::AccessDenied)
        );
        assert_eq!(
            MidiStatus::from_error(&Error::Unsupported("no backend".into())),
            Some(MidiStatus::Unsupported)
        );
        assert_eq!(
            MidiStatus::from_error(&Error::MidiPort("busy".into())),
            None
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(MidiStatus::Unsupported.to_string(), "MIDI unsupported");
        assert_eq!(MidiStatus::AccessDenied.to_string(), "MIDI access denied");
        assert_eq!(
            MidiStatus::Ready { devices: 2 }.to_string(),
            "ready (2 MIDI inputs)"
        );
        assert!(!MidiStatus::Pending.is_ready());
        assert!(MidiStatus::Ready { devices: 0 }.is_ready());
    }
}
