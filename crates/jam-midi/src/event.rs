//! MIDI message decoding.
//!
//! Raw device bytes are classified into the two channel-voice messages the
//! instrument plays (Note On / Note Off). Everything else decodes to
//! [`MidiEvent::Ignored`]. Decoding is total: short or malformed input never
//! fails, missing data bytes read as 0.
//!
//! The channel nibble is not surfaced. A note played on any channel sounds the same.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Masks the message type out of a status byte.
pub const STATUS_TYPE_MASK: u8 = 0xF0;
/// Masks the channel out of a status byte.
pub const CHANNEL_MASK: u8 = 0x0F;

pub const NOTE_OFF: u8 = 0x80;
pub const NOTE_ON: u8 = 0x90;

/// Channel-voice messages carry at most a status byte and two data bytes.
pub const MAX_MESSAGE_LEN: usize = 3;

/// One hardware MIDI message, as delivered by a device callback.
///
/// Only the first three bytes are kept; anything past the second data byte
/// is never looked at by the decoder.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawMidiMessage {
    bytes: SmallVec<[u8; MAX_MESSAGE_LEN]>,
}

impl RawMidiMessage {
    pub fn new(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.iter().take(MAX_MESSAGE_LEN).copied().collect(),
        }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub fn status(&self) -> Option<u8> {
        self.bytes.first().copied()
    }

    /// High nibble of the status byte (`0x90` for Note On, etc).
    #[inline]
    pub fn message_type(&self) -> Option<u8> {
        self.status().map(|s| s & STATUS_TYPE_MASK)
    }

    /// Low nibble of the status byte, 0-15.
    #[inline]
    pub fn channel(&self) -> Option<u8> {
        self.status().map(|s| s & CHANNEL_MASK)
    }

    #[inline]
    pub fn decode(&self) -> MidiEvent {
        decode(&self.bytes)
    }
}

impl From<&[u8]> for RawMidiMessage {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes)
    }
}

impl AsRef<[u8]> for RawMidiMessage {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

/// Typed musical event decoded from one raw message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MidiEvent {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8, velocity: u8 },
    Ignored,
}

impl MidiEvent {
    #[inline]
    pub fn decode(bytes: &[u8]) -> Self {
        decode(bytes)
    }

    #[inline]
    pub fn is_ignored(&self) -> bool {
        matches!(self, MidiEvent::Ignored)
    }

    #[inline]
    pub fn is_note_on(&self) -> bool {
        matches!(self, MidiEvent::NoteOn { .. })
    }

    #[inline]
    pub fn is_note_off(&self) -> bool {
        matches!(self, MidiEvent::NoteOff { .. })
    }

    #[inline]
    pub fn note(&self) -> Option<u8> {
        match self {
            MidiEvent::NoteOn { note, .. } | MidiEvent::NoteOff { note, .. } => Some(*note),
            MidiEvent::Ignored => None,
        }
    }

    #[inline]
    pub fn velocity(&self) -> Option<u8> {
        match self {
            MidiEvent::NoteOn { velocity, .. } | MidiEvent::NoteOff { velocity, .. } => {
                Some(*velocity)
            }
            MidiEvent::Ignored => None,
        }
    }

    /// Wire bytes for this event on `channel` (clamped to 0-15). `None` for `Ignored`.
    pub fn to_bytes(&self, channel: u8) -> Option<[u8; MAX_MESSAGE_LEN]> {
        let channel = channel.min(15);
        match *self {
            MidiEvent::NoteOn { note, velocity } => Some([NOTE_ON | channel, note, velocity]),
            MidiEvent::NoteOff { note, velocity } => Some([NOTE_OFF | channel, note, velocity]),
            MidiEvent::Ignored => None,
        }
    }
}

/// Classify a raw MIDI message.
///
/// Velocity-0 Note On is kept as `NoteOn`; it is not rewritten to `NoteOff`.
pub fn decode(bytes: &[u8]) -> MidiEvent {
    let Some(&status) = bytes.first() else {
        return MidiEvent::Ignored;
    };
    let note = bytes.get(1).copied().unwrap_or(0);
    let velocity = bytes.get(2).copied().unwrap_or(0);

    match status & STATUS_TYPE_MASK {
        NOTE_ON => MidiEvent::NoteOn { note, velocity },
        NOTE_OFF => MidiEvent::NoteOff { note, velocity },
        _ => MidiEvent::Ignored,
    }
}
