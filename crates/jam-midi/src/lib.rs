//! MIDI input subsystem for the jam instrument.
//!
//! Decodes raw controller bytes into note events, tracks the connected input
//! devices, and dispatches every note to a [`SoundEngine`].
//!
//! Feature gates: `midi-io` (hardware input through midir).

pub mod error;
pub use error::{EngineError, Error, Result};

pub mod event;
pub use event::{decode, MidiEvent, RawMidiMessage};

pub mod access;
#[cfg(feature = "midi-io")]
pub use access::MidirAccess;
pub use access::{Availability, DeviceDescriptor, DeviceId, MidiAccess, VirtualMidiAccess};

mod sink;
pub use sink::{MessageSink, SinkSlot, SlotUpdate};

mod status;
pub use status::{MidiStatus, StatusCallback};

mod registry;
pub use registry::{DeviceChanges, DeviceRegistry, InputDevice};

mod engine;
pub use engine::{check_note_args, LoggingEngine, SoundEngine, MAX_DATA_VALUE};

mod dispatch;
pub use dispatch::{dispatch, DispatchCounts, DispatchOutcome, DispatchStats, Dispatcher};

mod pipeline;
pub use pipeline::{Delivery, MidiPipeline, DEFAULT_QUEUE_CAPACITY};

mod hotplug;
pub use hotplug::{HotplugWatcher, DEFAULT_HOTPLUG_INTERVAL};

mod config;
pub use config::{MidiConfig, DEFAULT_CLIENT_NAME};

mod utils;
pub use utils::{note_to_hz, velocity_to_gain};
