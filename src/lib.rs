//! # jam - MIDI-driven instrument host
//!
//! Plays an external sound engine from every connected MIDI controller.
//!
//! ## Architecture
//!
//! jam is an umbrella crate over:
//! - **jam-midi** - MIDI decoding, device registry, dispatch to the engine,
//!   platform access backends (midir, in-memory)
//!
//! ## Quick Start
//!
//! ```ignore
//! use jam::prelude::*;
//!
//! // Any type implementing SoundEngine
//! let instrument = Instrument::builder(Arc::new(LoggingEngine))
//!     .hotplug(Duration::from_secs(1))
//!     .build()?;
//!
//! println!("{}", instrument.status());
//!
//! // Non-MIDI input path
//! instrument.note_on(60, 100);
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - Hardware MIDI input
//! - `midi-hardware` - midir backend; without it MIDI reports as unsupported

/// Re-export of jam-midi for direct access
pub use jam_midi as midi;

mod builder;
mod error;
mod instrument;

pub use builder::InstrumentBuilder;
pub use error::{Error, Result};
pub use instrument::Instrument;

pub mod prelude {
    pub use crate::{Instrument, InstrumentBuilder};

    pub use crate::midi::{
        Delivery, DeviceChanges, DeviceDescriptor, DispatchOutcome, EngineError, LoggingEngine,
        MidiConfig, MidiEvent, MidiStatus, SoundEngine,
    };

    pub use std::sync::Arc;
    pub use std::time::Duration;
}
