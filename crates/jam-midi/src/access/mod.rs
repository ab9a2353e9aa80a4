//! Platform MIDI access.
//!
//! [`MidiAccess`] is the seam between the device registry and whatever the
//! platform offers for enumerating and listening to MIDI inputs:
//! hardware through midir (`midi-io` feature) or the in-memory
//! [`VirtualMidiAccess`] used by tests and by hosts without MIDI.

#[cfg(feature = "midi-io")]
mod midir_backend;
mod virtual_backend;

#[cfg(feature = "midi-io")]
pub use midir_backend::MidirAccess;
pub use virtual_backend::{Availability, VirtualMidiAccess};

use crate::error::Result;
use crate::sink::SinkSlot;
use std::fmt;
use std::sync::Arc;

/// Opaque, stable identifier of one input device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(Arc<str>);

impl DeviceId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

/// An input device as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub id: DeviceId,
    pub name: String,
}

impl DeviceDescriptor {
    pub fn new(id: impl Into<DeviceId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Platform MIDI access API.
///
/// `open` connects a device once; every message it produces afterwards is
/// handed to `slot`, whatever sink the slot holds at that moment. `close` must
/// be idempotent and tolerate unknown devices.
pub trait MidiAccess: Send + Sync {
    /// Enumerate available inputs, failing with `AccessDenied` or `Unsupported`.
    fn request_access(&self) -> Result<Vec<DeviceDescriptor>>;

    fn open(&self, device: &DeviceDescriptor, slot: SinkSlot) -> Result<()>;

    fn close(&self, device: &DeviceId);

    /// Backend name for logs.
    fn backend_name(&self) -> &'static str;
}

impl<A: MidiAccess + ?Sized> MidiAccess for Arc<A> {
    fn request_access(&self) -> Result<Vec<DeviceDescriptor>> {
        (**self).request_access()
    }

    fn open(&self, device: &DeviceDescriptor, slot: SinkSlot) -> Result<()> {
        (**self).open(device, slot)
    }

    fn close(&self, device: &DeviceId) {
        (**self).close(device)
    }

    fn backend_name(&self) -> &'static str {
        (**self).backend_name()
    }
}
