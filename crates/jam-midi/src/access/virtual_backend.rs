//! In-memory MIDI access.
//!
//! Holds a device set that can be edited at runtime (simulating hot-plug) and
//! lets callers inject raw messages on any device. Injected messages go
//! through the same [`SinkSlot`] path as hardware input.

use super::{DeviceDescriptor, DeviceId, MidiAccess};
use crate::error::{Error, Result};
use crate::sink::SinkSlot;
use parking_lot::Mutex;
use std::sync::Arc;

/// Whether the simulated platform grants MIDI access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Availability {
    #[default]
    Granted,
    Denied,
    Unsupported,
}

struct VirtualDevice {
    descriptor: DeviceDescriptor,
    connection: Option<SinkSlot>,
}

#[derive(Default)]
struct VirtualState {
    availability: Availability,
    devices: Vec<VirtualDevice>,
    next_id: u64,
}

/// Cloning shares the same device set.
#[derive(Clone, Default)]
pub struct VirtualMidiAccess {
    state: Arc<Mutex<VirtualState>>,
}

impl VirtualMidiAccess {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_availability(availability: Availability) -> Self {
        let access = Self::new();
        access.set_availability(availability);
        access
    }

    pub fn set_availability(&self, availability: Availability) {
        self.state.lock().availability = availability;
    }

    pub fn availability(&self) -> Availability {
        self.state.lock().availability
    }

    /// Plug in a new device. Returns its id.
    pub fn add_device(&self, name: impl Into<String>) -> DeviceId {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = DeviceId::new(format!("virtual-{}", state.next_id));
        state.devices.push(VirtualDevice {
            descriptor: DeviceDescriptor::new(id.clone(), name),
            connection: None,
        });
        id
    }

    /// Unplug a device. Its connection, if any, stops delivering immediately.
    pub fn remove_device(&self, id: &DeviceId) -> bool {
        let mut state = self.state.lock();
        let before = state.devices.len();
        state.devices.retain(|d| &d.descriptor.id != id);
        before != state.devices.len()
    }

    /// Deliver a raw message as if `id` produced it.
    ///
    /// Returns false when the device is unknown, not opened, or has no sink.
    pub fn send(&self, id: &DeviceId, bytes: &[u8]) -> bool {
        // Deliver outside the lock so sinks may call back into this backend.
        let slot = {
            let state = self.state.lock();
            state
                .devices
                .iter()
                .find(|d| &d.descriptor.id == id)
                .and_then(|d| d.connection.clone())
        };
        slot.map(|slot| slot.deliver(bytes)).unwrap_or(false)
    }

    pub fn is_open(&self, id: &DeviceId) -> bool {
        self.state
            .lock()
            .devices
            .iter()
            .any(|d| &d.descriptor.id == id && d.connection.is_some())
    }

    pub fn open_count(&self) -> usize {
        self.state
            .lock()
            .devices
            .iter()
            .filter(|d| d.connection.is_some())
            .count()
    }
}

impl MidiAccess for VirtualMidiAccess {
    fn request_access(&self) -> Result<Vec<DeviceDescriptor>> {
        let state = self.state.lock();
        match state.availability {
            Availability::Granted => Ok(state
                .devices
                .iter()
                .map(|d| d.descriptor.clone())
                .collect()),
            Availability::Denied => Err(Error::AccessDenied(
                "virtual MIDI access refused".to_string(),
            )),
            Availability::Unsupported => Err(Error::Unsupported(
                "virtual MIDI backend disabled".to_string(),
            )),
        }
    }

    fn open(&self, device: &DeviceDescriptor, slot: SinkSlot) -> Result<()> {
        let mut state = self.state.lock();
        if state.availability != Availability::Granted {
            return Err(Error::AccessDenied(format!(
                "cannot open {} without MIDI access",
                device.name
            )));
        }
        let entry = state
            .devices
            .iter_mut()
            .find(|d| d.descriptor.id == device.id)
            .ok_or_else(|| Error::UnknownDevice(device.id.clone()))?;
        entry.connection = Some(slot);
        Ok(())
    }

    fn close(&self, device: &DeviceId) {
        let mut state = self.state.lock();
        if let Some(entry) = state.devices.iter_mut().find(|d| &d.descriptor.id == device) {
            entry.connection = None;
        }
    }

    fn backend_name(&self) -> &'static str {
        "virtual"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MessageSink;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_enumerate_devices() {
        let access = VirtualMidiAccess::new();
        let a = access.add_device("Keys");
        let b = access.add_device("Pads");
        assert_ne!(a, b);

        let devices = access.request_access().unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].name, "Keys");
        assert_eq!(devices[1].id, b);
    }

    #[test]
    fn test_availability_errors() {
        let access = VirtualMidiAccess::with_availability(Availability::Denied);
        assert!(matches!(
            access.request_access(),
            Err(Error::AccessDenied(_))
        ));

        access.set_availability(Availability::Unsupported);
        assert!(matches!(access.request_access(), Err(Error::Unsupported(_))));

        access.set_availability(Availability::Granted);
        assert!(access.request_access().unwrap().is_empty());
    }

    #[test]
    fn test_send_requires_open_device() {
        let access = VirtualMidiAccess::new();
        let id = access.add_device("Keys");
        assert!(!access.send(&id, &[0x90, 60, 100]));

        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = Arc::clone(&hits);
        let slot = SinkSlot::new(id.clone());
        slot.replace(MessageSink::new(move |_, _| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        }));

        let descriptor = access.request_access().unwrap().remove(0);
        access.open(&descriptor, slot).unwrap();
        assert!(access.is_open(&id));
        assert!(access.send(&id, &[0x90, 60, 100]));
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        access.close(&id);
        access.close(&id);
        assert!(!access.is_open(&id));
        assert!(!access.send(&id, &[0x90, 60, 100]));
    }

    #[test]
    fn test_open_unknown_device() {
        let access = VirtualMidiAccess::new();
        let ghost = DeviceDescriptor::new("ghost", "Ghost");
        let result = access.open(&ghost, SinkSlot::new(ghost.id.clone()));
        assert!(matches!(result, Err(Error::UnknownDevice(_))));
    }

    #[test]
    fn test_remove_device_stops_delivery() {
        let access = VirtualMidiAccess::new();
        let id = access.add_device("Keys");
        let descriptor = access.request_access().unwrap().remove(0);
        access.open(&descriptor, SinkSlot::new(id.clone())).unwrap();
        assert_eq!(access.open_count(), 1);

        assert!(access.remove_device(&id));
        assert!(!access.remove_device(&id));
        assert_eq!(access.open_count(), 0);
        assert!(!access.send(&id, &[0x80, 60, 0]));
    }
}
