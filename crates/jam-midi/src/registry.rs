//! Device Registry
//!
//! Tracks the input devices the platform currently offers and which sink each
//! one feeds. Every registered device owns exactly one [`SinkSlot`], so a device
//! can never end up with two active sinks; subscribing replaces, and
//! unsubscribing clears.

use crate::access::{DeviceDescriptor, DeviceId, MidiAccess};
use crate::error::{Error, Result};
use crate::sink::{MessageSink, SinkSlot, SlotUpdate};
use crate::status::{MidiStatus, StatusCallback};
use arc_swap::{ArcSwap, ArcSwapOption};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// One connected MIDI source.
#[derive(Debug, Clone)]
pub struct InputDevice {
    descriptor: DeviceDescriptor,
    slot: SinkSlot,
}

impl InputDevice {
    pub fn id(&self) -> &DeviceId {
        &self.descriptor.id
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    pub fn is_subscribed(&self) -> bool {
        self.slot.is_attached()
    }

    pub fn sink(&self) -> Option<MessageSink> {
        self.slot.current()
    }
}

/// Devices that appeared or vanished during one refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceChanges {
    pub added: Vec<DeviceDescriptor>,
    pub removed: Vec<DeviceDescriptor>,
}

impl DeviceChanges {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

pub struct DeviceRegistry {
    access: Arc<dyn MidiAccess>,
    devices: RwLock<Vec<InputDevice>>,
    /// Attached to every device that would otherwise have no sink.
    sink: ArcSwapOption<MessageSink>,
    status: ArcSwap<MidiStatus>,
    on_status: Option<StatusCallback>,
}

impl DeviceRegistry {
    pub fn new(access: Arc<dyn MidiAccess>) -> Self {
        Self::with_parts(access, None)
    }

    pub fn with_status_callback(access: Arc<dyn MidiAccess>, on_status: StatusCallback) -> Self {
        Self::with_parts(access, Some(on_status))
    }

    fn with_parts(access: Arc<dyn MidiAccess>, on_status: Option<StatusCallback>) -> Self {
        Self {
            access,
            devices: RwLock::new(Vec::new()),
            sink: ArcSwapOption::empty(),
            status: ArcSwap::from_pointee(MidiStatus::Pending),
            on_status,
        }
    }

    /// Query the platform and reconcile the device set with it.
    ///
    /// New devices are opened, vanished ones are closed. Each reported device
    /// is visited once; duplicate reports are skipped. Once a registry sink is
    /// known (see [`rescan`](Self::rescan)), every device in the set holds a
    /// sink before it becomes visible, including devices cleared by
    /// [`unsubscribe`](Self::unsubscribe). Before that, new devices get an
    /// empty slot.
    ///
    /// On `AccessDenied`/`Unsupported` every device is dropped and the status
    /// is reported, once per transition.
    pub fn refresh(&self) -> Result<Vec<DeviceDescriptor>> {
        self.reconcile()?;
        Ok(self.descriptors())
    }

    /// Make `sink` the registry sink, then [`refresh`](Self::refresh).
    ///
    /// Every device in the set ends up subscribed, whether it was added now
    /// or registered earlier without a sink.
    pub fn rescan(&self, sink: &MessageSink) -> Result<DeviceChanges> {
        self.sink.store(Some(Arc::new(sink.clone())));
        self.reconcile()
    }

    fn reconcile(&self) -> Result<DeviceChanges> {
        let available = match self.access.request_access() {
            Ok(available) => available,
            Err(e) => {
                if let Some(status) = MidiStatus::from_error(&e) {
                    self.close_all();
                    self.set_status(status);
                } else {
                    warn!("MIDI device enumeration failed: {}", e);
                }
                return Err(e);
            }
        };

        let mut changes = DeviceChanges::default();
        let mut devices = self.devices.write();
        let sink = self.sink.load_full();

        let mut seen = HashSet::with_capacity(available.len());
        let available: Vec<DeviceDescriptor> = available
            .into_iter()
            .filter(|d| seen.insert(d.id.clone()))
            .collect();

        devices.retain(|device| {
            if seen.contains(device.id()) {
                return true;
            }
            self.detach(device);
            changes.removed.push(device.descriptor.clone());
            false
        });

        if let Some(sink) = &sink {
            for device in devices.iter().filter(|d| !d.is_subscribed()) {
                device.slot.replace(MessageSink::clone(sink));
                debug!("Subscribed sink to {}", device.name());
            }
        }

        for descriptor in available {
            if devices.iter().any(|d| d.id() == &descriptor.id) {
                continue;
            }
            // Attached before opening so no message arrives without a sink.
            let slot = SinkSlot::new(descriptor.id.clone());
            if let Some(sink) = &sink {
                slot.replace(MessageSink::clone(sink));
            }
            match self.access.open(&descriptor, slot.clone()) {
                Ok(()) => {
                    info!(
                        "MIDI input attached: {} ({})",
                        descriptor.name,
                        self.access.backend_name()
                    );
                    changes.added.push(descriptor.clone());
                    devices.push(InputDevice { descriptor, slot });
                }
                Err(e) => warn!("Skipping MIDI input {}: {}", descriptor.name, e),
            }
        }

        let count = devices.len();
        drop(devices);
        self.set_status(MidiStatus::Ready { devices: count });
        Ok(changes)
    }

    /// Make `sink` the device's only message handler.
    pub fn subscribe(&self, device: &DeviceId, sink: MessageSink) -> Result<SlotUpdate> {
        let devices = self.devices.read();
        let entry = devices
            .iter()
            .find(|d| d.id() == device)
            .ok_or_else(|| Error::UnknownDevice(device.clone()))?;

        let update = entry.slot.replace(sink);
        match update {
            SlotUpdate::Attached => debug!("Subscribed sink to {}", entry.name()),
            SlotUpdate::Replaced => debug!("Replaced sink on {}", entry.name()),
            SlotUpdate::Unchanged => {}
        }
        Ok(update)
    }

    /// Make `sink` the registry sink and subscribe it to every registered
    /// device. Returns how many were visited.
    pub fn subscribe_all(&self, sink: &MessageSink) -> usize {
        let devices = self.devices.read();
        self.sink.store(Some(Arc::new(sink.clone())));
        for device in devices.iter() {
            device.slot.replace(sink.clone());
        }
        devices.len()
    }

    /// Idempotent; unknown devices are ignored. A device still present at the
    /// next refresh is given the registry sink again.
    pub fn unsubscribe(&self, device: &DeviceId) -> bool {
        self.devices
            .read()
            .iter()
            .find(|d| d.id() == device)
            .map(|d| d.slot.clear())
            .unwrap_or(false)
    }

    /// Unsubscribe and close every device, leaving the registry empty.
    pub fn close_all(&self) {
        let mut devices = self.devices.write();
        for device in devices.drain(..) {
            self.detach(&device);
        }
    }

    fn detach(&self, device: &InputDevice) {
        device.slot.clear();
        self.access.close(device.id());
        info!("MIDI input detached: {}", device.name());
    }

    fn set_status(&self, status: MidiStatus) {
        let previous = self.status.swap(Arc::new(status));
        if *previous == status {
            return;
        }
        match status {
            MidiStatus::AccessDenied => error!("Could not access MIDI devices: {}", status),
            MidiStatus::Unsupported => warn!("{}; continuing without MIDI input", status),
            _ => info!("MIDI status: {}", status),
        }
        if let Some(callback) = &self.on_status {
            callback(status);
        }
    }

    pub fn status(&self) -> MidiStatus {
        **self.status.load()
    }

    pub fn devices(&self) -> Vec<InputDevice> {
        self.devices.read().clone()
    }

    pub fn descriptors(&self) -> Vec<DeviceDescriptor> {
        self.devices
            .read()
            .iter()
            .map(|d| d.descriptor.clone())
            .collect()
    }

    pub fn get(&self, device: &DeviceId) -> Option<InputDevice> {
        self.devices.read().iter().find(|d| d.id() == device).cloned()
    }

    pub fn len(&self) -> usize {
        self.devices.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.read().is_empty()
    }

    pub fn is_subscribed(&self, device: &DeviceId) -> bool {
        self.get(device).is_some_and(|d| d.is_subscribed())
    }
}

impl Drop for DeviceRegistry {
    fn drop(&mut self) {
        self.close_all();
    }
}

impl std::fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("backend", &self.access.backend_name())
            .field("num_devices", &self.len())
            .field("status", &self.status())
            .finish()
    }
}
