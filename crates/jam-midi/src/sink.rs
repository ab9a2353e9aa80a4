//! Message sinks and the per-device slot holding the active one.
//!
//! A device has exactly one [`SinkSlot`] for its whole lifetime. The backend
//! callback loads the slot for every incoming message, so replacing or clearing
//! the sink never requires reconnecting the device and never races with a
//! message already being delivered.

use crate::access::DeviceId;
use arc_swap::ArcSwapOption;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_SINK_ID: AtomicU64 = AtomicU64::new(1);

type SinkFn = dyn Fn(&DeviceId, &[u8]) + Send + Sync;

/// Handler for raw messages arriving on a device.
///
/// Clones share identity: two sinks compare equal only if one was cloned
/// from the other.
#[derive(Clone)]
pub struct MessageSink {
    id: u64,
    handler: Arc<SinkFn>,
}

impl MessageSink {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&DeviceId, &[u8]) + Send + Sync + 'static,
    {
        Self {
            id: NEXT_SINK_ID.fetch_add(1, Ordering::Relaxed),
            handler: Arc::new(handler),
        }
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn deliver(&self, device: &DeviceId, bytes: &[u8]) {
        (self.handler)(device, bytes)
    }
}

impl PartialEq for MessageSink {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MessageSink {}

impl fmt::Debug for MessageSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageSink").field("id", &self.id).finish()
    }
}

/// Outcome of [`SinkSlot::replace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotUpdate {
    /// The slot was empty.
    Attached,
    /// A different sink was active and has been swapped out.
    Replaced,
    /// The same sink was already active.
    Unchanged,
}

/// Lock-free holder of a device's active sink.
#[derive(Clone)]
pub struct SinkSlot {
    device: DeviceId,
    sink: Arc<ArcSwapOption<MessageSink>>,
}

impl SinkSlot {
    pub fn new(device: DeviceId) -> Self {
        Self {
            device,
            sink: Arc::new(ArcSwapOption::empty()),
        }
    }

    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    pub fn replace(&self, sink: MessageSink) -> SlotUpdate {
        let previous = self.sink.swap(Some(Arc::new(sink.clone())));
        match previous {
            None => SlotUpdate::Attached,
            Some(prev) if *prev == sink => SlotUpdate::Unchanged,
            Some(_) => SlotUpdate::Replaced,
        }
    }

    /// Returns whether a sink was active. Safe to call any number of times.
    pub fn clear(&self) -> bool {
        self.sink.swap(None).is_some()
    }

    pub fn current(&self) -> Option<MessageSink> {
        self.sink.load_full().map(|sink| (*sink).clone())
    }

    pub fn is_attached(&self) -> bool {
        self.sink.load().is_some()
    }

    /// Hand `bytes` to the active sink. Returns false when no sink is attached.
    #[inline]
    pub fn deliver(&self, bytes: &[u8]) -> bool {
        let guard = self.sink.load();
        match &*guard {
            Some(sink) => {
                sink.deliver(&self.device, bytes);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for SinkSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkSlot")
            .field("device", &self.device)
            .field("attached", &self.is_attached())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_sink(counter: &Arc<AtomicUsize>) -> MessageSink {
        let counter = Arc::clone(counter);
        MessageSink::new(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_sink_identity() {
        let a = MessageSink::new(|_, _| {});
        let b = MessageSink::new(|_, _| {});
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_slot_replace_outcomes() {
        let slot = SinkSlot::new(DeviceId::new("kbd"));
        let a = MessageSink::new(|_, _| {});
        let b = MessageSink::new(|_, _| {});

        assert_eq!(slot.replace(a.clone()), SlotUpdate::Attached);
        assert_eq!(slot.replace(a.clone()), SlotUpdate::Unchanged);
        assert_eq!(slot.replace(b.clone()), SlotUpdate::Replaced);
        assert_eq!(slot.current(), Some(b));
    }

    #[test]
    fn test_slot_delivers_to_single_sink() {
        let slot = SinkSlot::new(DeviceId::new("kbd"));
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        slot.replace(counting_sink(&first));
        slot.replace(counting_sink(&second));
        assert!(slot.deliver(&[0x90, 60, 100]));

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_slot_clear_is_idempotent() {
        let slot = SinkSlot::new(DeviceId::new("kbd"));
        let counter = Arc::new(AtomicUsize::new(0));
        slot.replace(counting_sink(&counter));

        assert!(slot.clear());
        assert!(!slot.clear());
        assert!(!slot.deliver(&[0x90, 60, 100]));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_sink_sees_device_id() {
        let slot = SinkSlot::new(DeviceId::new("pads"));
        let seen = Arc::new(parking_lot::Mutex::new(None));
        let seen_clone = Arc::clone(&seen);
        slot.replace(MessageSink::new(move |device, bytes| {
            *seen_clone.lock() = Some((device.clone(), bytes.to_vec()));
        }));

        slot.deliver(&[0x80, 1, 2]);
        assert_eq!(
            seen.lock().clone(),
            Some((DeviceId::new("pads"), vec![0x80, 1, 2]))
        );
    }
}
