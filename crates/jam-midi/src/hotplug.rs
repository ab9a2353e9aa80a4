//! Background device rescans.
//!
//! The platform APIs midir wraps have no portable device-change notification,
//! so hot-plug is handled by polling [`DeviceRegistry::rescan`].

use crate::error::Result;
use crate::registry::DeviceRegistry;
use crate::sink::MessageSink;
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_HOTPLUG_INTERVAL: Duration = Duration::from_secs(1);

/// Rescans the registry every `interval` until dropped.
pub struct HotplugWatcher {
    stop: Sender<()>,
    scans: Arc<AtomicU64>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl HotplugWatcher {
    pub fn spawn(
        registry: Arc<DeviceRegistry>,
        sink: MessageSink,
        interval: Duration,
    ) -> Result<Self> {
        let (stop, stop_receiver) = bounded::<()>(1);
        let scans = Arc::new(AtomicU64::new(0));
        let thread_scans = Arc::clone(&scans);

        let thread = thread::Builder::new()
            .name("midi-hotplug-thread".to_string())
            .spawn(move || loop {
                match stop_receiver.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {}
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }

                match registry.rescan(&sink) {
                    Ok(changes) if !changes.is_empty() => info!(
                        "MIDI devices changed: {} added, {} removed",
                        changes.added.len(),
                        changes.removed.len()
                    ),
                    Ok(_) => {}
                    // Status transitions are already reported by the registry.
                    Err(e) => debug!("MIDI rescan failed: {}", e),
                }
                thread_scans.fetch_add(1, Ordering::Relaxed);
            })?;

        Ok(Self {
            stop,
            scans,
            thread: Mutex::new(Some(thread)),
        })
    }

    /// Completed rescans so far.
    pub fn scans(&self) -> u64 {
        self.scans.load(Ordering::Relaxed)
    }

    pub fn stop(&self) {
        let _ = self.stop.try_send(());
        if let Some(thread) = self.thread.lock().take() {
            let _ = thread.join();
        }
    }
}

impl Drop for HotplugWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for HotplugWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HotplugWatcher")
            .field("scans", &self.scans())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::VirtualMidiAccess;
    use std::time::Instant;

    fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        condition()
    }

    #[test]
    fn test_watcher_picks_up_new_device() {
        let access = VirtualMidiAccess::new();
        let registry = Arc::new(DeviceRegistry::new(Arc::new(access.clone())));
        registry.refresh().unwrap();
        assert!(registry.is_empty());

        let sink = MessageSink::new(|_, _| {});
        let watcher = HotplugWatcher::spawn(
            Arc::clone(&registry),
            sink.clone(),
            Duration::from_millis(5),
        )
        .unwrap();

        let id = access.add_device("Late Keys");
        assert!(wait_until(Duration::from_secs(2), || registry.is_subscribed(&id)));
        assert_eq!(registry.get(&id).and_then(|d| d.sink()), Some(sink));

        access.remove_device(&id);
        assert!(wait_until(Duration::from_secs(2), || registry.is_empty()));

        drop(watcher);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let registry = Arc::new(DeviceRegistry::new(Arc::new(VirtualMidiAccess::new())));
        let watcher = HotplugWatcher::spawn(
            registry,
            MessageSink::new(|_, _| {}),
            Duration::from_secs(60),
        )
        .unwrap();

        // Stopping must not wait for the interval to elapse.
        let started = Instant::now();
        watcher.stop();
        watcher.stop();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(watcher.scans(), 0);
    }
}
