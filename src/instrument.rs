//! The instrument host: owns the MIDI input pipeline for one sound engine.

use crate::builder::InstrumentBuilder;
use crate::Result;
use jam_midi::{
    DeviceChanges, DeviceDescriptor, DeviceRegistry, DispatchCounts, DispatchOutcome, Dispatcher,
    HotplugWatcher, MessageSink, MidiAccess, MidiConfig, MidiEvent, MidiPipeline, MidiStatus,
    SoundEngine, StatusCallback,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Every input device feeds the same decode-and-dispatch pipeline.
///
/// MIDI being unavailable is not a startup failure: the instrument comes up
/// with zero devices, reports the status once, and stays playable through
/// [`play`](Self::play).
pub struct Instrument<E: ?Sized> {
    registry: Arc<DeviceRegistry>,
    pipeline: MidiPipeline<E>,
    watcher: Option<HotplugWatcher>,
}

impl<E: SoundEngine + ?Sized + 'static> Instrument<E> {
    pub fn builder(engine: Arc<E>) -> InstrumentBuilder<E> {
        InstrumentBuilder::new(engine)
    }

    pub(crate) fn start(
        engine: Arc<E>,
        access: Arc<dyn MidiAccess>,
        config: MidiConfig,
        on_status: Option<StatusCallback>,
    ) -> Result<Self> {
        let registry = Arc::new(match on_status {
            Some(callback) => DeviceRegistry::with_status_callback(access, callback),
            None => DeviceRegistry::new(access),
        });
        let pipeline = MidiPipeline::new(Dispatcher::new(engine), config.delivery)?;
        let sink = pipeline.sink();

        // Startup enumeration: every device is new, so rescan subscribes all of them.
        match registry.rescan(&sink) {
            Ok(changes) => info!(
                "MIDI ready with {} input(s) ({})",
                changes.added.len(),
                config.client_name
            ),
            Err(e) if e.is_access_error() => {}
            Err(e) => warn!("MIDI startup enumeration failed: {}", e),
        }

        let watcher = match config.hotplug_interval {
            Some(interval) => Some(HotplugWatcher::spawn(
                Arc::clone(&registry),
                sink,
                interval,
            )?),
            None => None,
        };

        Ok(Self {
            registry,
            pipeline,
            watcher,
        })
    }

    pub fn status(&self) -> MidiStatus {
        self.registry.status()
    }

    pub fn devices(&self) -> Vec<DeviceDescriptor> {
        self.registry.descriptors()
    }

    pub fn device_count(&self) -> usize {
        self.registry.len()
    }

    pub fn stats(&self) -> DispatchCounts {
        self.pipeline.dispatcher().stats()
    }

    /// Messages dropped by a full delivery queue.
    pub fn dropped_messages(&self) -> u64 {
        self.pipeline.dropped()
    }

    /// Re-enumerate now, subscribing any newly added device.
    pub fn rescan(&self) -> Result<DeviceChanges> {
        Ok(self.registry.rescan(&self.pipeline.sink())?)
    }

    /// Play an event without a MIDI device.
    pub fn play(&self, event: MidiEvent) -> DispatchOutcome {
        self.pipeline.play(event)
    }

    pub fn note_on(&self, note: u8, velocity: u8) -> DispatchOutcome {
        self.play(MidiEvent::NoteOn { note, velocity })
    }

    pub fn note_off(&self, note: u8, velocity: u8) -> DispatchOutcome {
        self.play(MidiEvent::NoteOff { note, velocity })
    }

    /// Wait until queued device messages have reached the engine.
    pub fn flush(&self) {
        self.pipeline.flush();
    }

    pub fn sink(&self) -> MessageSink {
        self.pipeline.sink()
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    pub fn engine(&self) -> &Arc<E> {
        self.pipeline.dispatcher().engine()
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }
}

impl<E: ?Sized> Drop for Instrument<E> {
    fn drop(&mut self) {
        // Stop rescans first so no device is re-opened while closing.
        drop(self.watcher.take());
        self.registry.close_all();
    }
}

impl<E: ?Sized> std::fmt::Debug for Instrument<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instrument")
            .field("registry", &self.registry)
            .field("pipeline", &self.pipeline)
            .field("watching", &self.watcher.is_some())
            .finish()
    }
}
