//! Event Dispatcher
//!
//! Direct, synchronous hand-off of decoded events to the [`SoundEngine`].
//! No buffering and no retry. Engine failures are absorbed per message: they
//! are logged, counted, and never reach the device callback that delivered
//! the message.

use crate::engine::SoundEngine;
use crate::error::EngineError;
use crate::event::MidiEvent;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Call the engine entry point matching `event`.
///
/// Returns `Ok(false)` for `Ignored` (no call made), `Ok(true)` when the
/// engine accepted the event.
#[inline]
pub fn dispatch<E: SoundEngine + ?Sized>(
    event: MidiEvent,
    engine: &E,
) -> Result<bool, EngineError> {
    match event {
        MidiEvent::NoteOn { note, velocity } => engine.note_on(note, velocity).map(|_| true),
        MidiEvent::NoteOff { note, velocity } => engine.note_off(note, velocity).map(|_| true),
        MidiEvent::Ignored => Ok(false),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered,
    Ignored,
    /// The engine returned an error or panicked.
    Rejected,
}

#[derive(Debug, Default)]
pub struct DispatchStats {
    delivered: AtomicU64,
    ignored: AtomicU64,
    rejected: AtomicU64,
}

/// Point-in-time copy of [`DispatchStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchCounts {
    pub delivered: u64,
    pub ignored: u64,
    pub rejected: u64,
}

impl DispatchCounts {
    pub fn total(&self) -> u64 {
        self.delivered + self.ignored + self.rejected
    }
}

impl DispatchStats {
    fn record(&self, outcome: DispatchOutcome) {
        let counter = match outcome {
            DispatchOutcome::Delivered => &self.delivered,
            DispatchOutcome::Ignored => &self.ignored,
            DispatchOutcome::Rejected => &self.rejected,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DispatchCounts {
        DispatchCounts {
            delivered: self.delivered.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

/// Shared handle routing events from every device to one engine.
///
/// Cloning is cheap; clones share the engine and the statistics.
pub struct Dispatcher<E: ?Sized> {
    engine: Arc<E>,
    stats: Arc<DispatchStats>,
}

impl<E: SoundEngine + ?Sized> Dispatcher<E> {
    pub fn new(engine: Arc<E>) -> Self {
        Self {
            engine,
            stats: Arc::new(DispatchStats::default()),
        }
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    pub fn stats(&self) -> DispatchCounts {
        self.stats.snapshot()
    }

    /// Dispatch one event, isolating engine errors and panics.
    pub fn dispatch(&self, event: MidiEvent) -> DispatchOutcome {
        let engine = &*self.engine;
        let outcome = match catch_unwind(AssertUnwindSafe(|| dispatch(event, engine))) {
            Ok(Ok(true)) => DispatchOutcome::Delivered,
            Ok(Ok(false)) => DispatchOutcome::Ignored,
            Ok(Err(e)) => {
                debug!("Engine rejected {:?}: {}", event, e);
                DispatchOutcome::Rejected
            }
            Err(_) => {
                debug!("Engine panicked on {:?}", event);
                DispatchOutcome::Rejected
            }
        };
        self.stats.record(outcome);
        outcome
    }

    /// Decode and dispatch one raw device message.
    #[inline]
    pub fn handle(&self, bytes: &[u8]) -> DispatchOutcome {
        self.dispatch(MidiEvent::decode(bytes))
    }
}

impl<E: ?Sized> Clone for Dispatcher<E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<E: ?Sized> std::fmt::Debug for Dispatcher<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::check_note_args;
    use parking_lot::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        On(u8, u8),
        Off(u8, u8),
    }

    #[derive(Default)]
    struct RecordingEngine {
        calls: Mutex<Vec<Call>>,
    }

    impl SoundEngine for RecordingEngine {
        fn note_on(&self, note: u8, velocity: u8) -> Result<(), EngineError> {
            check_note_args(note, velocity)?;
            self.calls.lock().push(Call::On(note, velocity));
            Ok(())
        }

        fn note_off(&self, note: u8, velocity: u8) -> Result<(), EngineError> {
            check_note_args(note, velocity)?;
            self.calls.lock().push(Call::Off(note, velocity));
            Ok(())
        }
    }

    struct PanickingEngine;

    impl SoundEngine for PanickingEngine {
        fn note_on(&self, _: u8, _: u8) -> Result<(), EngineError> {
            panic!("voice allocation failed");
        }

        fn note_off(&self, _: u8, _: u8) -> Result<(), EngineError> {
            Ok(())
        }
    }

    #[test]
    fn test_note_on_scenario() {
        let engine = RecordingEngine::default();
        let result = dispatch(MidiEvent::decode(&[0x90, 0x3C, 0x64]), &engine);
        assert_eq!(result, Ok(true));
        assert_eq!(*engine.calls.lock(), vec![Call::On(60, 100)]);
    }

    #[test]
    fn test_note_off_scenario() {
        let engine = RecordingEngine::default();
        dispatch(MidiEvent::decode(&[0x80, 0x3C, 0x00]), &engine).unwrap();
        assert_eq!(*engine.calls.lock(), vec![Call::Off(60, 0)]);
    }

    #[test]
    fn test_control_change_makes_no_call() {
        let engine = RecordingEngine::default();
        let result = dispatch(MidiEvent::decode(&[0xB0, 0x07, 0x7F]), &engine);
        assert_eq!(result, Ok(false));
        assert!(engine.calls.lock().is_empty());
    }

    #[test]
    fn test_dispatcher_counts_outcomes() {
        let dispatcher = Dispatcher::new(Arc::new(RecordingEngine::default()));

        assert_eq!(dispatcher.handle(&[0x90, 60, 100]), DispatchOutcome::Delivered);
        assert_eq!(dispatcher.handle(&[0xF8]), DispatchOutcome::Ignored);
        // Data bytes above 127 are passed through and refused by the engine.
        assert_eq!(dispatcher.handle(&[0x90, 200, 100]), DispatchOutcome::Rejected);
        assert_eq!(dispatcher.handle(&[0x80, 60, 0]), DispatchOutcome::Delivered);

        let counts = dispatcher.stats();
        assert_eq!(counts.delivered, 2);
        assert_eq!(counts.ignored, 1);
        assert_eq!(counts.rejected, 1);
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn test_engine_panic_is_contained() {
        let dispatcher: Dispatcher<dyn SoundEngine> = Dispatcher::new(Arc::new(PanickingEngine));

        assert_eq!(dispatcher.handle(&[0x90, 60, 100]), DispatchOutcome::Rejected);
        assert_eq!(dispatcher.handle(&[0x80, 60, 0]), DispatchOutcome::Delivered);
        assert_eq!(dispatcher.stats().rejected, 1);
    }

    #[test]
    fn test_clones_share_stats() {
        let engine = Arc::new(RecordingEngine::default());
        let a = Dispatcher::new(Arc::clone(&engine));
        let b = a.clone();

        a.handle(&[0x90, 60, 100]);
        b.handle(&[0x90, 62, 100]);

        assert_eq!(a.stats().delivered, 2);
        assert_eq!(engine.calls.lock().len(), 2);
    }
}
