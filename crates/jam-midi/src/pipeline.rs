//! Decode-and-dispatch pipeline shared by every input device.
//!
//! [`Delivery::Direct`] decodes and dispatches on the device callback thread.
//! [`Delivery::Queued`] hands each message to one bounded channel drained by a
//! single consumer thread: device callbacks never wait on the engine, each
//! device's messages keep their order, and messages from different devices
//! interleave. A full queue drops the message.

use crate::access::DeviceId;
use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::engine::SoundEngine;
use crate::error::Result;
use crate::event::{MidiEvent, RawMidiMessage};
use crate::sink::MessageSink;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Delivery {
    #[default]
    Direct,
    Queued { capacity: usize },
}

impl Delivery {
    pub fn queued() -> Self {
        Delivery::Queued {
            capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

enum PumpMessage {
    Midi(DeviceId, RawMidiMessage),
    Flush(Sender<()>),
    Shutdown,
}

struct Pump {
    sender: Sender<PumpMessage>,
    dropped: Arc<AtomicU64>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

pub struct MidiPipeline<E: ?Sized> {
    dispatcher: Dispatcher<E>,
    pump: Option<Pump>,
    sink: MessageSink,
}

impl<E: SoundEngine + ?Sized + 'static> MidiPipeline<E> {
    pub fn new(dispatcher: Dispatcher<E>, delivery: Delivery) -> Result<Self> {
        let pump = match delivery {
            Delivery::Direct => None,
            Delivery::Queued { capacity } => Some(Self::spawn_pump(dispatcher.clone(), capacity)?),
        };
        let sink = Self::make_sink(&dispatcher, pump.as_ref());
        Ok(Self {
            dispatcher,
            pump,
            sink,
        })
    }

    fn spawn_pump(dispatcher: Dispatcher<E>, capacity: usize) -> Result<Pump> {
        let (sender, receiver) = bounded(capacity.max(1));
        let thread = thread::Builder::new()
            .name("midi-dispatch-thread".to_string())
            .spawn(move || Self::pump_thread(dispatcher, receiver))?;

        Ok(Pump {
            sender,
            dropped: Arc::new(AtomicU64::new(0)),
            thread: Mutex::new(Some(thread)),
        })
    }

    fn pump_thread(dispatcher: Dispatcher<E>, receiver: Receiver<PumpMessage>) {
        while let Ok(message) = receiver.recv() {
            match message {
                PumpMessage::Midi(device, raw) => {
                    if dispatcher.handle(raw.as_bytes()) == DispatchOutcome::Rejected {
                        debug!("Dropped rejected message from {}", device);
                    }
                }
                PumpMessage::Flush(done) => {
                    let _ = done.send(());
                }
                PumpMessage::Shutdown => break,
            }
        }
    }

    fn make_sink(dispatcher: &Dispatcher<E>, pump: Option<&Pump>) -> MessageSink {
        match pump {
            None => {
                let dispatcher = dispatcher.clone();
                MessageSink::new(move |device, bytes| {
                    if dispatcher.handle(bytes) == DispatchOutcome::Rejected {
                        debug!("Dropped rejected message from {}", device);
                    }
                })
            }
            Some(pump) => {
                let sender = pump.sender.clone();
                let dropped = Arc::clone(&pump.dropped);
                MessageSink::new(move |device, bytes| {
                    let message = PumpMessage::Midi(device.clone(), RawMidiMessage::new(bytes));
                    match sender.try_send(message) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            dropped.fetch_add(1, Ordering::Relaxed);
                            debug!("MIDI queue full, dropping message from {}", device);
                        }
                        Err(TrySendError::Disconnected(_)) => {
                            debug!("MIDI pipeline stopped, dropping message from {}", device);
                        }
                    }
                })
            }
        }
    }

    /// The sink every device is subscribed with.
    ///
    /// Returns the same sink identity on every call, so re-subscribing a
    /// device with it is a no-op.
    pub fn sink(&self) -> MessageSink {
        self.sink.clone()
    }

    pub fn dispatcher(&self) -> &Dispatcher<E> {
        &self.dispatcher
    }

    pub fn is_queued(&self) -> bool {
        self.pump.is_some()
    }

    /// Messages dropped because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.pump
            .as_ref()
            .map(|pump| pump.dropped.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Non-MIDI input path: dispatch `event` directly on the calling thread.
    pub fn play(&self, event: MidiEvent) -> DispatchOutcome {
        self.dispatcher.dispatch(event)
    }

    /// Block until every message queued before this call has been dispatched.
    /// Returns immediately in direct mode.
    pub fn flush(&self) {
        let Some(pump) = &self.pump else {
            return;
        };
        let (done_sender, done_receiver) = bounded(1);
        if pump.sender.send(PumpMessage::Flush(done_sender)).is_ok() {
            let _ = done_receiver.recv();
        }
    }
}

impl<E: ?Sized> Drop for MidiPipeline<E> {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            let _ = pump.sender.send(PumpMessage::Shutdown);
            if let Some(thread) = pump.thread.lock().take() {
                if thread.join().is_err() {
                    warn!("MIDI dispatch thread panicked");
                }
            }
        }
    }
}

impl<E: ?Sized> std::fmt::Debug for MidiPipeline<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MidiPipeline")
            .field("dispatcher", &self.dispatcher)
            .field("queued", &self.pump.is_some())
            .finish()
    }
}
