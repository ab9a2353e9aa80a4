//! Hardware MIDI access via midir.
//!
//! midir connections are owned by a dedicated thread for platform
//! thread-safety; the public handle only talks to it over a command channel.

use super::{DeviceDescriptor, DeviceId, MidiAccess};
use crate::error::{Error, Result};
use crate::sink::SinkSlot;
use crossbeam_channel::{bounded, Receiver, Sender};
use midir::{Ignore, MidiInput, MidiInputConnection, MidiInputPort};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

enum AccessCommand {
    Enumerate(Sender<Result<Vec<DeviceDescriptor>>>),
    Open(DeviceDescriptor, SinkSlot, Sender<Result<()>>),
    Close(DeviceId),
    Shutdown,
}

pub struct MidirAccess {
    command_sender: Sender<AccessCommand>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl MidirAccess {
    /// `client_name` is what the platform shows for this application's MIDI client.
    pub fn new(client_name: impl Into<String>) -> Result<Self> {
        let client_name = client_name.into();
        let (command_sender, command_receiver) = bounded(16);

        let thread = thread::Builder::new()
            .name("midi-input-thread".to_string())
            .spawn(move || Self::midi_thread(client_name, command_receiver))?;

        Ok(Self {
            command_sender,
            thread: Mutex::new(Some(thread)),
        })
    }

    fn midi_thread(client_name: String, command_receiver: Receiver<AccessCommand>) {
        let mut connections: HashMap<DeviceId, MidiInputConnection<()>> = HashMap::new();

        while let Ok(command) = command_receiver.recv() {
            match command {
                AccessCommand::Enumerate(reply) => {
                    let _ = reply.send(Self::enumerate(&client_name));
                }
                AccessCommand::Open(device, slot, reply) => {
                    if let Some(previous) = connections.remove(&device.id) {
                        previous.close();
                    }
                    let result = Self::connect(&client_name, &device, slot).map(|conn| {
                        connections.insert(device.id.clone(), conn);
                    });
                    let _ = reply.send(result);
                }
                AccessCommand::Close(id) => {
                    if let Some(conn) = connections.remove(&id) {
                        conn.close();
                        debug!("Closed MIDI input connection {}", id);
                    }
                }
                AccessCommand::Shutdown => break,
            }
        }

        for (_, conn) in connections.drain() {
            conn.close();
        }
    }

    fn enumerate(client_name: &str) -> Result<Vec<DeviceDescriptor>> {
        let midi_input = MidiInput::new(client_name)?;
        Ok(Self::port_ids(&midi_input)
            .into_iter()
            .map(|(_, id, name)| DeviceDescriptor::new(id, name))
            .collect())
    }

    /// Ports keyed by name, the only identity stable across enumerations.
    /// Repeated names get a ` #n` suffix in port order.
    fn port_ids(midi_input: &MidiInput) -> Vec<(MidiInputPort, String, String)> {
        let mut seen: HashMap<String, usize> = HashMap::new();
        midi_input
            .ports()
            .into_iter()
            .enumerate()
            .map(|(index, port)| {
                let name = midi_input
                    .port_name(&port)
                    .unwrap_or_else(|_| format!("Unknown Device {}", index));
                let count = seen.entry(name.clone()).or_insert(0);
                *count += 1;
                let id = match *count {
                    1 => name.clone(),
                    n => format!("{} #{}", name, n),
                };
                (port, id, name)
            })
            .collect()
    }

    fn connect(
        client_name: &str,
        device: &DeviceDescriptor,
        slot: SinkSlot,
    ) -> Result<MidiInputConnection<()>> {
        let mut midi_input = MidiInput::new(client_name)?;
        // Sysex, clock and active sensing would all decode to Ignored anyway.
        midi_input.ignore(Ignore::All);

        let port = Self::port_ids(&midi_input)
            .into_iter()
            .find(|(_, id, _)| id.as_str() == device.id.as_str())
            .map(|(port, _, _)| port)
            .ok_or_else(|| Error::UnknownDevice(device.id.clone()))?;

        let connection = midi_input.connect(
            &port,
            &format!("{}-input", client_name),
            move |_timestamp, message, _| {
                slot.deliver(message);
            },
            (),
        )?;

        info!("Connected MIDI input: {}", device.name);
        Ok(connection)
    }

    fn request<T>(
        &self,
        make: impl FnOnce(Sender<Result<T>>) -> AccessCommand,
    ) -> Result<T> {
        let (reply_sender, reply_receiver) = bounded(1);
        self.command_sender
            .send(make(reply_sender))
            .map_err(|_| Error::MidiDevice("MIDI input thread not running".to_string()))?;
        reply_receiver
            .recv()
            .map_err(|_| Error::MidiDevice("MIDI input thread exited".to_string()))?
    }
}

impl MidiAccess for MidirAccess {
    fn request_access(&self) -> Result<Vec<DeviceDescriptor>> {
        self.request(AccessCommand::Enumerate)
    }

    fn open(&self, device: &DeviceDescriptor, slot: SinkSlot) -> Result<()> {
        let device = device.clone();
        self.request(move |reply| AccessCommand::Open(device, slot, reply))
    }

    fn close(&self, device: &DeviceId) {
        if self
            .command_sender
            .send(AccessCommand::Close(device.clone()))
            .is_err()
        {
            debug!("MIDI input thread gone, nothing to close for {}", device);
        }
    }

    fn backend_name(&self) -> &'static str {
        "midir"
    }
}

impl Drop for MidirAccess {
    fn drop(&mut self) {
        let _ = self.command_sender.send(AccessCommand::Shutdown);
        if let Some(thread) = self.thread.lock().take() {
            if thread.join().is_err() {
                warn!("MIDI input thread panicked");
            }
        }
    }
}
