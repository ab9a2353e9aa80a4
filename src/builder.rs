//! Builder for configuring and constructing an `Instrument`.

use crate::{Instrument, Result};
use jam_midi::{Delivery, MidiAccess, MidiConfig, MidiStatus, SoundEngine, StatusCallback};
use std::sync::Arc;
use std::time::Duration;

/// Hardware MIDI is used when the `midi-hardware` feature is compiled;
/// otherwise the instrument starts with MIDI reported as unsupported.
/// Any other backend can be injected with `.access()`.
///
/// # Example
///
/// ```ignore
/// use jam::prelude::*;
///
/// let instrument = Instrument::builder(Arc::new(LoggingEngine))
///     .delivery(Delivery::queued())
///     .hotplug(Duration::from_secs(1))
///     .on_status(|status| println!("{}", status))
///     .build()?;
///
/// println!("{} MIDI inputs", instrument.device_count());
/// ```
pub struct InstrumentBuilder<E: ?Sized> {
    engine: Arc<E>,
    config: MidiConfig,
    access: Option<Arc<dyn MidiAccess>>,
    on_status: Option<StatusCallback>,
}

impl<E: SoundEngine + ?Sized + 'static> InstrumentBuilder<E> {
    pub(crate) fn new(engine: Arc<E>) -> Self {
        Self {
            engine,
            config: MidiConfig::default(),
            access: None,
            on_status: None,
        }
    }

    /// Default: "jam"
    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.config.client_name = name.into();
        self
    }

    /// Default: `Delivery::Direct`
    pub fn delivery(mut self, delivery: Delivery) -> Self {
        self.config.delivery = delivery;
        self
    }

    /// Rescan for added and removed devices every `interval`.
    pub fn hotplug(mut self, interval: Duration) -> Self {
        self.config.hotplug_interval = Some(interval);
        self
    }

    /// Replace every setting with `config`.
    pub fn config(mut self, config: MidiConfig) -> Self {
        self.config = config;
        self
    }

    pub fn access(mut self, access: Arc<dyn MidiAccess>) -> Self {
        self.access = Some(access);
        self
    }

    /// Called once for every MIDI status transition.
    pub fn on_status<F>(mut self, callback: F) -> Self
    where
        F: Fn(MidiStatus) + Send + Sync + 'static,
    {
        self.on_status = Some(Arc::new(callback));
        self
    }

    pub fn build(self) -> Result<Instrument<E>> {
        self.config.validate()?;

        let access = match self.access {
            Some(access) => access,
            None => default_access(&self.config.client_name)?,
        };

        Instrument::start(self.engine, access, self.config, self.on_status)
    }
}

#[cfg(feature = "midi-hardware")]
fn default_access(client_name: &str) -> Result<Arc<dyn MidiAccess>> {
    Ok(Arc::new(jam_midi::MidirAccess::new(client_name)?))
}

#[cfg(not(feature = "midi-hardware"))]
fn default_access(_client_name: &str) -> Result<Arc<dyn MidiAccess>> {
    Ok(Arc::new(jam_midi::VirtualMidiAccess::with_availability(
        jam_midi::Availability::Unsupported,
    )))
}
