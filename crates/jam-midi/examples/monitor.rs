//! Prints every note played on any connected controller.
//!
//! Devices plugged in while running are picked up within a second.
//!
//! Run with:
//!   cargo run -p jam-midi --example monitor

use jam_midi::{
    DeviceRegistry, Delivery, Dispatcher, HotplugWatcher, LoggingEngine, MidiPipeline,
    MidirAccess, DEFAULT_HOTPLUG_INTERVAL,
};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() -> jam_midi::Result<()> {
    tracing_subscriber::fmt::init();

    let registry = Arc::new(DeviceRegistry::new(Arc::new(MidirAccess::new("jam-monitor")?)));
    let pipeline = MidiPipeline::new(Dispatcher::new(Arc::new(LoggingEngine)), Delivery::queued())?;
    let sink = pipeline.sink();

    if let Err(e) = registry.rescan(&sink) {
        println!("{} ({})", registry.status(), e);
    }
    let watcher = HotplugWatcher::spawn(Arc::clone(&registry), sink, DEFAULT_HOTPLUG_INTERVAL)?;

    println!("Listening for 30 seconds...");
    thread::sleep(Duration::from_secs(30));

    drop(watcher);
    let stats = pipeline.dispatcher().stats();
    println!(
        "{} notes, {} ignored, {} rejected, {} dropped",
        stats.delivered,
        stats.ignored,
        stats.rejected,
        pipeline.dropped()
    );
    Ok(())
}
