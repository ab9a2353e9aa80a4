//! # Play Keyboard
//!
//! Route every connected MIDI controller to a sound engine, picking up
//! controllers plugged in while running.
//!
//! **Concepts:** `Instrument` builder, status callback, hot-plug, non-MIDI play path
//!
//! ```bash
//! cargo run --example play_keyboard
//! ```

use jam::prelude::*;

fn main() -> jam::Result<()> {
    tracing_subscriber::fmt::init();

    let instrument = Instrument::builder(Arc::new(LoggingEngine))
        .client_name("jam-demo")
        .delivery(Delivery::queued())
        .hotplug(Duration::from_secs(1))
        .on_status(|status| println!("MIDI: {status}"))
        .build()?;

    println!("MIDI input devices:");
    let devices = instrument.devices();
    if devices.is_empty() {
        println!("  (none found, plug in a controller to add one)");
    }
    for dev in &devices {
        println!("  [{}] {}", dev.id, dev.name);
    }

    // Without a controller the engine is still playable directly.
    instrument.note_on(69, 100);
    instrument.note_off(69, 0);

    println!("Listening for MIDI input for 20 seconds...");
    std::thread::sleep(Duration::from_secs(20));

    instrument.flush();
    let stats = instrument.stats();
    println!(
        "{} notes played, {} ignored, {} rejected, {} dropped",
        stats.delivered,
        stats.ignored,
        stats.rejected,
        instrument.dropped_messages()
    );
    Ok(())
}
