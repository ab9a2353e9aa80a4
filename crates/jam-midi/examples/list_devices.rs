use jam_midi::{DeviceRegistry, MidirAccess};
use std::sync::Arc;

fn main() -> jam_midi::Result<()> {
    tracing_subscriber::fmt::init();

    let registry = DeviceRegistry::new(Arc::new(MidirAccess::new("list-devices")?));

    println!("=== MIDI Input Devices ===");
    let devices = match registry.refresh() {
        Ok(devices) => devices,
        Err(e) if e.is_access_error() => {
            println!("  ({})", registry.status());
            return Ok(());
        }
        Err(e) => return Err(e),
    };
    if devices.is_empty() {
        println!("  (none found)");
    }
    for dev in &devices {
        println!("  [{}] {}", dev.id, dev.name);
    }
    println!("\n{}", registry.status());
    Ok(())
}
