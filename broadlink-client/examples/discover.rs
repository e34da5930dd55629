//! Broadcast a discovery frame and print every device that answers.

use broadlink_client::Registry;

fn main() {
    let mut registry = Registry::new();
    match registry.discover() {
        Ok(found) => println!("discovered {found} devices"),
        Err(e) => {
            eprintln!("discovery failed: {e}");
            std::process::exit(1);
        }
    }

    for device in registry.devices() {
        let kind = device.kind();
        println!(
            "{} at {} (MAC {}, type 0x{:04x})",
            kind.name,
            device.remote_ip(),
            device.mac_string(),
            device.device_type(),
        );
    }
}
