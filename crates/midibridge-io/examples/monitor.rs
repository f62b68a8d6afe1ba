//! Print everything arriving on an input port.
//!
//! Usage: `cargo run -p midibridge-io --example monitor -- [port-index]`
//! Without an index a virtual port named "midibridge monitor" is created
//! (unix only).

use midibridge_io::{EventKind, IgnoreFilter, InputConfig, InputEvent, MidiIn};
use std::thread;
use std::time::Duration;

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let config = InputConfig::default()
        .client_name("midibridge-monitor")
        .ignore(IgnoreFilter::new(false, true, true));
    let mut input = MidiIn::new(config).unwrap();

    match std::env::args().nth(1).and_then(|arg| arg.parse::<usize>().ok()) {
        Some(index) => input.open_port(index).unwrap(),
        None => input.open_virtual_port("midibridge monitor").unwrap(),
    }
    println!("Listening on {} (Ctrl-C to quit)", input.session().unwrap());

    input
        .on(EventKind::Message, |event| {
            if let InputEvent::Message { delta_time, bytes } = event {
                println!("{:>9.4}s  {:02X?}", delta_time, bytes.as_slice());
            }
        })
        .unwrap();
    input
        .on(EventKind::Sysex, |event| {
            if let InputEvent::Sysex { bytes } = event {
                println!("           sysex complete, {} bytes", bytes.len());
            }
        })
        .unwrap();

    loop {
        input.dispatch_pending().unwrap();
        thread::sleep(Duration::from_millis(5));
    }
}
