use midibridge_io::{InputConfig, MidiIn, MidiOut, OutputConfig};

fn main() {
    let input = MidiIn::new(InputConfig::default().client_name("list-devices")).unwrap();

    println!("=== MIDI Input Ports ===");
    let ports = input.ports().unwrap();
    if ports.is_empty() {
        println!("  (none found)");
    }
    for port in &ports {
        println!("  [{}] {}", port.index, port.name);
    }

    println!("\n=== MIDI Output Ports ===");
    let output = MidiOut::new(OutputConfig::default().client_name("list-devices")).unwrap();
    let ports = output.ports().unwrap();
    if ports.is_empty() {
        println!("  (none found)");
    }
    for port in &ports {
        println!("  [{}] {}", port.index, port.name);
    }
}
