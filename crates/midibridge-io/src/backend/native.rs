//! OS MIDI ports via midir.
//!
//! midir wants the callback at connect time and owns the input client for the
//! lifetime of the connection, so each open creates a fresh client. A separate
//! long-lived client is kept for enumeration. The user callback sits in an
//! `ArcSwapOption` slot that midir's callback thread reads without locking.

use super::{check_index, MidiApi, MidiInputBackend, MidiOutputBackend, RawCallback};
use crate::config::IgnoreFilter;
use crate::error::{Error, Result};
use ::midir::{Ignore, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use arc_swap::ArcSwapOption;
use std::sync::Arc;
use tracing::debug;

fn to_midir_ignore(filter: IgnoreFilter) -> Ignore {
    match (filter.sysex, filter.timing, filter.active_sensing) {
        (false, false, false) => Ignore::None,
        (true, false, false) => Ignore::Sysex,
        (false, true, false) => Ignore::Time,
        (true, true, false) => Ignore::SysexAndTime,
        (false, false, true) => Ignore::ActiveSense,
        (true, false, true) => Ignore::SysexAndActiveSense,
        (false, true, true) => Ignore::TimeAndActiveSense,
        (true, true, true) => Ignore::All,
    }
}

/// Builds the closure handed to midir. Converts midir's absolute microsecond
/// timestamps into per-connection delta-times and forwards to the slot.
fn forwarder(
    slot: Arc<ArcSwapOption<RawCallback>>,
) -> impl FnMut(u64, &[u8], &mut ()) + Send + 'static {
    let mut last_stamp: Option<u64> = None;
    move |stamp, message, _| {
        let delta = match last_stamp {
            Some(prev) => stamp.saturating_sub(prev) as f64 / 1_000_000.0,
            None => 0.0,
        };
        last_stamp = Some(stamp);
        if let Some(callback) = &*slot.load() {
            callback(delta, message);
        }
    }
}

/// MIDI input backed by the OS MIDI service.
pub struct MidirInput {
    client_name: String,
    scanner: MidiInput,
    connection: Option<MidiInputConnection<()>>,
    ignore: IgnoreFilter,
    slot: Arc<ArcSwapOption<RawCallback>>,
}

impl MidirInput {
    /// Fails if the OS MIDI service cannot be reached.
    pub fn new(client_name: &str) -> Result<Self> {
        let scanner = MidiInput::new(client_name)?;
        Ok(Self {
            client_name: client_name.to_string(),
            scanner,
            connection: None,
            ignore: IgnoreFilter::default(),
            slot: Arc::new(ArcSwapOption::empty()),
        })
    }

    fn fresh_client(&self) -> Result<MidiInput> {
        let mut client = MidiInput::new(&self.client_name)?;
        client.ignore(to_midir_ignore(self.ignore));
        Ok(client)
    }
}

impl MidiApi for MidirInput {
    fn port_count(&self) -> usize {
        self.scanner.port_count()
    }

    fn port_name(&self, index: usize) -> Result<String> {
        let ports = self.scanner.ports();
        check_index(index, ports.len())?;
        Ok(self.scanner.port_name(&ports[index])?)
    }

    fn open_port(&mut self, index: usize, name: &str) -> Result<()> {
        self.close_port();
        let client = self.fresh_client()?;
        let ports = client.ports();
        check_index(index, ports.len())?;
        let connection = client.connect(
            &ports[index],
            name,
            forwarder(Arc::clone(&self.slot)),
            (),
        )?;
        debug!("Opened MIDI input port {} as '{}'", index, name);
        self.connection = Some(connection);
        Ok(())
    }

    #[cfg(unix)]
    fn open_virtual_port(&mut self, name: &str) -> Result<()> {
        use ::midir::os::unix::VirtualInput;

        self.close_port();
        let client = self.fresh_client()?;
        let connection = client.create_virtual(name, forwarder(Arc::clone(&self.slot)), ())?;
        debug!("Created virtual MIDI input '{}'", name);
        self.connection = Some(connection);
        Ok(())
    }

    #[cfg(not(unix))]
    fn open_virtual_port(&mut self, name: &str) -> Result<()> {
        Err(Error::backend(format!(
            "cannot create virtual input '{}': virtual ports are not supported on this platform",
            name
        )))
    }

    fn close_port(&mut self) {
        if let Some(connection) = self.connection.take() {
            // Joins/stops midir's callback thread before handing the client back
            let _ = connection.close();
            debug!("Closed MIDI input port");
        }
    }

    fn is_port_open(&self) -> bool {
        self.connection.is_some()
    }
}

impl MidiInputBackend for MidirInput {
    fn set_ignore_filters(&mut self, filter: IgnoreFilter) {
        self.ignore = filter;
        self.scanner.ignore(to_midir_ignore(filter));
        if self.connection.is_some() {
            debug!("Ignore filters change takes effect on next open");
        }
    }

    fn register_raw_callback(&mut self, callback: RawCallback) {
        self.slot.store(Some(Arc::new(callback)));
    }

    fn cancel_raw_callback(&mut self) {
        self.slot.store(None);
    }
}

impl Drop for MidirInput {
    fn drop(&mut self) {
        self.slot.store(None);
        self.close_port();
    }
}

/// MIDI output backed by the OS MIDI service.
pub struct MidirOutput {
    client_name: String,
    scanner: MidiOutput,
    connection: Option<MidiOutputConnection>,
}

impl MidirOutput {
    pub fn new(client_name: &str) -> Result<Self> {
        let scanner = MidiOutput::new(client_name)?;
        Ok(Self {
            client_name: client_name.to_string(),
            scanner,
            connection: None,
        })
    }
}

impl MidiApi for MidirOutput {
    fn port_count(&self) -> usize {
        self.scanner.port_count()
    }

    fn port_name(&self, index: usize) -> Result<String> {
        let ports = self.scanner.ports();
        check_index(index, ports.len())?;
        Ok(self.scanner.port_name(&ports[index])?)
    }

    fn open_port(&mut self, index: usize, name: &str) -> Result<()> {
        self.close_port();
        let client = MidiOutput::new(&self.client_name)?;
        let ports = client.ports();
        check_index(index, ports.len())?;
        let connection = client.connect(&ports[index], name)?;
        debug!("Opened MIDI output port {} as '{}'", index, name);
        self.connection = Some(connection);
        Ok(())
    }

    #[cfg(unix)]
    fn open_virtual_port(&mut self, name: &str) -> Result<()> {
        use ::midir::os::unix::VirtualOutput;

        self.close_port();
        let client = MidiOutput::new(&self.client_name)?;
        let connection = client.create_virtual(name)?;
        debug!("Created virtual MIDI output '{}'", name);
        self.connection = Some(connection);
        Ok(())
    }

    #[cfg(not(unix))]
    fn open_virtual_port(&mut self, name: &str) -> Result<()> {
        Err(Error::backend(format!(
            "cannot create virtual output '{}': virtual ports are not supported on this platform",
            name
        )))
    }

    fn close_port(&mut self) {
        if let Some(connection) = self.connection.take() {
            let _ = connection.close();
            debug!("Closed MIDI output port");
        }
    }

    fn is_port_open(&self) -> bool {
        self.connection.is_some()
    }
}

impl MidiOutputBackend for MidirOutput {
    fn send_raw_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let connection = self
            .connection
            .as_mut()
            .ok_or_else(|| Error::backend("no output port open"))?;
        connection.send(bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ignore_mapping() {
        assert!(matches!(to_midir_ignore(IgnoreFilter::NONE), Ignore::None));
        assert!(matches!(to_midir_ignore(IgnoreFilter::ALL), Ignore::All));
        assert!(matches!(
            to_midir_ignore(IgnoreFilter::new(true, false, true)),
            Ignore::SysexAndActiveSense
        ));
        assert!(matches!(
            to_midir_ignore(IgnoreFilter::new(false, true, false)),
            Ignore::Time
        ));
    }

    #[test]
    fn test_forwarder_delta_times() {
        let slot = Arc::new(ArcSwapOption::<RawCallback>::empty());
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        slot.store(Some(Arc::new(Arc::new(move |delta: f64, bytes: &[u8]| {
            s.lock().push((delta, bytes.to_vec()));
        }) as RawCallback)));

        let mut forward = forwarder(Arc::clone(&slot));
        forward(1_000_000, &[0x90, 60, 100], &mut ());
        forward(1_250_000, &[0x80, 60, 0], &mut ());

        slot.store(None);
        forward(2_000_000, &[0x90, 61, 100], &mut ());

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], (0.0, vec![0x90, 60, 100]));
        assert_eq!(seen[1], (0.25, vec![0x80, 60, 0]));
    }

    #[test]
    fn test_list_ports_does_not_crash() {
        // Device availability depends on the machine; CI usually has none
        if let Ok(input) = MidirInput::new("midibridge-test") {
            let names = input.list_ports();
            assert_eq!(names.len(), input.port_count());
        }
    }
}
