//! Driver-level MIDI transport.
//!
//! The facades only ever talk to a port through these traits. Two
//! implementations ship with the crate:
//!
//! - [`memory`]: in-process ports driven by a [`MemoryDriver`](memory::MemoryDriver)
//! - [`native`] (feature `midi-io`): the OS MIDI service via midir

use crate::config::IgnoreFilter;
use crate::error::{Error, Result};
use std::sync::Arc;

pub mod memory;

#[cfg(feature = "midi-io")]
pub mod native;

#[cfg(feature = "midi-io")]
pub use native::{MidirInput, MidirOutput};

/// Raw delivery callback: `(delta_time_seconds, bytes)`.
///
/// Invoked on the driver's own thread, at arbitrary times. Implementations must
/// not block.
pub type RawCallback = Arc<dyn Fn(f64, &[u8]) + Send + Sync>;

/// Port enumeration and binding, shared by inputs and outputs.
pub trait MidiApi {
    fn port_count(&self) -> usize;

    fn port_name(&self, index: usize) -> Result<String>;

    fn list_ports(&self) -> Vec<String> {
        (0..self.port_count())
            .map(|i| {
                self.port_name(i)
                    .unwrap_or_else(|_| format!("Unknown Device {}", i))
            })
            .collect()
    }

    /// Bind to the port at `index`. `name` is the local connection name.
    fn open_port(&mut self, index: usize, name: &str) -> Result<()>;

    /// Create a software port other applications can connect to.
    fn open_virtual_port(&mut self, name: &str) -> Result<()>;

    /// No-op when nothing is open.
    fn close_port(&mut self);

    fn is_port_open(&self) -> bool;
}

pub trait MidiInputBackend: MidiApi {
    /// Takes effect for the next delivery (or the next open, for drivers that
    /// fix filters at connect time).
    fn set_ignore_filters(&mut self, filter: IgnoreFilter);

    /// Replaces any previously registered callback.
    fn register_raw_callback(&mut self, callback: RawCallback);

    /// After this returns the backend does not start new invocations of the
    /// callback. An invocation already running may still complete.
    fn cancel_raw_callback(&mut self);
}

pub trait MidiOutputBackend: MidiApi {
    fn send_raw_bytes(&mut self, bytes: &[u8]) -> Result<()>;
}

/// Shared bounds check so every backend reports the same error.
pub(crate) fn check_index(index: usize, count: usize) -> Result<()> {
    if index >= count {
        Err(Error::OutOfRange { index, count })
    } else {
        Ok(())
    }
}
