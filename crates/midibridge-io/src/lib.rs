//! MIDI port I/O for midibridge.
//!
//! Provides port enumeration, real and virtual ports, raw output, and input
//! delivered from the driver's callback thread to a single consumer thread,
//! with sysex reassembly on top.
//!
//! Feature gates: `midi-io` (OS MIDI via midir). The in-memory backend is
//! always available.

pub mod error;
pub use error::{Error, Result};

pub mod config;
pub use config::{IgnoreFilter, InputConfig, OutputConfig, QueuePolicy};

pub mod backend;
pub use backend::memory::{MemoryDriver, MemoryInput, MemoryOutput, SentLog};
pub use backend::{MidiApi, MidiInputBackend, MidiOutputBackend, RawCallback};

#[cfg(feature = "midi-io")]
pub use backend::{MidirInput, MidirOutput};

pub mod bridge;
pub use bridge::{CallbackBridge, DeliveryHandle};

mod sysex;
pub use sysex::{SysexAssemblyState, SysexReassembler};

mod event;
pub use event::{EventCallback, EventKind, InputEvent, ListenerId, Listeners};

mod session;
pub use session::{PortBinding, PortInfo, PortSession};

mod input;
pub use input::MidiIn;

mod output;
pub use output::MidiOut;

pub use midibridge_msg::{MidiOutputMessage, RawMessage, StatusKind};
