//! # midibridge
//!
//! MIDI input and output ports for applications: enumerate ports, open real or
//! virtual ports, send raw bytes, and receive driver deliveries on your own
//! thread with sysex messages reassembled.
//!
//! ## Architecture
//!
//! midibridge is an umbrella crate over:
//! - **midibridge-msg** - Byte-level types (raw messages, status classification, output builders)
//! - **midibridge-io** - Backends, the driver-to-consumer callback bridge, sysex
//!   reassembly, port facades
//!
//! ## Quick Start
//!
//! ```ignore
//! use midibridge::prelude::*;
//!
//! let mut input = MidiIn::new(InputConfig::default())?;
//! input.open_port(0)?;
//! input.on(EventKind::NoteOn, |event| println!("{:?}", event))?;
//!
//! loop {
//!     input.dispatch_pending()?;
//!     std::thread::sleep(std::time::Duration::from_millis(5));
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - `midi-io`
//! - `midi-io` - OS MIDI ports via midir. Without it only the in-memory backend exists.

/// Byte-level MIDI types.
pub use midibridge_msg as msg;

/// Port I/O subsystem.
pub use midibridge_io as io;

pub use midibridge_io::{
    CallbackBridge, DeliveryHandle, EventKind, IgnoreFilter, InputConfig, InputEvent, ListenerId,
    MemoryDriver, MemoryInput, MemoryOutput, MidiIn, MidiOut, OutputConfig, PortBinding,
    PortInfo, PortSession, QueuePolicy, SysexAssemblyState, SysexReassembler,
};

#[cfg(feature = "midi-io")]
pub use midibridge_io::{MidirInput, MidirOutput};

pub use midibridge_msg::{MidiOutputMessage, RawMessage, StatusKind};

mod error;
pub use error::{Error, Result};

/// Convenience prelude for common imports
pub mod prelude {
    // Facades
    pub use crate::{MidiIn, MidiOut};

    // Configuration
    pub use crate::{IgnoreFilter, InputConfig, OutputConfig, QueuePolicy};

    // Events
    pub use crate::{EventKind, InputEvent};

    // Messages
    pub use crate::{MidiOutputMessage, RawMessage};

    // Backend traits, needed to call port methods on a backend directly
    pub use crate::io::{MidiApi, MidiInputBackend, MidiOutputBackend};

    pub use crate::{Error, Result};
}
