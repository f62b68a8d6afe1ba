//! Byte-level MIDI types shared by the midibridge crates.
//!
//! Nothing in here touches a device. The I/O side lives in `midibridge-io`.
//!
//! - [`RawMessage`]: one driver delivery (bytes + delta-time)
//! - [`StatusKind`]: coarse classification of a status byte
//! - [`MidiOutputMessage`]: builders for outgoing byte sequences

pub mod status;
pub use status::{
    channel_of, is_data, is_status, StatusKind, ACTIVE_SENSING, SYSEX_END, SYSEX_START,
    TIME_CODE, TIMING_CLOCK,
};

mod raw;
pub use raw::{RawBytes, RawMessage};

mod output;
pub use output::MidiOutputMessage;
