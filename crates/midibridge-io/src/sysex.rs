//! Sysex reassembly and coarse classification of raw chunks.
//!
//! Drivers deliver sysex dumps in pieces sized by their transport buffer. The
//! only boundaries a stream carries are 0xF0 and 0xF7, so reassembly is driven
//! purely by chunk content:
//!
//! - a chunk starting with 0xF0 opens a message
//! - following chunks that start with a data byte extend it
//! - a chunk ending with 0xF7 completes it
//! - a chunk starting with any status byte abandons it silently
//!
//! There is no timeout. An unterminated sysex stays buffered until the next
//! status byte arrives, or until `max_len` is hit if one is configured.

use crate::event::InputEvent;
use midibridge_msg::{channel_of, RawMessage, StatusKind};
use tracing::trace;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SysexAssemblyState {
    #[default]
    Idle,
    /// Bytes of the in-progress message, starting with 0xF0.
    Accumulating(Vec<u8>),
}

#[derive(Debug, Default)]
pub struct SysexReassembler {
    state: SysexAssemblyState,
    max_len: Option<usize>,
}

impl SysexReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Abandon any sysex that would grow past `max_len` bytes.
    pub fn with_max_len(max_len: Option<usize>) -> Self {
        Self {
            state: SysexAssemblyState::Idle,
            max_len,
        }
    }

    pub fn state(&self) -> &SysexAssemblyState {
        &self.state
    }

    pub fn is_accumulating(&self) -> bool {
        matches!(self.state, SysexAssemblyState::Accumulating(_))
    }

    /// Bytes held for the in-progress sysex (0 when idle).
    pub fn buffered_len(&self) -> usize {
        match &self.state {
            SysexAssemblyState::Accumulating(buf) => buf.len(),
            SysexAssemblyState::Idle => 0,
        }
    }

    /// Drop any partial message. Called when the port session ends.
    pub fn reset(&mut self) {
        self.state = SysexAssemblyState::Idle;
    }

    /// Feed the next chunk in delivery order.
    ///
    /// Returns the classified event for this chunk, if any. Raw delivery of the
    /// chunk itself is the caller's concern and happens regardless.
    pub fn feed(&mut self, chunk: &RawMessage) -> Option<InputEvent> {
        if let SysexAssemblyState::Accumulating(buf) = &mut self.state {
            if chunk.is_empty() {
                return None;
            }
            if chunk.is_continuation() {
                if self.max_len.is_some_and(|max| buf.len() + chunk.len() > max) {
                    trace!("sysex exceeded {:?} bytes, discarding", self.max_len);
                    self.state = SysexAssemblyState::Idle;
                    return None;
                }
                buf.extend_from_slice(chunk.bytes());
                if chunk.ends_sysex() {
                    let bytes = std::mem::take(buf);
                    self.state = SysexAssemblyState::Idle;
                    return Some(InputEvent::Sysex { bytes });
                }
                return None;
            }
            trace!("new status byte abandoned {} sysex bytes", buf.len());
            self.state = SysexAssemblyState::Idle;
        }
        self.feed_idle(chunk)
    }

    fn feed_idle(&mut self, chunk: &RawMessage) -> Option<InputEvent> {
        if chunk.starts_sysex() {
            if self.max_len.is_some_and(|max| chunk.len() > max) {
                trace!("sysex exceeded {:?} bytes, discarding", self.max_len);
                return None;
            }
            // A lone 0xF0 is its own first *and* last byte; it is not complete
            if chunk.len() >= 2 && chunk.ends_sysex() {
                return Some(InputEvent::Sysex {
                    bytes: chunk.bytes().to_vec(),
                });
            }
            self.state = SysexAssemblyState::Accumulating(chunk.bytes().to_vec());
            return None;
        }

        let kind = chunk.kind().filter(|k| k.is_channel_voice())?;
        let bytes = chunk.bytes();
        if bytes.len() < 1 + kind.data_len()? {
            return None;
        }
        let status = bytes[0];
        let channel = channel_of(status);
        let delta_time = chunk.delta_time;
        match kind {
            StatusKind::NoteOn => Some(InputEvent::NoteOn {
                note: bytes[1],
                velocity: bytes[2],
                channel,
                delta_time,
            }),
            StatusKind::NoteOff => Some(InputEvent::NoteOff {
                note: bytes[1],
                velocity: bytes[2],
                channel,
                delta_time,
            }),
            StatusKind::ControlChange => Some(InputEvent::ControlChange {
                param: bytes[1],
                value: bytes[2],
                channel,
                delta_time,
            }),
            _ => None,
        }
    }
}
