//! Outgoing MIDI byte sequences.

use crate::status::{SYSEX_END, SYSEX_START};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiOutputMessage {
    pub bytes: Vec<u8>,
}

impl MidiOutputMessage {
    pub fn control_change(channel: u8, cc_number: u8, value: u8) -> Self {
        let channel = channel.min(15); // MIDI channels are 0-15
        let status = 0xB0 | channel;
        Self {
            bytes: vec![status, cc_number & 0x7F, value & 0x7F],
        }
    }

    pub fn note_on(channel: u8, note: u8, velocity: u8) -> Self {
        let status = 0x90 | channel.min(15);
        Self {
            bytes: vec![status, note & 0x7F, velocity & 0x7F],
        }
    }

    pub fn note_off(channel: u8, note: u8, velocity: u8) -> Self {
        let status = 0x80 | channel.min(15);
        Self {
            bytes: vec![status, note & 0x7F, velocity & 0x7F],
        }
    }

    pub fn program_change(channel: u8, program: u8) -> Self {
        let status = 0xC0 | channel.min(15);
        Self {
            bytes: vec![status, program & 0x7F],
        }
    }

    /// `value`: signed 14-bit (-8192 to 8191).
    pub fn pitch_bend(channel: u8, value: i16) -> Self {
        let status = 0xE0 | channel.min(15);
        let unsigned = (value as i32 + 8192).clamp(0, 16383) as u16;
        Self {
            bytes: vec![status, (unsigned & 0x7F) as u8, ((unsigned >> 7) & 0x7F) as u8],
        }
    }

    /// Wraps `payload` in 0xF0 .. 0xF7. Payload bytes are masked to 7 bits.
    pub fn sysex(payload: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(payload.len() + 2);
        bytes.push(SYSEX_START);
        bytes.extend(payload.iter().map(|b| b & 0x7F));
        bytes.push(SYSEX_END);
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl AsRef<[u8]> for MidiOutputMessage {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<MidiOutputMessage> for Vec<u8> {
    fn from(msg: MidiOutputMessage) -> Self {
        msg.bytes
    }
}
