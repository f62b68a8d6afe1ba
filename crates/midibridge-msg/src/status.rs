//! Status byte constants and coarse message classification.
//!
//! Only as much decoding as is needed to find sysex boundaries and to tell
//! note/controller messages apart. Anything finer is left to the caller.

use serde::{Deserialize, Serialize};

/// Sysex start marker.
pub const SYSEX_START: u8 = 0xF0;
/// Sysex terminator (EOX).
pub const SYSEX_END: u8 = 0xF7;
/// MIDI Time Code quarter frame.
pub const TIME_CODE: u8 = 0xF1;
/// Timing clock (24 ppqn).
pub const TIMING_CLOCK: u8 = 0xF8;
pub const ACTIVE_SENSING: u8 = 0xFE;

/// `true` for bytes with the top bit set.
#[inline]
pub const fn is_status(byte: u8) -> bool {
    byte & 0x80 != 0
}

/// `true` for plain 7-bit data bytes.
#[inline]
pub const fn is_data(byte: u8) -> bool {
    byte & 0x80 == 0
}

/// Low nibble of a channel status byte (0-15).
#[inline]
pub const fn channel_of(status: u8) -> u8 {
    status & 0x0F
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusKind {
    NoteOff,
    NoteOn,
    PolyPressure,
    ControlChange,
    ProgramChange,
    ChannelPressure,
    PitchBend,
    SysexStart,
    SysexEnd,
    /// Any other system common / realtime byte (0xF1-0xFF except 0xF7).
    System,
    /// Not a status byte at all.
    Data,
}

impl StatusKind {
    pub const fn of(byte: u8) -> Self {
        if is_data(byte) {
            return StatusKind::Data;
        }
        match byte {
            SYSEX_START => StatusKind::SysexStart,
            SYSEX_END => StatusKind::SysexEnd,
            0xF1..=0xFF => StatusKind::System,
            _ => match byte >> 4 {
                0x8 => StatusKind::NoteOff,
                0x9 => StatusKind::NoteOn,
                0xA => StatusKind::PolyPressure,
                0xB => StatusKind::ControlChange,
                0xC => StatusKind::ProgramChange,
                0xD => StatusKind::ChannelPressure,
                _ => StatusKind::PitchBend,
            },
        }
    }

    /// Channel voice messages carry a channel in the low nibble.
    pub const fn is_channel_voice(self) -> bool {
        matches!(
            self,
            StatusKind::NoteOff
                | StatusKind::NoteOn
                | StatusKind::PolyPressure
                | StatusKind::ControlChange
                | StatusKind::ProgramChange
                | StatusKind::ChannelPressure
                | StatusKind::PitchBend
        )
    }

    /// Number of data bytes that follow the status byte, if fixed.
    pub const fn data_len(self) -> Option<usize> {
        match self {
            StatusKind::NoteOff
            | StatusKind::NoteOn
            | StatusKind::PolyPressure
            | StatusKind::ControlChange
            | StatusKind::PitchBend => Some(2),
            StatusKind::ProgramChange | StatusKind::ChannelPressure => Some(1),
            StatusKind::SysexStart | StatusKind::System | StatusKind::Data => None,
            StatusKind::SysexEnd => Some(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_voice_kinds() {
        assert_eq!(StatusKind::of(0x80), StatusKind::NoteOff);
        assert_eq!(StatusKind::of(0x9F), StatusKind::NoteOn);
        assert_eq!(StatusKind::of(0xA3), StatusKind::PolyPressure);
        assert_eq!(StatusKind::of(0xB0), StatusKind::ControlChange);
        assert_eq!(StatusKind::of(0xC5), StatusKind::ProgramChange);
        assert_eq!(StatusKind::of(0xD1), StatusKind::ChannelPressure);
        assert_eq!(StatusKind::of(0xEF), StatusKind::PitchBend);
    }

    #[test]
    fn test_system_kinds() {
        assert_eq!(StatusKind::of(SYSEX_START), StatusKind::SysexStart);
        assert_eq!(StatusKind::of(SYSEX_END), StatusKind::SysexEnd);
        assert_eq!(StatusKind::of(TIMING_CLOCK), StatusKind::System);
        assert_eq!(StatusKind::of(TIME_CODE), StatusKind::System);
        assert_eq!(StatusKind::of(ACTIVE_SENSING), StatusKind::System);
        assert_eq!(StatusKind::of(0xFF), StatusKind::System);
    }

    #[test]
    fn test_data_bytes() {
        for b in 0..0x80u8 {
            assert_eq!(StatusKind::of(b), StatusKind::Data);
            assert!(is_data(b));
            assert!(!is_status(b));
        }
    }

    #[test]
    fn test_channel_of() {
        assert_eq!(channel_of(0x90), 0);
        assert_eq!(channel_of(0x9A), 10);
        assert_eq!(channel_of(0xBF), 15);
    }

    #[test]
    fn test_data_len() {
        assert_eq!(StatusKind::NoteOn.data_len(), Some(2));
        assert_eq!(StatusKind::ProgramChange.data_len(), Some(1));
        assert_eq!(StatusKind::SysexStart.data_len(), None);
        assert!(StatusKind::PitchBend.is_channel_voice());
        assert!(!StatusKind::System.is_channel_voice());
    }
}
