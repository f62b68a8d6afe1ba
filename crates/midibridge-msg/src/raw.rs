//! One raw delivery from a MIDI driver.

use crate::status::{is_data, StatusKind, SYSEX_END, SYSEX_START};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Inline storage for raw bytes. Channel messages and short system messages
/// stay on the stack; sysex chunks spill to the heap.
pub type RawBytes = SmallVec<[u8; 8]>;

/// Bytes exactly as the driver handed them over, plus the driver's delta-time.
///
/// A raw chunk may be a complete message, a sysex fragment, or (if the source
/// misbehaves) neither.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    /// Seconds since the previous message on the same port.
    pub delta_time: f64,
    pub bytes: RawBytes,
}

impl RawMessage {
    #[inline]
    pub fn new(delta_time: f64, bytes: &[u8]) -> Self {
        Self {
            delta_time,
            bytes: SmallVec::from_slice(bytes),
        }
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub fn first(&self) -> Option<u8> {
        self.bytes.first().copied()
    }

    #[inline]
    pub fn last(&self) -> Option<u8> {
        self.bytes.last().copied()
    }

    /// Classification of the first byte. `None` for an empty chunk.
    #[inline]
    pub fn kind(&self) -> Option<StatusKind> {
        self.first().map(StatusKind::of)
    }

    /// Starts with 0xF0.
    #[inline]
    pub fn starts_sysex(&self) -> bool {
        self.first() == Some(SYSEX_START)
    }

    /// Ends with 0xF7.
    #[inline]
    pub fn ends_sysex(&self) -> bool {
        self.last() == Some(SYSEX_END)
    }

    /// First byte is a plain data byte, i.e. this chunk can only be the
    /// continuation of something started earlier.
    #[inline]
    pub fn is_continuation(&self) -> bool {
        self.first().is_some_and(is_data)
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.bytes.into_vec()
    }
}

impl From<(f64, &[u8])> for RawMessage {
    fn from((delta_time, bytes): (f64, &[u8])) -> Self {
        Self::new(delta_time, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_message_stays_inline() {
        let msg = RawMessage::new(0.5, &[0x90, 60, 100]);
        assert!(!msg.bytes.spilled());
        assert_eq!(msg.len(), 3);
        assert_eq!(msg.kind(), Some(StatusKind::NoteOn));
        assert_eq!(msg.delta_time, 0.5);
    }

    #[test]
    fn test_long_sysex_spills() {
        let mut bytes = vec![0xF0];
        bytes.extend(std::iter::repeat(0x11).take(64));
        bytes.push(0xF7);
        let msg = RawMessage::new(0.0, &bytes);
        assert!(msg.bytes.spilled());
        assert!(msg.starts_sysex());
        assert!(msg.ends_sysex());
        assert_eq!(msg.into_vec(), bytes);
    }

    #[test]
    fn test_boundaries() {
        let head = RawMessage::new(0.0, &[0xF0, 0x43, 0x12]);
        assert!(head.starts_sysex());
        assert!(!head.ends_sysex());
        assert!(!head.is_continuation());

        let tail = RawMessage::new(0.0, &[0x01, 0x02, 0xF7]);
        assert!(tail.is_continuation());
        assert!(tail.ends_sysex());
    }

    #[test]
    fn test_empty_chunk() {
        let msg = RawMessage::new(0.0, &[]);
        assert!(msg.is_empty());
        assert_eq!(msg.kind(), None);
        assert!(!msg.is_continuation());
        assert!(!msg.starts_sysex());
    }

    #[test]
    fn test_serde_shape() {
        let msg = RawMessage::new(0.25, &[0xB0, 7, 127]);
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"delta_time":0.25,"bytes":[176,7,127]}"#);
        let back: RawMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }
}
