//! Port configuration.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_CLIENT_NAME: &str = "midibridge";

/// Message families the driver should drop before they reach the callback.
///
/// Defaults to ignoring all three, matching what most drivers do out of the box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreFilter {
    pub sysex: bool,
    /// Timing clock (0xF8) and MIDI Time Code (0xF1).
    pub timing: bool,
    pub active_sensing: bool,
}

impl IgnoreFilter {
    pub const NONE: Self = Self {
        sysex: false,
        timing: false,
        active_sensing: false,
    };

    pub const ALL: Self = Self {
        sysex: true,
        timing: true,
        active_sensing: true,
    };

    pub fn new(sysex: bool, timing: bool, active_sensing: bool) -> Self {
        Self {
            sysex,
            timing,
            active_sensing,
        }
    }

    /// Whether a chunk starting with `first` is dropped by this filter.
    pub fn drops(&self, first: u8) -> bool {
        use midibridge_msg::{ACTIVE_SENSING, SYSEX_START, TIMING_CLOCK, TIME_CODE};
        match first {
            SYSEX_START => self.sysex,
            TIMING_CLOCK | TIME_CODE => self.timing,
            ACTIVE_SENSING => self.active_sensing,
            _ => false,
        }
    }
}

impl Default for IgnoreFilter {
    fn default() -> Self {
        Self::ALL
    }
}

/// What the callback bridge does when the consumer falls behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QueuePolicy {
    /// Never drop. Memory grows until the consumer drains.
    #[default]
    Unbounded,
    /// Hold at most `capacity` messages; further deliveries are dropped and counted.
    DropNewest { capacity: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Client name registered with the OS MIDI service.
    pub client_name: String,
    pub queue: QueuePolicy,
    pub ignore: IgnoreFilter,
    /// Drop an in-progress sysex once it grows past this many bytes.
    /// `None` keeps accumulating for as long as the source keeps sending.
    pub max_sysex_len: Option<usize>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            queue: QueuePolicy::Unbounded,
            ignore: IgnoreFilter::default(),
            max_sysex_len: None,
        }
    }
}

impl InputConfig {
    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    pub fn queue(mut self, policy: QueuePolicy) -> Self {
        self.queue = policy;
        self
    }

    pub fn ignore(mut self, filter: IgnoreFilter) -> Self {
        self.ignore = filter;
        self
    }

    pub fn max_sysex_len(mut self, limit: usize) -> Self {
        self.max_sysex_len = Some(limit);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.client_name.is_empty() {
            return Err(Error::InvalidArgument(
                "client_name must not be empty".to_string(),
            ));
        }
        if let QueuePolicy::DropNewest { capacity: 0 } = self.queue {
            return Err(Error::InvalidArgument(
                "DropNewest queue capacity must be at least 1".to_string(),
            ));
        }
        if let Some(limit) = self.max_sysex_len {
            // 0xF0 + 0xF7 is the smallest sysex there is
            if limit < 2 {
                return Err(Error::InvalidArgument(format!(
                    "max_sysex_len {} too small (minimum 2)",
                    limit
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub client_name: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            client_name: DEFAULT_CLIENT_NAME.to_string(),
        }
    }
}

impl OutputConfig {
    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.client_name.is_empty() {
            return Err(Error::InvalidArgument(
                "client_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
