//! Centralized error type for the midibridge umbrella crate.
//!
//! Wraps subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("MIDI: {0}")]
    Midi(#[from] midibridge_io::Error),
}

impl Error {
    /// The port handle was used after `destroy()`.
    pub fn is_destroyed(&self) -> bool {
        matches!(self, Error::Midi(midibridge_io::Error::Destroyed))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
