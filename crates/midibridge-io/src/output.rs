//! MIDI output facade. Sends go straight to the backend on the caller's thread.

use crate::backend::{check_index, MidiOutputBackend};
use crate::config::OutputConfig;
use crate::error::{Error, Result};
use crate::session::{PortBinding, PortInfo, PortSession};
use midibridge_msg::{is_status, MidiOutputMessage};
use tracing::{debug, trace, warn};

#[cfg(feature = "midi-io")]
use crate::backend::MidirOutput;

struct Inner<B> {
    backend: B,
    session: PortSession,
    config: OutputConfig,
}

impl<B: MidiOutputBackend> Inner<B> {
    fn close(&mut self) {
        self.backend.close_port();
        if self.session.is_bound() {
            debug!("MIDI output closed ({})", self.session);
        }
        self.session = PortSession::Unbound;
    }
}

/// A MIDI output port. After [`destroy`](Self::destroy) every operation fails
/// with [`Error::Destroyed`].
pub struct MidiOut<B: MidiOutputBackend> {
    inner: Option<Inner<B>>,
}

#[cfg(feature = "midi-io")]
impl MidiOut<MidirOutput> {
    pub fn new(config: OutputConfig) -> Result<Self> {
        config.validate()?;
        let backend = MidirOutput::new(&config.client_name)?;
        Self::with_backend(backend, config)
    }
}

impl<B: MidiOutputBackend> MidiOut<B> {
    pub fn with_backend(backend: B, config: OutputConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: Some(Inner {
                backend,
                session: PortSession::Unbound,
                config,
            }),
        })
    }

    fn inner(&self) -> Result<&Inner<B>> {
        self.inner.as_ref().ok_or(Error::Destroyed)
    }

    fn inner_mut(&mut self) -> Result<&mut Inner<B>> {
        self.inner.as_mut().ok_or(Error::Destroyed)
    }

    pub fn port_count(&self) -> Result<usize> {
        Ok(self.inner()?.backend.port_count())
    }

    pub fn port_name(&self, index: usize) -> Result<String> {
        let backend = &self.inner()?.backend;
        check_index(index, backend.port_count())?;
        backend.port_name(index)
    }

    pub fn ports(&self) -> Result<Vec<PortInfo>> {
        let names = self.inner()?.backend.list_ports();
        Ok(names
            .into_iter()
            .enumerate()
            .map(|(index, name)| PortInfo { index, name })
            .collect())
    }

    pub fn open_port(&mut self, index: usize) -> Result<()> {
        let inner = self.inner_mut()?;
        check_index(index, inner.backend.port_count())?;
        let name = inner.backend.port_name(index)?;
        inner.close();
        if let Err(e) = inner.backend.open_port(index, &inner.config.client_name) {
            warn!("Failed to open MIDI output port {}: {}", index, e);
            return Err(e);
        }
        inner.session = PortSession::Bound(PortBinding::Real { index, name });
        debug!("MIDI output bound to {}", inner.session);
        Ok(())
    }

    pub fn open_virtual_port(&mut self, name: &str) -> Result<()> {
        let inner = self.inner_mut()?;
        inner.close();
        if let Err(e) = inner.backend.open_virtual_port(name) {
            warn!("Failed to create virtual MIDI output '{}': {}", name, e);
            return Err(e);
        }
        inner.session = PortSession::Bound(PortBinding::Virtual {
            name: name.to_string(),
        });
        debug!("MIDI output bound to {}", inner.session);
        Ok(())
    }

    /// Closing an unbound output is a no-op.
    pub fn close_port(&mut self) -> Result<()> {
        self.inner_mut()?.close();
        Ok(())
    }

    pub fn is_port_open(&self) -> Result<bool> {
        let inner = self.inner()?;
        Ok(inner.session.is_bound() && inner.backend.is_port_open())
    }

    pub fn session(&self) -> Result<&PortSession> {
        Ok(&self.inner()?.session)
    }

    /// Send one raw MIDI message.
    ///
    /// The payload must be non-empty and start with a status byte. Running
    /// status is not supported.
    pub fn send(&mut self, bytes: &[u8]) -> Result<()> {
        let inner = self.inner_mut()?;
        match bytes.first() {
            None => {
                return Err(Error::InvalidArgument(
                    "cannot send an empty MIDI message".to_string(),
                ))
            }
            Some(&first) if !is_status(first) => {
                return Err(Error::InvalidArgument(format!(
                    "MIDI message must start with a status byte, got 0x{:02X}",
                    first
                )))
            }
            Some(_) => {}
        }
        if !inner.session.is_bound() {
            return Err(Error::backend("no output port open"));
        }
        trace!("MIDI out {:02X?}", bytes);
        inner.backend.send_raw_bytes(bytes)
    }

    pub fn send_message(&mut self, message: &MidiOutputMessage) -> Result<()> {
        self.send(message.as_bytes())
    }

    pub fn config(&self) -> Result<&OutputConfig> {
        Ok(&self.inner()?.config)
    }

    pub fn backend(&self) -> Result<&B> {
        Ok(&self.inner()?.backend)
    }

    pub fn backend_mut(&mut self) -> Result<&mut B> {
        Ok(&mut self.inner_mut()?.backend)
    }

    /// Close the port and release the backend. Idempotent.
    pub fn destroy(&mut self) {
        if let Some(mut inner) = self.inner.take() {
            inner.close();
            debug!("MIDI output destroyed");
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.is_none()
    }
}

impl<B: MidiOutputBackend> Drop for MidiOut<B> {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl<B: MidiOutputBackend> std::fmt::Debug for MidiOut<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            Some(inner) => f
                .debug_struct("MidiOut")
                .field("session", &inner.session)
                .finish(),
            None => f.write_str("MidiOut(destroyed)"),
        }
    }
}
