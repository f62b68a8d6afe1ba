//! MIDI input facade.
//!
//! [`MidiIn`] composes one input backend, a [`CallbackBridge`] and a
//! [`SysexReassembler`]. The backend calls back on its own thread; those
//! callbacks only ever enqueue. Listeners run later, on whichever thread calls
//! [`MidiIn::dispatch_pending`].

use crate::backend::{check_index, MidiInputBackend, RawCallback};
use crate::bridge::CallbackBridge;
use crate::config::{IgnoreFilter, InputConfig};
use crate::error::{Error, Result};
use crate::event::{EventKind, InputEvent, ListenerId, Listeners};
use crate::session::{PortBinding, PortInfo, PortSession};
use crate::sysex::SysexReassembler;
use std::sync::Arc;
use tracing::{debug, warn};

#[cfg(feature = "midi-io")]
use crate::backend::MidirInput;

struct Inner<B> {
    backend: B,
    bridge: CallbackBridge,
    sysex: SysexReassembler,
    listeners: Listeners,
    session: PortSession,
    config: InputConfig,
}

impl<B: MidiInputBackend> Inner<B> {
    /// Wire bridge and callback, then bind. Undoes the wiring if the bind fails.
    fn bind<F>(&mut self, binding: PortBinding, open: F) -> Result<()>
    where
        F: FnOnce(&mut B, &str) -> Result<()>,
    {
        self.close();

        let handle = self.bridge.activate();
        let callback: RawCallback = Arc::new(move |delta_time, bytes| {
            handle.deliver_bytes(delta_time, bytes);
        });
        self.backend.register_raw_callback(callback);

        if let Err(e) = open(&mut self.backend, &self.config.client_name) {
            warn!("Failed to open MIDI input {:?}: {}", binding, e);
            self.backend.cancel_raw_callback();
            self.bridge.deactivate();
            return Err(e);
        }

        debug!("MIDI input bound to {}", PortSession::Bound(binding.clone()));
        self.session = PortSession::Bound(binding);
        Ok(())
    }

    /// Tear down the current session. No-op when nothing is wired.
    fn close(&mut self) {
        self.bridge.mark_inactive();
        self.backend.close_port();
        self.backend.cancel_raw_callback();
        self.bridge.deactivate();
        self.sysex.reset();
        if self.session.is_bound() {
            debug!("MIDI input closed ({})", self.session);
        }
        self.session = PortSession::Unbound;
    }
}

/// A MIDI input port.
///
/// Every mutating operation takes `&mut self`, so exactly one thread acts as
/// the consumer at a time. After [`destroy`](Self::destroy) every operation
/// fails with [`Error::Destroyed`].
pub struct MidiIn<B: MidiInputBackend> {
    inner: Option<Inner<B>>,
}

#[cfg(feature = "midi-io")]
impl MidiIn<MidirInput> {
    /// Connect to the OS MIDI service.
    pub fn new(config: InputConfig) -> Result<Self> {
        config.validate()?;
        let backend = MidirInput::new(&config.client_name)?;
        Self::with_backend(backend, config)
    }
}

impl<B: MidiInputBackend> MidiIn<B> {
    pub fn with_backend(mut backend: B, config: InputConfig) -> Result<Self> {
        config.validate()?;
        backend.set_ignore_filters(config.ignore);
        Ok(Self {
            inner: Some(Inner {
                backend,
                bridge: CallbackBridge::new(config.queue),
                sysex: SysexReassembler::with_max_len(config.max_sysex_len),
                listeners: Listeners::new(),
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

    /// Bind to the port at `index`, closing any previous binding first.
    pub fn open_port(&mut self, index: usize) -> Result<()> {
        let inner = self.inner_mut()?;
        check_index(index, inner.backend.port_count())?;
        let name = inner.backend.port_name(index)?;
        inner.bind(PortBinding::Real { index, name }, |backend, client| {
            backend.open_port(index, client)
        })
    }

    /// Create a virtual port other applications can send to.
    pub fn open_virtual_port(&mut self, name: &str) -> Result<()> {
        let inner = self.inner_mut()?;
        inner.bind(
            PortBinding::Virtual {
                name: name.to_string(),
            },
            |backend, _| backend.open_virtual_port(name),
        )
    }

    /// Close the current binding. Queued but undispatched chunks are discarded
    /// and no listener fires for them. Closing an unbound input is a no-op.
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

    /// Choose which message families the driver drops. `true` means ignore.
    pub fn ignore_types(&mut self, sysex: bool, timing: bool, active_sensing: bool) -> Result<()> {
        self.set_ignore_filter(IgnoreFilter::new(sysex, timing, active_sensing))
    }

    pub fn set_ignore_filter(&mut self, filter: IgnoreFilter) -> Result<()> {
        let inner = self.inner_mut()?;
        inner.config.ignore = filter;
        inner.backend.set_ignore_filters(filter);
        Ok(())
    }

    pub fn ignore_filter(&self) -> Result<IgnoreFilter> {
        Ok(self.inner()?.config.ignore)
    }

    pub fn on<F>(&mut self, kind: EventKind, callback: F) -> Result<ListenerId>
    where
        F: FnMut(&InputEvent) + Send + 'static,
    {
        Ok(self.inner_mut()?.listeners.on(kind, callback))
    }

    pub fn once<F>(&mut self, kind: EventKind, callback: F) -> Result<ListenerId>
    where
        F: FnMut(&InputEvent) + Send + 'static,
    {
        Ok(self.inner_mut()?.listeners.once(kind, callback))
    }

    pub fn off(&mut self, id: ListenerId) -> Result<bool> {
        Ok(self.inner_mut()?.listeners.off(id))
    }

    pub fn remove_all_listeners(&mut self, kind: Option<EventKind>) -> Result<()> {
        let listeners = &mut self.inner_mut()?.listeners;
        match kind {
            Some(kind) => listeners.clear(kind),
            None => listeners.clear_all(),
        }
        Ok(())
    }

    pub fn listener_count(&self, kind: EventKind) -> Result<usize> {
        Ok(self.inner()?.listeners.listener_count(kind))
    }

    /// Deliver queued chunks to listeners, in driver order.
    ///
    /// For each chunk a [`InputEvent::Message`] fires first, followed by the
    /// sysex/note/controller event the chunk completes, if any. Returns the
    /// number of chunks dispatched.
    pub fn dispatch_pending(&mut self) -> Result<usize> {
        let Inner {
            bridge,
            sysex,
            listeners,
            ..
        } = self.inner_mut()?;
        Ok(bridge.drain(|raw| {
            let classified = sysex.feed(&raw);
            listeners.emit(&InputEvent::Message {
                delta_time: raw.delta_time,
                bytes: raw.bytes,
            });
            if let Some(event) = classified {
                listeners.emit(&event);
            }
        }))
    }

    /// Chunks waiting for [`dispatch_pending`](Self::dispatch_pending).
    pub fn pending(&self) -> Result<usize> {
        Ok(self.inner()?.bridge.pending())
    }

    /// Chunks lost to a full `DropNewest` queue since construction.
    pub fn dropped(&self) -> Result<u64> {
        Ok(self.inner()?.bridge.dropped())
    }

    pub fn config(&self) -> Result<&InputConfig> {
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
            inner.listeners.clear_all();
            debug!("MIDI input destroyed");
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.is_none()
    }
}

impl<B: MidiInputBackend> Drop for MidiIn<B> {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl<B: MidiInputBackend> std::fmt::Debug for MidiIn<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            Some(inner) => f
                .debug_struct("MidiIn")
                .field("session", &inner.session)
                .field("bridge", &inner.bridge)
                .field("sysex", inner.sysex.state())
                .field("listeners", &inner.listeners)
                .finish(),
            None => f.write_str("MidiIn(destroyed)"),
        }
    }
}
