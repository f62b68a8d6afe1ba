//! In-process MIDI ports.
//!
//! [`MemoryInput`] behaves like a driver-backed input: bytes injected through a
//! [`MemoryDriver`] reach the registered callback on whatever thread called
//! `inject`, after the ignore filters have been applied. [`MemoryOutput`]
//! records everything it sends and can loop it back into a driver.
//!
//! Useful for tests and for wiring software components together without an OS
//! MIDI service.

use super::{check_index, MidiApi, MidiInputBackend, MidiOutputBackend, RawCallback};
use crate::config::IgnoreFilter;
use crate::error::{Error, Result};
use arc_swap::ArcSwapOption;
use midibridge_msg::{SYSEX_END, SYSEX_START};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::trace;

const IGNORE_SYSEX: u8 = 0b001;
const IGNORE_TIMING: u8 = 0b010;
const IGNORE_SENSING: u8 = 0b100;

fn pack(filter: IgnoreFilter) -> u8 {
    let mut bits = 0;
    if filter.sysex {
        bits |= IGNORE_SYSEX;
    }
    if filter.timing {
        bits |= IGNORE_TIMING;
    }
    if filter.active_sensing {
        bits |= IGNORE_SENSING;
    }
    bits
}

fn unpack(bits: u8) -> IgnoreFilter {
    IgnoreFilter {
        sysex: bits & IGNORE_SYSEX != 0,
        timing: bits & IGNORE_TIMING != 0,
        active_sensing: bits & IGNORE_SENSING != 0,
    }
}

struct DriverShared {
    open: AtomicBool,
    callback: ArcSwapOption<RawCallback>,
    ignore: AtomicU8,
    epoch: Instant,
    /// Nanoseconds since `epoch` of the last `inject_now`, `u64::MAX` if none yet.
    last_ns: AtomicU64,
    /// Set while the continuation chunks of an ignored sysex are still arriving.
    in_ignored_sysex: AtomicBool,
}

impl DriverShared {
    /// Apply the ignore filters to one chunk, tracking ignored sysex across chunks.
    fn filtered(&self, bytes: &[u8]) -> bool {
        let Some(&first) = bytes.first() else {
            return self.in_ignored_sysex.load(Ordering::Relaxed);
        };
        let filter = unpack(self.ignore.load(Ordering::Relaxed));
        if first < 0x80 {
            if self.in_ignored_sysex.load(Ordering::Relaxed) {
                if bytes.last() == Some(&SYSEX_END) {
                    self.in_ignored_sysex.store(false, Ordering::Relaxed);
                }
                return true;
            }
            return false;
        }
        // Real-time bytes may interleave with a sysex without ending it
        if first < 0xF8 {
            let starts_ignored = first == SYSEX_START && filter.sysex;
            let unterminated = bytes.len() < 2 || bytes.last() != Some(&SYSEX_END);
            self.in_ignored_sysex
                .store(starts_ignored && unterminated, Ordering::Relaxed);
        }
        filter.drops(first)
    }
}

/// The "driver thread" side of a [`MemoryInput`].
///
/// Cheap to clone and safe to move to any thread. Every method is lock-free.
#[derive(Clone)]
pub struct MemoryDriver {
    shared: Arc<DriverShared>,
}

impl MemoryDriver {
    fn new() -> Self {
        Self {
            shared: Arc::new(DriverShared {
                open: AtomicBool::new(false),
                callback: ArcSwapOption::empty(),
                ignore: AtomicU8::new(pack(IgnoreFilter::default())),
                epoch: Instant::now(),
                last_ns: AtomicU64::new(u64::MAX),
                in_ignored_sysex: AtomicBool::new(false),
            }),
        }
    }

    /// Deliver one chunk with an explicit delta-time.
    ///
    /// Returns `true` if a callback was invoked. Chunks are dropped while the
    /// port is closed, when no callback is registered, or when the ignore
    /// filters reject them.
    pub fn inject(&self, delta_time: f64, bytes: &[u8]) -> bool {
        if !self.shared.open.load(Ordering::Acquire) {
            trace!("memory input closed, dropping {} bytes", bytes.len());
            return false;
        }
        if self.shared.filtered(bytes) {
            return false;
        }
        let guard = self.shared.callback.load();
        match &*guard {
            Some(callback) => {
                callback(delta_time, bytes);
                true
            }
            None => false,
        }
    }

    /// Deliver one chunk, computing delta-time from the previous `inject_now`.
    /// The first chunk reports `0.0`.
    pub fn inject_now(&self, bytes: &[u8]) -> bool {
        let now = self.shared.epoch.elapsed().as_nanos() as u64;
        let prev = self.shared.last_ns.swap(now, Ordering::AcqRel);
        let delta = if prev == u64::MAX {
            0.0
        } else {
            now.saturating_sub(prev) as f64 / 1e9
        };
        self.inject(delta, bytes)
    }

    pub fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::Acquire)
    }

    pub fn has_callback(&self) -> bool {
        self.shared.callback.load().is_some()
    }
}

impl std::fmt::Debug for MemoryDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDriver")
            .field("open", &self.is_open())
            .field("has_callback", &self.has_callback())
            .finish()
    }
}

/// Which port a memory backend is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Binding {
    Port(usize),
    Virtual(String),
}

/// Port list plus the failure switches both memory backends share.
#[derive(Debug, Clone)]
struct MemoryPorts {
    names: Vec<String>,
    virtual_supported: bool,
    fail_open: bool,
    binding: Option<Binding>,
}

impl MemoryPorts {
    fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            virtual_supported: true,
            fail_open: false,
            binding: None,
        }
    }

    fn port_name(&self, index: usize) -> Result<String> {
        check_index(index, self.names.len())?;
        Ok(self.names[index].clone())
    }

    fn open_port(&mut self, index: usize) -> Result<()> {
        check_index(index, self.names.len())?;
        if self.fail_open {
            return Err(Error::backend(format!(
                "failed to open memory port '{}'",
                self.names[index]
            )));
        }
        self.binding = Some(Binding::Port(index));
        Ok(())
    }

    fn open_virtual_port(&mut self, name: &str) -> Result<()> {
        if !self.virtual_supported {
            return Err(Error::backend(
                "virtual ports are not supported by this backend",
            ));
        }
        if self.fail_open {
            return Err(Error::backend(format!(
                "failed to create virtual port '{}'",
                name
            )));
        }
        self.binding = Some(Binding::Virtual(name.to_string()));
        Ok(())
    }

    fn bound_name(&self) -> Option<String> {
        match self.binding.as_ref()? {
            Binding::Port(index) => self.names.get(*index).cloned(),
            Binding::Virtual(name) => Some(name.clone()),
        }
    }
}

/// In-process MIDI input.
pub struct MemoryInput {
    ports: MemoryPorts,
    driver: MemoryDriver,
}

impl MemoryInput {
    pub fn new<I, S>(port_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ports: MemoryPorts::new(port_names),
            driver: MemoryDriver::new(),
        }
    }

    /// Report virtual ports as unsupported, like some platforms do.
    pub fn without_virtual_ports(mut self) -> Self {
        self.ports.virtual_supported = false;
        self
    }

    /// Make every open fail with a backend error.
    pub fn failing_opens(mut self) -> Self {
        self.ports.fail_open = true;
        self
    }

    /// Handle for injecting chunks from a "driver" thread.
    pub fn driver(&self) -> MemoryDriver {
        self.driver.clone()
    }

    /// Name of the bound port (or virtual port), if any.
    pub fn bound_name(&self) -> Option<String> {
        self.ports.bound_name()
    }

    /// Current ignore filters as seen by the driver.
    pub fn ignore_filters(&self) -> IgnoreFilter {
        unpack(self.driver.shared.ignore.load(Ordering::Relaxed))
    }
}

impl MidiApi for MemoryInput {
    fn port_count(&self) -> usize {
        self.ports.names.len()
    }

    fn port_name(&self, index: usize) -> Result<String> {
        self.ports.port_name(index)
    }

    fn open_port(&mut self, index: usize, _name: &str) -> Result<()> {
        self.close_port();
        self.ports.open_port(index)?;
        self.driver.shared.open.store(true, Ordering::Release);
        Ok(())
    }

    fn open_virtual_port(&mut self, name: &str) -> Result<()> {
        self.close_port();
        self.ports.open_virtual_port(name)?;
        self.driver.shared.open.store(true, Ordering::Release);
        Ok(())
    }

    fn close_port(&mut self) {
        self.driver.shared.open.store(false, Ordering::Release);
        self.driver
            .shared
            .in_ignored_sysex
            .store(false, Ordering::Relaxed);
        self.ports.binding = None;
    }

    fn is_port_open(&self) -> bool {
        self.ports.binding.is_some()
    }
}

impl MidiInputBackend for MemoryInput {
    fn set_ignore_filters(&mut self, filter: IgnoreFilter) {
        self.driver
            .shared
            .ignore
            .store(pack(filter), Ordering::Relaxed);
    }

    fn register_raw_callback(&mut self, callback: RawCallback) {
        self.driver.shared.callback.store(Some(Arc::new(callback)));
    }

    fn cancel_raw_callback(&mut self) {
        self.driver.shared.callback.store(None);
    }
}

impl std::fmt::Debug for MemoryInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryInput")
            .field("ports", &self.ports.names)
            .field("binding", &self.ports.binding)
            .finish()
    }
}

/// Everything a [`MemoryOutput`] has sent, in order.
#[derive(Debug, Clone, Default)]
pub struct SentLog {
    messages: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl SentLog {
    pub fn messages(&self) -> Vec<Vec<u8>> {
        self.messages.lock().clone()
    }

    pub fn take(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut *self.messages.lock())
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }
}

/// In-process MIDI output.
pub struct MemoryOutput {
    ports: MemoryPorts,
    fail_send: bool,
    sent: SentLog,
    loopback: Option<MemoryDriver>,
}

impl MemoryOutput {
    pub fn new<I, S>(port_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ports: MemoryPorts::new(port_names),
            fail_send: false,
            sent: SentLog::default(),
            loopback: None,
        }
    }

    pub fn without_virtual_ports(mut self) -> Self {
        self.ports.virtual_supported = false;
        self
    }

    pub fn failing_opens(mut self) -> Self {
        self.ports.fail_open = true;
        self
    }

    pub fn failing_sends(mut self) -> Self {
        self.fail_send = true;
        self
    }

    /// Also inject every sent message into `driver`.
    pub fn loopback(mut self, driver: MemoryDriver) -> Self {
        self.loopback = Some(driver);
        self
    }

    pub fn sent_log(&self) -> SentLog {
        self.sent.clone()
    }

    pub fn bound_name(&self) -> Option<String> {
        self.ports.bound_name()
    }
}

impl MidiApi for MemoryOutput {
    fn port_count(&self) -> usize {
        self.ports.names.len()
    }

    fn port_name(&self, index: usize) -> Result<String> {
        self.ports.port_name(index)
    }

    fn open_port(&mut self, index: usize, _name: &str) -> Result<()> {
        self.close_port();
        self.ports.open_port(index)
    }

    fn open_virtual_port(&mut self, name: &str) -> Result<()> {
        self.close_port();
        self.ports.open_virtual_port(name)
    }

    fn close_port(&mut self) {
        self.ports.binding = None;
    }

    fn is_port_open(&self) -> bool {
        self.ports.binding.is_some()
    }
}

impl MidiOutputBackend for MemoryOutput {
    fn send_raw_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if self.ports.binding.is_none() {
            return Err(Error::backend("no output port open"));
        }
        if self.fail_send {
            return Err(Error::backend("memory output send failed"));
        }
        self.sent.messages.lock().push(bytes.to_vec());
        if let Some(ref driver) = self.loopback {
            driver.inject_now(bytes);
        }
        Ok(())
    }
}

impl std::fmt::Debug for MemoryOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryOutput")
            .field("ports", &self.ports.names)
            .field("binding", &self.ports.binding)
            .field("sent", &self.sent.len())
            .finish()
    }
}
