//! Events emitted by [`MidiIn`](crate::MidiIn) and the listener registry.

use midibridge_msg::RawBytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Something a listener can be told about.
///
/// `Message` fires once for every raw chunk the driver delivered. The other
/// variants are the coarse classification layered on top.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    Message {
        delta_time: f64,
        bytes: RawBytes,
    },
    /// A complete System Exclusive message, 0xF0 through 0xF7 inclusive.
    Sysex { bytes: Vec<u8> },
    NoteOn {
        note: u8,
        velocity: u8,
        channel: u8,
        delta_time: f64,
    },
    NoteOff {
        note: u8,
        velocity: u8,
        channel: u8,
        delta_time: f64,
    },
    ControlChange {
        param: u8,
        value: u8,
        channel: u8,
        delta_time: f64,
    },
}

impl InputEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            InputEvent::Message { .. } => EventKind::Message,
            InputEvent::Sysex { .. } => EventKind::Sysex,
            InputEvent::NoteOn { .. } => EventKind::NoteOn,
            InputEvent::NoteOff { .. } => EventKind::NoteOff,
            InputEvent::ControlChange { .. } => EventKind::ControlChange,
        }
    }
}

/// Event discriminant used for subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Message,
    Sysex,
    NoteOn,
    NoteOff,
    ControlChange,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::Message,
        EventKind::Sysex,
        EventKind::NoteOn,
        EventKind::NoteOff,
        EventKind::ControlChange,
    ];
}

/// Listener callback. Runs on the consumer thread.
pub type EventCallback = Box<dyn FnMut(&InputEvent) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

struct Listener {
    id: ListenerId,
    kind: EventKind,
    once: bool,
    callback: EventCallback,
}

/// Publish/subscribe registry, one per input.
///
/// Listeners for the same kind fire in subscription order.
#[derive(Default)]
pub struct Listeners {
    entries: Vec<Listener>,
    next_id: u64,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&mut self, kind: EventKind, callback: F) -> ListenerId
    where
        F: FnMut(&InputEvent) + Send + 'static,
    {
        self.insert(kind, false, Box::new(callback))
    }

    /// Like [`on`](Self::on), but removed after the first call.
    pub fn once<F>(&mut self, kind: EventKind, callback: F) -> ListenerId
    where
        F: FnMut(&InputEvent) + Send + 'static,
    {
        self.insert(kind, true, Box::new(callback))
    }

    fn insert(&mut self, kind: EventKind, once: bool, callback: EventCallback) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push(Listener {
            id,
            kind,
            once,
            callback,
        });
        id
    }

    /// Returns `false` if `id` was not registered (or already fired, for `once`).
    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|l| l.id != id);
        self.entries.len() != before
    }

    pub fn clear(&mut self, kind: EventKind) {
        self.entries.retain(|l| l.kind != kind);
    }

    pub fn clear_all(&mut self) {
        self.entries.clear();
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.entries.iter().filter(|l| l.kind == kind).count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Call every listener subscribed to `event.kind()`. Returns how many ran.
    pub fn emit(&mut self, event: &InputEvent) -> usize {
        let kind = event.kind();
        let mut called = 0;
        let mut fired_once = false;
        for listener in self.entries.iter_mut().filter(|l| l.kind == kind) {
            (listener.callback)(event);
            called += 1;
            fired_once |= listener.once;
        }
        if fired_once {
            self.entries.retain(|l| !(l.once && l.kind == kind));
        }
        called
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for kind in EventKind::ALL {
            let n = self.listener_count(kind);
            if n > 0 {
                map.entry(&kind, &n);
            }
        }
        map.finish()
    }
}
