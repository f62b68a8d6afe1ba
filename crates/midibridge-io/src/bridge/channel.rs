//! One session's hand-off queue.
//!
//! - Producer: [`DeliveryHandle`], moved into the backend callback (driver thread)
//! - Consumer: [`BridgeChannel`], owned by the bridge (consumer thread)

use crate::config::QueuePolicy;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use midibridge_msg::RawMessage;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Producer half of a bridge channel.
///
/// Cloning is cheap. Every clone refers to the same session; once the session
/// is deactivated all of them turn into no-ops.
#[derive(Clone)]
pub struct DeliveryHandle {
    active: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
    sender: Sender<RawMessage>,
    bounded: bool,
}

impl DeliveryHandle {
    /// Hand one message to the consumer thread. Never blocks.
    ///
    /// Returns `true` if the message was queued. A `false` return is not an
    /// error the driver can act on: the session is gone or the bounded queue
    /// was full.
    #[inline]
    pub fn deliver(&self, message: RawMessage) -> bool {
        if !self.active.load(Ordering::Acquire) {
            return false;
        }
        if self.bounded {
            match self.sender.try_send(message) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    false
                }
                Err(TrySendError::Disconnected(_)) => false,
            }
        } else {
            self.sender.send(message).is_ok()
        }
    }

    /// Convenience for backend callbacks that hand over borrowed bytes.
    #[inline]
    pub fn deliver_bytes(&self, delta_time: f64, bytes: &[u8]) -> bool {
        if !self.active.load(Ordering::Acquire) {
            return false;
        }
        self.deliver(RawMessage::new(delta_time, bytes))
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for DeliveryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryHandle")
            .field("active", &self.is_active())
            .field("bounded", &self.bounded)
            .finish()
    }
}

/// Consumer half, plus the producer template handed out by `activate`.
pub(crate) struct BridgeChannel {
    receiver: Receiver<RawMessage>,
    handle: DeliveryHandle,
}

impl BridgeChannel {
    pub(crate) fn open(policy: QueuePolicy, dropped: Arc<AtomicU64>) -> Self {
        let (sender, receiver, bounded) = match policy {
            QueuePolicy::Unbounded => {
                let (tx, rx) = crossbeam_channel::unbounded();
                (tx, rx, false)
            }
            QueuePolicy::DropNewest { capacity } => {
                let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
                (tx, rx, true)
            }
        };
        Self {
            receiver,
            handle: DeliveryHandle {
                active: Arc::new(AtomicBool::new(true)),
                dropped,
                sender,
                bounded,
            },
        }
    }

    pub(crate) fn handle(&self) -> DeliveryHandle {
        self.handle.clone()
    }

    pub(crate) fn is_active(&self) -> bool {
        self.handle.is_active()
    }

    /// Refuse further deliveries. Already-queued messages stay queued.
    pub(crate) fn mark_inactive(&self) {
        self.handle.active.store(false, Ordering::Release);
    }

    pub(crate) fn pending(&self) -> usize {
        self.receiver.len()
    }

    pub(crate) fn try_recv(&self) -> Option<RawMessage> {
        self.receiver.try_recv().ok()
    }

    /// Pass every message queued at call time to `f`, oldest first.
    ///
    /// Messages that arrive while draining wait for the next call, so a
    /// driver that never pauses cannot keep the consumer here forever.
    pub(crate) fn drain<F: FnMut(RawMessage)>(&self, mut f: F) -> usize {
        let budget = self.receiver.len();
        let mut count = 0;
        while count < budget {
            match self.receiver.try_recv() {
                Ok(message) => {
                    f(message);
                    count += 1;
                }
                Err(_) => break,
            }
        }
        count
    }

    /// Mark inactive and throw away whatever is still queued.
    pub(crate) fn close(self) -> usize {
        self.mark_inactive();
        let discarded = self.receiver.try_iter().count();
        if discarded > 0 {
            trace!("discarded {} undelivered MIDI messages", discarded);
        }
        discarded
    }
}
