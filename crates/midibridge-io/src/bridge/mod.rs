//! Driver thread to consumer thread hand-off.
//!
//! A [`CallbackBridge`] owns at most one [`channel`] at a time, one per open
//! port session. The driver thread only ever sees a [`DeliveryHandle`]; it
//! checks the session's `active` flag before every enqueue, so a handle that
//! outlives its session degrades to a no-op instead of touching a queue the
//! consumer has already released.
//!
//! Teardown order for a session:
//! 1. `mark_inactive` (producer refuses new messages)
//! 2. the owner stops the backend callback
//! 3. `deactivate` (queued messages discarded, channel released)

mod channel;

pub use channel::DeliveryHandle;

use crate::config::QueuePolicy;
use channel::BridgeChannel;
use midibridge_msg::RawMessage;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

pub struct CallbackBridge {
    policy: QueuePolicy,
    channel: Option<BridgeChannel>,
    /// Overflow drops under `DropNewest`, across all sessions.
    dropped: Arc<AtomicU64>,
}

impl CallbackBridge {
    pub fn new(policy: QueuePolicy) -> Self {
        Self {
            policy,
            channel: None,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn policy(&self) -> QueuePolicy {
        self.policy
    }

    /// Create the session channel and return its producer half.
    ///
    /// If a channel is already active, returns another handle to it.
    pub fn activate(&mut self) -> DeliveryHandle {
        if let Some(channel) = &self.channel {
            if channel.is_active() {
                return channel.handle();
            }
        }
        // An inactive leftover is replaced, never revived
        if let Some(stale) = self.channel.take() {
            stale.close();
        }
        let channel = BridgeChannel::open(self.policy, Arc::clone(&self.dropped));
        let handle = channel.handle();
        self.channel = Some(channel);
        debug!("MIDI bridge activated ({:?})", self.policy);
        handle
    }

    /// Stop accepting deliveries without releasing the channel yet.
    pub fn mark_inactive(&self) {
        if let Some(channel) = &self.channel {
            channel.mark_inactive();
        }
    }

    /// Refuse further deliveries, discard anything queued, release the channel.
    ///
    /// Safe to call any number of times, including before `activate`.
    /// Returns how many queued messages were discarded.
    pub fn deactivate(&mut self) -> usize {
        match self.channel.take() {
            Some(channel) => {
                let discarded = channel.close();
                debug!("MIDI bridge deactivated");
                discarded
            }
            None => 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.channel.as_ref().is_some_and(BridgeChannel::is_active)
    }

    /// Messages waiting for the consumer.
    pub fn pending(&self) -> usize {
        self.channel.as_ref().map_or(0, BridgeChannel::pending)
    }

    /// Messages dropped because a bounded queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn try_recv(&self) -> Option<RawMessage> {
        self.channel.as_ref()?.try_recv()
    }

    /// Hand every message queued at call time to `f` in FIFO order.
    /// Returns the number handed over.
    pub fn drain<F: FnMut(RawMessage)>(&self, f: F) -> usize {
        match &self.channel {
            Some(channel) => channel.drain(f),
            None => 0,
        }
    }
}

impl Default for CallbackBridge {
    fn default() -> Self {
        Self::new(QueuePolicy::default())
    }
}

impl Drop for CallbackBridge {
    fn drop(&mut self) {
        self.deactivate();
    }
}

impl std::fmt::Debug for CallbackBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackBridge")
            .field("policy", &self.policy)
            .field("active", &self.is_active())
            .field("pending", &self.pending())
            .field("dropped", &self.dropped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn msg(bytes: &[u8]) -> RawMessage {
        RawMessage::new(0.0, bytes)
    }

    #[test]
    fn test_fifo_exactly_once() {
        let mut bridge = CallbackBridge::default();
        let handle = bridge.activate();
        for i in 0..10u8 {
            assert!(handle.deliver(msg(&[0x90, i, 100])));
        }
        assert_eq!(bridge.pending(), 10);

        let mut seen = Vec::new();
        let n = bridge.drain(|m| seen.push(m.bytes[1]));
        assert_eq!(n, 10);
        assert_eq!(seen, (0..10).collect::<Vec<u8>>());
        assert_eq!(bridge.pending(), 0);
        assert!(bridge.try_recv().is_none());
    }

    #[test]
    fn test_activate_is_idempotent() {
        let mut bridge = CallbackBridge::default();
        let a = bridge.activate();
        let b = bridge.activate();
        a.deliver(msg(&[0x90, 1, 1]));
        b.deliver(msg(&[0x90, 2, 1]));
        assert_eq!(bridge.pending(), 2, "both handles feed the same channel");
    }

    #[test]
    fn test_deactivate_before_activate_and_twice() {
        let mut bridge = CallbackBridge::default();
        assert_eq!(bridge.deactivate(), 0);
        bridge.mark_inactive();

        let handle = bridge.activate();
        handle.deliver(msg(&[0xB0, 7, 100]));
        handle.deliver(msg(&[0xB0, 7, 90]));
        assert_eq!(bridge.deactivate(), 2);
        assert_eq!(bridge.deactivate(), 0);
        assert!(!bridge.is_active());
    }

    #[test]
    fn test_stale_handle_is_noop() {
        let mut bridge = CallbackBridge::default();
        let old = bridge.activate();
        bridge.deactivate();
        assert!(!old.is_active());
        assert!(!old.deliver(msg(&[0x90, 60, 100])));

        // A new session never sees the old handle's traffic
        let _new = bridge.activate();
        assert!(!old.deliver(msg(&[0x90, 61, 100])));
        assert_eq!(bridge.pending(), 0);
    }

    #[test]
    fn test_mark_inactive_keeps_queue_until_deactivate() {
        let mut bridge = CallbackBridge::default();
        let handle = bridge.activate();
        handle.deliver(msg(&[0x90, 60, 100]));
        bridge.mark_inactive();
        assert!(!handle.deliver(msg(&[0x90, 61, 100])));
        assert_eq!(bridge.pending(), 1);
        assert!(!bridge.is_active());

        // Re-activating replaces the inactive channel
        let fresh = bridge.activate();
        assert!(fresh.is_active());
        assert_eq!(bridge.pending(), 0);
    }

    #[test]
    fn test_drop_newest_policy() {
        let mut bridge = CallbackBridge::new(QueuePolicy::DropNewest { capacity: 4 });
        let handle = bridge.activate();
        let accepted = (0..10u8)
            .filter(|&i| handle.deliver(msg(&[0x90, i, 1])))
            .count();
        assert_eq!(accepted, 4);
        assert_eq!(bridge.pending(), 4);
        assert_eq!(bridge.dropped(), 6);

        let mut first = Vec::new();
        bridge.drain(|m| first.push(m.bytes[1]));
        assert_eq!(first, vec![0, 1, 2, 3], "oldest messages survive");
    }

    #[test]
    fn test_bridge_drop_invalidates_handle() {
        let mut bridge = CallbackBridge::default();
        let handle = bridge.activate();
        drop(bridge);
        assert!(!handle.deliver(msg(&[0x90, 60, 100])));
    }

    #[test]
    fn test_concurrent_producer() {
        let mut bridge = CallbackBridge::default();
        let handle = bridge.activate();

        let producer = thread::spawn(move || {
            for i in 0..5_000u32 {
                let b = (i % 128) as u8;
                handle.deliver(msg(&[0x90, b, 1]));
            }
        });

        let mut received = 0usize;
        let mut expected = 0u32;
        while received < 5_000 {
            bridge.drain(|m| {
                assert_eq!(m.bytes[1], (expected % 128) as u8);
                expected += 1;
            });
            received = expected as usize;
            thread::yield_now();
        }
        producer.join().unwrap();
        assert_eq!(received, 5_000);
    }
}
