//! The multi-producer, single-consumer message queue (C4) and its perishable
//! message expiry policy.
//!
//! The queue itself is a thin wrapper over `crossbeam_channel`'s bounded
//! MPSC channel: `write`/`read` block, matching the synchronous,
//! thread-based concurrency model this protocol runs under — there is no
//! async runtime anywhere in this crate.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvError, SendError, Sender};

use crate::error::QueueError;
use crate::inspector::{Inspector, InspectorMessage};
use crate::message::{Message, MessageType, PsdMessage};
use crate::time::Timestamp;

/// The tuned constant from the source this protocol was distilled from:
/// PSD/Spectrum frames older than this, measured against the analyzer's
/// steady-state real-time delta, are dropped before dispatch.
pub const DEFAULT_EXPIRE_DELTA: Duration = Duration::from_millis(50);

/// Tracks the "implementation-to-realtime delta" used to decide whether a
/// timely message (PSD or Inspector::Spectrum) has gone stale.
///
/// The first timely message ever observed seeds the delta
/// (`impl_rt_delta = now - rt_time`) and is never itself classified as
/// expired; every later timely message is expired iff
/// `(now - rt_time) - impl_rt_delta > max_delta`.
#[derive(Debug)]
pub struct ExpiryTracker {
    max_delta: Duration,
    impl_rt_delta: Option<Duration>,
}

impl ExpiryTracker {
    pub fn new(max_delta: Duration) -> Self {
        Self {
            max_delta,
            impl_rt_delta: None,
        }
    }

    pub fn with_default_delta() -> Self {
        Self::new(DEFAULT_EXPIRE_DELTA)
    }

    /// Returns whether `msg` should be treated as expired right now.
    /// Non-timely message types (everything but PSD and Inspector::Spectrum)
    /// are never expired.
    pub fn is_expired(&mut self, msg: &Message, wall_now: Timestamp) -> bool {
        let rt_time = match msg {
            Message::Psd(psd) => psd.header.rt_time,
            Message::Inspector(InspectorMessage {
                body: Inspector::Spectrum { .. },
                rt_time,
                ..
            }) => *rt_time,
            _ => return false,
        };
        self.is_rt_time_expired(rt_time, wall_now)
    }

    fn is_rt_time_expired(&mut self, rt_time: Timestamp, wall_now: Timestamp) -> bool {
        let elapsed = wall_now - rt_time;
        match self.impl_rt_delta {
            None => {
                self.impl_rt_delta = Some(elapsed);
                false
            }
            Some(delta) => elapsed.saturating_sub(delta) > self.max_delta,
        }
    }
}

/// A bounded, blocking FIFO of typed envelopes. Cloning shares the same
/// underlying channel — every clone is just another producer handle.
#[derive(Clone)]
pub struct MessageQueue {
    tx: Sender<(MessageType, Message)>,
    rx: Receiver<(MessageType, Message)>,
}

impl MessageQueue {
    /// `capacity` bounds the number of in-flight envelopes; `write` blocks
    /// once the queue is full, matching the backpressure the concurrency
    /// model describes.
    pub fn bounded(capacity: usize) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        Self { tx, rx }
    }

    /// Takes ownership of `msg` and enqueues it. On failure (the consumer
    /// has disconnected) ownership is handed back to the caller so it can
    /// dispose or retry, matching the "on failure the caller retains
    /// ownership" contract.
    pub fn write(&self, msg: Message) -> Result<(), (QueueError, Message)> {
        let ty = msg.message_type();
        match self.tx.send((ty, msg)) {
            Ok(()) => {
                tracing::trace!(message_type = %ty, "wrote message to queue");
                Ok(())
            }
            Err(SendError((_, msg))) => Err((QueueError::Disconnected, msg)),
        }
    }

    /// Blocks until a message is available, returning `(type, value)`.
    pub fn read(&self) -> Result<(MessageType, Message), QueueError> {
        self.rx.recv().map_err(|RecvError| QueueError::Disconnected).map(|(ty, msg)| {
            tracing::trace!(message_type = %ty, "read message from queue");
            (ty, msg)
        })
    }

    /// Blocks until a non-expired message is available, silently dropping
    /// any perishable message `tracker` reports as stale. Expiry never
    /// reorders the stream: messages are evaluated and dropped strictly in
    /// FIFO order.
    pub fn read_live(
        &self,
        tracker: &mut ExpiryTracker,
        wall_now: impl Fn() -> Timestamp,
    ) -> Result<(MessageType, Message), QueueError> {
        loop {
            let (ty, msg) = self.read()?;
            if tracker.is_expired(&msg, wall_now()) {
                tracing::debug!(message_type = %ty, "dropped expired message before dispatch");
                continue;
            }
            return Ok((ty, msg));
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
