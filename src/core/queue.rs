//! Bounded multi-producer queue between the facade and the dispatcher
//!
//! Producers never block. When the queue is at capacity the configured
//! [`OverflowPolicy`] decides which event is lost: the oldest queued event is
//! evicted, or the event being submitted is discarded.

use super::overflow_policy::OverflowPolicy;
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use std::time::Duration;

/// Eviction attempts before a drop-oldest push gives up and drops the new
/// event instead. Only reachable when many producers race for the same slot.
const MAX_EVICTION_ATTEMPTS: usize = 8;

/// Result of offering an event to the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Event queued without loss
    Queued,

    /// Event queued after evicting this many older events
    QueuedAfterEvicting(usize),

    /// Queue was full and the event was discarded; carries the total number
    /// of events lost, including any evicted while retrying
    Rejected(usize),

    /// Consumer side is gone; the event was discarded without counting
    Closed,
}

impl PushOutcome {
    /// Number of events lost to overflow by this push
    pub fn dropped(&self) -> usize {
        match self {
            PushOutcome::Queued | PushOutcome::Closed => 0,
            PushOutcome::QueuedAfterEvicting(n) | PushOutcome::Rejected(n) => *n,
        }
    }

    /// Whether the push found the queue full
    pub fn was_full(&self) -> bool {
        matches!(
            self,
            PushOutcome::QueuedAfterEvicting(_) | PushOutcome::Rejected(_)
        )
    }
}

/// Producer half of the dispatch queue
///
/// Cheap to clone; every clone feeds the same consumer.
pub struct DispatchQueue<T> {
    sender: Sender<T>,
    /// Held only to evict the oldest entry under `DropOldest`
    evictor: Receiver<T>,
    capacity: Option<usize>,
    policy: OverflowPolicy,
}

/// Consumer half of the dispatch queue
pub struct QueueReceiver<T> {
    receiver: Receiver<T>,
}

/// Create a queue. `capacity == 0` means unbounded.
pub fn dispatch_queue<T>(capacity: usize, policy: OverflowPolicy) -> (DispatchQueue<T>, QueueReceiver<T>) {
    let (sender, receiver) = if capacity == 0 {
        unbounded()
    } else {
        bounded(capacity)
    };

    let queue = DispatchQueue {
        sender,
        evictor: receiver.clone(),
        capacity: (capacity > 0).then_some(capacity),
        policy,
    };

    (queue, QueueReceiver { receiver })
}

impl<T> DispatchQueue<T> {
    /// Offer an event without blocking
    pub fn push(&self, item: T) -> PushOutcome {
        match self.sender.try_send(item) {
            Ok(()) => PushOutcome::Queued,
            Err(TrySendError::Disconnected(_)) => PushOutcome::Closed,
            Err(TrySendError::Full(item)) => match self.policy {
                OverflowPolicy::DropNewest => PushOutcome::Rejected(1),
                OverflowPolicy::DropOldest => self.push_evicting(item),
            },
        }
    }

    fn push_evicting(&self, mut item: T) -> PushOutcome {
        let mut evicted = 0;

        for _ in 0..MAX_EVICTION_ATTEMPTS {
            if self.evictor.try_recv().is_ok() {
                evicted += 1;
            }

            match self.sender.try_send(item) {
                Ok(()) => return PushOutcome::QueuedAfterEvicting(evicted),
                Err(TrySendError::Disconnected(_)) => return PushOutcome::Closed,
                Err(TrySendError::Full(returned)) => item = returned,
            }
        }

        // Lost the race every time; the new event goes as well
        PushOutcome::Rejected(evicted + 1)
    }

    pub fn len(&self) -> usize {
        self.sender.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sender.is_empty()
    }

    /// `None` for an unbounded queue
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }
}

impl<T> Clone for DispatchQueue<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            evictor: self.evictor.clone(),
            capacity: self.capacity,
            policy: self.policy,
        }
    }
}

impl<T> QueueReceiver<T> {
    /// Block until an event arrives; `None` once every producer is gone and
    /// the queue is empty
    pub fn recv(&self) -> Option<T> {
        self.receiver.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<T, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    pub fn try_recv(&self) -> Option<T> {
        match self.receiver.try_recv() {
            Ok(item) => Some(item),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Move up to `max` immediately available events into `batch`
    pub fn drain_into(&self, batch: &mut Vec<T>, max: usize) -> usize {
        let mut taken = 0;
        while taken < max {
            match self.receiver.try_recv() {
                Ok(item) => {
                    batch.push(item);
                    taken += 1;
                }
                Err(_) => break,
            }
        }
        taken
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}
