//! A machine's private FIFO inbox.

use parking_lot::Mutex;
use std::collections::VecDeque;
use vertex_types::MachineEvent;

/// A FIFO queue of events addressed to one machine.
///
/// Appends are atomic with respect to readers: once a push returns,
/// any subsequent drain observes it. Multiple bus dispatchers may push
/// concurrently; exactly one [`crate::ActorRunner`] drains.
#[derive(Default)]
pub struct Mailbox<P> {
    queue: Mutex<VecDeque<MachineEvent<P>>>,
}

impl<P> Mailbox<P> {
    /// Builds an empty mailbox.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Appends an event to the back of the queue.
    pub fn push(&self, event: MachineEvent<P>) {
        self.queue.lock().push_back(event);
    }

    /// Pops up to `max` events from the front of the queue, in arrival order.
    pub fn drain_up_to(&self, max: usize) -> Vec<MachineEvent<P>> {
        let mut queue = self.queue.lock();
        let take = max.min(queue.len());
        queue.drain(..take).collect()
    }

    /// Returns the number of queued events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Returns whether the mailbox has no queued events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vertex_types::MachineId;

    #[test]
    fn drain_preserves_arrival_order() {
        let mailbox = Mailbox::new();
        for i in 0..5u32 {
            mailbox.push(MachineEvent::broadcast(MachineId::new("s"), i, 0));
        }
        let drained = mailbox.drain_up_to(3);
        let values: Vec<u32> = drained.iter().map(|e| e.payload).collect();
        assert_eq!(values, vec![0, 1, 2]);
        assert_eq!(mailbox.len(), 2);
    }

    #[test]
    fn drain_up_to_never_overdrains() {
        let mailbox: Mailbox<u32> = Mailbox::new();
        assert!(mailbox.drain_up_to(10).is_empty());
    }
}
