//! The in-process event bus: machine registration, mailbox dispatch,
//! and type-indexed fan-out subscribers.

use crate::mailbox::Mailbox;
use crate::topic::Topic;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;
use vertex_types::{MachineEvent, MachineId, Recipient};

/// A registered subscriber: an ordered, opaque callback invoked inline
/// on the dispatching thread. Subscribers are for telemetry and relay
/// only — they must not mutate machine state, and must not block.
type Subscriber<P> = Box<dyn Fn(&MachineEvent<P>) + Send + Sync>;

/// Routes [`MachineEvent`]s to per-machine mailboxes and to
/// topic-indexed fan-out subscribers.
///
/// `register`/`dispatch`/`subscribe` are safe to call concurrently from
/// multiple threads; `dispatch` is synchronous with respect to mailbox
/// append — by the time it returns, the event is in every matching
/// mailbox and every matching subscriber has already run.
pub struct EventBus<P> {
    mailboxes: RwLock<HashMap<MachineId, Arc<Mailbox<P>>>>,
    subscribers: RwLock<HashMap<&'static str, Vec<Subscriber<P>>>>,
}

impl<P> Default for EventBus<P> {
    fn default() -> Self {
        Self {
            mailboxes: RwLock::new(HashMap::new()),
            subscribers: RwLock::new(HashMap::new()),
        }
    }
}

impl<P> EventBus<P> {
    /// Builds an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `machine_id`, returning the mailbox it will receive
    /// events on. Registering an id that is already registered
    /// replaces its mailbox (and silently orphans any events still
    /// queued on the old one), matching "registration mapping is
    /// unique per id".
    pub fn register(&self, machine_id: MachineId) -> Arc<Mailbox<P>> {
        let mailbox = Arc::new(Mailbox::new());
        self.mailboxes.write().insert(machine_id, mailbox.clone());
        mailbox
    }

    /// Removes `machine_id`'s registration. Subsequent dispatches
    /// addressed directly to it are silently dropped (gossip-origin
    /// events may legitimately precede or outlive local registration).
    pub fn unregister(&self, machine_id: &MachineId) {
        self.mailboxes.write().remove(machine_id);
    }

    /// Returns whether `machine_id` currently has a registered mailbox.
    #[must_use]
    pub fn is_registered(&self, machine_id: &MachineId) -> bool {
        self.mailboxes.read().contains_key(machine_id)
    }

    /// Returns the number of registered machines.
    #[must_use]
    pub fn registered_count(&self) -> usize {
        self.mailboxes.read().len()
    }
}

impl<P: Clone + Topic> EventBus<P> {
    /// Delivers `event` to its recipient mailbox(es) and invokes any
    /// topic-matching subscribers, in registration order.
    ///
    /// A direct recipient with no registered mailbox is not an error:
    /// it is delivered only to type-subscribers, since gossip-origin
    /// events may arrive before the local machine registers.
    pub fn dispatch(&self, event: MachineEvent<P>) {
        match &event.recipient {
            Recipient::Direct(id) => {
                if let Some(mailbox) = self.mailboxes.read().get(id).cloned() {
                    mailbox.push(event.clone());
                } else {
                    trace!(machine_id = %id, "dispatch to unregistered machine, subscribers only");
                }
            }
            Recipient::Broadcast => {
                for mailbox in self.mailboxes.read().values() {
                    mailbox.push(event.clone());
                }
            }
        }

        let topic = event.payload.topic();
        if let Some(handlers) = self.subscribers.read().get(topic) {
            for handler in handlers {
                handler(&event);
            }
        }
    }

    /// Registers a fan-out subscriber for `topic`. Subscribers run
    /// inline on the dispatching thread in registration order and
    /// must not block or mutate machine state.
    pub fn subscribe(&self, topic: &'static str, handler: impl Fn(&MachineEvent<P>) + Send + Sync + 'static) {
        self.subscribers
            .write()
            .entry(topic)
            .or_default()
            .push(Box::new(handler));
    }

    /// Removes every subscriber registered for `topic`.
    pub fn unsubscribe(&self, topic: &'static str) {
        self.subscribers.write().remove(topic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use vertex_types::MachineId;

    #[derive(Clone)]
    enum Event {
        Ping,
        Pong,
    }

    impl Topic for Event {
        fn topic(&self) -> &'static str {
            match self {
                Event::Ping => "PING",
                Event::Pong => "PONG",
            }
        }
    }

    #[test]
    fn dispatch_to_registered_direct_recipient_fills_mailbox() {
        let bus: EventBus<Event> = EventBus::new();
        let mailbox = bus.register(MachineId::new("a"));
        bus.dispatch(MachineEvent {
            id: "1".into(),
            kind: vertex_types::MessageKind::Event,
            payload: Event::Ping,
            sender: MachineId::new("b"),
            recipient: Recipient::Direct(MachineId::new("a")),
            timestamp: 0,
            causation_id: None,
        });
        assert_eq!(mailbox.len(), 1);
    }

    #[test]
    fn dispatch_to_unregistered_recipient_does_not_error() {
        let bus: EventBus<Event> = EventBus::new();
        // Must not panic even though "ghost" was never registered.
        bus.dispatch(MachineEvent::broadcast(MachineId::new("b"), Event::Ping, 0));
    }

    #[test]
    fn broadcast_reaches_every_registered_mailbox() {
        let bus: EventBus<Event> = EventBus::new();
        let a = bus.register(MachineId::new("a"));
        let b = bus.register(MachineId::new("b"));
        bus.dispatch(MachineEvent::broadcast(MachineId::new("c"), Event::Pong, 0));
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn subscribers_run_in_registration_order() {
        let bus: EventBus<Event> = EventBus::new();
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let o1 = order.clone();
        let o2 = order.clone();
        bus.subscribe("PING", move |_| o1.lock().push(1));
        bus.subscribe("PING", move |_| o2.lock().push(2));
        bus.dispatch(MachineEvent::broadcast(MachineId::new("x"), Event::Ping, 0));
        assert_eq!(*order.lock(), vec![1, 2]);
    }

    #[test]
    fn unsubscribe_removes_all_handlers_for_topic() {
        let bus: EventBus<Event> = EventBus::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        bus.subscribe("PING", move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        bus.unsubscribe("PING");
        bus.dispatch(MachineEvent::broadcast(MachineId::new("x"), Event::Ping, 0));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn re_registering_replaces_the_mailbox() {
        let bus: EventBus<Event> = EventBus::new();
        let first = bus.register(MachineId::new("a"));
        bus.dispatch(MachineEvent::broadcast(MachineId::new("x"), Event::Ping, 0));
        let second = bus.register(MachineId::new("a"));
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 0);
    }
}
