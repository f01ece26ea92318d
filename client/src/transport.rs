//! Client side of the named event bus.
//!
//! Outgoing intents go through the [`Transport`] trait and are fire-and-forget.
//! Incoming events are only routed to listeners holding a live
//! [`Subscription`]; dropping the subscription detaches the listener, so every
//! exit path from a listener's lifetime unsubscribes it.

use log::warn;
use shared::{ClientEvent, Envelope};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use tokio::sync::mpsc;

pub trait Transport {
    /// Queues `event` for the server. Never blocks and never reports delivery.
    fn emit(&self, event: ClientEvent);
}

/// Which part of the core a subscription feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Listener {
    Lobby,
    Game,
}

#[derive(Debug, Default)]
struct Registry {
    next_id: u64,
    subscriptions: HashMap<u64, (Listener, &'static [&'static str])>,
}

/// Handle returned by [`EventChannel::attach`]. Detaches on drop.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    listener: Listener,
    registry: Weak<RefCell<Registry>>,
}

impl Subscription {
    pub fn listener(&self) -> Listener {
        self.listener
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.borrow_mut().subscriptions.remove(&self.id);
        }
    }
}

/// Outbound queue to the connection task plus the local subscription registry.
#[derive(Debug, Clone)]
pub struct EventChannel {
    registry: Rc<RefCell<Registry>>,
    outbound: mpsc::UnboundedSender<Envelope>,
}

impl EventChannel {
    pub fn new(outbound: mpsc::UnboundedSender<Envelope>) -> Self {
        Self {
            registry: Rc::new(RefCell::new(Registry::default())),
            outbound,
        }
    }

    pub fn attach(&self, listener: Listener, events: &'static [&'static str]) -> Subscription {
        let mut registry = self.registry.borrow_mut();
        registry.next_id += 1;
        let id = registry.next_id;
        registry.subscriptions.insert(id, (listener, events));
        Subscription {
            id,
            listener,
            registry: Rc::downgrade(&self.registry),
        }
    }

    pub fn detach(&self, subscription: Subscription) {
        drop(subscription);
    }

    /// Listeners currently subscribed to `event`.
    pub fn listeners_for(&self, event: &str) -> Vec<Listener> {
        let registry = self.registry.borrow();
        let mut listeners = Vec::new();
        for (listener, events) in registry.subscriptions.values() {
            if events.iter().any(|e| *e == event) && !listeners.contains(listener) {
                listeners.push(*listener);
            }
        }
        listeners
    }

    pub fn subscription_count(&self) -> usize {
        self.registry.borrow().subscriptions.len()
    }
}

impl Transport for EventChannel {
    fn emit(&self, event: ClientEvent) {
        if self.outbound.send(event.to_envelope()).is_err() {
            warn!("Connection task is gone; dropping `{}`", event.name());
        }
    }
}

/// Transport that keeps every emitted event in memory. Clones share the log.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    sent: Rc<RefCell<Vec<ClientEvent>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<ClientEvent> {
        self.sent.borrow().clone()
    }

    /// Returns and clears everything recorded so far.
    pub fn take(&self) -> Vec<ClientEvent> {
        std::mem::take(&mut *self.sent.borrow_mut())
    }
}

impl Transport for Recorder {
    fn emit(&self, event: ClientEvent) {
        self.sent.borrow_mut().push(event);
    }
}
