//! Event channel contract and listener bookkeeping.
//!
//! The synchronization core never talks to a socket directly. It consumes an
//! [`EventChannel`]: a persistent bidirectional message stream that delivers
//! named events to registered listeners, accepts named outbound commands, and
//! exposes a connected/disconnected signal. The concrete transport behind the
//! trait (UDP adapter, in-memory test double) is interchangeable.
//!
//! Listener registration follows a scoped-acquisition discipline: callers
//! hold a [`Subscription`] guard and deregistration happens on drop, on every
//! exit path. A leaked registration would fire against a torn-down view.

use shared::{Event, Request};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

pub type ListenerId = u64;

/// Callback invoked synchronously at message-delivery time with the raw
/// event payload. Must return promptly; it runs inside the delivery loop.
pub type Listener = Box<dyn FnMut(&str)>;

/// Contract the core requires from the transport.
///
/// Delivery is in-order and at-most-once per event stream; no ordering is
/// guaranteed between distinct streams. `send` is fire-and-forget and must
/// not block.
pub trait EventChannel {
    fn subscribe(&self, event: Event, listener: Listener) -> ListenerId;
    fn unsubscribe(&self, event: Event, id: ListenerId);
    fn send(&self, request: Request, payload: Option<&str>);
    fn connected(&self) -> bool;
}

/// RAII guard for one listener registration. Dropping it deregisters the
/// listener from the channel.
pub struct Subscription {
    channel: Rc<dyn EventChannel>,
    event: Event,
    id: ListenerId,
}

impl Subscription {
    pub fn new(channel: Rc<dyn EventChannel>, event: Event, listener: Listener) -> Self {
        let id = channel.subscribe(event, listener);
        Self { channel, event, id }
    }

    pub fn event(&self) -> Event {
        self.event
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.channel.unsubscribe(self.event, self.id);
    }
}

/// Listener registry shared by channel implementations.
///
/// Single-threaded by design: listeners run synchronously inside
/// [`Dispatcher::dispatch`]. Subscribing or unsubscribing from within a
/// running listener is tolerated; removals requested mid-dispatch take
/// effect before the listener would fire again.
#[derive(Default)]
pub struct Dispatcher {
    listeners: RefCell<HashMap<Event, Vec<(ListenerId, Listener)>>>,
    // Removals requested while the owning event's listener list is detached
    // for a dispatch pass.
    deferred_removals: RefCell<Vec<(Event, ListenerId)>>,
    dispatch_depth: Cell<u32>,
    next_id: Cell<ListenerId>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, event: Event, listener: Listener) -> ListenerId {
        let id = self.next_id.get().wrapping_add(1);
        self.next_id.set(id);
        self.listeners
            .borrow_mut()
            .entry(event)
            .or_default()
            .push((id, listener));
        id
    }

    pub fn remove(&self, event: Event, id: ListenerId) {
        {
            let mut listeners = self.listeners.borrow_mut();
            if let Some(entries) = listeners.get_mut(&event) {
                if let Some(pos) = entries.iter().position(|(entry_id, _)| *entry_id == id) {
                    entries.remove(pos);
                    return;
                }
            }
        }

        // The listener list for this event may be detached mid-dispatch.
        if self.dispatch_depth.get() > 0 {
            self.deferred_removals.borrow_mut().push((event, id));
        }
    }

    pub fn listener_count(&self, event: Event) -> usize {
        self.listeners
            .borrow()
            .get(&event)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Delivers `payload` to every listener registered for `event`, in
    /// registration order.
    pub fn dispatch(&self, event: Event, payload: &str) {
        let mut entries = match self.listeners.borrow_mut().remove(&event) {
            Some(entries) => entries,
            None => return,
        };

        self.dispatch_depth.set(self.dispatch_depth.get() + 1);
        for (id, listener) in entries.iter_mut() {
            let removed = self
                .deferred_removals
                .borrow()
                .iter()
                .any(|(ev, removed_id)| *ev == event && *removed_id == *id);
            if !removed {
                listener(payload);
            }
        }
        self.dispatch_depth.set(self.dispatch_depth.get() - 1);

        // Reattach, merging listeners added during the pass and applying
        // removals deferred against the detached list.
        let mut listeners = self.listeners.borrow_mut();
        if let Some(added) = listeners.remove(&event) {
            entries.extend(added);
        }

        if self.dispatch_depth.get() == 0 {
            let deferred = std::mem::take(&mut *self.deferred_removals.borrow_mut());
            for (ev, id) in deferred {
                if ev == event {
                    entries.retain(|(entry_id, _)| *entry_id != id);
                } else if let Some(other) = listeners.get_mut(&ev) {
                    other.retain(|(entry_id, _)| *entry_id != id);
                }
            }
        }

        if !entries.is_empty() {
            listeners.insert(event, entries);
        }
    }
}
