//! In-process named-event bus.
//!
//! Decoupled publish/subscribe between the engine and its surrounding
//! subsystems. Events are registered by name and emitted by id; callbacks
//! are registered by name and receive a tagged payload they can downcast
//! to the concrete packet type. The bus is single-threaded and re-entrant:
//! a callback may emit, send, or register further callbacks. Emission
//! snapshots the callback list, so mutations during a callback affect only
//! later emissions.

use crate::protocol::PacketBody;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub type EventId = usize;

/// Endpoint details attached to the `io_connect` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectData {
    pub address: String,
    pub port: u16,
}

/// Payload attached to an emission.
///
/// The textual tag plus downcast helper preserves the payload+tag contract
/// at the bus boundary while keeping the interior typed.
#[derive(Clone, Copy)]
pub enum EventPayload<'a> {
    None,
    Connect(&'a ConnectData),
    Packet(&'a dyn PacketBody),
}

impl<'a> EventPayload<'a> {
    /// Typed view of a packet payload.
    pub fn downcast<T: PacketBody>(&self) -> Option<&'a T> {
        match *self {
            EventPayload::Packet(packet) => packet.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }

    pub fn connect_data(&self) -> Option<&'a ConnectData> {
        match *self {
            EventPayload::Connect(data) => Some(data),
            _ => None,
        }
    }

    /// Textual discriminator for subscribers that switch on payload kind.
    pub fn type_tag(&self) -> &str {
        match self {
            EventPayload::None => "",
            EventPayload::Connect(_) => "ConnectData",
            EventPayload::Packet(packet) => packet.name(),
        }
    }
}

type Callback = Rc<dyn Fn(EventId, &EventPayload<'_>)>;

#[derive(Default)]
struct Inner {
    ids: HashMap<String, EventId>,
    names: Vec<String>,
    callbacks: Vec<Vec<Callback>>,
}

/// Single-threaded event dispatcher.
#[derive(Default)]
pub struct EventBus {
    inner: RefCell<Inner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an event name, returning its id. Idempotent: registering
    /// an existing name returns the id already assigned.
    pub fn register_event(&self, name: &str) -> EventId {
        let mut inner = self.inner.borrow_mut();
        if let Some(&id) = inner.ids.get(name) {
            return id;
        }
        let id = inner.names.len();
        inner.ids.insert(name.to_owned(), id);
        inner.names.push(name.to_owned());
        inner.callbacks.push(Vec::new());
        id
    }

    /// Subscribe to an event by name, creating the event if necessary.
    pub fn register_callback<F>(&self, name: &str, callback: F) -> EventId
    where
        F: Fn(EventId, &EventPayload<'_>) + 'static,
    {
        let id = self.register_event(name);
        self.inner.borrow_mut().callbacks[id].push(Rc::new(callback));
        id
    }

    /// Look up an event id by name.
    pub fn lookup(&self, name: &str) -> Option<EventId> {
        self.inner.borrow().ids.get(name).copied()
    }

    /// Name assigned to `id`, for logging.
    pub fn event_name(&self, id: EventId) -> Option<String> {
        self.inner.borrow().names.get(id).cloned()
    }

    /// Invoke every callback subscribed to `id` with `payload`.
    pub fn emit(&self, id: EventId, payload: &EventPayload<'_>) {
        // Snapshot under the borrow, call outside it: callbacks may
        // re-enter the bus.
        let snapshot: Vec<Callback> = match self.inner.borrow().callbacks.get(id) {
            Some(list) => list.clone(),
            None => return,
        };
        for callback in snapshot {
            callback(id, payload);
        }
    }
}
