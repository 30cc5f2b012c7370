//! Packet descriptor trait and the codec table.
//!
//! The engine treats packet bodies as opaque: it routes by
//! `(state, direction, id)` and moves bytes. [`PacketBody`] is the seam a
//! body implements; [`PacketRegistry`] is the table the framer and the
//! event adapter consult. The engine ships the handshake/status/login rows
//! it needs itself ([`PacketRegistry::standard`]); everything else is
//! registered by the embedding application.

use crate::error::{ProtocolError, Result};
use crate::protocol::wire::WireReader;
use crate::protocol::{Direction, ProtocolState};
use std::any::Any;
use std::collections::HashMap;

/// A decodable/encodable packet body with a stable name.
pub trait PacketBody: Any + std::fmt::Debug {
    /// Packet id within the `(state, direction)` id-space.
    fn packet_id(&self) -> u32;

    /// Stable name, used in event naming and logging.
    fn name(&self) -> &'static str;

    /// Append the body fields (not the id) to `out`.
    fn encode(&self, out: &mut Vec<u8>) -> Result<()>;

    /// Typed-view escape hatch for subscribers.
    fn as_any(&self) -> &dyn Any;
}

/// Signature of a body decoder stored in the table.
pub type DecodeFn = fn(&mut WireReader<'_>) -> Result<Box<dyn PacketBody>>;

/// One row of the codec table.
#[derive(Clone)]
pub struct PacketDef {
    pub state: ProtocolState,
    pub direction: Direction,
    pub id: u32,
    pub name: &'static str,
    pub decode: DecodeFn,
}

impl PacketDef {
    /// Event name for this row: `<StateName>/<Direction>/<PacketName>`.
    pub fn event_name(&self) -> String {
        format!("{}/{}/{}", self.state, self.direction, self.name)
    }
}

/// Codec table keyed by `(state, direction, id)`.
#[derive(Default)]
pub struct PacketRegistry {
    defs: Vec<PacketDef>,
    index: HashMap<(ProtocolState, Direction, u32), usize>,
}

impl PacketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a row, replacing any previous row with the same key.
    pub fn register(&mut self, def: PacketDef) {
        let key = (def.state, def.direction, def.id);
        if let Some(&slot) = self.index.get(&key) {
            self.defs[slot] = def;
        } else {
            self.index.insert(key, self.defs.len());
            self.defs.push(def);
        }
    }

    pub fn lookup(&self, state: ProtocolState, direction: Direction, id: u32) -> Option<&PacketDef> {
        self.index.get(&(state, direction, id)).map(|&i| &self.defs[i])
    }

    /// All registered rows, in registration order.
    pub fn defs(&self) -> &[PacketDef] {
        &self.defs
    }

    /// Decode a body through the table row for `(state, direction, id)`.
    ///
    /// # Errors
    /// [`ProtocolError::UnknownPacket`] for an unregistered key, or the
    /// row's own decode failure.
    pub fn decode(
        &self,
        state: ProtocolState,
        direction: Direction,
        id: u32,
        reader: &mut WireReader<'_>,
    ) -> Result<Box<dyn PacketBody>> {
        let def = self
            .lookup(state, direction, id)
            .ok_or(ProtocolError::UnknownPacket { state, direction, id })?;
        (def.decode)(reader)
    }

    /// The rows the engine itself depends on: handshaking, status, and the
    /// login exchange (encryption begin, compression, success).
    pub fn standard() -> Self {
        let mut registry = Self::new();
        crate::protocol::packets::register_standard(&mut registry);
        registry
    }
}
