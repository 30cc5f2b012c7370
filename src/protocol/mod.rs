//! # Protocol Types
//!
//! The protocol state machine, packet descriptor seam, and the byte-level
//! field primitives packet bodies are built from.
//!
//! ## Components
//! - **State / Direction**: the four-phase protocol machine and the two
//!   transfer directions that key the codec table
//! - **Packet**: the [`PacketBody`] trait and the [`PacketRegistry`]
//!   mapping `(state, direction, id)` to decoders and stable names
//! - **Wire**: varint-prefixed strings and byte arrays, big-endian
//!   integers, with bounds checks
//! - **Packets**: the concrete handshake, status, and login bodies the
//!   engine itself needs; play-state bodies are registered by downstream
//!   users

pub mod packet;
pub mod packets;
pub mod wire;

pub use packet::{PacketBody, PacketDef, PacketRegistry};

use std::fmt;

/// Protocol phase selecting which id-space and codec table row applies.
///
/// External packet handlers drive transitions (e.g. login success moves to
/// `Play`); the framer only reads the current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolState {
    Handshaking,
    Status,
    Login,
    Play,
}

impl fmt::Display for ProtocolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProtocolState::Handshaking => "Handshaking",
            ProtocolState::Status => "Status",
            ProtocolState::Login => "Login",
            ProtocolState::Play => "Play",
        })
    }
}

/// Transfer direction, fixed per packet emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Serverbound,
    Clientbound,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Serverbound => "Serverbound",
            Direction::Clientbound => "Clientbound",
        })
    }
}
