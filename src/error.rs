//! # Error Types
//!
//! Error handling for the packet engine.
//!
//! This module defines all error variants that can occur while driving a
//! connection, from low-level I/O failures to protocol violations found
//! while parsing frames.
//!
//! ## Error Categories
//! - **I/O Errors**: socket failures, unexpected end of stream
//! - **Framing Errors**: malformed varints, oversized frames, length
//!   mismatches after inflation
//! - **Codec Errors**: unknown packet ids, body decode/encode failures
//! - **Cryptographic Errors**: bad server public keys, RSA failures
//! - **Configuration Errors**: invalid engine configuration
//!
//! Every engine failure is terminal: the Minecraft stream is stateful and
//! cannot be re-synchronised without a disconnect, so there is no
//! per-packet recovery path (see [`crate::service::client`]).

use crate::protocol::{Direction, ProtocolState};
use std::io;
use thiserror::Error;

/// Primary error type for all engine operations.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Connection closed by peer")]
    ConnectionClosed,

    #[error("Engine is not connected")]
    NotConnected,

    #[error("Malformed varint (continuation past 5 bytes)")]
    MalformedVarint,

    #[error("Truncated varint")]
    TruncatedVarint,

    #[error("Frame length {0} exceeds configured maximum")]
    OversizedFrame(usize),

    #[error("Unknown packet id {id:#04x} for {state}/{direction}")]
    UnknownPacket {
        state: ProtocolState,
        direction: Direction,
        id: u32,
    },

    #[error("Packet decode failed: {0}")]
    Decode(String),

    #[error("Packet encode failed: {0}")]
    Encode(String),

    #[error("Compression failed")]
    CompressionFailure,

    #[error("Decompression failed")]
    DecompressionFailure,

    #[error("Inflated length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Invalid server public key")]
    InvalidPublicKey,

    #[error("Encryption failed")]
    EncryptionFailure,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Operation timed out")]
    Timeout,
}

/// Type alias for Results using [`ProtocolError`].
pub type Result<T> = std::result::Result<T, ProtocolError>;
