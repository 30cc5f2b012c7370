//! # mc-protocol-client
//!
//! Client-side I/O engine for the Minecraft protocol: a varint-framed,
//! optionally zlib-compressed, optionally AES-CFB8 encrypted packet
//! transport over TCP, coupled to an in-process event bus that dispatches
//! decoded packets to subscribers and accepts packets from them for
//! transmission.
//!
//! ## Architecture
//! - [`core`]: varint codec, frame buffers, and the framer
//! - [`protocol`]: the state machine, packet descriptor seam, and the
//!   handshake/status/login bodies the engine itself needs
//! - [`utils`]: AES-CFB8 + RSA crypto, zlib compression, logging
//! - [`event`]: the named-event bus
//! - [`service`]: the client engine and its cooperative I/O loop
//!
//! ## Example
//! ```no_run
//! use mc_protocol_client::config::EngineConfig;
//! use mc_protocol_client::event::EventBus;
//! use mc_protocol_client::protocol::packets::handshaking;
//! use mc_protocol_client::protocol::{PacketRegistry, ProtocolState};
//! use mc_protocol_client::service::ClientEngine;
//! use std::rc::Rc;
//!
//! # async fn example() -> mc_protocol_client::Result<()> {
//! let bus = Rc::new(EventBus::new());
//! let mut engine = ClientEngine::new(
//!     EngineConfig::default(),
//!     PacketRegistry::standard(),
//!     bus.clone(),
//! );
//!
//! bus.register_callback("Status/Clientbound/Pong", |_, payload| {
//!     println!("pong: {}", payload.type_tag());
//! });
//!
//! engine.connect("mc.example.org", 25565).await?;
//! engine.send(&handshaking::serverbound::SetProtocol {
//!     protocol_version: 47,
//!     server_host: "mc.example.org".into(),
//!     server_port: 25565,
//!     next_state: 1,
//! })?;
//! engine.set_state(ProtocolState::Status);
//! engine.run().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency model
//! Single-threaded cooperative: one task on a current-thread runtime runs
//! all reads, writes, codecs, and subscriber callbacks. Types are `!Send`
//! by design (`Rc`/`RefCell`); drive the engine from a
//! [`tokio::task::LocalSet`] or a current-thread runtime.

pub mod config;
pub mod core;
pub mod error;
pub mod event;
pub mod protocol;
pub mod service;
pub mod utils;

pub use error::{ProtocolError, Result};
pub use event::{ConnectData, EventBus, EventId, EventPayload};
pub use protocol::{Direction, PacketBody, PacketRegistry, ProtocolState};
pub use service::{ClientEngine, EngineHandle};
