//! # Client Engine
//!
//! The I/O driver and the public engine surface: `connect`, `send`,
//! `set_state`, `run`, `shutdown`.
//!
//! One cooperative task drives the socket. Each loop iteration polls the
//! kill flag, asks for readiness (write interest only while the outbound
//! buffer is non-empty), feeds fresh bytes to the framer, and emits every
//! decoded packet in wire order. Compression, encryption, and event
//! emission all run to completion between suspension points, so
//! subscribers observe a consistent snapshot of protocol state; the one
//! re-entrant operation a subscriber may perform is `send`, which appends
//! to the outbound buffer without flushing.
//!
//! All engine state a callback can touch lives in a single-threaded
//! `Rc<RefCell<_>>` cell shared between the driver and the
//! [`EngineHandle`] clones captured by bus callbacks; the cell is never
//! borrowed across an await or across an emit. Terminal failures emit the
//! `kill` event exactly once, then propagate out of [`ClientEngine::run`]
//! so the embedding application decides what happens next.

use crate::config::EngineConfig;
use crate::core::codec::{Frame, Framer};
use crate::error::{ProtocolError, Result};
use crate::event::{ConnectData, EventBus, EventId, EventPayload};
use crate::protocol::packets::login;
use crate::protocol::wire::WireReader;
use crate::protocol::{Direction, PacketBody, PacketRegistry, ProtocolState};
use crate::utils::crypto::{self, SHARED_SECRET_LEN};
use std::cell::RefCell;
use std::collections::HashMap;
use std::io;
use std::rc::Rc;
use tokio::io::Interest;
use tokio::net::TcpStream;
use tokio::sync::Notify;
use tracing::{debug, error, info, trace};
use zeroize::Zeroizing;

const CONNECT_EVENT: &str = "io_connect";
const KILL_EVENT: &str = "kill";

const CLIENTBOUND_ENCRYPTION_BEGIN: &str = "Login/Clientbound/EncryptionBegin";
const SERVERBOUND_ENCRYPTION_BEGIN: &str = "Login/Serverbound/EncryptionBegin";
const CLIENTBOUND_COMPRESS: &str = "Login/Clientbound/Compress";

/// Mutable connection state shared between the driver and bus callbacks.
struct Conn {
    framer: Framer,
    shared_secret: Option<Zeroizing<[u8; SHARED_SECRET_LEN]>>,
    kill: bool,
    fatal: Option<ProtocolError>,
}

/// Event ids registered at construction: one per codec-table row plus the
/// two lifecycle events.
struct EventTable {
    packets: HashMap<(ProtocolState, Direction, u32), EventId>,
    connect: EventId,
    kill: EventId,
}

/// Cheap clone handed to bus callbacks and embedding code; the Rust
/// rendition of the engine back-reference.
#[derive(Clone)]
pub struct EngineHandle {
    conn: Rc<RefCell<Conn>>,
    bus: Rc<EventBus>,
    registry: Rc<PacketRegistry>,
    events: Rc<EventTable>,
    wake: Rc<Notify>,
}

impl EngineHandle {
    /// Frame a packet into the outbound buffer and emit its serverbound
    /// event. The flush happens on a later driver iteration.
    ///
    /// # Errors
    /// [`ProtocolError::UnknownPacket`] if the codec table has no row for
    /// the packet in the current state, or any encode failure.
    pub fn send(&self, packet: &dyn PacketBody) -> Result<()> {
        let state = self.conn.borrow().framer.state();
        let event = *self
            .events
            .packets
            .get(&(state, Direction::Serverbound, packet.packet_id()))
            .ok_or(ProtocolError::UnknownPacket {
                state,
                direction: Direction::Serverbound,
                id: packet.packet_id(),
            })?;

        self.conn.borrow_mut().framer.encode_packet(packet)?;
        self.wake.notify_one();
        trace!(packet = packet.name(), %state, "queued serverbound packet");
        self.bus.emit(event, &EventPayload::Packet(packet));
        Ok(())
    }

    /// Change the protocol phase; called by external packet handlers
    /// (e.g. on login success).
    pub fn set_state(&self, state: ProtocolState) {
        debug!(%state, "protocol state change");
        self.conn.borrow_mut().framer.set_state(state);
    }

    pub fn state(&self) -> ProtocolState {
        self.conn.borrow().framer.state()
    }

    /// Request a clean stop; the driver exits after draining the current
    /// iteration.
    pub fn shutdown(&self) {
        self.conn.borrow_mut().kill = true;
        self.wake.notify_one();
    }

    fn killed(&self) -> bool {
        self.conn.borrow().kill
    }

    /// Record a terminal failure raised inside a bus callback.
    fn fail(&self, err: ProtocolError) {
        error!(error = %err, "terminal engine failure");
        let mut conn = self.conn.borrow_mut();
        if conn.fatal.is_none() {
            conn.fatal = Some(err);
        }
        conn.kill = true;
        drop(conn);
        self.wake.notify_one();
    }

    /// Handle the server's encryption request: generate the shared secret,
    /// RSA-seal it together with the verify token, and queue the response.
    ///
    /// The response is framed in cleartext; the serverbound emission that
    /// `send` performs afterwards is what flips the cipher on, so every
    /// byte after this frame is encrypted.
    fn respond_encryption_request(
        &self,
        request: &login::clientbound::EncryptionBegin,
    ) -> Result<()> {
        let secret = crypto::generate_shared_secret();
        let (shared_secret, verify_token) =
            crypto::seal_handshake(&request.public_key, &secret, &request.verify_token)?;
        self.conn.borrow_mut().shared_secret = Some(secret);
        self.send(&login::serverbound::EncryptionBegin {
            shared_secret,
            verify_token,
        })
    }

    fn activate_encryption(&self) -> Result<()> {
        let mut conn = self.conn.borrow_mut();
        let secret = conn
            .shared_secret
            .take()
            .ok_or(ProtocolError::EncryptionFailure)?;
        conn.framer.enable_encryption(&secret);
        drop(conn);
        info!("stream encryption enabled");
        Ok(())
    }

    fn activate_compression(&self, threshold: u32) {
        self.conn.borrow_mut().framer.enable_compression(threshold);
        info!(threshold, "stream compression enabled");
    }
}

/// Client-side packet engine over one TCP connection.
pub struct ClientEngine {
    handle: EngineHandle,
    config: EngineConfig,
    socket: Option<TcpStream>,
}

impl ClientEngine {
    /// Build an engine over `registry`, registering one event per codec
    /// table row (named `<State>/<Direction>/<PacketName>`), the
    /// `io_connect` and `kill` lifecycle events, and the three control
    /// callbacks that drive the encryption and compression upgrades.
    pub fn new(config: EngineConfig, registry: PacketRegistry, bus: Rc<EventBus>) -> Self {
        let mut packets = HashMap::new();
        for def in registry.defs() {
            let id = bus.register_event(&def.event_name());
            packets.insert((def.state, def.direction, def.id), id);
        }
        let events = Rc::new(EventTable {
            packets,
            connect: bus.register_event(CONNECT_EVENT),
            kill: bus.register_event(KILL_EVENT),
        });

        let conn = Rc::new(RefCell::new(Conn {
            framer: new_framer(&config),
            shared_secret: None,
            kill: false,
            fatal: None,
        }));

        let handle = EngineHandle {
            conn,
            bus,
            registry: Rc::new(registry),
            events,
            wake: Rc::new(Notify::new()),
        };
        install_control_callbacks(&handle);

        Self {
            handle,
            config,
            socket: None,
        }
    }

    /// Handle for bus callbacks and other subsystems.
    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    pub fn send(&self, packet: &dyn PacketBody) -> Result<()> {
        self.handle.send(packet)
    }

    pub fn set_state(&self, state: ProtocolState) {
        self.handle.set_state(state);
    }

    pub fn shutdown(&self) {
        self.handle.shutdown();
    }

    /// Open the TCP connection and emit `io_connect`. Framing, crypto, and
    /// compression state are reset for the fresh stream.
    pub async fn connect(&mut self, host: &str, port: u16) -> Result<()> {
        let stream = tokio::time::timeout(
            self.config.connection_timeout,
            TcpStream::connect((host, port)),
        )
        .await
        .map_err(|_| ProtocolError::Timeout)??;
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?;

        {
            let mut conn = self.handle.conn.borrow_mut();
            conn.framer = new_framer(&self.config);
            conn.shared_secret = None;
            conn.kill = false;
            conn.fatal = None;
        }
        self.socket = Some(stream);

        info!(address = %peer, "connected");
        let data = ConnectData {
            address: peer.ip().to_string(),
            port: peer.port(),
        };
        self.handle
            .bus
            .emit(self.handle.events.connect, &EventPayload::Connect(&data));
        Ok(())
    }

    /// Drive the connection until `shutdown` or a terminal failure.
    ///
    /// Emits the `kill` event exactly once on the way out; a terminal
    /// failure is also returned so the embedding application can decide
    /// what happens next.
    pub async fn run(&mut self) -> Result<()> {
        let socket = self.socket.take().ok_or(ProtocolError::NotConnected)?;
        let outcome = self.drive(&socket).await;

        // A callback may have recorded the root cause before flagging kill.
        let fatal = self.handle.conn.borrow_mut().fatal.take();
        let outcome = match (outcome, fatal) {
            (Err(err), _) => Err(err),
            (Ok(()), Some(err)) => Err(err),
            (Ok(()), None) => Ok(()),
        };

        self.handle
            .bus
            .emit(self.handle.events.kill, &EventPayload::None);

        match outcome {
            Ok(()) => {
                info!("engine stopped");
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "engine terminated");
                Err(err)
            }
        }
    }

    async fn drive(&self, socket: &TcpStream) -> Result<()> {
        loop {
            if self.handle.killed() {
                return Ok(());
            }

            let want_write = self.handle.conn.borrow().framer.has_outbound();
            let interest = if want_write {
                Interest::READABLE | Interest::WRITABLE
            } else {
                Interest::READABLE
            };

            let ready = tokio::select! {
                _ = self.handle.wake.notified() => continue,
                ready = socket.ready(interest) => ready?,
            };

            if ready.is_readable() {
                self.read_some(socket)?;
            }
            if ready.is_writable() {
                self.write_some(socket)?;
            }
        }
    }

    /// One short read into the framer's prepared tail, then drain every
    /// frame the new bytes completed.
    fn read_some(&self, socket: &TcpStream) -> Result<()> {
        let frames = {
            let mut conn = self.handle.conn.borrow_mut();
            let hint = conn.framer.read_hint();
            let region = conn.framer.prepare_inbound(hint);
            let n = match socket.try_read(region) {
                Ok(0) => return Err(ProtocolError::ConnectionClosed),
                Ok(n) => n,
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) => return Err(e.into()),
            };
            conn.framer.commit_inbound(n);

            let mut frames = Vec::new();
            while let Some(frame) = conn.framer.next_frame()? {
                frames.push(frame);
            }
            frames
        };

        // Emission happens outside the borrow: callbacks re-enter through
        // the handle. State is re-read per frame because a handler may
        // transition it between frames.
        for frame in frames {
            self.dispatch_frame(frame)?;
        }
        Ok(())
    }

    fn dispatch_frame(&self, frame: Frame) -> Result<()> {
        let state = self.handle.conn.borrow().framer.state();
        let mut reader = WireReader::new(&frame.body);
        let packet =
            self.handle
                .registry
                .decode(state, Direction::Clientbound, frame.id, &mut reader)?;
        if reader.remaining() > 0 {
            debug!(
                packet = packet.name(),
                leftover = reader.remaining(),
                "trailing bytes after body decode"
            );
        }

        let event = self
            .handle
            .events
            .packets
            .get(&(state, Direction::Clientbound, frame.id))
            .copied()
            .ok_or(ProtocolError::UnknownPacket {
                state,
                direction: Direction::Clientbound,
                id: frame.id,
            })?;
        trace!(packet = packet.name(), %state, "clientbound packet");
        self.handle.bus.emit(event, &EventPayload::Packet(&*packet));
        Ok(())
    }

    fn write_some(&self, socket: &TcpStream) -> Result<()> {
        let mut conn = self.handle.conn.borrow_mut();
        if !conn.framer.has_outbound() {
            return Ok(());
        }
        match socket.try_write(conn.framer.outbound_data()) {
            Ok(n) => {
                conn.framer.consume_outbound(n);
                trace!(bytes = n, "flushed outbound bytes");
                Ok(())
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn new_framer(config: &EngineConfig) -> Framer {
    Framer::new(
        config.max_frame_length,
        config.compression_level,
        config.max_inflated_length,
    )
}

/// The three protocol-control subscriptions: respond to the server's
/// encryption request, flip the cipher on after our own response is
/// framed, and adopt the announced compression threshold.
fn install_control_callbacks(handle: &EngineHandle) {
    let bus = handle.bus.clone();

    {
        let h = handle.clone();
        bus.register_callback(CLIENTBOUND_ENCRYPTION_BEGIN, move |_, payload| {
            let Some(request) = payload.downcast::<login::clientbound::EncryptionBegin>() else {
                return;
            };
            if let Err(err) = h.respond_encryption_request(request) {
                h.fail(err);
            }
        });
    }
    {
        let h = handle.clone();
        bus.register_callback(SERVERBOUND_ENCRYPTION_BEGIN, move |_, _| {
            if let Err(err) = h.activate_encryption() {
                h.fail(err);
            }
        });
    }
    {
        let h = handle.clone();
        bus.register_callback(CLIENTBOUND_COMPRESS, move |_, payload| {
            let Some(packet) = payload.downcast::<login::clientbound::Compress>() else {
                return;
            };
            h.activate_compression(packet.threshold);
        });
    }
}
