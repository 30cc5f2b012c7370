//! Concrete packet bodies for the handshake, status, and login phases.
//!
//! These are the packets the protocol machine itself participates in: the
//! initial handshake, the status ping used by server-list queries, and the
//! login exchange that drives the encryption and compression upgrades.
//! Ids follow the login/status id-space, which has been stable across
//! protocol versions.

use crate::protocol::packet::{PacketDef, PacketRegistry};
use crate::protocol::{Direction, ProtocolState};

macro_rules! body_boilerplate {
    ($id:expr, $name:expr) => {
        fn packet_id(&self) -> u32 {
            $id
        }
        fn name(&self) -> &'static str {
            $name
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    };
}

pub mod handshaking {
    pub mod serverbound {
        use crate::error::Result;
        use crate::protocol::packet::PacketBody;
        use crate::protocol::wire::{self, WireReader};
        use std::any::Any;

        /// Initial handshake; `next_state` selects Status (1) or Login (2).
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct SetProtocol {
            pub protocol_version: u32,
            pub server_host: String,
            pub server_port: u16,
            pub next_state: u32,
        }

        impl PacketBody for SetProtocol {
            body_boilerplate!(0x00, "SetProtocol");

            fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
                wire::put_varint(out, self.protocol_version);
                wire::put_string(out, &self.server_host);
                wire::put_u16(out, self.server_port);
                wire::put_varint(out, self.next_state);
                Ok(())
            }
        }

        pub(crate) fn decode_set_protocol(
            r: &mut WireReader<'_>,
        ) -> Result<Box<dyn PacketBody>> {
            Ok(Box::new(SetProtocol {
                protocol_version: r.read_varint()?,
                server_host: r.read_string()?,
                server_port: r.read_u16()?,
                next_state: r.read_varint()?,
            }))
        }
    }
}

pub mod status {
    pub mod serverbound {
        use crate::error::Result;
        use crate::protocol::packet::PacketBody;
        use crate::protocol::wire::{self, WireReader};
        use std::any::Any;

        /// Empty status request.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct PingStart;

        impl PacketBody for PingStart {
            body_boilerplate!(0x00, "PingStart");

            fn encode(&self, _out: &mut Vec<u8>) -> Result<()> {
                Ok(())
            }
        }

        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct Ping {
            pub payload: i64,
        }

        impl PacketBody for Ping {
            body_boilerplate!(0x01, "Ping");

            fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
                wire::put_i64(out, self.payload);
                Ok(())
            }
        }

        pub(crate) fn decode_ping_start(
            _r: &mut WireReader<'_>,
        ) -> Result<Box<dyn PacketBody>> {
            Ok(Box::new(PingStart))
        }

        pub(crate) fn decode_ping(r: &mut WireReader<'_>) -> Result<Box<dyn PacketBody>> {
            Ok(Box::new(Ping { payload: r.read_i64()? }))
        }
    }

    pub mod clientbound {
        use crate::error::Result;
        use crate::protocol::packet::PacketBody;
        use crate::protocol::wire::{self, WireReader};
        use std::any::Any;

        /// Status response carrying the server-list JSON blob.
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct ServerInfo {
            pub response: String,
        }

        impl PacketBody for ServerInfo {
            body_boilerplate!(0x00, "ServerInfo");

            fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
                wire::put_string(out, &self.response);
                Ok(())
            }
        }

        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct Pong {
            pub payload: i64,
        }

        impl PacketBody for Pong {
            body_boilerplate!(0x01, "Pong");

            fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
                wire::put_i64(out, self.payload);
                Ok(())
            }
        }

        pub(crate) fn decode_server_info(
            r: &mut WireReader<'_>,
        ) -> Result<Box<dyn PacketBody>> {
            Ok(Box::new(ServerInfo { response: r.read_string()? }))
        }

        pub(crate) fn decode_pong(r: &mut WireReader<'_>) -> Result<Box<dyn PacketBody>> {
            Ok(Box::new(Pong { payload: r.read_i64()? }))
        }
    }
}

pub mod login {
    pub mod serverbound {
        use crate::error::Result;
        use crate::protocol::packet::PacketBody;
        use crate::protocol::wire::{self, WireReader};
        use std::any::Any;

        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct LoginStart {
            pub username: String,
        }

        impl PacketBody for LoginStart {
            body_boilerplate!(0x00, "LoginStart");

            fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
                wire::put_string(out, &self.username);
                Ok(())
            }
        }

        /// Response to the server's encryption request. Both fields are
        /// RSA ciphertexts; this frame itself travels in cleartext.
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct EncryptionBegin {
            pub shared_secret: Vec<u8>,
            pub verify_token: Vec<u8>,
        }

        impl PacketBody for EncryptionBegin {
            body_boilerplate!(0x01, "EncryptionBegin");

            fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
                wire::put_byte_array(out, &self.shared_secret);
                wire::put_byte_array(out, &self.verify_token);
                Ok(())
            }
        }

        pub(crate) fn decode_login_start(
            r: &mut WireReader<'_>,
        ) -> Result<Box<dyn PacketBody>> {
            Ok(Box::new(LoginStart { username: r.read_string()? }))
        }

        pub(crate) fn decode_encryption_begin(
            r: &mut WireReader<'_>,
        ) -> Result<Box<dyn PacketBody>> {
            Ok(Box::new(EncryptionBegin {
                shared_secret: r.read_byte_array()?,
                verify_token: r.read_byte_array()?,
            }))
        }
    }

    pub mod clientbound {
        use crate::error::Result;
        use crate::protocol::packet::PacketBody;
        use crate::protocol::wire::{self, WireReader};
        use std::any::Any;

        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct Disconnect {
            pub reason: String,
        }

        impl PacketBody for Disconnect {
            body_boilerplate!(0x00, "Disconnect");

            fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
                wire::put_string(out, &self.reason);
                Ok(())
            }
        }

        /// The server's encryption request: its DER public key and a
        /// one-shot verify token.
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct EncryptionBegin {
            pub server_id: String,
            pub public_key: Vec<u8>,
            pub verify_token: Vec<u8>,
        }

        impl PacketBody for EncryptionBegin {
            body_boilerplate!(0x01, "EncryptionBegin");

            fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
                wire::put_string(out, &self.server_id);
                wire::put_byte_array(out, &self.public_key);
                wire::put_byte_array(out, &self.verify_token);
                Ok(())
            }
        }

        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct Success {
            pub uuid: String,
            pub username: String,
        }

        impl PacketBody for Success {
            body_boilerplate!(0x02, "Success");

            fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
                wire::put_string(out, &self.uuid);
                wire::put_string(out, &self.username);
                Ok(())
            }
        }

        /// Compression announcement; framing switches format after this.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct Compress {
            pub threshold: u32,
        }

        impl PacketBody for Compress {
            body_boilerplate!(0x03, "Compress");

            fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
                wire::put_varint(out, self.threshold);
                Ok(())
            }
        }

        pub(crate) fn decode_disconnect(
            r: &mut WireReader<'_>,
        ) -> Result<Box<dyn PacketBody>> {
            Ok(Box::new(Disconnect { reason: r.read_string()? }))
        }

        pub(crate) fn decode_encryption_begin(
            r: &mut WireReader<'_>,
        ) -> Result<Box<dyn PacketBody>> {
            Ok(Box::new(EncryptionBegin {
                server_id: r.read_string()?,
                public_key: r.read_byte_array()?,
                verify_token: r.read_byte_array()?,
            }))
        }

        pub(crate) fn decode_success(r: &mut WireReader<'_>) -> Result<Box<dyn PacketBody>> {
            Ok(Box::new(Success {
                uuid: r.read_string()?,
                username: r.read_string()?,
            }))
        }

        pub(crate) fn decode_compress(r: &mut WireReader<'_>) -> Result<Box<dyn PacketBody>> {
            Ok(Box::new(Compress { threshold: r.read_varint()? }))
        }
    }
}

/// Install the handshake/status/login rows into `registry`.
pub fn register_standard(registry: &mut PacketRegistry) {
    use Direction::{Clientbound, Serverbound};
    use ProtocolState::{Handshaking, Login, Status};

    let rows: &[PacketDef] = &[
        PacketDef {
            state: Handshaking,
            direction: Serverbound,
            id: 0x00,
            name: "SetProtocol",
            decode: handshaking::serverbound::decode_set_protocol,
        },
        PacketDef {
            state: Status,
            direction: Serverbound,
            id: 0x00,
            name: "PingStart",
            decode: status::serverbound::decode_ping_start,
        },
        PacketDef {
            state: Status,
            direction: Serverbound,
            id: 0x01,
            name: "Ping",
            decode: status::serverbound::decode_ping,
        },
        PacketDef {
            state: Status,
            direction: Clientbound,
            id: 0x00,
            name: "ServerInfo",
            decode: status::clientbound::decode_server_info,
        },
        PacketDef {
            state: Status,
            direction: Clientbound,
            id: 0x01,
            name: "Pong",
            decode: status::clientbound::decode_pong,
        },
        PacketDef {
            state: Login,
            direction: Serverbound,
            id: 0x00,
            name: "LoginStart",
            decode: login::serverbound::decode_login_start,
        },
        PacketDef {
            state: Login,
            direction: Serverbound,
            id: 0x01,
            name: "EncryptionBegin",
            decode: login::serverbound::decode_encryption_begin,
        },
        PacketDef {
            state: Login,
            direction: Clientbound,
            id: 0x00,
            name: "Disconnect",
            decode: login::clientbound::decode_disconnect,
        },
        PacketDef {
            state: Login,
            direction: Clientbound,
            id: 0x01,
            name: "EncryptionBegin",
            decode: login::clientbound::decode_encryption_begin,
        },
        PacketDef {
            state: Login,
            direction: Clientbound,
            id: 0x02,
            name: "Success",
            decode: login::clientbound::decode_success,
        },
        PacketDef {
            state: Login,
            direction: Clientbound,
            id: 0x03,
            name: "Compress",
            decode: login::clientbound::decode_compress,
        },
    ];

    for def in rows {
        registry.register(def.clone());
    }
}
