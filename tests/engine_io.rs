//! End-to-end engine tests over a localhost TCP pair.
//!
//! The "server" side speaks raw bytes built with local helpers, so frame
//! layouts are asserted byte-for-byte against an independent encoding.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use mc_protocol_client::config::EngineConfig;
use mc_protocol_client::event::EventBus;
use mc_protocol_client::protocol::packets::{handshaking, status};
use mc_protocol_client::protocol::{PacketRegistry, ProtocolState};
use mc_protocol_client::service::ClientEngine;
use mc_protocol_client::ProtocolError;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::LocalSet;

const PING_PAYLOAD: i64 = 0x0123_4567_89ab_cdef;
const STATUS_JSON: &str = r#"{"version":{"name":"1.8.9","protocol":47}}"#;

// ---- raw wire helpers (independent of the crate's framing code) --------

fn varint(mut value: u32) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return out;
        }
        out.push(byte | 0x80);
    }
}

fn wire_string(s: &str) -> Vec<u8> {
    let mut out = varint(s.len() as u32);
    out.extend_from_slice(s.as_bytes());
    out
}

/// Length-prefix a packet body (uncompressed format).
fn frame(body: &[u8]) -> Vec<u8> {
    let mut out = varint(body.len() as u32);
    out.extend_from_slice(body);
    out
}

/// Read one uncompressed frame, returning its body.
async fn read_frame_body(stream: &mut TcpStream) -> Vec<u8> {
    let mut len: u32 = 0;
    for shift in 0.. {
        let byte = stream.read_u8().await.unwrap();
        len |= u32::from(byte & 0x7f) << (7 * shift);
        if byte & 0x80 == 0 {
            break;
        }
    }
    let mut body = vec![0u8; len as usize];
    stream.read_exact(&mut body).await.unwrap();
    body
}

fn new_engine() -> (ClientEngine, Rc<EventBus>) {
    let bus = Rc::new(EventBus::new());
    let engine = ClientEngine::new(
        EngineConfig::default(),
        PacketRegistry::standard(),
        bus.clone(),
    );
    (engine, bus)
}

#[tokio::test]
async fn handshake_and_status_ping_plain() {
    let local = LocalSet::new();
    let test = local.run_until(async {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();

            // Expected handshake frame, byte for byte.
            let mut expected = vec![0x00, 0x2f];
            expected.extend_from_slice(&wire_string("127.0.0.1"));
            expected.extend_from_slice(&port.to_be_bytes());
            expected.push(0x01);
            assert_eq!(read_frame_body(&mut stream).await, expected);

            // Status request is a bare id.
            assert_eq!(read_frame_body(&mut stream).await, vec![0x00]);

            let mut response = vec![0x00];
            response.extend_from_slice(&wire_string(STATUS_JSON));
            stream.write_all(&frame(&response)).await.unwrap();

            // Ping must carry the exact payload.
            let mut expected_ping = vec![0x01];
            expected_ping.extend_from_slice(&PING_PAYLOAD.to_be_bytes());
            assert_eq!(read_frame_body(&mut stream).await, expected_ping);

            let mut pong = vec![0x01];
            pong.extend_from_slice(&PING_PAYLOAD.to_be_bytes());
            stream.write_all(&frame(&pong)).await.unwrap();
        });

        let (mut engine, bus) = new_engine();
        engine.connect("127.0.0.1", port).await.unwrap();
        let handle = engine.handle();

        let pongs = Rc::new(RefCell::new(Vec::new()));
        {
            let handle = handle.clone();
            bus.register_callback("Status/Clientbound/ServerInfo", move |_, payload| {
                let info = payload
                    .downcast::<status::clientbound::ServerInfo>()
                    .unwrap();
                assert_eq!(info.response, STATUS_JSON);
                handle
                    .send(&status::serverbound::Ping {
                        payload: PING_PAYLOAD,
                    })
                    .unwrap();
            });
        }
        {
            let handle = handle.clone();
            let pongs = pongs.clone();
            bus.register_callback("Status/Clientbound/Pong", move |_, payload| {
                let pong = payload.downcast::<status::clientbound::Pong>().unwrap();
                pongs.borrow_mut().push(pong.payload);
                handle.shutdown();
            });
        }

        engine
            .send(&handshaking::serverbound::SetProtocol {
                protocol_version: 47,
                server_host: "127.0.0.1".into(),
                server_port: port,
                next_state: 1,
            })
            .unwrap();
        engine.set_state(ProtocolState::Status);
        engine.send(&status::serverbound::PingStart).unwrap();

        engine.run().await.unwrap();
        server.await.unwrap();

        assert_eq!(*pongs.borrow(), vec![PING_PAYLOAD]);
    });
    tokio::time::timeout(Duration::from_secs(10), test)
        .await
        .expect("test timed out");
}

#[tokio::test]
async fn byte_at_a_time_delivery_yields_one_packet() {
    let local = LocalSet::new();
    let test = local.run_until(async {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut pong = vec![0x01];
            pong.extend_from_slice(&7i64.to_be_bytes());
            let wire = frame(&pong);
            assert_eq!(wire.len(), 10);
            for byte in wire {
                stream.write_all(&[byte]).await.unwrap();
                stream.flush().await.unwrap();
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
            // Hold the socket open until the client hangs up.
            let mut sink = Vec::new();
            let _ = stream.read_to_end(&mut sink).await;
        });

        let (mut engine, bus) = new_engine();
        engine.connect("127.0.0.1", port).await.unwrap();
        engine.set_state(ProtocolState::Status);
        let handle = engine.handle();

        let pongs = Rc::new(Cell::new(0));
        {
            let pongs = pongs.clone();
            let handle = handle.clone();
            bus.register_callback("Status/Clientbound/Pong", move |_, payload| {
                let pong = payload.downcast::<status::clientbound::Pong>().unwrap();
                assert_eq!(pong.payload, 7);
                pongs.set(pongs.get() + 1);
                handle.shutdown();
            });
        }

        engine.run().await.unwrap();
        drop(engine);
        server.await.unwrap();
        assert_eq!(pongs.get(), 1);
    });
    tokio::time::timeout(Duration::from_secs(10), test)
        .await
        .expect("test timed out");
}

#[tokio::test]
async fn malformed_length_prefix_kills_exactly_once() {
    let local = LocalSet::new();
    let test = local.run_until(async {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            // Five continuation bytes: not a valid length prefix.
            stream.write_all(&[0xff; 5]).await.unwrap();
            let mut sink = Vec::new();
            let _ = stream.read_to_end(&mut sink).await;
        });

        let (mut engine, bus) = new_engine();
        engine.connect("127.0.0.1", port).await.unwrap();

        let kills = Rc::new(Cell::new(0));
        {
            let kills = kills.clone();
            bus.register_callback("kill", move |_, _| {
                kills.set(kills.get() + 1);
            });
        }

        let err = engine.run().await.unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedVarint));
        assert_eq!(kills.get(), 1);

        drop(engine);
        server.await.unwrap();
    });
    tokio::time::timeout(Duration::from_secs(10), test)
        .await
        .expect("test timed out");
}

#[tokio::test]
async fn peer_hangup_is_terminal() {
    let local = LocalSet::new();
    let test = local.run_until(async {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            drop(stream);
        });

        let (mut engine, bus) = new_engine();
        engine.connect("127.0.0.1", port).await.unwrap();

        let kills = Rc::new(Cell::new(0));
        {
            let kills = kills.clone();
            bus.register_callback("kill", move |_, _| {
                kills.set(kills.get() + 1);
            });
        }

        let err = engine.run().await.unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::ConnectionClosed | ProtocolError::Io(_)
        ));
        assert_eq!(kills.get(), 1);
        server.await.unwrap();
    });
    tokio::time::timeout(Duration::from_secs(10), test)
        .await
        .expect("test timed out");
}

#[tokio::test]
async fn connect_emits_io_connect_with_endpoint() {
    let local = LocalSet::new();
    let test = local.run_until(async {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let (mut engine, bus) = new_engine();
        let seen = Rc::new(RefCell::new(None));
        {
            let seen = seen.clone();
            bus.register_callback("io_connect", move |_, payload| {
                assert_eq!(payload.type_tag(), "ConnectData");
                *seen.borrow_mut() = payload.connect_data().cloned();
            });
        }

        engine.connect("127.0.0.1", port).await.unwrap();
        let data = seen.borrow().clone().expect("io_connect not emitted");
        assert_eq!(data.address, "127.0.0.1");
        assert_eq!(data.port, port);

        let _ = listener;
    });
    tokio::time::timeout(Duration::from_secs(10), test)
        .await
        .expect("test timed out");
}
