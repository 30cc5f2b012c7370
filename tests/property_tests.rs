//! Property-based tests using proptest
//!
//! These validate the framing invariants across randomly generated bodies,
//! thresholds, and read fragmentations.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use mc_protocol_client::core::codec::{Frame, Framer};
use mc_protocol_client::core::varint;
use mc_protocol_client::error::Result;
use mc_protocol_client::protocol::PacketBody;
use proptest::prelude::*;

const MAX_FRAME: usize = 2_097_151;

/// Opaque packet body for exercising the framer.
#[derive(Debug, Clone)]
struct Blob {
    id: u32,
    bytes: Vec<u8>,
}

impl PacketBody for Blob {
    fn packet_id(&self) -> u32 {
        self.id
    }
    fn name(&self) -> &'static str {
        "Blob"
    }
    fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(&self.bytes);
        Ok(())
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

fn framer() -> Framer {
    Framer::new(MAX_FRAME, 6, 8 * 1024 * 1024)
}

fn apply_mode(f: &mut Framer, compression: Option<u32>, encryption: Option<[u8; 16]>) {
    if let Some(threshold) = compression {
        f.enable_compression(threshold);
    }
    if let Some(secret) = encryption {
        f.enable_encryption(&secret);
    }
}

fn feed(f: &mut Framer, bytes: &[u8]) {
    f.prepare_inbound(bytes.len())[..bytes.len()].copy_from_slice(bytes);
    f.commit_inbound(bytes.len());
}

fn drain(f: &mut Framer) -> Vec<Frame> {
    let mut frames = Vec::new();
    while let Some(frame) = f.next_frame().unwrap() {
        frames.push(frame);
    }
    frames
}

// Property: decode(encode(B, M), M) == B for every framing mode.
proptest! {
    #[test]
    fn prop_framing_roundtrip(
        id in 0u32..128,
        body in prop::collection::vec(any::<u8>(), 0..4096),
        compression in prop::option::of(0u32..1024),
        encryption in prop::option::of(any::<[u8; 16]>()),
    ) {
        let mut tx = framer();
        let mut rx = framer();
        apply_mode(&mut tx, compression, encryption);
        apply_mode(&mut rx, compression, encryption);

        tx.encode_packet(&Blob { id, bytes: body.clone() }).unwrap();
        let wire = tx.outbound_data().to_vec();

        feed(&mut rx, &wire);
        let frames = drain(&mut rx);
        prop_assert_eq!(frames.len(), 1);
        prop_assert_eq!(frames[0].id, id);
        prop_assert_eq!(&frames[0].body, &body);
    }
}

// Property: arbitrary read fragmentation yields the same packet sequence
// as one giant read.
proptest! {
    #[test]
    fn prop_fragmentation_equivalence(
        bodies in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..256), 1..8),
        compression in prop::option::of(0u32..256),
        cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..16),
    ) {
        let mut tx = framer();
        apply_mode(&mut tx, compression, None);
        for (i, body) in bodies.iter().enumerate() {
            tx.encode_packet(&Blob { id: i as u32, bytes: body.clone() }).unwrap();
        }
        let wire = tx.outbound_data().to_vec();

        // One giant read.
        let mut rx_whole = framer();
        apply_mode(&mut rx_whole, compression, None);
        feed(&mut rx_whole, &wire);
        let whole = drain(&mut rx_whole);

        // Arbitrary split points.
        let mut points: Vec<usize> = cuts.iter().map(|ix| ix.index(wire.len() + 1)).collect();
        points.push(0);
        points.push(wire.len());
        points.sort_unstable();
        points.dedup();

        let mut rx_split = framer();
        apply_mode(&mut rx_split, compression, None);
        let mut split = Vec::new();
        for pair in points.windows(2) {
            feed(&mut rx_split, &wire[pair[0]..pair[1]]);
            split.extend(drain(&mut rx_split));
        }

        prop_assert_eq!(whole.len(), bodies.len());
        prop_assert_eq!(&whole, &split);
    }
}

// Property: varint roundtrip and size bounds over the whole u32 range.
proptest! {
    #[test]
    fn prop_varint_roundtrip(value in any::<u32>()) {
        let mut out = Vec::new();
        varint::encode(&mut out, value);
        prop_assert!((1..=5).contains(&out.len()));
        prop_assert_eq!(out.len(), varint::sizeof(value));
        let (decoded, used) = varint::decode(&out).unwrap();
        prop_assert_eq!(decoded, value);
        prop_assert_eq!(used, out.len());
    }
}

// Property: compressed frames advertise the threshold decision correctly.
proptest! {
    #[test]
    fn prop_threshold_selects_envelope(
        body in prop::collection::vec(any::<u8>(), 0..2048),
        threshold in 1u32..1024,
    ) {
        let mut tx = framer();
        tx.enable_compression(threshold);
        tx.encode_packet(&Blob { id: 0, bytes: body.clone() }).unwrap();
        let wire = tx.outbound_data();

        let (_outer, n) = varint::decode(wire).unwrap();
        let (inner, _) = varint::decode(&wire[n..]).unwrap();

        let body_len = body.len() + 1; // id byte
        if body_len >= threshold as usize {
            prop_assert_eq!(inner as usize, body_len);
        } else {
            prop_assert_eq!(inner, 0);
        }
    }
}
