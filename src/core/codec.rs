//! The framer: turns outbound packet bodies into wire frames and inbound
//! bytes into `(id, body)` frames.
//!
//! Combines the varint codec, the crypto unit, and the compression unit,
//! and owns the protocol state plus both frame buffers. Inbound parsing is
//! a two-phase machine: `Header` until a complete length varint is
//! buffered, then `Body` until the full frame has arrived. Control
//! transitions (encryption on, compression on, state change) take effect
//! on frame boundaries.
//!
//! Scratch buffers are owned per instance, so a subscriber calling `send`
//! re-entrantly during a decode cannot corrupt an encode in progress.

use crate::core::buffer::FrameBuffer;
use crate::core::varint::{self, Verify, MAX_VARINT_LEN};
use crate::error::{ProtocolError, Result};
use crate::protocol::{PacketBody, ProtocolState};
use crate::utils::compression::CompressionUnit;
use crate::utils::crypto::{CryptoUnit, SHARED_SECRET_LEN};

/// One inbound frame after length/compression handling: the packet id and
/// the undecoded body bytes.
#[derive(Debug, PartialEq, Eq)]
pub struct Frame {
    pub id: u32,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Header,
    Body { frame_len: usize },
}

pub struct Framer {
    state: ProtocolState,
    crypto: CryptoUnit,
    compression: CompressionUnit,
    in_buf: FrameBuffer,
    out_buf: FrameBuffer,
    phase: Phase,
    max_frame_length: usize,
    body_scratch: Vec<u8>,
    header_scratch: Vec<u8>,
}

impl Framer {
    pub fn new(max_frame_length: usize, compression_level: u32, max_inflated: usize) -> Self {
        Self {
            state: ProtocolState::Handshaking,
            crypto: CryptoUnit::new(),
            compression: CompressionUnit::new(compression_level, max_inflated),
            in_buf: FrameBuffer::new(),
            out_buf: FrameBuffer::new(),
            phase: Phase::Header,
            max_frame_length,
            body_scratch: Vec::new(),
            header_scratch: Vec::new(),
        }
    }

    pub fn state(&self) -> ProtocolState {
        self.state
    }

    pub fn set_state(&mut self, state: ProtocolState) {
        self.state = state;
    }

    /// Flip encryption on; every byte framed or fed after this call passes
    /// through the CFB8 stream.
    pub fn enable_encryption(&mut self, secret: &[u8; SHARED_SECRET_LEN]) {
        self.crypto.enable(secret);
    }

    pub fn encryption_enabled(&self) -> bool {
        self.crypto.is_enabled()
    }

    /// Switch both directions to the compressed framing format.
    pub fn enable_compression(&mut self, threshold: u32) {
        self.compression.enable(threshold);
    }

    pub fn compression_enabled(&self) -> bool {
        self.compression.is_enabled()
    }

    // ---- outbound ----------------------------------------------------

    /// Frame a packet into the outbound buffer: id + body, optional
    /// deflate, length prefix, optional encryption of the whole frame.
    pub fn encode_packet(&mut self, packet: &dyn PacketBody) -> Result<()> {
        self.body_scratch.clear();
        self.header_scratch.clear();

        varint::encode(&mut self.body_scratch, packet.packet_id());
        packet.encode(&mut self.body_scratch)?;
        let body_len = self.body_scratch.len();
        if body_len > self.max_frame_length {
            return Err(ProtocolError::OversizedFrame(body_len));
        }

        // Deflate replaces the body when compression is on and the body
        // meets the threshold; otherwise the body ships as-is.
        let deflated;
        let payload: &[u8] = match self.compression.threshold() {
            Some(threshold) if body_len >= threshold as usize => {
                deflated = self.compression.compress(&self.body_scratch)?;
                let total = deflated.len() + varint::sizeof(body_len as u32);
                varint::encode(&mut self.header_scratch, total as u32);
                varint::encode(&mut self.header_scratch, body_len as u32);
                &deflated
            }
            Some(_) => {
                varint::encode(&mut self.header_scratch, body_len as u32 + 1);
                varint::encode(&mut self.header_scratch, 0);
                &self.body_scratch
            }
            None => {
                varint::encode(&mut self.header_scratch, body_len as u32);
                &self.body_scratch
            }
        };

        let header_len = self.header_scratch.len();
        let frame_len = header_len + payload.len();
        let region = self.out_buf.prepare(frame_len);
        region[..header_len].copy_from_slice(&self.header_scratch);
        region[header_len..].copy_from_slice(payload);
        self.crypto.encrypt(region);
        self.out_buf.commit(frame_len);
        Ok(())
    }

    pub fn has_outbound(&self) -> bool {
        !self.out_buf.is_empty()
    }

    pub fn outbound_data(&self) -> &[u8] {
        self.out_buf.data()
    }

    pub fn consume_outbound(&mut self, n: usize) {
        self.out_buf.consume(n);
    }

    // ---- inbound -----------------------------------------------------

    /// How many bytes the driver should try to read next: enough to finish
    /// the length prefix in header phase, the frame remainder in body
    /// phase.
    pub fn read_hint(&self) -> usize {
        match self.phase {
            Phase::Header => MAX_VARINT_LEN.saturating_sub(self.in_buf.len()).max(1),
            Phase::Body { frame_len } => frame_len.saturating_sub(self.in_buf.len()).max(1),
        }
    }

    /// Writable tail for the next socket read.
    pub fn prepare_inbound(&mut self, n: usize) -> &mut [u8] {
        self.in_buf.prepare(n)
    }

    /// Commit `n` freshly read bytes, decrypting them on arrival.
    pub fn commit_inbound(&mut self, n: usize) {
        self.in_buf.commit(n);
        let len = self.in_buf.len();
        self.crypto.decrypt(&mut self.in_buf.data_mut()[len - n..]);
    }

    /// Extract the next complete frame, if the buffer holds one.
    ///
    /// # Errors
    /// Malformed length prefixes, oversized frames, and inflation failures
    /// are terminal; the caller shuts the connection down.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            match self.phase {
                Phase::Header => match varint::verify(self.in_buf.data()) {
                    Verify::Overrun => return Ok(None),
                    Verify::Invalid => return Err(ProtocolError::MalformedVarint),
                    Verify::Valid(_) => {
                        let (frame_len, used) = varint::decode(self.in_buf.data())?;
                        let frame_len = frame_len as usize;
                        if frame_len > self.max_frame_length {
                            return Err(ProtocolError::OversizedFrame(frame_len));
                        }
                        self.in_buf.consume(used);
                        self.phase = Phase::Body { frame_len };
                    }
                },
                Phase::Body { frame_len } => {
                    if self.in_buf.len() < frame_len {
                        return Ok(None);
                    }
                    let raw = self.in_buf.data()[..frame_len].to_vec();
                    self.in_buf.consume(frame_len);
                    self.phase = Phase::Header;
                    return self.unwrap_frame(raw).map(Some);
                }
            }
        }
    }

    /// Undo the compression envelope and split off the packet id.
    fn unwrap_frame(&mut self, raw: Vec<u8>) -> Result<Frame> {
        let payload = if self.compression.is_enabled() {
            let (data_len, used) = varint::decode(&raw)?;
            if data_len == 0 {
                raw[used..].to_vec()
            } else {
                self.compression.decompress(&raw[used..], data_len as usize)?
            }
        } else {
            raw
        };

        let (id, used) = varint::decode(&payload)?;
        Ok(Frame {
            id,
            body: payload[used..].to_vec(),
        })
    }
}
