//! Zlib compression for packet bodies.
//!
//! The compressed framing format deflates whole packet bodies in a single
//! shot and records the uncompressed length in the frame header, so
//! inflation can (and must) be validated against an exact expected length.
//! A configurable output bound protects against decompression bombs.

use crate::error::{ProtocolError, Result};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Zlib contexts plus the negotiated size threshold.
///
/// Starts disabled; [`enable`](Self::enable) is called at most once, when
/// the server announces compression. Bodies at least `threshold` bytes
/// long are deflated; shorter bodies travel uncompressed inside the
/// compressed-format envelope.
#[derive(Debug)]
pub struct CompressionUnit {
    threshold: Option<u32>,
    level: Compression,
    max_inflated: usize,
}

impl CompressionUnit {
    pub fn new(level: u32, max_inflated: usize) -> Self {
        Self {
            threshold: None,
            level: Compression::new(level),
            max_inflated,
        }
    }

    /// Switch framing to the compressed format with the given threshold.
    pub fn enable(&mut self, threshold: u32) {
        self.threshold = Some(threshold);
    }

    pub fn is_enabled(&self) -> bool {
        self.threshold.is_some()
    }

    /// Negotiated threshold, if compression has been enabled.
    pub fn threshold(&self) -> Option<u32> {
        self.threshold
    }

    /// Deflate a whole packet body.
    ///
    /// # Errors
    /// [`ProtocolError::CompressionFailure`] if the zlib stream errors.
    pub fn compress(&self, body: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::with_capacity(body.len() / 2), self.level);
        encoder
            .write_all(body)
            .map_err(|_| ProtocolError::CompressionFailure)?;
        encoder.finish().map_err(|_| ProtocolError::CompressionFailure)
    }

    /// Inflate a packet body, requiring exactly `expected_len` output bytes.
    ///
    /// # Errors
    /// [`ProtocolError::OversizedFrame`] if `expected_len` exceeds the
    /// configured bound, [`ProtocolError::DecompressionFailure`] on a bad
    /// zlib stream, [`ProtocolError::LengthMismatch`] if inflation yields
    /// any other length.
    pub fn decompress(&self, data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
        if expected_len > self.max_inflated {
            return Err(ProtocolError::OversizedFrame(expected_len));
        }

        let mut out = Vec::with_capacity(expected_len);
        let mut decoder = ZlibDecoder::new(data).take(expected_len as u64 + 1);
        decoder
            .read_to_end(&mut out)
            .map_err(|_| ProtocolError::DecompressionFailure)?;

        if out.len() != expected_len {
            return Err(ProtocolError::LengthMismatch {
                expected: expected_len,
                actual: out.len(),
            });
        }
        Ok(out)
    }
}
