//! Frame buffer with a prepare/commit/consume discipline.
//!
//! A growable byte buffer split into three partitions: consumed bytes
//! (reclaimed, never re-read), committed bytes (readable via [`data`]),
//! and a prepared tail of known capacity that becomes readable only after
//! [`commit`]. Socket reads land directly in the prepared region and
//! encoded frames are staged here before flushing, so neither direction
//! pays an extra copy.
//!
//! [`data`]: FrameBuffer::data
//! [`commit`]: FrameBuffer::commit

use bytes::{Buf, BytesMut};

/// Default capacity for a fresh buffer.
const INITIAL_CAPACITY: usize = 8 * 1024;

/// Growable byte buffer, one instance per transfer direction.
///
/// The region returned by [`prepare`](Self::prepare) stays valid until the
/// next `prepare` or `commit` call. Committing fewer bytes than were
/// prepared discards the rest of the prepared region.
#[derive(Debug)]
pub struct FrameBuffer {
    buf: BytesMut,
    committed: usize,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_CAPACITY),
            committed: 0,
        }
    }

    /// Writable region of at least `n` bytes past the committed data.
    pub fn prepare(&mut self, n: usize) -> &mut [u8] {
        self.buf.resize(self.committed + n, 0);
        &mut self.buf[self.committed..]
    }

    /// Promote the first `n` prepared bytes to committed.
    ///
    /// # Panics
    /// Panics if `n` exceeds the prepared region.
    pub fn commit(&mut self, n: usize) {
        assert!(
            self.committed + n <= self.buf.len(),
            "commit past prepared region"
        );
        self.committed += n;
        self.buf.truncate(self.committed);
    }

    /// Drop `n` leading committed bytes.
    ///
    /// # Panics
    /// Panics if `n` exceeds the committed length.
    pub fn consume(&mut self, n: usize) {
        assert!(n <= self.committed, "consume past committed region");
        self.buf.advance(n);
        self.committed -= n;
    }

    /// Readable (committed) region.
    pub fn data(&self) -> &[u8] {
        &self.buf[..self.committed]
    }

    /// Mutable view of the committed region, for in-place decryption.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.buf[..self.committed]
    }

    /// Number of committed bytes.
    pub fn len(&self) -> usize {
        self.committed
    }

    pub fn is_empty(&self) -> bool {
        self.committed == 0
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
