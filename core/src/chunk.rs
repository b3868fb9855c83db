//! Chunked transfer engine
//!
//! Outbound payloads of arbitrary length are cut into MTU-sized slices
//! and written strictly in order, one in flight at a time. The wire
//! carries no fragment header; chunks are raw payload slices.
//!
//! Inbound notifications are reassembled by [`MessageAssembler`] using
//! short-packet delimiting: a notification shorter than the negotiated
//! MTU terminates the current message, and a message whose length is an
//! exact MTU multiple is terminated by an empty notification.

/// Number of writes needed for `payload_len` bytes at the given MTU.
/// Zero-length payloads need zero writes.
pub fn chunk_count(payload_len: usize, mtu: usize) -> usize {
    if payload_len == 0 || mtu == 0 {
        0
    } else {
        payload_len.div_ceil(mtu)
    }
}

/// One outbound payload and the progress of its chunked writes.
///
/// Exists only while the session is Ready or Transferring; the session
/// resolves it with exactly one result callback, for the whole payload.
#[derive(Debug)]
pub struct OutboundTransfer {
    payload: Vec<u8>,
    offset: usize,
}

impl OutboundTransfer {
    /// Wrap a payload for sequential chunked writes
    pub fn new(payload: Vec<u8>) -> Self {
        Self { payload, offset: 0 }
    }

    /// The whole payload being transferred
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Bytes already acknowledged
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Whether every chunk has been written and acknowledged
    pub fn is_complete(&self) -> bool {
        self.offset >= self.payload.len()
    }

    /// The next chunk to write, at most `mtu` bytes. `None` when the
    /// transfer is complete or the MTU is zero.
    pub fn next_chunk(&self, mtu: usize) -> Option<&[u8]> {
        if mtu == 0 || self.is_complete() {
            return None;
        }
        let end = usize::min(self.offset + mtu, self.payload.len());
        Some(&self.payload[self.offset..end])
    }

    /// Record that the current chunk was acknowledged
    pub fn advance(&mut self, mtu: usize) {
        self.offset = usize::min(self.offset.saturating_add(mtu), self.payload.len());
    }

    /// Writes still needed to finish the transfer
    pub fn remaining_chunks(&self, mtu: usize) -> usize {
        chunk_count(self.payload.len() - self.offset, mtu)
    }
}

/// Reassembles inbound notifications into complete messages.
#[derive(Debug, Default)]
pub struct MessageAssembler {
    mtu: usize,
    buffer: Vec<u8>,
}

impl MessageAssembler {
    /// Create an assembler for the negotiated MTU
    pub fn new(mtu: usize) -> Self {
        Self {
            mtu,
            buffer: Vec::new(),
        }
    }

    /// Feed one notification. Returns the complete message when this
    /// notification terminated one (shorter than the MTU), `None` while
    /// the message is still accumulating. An empty notification on an
    /// empty buffer is ignored.
    pub fn push(&mut self, notification: &[u8]) -> Option<Vec<u8>> {
        self.buffer.extend_from_slice(notification);
        if notification.len() < self.mtu {
            if self.buffer.is_empty() {
                return None;
            }
            return Some(std::mem::take(&mut self.buffer));
        }
        None
    }

    /// Bytes accumulated toward the current message
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any partially accumulated message
    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}
