//! The transfer buffer: a fixed-capacity byte store with sequential cursors.
//!
//! Writes append at `write_cursor`, reads drain from `read_cursor`. Neither
//! cursor moves backwards until [`TransferBuffer::wipe`]. Requests larger than
//! the remaining space or content are truncated, never rejected.

use std::fmt;

use crate::types::SECRET_CAPACITY;

/// Fixed-capacity buffer holding the secret.
pub struct TransferBuffer {
    data: Box<[u8]>,
    write_cursor: usize,
    read_cursor: usize,
}

impl TransferBuffer {
    /// Create a zero-filled buffer of the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            write_cursor: 0,
            read_cursor: 0,
        }
    }

    /// Rebuild a buffer from raw parts.
    ///
    /// Returns `None` unless `read_cursor <= write_cursor <= data.len()`.
    pub fn from_parts(data: Vec<u8>, write_cursor: usize, read_cursor: usize) -> Option<Self> {
        if read_cursor > write_cursor || write_cursor > data.len() {
            return None;
        }
        Some(Self {
            data: data.into_boxed_slice(),
            write_cursor,
            read_cursor,
        })
    }

    /// Total capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Offset of the next unwritten byte.
    pub fn write_cursor(&self) -> usize {
        self.write_cursor
    }

    /// Offset of the next unread byte.
    pub fn read_cursor(&self) -> usize {
        self.read_cursor
    }

    /// Bytes that can still be written.
    pub fn writable(&self) -> usize {
        self.capacity() - self.write_cursor
    }

    /// Bytes written but not yet read.
    pub fn readable(&self) -> usize {
        self.write_cursor - self.read_cursor
    }

    /// Append as much of `bytes` as fits. Returns the number of bytes stored.
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        let n = bytes.len().min(self.writable());
        if n == 0 {
            return 0;
        }
        let start = self.write_cursor;
        self.data[start..start + n].copy_from_slice(&bytes[..n]);
        self.write_cursor += n;
        n
    }

    /// Drain up to `max_len` bytes. An empty slice means end-of-data.
    pub fn read(&mut self, max_len: usize) -> &[u8] {
        let n = max_len.min(self.readable());
        let start = self.read_cursor;
        self.read_cursor += n;
        &self.data[start..start + n]
    }

    /// Hand up to `max_len` bytes to `f`, advancing only if `f` succeeds.
    ///
    /// Returns the number of bytes consumed.
    pub fn read_with<E>(
        &mut self,
        max_len: usize,
        f: impl FnOnce(&[u8]) -> Result<(), E>,
    ) -> Result<usize, E> {
        let n = max_len.min(self.readable());
        let start = self.read_cursor;
        f(&self.data[start..start + n])?;
        self.read_cursor += n;
        Ok(n)
    }

    /// Length of the stored content up to the first NUL byte.
    pub fn content_len(&self) -> usize {
        self.data
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.data.len())
    }

    /// Zero every byte and rewind both cursors.
    pub fn wipe(&mut self) {
        self.data.fill(0);
        self.write_cursor = 0;
        self.read_cursor = 0;
    }

    /// Whether every byte is zero and both cursors are at the start.
    pub fn is_wiped(&self) -> bool {
        self.write_cursor == 0 && self.read_cursor == 0 && self.data.iter().all(|&b| b == 0)
    }

    /// The full backing storage, including unwritten bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl Default for TransferBuffer {
    fn default() -> Self {
        Self::new(SECRET_CAPACITY)
    }
}

impl Drop for TransferBuffer {
    fn drop(&mut self) {
        self.data.fill(0);
    }
}

impl fmt::Debug for TransferBuffer {
    // Content is never printed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferBuffer")
            .field("capacity", &self.capacity())
            .field("write_cursor", &self.write_cursor)
            .field("read_cursor", &self.read_cursor)
            .finish()
    }
}
