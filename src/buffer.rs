//! Bounded cursors over caller-owned byte buffers.
//!
//! Neither cursor ever grows its buffer. Capacity is the length of the slice
//! handed in at construction, and every operation either moves the position
//! by exactly the number of bytes it touched or fails without moving it.

use crate::error::{Error, Result};

/// Write side of a byte cursor.
#[derive(Debug)]
pub struct WriteCursor<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> WriteCursor<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        WriteCursor { buf, pos: 0 }
    }

    #[inline(always)]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// How many bytes can still be written.
    #[inline(always)]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// The bytes written so far.
    pub fn written(&self) -> &[u8] {
        &self.buf[..self.pos]
    }

    /// Fails with [`Error::BufferOverflow`] unless `len` more bytes fit.
    #[inline(always)]
    pub fn ensure(&self, len: usize) -> Result<()> {
        let remaining = self.remaining();
        if crate::util::unlikely(len > remaining) {
            return Err(Error::BufferOverflow {
                needed: len,
                remaining,
            });
        }
        Ok(())
    }

    #[inline]
    pub fn write_u8(&mut self, byte: u8) -> Result<()> {
        self.ensure(1)?;
        self.buf[self.pos] = byte;
        self.pos += 1;
        Ok(())
    }

    #[inline]
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.ensure(data.len())?;
        let end = self.pos + data.len();
        self.buf[self.pos..end].copy_from_slice(data);
        self.pos = end;
        Ok(())
    }

    #[inline]
    pub fn write_u32_le(&mut self, value: u32) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    #[inline]
    pub fn write_u64_le(&mut self, value: u64) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }
}

/// Read side of a byte cursor.
#[derive(Debug, Clone)]
pub struct ReadCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ReadCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        ReadCursor { buf, pos: 0 }
    }

    #[inline(always)]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// How many bytes are left to read.
    #[inline(always)]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// The unread bytes, without advancing.
    #[inline(always)]
    pub fn peek(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    #[inline(always)]
    fn ensure(&self, len: usize) -> Result<()> {
        let remaining = self.remaining();
        if crate::util::unlikely(len > remaining) {
            return Err(Error::BufferUnderflow {
                needed: len,
                remaining,
            });
        }
        Ok(())
    }

    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        let byte = self.buf[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    /// Returns a view of the next `len` bytes and advances past them.
    #[inline]
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.ensure(len)?;
        let start = self.pos;
        self.pos += len;
        Ok(&self.buf[start..self.pos])
    }

    #[inline]
    pub fn read_u32_le(&mut self) -> Result<u32> {
        let bytes = self.read_bytes(4)?;
        let mut raw = [0u8; 4];
        raw.copy_from_slice(bytes);
        Ok(u32::from_le_bytes(raw))
    }

    #[inline]
    pub fn read_u64_le(&mut self) -> Result<u64> {
        let bytes = self.read_bytes(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(raw))
    }

    /// Advance past `len` bytes without looking at them.
    #[inline]
    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.read_bytes(len).map(|_| ())
    }

    /// Split off the next `len` bytes as an independent cursor, advancing
    /// `self` past them.
    ///
    /// Used to bound the decode of an embedded message to its length prefix.
    pub fn split_to(&mut self, len: usize) -> Result<ReadCursor<'a>> {
        self.read_bytes(len).map(ReadCursor::new)
    }
}

impl bytes::Buf for ReadCursor<'_> {
    #[inline]
    fn remaining(&self) -> usize {
        ReadCursor::remaining(self)
    }

    #[inline]
    fn chunk(&self) -> &[u8] {
        self.peek()
    }

    #[inline]
    fn advance(&mut self, cnt: usize) {
        assert!(
            cnt <= ReadCursor::remaining(self),
            "cannot advance past the end of the cursor"
        );
        self.pos += cnt;
    }
}
