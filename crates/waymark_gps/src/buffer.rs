//! Sliding-window stream buffers
//!
//! Both directions of an accessory session buffer bytes in a `BytesMut` that
//! only grows at the back and is consumed from the front: inbound bytes until
//! a complete line is present, outbound bytes until the stream has capacity
//! to take them.

use bytes::{Buf, Bytes, BytesMut};
use std::io;

use crate::stream::AccessoryStream;

/// Upper bound on the capacity reserved up front for inbound lines
const INITIAL_CAPACITY_LIMIT: usize = 4096;

/// Accumulates inbound bytes and splits off complete lines
///
/// Lines end at `\n`, with an optional `\r` before it. Extracted lines have
/// the terminator removed; empty lines are dropped.
#[derive(Debug)]
pub struct SentenceBuffer {
    buffer: BytesMut,
    /// Longest line (terminator excluded) kept before it is thrown away
    max_len: usize,
    overflows: u64,
}

impl SentenceBuffer {
    pub fn new(max_len: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(
                max_len.saturating_mul(2).min(INITIAL_CAPACITY_LIMIT),
            ),
            max_len,
            overflows: 0,
        }
    }

    /// Append `data` and extract every complete line
    ///
    /// Whatever follows the last terminator stays buffered for the next
    /// push. If that remainder is already longer than `max_len` it can never
    /// become a valid sentence and is discarded.
    pub fn push(&mut self, data: &[u8]) -> Vec<Bytes> {
        self.buffer.extend_from_slice(data);

        let mut lines = Vec::new();
        while let Some(line) = self.try_extract_one() {
            if line.is_empty() {
                continue;
            }
            if line.len() > self.max_len {
                self.record_overflow(line.len());
                continue;
            }
            lines.push(line);
        }

        // A trailing `\r` belongs to the terminator still in flight
        let pending = self.buffer.len() - usize::from(self.buffer.last() == Some(&b'\r'));
        if pending > self.max_len {
            self.record_overflow(self.buffer.len());
            self.buffer.clear();
        }

        lines
    }

    fn try_extract_one(&mut self) -> Option<Bytes> {
        let end = self.buffer.iter().position(|&b| b == b'\n')?;
        let mut line = self.buffer.split_to(end + 1);
        line.truncate(end);
        if line.last() == Some(&b'\r') {
            line.truncate(end - 1);
        }
        Some(line.freeze())
    }

    fn record_overflow(&mut self, len: usize) {
        self.overflows += 1;
        tracing::warn!(len, max = self.max_len, "discarding oversized NMEA input");
    }

    /// Bytes waiting for a terminator
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Number of times input was discarded for exceeding `max_len`
    pub fn overflows(&self) -> u64 {
        self.overflows
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// Outbound bytes waiting for stream capacity
#[derive(Debug, Default)]
pub struct OutputBuffer {
    buffer: BytesMut,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Write as much as the stream accepts
    ///
    /// Stops when the buffer is empty, the stream reports `WouldBlock` or
    /// a write accepts nothing. Written bytes are dropped from the front, so
    /// a partial write leaves the unwritten tail first in line. Returns the
    /// number of bytes written.
    pub fn flush_to<S: AccessoryStream + ?Sized>(&mut self, stream: &mut S) -> io::Result<usize> {
        let mut written = 0;
        while !self.buffer.is_empty() {
            match stream.write(&self.buffer) {
                Ok(0) => break,
                Ok(n) => {
                    self.buffer.advance(n.min(self.buffer.len()));
                    written += n;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(written)
    }

    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MemoryStream;

    #[test]
    fn test_complete_and_partial_lines() {
        let mut buf = SentenceBuffer::new(82);
        let lines = buf.push(b"$GPGGA,1\r\n$GPRMC,2\n$GPG");
        assert_eq!(lines, vec![Bytes::from_static(b"$GPGGA,1"), Bytes::from_static(b"$GPRMC,2")]);
        assert_eq!(buf.pending(), b"$GPG");

        let lines = buf.push(b"LL,3\r");
        assert!(lines.is_empty());
        assert_eq!(buf.pending(), b"$GPGLL,3\r");

        let lines = buf.push(b"\n");
        assert_eq!(lines, vec![Bytes::from_static(b"$GPGLL,3")]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut buf = SentenceBuffer::new(82);
        let mut lines = Vec::new();
        for b in b"$A,1\r\n\r\n$B,2\n" {
            lines.extend(buf.push(&[*b]));
        }
        assert_eq!(lines.len(), 2);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_unterminated_overflow_is_discarded() {
        let mut buf = SentenceBuffer::new(16);
        assert!(buf.push(&[b'x'; 10]).is_empty());
        assert_eq!(buf.overflows(), 0);

        assert!(buf.push(&[b'x'; 10]).is_empty());
        assert_eq!(buf.overflows(), 1);
        assert!(buf.is_empty());

        // Recovers on the next sentence
        assert_eq!(buf.push(b"$OK\n").len(), 1);
    }

    #[test]
    fn test_full_length_line_split_inside_terminator() {
        let mut buf = SentenceBuffer::new(8);
        assert_eq!(buf.push(b"$$$$$$$$\r\n").len(), 1);

        assert!(buf.push(b"$$$$$$$$\r").is_empty());
        assert_eq!(buf.overflows(), 0);
        assert_eq!(buf.push(b"\n"), vec![Bytes::from_static(b"$$$$$$$$")]);
        assert_eq!(buf.overflows(), 0);

        // One byte past the limit still overflows
        assert!(buf.push(b"$$$$$$$$$\r").is_empty());
        assert_eq!(buf.overflows(), 1);
    }

    #[test]
    fn test_huge_limit_does_not_preallocate() {
        let mut buf = SentenceBuffer::new(usize::MAX);
        assert_eq!(buf.push(b"$A\n").len(), 1);
    }

    #[test]
    fn test_oversized_terminated_line_is_dropped() {
        let mut buf = SentenceBuffer::new(8);
        let mut data = vec![b'y'; 12];
        data.extend_from_slice(b"\n$short\n");
        let lines = buf.push(&data);
        assert_eq!(lines, vec![Bytes::from_static(b"$short")]);
        assert_eq!(buf.overflows(), 1);
    }

    #[test]
    fn test_flush_partial_writes_keep_tail() {
        let (mut stream, handle) = MemoryStream::pair();
        handle.set_write_capacity(Some(5));

        let mut out = OutputBuffer::new();
        out.push(b"$PMTK220,1000*1F\r\n");
        assert_eq!(out.flush_to(&mut stream).unwrap(), 5);
        assert_eq!(out.pending(), b"220,1000*1F\r\n");
        assert_eq!(handle.written(), b"$PMTK");

        handle.set_write_capacity(None);
        out.flush_to(&mut stream).unwrap();
        assert!(out.is_empty());
        assert_eq!(handle.written(), b"$PMTK220,1000*1F\r\n");
    }

    #[test]
    fn test_flush_error_propagates() {
        let (mut stream, handle) = MemoryStream::pair();
        handle.fail_next_write(io::ErrorKind::BrokenPipe);

        let mut out = OutputBuffer::new();
        out.push(b"abc");
        let err = out.flush_to(&mut stream).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(out.len(), 3);
    }
}
