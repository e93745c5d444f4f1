//! Accessory stream abstraction
//!
//! An accessory session is a duplex byte stream opened for one of the
//! protocol strings the accessory advertises. The platform delivers readiness
//! as [`StreamEvent`]s; the handler then reads or writes until the stream
//! reports `WouldBlock`.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;

/// Identity of a connected external accessory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessoryInfo {
    /// Stable for the lifetime of one physical connection
    pub connection_id: u64,
    pub name: String,
    pub manufacturer: String,
    pub model_number: String,
    pub serial_number: String,
    /// Protocol strings the accessory speaks, e.g. `com.example.nmea`
    pub protocols: Vec<String>,
}

impl AccessoryInfo {
    pub fn new(connection_id: u64, name: impl Into<String>) -> Self {
        Self {
            connection_id,
            name: name.into(),
            manufacturer: String::new(),
            model_number: String::new(),
            serial_number: String::new(),
            protocols: Vec::new(),
        }
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocols.push(protocol.into());
        self
    }

    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = manufacturer.into();
        self
    }

    pub fn supports(&self, protocol: &str) -> bool {
        self.protocols.iter().any(|p| p == protocol)
    }
}

/// Readiness notifications for an open session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEvent {
    OpenCompleted,
    HasBytesAvailable,
    HasSpaceAvailable,
    ErrorOccurred,
    EndEncountered,
}

/// Non-blocking duplex byte stream to an accessory
///
/// `read` and `write` return `ErrorKind::WouldBlock` when there is nothing to
/// read or no room to write right now. `read` returning `Ok(0)` means the
/// stream has ended.
pub trait AccessoryStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;
    fn close(&mut self);
}

impl<S: AccessoryStream + ?Sized> AccessoryStream for Box<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Opens sessions to accessories
pub trait SessionFactory {
    type Stream: AccessoryStream;

    fn open_session(&mut self, accessory: &AccessoryInfo, protocol: &str)
        -> io::Result<Self::Stream>;
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory streams
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct MemoryState {
    inbound: VecDeque<u8>,
    written: Vec<u8>,
    /// Bytes accepted per write; `None` is unlimited, `Some(0)` blocks
    write_capacity: Option<usize>,
    /// Reads return `Ok(0)` once inbound data runs out
    ended: bool,
    read_error: Option<io::ErrorKind>,
    write_error: Option<io::ErrorKind>,
    closed: bool,
}

/// An accessory stream backed by memory, for replaying captures and tests
#[derive(Debug)]
pub struct MemoryStream {
    state: Arc<Mutex<MemoryState>>,
}

/// The other end of a [`MemoryStream`]
#[derive(Debug, Clone)]
pub struct MemoryHandle {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStream {
    pub fn pair() -> (Self, MemoryHandle) {
        let state = Arc::new(Mutex::new(MemoryState::default()));
        (
            Self {
                state: state.clone(),
            },
            MemoryHandle { state },
        )
    }
}

impl AccessoryStream for MemoryStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        if let Some(kind) = state.read_error.take() {
            return Err(kind.into());
        }
        if state.inbound.is_empty() {
            return if state.ended || state.closed {
                Ok(0)
            } else {
                Err(io::ErrorKind::WouldBlock.into())
            };
        }

        let n = buf.len().min(state.inbound.len());
        for (dst, src) in buf.iter_mut().zip(state.inbound.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        if let Some(kind) = state.write_error.take() {
            return Err(kind.into());
        }
        if state.closed {
            return Err(io::ErrorKind::BrokenPipe.into());
        }

        let n = match state.write_capacity {
            Some(0) => return Err(io::ErrorKind::WouldBlock.into()),
            Some(cap) => buf.len().min(cap),
            None => buf.len(),
        };
        state.written.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn close(&mut self) {
        self.state.lock().closed = true;
    }
}

impl MemoryHandle {
    /// Queue bytes for the session to read
    pub fn feed(&self, data: &[u8]) {
        self.state.lock().inbound.extend(data);
    }

    /// Mark the end of inbound data
    pub fn finish(&self) {
        self.state.lock().ended = true;
    }

    /// Bytes queued but not yet read
    pub fn unread(&self) -> usize {
        self.state.lock().inbound.len()
    }

    /// Everything the session has written
    pub fn written(&self) -> Vec<u8> {
        self.state.lock().written.clone()
    }

    pub fn set_write_capacity(&self, capacity: Option<usize>) {
        self.state.lock().write_capacity = capacity;
    }

    pub fn fail_next_read(&self, kind: io::ErrorKind) {
        self.state.lock().read_error = Some(kind);
    }

    pub fn fail_next_write(&self, kind: io::ErrorKind) {
        self.state.lock().write_error = Some(kind);
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

/// Hands out [`MemoryStream`]s and keeps their handles
#[derive(Debug, Default)]
pub struct MemoryFactory {
    handles: Vec<MemoryHandle>,
    /// `(connection id, protocol)` for every session opened
    opened: Vec<(u64, String)>,
    fail_next: Option<io::ErrorKind>,
}

impl MemoryFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `open_session` fail
    pub fn fail_next_open(&mut self, kind: io::ErrorKind) {
        self.fail_next = Some(kind);
    }

    /// Handle for the most recently opened stream
    pub fn last_handle(&self) -> Option<&MemoryHandle> {
        self.handles.last()
    }

    pub fn opened(&self) -> &[(u64, String)] {
        &self.opened
    }
}

impl SessionFactory for MemoryFactory {
    type Stream = MemoryStream;

    fn open_session(
        &mut self,
        accessory: &AccessoryInfo,
        protocol: &str,
    ) -> io::Result<MemoryStream> {
        if let Some(kind) = self.fail_next.take() {
            return Err(kind.into());
        }
        let (stream, handle) = MemoryStream::pair();
        self.handles.push(handle);
        self.opened
            .push((accessory.connection_id, protocol.to_string()));
        Ok(stream)
    }
}
