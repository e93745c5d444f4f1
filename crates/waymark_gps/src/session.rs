//! External GPS session state machine.
//!
//! ```text
//! Disconnected --accessory_connected--> Connecting --OpenCompleted/bytes--> Connected
//!       ^                                    |                                  |
//!       +------- error / end / accessory_disconnected --------------------------+
//! ```
//!
//! The handler owns the accessory stream and both sliding-window buffers.
//! Everything runs on the caller's event loop through `&mut self`; parsed
//! fixes go out to subscribers over unbounded channels so emitting never
//! blocks.

use std::io;
use tokio::sync::mpsc;

use crate::buffer::{OutputBuffer, SentenceBuffer};
use crate::config::ExternalGpsConfig;
use crate::error::{GpsError, Result};
use crate::nmea::{frame_command, is_command_body, parse_sentence, LocationFix};
use crate::stream::{AccessoryInfo, AccessoryStream, SessionFactory, StreamEvent};

/// Connection state of the handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// No accessory session.
    Disconnected,
    /// Session opened, waiting for the stream to come up.
    Connecting,
    /// Stream open; reading sentences and writing commands.
    Connected,
}

/// Notifications delivered to subscribers.
#[derive(Clone, Debug, PartialEq)]
pub enum GpsEvent {
    Connected(AccessoryInfo),
    Fix(LocationFix),
    Disconnected { connection_id: u64 },
}

/// Statistics for the current session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub bytes_read: u64,
    pub bytes_written: u64,
    /// Sentences that produced a fix.
    pub sentences_parsed: u64,
    /// Malformed, unsupported or fix-less sentences.
    pub sentences_discarded: u64,
    pub fixes_emitted: u64,
    /// Times the input buffer was discarded for exceeding the sentence limit.
    pub overflows: u64,
}

struct Session<S> {
    accessory: AccessoryInfo,
    protocol: String,
    stream: S,
}

/// Handler for one external GPS accessory at a time.
pub struct ExternalGps<F: SessionFactory> {
    config: ExternalGpsConfig,
    factory: F,
    state: ConnectionState,
    session: Option<Session<F::Stream>>,
    input: SentenceBuffer,
    output: OutputBuffer,
    subscribers: Vec<mpsc::UnboundedSender<GpsEvent>>,
    stats: SessionStats,
}

impl<F: SessionFactory> ExternalGps<F> {
    pub fn new(config: ExternalGpsConfig, factory: F) -> Self {
        let input = SentenceBuffer::new(config.max_sentence_len);
        Self {
            config,
            factory,
            state: ConnectionState::Disconnected,
            session: None,
            input,
            output: OutputBuffer::new(),
            subscribers: Vec::new(),
            stats: SessionStats::default(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn config(&self) -> &ExternalGpsConfig {
        &self.config
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// The accessory of the open session.
    pub fn accessory(&self) -> Option<&AccessoryInfo> {
        self.session.as_ref().map(|s| &s.accessory)
    }

    /// The protocol string the open session was opened with.
    pub fn protocol(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.protocol.as_str())
    }

    /// Inbound bytes waiting for a line terminator.
    pub fn pending_input(&self) -> &[u8] {
        self.input.pending()
    }

    /// Outbound bytes waiting for stream capacity.
    pub fn pending_output(&self) -> &[u8] {
        self.output.pending()
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn factory_mut(&mut self) -> &mut F {
        &mut self.factory
    }

    /// Receive connection changes and fixes.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<GpsEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// An accessory was attached.
    ///
    /// Opens a session when the handler is idle and the accessory speaks one
    /// of the configured protocols. Returns whether a session was opened.
    pub fn accessory_connected(&mut self, accessory: AccessoryInfo) -> bool {
        if self.state != ConnectionState::Disconnected {
            tracing::debug!(
                name = %accessory.name,
                state = ?self.state,
                "ignoring accessory, session already open"
            );
            return false;
        }

        let Some(protocol) = self
            .config
            .protocols
            .iter()
            .find(|p| accessory.supports(p))
            .cloned()
        else {
            tracing::debug!(name = %accessory.name, "accessory speaks no configured protocol");
            return false;
        };

        let stream = match self.factory.open_session(&accessory, &protocol) {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(name = %accessory.name, %protocol, error = %e, "failed to open accessory session");
                return false;
            }
        };

        tracing::info!(
            name = %accessory.name,
            connection_id = accessory.connection_id,
            %protocol,
            "opened accessory session"
        );

        self.input.clear();
        self.output.clear();
        self.stats = SessionStats::default();
        for body in &self.config.init_commands {
            if is_command_body(body) {
                self.output.push(frame_command(body).as_bytes());
            } else {
                tracing::warn!(command = %body, "skipping malformed init command");
            }
        }
        self.session = Some(Session {
            accessory,
            protocol,
            stream,
        });
        self.state = ConnectionState::Connecting;
        true
    }

    /// An accessory was detached.
    pub fn accessory_disconnected(&mut self, connection_id: u64) {
        if self.accessory().map(|a| a.connection_id) == Some(connection_id) {
            self.teardown("accessory disconnected");
        } else {
            tracing::debug!(connection_id, "ignoring disconnect of unknown accessory");
        }
    }

    /// Readiness notification from the session stream.
    pub fn handle_stream_event(&mut self, event: StreamEvent) {
        if self.session.is_none() {
            tracing::trace!(?event, "stream event without a session");
            return;
        }

        match event {
            StreamEvent::OpenCompleted => {
                self.mark_connected();
                self.flush();
            }
            StreamEvent::HasBytesAvailable => {
                // Data means the stream is open even if the open event was missed
                self.mark_connected();
                self.flush();
                self.read_available();
            }
            StreamEvent::HasSpaceAvailable => self.flush(),
            StreamEvent::ErrorOccurred => self.teardown("stream error"),
            StreamEvent::EndEncountered => self.teardown("stream ended"),
        }
    }

    /// Frame `body` as `$body*HH\r\n` and queue it for the accessory.
    ///
    /// Written right away when connected; while connecting it goes out once
    /// the stream opens.
    pub fn send_command(&mut self, body: &str) -> Result<()> {
        if self.state == ConnectionState::Disconnected {
            return Err(GpsError::NotConnected);
        }
        if !is_command_body(body) {
            return Err(GpsError::InvalidCommand(body.to_string()));
        }

        self.output.push(frame_command(body).as_bytes());
        if self.state == ConnectionState::Connected {
            self.try_flush().map_err(|e| {
                self.teardown("write failed");
                GpsError::Io(e)
            })?;
        }
        Ok(())
    }

    fn mark_connected(&mut self) {
        if self.state != ConnectionState::Connecting {
            return;
        }
        self.state = ConnectionState::Connected;
        if let Some(accessory) = self.accessory().cloned() {
            tracing::info!(name = %accessory.name, "accessory stream open");
            self.emit(GpsEvent::Connected(accessory));
        }
    }

    fn read_available(&mut self) {
        let mut buf = vec![0u8; self.config.read_chunk];
        loop {
            let result = match self.session.as_mut() {
                Some(session) => session.stream.read(&mut buf),
                None => return,
            };

            match result {
                Ok(0) => break,
                Ok(n) => {
                    self.stats.bytes_read += n as u64;
                    let overflows = self.input.overflows();
                    let lines = self.input.push(&buf[..n]);
                    self.stats.overflows += self.input.overflows() - overflows;
                    for line in lines {
                        self.process_line(&line);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!(error = %e, "accessory read failed");
                    self.teardown("read failed");
                    return;
                }
            }
        }
    }

    fn process_line(&mut self, line: &[u8]) {
        match parse_sentence(line, self.config.verify_checksum) {
            Ok(fix) => {
                self.stats.sentences_parsed += 1;
                self.stats.fixes_emitted += 1;
                tracing::trace!(lat = fix.latitude, lon = fix.longitude, "fix");
                self.emit(GpsEvent::Fix(fix));
            }
            Err(e) => {
                self.stats.sentences_discarded += 1;
                tracing::debug!(error = %e, line = %String::from_utf8_lossy(line), "discarding sentence");
            }
        }
    }

    fn flush(&mut self) {
        if let Err(e) = self.try_flush() {
            tracing::warn!(error = %e, "accessory write failed");
            self.teardown("write failed");
        }
    }

    fn try_flush(&mut self) -> io::Result<()> {
        if self.state != ConnectionState::Connected || self.output.is_empty() {
            return Ok(());
        }
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        let written = self.output.flush_to(&mut session.stream)?;
        self.stats.bytes_written += written as u64;
        Ok(())
    }

    fn teardown(&mut self, reason: &str) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        session.stream.close();
        self.input.clear();
        self.output.clear();
        self.state = ConnectionState::Disconnected;

        tracing::info!(
            name = %session.accessory.name,
            connection_id = session.accessory.connection_id,
            reason,
            "accessory session closed"
        );
        self.emit(GpsEvent::Disconnected {
            connection_id: session.accessory.connection_id,
        });
    }

    fn emit(&mut self, event: GpsEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl<F: SessionFactory> Drop for ExternalGps<F> {
    fn drop(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.stream.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{MemoryFactory, MemoryHandle};

    const PROTOCOL: &str = "com.example.nmea";
    const GGA: &[u8] = b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n";
    const RMC: &[u8] = b"$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A\r\n";

    fn config() -> ExternalGpsConfig {
        ExternalGpsConfig::standard().with_protocols([PROTOCOL])
    }

    fn accessory(id: u64) -> AccessoryInfo {
        AccessoryInfo::new(id, "Test GPS").with_protocol(PROTOCOL)
    }

    fn connected(config: ExternalGpsConfig) -> (ExternalGps<MemoryFactory>, MemoryHandle) {
        let mut gps = ExternalGps::new(config, MemoryFactory::new());
        assert!(gps.accessory_connected(accessory(1)));
        gps.handle_stream_event(StreamEvent::OpenCompleted);
        let handle = gps.factory().last_handle().unwrap().clone();
        (gps, handle)
    }

    fn fixes(rx: &mut mpsc::UnboundedReceiver<GpsEvent>) -> Vec<LocationFix> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let GpsEvent::Fix(fix) = event {
                out.push(fix);
            }
        }
        out
    }

    #[test]
    fn test_connect_lifecycle() {
        let mut gps = ExternalGps::new(
            config().with_init_command("PMTK220,1000"),
            MemoryFactory::new(),
        );
        let mut rx = gps.subscribe();
        assert_eq!(gps.state(), ConnectionState::Disconnected);

        assert!(gps.accessory_connected(accessory(9)));
        assert_eq!(gps.state(), ConnectionState::Connecting);
        assert_eq!(gps.protocol(), Some(PROTOCOL));
        assert_eq!(gps.pending_output(), b"$PMTK220,1000*1F\r\n");
        let handle = gps.factory().last_handle().unwrap().clone();
        assert!(handle.written().is_empty());

        gps.handle_stream_event(StreamEvent::OpenCompleted);
        assert!(gps.is_connected());
        assert_eq!(handle.written(), b"$PMTK220,1000*1F\r\n");
        assert!(gps.pending_output().is_empty());
        assert_eq!(gps.stats().bytes_written, 18);
        assert!(matches!(rx.try_recv(), Ok(GpsEvent::Connected(a)) if a.connection_id == 9));
    }

    #[test]
    fn test_malformed_init_commands_are_not_sent() {
        let config = config()
            .with_init_command("PMTK220,1000*1F\r\n$GPXXX")
            .with_init_command("PMTK220,1000");
        let (_gps, handle) = connected(config);
        assert_eq!(handle.written(), b"$PMTK220,1000*1F\r\n");
    }

    #[test]
    fn test_unsupported_accessory_is_ignored() {
        let mut gps = ExternalGps::new(config(), MemoryFactory::new());
        let other = AccessoryInfo::new(3, "Headphones").with_protocol("com.example.audio");
        assert!(!gps.accessory_connected(other));
        assert_eq!(gps.state(), ConnectionState::Disconnected);
        assert!(gps.factory().opened().is_empty());
    }

    #[test]
    fn test_open_failure_stays_disconnected() {
        let mut factory = MemoryFactory::new();
        factory.fail_next_open(io::ErrorKind::PermissionDenied);
        let mut gps = ExternalGps::new(config(), factory);

        assert!(!gps.accessory_connected(accessory(1)));
        assert_eq!(gps.state(), ConnectionState::Disconnected);
        assert!(gps.accessory().is_none());

        // The next attempt succeeds
        assert!(gps.accessory_connected(accessory(1)));
    }

    #[test]
    fn test_second_accessory_ignored_while_open() {
        let (mut gps, _handle) = connected(config());
        assert!(!gps.accessory_connected(accessory(2)));
        assert_eq!(gps.accessory().map(|a| a.connection_id), Some(1));
        assert_eq!(gps.factory().opened().len(), 1);
    }

    #[test]
    fn test_one_fix_and_partial_remainder_for_any_split() {
        let partial: &[u8] = b"$GPRMC,123519,A,48";
        let mut data = GGA.to_vec();
        data.extend_from_slice(partial);

        for split in 0..=data.len() {
            let (mut gps, handle) = connected(config());
            let mut rx = gps.subscribe();

            handle.feed(&data[..split]);
            gps.handle_stream_event(StreamEvent::HasBytesAvailable);
            handle.feed(&data[split..]);
            gps.handle_stream_event(StreamEvent::HasBytesAvailable);

            assert_eq!(fixes(&mut rx).len(), 1, "split at {}", split);
            assert_eq!(gps.pending_input(), partial, "split at {}", split);
            assert_eq!(gps.stats().bytes_read, data.len() as u64);
        }
    }

    #[test]
    fn test_small_read_chunks() {
        let mut cfg = config();
        cfg.read_chunk = 3;
        let (mut gps, handle) = connected(cfg);
        let mut rx = gps.subscribe();

        handle.feed(GGA);
        handle.feed(RMC);
        gps.handle_stream_event(StreamEvent::HasBytesAvailable);

        let got = fixes(&mut rx);
        assert_eq!(got.len(), 2);
        assert!(gps.pending_input().is_empty());
        assert_eq!(gps.stats().fixes_emitted, 2);
    }

    #[test]
    fn test_bytes_while_connecting_complete_the_open() {
        let mut gps = ExternalGps::new(config(), MemoryFactory::new());
        let mut rx = gps.subscribe();
        gps.accessory_connected(accessory(1));
        let handle = gps.factory().last_handle().unwrap().clone();

        handle.feed(GGA);
        gps.handle_stream_event(StreamEvent::HasBytesAvailable);

        assert!(gps.is_connected());
        assert!(matches!(rx.try_recv(), Ok(GpsEvent::Connected(_))));
        assert!(matches!(rx.try_recv(), Ok(GpsEvent::Fix(_))));
    }

    #[test]
    fn test_malformed_sentences_are_skipped() {
        let (mut gps, handle) = connected(config());
        let mut rx = gps.subscribe();

        handle.feed(b"garbage line\r\n");
        handle.feed(b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*00\r\n");
        handle.feed(b"$GPGSV,3,1,11,03,03,111,00*74\r\n");
        handle.feed(GGA);
        gps.handle_stream_event(StreamEvent::HasBytesAvailable);

        assert_eq!(fixes(&mut rx).len(), 1);
        assert_eq!(gps.stats().sentences_discarded, 3);
        assert_eq!(gps.stats().sentences_parsed, 1);
        assert!(gps.is_connected());
    }

    #[test]
    fn test_overflow_is_counted() {
        let (mut gps, handle) = connected(config().with_max_sentence_len(32));
        handle.feed(&[b'x'; 40]);
        gps.handle_stream_event(StreamEvent::HasBytesAvailable);

        assert_eq!(gps.stats().overflows, 1);
        assert!(gps.pending_input().is_empty());
        assert!(gps.is_connected());
    }

    #[test]
    fn test_disconnect_mid_stream_clears_buffers() {
        let (mut gps, handle) = connected(config());
        let mut rx = gps.subscribe();

        handle.set_write_capacity(Some(0));
        gps.send_command("PMTK220,1000").unwrap();
        handle.feed(b"$GPGGA,1235");
        gps.handle_stream_event(StreamEvent::HasBytesAvailable);
        assert!(!gps.pending_input().is_empty());
        assert!(!gps.pending_output().is_empty());

        gps.accessory_disconnected(1);

        assert_eq!(gps.state(), ConnectionState::Disconnected);
        assert!(gps.pending_input().is_empty());
        assert!(gps.pending_output().is_empty());
        assert!(gps.accessory().is_none());
        assert!(handle.is_closed());
        assert_eq!(rx.try_recv().ok(), Some(GpsEvent::Disconnected { connection_id: 1 }));
    }

    #[test]
    fn test_disconnect_of_other_accessory_ignored() {
        let (mut gps, _handle) = connected(config());
        gps.accessory_disconnected(42);
        assert!(gps.is_connected());
    }

    #[test]
    fn test_stream_error_and_end_tear_down() {
        for event in [StreamEvent::ErrorOccurred, StreamEvent::EndEncountered] {
            let (mut gps, handle) = connected(config());
            handle.feed(b"$GPG");
            gps.handle_stream_event(StreamEvent::HasBytesAvailable);

            gps.handle_stream_event(event);
            assert_eq!(gps.state(), ConnectionState::Disconnected);
            assert!(gps.pending_input().is_empty());
            assert!(handle.is_closed());

            // Events after teardown are ignored
            gps.handle_stream_event(StreamEvent::HasBytesAvailable);
            assert_eq!(gps.state(), ConnectionState::Disconnected);
        }
    }

    #[test]
    fn test_read_error_tears_down() {
        let (mut gps, handle) = connected(config());
        handle.fail_next_read(io::ErrorKind::ConnectionReset);
        gps.handle_stream_event(StreamEvent::HasBytesAvailable);
        assert_eq!(gps.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_send_command() {
        let mut gps = ExternalGps::new(config(), MemoryFactory::new());
        assert!(matches!(
            gps.send_command("PMTK220,1000"),
            Err(GpsError::NotConnected)
        ));

        gps.accessory_connected(accessory(1));
        assert!(matches!(
            gps.send_command("bad*cmd"),
            Err(GpsError::InvalidCommand(_))
        ));
        assert!(matches!(gps.send_command(""), Err(GpsError::InvalidCommand(_))));

        // Queued while connecting, written on open
        gps.send_command("PMTK220,1000").unwrap();
        let handle = gps.factory().last_handle().unwrap().clone();
        assert!(handle.written().is_empty());
        gps.handle_stream_event(StreamEvent::OpenCompleted);
        assert_eq!(handle.written(), b"$PMTK220,1000*1F\r\n");
    }

    #[test]
    fn test_partial_writes_resume_on_space() {
        let (mut gps, handle) = connected(config());
        handle.set_write_capacity(Some(4));

        gps.send_command("PMTK220,1000").unwrap();
        // Each write takes 4 bytes until the buffer drains
        assert!(gps.pending_output().is_empty());
        assert_eq!(handle.written(), b"$PMTK220,1000*1F\r\n");

        handle.set_write_capacity(Some(0));
        gps.send_command("PMTK220,200").unwrap();
        assert_eq!(gps.pending_output(), frame_command("PMTK220,200").as_bytes());

        handle.set_write_capacity(Some(5));
        gps.handle_stream_event(StreamEvent::HasSpaceAvailable);
        assert!(gps.pending_output().is_empty());
    }

    #[test]
    fn test_write_error_tears_down() {
        let (mut gps, handle) = connected(config());
        handle.fail_next_write(io::ErrorKind::BrokenPipe);
        assert!(matches!(gps.send_command("PMTK220,1000"), Err(GpsError::Io(_))));
        assert_eq!(gps.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_closed_subscribers_are_pruned() {
        let (mut gps, handle) = connected(config());
        let mut kept = gps.subscribe();
        let dropped = gps.subscribe();
        drop(dropped);
        assert_eq!(gps.subscriber_count(), 2);

        handle.feed(GGA);
        gps.handle_stream_event(StreamEvent::HasBytesAvailable);
        assert_eq!(gps.subscriber_count(), 1);
        assert_eq!(fixes(&mut kept).len(), 1);
    }

    #[test]
    fn test_reconnect_after_disconnect() {
        let (mut gps, _first) = connected(config());
        gps.accessory_disconnected(1);

        assert!(gps.accessory_connected(accessory(2)));
        gps.handle_stream_event(StreamEvent::OpenCompleted);
        let second = gps.factory().last_handle().unwrap().clone();
        let mut rx = gps.subscribe();

        second.feed(RMC);
        gps.handle_stream_event(StreamEvent::HasBytesAvailable);
        assert_eq!(fixes(&mut rx).len(), 1);
        assert_eq!(gps.factory().opened().len(), 2);
    }

    #[test]
    fn test_checksum_verification_can_be_disabled() {
        let (mut gps, handle) = connected(config().with_checksum(false));
        let mut rx = gps.subscribe();
        handle.feed(b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*00\r\n");
        gps.handle_stream_event(StreamEvent::HasBytesAvailable);
        assert_eq!(fixes(&mut rx).len(), 1);
    }
}
