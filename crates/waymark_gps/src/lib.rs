//! External GPS accessory sessions for Waymark
//!
//! [`ExternalGps`] owns the byte stream to a paired GPS accessory. It walks the
//! `Disconnected -> Connecting -> Connected` lifecycle as the platform reports
//! accessory and stream events, reassembles NMEA sentences from arbitrary
//! read chunks, parses them into [`LocationFix`]es and hands the fixes to
//! subscribers. Outbound configuration commands are checksummed, buffered and
//! written as the stream makes room.
//!
//! # Example
//!
//! ```
//! use waymark_gps::{
//!     AccessoryInfo, ExternalGps, ExternalGpsConfig, GpsEvent, MemoryFactory, StreamEvent,
//! };
//!
//! let config = ExternalGpsConfig::standard().with_protocols(["com.example.nmea"]);
//! let mut gps = ExternalGps::new(config, MemoryFactory::new());
//! let mut events = gps.subscribe();
//!
//! gps.accessory_connected(AccessoryInfo::new(1, "GPS").with_protocol("com.example.nmea"));
//! let accessory = gps.factory().last_handle().unwrap().clone();
//!
//! accessory.feed(b"$GPGLL,4916.45,N,12311.12,W,225444,A,*1D\r\n");
//! gps.handle_stream_event(StreamEvent::HasBytesAvailable);
//!
//! assert!(matches!(events.try_recv(), Ok(GpsEvent::Connected(_))));
//! let Ok(GpsEvent::Fix(fix)) = events.try_recv() else { panic!("expected a fix") };
//! assert!(fix.longitude < 0.0);
//! ```

pub mod buffer;
pub mod config;
pub mod error;
pub mod nmea;
pub mod session;
pub mod stream;

pub use buffer::{OutputBuffer, SentenceBuffer};
pub use config::{ExternalGpsConfig, MAX_SENTENCE_LIMIT};
pub use error::{ConfigError, GpsError, NmeaError, Result};
pub use nmea::{
    checksum, frame_command, is_command_body, parse_sentence, Date, FixQuality, LocationFix,
    SentenceKind, UtcTime,
};
pub use session::{ConnectionState, ExternalGps, GpsEvent, SessionStats};
pub use stream::{
    AccessoryInfo, AccessoryStream, MemoryFactory, MemoryHandle, MemoryStream, SessionFactory,
    StreamEvent,
};
