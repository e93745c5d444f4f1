//! Error types for the GPS session handler.

use thiserror::Error;

/// Why a single NMEA sentence was rejected
///
/// None of these are fatal to a session; the sentence is dropped and the
/// stream carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NmeaError {
    #[error("sentence does not start with '$'")]
    MissingStart,

    #[error("sentence is not valid UTF-8")]
    InvalidUtf8,

    #[error("malformed checksum field {0:?}")]
    MalformedChecksum(String),

    #[error("checksum mismatch: sentence says {expected:02X}, computed {computed:02X}")]
    ChecksumMismatch { expected: u8, computed: u8 },

    #[error("unsupported sentence type {0:?}")]
    Unsupported(String),

    #[error("{kind} sentence has {found} fields, needs {needed}")]
    TooFewFields {
        kind: &'static str,
        found: usize,
        needed: usize,
    },

    #[error("invalid {field} field {value:?}")]
    InvalidField { field: &'static str, value: String },

    #[error("sentence carries no position fix")]
    NoFix,
}

/// Session handler errors
#[derive(Debug, Error)]
pub enum GpsError {
    #[error("no accessory session is open")]
    NotConnected,

    #[error("invalid command {0:?}: must be printable ASCII without '$', '*' or line breaks")]
    InvalidCommand(String),

    #[error("stream I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, GpsError>;
