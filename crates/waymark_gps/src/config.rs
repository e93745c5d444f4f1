//! Session handler configuration presets.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::nmea::is_command_body;

/// Upper bound for `max_sentence_len`; NMEA 0183 sentences are at most 82 bytes
pub const MAX_SENTENCE_LIMIT: usize = 64 * 1024;

/// Configuration for an external GPS session handler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalGpsConfig {
    /// Accessory protocol strings to open sessions for, in preference order.
    pub protocols: Vec<String>,
    /// Longest sentence accepted, terminator excluded.
    pub max_sentence_len: usize,
    /// Bytes requested per stream read.
    pub read_chunk: usize,
    /// Reject sentences whose `*HH` checksum does not match.
    pub verify_checksum: bool,
    /// Command bodies sent when a session opens, framed as `$body*HH\r\n`.
    pub init_commands: Vec<String>,
}

impl Default for ExternalGpsConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl ExternalGpsConfig {
    /// Standard configuration for NMEA accessories.
    pub fn standard() -> Self {
        Self {
            protocols: vec![
                "com.dualav.xgps150".to_string(),
                "com.garmin.pvt".to_string(),
                "com.bad-elf.gps".to_string(),
            ],
            // NMEA 0183 caps sentences at 82 characters; leave room for
            // receivers that overrun it
            max_sentence_len: 256,
            read_chunk: 1024,
            verify_checksum: true,
            init_commands: Vec::new(),
        }
    }

    /// Lenient configuration for replaying captures of unknown quality.
    pub fn replay() -> Self {
        Self {
            max_sentence_len: 1024,
            read_chunk: 4096,
            verify_checksum: false,
            ..Self::standard()
        }
    }

    /// MediaTek receivers: 1 Hz updates with only RMC and GGA enabled.
    pub fn mediatek() -> Self {
        Self {
            init_commands: vec![
                "PMTK220,1000".to_string(),
                "PMTK314,0,1,0,1,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0".to_string(),
            ],
            ..Self::standard()
        }
    }

    /// Replace the accepted protocol strings.
    pub fn with_protocols<I, S>(mut self, protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.protocols = protocols.into_iter().map(Into::into).collect();
        self
    }

    /// Add a command to send on connect.
    pub fn with_init_command(mut self, body: impl Into<String>) -> Self {
        self.init_commands.push(body.into());
        self
    }

    /// Enable or disable checksum verification.
    pub fn with_checksum(mut self, verify: bool) -> Self {
        self.verify_checksum = verify;
        self
    }

    pub fn with_max_sentence_len(mut self, len: usize) -> Self {
        self.max_sentence_len = len;
        self
    }

    /// Parse from TOML and validate.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocols.is_empty() {
            return Err(ConfigError::Invalid("no accessory protocols configured".into()));
        }
        if self.max_sentence_len == 0 {
            return Err(ConfigError::Invalid("max_sentence_len must be positive".into()));
        }
        if self.max_sentence_len > MAX_SENTENCE_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "max_sentence_len must be at most {}",
                MAX_SENTENCE_LIMIT
            )));
        }
        if self.read_chunk == 0 {
            return Err(ConfigError::Invalid("read_chunk must be positive".into()));
        }
        if let Some(body) = self.init_commands.iter().find(|b| !is_command_body(b)) {
            return Err(ConfigError::Invalid(format!(
                "init command {:?} must be printable ASCII without '$' or '*'",
                body
            )));
        }
        Ok(())
    }
}
