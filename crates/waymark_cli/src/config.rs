//! Waymark configuration file handling
//!
//! `waymark.toml` holds two optional tables:
//! - `[gps]` - accessory protocols, sentence limits, init commands
//! - `[label]` - label font size, colours, halo and placement

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use waymark_gps::ExternalGpsConfig;
use waymark_text::LabelConfig;

pub const CONFIG_FILE: &str = "waymark.toml";

/// Contents of `waymark.toml`
#[derive(Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct WaymarkConfig {
    #[serde(default)]
    pub gps: ExternalGpsConfig,
    #[serde(default)]
    pub label: LabelConfig,
}

impl WaymarkConfig {
    /// Load the configuration
    ///
    /// An explicit path must exist. Without one, `waymark.toml` in the
    /// current directory is used when present, and defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_file(path),
            None => {
                let path = Path::new(CONFIG_FILE);
                if path.exists() {
                    Self::load_file(path)
                } else {
                    tracing::debug!("no {} found, using defaults", CONFIG_FILE);
                    Ok(Self::default())
                }
            }
        }
    }

    fn load_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: WaymarkConfig = toml::from_str(content)?;
        config.gps.validate()?;
        config.label.style()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}
