use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::Level;

use crate::audio::settings::{self, RecorderSettings};
use crate::session::SessionConfig;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub recorder: RecorderConfig,
    pub session: SessionSection,
    pub logging: LoggingConfig,
}

/// Default recorder settings, used when `start` gets an empty map
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    pub format_id: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub encoder_quality: String,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            format_id: "aac".to_string(),
            sample_rate: 12000,
            channels: 1,
            encoder_quality: "high".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    pub tick_interval_ms: u64,
    pub command_buffer: usize,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            command_buffer: 32,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration; the file must exist
    pub fn load(path: &str) -> Result<Self> {
        Self::build(path, true)
    }

    /// Load configuration, falling back to defaults when the file is absent
    pub fn load_or_default(path: &str) -> Result<Self> {
        Self::build(path, false)
    }

    fn build(path: &str, required: bool) -> Result<Self> {
        let source = config::Config::builder()
            .add_source(config::File::with_name(path).required(required))
            .build()
            .with_context(|| format!("Failed to read config from {}", path))?;

        source
            .try_deserialize()
            .with_context(|| format!("Invalid config in {}", path))
    }

    pub fn recorder_settings(&self) -> RecorderSettings {
        RecorderSettings::empty()
            .with(settings::FORMAT_ID, self.recorder.format_id.as_str())
            .with(settings::SAMPLE_RATE, self.recorder.sample_rate)
            .with(settings::CHANNELS, self.recorder.channels)
            .with(settings::ENCODER_QUALITY, self.recorder.encoder_quality.as_str())
    }

    pub fn to_session_config(&self) -> SessionConfig {
        SessionConfig {
            tick_interval: Duration::from_millis(self.session.tick_interval_ms.max(1)),
            default_settings: self.recorder_settings(),
            command_buffer: self.session.command_buffer.max(1),
        }
    }

    pub fn log_level(&self) -> Result<Level> {
        self.logging
            .level
            .parse::<Level>()
            .with_context(|| format!("Unknown log level: {}", self.logging.level))
    }
}
