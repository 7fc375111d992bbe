use std::time::Duration;

use crate::audio::RecorderSettings;

/// Configuration for a recording session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How often elapsed time is polled while recording
    /// Default: 1 second
    pub tick_interval: Duration,

    /// Settings used when `start` is given an empty settings map
    pub default_settings: RecorderSettings,

    /// Capacity of the command mailbox
    pub command_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            default_settings: RecorderSettings::default(),
            command_buffer: 32,
        }
    }
}
