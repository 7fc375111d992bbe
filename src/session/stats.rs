use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::state::RecorderState;

/// Point-in-time view of a recording session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Session identifier used in logs
    pub session_id: String,

    /// Last persisted state (`Continued` is never reported here)
    pub state: RecorderState,

    /// Resolved destination, if `start` has been called since the last stop
    pub destination: Option<PathBuf>,

    /// Recorded seconds from completed segments (excludes the running one)
    pub accumulated_secs: f64,

    /// When the current recording began, if one is in progress
    pub started_at: Option<DateTime<Utc>>,

    /// Whether a native recorder instance is currently held
    pub recorder_live: bool,

    /// Whether the elapsed-time timer is armed
    pub timer_armed: bool,
}
