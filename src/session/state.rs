use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Recording phase reported to observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecorderState {
    Recording,
    Stopped,
    /// Microphone permission was refused
    Denied,
    Paused,
    /// Emitted right after `Recording` when resuming from `Paused`. Never persisted.
    Continued,
}

impl RecorderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecorderState::Recording => "recording",
            RecorderState::Stopped => "stopped",
            RecorderState::Denied => "denied",
            RecorderState::Paused => "paused",
            RecorderState::Continued => "continued",
        }
    }
}

impl Default for RecorderState {
    fn default() -> Self {
        Self::Stopped
    }
}

impl std::fmt::Display for RecorderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures delivered to observers
///
/// Every error except `MissingFilePath` leaves the session stopped, so `start`
/// can be retried. `MissingFilePath` changes no state.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum RecorderError {
    #[error("No destination configured; call start(path) before recording")]
    MissingFilePath,

    #[error("Recorder reported an error: {0}")]
    SystemError(String),

    #[error("Failed to start the recording audio session")]
    FailedStartAudioSession,

    #[error("Unknown recorder error")]
    Unknown,
}

impl RecorderError {
    /// Map a device encode failure to the observer-facing error
    pub fn from_device_cause(cause: Option<String>) -> Self {
        match cause {
            Some(cause) => RecorderError::SystemError(cause),
            None => RecorderError::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_stopped() {
        assert_eq!(RecorderState::default(), RecorderState::Stopped);
    }

    #[test]
    fn test_state_serializes_lowercase() {
        let json = serde_json::to_string(&RecorderState::Continued).unwrap();
        assert_eq!(json, r#""continued""#);
        assert_eq!(RecorderState::Paused.to_string(), "paused");
    }

    #[test]
    fn test_device_cause_mapping() {
        assert_eq!(
            RecorderError::from_device_cause(Some("disk full".to_string())),
            RecorderError::SystemError("disk full".to_string())
        );
        assert_eq!(RecorderError::from_device_cause(None), RecorderError::Unknown);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            RecorderError::SystemError("codec".to_string()).to_string(),
            "Recorder reported an error: codec"
        );
        assert!(RecorderError::MissingFilePath.to_string().contains("start(path)"));
    }
}
