use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Well-known setting keys understood by native recorders
pub const FORMAT_ID: &str = "format_id";
pub const SAMPLE_RATE: &str = "sample_rate";
pub const CHANNELS: &str = "channels";
pub const ENCODER_QUALITY: &str = "encoder_quality";

/// Recorder configuration handed to the native device
///
/// Values are opaque to the session and passed through untouched.
/// Unknown keys are allowed and forwarded as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecorderSettings(BTreeMap<String, Value>);

impl RecorderSettings {
    /// An empty settings map (the session substitutes its defaults for it)
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn format_id(&self) -> Option<&str> {
        self.get(FORMAT_ID).and_then(Value::as_str)
    }

    pub fn sample_rate(&self) -> Option<u64> {
        self.get(SAMPLE_RATE).and_then(Value::as_u64)
    }

    pub fn channels(&self) -> Option<u64> {
        self.get(CHANNELS).and_then(Value::as_u64)
    }

    pub fn encoder_quality(&self) -> Option<&str> {
        self.get(ENCODER_QUALITY).and_then(Value::as_str)
    }

    /// Returns `self`, or `fallback` when no setting was supplied
    pub fn or_defaults(self, fallback: &RecorderSettings) -> Self {
        if self.is_empty() {
            fallback.clone()
        } else {
            self
        }
    }
}

impl Default for RecorderSettings {
    /// Voice-memo defaults: AAC, 12kHz, mono, high encoder quality
    fn default() -> Self {
        Self::empty()
            .with(FORMAT_ID, "aac")
            .with(SAMPLE_RATE, 12000)
            .with(CHANNELS, 1)
            .with(ENCODER_QUALITY, "high")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = RecorderSettings::default();

        assert_eq!(settings.format_id(), Some("aac"));
        assert_eq!(settings.sample_rate(), Some(12000));
        assert_eq!(settings.channels(), Some(1));
        assert_eq!(settings.encoder_quality(), Some("high"));
        assert_eq!(settings.len(), 4);
    }

    #[test]
    fn test_empty_settings_fall_back() {
        let fallback = RecorderSettings::default();
        let resolved = RecorderSettings::empty().or_defaults(&fallback);

        assert_eq!(resolved, fallback);
    }

    #[test]
    fn test_supplied_settings_are_kept_verbatim() {
        // No merging with defaults: a caller-supplied map replaces them entirely
        let custom = RecorderSettings::empty()
            .with(SAMPLE_RATE, 44100)
            .with("vendor_flag", true);
        let resolved = custom.clone().or_defaults(&RecorderSettings::default());

        assert_eq!(resolved, custom);
        assert_eq!(resolved.format_id(), None);
        assert_eq!(resolved.get("vendor_flag"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_settings_serialize_as_plain_map() {
        let settings = RecorderSettings::empty().with(CHANNELS, 2);
        let json = serde_json::to_string(&settings).unwrap();

        assert_eq!(json, r#"{"channels":2}"#);
    }
}
