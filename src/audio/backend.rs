use anyhow::Result;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

use super::settings::RecorderSettings;

/// Asynchronous notifications raised by a native recorder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// Recording finished on the device side
    Finished { success: bool },
    /// The encoder failed mid-recording (cause, if the platform supplied one)
    EncodeError(Option<String>),
}

/// A device event tagged with the recorder instance that raised it
#[derive(Debug, Clone)]
pub(crate) struct TaggedDeviceEvent {
    pub generation: u64,
    pub event: DeviceEvent,
}

/// Channel a native recorder uses to report events back to its session
///
/// Safe to use from any thread; events are delivered to the session's own
/// task before any observer sees them.
#[derive(Debug, Clone)]
pub struct DeviceEventSender {
    generation: u64,
    tx: mpsc::UnboundedSender<TaggedDeviceEvent>,
}

impl DeviceEventSender {
    pub(crate) fn new(generation: u64, tx: mpsc::UnboundedSender<TaggedDeviceEvent>) -> Self {
        Self { generation, tx }
    }

    /// Report an event. Returns false if the session is gone.
    pub fn send(&self, event: DeviceEvent) -> bool {
        let sent = self
            .tx
            .send(TaggedDeviceEvent {
                generation: self.generation,
                event,
            })
            .is_ok();

        if !sent {
            debug!("Device event dropped: session no longer running");
        }

        sent
    }
}

/// Platform recording facility: audio-session control plus recorder construction
///
/// Platform-specific implementations wrap the host audio stack; the session
/// only talks to this trait.
pub trait RecorderBackend: Send {
    /// Switch the audio session to a record-capable category and activate it
    fn activate_recording_session(&mut self) -> Result<()>;

    /// Return the audio session to a playback category
    fn deactivate_recording_session(&mut self) -> Result<()>;

    /// Create and prepare a recorder writing to `destination`
    ///
    /// `events` must be used for every asynchronous notification the recorder raises.
    fn prepare(
        &mut self,
        destination: &Path,
        settings: &RecorderSettings,
        events: DeviceEventSender,
    ) -> Result<Box<dyn NativeRecorder>>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// A single prepared native recorder instance
pub trait NativeRecorder: Send {
    /// Begin recording, or resume after `pause`
    fn record(&mut self) -> Result<()>;

    fn pause(&mut self);

    /// Stop and release the output file
    fn stop(&mut self);

    /// Whether the device is actively capturing right now
    fn is_recording(&self) -> bool;

    /// Elapsed time of the current segment (since the last `record` call)
    fn current_time(&self) -> Duration;

    /// Refresh metering values before reading them
    fn update_meters(&mut self);

    /// Average power in dBFS for `channel`
    fn average_power(&self, channel: usize) -> f32;
}
