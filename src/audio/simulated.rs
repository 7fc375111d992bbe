// In-process stand-in for a platform recorder
//
// Nothing is captured or encoded. The recorder only keeps time (using the
// tokio clock, so paused-clock tests see exact values) and exposes hooks to
// inject failures and device events.

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

use super::backend::{DeviceEvent, DeviceEventSender, NativeRecorder, RecorderBackend};
use super::settings::RecorderSettings;

const SILENCE_DB: f32 = -160.0;

#[derive(Debug)]
struct Shared {
    session_active: bool,
    fail_activation: bool,
    fail_prepare: bool,
    fail_record: bool,
    halted: bool,
    prepare_count: usize,
    record_calls: usize,
    live_recorders: usize,
    last_destination: Option<PathBuf>,
    last_settings: Option<RecorderSettings>,
    events: Option<DeviceEventSender>,
}

impl Default for Shared {
    fn default() -> Self {
        Self {
            session_active: false,
            fail_activation: false,
            fail_prepare: false,
            fail_record: false,
            halted: false,
            prepare_count: 0,
            record_calls: 0,
            live_recorders: 0,
            last_destination: None,
            last_settings: None,
            events: None,
        }
    }
}

/// Simulated recording backend
///
/// Clones share state, so a test can keep one clone for inspection while the
/// session owns another.
#[derive(Debug, Clone, Default)]
pub struct SimulatedBackend {
    shared: Arc<Mutex<Shared>>,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        lock_shared(&self.shared)
    }

    /// Make the next audio-session activation fail
    pub fn set_fail_activation(&self, fail: bool) {
        self.lock().fail_activation = fail;
    }

    /// Make recorder construction fail
    pub fn set_fail_prepare(&self, fail: bool) {
        self.lock().fail_prepare = fail;
    }

    /// Make `record` fail on prepared recorders
    pub fn set_fail_record(&self, fail: bool) {
        self.lock().fail_record = fail;
    }

    /// Make the live recorder report not-recording without raising any event
    pub fn halt(&self) {
        self.lock().halted = true;
    }

    /// Raise a device event from the most recently prepared recorder
    pub fn emit(&self, event: DeviceEvent) -> bool {
        let events = self.lock().events.clone();
        match events {
            Some(events) => events.send(event),
            None => false,
        }
    }

    pub fn is_session_active(&self) -> bool {
        self.lock().session_active
    }

    pub fn prepare_count(&self) -> usize {
        self.lock().prepare_count
    }

    /// Number of `record` calls (starts and resumes)
    pub fn record_calls(&self) -> usize {
        self.lock().record_calls
    }

    /// Recorder instances not yet dropped
    pub fn live_recorders(&self) -> usize {
        self.lock().live_recorders
    }

    pub fn last_destination(&self) -> Option<PathBuf> {
        self.lock().last_destination.clone()
    }

    pub fn last_settings(&self) -> Option<RecorderSettings> {
        self.lock().last_settings.clone()
    }
}

impl RecorderBackend for SimulatedBackend {
    fn activate_recording_session(&mut self) -> Result<()> {
        let mut shared = self.lock();
        if shared.fail_activation {
            bail!("Audio session is held by another application");
        }
        shared.session_active = true;
        Ok(())
    }

    fn deactivate_recording_session(&mut self) -> Result<()> {
        self.lock().session_active = false;
        Ok(())
    }

    fn prepare(
        &mut self,
        destination: &Path,
        settings: &RecorderSettings,
        events: DeviceEventSender,
    ) -> Result<Box<dyn NativeRecorder>> {
        let mut shared = self.lock();
        shared.prepare_count += 1;
        if shared.fail_prepare {
            bail!("Failed to prepare recorder for {}", destination.display());
        }

        shared.live_recorders += 1;
        shared.halted = false;
        shared.last_destination = Some(destination.to_path_buf());
        shared.last_settings = Some(settings.clone());
        shared.events = Some(events);

        info!("Simulated recorder prepared for {}", destination.display());

        Ok(Box::new(SimulatedRecorder {
            shared: Arc::clone(&self.shared),
            segment_start: None,
            paused_at: Duration::ZERO,
        }))
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

struct SimulatedRecorder {
    shared: Arc<Mutex<Shared>>,
    /// Start of the running segment, `None` while paused or stopped
    segment_start: Option<Instant>,
    /// Segment length frozen at the last pause
    paused_at: Duration,
}

impl NativeRecorder for SimulatedRecorder {
    fn record(&mut self) -> Result<()> {
        let mut shared = lock_shared(&self.shared);
        if shared.fail_record {
            bail!("Recorder refused to start");
        }
        shared.record_calls += 1;
        self.segment_start = Some(Instant::now());
        self.paused_at = Duration::ZERO;
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(start) = self.segment_start.take() {
            self.paused_at = start.elapsed();
        }
    }

    fn stop(&mut self) {
        self.segment_start = None;
        self.paused_at = Duration::ZERO;
    }

    fn is_recording(&self) -> bool {
        self.segment_start.is_some() && !lock_shared(&self.shared).halted
    }

    fn current_time(&self) -> Duration {
        match self.segment_start {
            Some(start) => start.elapsed(),
            None => self.paused_at,
        }
    }

    fn update_meters(&mut self) {}

    fn average_power(&self, _channel: usize) -> f32 {
        SILENCE_DB
    }
}

impl Drop for SimulatedRecorder {
    fn drop(&mut self) {
        let mut shared = lock_shared(&self.shared);
        shared.live_recorders = shared.live_recorders.saturating_sub(1);
    }
}

fn lock_shared(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}
