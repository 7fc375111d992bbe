use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::config::SessionConfig;
use super::observer::{Notification, Observers, RecorderCallbacks, RecorderDelegate};
use super::state::{RecorderError, RecorderState};
use super::stats::SessionSnapshot;
use crate::audio::{
    AssetPath, DeviceEvent, DeviceEventSender, NativeRecorder, RecorderBackend, RecorderSettings,
    TaggedDeviceEvent,
};
use crate::permission::{self, PermissionAuthority};

const SESSION_GONE: &str = "Recording session is no longer running";

type Ack = oneshot::Sender<()>;

/// Commands accepted by the session task
enum Command {
    Start {
        destination: AssetPath,
        settings: RecorderSettings,
        ack: Ack,
    },
    CheckPermission {
        reply: oneshot::Sender<bool>,
    },
    TryStartRecord {
        ack: Ack,
    },
    TryContinueRecord {
        ack: Ack,
    },
    PauseRecord {
        ack: Ack,
    },
    PauseOrContinueRecord {
        ack: Ack,
    },
    StopRecording {
        ack: Ack,
    },
    SetDelegate {
        delegate: Option<Box<dyn RecorderDelegate>>,
        ack: Ack,
    },
    SetCallbacks {
        callbacks: Option<RecorderCallbacks>,
        ack: Ack,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Shutdown {
        ack: Ack,
    },
}

/// Operation waiting on a permission answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gated {
    Start,
    Continue,
}

/// Asynchronous results marshalled back onto the session task
#[derive(Debug)]
enum Internal {
    PermissionResolved { action: Gated, granted: bool },
}

enum Step {
    Tick,
    Device(TaggedDeviceEvent),
    Internal(Internal),
    Command(Command),
    Closed,
}

/// A recording session wrapping one native recorder at a time
///
/// The session runs as a task that owns all of its state. Commands, device
/// callbacks, permission answers and timer ticks are all processed on that
/// task, so observers are never invoked concurrently or from a platform thread.
pub struct RecordingSession {
    session_id: String,
    config: SessionConfig,
    backend: Box<dyn RecorderBackend>,
    authority: Arc<dyn PermissionAuthority>,
    observers: Observers,

    state: RecorderState,
    destination: Option<AssetPath>,
    settings: RecorderSettings,
    /// Recorded time from completed segments
    accumulated: Duration,
    started_at: Option<DateTime<Utc>>,

    recorder: Option<Box<dyn NativeRecorder>>,
    /// Identifies the current recorder instance in device events
    generation: u64,
    /// Elapsed-time timer, armed only while recording
    timer: Option<Interval>,

    device_tx: mpsc::UnboundedSender<TaggedDeviceEvent>,
    device_rx: mpsc::UnboundedReceiver<TaggedDeviceEvent>,
    internal_tx: mpsc::UnboundedSender<Internal>,
    internal_rx: mpsc::UnboundedReceiver<Internal>,
}

impl RecordingSession {
    /// Create a new recording session. Call `spawn` to run it.
    pub fn new(
        backend: Box<dyn RecorderBackend>,
        authority: Arc<dyn PermissionAuthority>,
        config: SessionConfig,
    ) -> Self {
        let session_id = format!("session-{}", uuid::Uuid::new_v4());
        info!(
            "Creating recording session: {} (backend: {})",
            session_id,
            backend.name()
        );

        let (device_tx, device_rx) = mpsc::unbounded_channel();
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let settings = config.default_settings.clone();

        Self {
            session_id,
            config,
            backend,
            authority,
            observers: Observers::default(),
            state: RecorderState::Stopped,
            destination: None,
            settings,
            accumulated: Duration::ZERO,
            started_at: None,
            recorder: None,
            generation: 0,
            timer: None,
            device_tx,
            device_rx,
            internal_tx,
            internal_rx,
        }
    }

    pub fn with_delegate(mut self, delegate: impl RecorderDelegate + 'static) -> Self {
        self.observers.set_delegate(Some(Box::new(delegate)));
        self
    }

    pub fn with_callbacks(mut self, callbacks: RecorderCallbacks) -> Self {
        self.observers.set_callbacks(Some(callbacks));
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Run the session on the current tokio runtime
    pub fn spawn(self) -> SessionHandle {
        let (tx, rx) = mpsc::channel(self.config.command_buffer.max(1));
        let session_id: Arc<str> = Arc::from(self.session_id.as_str());
        let span = info_span!("recording_session", session_id = %session_id);

        tokio::spawn(self.run(rx).instrument(span));

        SessionHandle { tx, session_id }
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        info!("Recording session task started");

        loop {
            let step = tokio::select! {
                biased;
                _ = next_tick(&mut self.timer) => Step::Tick,
                Some(event) = self.device_rx.recv() => Step::Device(event),
                Some(msg) = self.internal_rx.recv() => Step::Internal(msg),
                command = commands.recv() => match command {
                    Some(command) => Step::Command(command),
                    None => Step::Closed,
                },
            };

            match step {
                Step::Tick => self.on_tick(),
                Step::Device(event) => self.on_device_event(event),
                Step::Internal(msg) => self.on_internal(msg),
                Step::Command(command) => {
                    if !self.handle_command(command) {
                        break;
                    }
                }
                Step::Closed => {
                    debug!("All session handles dropped");
                    self.teardown();
                    break;
                }
            }
        }

        info!("Recording session task stopped");
    }

    /// Apply a command. Returns false once the session should end.
    fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Start {
                destination,
                settings,
                ack,
            } => {
                self.start(destination, settings);
                let _ = ack.send(());
            }
            Command::CheckPermission { reply } => {
                permission::check_permission(&self.authority, move |granted| {
                    let _ = reply.send(granted);
                });
            }
            Command::TryStartRecord { ack } => {
                self.request_gated(Gated::Start);
                let _ = ack.send(());
            }
            Command::TryContinueRecord { ack } => {
                self.request_gated(Gated::Continue);
                let _ = ack.send(());
            }
            Command::PauseRecord { ack } => {
                self.pause_record();
                let _ = ack.send(());
            }
            Command::PauseOrContinueRecord { ack } => {
                self.pause_or_continue_record();
                let _ = ack.send(());
            }
            Command::StopRecording { ack } => {
                self.stop_recording();
                let _ = ack.send(());
            }
            Command::SetDelegate { delegate, ack } => {
                self.observers.set_delegate(delegate);
                let _ = ack.send(());
            }
            Command::SetCallbacks { callbacks, ack } => {
                self.observers.set_callbacks(callbacks);
                let _ = ack.send(());
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            Command::Shutdown { ack } => {
                self.teardown();
                let _ = ack.send(());
                return false;
            }
        }

        true
    }

    /// Store destination and settings. No device or permission interaction.
    fn start(&mut self, destination: AssetPath, settings: RecorderSettings) {
        info!("Configuring destination: {:?}", destination);

        self.settings = settings.or_defaults(&self.config.default_settings);
        self.destination = Some(destination);
        self.accumulated = Duration::ZERO;
    }

    /// Check permission, then run `action` if granted
    ///
    /// Every answer goes through the internal mailbox. Answers the platform
    /// gives synchronously are drained before returning, so a granted start
    /// completes within the command that asked for it.
    fn request_gated(&mut self, action: Gated) {
        let internal_tx = self.internal_tx.clone();
        permission::check_permission(&self.authority, move |granted| {
            let _ = internal_tx.send(Internal::PermissionResolved { action, granted });
        });

        while let Ok(msg) = self.internal_rx.try_recv() {
            self.on_internal(msg);
        }
    }

    fn on_internal(&mut self, msg: Internal) {
        match msg {
            Internal::PermissionResolved { action, granted } => {
                if !granted {
                    warn!("Microphone permission denied ({:?} not attempted)", action);
                    self.state = RecorderState::Denied;
                    self.observers
                        .notify(Notification::State(RecorderState::Denied));
                    return;
                }

                match action {
                    Gated::Start => self.start_recording(),
                    Gated::Continue => self.resume_recording(),
                }
            }
        }
    }

    fn start_recording(&mut self) {
        let Some(destination) = self.destination.as_ref() else {
            warn!("Cannot start recording: no destination configured");
            self.observers
                .notify(Notification::Error(RecorderError::MissingFilePath));
            return;
        };
        let path = destination.resolve();

        // A new recorder starts a new recording; earlier segments no longer count
        if self.recorder.is_some() {
            warn!("Releasing a recorder left over from a previous recording");
            self.release_recorder();
            self.disarm_timer();
            self.accumulated = Duration::ZERO;
            self.started_at = None;
        }

        info!("Starting recording to {}", path.display());

        if let Err(e) = self.open_recorder(&path) {
            error!("Failed to start recording: {:#}", e);
            self.stop_recording();
            self.observers
                .notify(Notification::Error(RecorderError::FailedStartAudioSession));
            return;
        }

        // Mark as recording
        self.arm_timer();
        self.state = RecorderState::Recording;
        self.started_at = Some(Utc::now());

        info!("Recording started");

        self.observers.notify(Notification::Start);
        self.observers
            .notify(Notification::State(RecorderState::Recording));
    }

    /// Activate the audio session, prepare a recorder and begin recording
    ///
    /// The recorder is stored before `record` is called so a failure can be
    /// cleaned up by the stop path.
    fn open_recorder(&mut self, path: &Path) -> Result<()> {
        // Switch the audio session to recording
        self.backend
            .activate_recording_session()
            .context("Failed to activate recording audio session")?;

        // Tag events so a released recorder can't reach this one
        self.generation += 1;
        let events = DeviceEventSender::new(self.generation, self.device_tx.clone());

        let recorder = self
            .backend
            .prepare(path, &self.settings, events)
            .context("Failed to prepare native recorder")?;

        // Begin capture
        self.recorder
            .insert(recorder)
            .record()
            .context("Native recorder failed to begin recording")?;

        Ok(())
    }

    fn resume_recording(&mut self) {
        let Some(recorder) = self.recorder.as_mut() else {
            warn!("Cannot continue recording: no paused recorder");
            return;
        };

        if recorder.is_recording() {
            debug!("Continue ignored: already recording");
            return;
        }

        info!("Continuing recording");

        if let Err(e) = recorder.record() {
            error!("Failed to continue recording: {:#}", e);
            self.stop_recording();
            self.observers
                .notify(Notification::Error(RecorderError::FailedStartAudioSession));
            return;
        }

        self.arm_timer();
        self.state = RecorderState::Recording;

        self.observers
            .notify(Notification::State(RecorderState::Recording));
        self.observers
            .notify(Notification::State(RecorderState::Continued));
    }

    fn pause_record(&mut self) {
        match self.recorder.as_mut() {
            Some(recorder) if recorder.is_recording() => {
                recorder.pause();
                let segment = recorder.current_time();
                self.accumulated += segment;
                self.disarm_timer();
                self.state = RecorderState::Paused;

                info!(
                    "Recording paused (segment {:.1}s, total {:.1}s)",
                    segment.as_secs_f64(),
                    self.accumulated.as_secs_f64()
                );

                self.observers
                    .notify(Notification::State(RecorderState::Paused));
            }
            _ => {
                debug!("Pause ignored: not recording");
                self.disarm_timer();
            }
        }
    }

    fn pause_or_continue_record(&mut self) {
        let recording = self
            .recorder
            .as_ref()
            .is_some_and(|recorder| recorder.is_recording());

        if recording {
            self.pause_record();
        } else {
            self.resume_recording();
        }
    }

    /// Release the recorder and return to `Stopped`. Safe to call at any time.
    fn stop_recording(&mut self) {
        info!("Stopping recording");

        self.release_recorder();
        self.disarm_timer();

        // Hand the audio session back to playback
        if let Err(e) = self.backend.deactivate_recording_session() {
            warn!("Failed to restore playback audio session: {:#}", e);
        }

        // Forget the finished recording
        self.destination = None;
        self.accumulated = Duration::ZERO;
        self.started_at = None;
        self.state = RecorderState::Stopped;

        self.observers.notify(Notification::Finish);
        self.observers
            .notify(Notification::State(RecorderState::Stopped));
    }

    fn release_recorder(&mut self) {
        if let Some(mut recorder) = self.recorder.take() {
            recorder.stop();
            debug!("Native recorder released");
        }
    }

    fn on_tick(&mut self) {
        debug_assert!(
            self.recorder.is_some(),
            "elapsed-time timer fired after the recorder was released"
        );

        let Some(recorder) = self.recorder.as_mut() else {
            error!("Elapsed-time timer fired without a live recorder");
            self.disarm_timer();
            return;
        };

        if !recorder.is_recording() {
            debug!("Recorder no longer recording, disarming timer");
            self.disarm_timer();
            return;
        }

        recorder.update_meters();
        let average_power = recorder.average_power(0);
        let total = recorder.current_time() + self.accumulated;

        debug!(
            "Elapsed {:.1}s (average power {:.1} dB)",
            total.as_secs_f64(),
            average_power
        );

        self.observers
            .notify(Notification::Time(total.as_secs_f64()));
    }

    fn on_device_event(&mut self, tagged: TaggedDeviceEvent) {
        if tagged.generation != self.generation || self.recorder.is_none() {
            debug!(
                "Ignoring event from released recorder #{}: {:?}",
                tagged.generation, tagged.event
            );
            return;
        }

        match tagged.event {
            DeviceEvent::EncodeError(cause) => {
                error!("Recorder encode error: {:?}", cause);
                self.stop_recording();
                self.observers
                    .notify(Notification::Error(RecorderError::from_device_cause(cause)));
            }
            DeviceEvent::Finished { success: false } => {
                // Unsuccessful finish stops the session without reporting an error
                warn!("Recorder finished unsuccessfully");
                self.stop_recording();
            }
            DeviceEvent::Finished { success: true } => {
                debug!("Recorder finished successfully");
            }
        }
    }

    fn arm_timer(&mut self) {
        let period = self.config.tick_interval.max(Duration::from_millis(1));
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.timer = Some(interval);
    }

    fn disarm_timer(&mut self) {
        if self.timer.take().is_some() {
            debug!("Elapsed-time timer disarmed");
        }
    }

    fn teardown(&mut self) {
        if self.recorder.is_some() {
            info!("Session shutting down with a live recorder");
            self.stop_recording();
        }
        self.disarm_timer();
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id.clone(),
            state: self.state,
            destination: self.destination.as_ref().map(AssetPath::resolve),
            accumulated_secs: self.accumulated.as_secs_f64(),
            started_at: self.started_at,
            recorder_live: self.recorder.is_some(),
            timer_armed: self.timer.is_some(),
        }
    }
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Cloneable handle to a running `RecordingSession`
///
/// Each method returns once the session has applied the command and
/// delivered the resulting notifications. Failures are reported to observers;
/// an `Err` here only means the session task has ended.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<Command>,
    session_id: Arc<str>,
}

impl SessionHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn call<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(make(tx))
            .await
            .map_err(|_| anyhow!(SESSION_GONE))?;
        rx.await.context(SESSION_GONE)
    }

    /// Configure destination and settings (empty settings select the defaults)
    pub async fn start(&self, destination: AssetPath, settings: RecorderSettings) -> Result<()> {
        self.call(|ack| Command::Start {
            destination,
            settings,
            ack,
        })
        .await
    }

    /// Configure a destination with the default settings
    pub async fn start_with_defaults(&self, destination: AssetPath) -> Result<()> {
        self.start(destination, RecorderSettings::empty()).await
    }

    /// Resolve the microphone permission, prompting if undetermined
    pub async fn check_permission(&self) -> Result<bool> {
        self.call(|reply| Command::CheckPermission { reply }).await
    }

    /// Start recording if permission allows
    ///
    /// When the permission is undetermined this returns before the user
    /// answers; the outcome arrives through the observers.
    pub async fn try_start_record(&self) -> Result<()> {
        self.call(|ack| Command::TryStartRecord { ack }).await
    }

    /// Resume a paused recording if permission allows
    pub async fn try_continue_record(&self) -> Result<()> {
        self.call(|ack| Command::TryContinueRecord { ack }).await
    }

    pub async fn pause_record(&self) -> Result<()> {
        self.call(|ack| Command::PauseRecord { ack }).await
    }

    /// Pause when recording, otherwise continue
    pub async fn pause_or_continue_record(&self) -> Result<()> {
        self.call(|ack| Command::PauseOrContinueRecord { ack }).await
    }

    pub async fn stop_recording(&self) -> Result<()> {
        self.call(|ack| Command::StopRecording { ack }).await
    }

    pub async fn set_delegate(&self, delegate: impl RecorderDelegate + 'static) -> Result<()> {
        let delegate: Box<dyn RecorderDelegate> = Box::new(delegate);
        self.call(|ack| Command::SetDelegate {
            delegate: Some(delegate),
            ack,
        })
        .await
    }

    pub async fn set_callbacks(&self, callbacks: RecorderCallbacks) -> Result<()> {
        self.call(|ack| Command::SetCallbacks {
            callbacks: Some(callbacks),
            ack,
        })
        .await
    }

    /// Remove both the delegate and the callbacks
    pub async fn clear_observers(&self) -> Result<()> {
        self.call(|ack| Command::SetDelegate {
            delegate: None,
            ack,
        })
        .await?;
        self.call(|ack| Command::SetCallbacks {
            callbacks: None,
            ack,
        })
        .await
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        self.call(|reply| Command::Snapshot { reply }).await
    }

    /// Stop any recording and end the session task
    pub async fn shutdown(&self) -> Result<()> {
        self.call(|ack| Command::Shutdown { ack }).await
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("session_id", &self.session_id)
            .finish()
    }
}
