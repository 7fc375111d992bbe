use tracing::debug;

use super::state::{RecorderError, RecorderState};

/// Delegate-style observer
///
/// All methods default to no-ops so implementors only override what they use.
/// Called from the session task, one event at a time.
pub trait RecorderDelegate: Send {
    fn on_start(&mut self) {}

    fn on_finish(&mut self) {}

    fn on_state_change(&mut self, _state: RecorderState) {}

    /// Total recorded seconds, including earlier segments
    fn on_time_update(&mut self, _seconds: f64) {}

    fn on_error(&mut self, _error: &RecorderError) {}
}

type EventCallback = Box<dyn FnMut() + Send>;
type StateCallback = Box<dyn FnMut(RecorderState) + Send>;
type TimeCallback = Box<dyn FnMut(f64) + Send>;
type ErrorCallback = Box<dyn FnMut(&RecorderError) + Send>;

/// Independently registered callback functions
///
/// Registered next to (not instead of) a delegate: when both are present both
/// receive every event, delegate first.
#[derive(Default)]
pub struct RecorderCallbacks {
    on_start: Option<EventCallback>,
    on_finish: Option<EventCallback>,
    on_state_change: Option<StateCallback>,
    on_time_update: Option<TimeCallback>,
    on_error: Option<ErrorCallback>,
}

impl RecorderCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_start(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.on_start = Some(Box::new(f));
        self
    }

    pub fn on_finish(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.on_finish = Some(Box::new(f));
        self
    }

    pub fn on_state_change(mut self, f: impl FnMut(RecorderState) + Send + 'static) -> Self {
        self.on_state_change = Some(Box::new(f));
        self
    }

    pub fn on_time_update(mut self, f: impl FnMut(f64) + Send + 'static) -> Self {
        self.on_time_update = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnMut(&RecorderError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }
}

impl std::fmt::Debug for RecorderCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecorderCallbacks")
            .field("on_start", &self.on_start.is_some())
            .field("on_finish", &self.on_finish.is_some())
            .field("on_state_change", &self.on_state_change.is_some())
            .field("on_time_update", &self.on_time_update.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// A single event fanned out to observers
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Notification {
    Start,
    Finish,
    State(RecorderState),
    Time(f64),
    Error(RecorderError),
}

/// The two observer slots of a session
#[derive(Default)]
pub(crate) struct Observers {
    delegate: Option<Box<dyn RecorderDelegate>>,
    callbacks: Option<RecorderCallbacks>,
}

impl Observers {
    pub fn set_delegate(&mut self, delegate: Option<Box<dyn RecorderDelegate>>) {
        self.delegate = delegate;
    }

    pub fn set_callbacks(&mut self, callbacks: Option<RecorderCallbacks>) {
        self.callbacks = callbacks;
    }

    pub fn notify(&mut self, notification: Notification) {
        debug!("Notifying observers: {:?}", notification);

        if let Some(delegate) = self.delegate.as_mut() {
            match &notification {
                Notification::Start => delegate.on_start(),
                Notification::Finish => delegate.on_finish(),
                Notification::State(state) => delegate.on_state_change(*state),
                Notification::Time(seconds) => delegate.on_time_update(*seconds),
                Notification::Error(error) => delegate.on_error(error),
            }
        }

        if let Some(callbacks) = self.callbacks.as_mut() {
            match &notification {
                Notification::Start => {
                    if let Some(f) = callbacks.on_start.as_mut() {
                        f();
                    }
                }
                Notification::Finish => {
                    if let Some(f) = callbacks.on_finish.as_mut() {
                        f();
                    }
                }
                Notification::State(state) => {
                    if let Some(f) = callbacks.on_state_change.as_mut() {
                        f(*state);
                    }
                }
                Notification::Time(seconds) => {
                    if let Some(f) = callbacks.on_time_update.as_mut() {
                        f(*seconds);
                    }
                }
                Notification::Error(error) => {
                    if let Some(f) = callbacks.on_error.as_mut() {
                        f(error);
                    }
                }
            }
        }
    }
}
