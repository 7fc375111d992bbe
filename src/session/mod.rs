//! Recording session management
//!
//! This module provides the `RecordingSession` abstraction that manages:
//! - Destination and recorder settings
//! - Permission-gated start and continue
//! - Pause/continue with accumulated elapsed time
//! - A 1 Hz elapsed-time timer while recording
//! - Observer notification (delegate and callback slots)

mod config;
mod observer;
mod session;
mod state;
mod stats;

pub use config::SessionConfig;
pub use observer::{RecorderCallbacks, RecorderDelegate};
pub use session::{RecordingSession, SessionHandle};
pub use state::{RecorderError, RecorderState};
pub use stats::SessionSnapshot;
