pub mod audio;
pub mod config;
pub mod permission;
pub mod session;

pub use audio::{
    AssetPath, DeviceEvent, DeviceEventSender, NativeRecorder, RecorderBackend, RecorderSettings,
    SimulatedBackend,
};
pub use config::Config;
pub use permission::{check_permission, PermissionAuthority, PermissionStatus, StaticAuthority};
pub use session::{
    RecorderCallbacks, RecorderDelegate, RecorderError, RecorderState, RecordingSession,
    SessionConfig, SessionHandle, SessionSnapshot,
};
