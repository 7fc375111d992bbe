pub mod backend;
pub mod path;
pub mod settings;
pub mod simulated;

pub use backend::{DeviceEvent, DeviceEventSender, NativeRecorder, RecorderBackend};
pub(crate) use backend::TaggedDeviceEvent;
pub use path::AssetPath;
pub use settings::RecorderSettings;
pub use simulated::SimulatedBackend;
