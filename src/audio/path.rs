use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the native recorder writes its output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetPath {
    /// A caller-chosen filesystem path
    Explicit(PathBuf),
    /// A file name inside the platform temporary directory
    Temporary(String),
}

impl AssetPath {
    pub fn explicit(path: impl Into<PathBuf>) -> Self {
        Self::Explicit(path.into())
    }

    pub fn temporary(file_name: impl Into<String>) -> Self {
        Self::Temporary(file_name.into())
    }

    /// Resolve to a concrete path. Performs no I/O.
    pub fn resolve(&self) -> PathBuf {
        match self {
            AssetPath::Explicit(path) => path.clone(),
            AssetPath::Temporary(file_name) => std::env::temp_dir().join(file_name),
        }
    }
}
