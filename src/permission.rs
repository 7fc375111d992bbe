//! Microphone permission handling
//!
//! The host platform decides whether the app may record. A status read is
//! synchronous; asking the user is asynchronous and answered exactly once.
//! The host application must declare its microphone usage for the platform
//! prompt to appear at all.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

/// Current microphone authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    /// The user has not been asked yet
    Undetermined,
    Granted,
    Denied,
}

/// Platform authority that owns the microphone permission
#[async_trait]
pub trait PermissionAuthority: Send + Sync {
    fn current_status(&self) -> PermissionStatus;

    /// Ask the user. Resolves once the platform answers.
    async fn request(&self) -> bool;
}

/// Resolve the permission and invoke `on_result` exactly once
///
/// Granted and denied statuses answer synchronously, before this function
/// returns. An undetermined status issues a request on a background task and
/// answers when the platform responds; this requires a tokio runtime.
pub fn check_permission<F>(authority: &Arc<dyn PermissionAuthority>, on_result: F)
where
    F: FnOnce(bool) + Send + 'static,
{
    match authority.current_status() {
        PermissionStatus::Granted => on_result(true),
        PermissionStatus::Denied => on_result(false),
        PermissionStatus::Undetermined => {
            info!("Microphone permission undetermined, requesting");
            let authority = Arc::clone(authority);
            tokio::spawn(async move {
                let granted = authority.request().await;
                debug!("Microphone permission request answered: granted={}", granted);
                on_result(granted);
            });
        }
    }
}

/// Permission authority with a fixed, scriptable answer
///
/// Used by the CLI and tests in place of a platform prompt. Answering a
/// request updates the stored status, like a real platform does.
#[derive(Debug)]
pub struct StaticAuthority {
    status: Mutex<PermissionStatus>,
    grant_on_request: bool,
    answer_delay: Duration,
    requests: AtomicUsize,
}

impl StaticAuthority {
    pub fn new(status: PermissionStatus) -> Self {
        Self {
            status: Mutex::new(status),
            grant_on_request: true,
            answer_delay: Duration::ZERO,
            requests: AtomicUsize::new(0),
        }
    }

    pub fn granted() -> Self {
        Self::new(PermissionStatus::Granted)
    }

    pub fn denied() -> Self {
        Self::new(PermissionStatus::Denied)
    }

    pub fn undetermined() -> Self {
        Self::new(PermissionStatus::Undetermined)
    }

    /// What the simulated user answers when asked
    pub fn answer_requests_with(mut self, grant: bool) -> Self {
        self.grant_on_request = grant;
        self
    }

    /// How long the simulated prompt stays on screen
    pub fn answer_after(mut self, delay: Duration) -> Self {
        self.answer_delay = delay;
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn set_status(&self, status: PermissionStatus) {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner) = status;
    }
}

#[async_trait]
impl PermissionAuthority for StaticAuthority {
    fn current_status(&self) -> PermissionStatus {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn request(&self) -> bool {
        self.requests.fetch_add(1, Ordering::SeqCst);

        if !self.answer_delay.is_zero() {
            tokio::time::sleep(self.answer_delay).await;
        }

        let granted = self.grant_on_request;
        self.set_status(if granted {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        });

        granted
    }
}
