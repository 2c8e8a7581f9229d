//! OS service-control capability
//!
//! The enforcement core only talks to services through [`ServiceControl`].
//! [`system::SystemServiceControl`] binds it to systemd on Linux and to the
//! Service Control Manager (through PowerShell) on Windows.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{self, Instant};

use crate::status::ServiceStatus;

pub mod system;

pub use system::SystemServiceControl;

/// Interval between status queries while waiting for a target state
pub const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Errors reported by the platform service manager
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControlError {
    #[error("Service not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Service did not reach {target} within {timeout:?}")]
    Timeout {
        target: ServiceStatus,
        timeout: Duration,
    },

    #[error("Invalid service name: {0}")]
    InvalidName(String),

    #[error("Unsupported operation on this platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Service manager error: {0}")]
    Platform(String),
}

/// Result type for service-control operations
pub type ControlResult<T> = std::result::Result<T, ControlError>;

/// Minimal surface of an OS service manager
#[async_trait]
pub trait ServiceControl: Send + Sync {
    /// Query the current status of a service
    async fn query_status(&self, name: &str) -> ControlResult<ServiceStatus>;

    /// Ask the service manager to stop a service without waiting for it
    async fn request_stop(&self, name: &str) -> ControlResult<()>;

    /// Block until the service reports `target` or `timeout` elapses
    async fn wait_for_status(
        &self,
        name: &str,
        target: ServiceStatus,
        timeout: Duration,
    ) -> ControlResult<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.query_status(name).await? == target {
                return Ok(());
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(ControlError::Timeout { target, timeout });
            }
            time::sleep(STATUS_POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    /// Name of this binding (for logging)
    fn name(&self) -> &'static str;
}
