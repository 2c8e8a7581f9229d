//! Status probe and stop action for a single named service

use log::debug;
use std::sync::Arc;
use std::time::Duration;

use crate::control::{ControlError, ServiceControl};
use crate::status::ServiceStatus;

/// Default time a stop request is given to converge
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-service failures; always recovered inside the enforcement loop
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to query status of {name}: {cause}")]
    Probe { name: String, cause: ControlError },

    #[error("Failed to stop {name}: {cause}")]
    Stop { name: String, cause: ControlError },

    #[error("{name} did not stop within {timeout:?}")]
    StopTimeout { name: String, timeout: Duration },
}

/// Stateless wrapper turning raw service-control calls into probe/stop semantics
#[derive(Clone)]
pub struct ServiceStatusProbe {
    control: Arc<dyn ServiceControl>,
}

impl ServiceStatusProbe {
    pub fn new(control: Arc<dyn ServiceControl>) -> Self {
        Self { control }
    }

    pub async fn status(&self, name: &str) -> Result<ServiceStatus, ServiceError> {
        self.control
            .query_status(name)
            .await
            .map_err(|cause| ServiceError::Probe {
                name: name.to_string(),
                cause,
            })
    }

    /// Stop `name` and wait until it reports `Stopped`.
    ///
    /// A service that is already stopped is left alone and reported as success.
    pub async fn stop(&self, name: &str, timeout: Duration) -> Result<(), ServiceError> {
        let current = self
            .control
            .query_status(name)
            .await
            .map_err(|cause| ServiceError::Stop {
                name: name.to_string(),
                cause,
            })?;
        if current == ServiceStatus::Stopped {
            debug!("{} already stopped, nothing to do", name);
            return Ok(());
        }

        self.control
            .request_stop(name)
            .await
            .map_err(|cause| ServiceError::Stop {
                name: name.to_string(),
                cause,
            })?;

        match self
            .control
            .wait_for_status(name, ServiceStatus::Stopped, timeout)
            .await
        {
            Ok(()) => Ok(()),
            Err(ControlError::Timeout { .. }) => Err(ServiceError::StopTimeout {
                name: name.to_string(),
                timeout,
            }),
            Err(cause) => Err(ServiceError::Stop {
                name: name.to_string(),
                cause,
            }),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.control.name()
    }
}
