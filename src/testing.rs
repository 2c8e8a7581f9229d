//! In-memory service manager used by unit tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

use crate::control::{ControlError, ControlResult, ServiceControl};
use crate::status::ServiceStatus;

/// How a fake service reacts to a stop request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBehavior {
    /// Transitions to `Stopped` immediately
    Stops,
    /// The service manager rejects the request
    Rejects,
    /// Accepted, but the service stays `Running`
    Hangs,
}

#[derive(Debug, Clone)]
struct FakeService {
    status: ServiceStatus,
    probe_fails: bool,
    stop_behavior: StopBehavior,
}

#[derive(Default)]
pub struct FakeServiceControl {
    services: Mutex<HashMap<String, FakeService>>,
    stop_requests: Mutex<Vec<String>>,
    probes: Mutex<Vec<String>>,
}

impl FakeServiceControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service(self, name: &str, status: ServiceStatus) -> Self {
        self.services.lock().insert(
            name.to_string(),
            FakeService {
                status,
                probe_fails: false,
                stop_behavior: StopBehavior::Stops,
            },
        );
        self
    }

    pub fn with_failing_probe(self, name: &str) -> Self {
        self.services.lock().insert(
            name.to_string(),
            FakeService {
                status: ServiceStatus::Running,
                probe_fails: true,
                stop_behavior: StopBehavior::Stops,
            },
        );
        self
    }

    pub fn with_stop_behavior(self, name: &str, behavior: StopBehavior) -> Self {
        if let Some(service) = self.services.lock().get_mut(name) {
            service.stop_behavior = behavior;
        }
        self
    }

    /// Simulate an external actor (re)starting or stopping a service
    pub fn set_status(&self, name: &str, status: ServiceStatus) {
        if let Some(service) = self.services.lock().get_mut(name) {
            service.status = status;
        }
    }

    /// Make status queries for `name` start or stop failing
    pub fn set_failing(&self, name: &str, failing: bool) {
        if let Some(service) = self.services.lock().get_mut(name) {
            service.probe_fails = failing;
        }
    }

    pub fn status_of(&self, name: &str) -> Option<ServiceStatus> {
        self.services.lock().get(name).map(|s| s.status)
    }

    pub fn stop_requests(&self) -> Vec<String> {
        self.stop_requests.lock().clone()
    }

    pub fn stop_requests_for(&self, name: &str) -> usize {
        self.stop_requests.lock().iter().filter(|n| n.as_str() == name).count()
    }

    pub fn probe_count(&self, name: &str) -> usize {
        self.probes.lock().iter().filter(|n| n.as_str() == name).count()
    }
}

#[async_trait]
impl ServiceControl for FakeServiceControl {
    async fn query_status(&self, name: &str) -> ControlResult<ServiceStatus> {
        self.probes.lock().push(name.to_string());
        match self.services.lock().get(name) {
            None => Err(ControlError::NotFound(name.to_string())),
            Some(service) if service.probe_fails => {
                Err(ControlError::Platform(format!("simulated probe failure for {}", name)))
            }
            Some(service) => Ok(service.status),
        }
    }

    async fn request_stop(&self, name: &str) -> ControlResult<()> {
        self.stop_requests.lock().push(name.to_string());
        let mut services = self.services.lock();
        let service = services
            .get_mut(name)
            .ok_or_else(|| ControlError::NotFound(name.to_string()))?;

        match service.stop_behavior {
            StopBehavior::Stops => {
                service.status = ServiceStatus::Stopped;
                Ok(())
            }
            StopBehavior::Rejects => Err(ControlError::Rejected(format!("{}: simulated rejection", name))),
            StopBehavior::Hangs => Ok(()),
        }
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}
