//! Control surface consumed by the presentation layer
//!
//! Every call touches only the registry lock or an atomic flag; none of them
//! waits on the enforcement loop or on the service manager.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::events::{AgentEvent, EventKind, EventSink};
use crate::registry::{RegistryError, ServiceEntry, ServiceRegistry};

/// Point-in-time view of the agent for rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub monitoring_paused: bool,
    pub services: Vec<ServiceEntry>,
}

impl AgentSnapshot {
    /// Tray-style title, e.g. `Service Monitor (Active)`
    pub fn title(&self) -> &'static str {
        if self.monitoring_paused {
            "Service Monitor (Paused)"
        } else {
            "Service Monitor (Active)"
        }
    }
}

#[derive(Clone)]
pub struct Controller {
    registry: Arc<ServiceRegistry>,
    paused: Arc<AtomicBool>,
    events: EventSink,
    shutdown: CancellationToken,
}

impl Controller {
    pub fn new(
        registry: Arc<ServiceRegistry>,
        paused: Arc<AtomicBool>,
        events: EventSink,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            registry,
            paused,
            events,
            shutdown,
        }
    }

    /// Flip enforcement for `name` and return the new flag
    pub fn toggle_enforcement(&self, name: &str) -> Result<bool, RegistryError> {
        let enforced = self.registry.toggle_enforced(name)?;
        self.emit_toggled(name, enforced);
        Ok(enforced)
    }

    pub fn pause(&self) {
        if self.paused.swap(true, Ordering::AcqRel) {
            debug!("Monitoring already paused");
            return;
        }
        self.events
            .emit(AgentEvent::new(EventKind::MonitoringPaused, "Monitoring paused"));
    }

    pub fn resume(&self) {
        if !self.paused.swap(false, Ordering::AcqRel) {
            debug!("Monitoring already active");
            return;
        }
        self.events
            .emit(AgentEvent::new(EventKind::MonitoringResumed, "Monitoring resumed"));
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn current_snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            monitoring_paused: self.is_paused(),
            services: self.registry.snapshot(),
        }
    }

    /// Ask the enforcement loop to exit after its current tick
    pub fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            info!("Shutdown requested");
            self.shutdown.cancel();
        }
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Resolves once `shutdown` has been called
    pub async fn shutdown_requested(&self) {
        self.shutdown.cancelled().await
    }

    /// Receive state-change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.events.subscribe()
    }

    fn emit_toggled(&self, name: &str, enforced: bool) {
        let message = if enforced {
            "Enforcement enabled"
        } else {
            "Enforcement disabled"
        };
        self.events.emit(
            AgentEvent::for_service(EventKind::EnforcementToggled, name, message).with_enforced(enforced),
        );
    }
}
