//! Audit events and state-change notifications
//!
//! Every event is written through the `log` facade under the
//! `killbot::audit` target and broadcast to subscribers (the presentation
//! layer). A slow or absent subscriber never blocks the emitter.

use chrono::{DateTime, Utc};
use log::Level;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

use crate::status::ServiceStatus;

pub const AUDIT_TARGET: &str = "killbot::audit";

/// Capacity of the notification channel; lagging subscribers lose the oldest events
const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    AgentStarted,
    AgentShutdown,
    MonitoringPaused,
    MonitoringResumed,
    EnforcementToggled,
    ServiceStopAttempted,
    ServiceStopSucceeded,
    ServiceStopFailed,
    ProbeFailed,
    StatusChanged,
}

impl EventKind {
    pub fn level(&self) -> Level {
        match self {
            EventKind::ServiceStopFailed => Level::Error,
            EventKind::ProbeFailed => Level::Warn,
            EventKind::StatusChanged => Level::Debug,
            _ => Level::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::AgentStarted => "agent-started",
            EventKind::AgentShutdown => "agent-shutdown",
            EventKind::MonitoringPaused => "monitoring-paused",
            EventKind::MonitoringResumed => "monitoring-resumed",
            EventKind::EnforcementToggled => "enforcement-toggled",
            EventKind::ServiceStopAttempted => "service-stop-attempted",
            EventKind::ServiceStopSucceeded => "service-stop-succeeded",
            EventKind::ServiceStopFailed => "service-stop-failed",
            EventKind::ProbeFailed => "probe-failed",
            EventKind::StatusChanged => "status-changed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured event emitted by the agent core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEvent {
    pub kind: EventKind,
    pub service: Option<String>,
    pub message: String,
    /// Set for `StatusChanged` and `EnforcementToggled`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ServiceStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enforced: Option<bool>,
    pub timestamp: DateTime<Utc>,
}

impl AgentEvent {
    pub fn new(kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            service: None,
            message: message.into(),
            status: None,
            enforced: None,
            timestamp: Utc::now(),
        }
    }

    pub fn for_service(kind: EventKind, service: &str, message: impl Into<String>) -> Self {
        Self {
            service: Some(service.to_string()),
            ..Self::new(kind, message)
        }
    }

    pub fn with_status(mut self, status: ServiceStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_enforced(mut self, enforced: bool) -> Self {
        self.enforced = Some(enforced);
        self
    }
}

/// Fan-out point for agent events
#[derive(Clone)]
pub struct EventSink {
    sender: broadcast::Sender<AgentEvent>,
}

impl EventSink {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn emit(&self, event: AgentEvent) {
        match &event.service {
            Some(service) => log::log!(
                target: AUDIT_TARGET,
                event.kind.level(),
                "[{}] {}: {}",
                event.kind,
                service,
                event.message
            ),
            None => log::log!(target: AUDIT_TARGET, event.kind.level(), "[{}] {}", event.kind, event.message),
        }

        // No receivers is not an error: notifications are advisory
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventSink {
    fn default() -> Self {
        Self::new()
    }
}
