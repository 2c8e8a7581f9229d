//! The enforcement loop
//!
//! A single worker that, every tick, stops enforced services found running
//! and refreshes the cached status of every monitored service. Failures are
//! isolated per service and per tick: nothing a service manager returns can
//! end the loop, only the shutdown token can.

use log::{debug, info};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::events::{AgentEvent, EventKind, EventSink};
use crate::probe::{ServiceError, ServiceStatusProbe, DEFAULT_STOP_TIMEOUT};
use crate::registry::ServiceRegistry;
use crate::status::ServiceStatus;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone)]
pub struct LoopSettings {
    /// Pause between two passes
    pub tick_interval: Duration,

    /// Time a stop request is given to converge
    pub stop_timeout: Duration,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }
}

/// Outcome counters of one pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub paused: bool,
    pub stop_attempts: usize,
    pub stops_succeeded: usize,
    pub stops_failed: usize,
    pub probe_failures: usize,
}

pub struct EnforcementLoop {
    registry: Arc<ServiceRegistry>,
    probe: ServiceStatusProbe,
    paused: Arc<AtomicBool>,
    events: EventSink,
    settings: LoopSettings,
    shutdown: CancellationToken,
    /// Services whose current run of probe failures has been reported
    failing: Mutex<HashSet<String>>,
}

impl EnforcementLoop {
    pub fn new(
        registry: Arc<ServiceRegistry>,
        probe: ServiceStatusProbe,
        paused: Arc<AtomicBool>,
        events: EventSink,
        settings: LoopSettings,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            registry,
            probe,
            paused,
            events,
            settings,
            shutdown,
            failing: Mutex::new(HashSet::new()),
        }
    }

    /// Run until the shutdown token is cancelled.
    ///
    /// Cancellation is honoured between ticks; a tick in progress, including
    /// any stop it is waiting on, always completes.
    pub async fn run(self) {
        self.events.emit(AgentEvent::new(
            EventKind::AgentStarted,
            format!(
                "Service monitor started: {} services, {} backend, tick every {:?}",
                self.registry.len(),
                self.probe.backend_name(),
                self.settings.tick_interval
            ),
        ));

        let mut ticks: u64 = 0;
        while !self.shutdown.is_cancelled() {
            ticks += 1;
            let report = self.tick().await;
            debug!("Tick {} complete: {:?}", ticks, report);

            tokio::select! {
                _ = time::sleep(self.settings.tick_interval) => {}
                _ = self.shutdown.cancelled() => break,
            }
        }

        info!("Enforcement loop exiting after {} ticks", ticks);
        self.events
            .emit(AgentEvent::new(EventKind::AgentShutdown, "Service monitor shutting down"));
    }

    /// Execute a single pass over the registry
    pub async fn tick(&self) -> TickReport {
        let paused = self.paused.load(Ordering::Acquire);
        let mut report = TickReport {
            paused,
            ..Default::default()
        };

        let mut monitored = Vec::new();
        let mut enforced = Vec::new();
        self.registry.for_each(|entry| {
            monitored.push(entry.name.clone());
            if entry.enforced {
                enforced.push(entry.name.clone());
            }
        });

        if !paused {
            for name in &enforced {
                self.enforce(name, &mut report).await;
            }
        }

        for name in &monitored {
            self.refresh(name, &mut report).await;
        }

        report
    }

    async fn enforce(&self, name: &str, report: &mut TickReport) {
        let status = match self.probe.status(name).await {
            Ok(status) => status,
            Err(e) => {
                report.probe_failures += 1;
                self.failing.lock().insert(name.to_string());
                self.events
                    .emit(AgentEvent::for_service(EventKind::ProbeFailed, name, e.to_string()));
                self.record_status(name, ServiceStatus::Unknown);
                return;
            }
        };

        if status != ServiceStatus::Running {
            debug!("{} is {}, no action needed", name, status);
            return;
        }

        report.stop_attempts += 1;
        self.events.emit(AgentEvent::for_service(
            EventKind::ServiceStopAttempted,
            name,
            format!("Stopping service (timeout {:?})", self.settings.stop_timeout),
        ));

        match self.probe.stop(name, self.settings.stop_timeout).await {
            Ok(()) => {
                report.stops_succeeded += 1;
                self.events.emit(AgentEvent::for_service(
                    EventKind::ServiceStopSucceeded,
                    name,
                    "Service stopped",
                ));
            }
            Err(e) => {
                report.stops_failed += 1;
                self.events
                    .emit(AgentEvent::for_service(EventKind::ServiceStopFailed, name, e.to_string()));
            }
        }
    }

    async fn refresh(&self, name: &str, report: &mut TickReport) {
        match self.probe.status(name).await {
            Ok(status) => {
                if self.failing.lock().remove(name) {
                    debug!("{} is reachable again", name);
                }
                self.record_status(name, status);
            }
            Err(e) => {
                report.probe_failures += 1;
                self.record_refresh_failure(name, e);
            }
        }
    }

    fn record_refresh_failure(&self, name: &str, error: ServiceError) {
        let first_failure = self.failing.lock().insert(name.to_string());
        if !first_failure {
            // already reported, keep the audit log quiet while the fault persists
            debug!("{}", error);
        } else {
            self.events
                .emit(AgentEvent::for_service(EventKind::ProbeFailed, name, error.to_string()));
        }
        self.record_status(name, ServiceStatus::Unknown);
    }

    fn record_status(&self, name: &str, status: ServiceStatus) {
        match self.registry.update_status(name, status) {
            Some(previous) if previous != status => {
                self.events.emit(
                    AgentEvent::for_service(
                        EventKind::StatusChanged,
                        name,
                        format!("{} -> {}", previous, status),
                    )
                    .with_status(status),
                );
            }
            _ => {}
        }
    }
}
