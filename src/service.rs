//! Agent assembly: wires the registry, the enforcement loop and the controller

use anyhow::{Context, Result};
use log::info;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::control::ServiceControl;
use crate::controller::Controller;
use crate::enforcement::{EnforcementLoop, LoopSettings, TickReport};
use crate::events::EventSink;
use crate::probe::ServiceStatusProbe;
use crate::registry::ServiceRegistry;

/// A fully initialised agent that has not started its worker yet
pub struct KillbotService {
    worker: EnforcementLoop,
    controller: Controller,
}

impl KillbotService {
    /// Build the agent from a configuration.
    ///
    /// Fails on an invalid configuration; the worker is never started in that case.
    pub fn new(config: &Config, control: Arc<dyn ServiceControl>) -> Result<Self> {
        Self::with_settings(config, control, LoopSettings::default())
    }

    pub fn with_settings(
        config: &Config,
        control: Arc<dyn ServiceControl>,
        settings: LoopSettings,
    ) -> Result<Self> {
        config.validate().context("Invalid configuration")?;
        let registry = Arc::new(ServiceRegistry::new(config.services.iter().cloned()));

        let paused = Arc::new(AtomicBool::new(config.start_paused));
        let events = EventSink::new();
        let shutdown = CancellationToken::new();

        let worker = EnforcementLoop::new(
            registry.clone(),
            ServiceStatusProbe::new(control),
            paused.clone(),
            events.clone(),
            settings,
            shutdown.clone(),
        );
        let controller = Controller::new(registry, paused, events, shutdown);

        Ok(Self { worker, controller })
    }

    pub fn controller(&self) -> Controller {
        self.controller.clone()
    }

    /// Run exactly one pass and return its report
    pub async fn run_once(&self) -> TickReport {
        self.worker.tick().await
    }

    /// Spawn the enforcement loop on its own task
    pub fn start(self) -> RunningService {
        info!("Starting enforcement loop");
        let handle = tokio::spawn(self.worker.run());
        RunningService {
            controller: self.controller,
            handle,
        }
    }
}

/// Handle to a started agent
pub struct RunningService {
    controller: Controller,
    handle: JoinHandle<()>,
}

impl RunningService {
    pub fn controller(&self) -> Controller {
        self.controller.clone()
    }

    /// Wait for the worker to exit (after `Controller::shutdown`)
    pub async fn wait(self) -> Result<()> {
        self.handle.await.context("Enforcement loop task failed")
    }

    /// Request shutdown and wait for the current tick to finish
    pub async fn shutdown(self) -> Result<()> {
        self.controller.shutdown();
        self.wait().await
    }
}
