//! killbot - keeps selected system services stopped
//!
//! A background agent that polls a fixed set of services and stops the ones
//! flagged for enforcement whenever they are found running. A [`Controller`]
//! lets a presentation layer toggle enforcement, pause the agent and read
//! status snapshots while the enforcement loop runs on its own task.

pub mod config;
pub mod console;
pub mod control;
pub mod controller;
pub mod enforcement;
pub mod events;
pub mod probe;
pub mod registry;
pub mod service;
pub mod status;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use control::{ServiceControl, SystemServiceControl};
pub use controller::{AgentSnapshot, Controller};
pub use service::KillbotService;
pub use status::ServiceStatus;
