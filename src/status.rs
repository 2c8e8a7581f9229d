//! Service status model shared by the probe, the registry and the presentation layer

use serde::{Deserialize, Serialize};
use std::fmt;

/// Last observed operational status of a monitored service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ServiceStatus {
    /// Not probed yet, or the last probe failed
    #[default]
    Unknown,
    Stopped,
    Running,
    StartPending,
    StopPending,
    /// Any other platform state (paused, reloading, failed, ...)
    Other,
}

impl ServiceStatus {
    /// Map a Windows `ServiceControllerStatus` name as printed by PowerShell
    pub fn from_windows(value: &str) -> Self {
        match value.trim() {
            "Stopped" => ServiceStatus::Stopped,
            "Running" => ServiceStatus::Running,
            "StartPending" => ServiceStatus::StartPending,
            "StopPending" => ServiceStatus::StopPending,
            // ContinuePending, PausePending, Paused
            _ => ServiceStatus::Other,
        }
    }

    /// Map a systemd `ActiveState` value
    pub fn from_systemd(active_state: &str) -> Self {
        match active_state.trim() {
            "active" | "reloading" => ServiceStatus::Running,
            "inactive" | "failed" => ServiceStatus::Stopped,
            "activating" => ServiceStatus::StartPending,
            "deactivating" => ServiceStatus::StopPending,
            _ => ServiceStatus::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Unknown => "Unknown",
            ServiceStatus::Stopped => "Stopped",
            ServiceStatus::Running => "Running",
            ServiceStatus::StartPending => "StartPending",
            ServiceStatus::StopPending => "StopPending",
            ServiceStatus::Other => "Other",
        }
    }

    /// Tooltip-style status line, e.g. `Status: Running`
    pub fn status_line(&self) -> String {
        format!("Status: {}", self)
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Visual hint for a service entry, independent of any UI toolkit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Indicator {
    /// Enforced and confirmed stopped
    Shielded,
    /// Enforced but not (yet) stopped
    Warning,
    /// Status could not be determined
    Error,
    /// Monitored only
    None,
}

impl Indicator {
    pub fn for_entry(enforced: bool, status: ServiceStatus) -> Self {
        match (enforced, status) {
            (_, ServiceStatus::Unknown) => Indicator::Error,
            (true, ServiceStatus::Stopped) => Indicator::Shielded,
            (true, _) => Indicator::Warning,
            (false, _) => Indicator::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows_status_mapping() {
        assert_eq!(ServiceStatus::from_windows("Running"), ServiceStatus::Running);
        assert_eq!(ServiceStatus::from_windows("Stopped\r\n"), ServiceStatus::Stopped);
        assert_eq!(ServiceStatus::from_windows("StopPending"), ServiceStatus::StopPending);
        assert_eq!(ServiceStatus::from_windows("Paused"), ServiceStatus::Other);
    }

    #[test]
    fn test_systemd_status_mapping() {
        assert_eq!(ServiceStatus::from_systemd("active"), ServiceStatus::Running);
        assert_eq!(ServiceStatus::from_systemd("inactive"), ServiceStatus::Stopped);
        assert_eq!(ServiceStatus::from_systemd("failed"), ServiceStatus::Stopped);
        assert_eq!(ServiceStatus::from_systemd("activating"), ServiceStatus::StartPending);
        assert_eq!(ServiceStatus::from_systemd("deactivating"), ServiceStatus::StopPending);
        assert_eq!(ServiceStatus::from_systemd("maintenance"), ServiceStatus::Other);
    }

    #[test]
    fn test_indicator() {
        assert_eq!(Indicator::for_entry(true, ServiceStatus::Stopped), Indicator::Shielded);
        assert_eq!(Indicator::for_entry(true, ServiceStatus::Running), Indicator::Warning);
        assert_eq!(Indicator::for_entry(false, ServiceStatus::Running), Indicator::None);
        assert_eq!(Indicator::for_entry(false, ServiceStatus::Unknown), Indicator::Error);
        assert_eq!(ServiceStatus::Running.status_line(), "Status: Running");
    }
}
