//! Service-control binding for the local machine
//!
//! Windows: PowerShell `Get-Service` / `Stop-Service`, accepting either the
//! service name or its display name.
//! Linux: `systemctl show` / `systemctl stop` for systemd-based systems.

use async_trait::async_trait;
use log::debug;
use std::process::Output;
use tokio::process::Command;

use super::{ControlError, ControlResult, ServiceControl};
use crate::status::ServiceStatus;

/// Characters that would let a configured name escape its quoting, or be
/// expanded as a pattern matching other services
const FORBIDDEN_NAME_CHARS: [char; 13] = [
    '\'', '"', '`', '&', '|', ';', '$', '\n', '\r', '*', '?', '[', ']',
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    PowerShell,
    Systemd,
    Unsupported,
}

impl Backend {
    fn detect() -> Self {
        if cfg!(target_os = "windows") {
            Backend::PowerShell
        } else if cfg!(target_os = "linux") {
            Backend::Systemd
        } else {
            Backend::Unsupported
        }
    }
}

/// Service control through the platform service manager
pub struct SystemServiceControl {
    backend: Backend,
}

impl SystemServiceControl {
    pub fn new() -> Self {
        let backend = Backend::detect();
        debug!("Using {:?} service-control backend", backend);
        Self { backend }
    }

    async fn run(program: &str, args: &[&str]) -> ControlResult<Output> {
        Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ControlError::Platform(format!("failed to execute {}: {}", program, e)))
    }

    async fn run_powershell(script: &str) -> ControlResult<Output> {
        Self::run("powershell", &["-NoProfile", "-NonInteractive", "-Command", script]).await
    }
}

impl Default for SystemServiceControl {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServiceControl for SystemServiceControl {
    async fn query_status(&self, name: &str) -> ControlResult<ServiceStatus> {
        validate_service_name(name)?;

        match self.backend {
            Backend::PowerShell => {
                let output = Self::run_powershell(&powershell_resolve_script(name, "$s.Status.ToString()")).await?;
                if output.status.success() {
                    Ok(ServiceStatus::from_windows(&String::from_utf8_lossy(&output.stdout)))
                } else {
                    Err(classify_powershell_error(name, &String::from_utf8_lossy(&output.stderr)))
                }
            }
            Backend::Systemd => {
                let output = Self::run(
                    "systemctl",
                    &["show", "--property=LoadState,ActiveState", "--", name],
                )
                .await?;
                if output.status.success() {
                    parse_systemctl_show(name, &String::from_utf8_lossy(&output.stdout))
                } else {
                    Err(classify_systemctl_error(name, &String::from_utf8_lossy(&output.stderr)))
                }
            }
            Backend::Unsupported => Err(ControlError::UnsupportedPlatform(std::env::consts::OS.to_string())),
        }
    }

    async fn request_stop(&self, name: &str) -> ControlResult<()> {
        validate_service_name(name)?;

        let output = match self.backend {
            Backend::PowerShell => {
                Self::run_powershell(&powershell_resolve_script(name, "Stop-Service -InputObject $s -Force -NoWait"))
                    .await?
            }
            Backend::Systemd => Self::run("systemctl", &["stop", "--no-block", "--", name]).await?,
            Backend::Unsupported => {
                return Err(ControlError::UnsupportedPlatform(std::env::consts::OS.to_string()))
            }
        };

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(match self.backend {
            Backend::PowerShell => classify_powershell_error(name, &stderr),
            _ => classify_systemctl_error(name, &stderr),
        })
    }

    fn name(&self) -> &'static str {
        match self.backend {
            Backend::PowerShell => "powershell",
            Backend::Systemd => "systemd",
            Backend::Unsupported => "unsupported",
        }
    }
}

/// Reject names that cannot be passed safely to the service manager
pub fn validate_service_name(name: &str) -> ControlResult<()> {
    if name.trim().is_empty() || name.contains(&FORBIDDEN_NAME_CHARS[..]) {
        return Err(ControlError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Resolve `$s` by service name, falling back to display name, then run `action`
fn powershell_resolve_script(name: &str, action: &str) -> String {
    format!(
        "$ErrorActionPreference = 'Stop'; \
         $s = Get-Service -Name '{name}' -ErrorAction SilentlyContinue; \
         if (-not $s) {{ $s = Get-Service -DisplayName '{name}' }}; \
         {action}"
    )
}

/// Parse `systemctl show --property=LoadState,ActiveState` output
pub fn parse_systemctl_show(name: &str, stdout: &str) -> ControlResult<ServiceStatus> {
    let mut load_state = None;
    let mut active_state = None;

    for line in stdout.lines() {
        if let Some((key, value)) = line.split_once('=') {
            match key.trim() {
                "LoadState" => load_state = Some(value.trim()),
                "ActiveState" => active_state = Some(value.trim()),
                _ => {}
            }
        }
    }

    match (load_state, active_state) {
        (Some("not-found"), _) => Err(ControlError::NotFound(name.to_string())),
        (_, Some(state)) => Ok(ServiceStatus::from_systemd(state)),
        _ => Err(ControlError::Platform(format!(
            "unexpected systemctl output for {}: {}",
            name,
            stdout.trim()
        ))),
    }
}

pub fn classify_systemctl_error(name: &str, stderr: &str) -> ControlError {
    let lower = stderr.to_lowercase();
    if lower.contains("access denied") || lower.contains("authentication required") {
        ControlError::PermissionDenied(name.to_string())
    } else if lower.contains("not loaded") || lower.contains("not found") {
        ControlError::NotFound(name.to_string())
    } else {
        ControlError::Rejected(format!("{}: {}", name, stderr.trim()))
    }
}

pub fn classify_powershell_error(name: &str, stderr: &str) -> ControlError {
    let lower = stderr.to_lowercase();
    if lower.contains("cannot find any service") {
        ControlError::NotFound(name.to_string())
    } else if lower.contains("access is denied") || lower.contains("permissiondenied") || lower.contains("cannot open") {
        ControlError::PermissionDenied(name.to_string())
    } else {
        ControlError::Rejected(format!("{}: {}", name, stderr.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_service_name() {
        assert!(validate_service_name("Print Spooler").is_ok());
        assert!(validate_service_name("cups.service").is_ok());
        assert!(validate_service_name("").is_err());
        assert!(validate_service_name("   ").is_err());
        assert!(validate_service_name("evil'; Remove-Item").is_err());
        assert!(validate_service_name("a | b").is_err());
        assert!(validate_service_name("$(whoami)").is_err());
    }

    #[test]
    fn test_validate_service_name_rejects_patterns() {
        assert!(validate_service_name("cups*").is_err());
        assert!(validate_service_name("Print*").is_err());
        assert!(validate_service_name("spool?r").is_err());
        assert!(validate_service_name("[a-z]*.service").is_err());
        assert!(validate_service_name("getty@tty1.service").is_ok());
    }

    #[test]
    fn test_parse_systemctl_show() {
        let running = "LoadState=loaded\nActiveState=active\n";
        assert_eq!(parse_systemctl_show("cups", running), Ok(ServiceStatus::Running));

        let stopped = "LoadState=loaded\nActiveState=inactive\n";
        assert_eq!(parse_systemctl_show("cups", stopped), Ok(ServiceStatus::Stopped));

        let missing = "LoadState=not-found\nActiveState=inactive\n";
        assert_eq!(
            parse_systemctl_show("nope", missing),
            Err(ControlError::NotFound("nope".to_string()))
        );

        assert!(matches!(parse_systemctl_show("cups", ""), Err(ControlError::Platform(_))));
    }

    #[test]
    fn test_classify_systemctl_error() {
        assert_eq!(
            classify_systemctl_error("cups", "Failed to stop cups.service: Access denied"),
            ControlError::PermissionDenied("cups".to_string())
        );
        assert_eq!(
            classify_systemctl_error("cups", "Failed to stop cups.service: Interactive authentication required."),
            ControlError::PermissionDenied("cups".to_string())
        );
        assert_eq!(
            classify_systemctl_error("x", "Failed to stop x.service: Unit x.service not loaded."),
            ControlError::NotFound("x".to_string())
        );
        assert!(matches!(classify_systemctl_error("x", "boom"), ControlError::Rejected(_)));
    }

    #[test]
    fn test_classify_powershell_error() {
        assert_eq!(
            classify_powershell_error("Foo", "Get-Service : Cannot find any service with display name 'Foo'."),
            ControlError::NotFound("Foo".to_string())
        );
        assert_eq!(
            classify_powershell_error("Spooler", "Stop-Service : Service 'Print Spooler (Spooler)' cannot be stopped due to the following error: Cannot open Spooler service on computer '.'."),
            ControlError::PermissionDenied("Spooler".to_string())
        );
    }

    #[test]
    fn test_powershell_script_quotes_name() {
        let script = powershell_resolve_script("Windows Search", "$s.Status.ToString()");
        assert!(script.contains("Get-Service -Name 'Windows Search'"));
        assert!(script.contains("Get-Service -DisplayName 'Windows Search'"));
        assert!(script.ends_with("$s.Status.ToString()"));
    }
}
