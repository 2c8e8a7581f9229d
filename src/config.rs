//! Configuration management for killbot

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::control::system::validate_service_name;

/// One service the agent watches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    /// Service name (or Windows display name) understood by the service manager
    pub name: String,

    /// Human label; defaults to `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Whether the service is stopped on sight from startup on
    #[serde(default)]
    pub enforced: bool,
}

impl ServiceDefinition {
    pub fn new(name: &str, display_name: &str) -> Self {
        Self {
            name: name.to_string(),
            display_name: Some(display_name.to_string()),
            enforced: false,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("No services configured")]
    NoServices,

    #[error("Service configured more than once: {0}")]
    DuplicateService(String),

    #[error("Invalid service name: {0:?}")]
    InvalidServiceName(String),

    #[error("Cannot enforce unknown service: {0}")]
    UnknownService(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Monitored services, in display order
    pub services: Vec<ServiceDefinition>,

    /// Log level used when RUST_LOG is not set
    pub log_level: String,

    /// Start with enforcement paused
    pub start_paused: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            services: vec![
                ServiceDefinition::new("OneDrive Sync Host Service", "OneDrive"),
                ServiceDefinition::new("Print Spooler", "Print Spooler"),
                ServiceDefinition::new("Windows Search", "Windows Search"),
            ],
            log_level: "info".to_string(),
            start_paused: false,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file, or use defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            debug!("No configuration file given, using built-in service list");
            return Ok(Self::default());
        };

        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        let config: Config = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse configuration file {}", path.display()))?;
        debug!("Loaded {} services from {}", config.services.len(), path.display());
        Ok(config)
    }

    /// Mark the named services as enforced from startup
    pub fn enforce(&mut self, names: &[String]) -> Result<(), ConfigError> {
        for name in names {
            let service = self
                .services
                .iter_mut()
                .find(|s| &s.name == name || s.display_name.as_ref() == Some(name))
                .ok_or_else(|| ConfigError::UnknownService(name.clone()))?;
            service.enforced = true;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.services.is_empty() {
            return Err(ConfigError::NoServices);
        }

        let mut seen = HashSet::new();
        for service in &self.services {
            if validate_service_name(&service.name).is_err() {
                return Err(ConfigError::InvalidServiceName(service.name.clone()));
            }
            if !seen.insert(service.name.as_str()) {
                return Err(ConfigError::DuplicateService(service.name.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.services.len(), 3);
        assert!(config.services.iter().all(|s| !s.enforced));
        assert_eq!(config.services[0].display_name.as_deref(), Some("OneDrive"));
        assert!(!config.start_paused);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_without_path_uses_defaults() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.services, Config::default().services);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"services": [{{"name": "cups"}}, {{"name": "bluetooth", "display_name": "Bluetooth", "enforced": true}}]}}"#
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.services.len(), 2);
        assert_eq!(config.services[0].display_name, None);
        assert!(config.services[1].enforced);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_load_errors() {
        assert!(Config::load(Some(Path::new("/nonexistent/killbot.json"))).is_err());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(Config::load(Some(file.path())).is_err());
    }

    #[test]
    fn test_validate() {
        let mut config = Config::default();
        config.services.push(ServiceDefinition::new("Print Spooler", "Again"));
        assert_eq!(
            config.validate(),
            Err(ConfigError::DuplicateService("Print Spooler".to_string()))
        );

        let config = Config {
            services: vec![ServiceDefinition::new("x; rm -rf /", "bad")],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidServiceName(_))));

        let config = Config {
            services: vec![ServiceDefinition::new("cups*", "Printing")],
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidServiceName("cups*".to_string()))
        );

        let config = Config {
            services: Vec::new(),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoServices));
    }

    #[test]
    fn test_enforce_by_name_or_display_name() {
        let mut config = Config::default();
        config
            .enforce(&["OneDrive".to_string(), "Windows Search".to_string()])
            .unwrap();
        assert!(config.services[0].enforced);
        assert!(!config.services[1].enforced);
        assert!(config.services[2].enforced);

        assert_eq!(
            config.enforce(&["Nope".to_string()]),
            Err(ConfigError::UnknownService("Nope".to_string()))
        );
    }
}
