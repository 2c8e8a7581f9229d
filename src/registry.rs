//! Registry of monitored services
//!
//! Holds the enforcement flag and the last probed status of every configured
//! service. Keys are fixed at construction and keep configuration order.
//! Every mutation replaces a whole [`ServiceEntry`] under a single write lock,
//! so readers never observe a half-updated record.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::config::ServiceDefinition;
use crate::status::{Indicator, ServiceStatus};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Unknown service: {0}")]
    UnknownService(String),
}

/// One monitored service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub name: String,
    pub display_name: String,
    pub enforced: bool,
    pub last_known_status: ServiceStatus,
}

impl ServiceEntry {
    pub fn indicator(&self) -> Indicator {
        Indicator::for_entry(self.enforced, self.last_known_status)
    }
}

pub struct ServiceRegistry {
    entries: RwLock<Vec<ServiceEntry>>,
}

impl ServiceRegistry {
    /// Build the registry from definitions already checked by
    /// [`Config::validate`](crate::config::Config::validate)
    pub fn new<I>(definitions: I) -> Self
    where
        I: IntoIterator<Item = ServiceDefinition>,
    {
        let entries = definitions
            .into_iter()
            .map(|def| ServiceEntry {
                display_name: def.display_name.unwrap_or_else(|| def.name.clone()),
                name: def.name,
                enforced: def.enforced,
                last_known_status: ServiceStatus::Unknown,
            })
            .collect();

        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Apply `f` to a point-in-time copy of every entry, without holding the lock
    pub fn for_each<F>(&self, f: F)
    where
        F: FnMut(&ServiceEntry),
    {
        self.snapshot().iter().for_each(f);
    }

    /// Set the enforcement flag, returning the previous value
    pub fn set_enforced(&self, name: &str, enforced: bool) -> Result<bool, RegistryError> {
        let mut entries = self.entries.write();
        let entry = Self::find_mut(&mut entries, name)?;
        let previous = entry.enforced;
        *entry = ServiceEntry {
            enforced,
            ..entry.clone()
        };
        Ok(previous)
    }

    /// Flip the enforcement flag atomically, returning the new value
    pub fn toggle_enforced(&self, name: &str) -> Result<bool, RegistryError> {
        let mut entries = self.entries.write();
        let entry = Self::find_mut(&mut entries, name)?;
        let enforced = !entry.enforced;
        *entry = ServiceEntry {
            enforced,
            ..entry.clone()
        };
        Ok(enforced)
    }

    /// Record a probe result, returning the previous status.
    ///
    /// Unknown names are ignored; the key set never changes after startup.
    pub fn update_status(&self, name: &str, status: ServiceStatus) -> Option<ServiceStatus> {
        let mut entries = self.entries.write();
        let entry = Self::find_mut(&mut entries, name).ok()?;
        let previous = entry.last_known_status;
        *entry = ServiceEntry {
            last_known_status: status,
            ..entry.clone()
        };
        Some(previous)
    }

    pub fn snapshot(&self) -> Vec<ServiceEntry> {
        self.entries.read().clone()
    }

    pub fn get(&self, name: &str) -> Option<ServiceEntry> {
        self.entries.read().iter().find(|e| e.name == name).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn find_mut<'a>(entries: &'a mut [ServiceEntry], name: &str) -> Result<&'a mut ServiceEntry, RegistryError> {
        entries
            .iter_mut()
            .find(|e| e.name == name)
            .ok_or_else(|| RegistryError::UnknownService(name.to_string()))
    }
}
