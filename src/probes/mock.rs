//! Mock system probe for testing.
//!
//! This module provides an in-memory probe that can be seeded with registry
//! keys, registry values and files, and told to fail for specific resources,
//! so the whole engine can be exercised without touching a real host.

use crate::core::{FileStat, Hive, ProbeError, RegistryLookup, SystemProbe};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

/// A mock probe for testing purposes.
///
/// Registry lookups are case-insensitive, like the Windows registry. File
/// paths are matched exactly.
///
/// # Examples
///
/// ```rust
/// use ovalscan::core::{FileStat, Hive};
/// use ovalscan::probes::MockProbe;
/// use std::time::Duration;
///
/// let probe = MockProbe::new()
///     .with_registry_value(Hive::HkeyLocalMachine, r"Software\Test", "Enabled", "1")
///     .with_file(r"C:\marker.txt", FileStat::new(12, 0o644))
///     .with_failure(r"C:\locked.txt", "share violation")
///     .with_latency(Duration::from_millis(5));
/// ```
#[derive(Debug)]
pub struct MockProbe {
    /// Name of this probe instance.
    name: String,
    /// Registry keys keyed by normalized `HIVE\key`, each with its values.
    registry: RwLock<HashMap<String, HashMap<String, String>>>,
    /// Files keyed by path.
    files: RwLock<HashMap<String, FileStat>>,
    /// Injected failures keyed by resource.
    failures: RwLock<HashMap<String, MockFailure>>,
    /// Simulated latency per probe call.
    latency: Option<Duration>,
    /// Counter for probe calls.
    probe_count: AtomicU64,
}

#[derive(Debug, Clone)]
enum MockFailure {
    PermissionDenied,
    Backend(String),
}

impl MockProbe {
    /// Creates an empty mock probe.
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            registry: RwLock::new(HashMap::new()),
            files: RwLock::new(HashMap::new()),
            failures: RwLock::new(HashMap::new()),
            latency: None,
            probe_count: AtomicU64::new(0),
        }
    }

    /// Sets the name of this probe.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds a registry key without values.
    pub fn with_registry_key(self, hive: Hive, key: &str) -> Self {
        self.add_registry_key(hive, key);
        self
    }

    /// Adds a registry string value, creating its key.
    pub fn with_registry_value(
        self,
        hive: Hive,
        key: &str,
        name: &str,
        data: impl Into<String>,
    ) -> Self {
        self.add_registry_value(hive, key, name, data);
        self
    }

    /// Adds a file.
    pub fn with_file(self, path: impl Into<String>, stat: FileStat) -> Self {
        self.add_file(path, stat);
        self
    }

    /// Makes probes of `resource` fail with a backend error.
    ///
    /// `resource` is a file path or a registry key path (`HIVE\key`).
    pub fn with_failure(self, resource: impl Into<String>, message: impl Into<String>) -> Self {
        self.write_failures()
            .insert(normalize(&resource.into()), MockFailure::Backend(message.into()));
        self
    }

    /// Makes probes of `resource` fail with permission denied.
    pub fn with_permission_denied(self, resource: impl Into<String>) -> Self {
        self.write_failures()
            .insert(normalize(&resource.into()), MockFailure::PermissionDenied);
        self
    }

    /// Sets the simulated latency per probe call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Adds a registry key (mutable version).
    pub fn add_registry_key(&self, hive: Hive, key: &str) {
        self.registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key_path(&hive, key))
            .or_default();
    }

    /// Adds a registry string value (mutable version).
    pub fn add_registry_value(&self, hive: Hive, key: &str, name: &str, data: impl Into<String>) {
        self.registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key_path(&hive, key))
            .or_default()
            .insert(name.to_lowercase(), data.into());
    }

    /// Adds a file (mutable version).
    pub fn add_file(&self, path: impl Into<String>, stat: FileStat) {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.into(), stat);
    }

    /// Removes a file, returning whether it existed.
    pub fn remove_file(&self, path: &str) -> bool {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path)
            .is_some()
    }

    /// Returns the number of probe calls made.
    pub fn probe_count(&self) -> u64 {
        self.probe_count.load(Ordering::Relaxed)
    }

    fn write_failures(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, MockFailure>> {
        self.failures.write().unwrap_or_else(PoisonError::into_inner)
    }

    async fn begin(&self, resource: &str) -> Result<(), ProbeError> {
        self.probe_count.fetch_add(1, Ordering::Relaxed);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let failure = self
            .failures
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&normalize(resource))
            .cloned();

        match failure {
            Some(MockFailure::PermissionDenied) => Err(ProbeError::PermissionDenied {
                resource: resource.to_string(),
            }),
            Some(MockFailure::Backend(message)) => Err(ProbeError::backend(&self.name, message)),
            None => Ok(()),
        }
    }
}

impl Default for MockProbe {
    fn default() -> Self {
        Self::new()
    }
}

fn key_path(hive: &Hive, key: &str) -> String {
    normalize(&format!("{hive}\\{key}"))
}

fn normalize(resource: &str) -> String {
    resource.trim_end_matches('\\').to_lowercase()
}

#[async_trait]
impl SystemProbe for MockProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read_registry_string(
        &self,
        hive: &Hive,
        key: &str,
        value_name: Option<&str>,
    ) -> Result<RegistryLookup, ProbeError> {
        let path = format!("{hive}\\{key}");
        self.begin(&path).await?;

        let registry = self.registry.read().unwrap_or_else(PoisonError::into_inner);
        let Some(values) = registry.get(&key_path(hive, key)) else {
            return Ok(RegistryLookup::KeyMissing);
        };

        Ok(match value_name {
            None => RegistryLookup::KeyPresent,
            Some(name) => match values.get(&name.to_lowercase()) {
                Some(data) => RegistryLookup::value(data.clone()),
                None => RegistryLookup::ValueMissing,
            },
        })
    }

    async fn stat_file(&self, path: &str) -> Result<Option<FileStat>, ProbeError> {
        self.begin(path).await?;

        Ok(self
            .files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned())
    }
}
