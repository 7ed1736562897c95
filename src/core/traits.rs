//! Core traits for the ovalscan library.
//!
//! This module defines the two seams of the engine:
//!
//! - [`SystemProbe`]: the narrow host capability (read a registry string,
//!   stat a file). It is the only place the engine touches the host, so a
//!   native implementation, a mock or a remote agent can be swapped in.
//! - [`CheckExecutor`]: evaluates one resolved [`Check`] through a probe and
//!   reports a [`TestResult`].

use crate::core::error::ProbeError;
use crate::core::result::TestResult;
use crate::core::types::{CheckFamily, Hive};
use crate::resolver::Check;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// What a registry read found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegistryLookup {
    /// The key does not exist.
    KeyMissing,
    /// The key exists but the named value does not.
    ValueMissing,
    /// The key exists and no value name was requested.
    KeyPresent,
    /// The value was read.
    Value {
        /// The value as a string.
        data: String,
    },
}

impl RegistryLookup {
    /// Creates a `Value` lookup.
    pub fn value(data: impl Into<String>) -> Self {
        Self::Value { data: data.into() }
    }
}

/// File properties returned by a stat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStat {
    /// File size in bytes.
    pub size: u64,

    /// Last modification time, if the host reports one.
    pub modified: Option<DateTime<Utc>>,

    /// Permission bits (`0o7777` mask).
    pub permissions: u32,
}

impl FileStat {
    /// Creates a stat with the given size and permission bits.
    pub fn new(size: u64, permissions: u32) -> Self {
        Self {
            size,
            modified: None,
            permissions,
        }
    }

    /// Sets the modification time.
    pub fn with_modified(mut self, modified: DateTime<Utc>) -> Self {
        self.modified = Some(modified);
        self
    }

    /// Returns `true` if the owner-write bit is set.
    pub fn owner_writable(&self) -> bool {
        self.permissions & 0o200 != 0
    }

    /// Returns the permission bits as an octal string (e.g. `644`).
    pub fn permissions_octal(&self) -> String {
        format!("{:o}", self.permissions & 0o7777)
    }
}

/// The host capability the engine probes through.
///
/// # Implementation Notes
///
/// - Implementations must be `Send + Sync`; checks run concurrently.
/// - Absence is not an error: a missing key, value or file is reported as
///   data (`RegistryLookup::KeyMissing`, `Ok(None)`), because absence is
///   itself informative about the assessed control.
/// - Return `ProbeError` only when the host could not be asked (permission
///   denied, I/O failure, unsupported platform).
/// - Never block the async runtime; wrap blocking OS calls in
///   `spawn_blocking`.
#[async_trait]
pub trait SystemProbe: Send + Sync + Debug {
    /// Returns a stable name for logs, e.g. "host" or "mock".
    fn name(&self) -> &str;

    /// Reads a string value from the registry.
    ///
    /// With `value_name == None` only the key's existence is checked.
    ///
    /// # Errors
    ///
    /// Returns `ProbeError` when the registry could not be queried.
    async fn read_registry_string(
        &self,
        hive: &Hive,
        key: &str,
        value_name: Option<&str>,
    ) -> Result<RegistryLookup, ProbeError>;

    /// Stats a file. Returns `Ok(None)` when the path does not exist.
    ///
    /// # Errors
    ///
    /// Returns `ProbeError` when the path could not be inspected.
    async fn stat_file(&self, path: &str) -> Result<Option<FileStat>, ProbeError>;
}

/// Evaluates one family of checks.
///
/// Executors are stateless; all host access goes through the probe argument.
/// A returned `Err` is downgraded to an `error` result by the caller, so an
/// executor only returns `Err` for transport failures, never for a failed
/// condition.
#[async_trait]
pub trait CheckExecutor: Send + Sync + Debug {
    /// The family this executor handles.
    fn family(&self) -> CheckFamily;

    /// Runs the check and reports its outcome.
    ///
    /// # Errors
    ///
    /// Returns `ProbeError` when the probe could not assess the resource.
    async fn execute(&self, probe: &dyn SystemProbe, check: &Check) -> Result<TestResult, ProbeError>;
}

/// A shared probe for use across concurrent checks.
pub type ArcProbe = std::sync::Arc<dyn SystemProbe>;
