//! Scan configuration.

use crate::core::result::duration_serde;
use crate::core::{ResultStatus, ScanError};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a missing resource (registry key, registry value, file) is classified.
///
/// Absence usually says something about the assessed control, so the
/// default is `Fail`. Definitions that treat absence as inconclusive can opt
/// into `Unknown` or `Error`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbsencePolicy {
    /// Absence is a compliance failure.
    #[default]
    Fail,
    /// Absence is inconclusive.
    Unknown,
    /// Absence is an assessment error.
    Error,
}

impl AbsencePolicy {
    /// The status a missing resource is reported with.
    pub fn status(self) -> ResultStatus {
        match self {
            Self::Fail => ResultStatus::Fail,
            Self::Unknown => ResultStatus::Unknown,
            Self::Error => ResultStatus::Error,
        }
    }
}

/// Configuration for an [`OvalScanner`](crate::manager::OvalScanner).
///
/// # Example
///
/// ```rust
/// use ovalscan::manager::{AbsencePolicy, ScanConfig};
///
/// let config = ScanConfig::from_json_str(
///     r#"{ "max_concurrent_checks": 4, "probe_timeout": 5000, "absence_policy": "unknown" }"#,
/// )
/// .unwrap();
/// assert_eq!(config.max_concurrent_checks, 4);
/// assert_eq!(config.absence_policy, AbsencePolicy::Unknown);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Maximum number of checks probing the host at once.
    pub max_concurrent_checks: usize,

    /// Timeout for a single check; expiry yields an `error` result.
    #[serde(with = "duration_serde")]
    pub probe_timeout: Duration,

    /// How missing resources are classified.
    pub absence_policy: AbsencePolicy,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_concurrent_checks: 8,
            probe_timeout: Duration::from_secs(30),
            absence_policy: AbsencePolicy::Fail,
        }
    }
}

impl ScanConfig {
    /// Creates a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::Configuration` if the JSON is invalid.
    pub fn from_json_str(json: &str) -> Result<Self, ScanError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|err| ScanError::configuration(format!("invalid scan configuration: {err}")))?;
        Ok(config.normalized())
    }

    /// Sets the concurrency limit (at least 1).
    pub fn with_max_concurrent_checks(mut self, max: usize) -> Self {
        self.max_concurrent_checks = max.max(1);
        self
    }

    /// Sets the per-check timeout.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Sets the absence policy.
    pub fn with_absence_policy(mut self, policy: AbsencePolicy) -> Self {
        self.absence_policy = policy;
        self
    }

    pub(crate) fn normalized(mut self) -> Self {
        self.max_concurrent_checks = self.max_concurrent_checks.max(1);
        self
    }
}
