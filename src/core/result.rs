//! Result structures.
//!
//! This module defines `TestResult`, `DefinitionResult` and `ScanReport`,
//! the read-only records handed to reporting collaborators. Records are
//! created once and never mutated after they are appended to a report.

use crate::core::error::ResolutionError;
use crate::core::types::ResultStatus;
use crate::resolver::UnresolvedCriterion;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// The outcome of executing one test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    /// Identifier of the test.
    pub test_id: String,

    /// Outcome status.
    pub status: ResultStatus,

    /// Log-oriented description of the outcome.
    pub message: String,

    /// When the result was produced (RFC 3339 on the wire).
    pub timestamp: DateTime<Utc>,

    /// Observed and expected values for auditability.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, serde_json::Value>,
}

impl TestResult {
    /// Creates a new result stamped with the current time.
    pub fn new(test_id: impl Into<String>, status: ResultStatus, message: impl Into<String>) -> Self {
        Self {
            test_id: test_id.into(),
            status,
            message: message.into(),
            timestamp: Utc::now(),
            details: BTreeMap::new(),
        }
    }

    /// Creates a `pass` result.
    pub fn pass(test_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(test_id, ResultStatus::Pass, message)
    }

    /// Creates a `fail` result.
    pub fn fail(test_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(test_id, ResultStatus::Fail, message)
    }

    /// Creates an `error` result.
    pub fn error(test_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(test_id, ResultStatus::Error, message)
    }

    /// Creates an `unknown` result.
    pub fn unknown(test_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(test_id, ResultStatus::Unknown, message)
    }

    /// Creates the `error` result recorded for a check that was cancelled.
    pub fn cancelled(test_id: impl Into<String>) -> Self {
        Self::error(test_id, "Cancelled: scan deadline reached before the check completed")
    }

    /// Adds a detail entry.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Returns a detail value by key.
    pub fn detail(&self, key: &str) -> Option<&serde_json::Value> {
        self.details.get(key)
    }

    /// Returns `true` if the test passed.
    pub fn is_pass(&self) -> bool {
        self.status.is_pass()
    }
}

/// The verdict for one definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinitionResult {
    /// Identifier of the definition.
    pub definition_id: String,

    /// Definition class (e.g. "compliance").
    pub class: String,

    /// Definition title, if present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Overall status derived from the criteria tree.
    pub status: ResultStatus,

    /// Boolean value of the criteria root, before status derivation.
    pub criteria_value: bool,

    /// A contributing test was `error` or a reference named no test.
    #[serde(default)]
    pub has_error: bool,

    /// A contributing test or criteria node was inconclusive.
    #[serde(default)]
    pub has_unknown: bool,

    /// Results of the tests referenced by the criteria, in document order.
    pub test_results: Vec<TestResult>,

    /// Test references in the criteria that name no test in the document.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unresolved_refs: Vec<String>,

    /// When the definition was evaluated.
    pub evaluated_at: DateTime<Utc>,
}

impl DefinitionResult {
    /// Returns `true` if the definition passed.
    pub fn is_pass(&self) -> bool {
        self.status.is_pass()
    }
}

/// Counts of results per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    /// Number of `pass` results.
    pub pass: usize,
    /// Number of `fail` results.
    pub fail: usize,
    /// Number of `error` results.
    pub error: usize,
    /// Number of `unknown` results.
    pub unknown: usize,
}

impl StatusCounts {
    /// Tallies an iterator of statuses.
    pub fn tally(statuses: impl IntoIterator<Item = ResultStatus>) -> Self {
        let mut counts = Self::default();
        for status in statuses {
            match status {
                ResultStatus::Pass => counts.pass += 1,
                ResultStatus::Fail => counts.fail += 1,
                ResultStatus::Error => counts.error += 1,
                ResultStatus::Unknown => counts.unknown += 1,
            }
        }
        counts
    }

    /// Total number of results counted.
    pub fn total(&self) -> usize {
        self.pass + self.fail + self.error + self.unknown
    }
}

/// The complete, ordered output of one scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    /// Unique identifier for this report.
    pub id: String,

    /// BLAKE3 digest of the scanned document, when scanned from raw bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_digest: Option<String>,

    /// When the scan started.
    pub started_at: DateTime<Utc>,

    /// When the scan completed.
    pub completed_at: DateTime<Utc>,

    /// Wall-clock duration of the scan.
    #[serde(with = "duration_serde")]
    pub duration: Duration,

    /// One result per test, in document order of tests.
    pub test_results: Vec<TestResult>,

    /// One result per definition, in document order of definitions.
    pub definition_results: Vec<DefinitionResult>,

    /// Tests whose object or state reference did not resolve.
    #[serde(default)]
    pub resolution_errors: Vec<ResolutionError>,

    /// Criteria leaves whose test reference names no test.
    #[serde(default)]
    pub unresolved_criteria: Vec<UnresolvedCriterion>,
}

impl ScanReport {
    /// Returns the result for a test by id.
    pub fn test(&self, test_id: &str) -> Option<&TestResult> {
        self.test_results.iter().find(|r| r.test_id == test_id)
    }

    /// Returns the result for a definition by id.
    pub fn definition(&self, definition_id: &str) -> Option<&DefinitionResult> {
        self.definition_results
            .iter()
            .find(|r| r.definition_id == definition_id)
    }

    /// Counts test results per status.
    pub fn test_counts(&self) -> StatusCounts {
        StatusCounts::tally(self.test_results.iter().map(|r| r.status))
    }

    /// Counts definition results per status.
    pub fn definition_counts(&self) -> StatusCounts {
        StatusCounts::tally(self.definition_results.iter().map(|r| r.status))
    }

    /// Returns `true` if every definition passed.
    pub fn is_compliant(&self) -> bool {
        self.definition_results.iter().all(DefinitionResult::is_pass)
    }
}

/// Serde helper for Duration serialization (milliseconds).
pub(crate) mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
