//! Audit event types and emission functions.

use crate::core::{
    DefinitionResult, DocumentDigest, ResolutionError, ScanReport, StatusCounts, TestResult,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Base trait for audit events.
pub trait AuditEvent: Serialize {
    /// Returns the event type name.
    fn event_type(&self) -> &'static str;

    /// Returns the timestamp of the event.
    fn timestamp(&self) -> DateTime<Utc>;
}

/// Audit summary of a finished scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReportAuditEvent {
    /// Timestamp of the event (scan completion).
    pub timestamp: DateTime<Utc>,

    /// Report identifier.
    pub report_id: String,

    /// BLAKE3 digest of the scanned document, if known.
    pub document_digest: Option<String>,

    /// Whether every definition passed.
    pub compliant: bool,

    /// Test result counts.
    pub tests: StatusCounts,

    /// Definition result counts.
    pub definitions: StatusCounts,

    /// Number of tests that failed to resolve.
    pub resolution_errors: usize,

    /// Identifiers of definitions that did not pass.
    pub non_passing_definitions: Vec<String>,

    /// Scan duration in milliseconds.
    pub duration_ms: u64,
}

impl From<&ScanReport> for ScanReportAuditEvent {
    fn from(report: &ScanReport) -> Self {
        Self {
            timestamp: report.completed_at,
            report_id: report.id.clone(),
            document_digest: report.document_digest.clone(),
            compliant: report.is_compliant(),
            tests: report.test_counts(),
            definitions: report.definition_counts(),
            resolution_errors: report.resolution_errors.len(),
            non_passing_definitions: report
                .definition_results
                .iter()
                .filter(|d| !d.is_pass())
                .map(|d| d.definition_id.clone())
                .collect(),
            duration_ms: report.duration.as_millis() as u64,
        }
    }
}

impl AuditEvent for ScanReportAuditEvent {
    fn event_type(&self) -> &'static str {
        "scan_report"
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Emits an audit event for a scan starting.
pub fn emit_scan_started(
    scan_id: &str,
    digest: Option<&DocumentDigest>,
    check_count: usize,
    definition_count: usize,
) {
    tracing::info!(
        target: "ovalscan::audit",
        event_type = "scan_started",
        scan_id = %scan_id,
        document_digest = ?digest.map(DocumentDigest::as_hex),
        check_count,
        definition_count,
        "Scan started"
    );
}

/// Emits an audit event for a test that could not be resolved.
pub fn emit_resolution_error(scan_id: &str, error: &ResolutionError) {
    tracing::warn!(
        target: "ovalscan::audit",
        event_type = "resolution_error",
        scan_id = %scan_id,
        test_id = %error.test_id,
        missing_ref = %error.missing_ref,
        reference_kind = %error.kind,
        "Test reference could not be resolved"
    );
}

/// Emits an audit event for a completed test.
pub fn emit_test_completed(scan_id: &str, result: &TestResult) {
    tracing::info!(
        target: "ovalscan::audit",
        event_type = "test_completed",
        scan_id = %scan_id,
        test_id = %result.test_id,
        status = %result.status,
        message = %result.message,
        details = ?result.details,
        "Test completed"
    );
}

/// Emits an audit event for an evaluated definition.
pub fn emit_definition_evaluated(scan_id: &str, result: &DefinitionResult) {
    let test_ids: Vec<&str> = result.test_results.iter().map(|r| r.test_id.as_str()).collect();

    tracing::info!(
        target: "ovalscan::audit",
        event_type = "definition_evaluated",
        scan_id = %scan_id,
        definition_id = %result.definition_id,
        class = %result.class,
        status = %result.status,
        criteria_value = result.criteria_value,
        has_error = result.has_error,
        has_unknown = result.has_unknown,
        tests = ?test_ids,
        unresolved_refs = ?result.unresolved_refs,
        "Definition evaluated"
    );
}

/// Emits an audit event for a finished scan.
pub fn emit_scan_report(report: &ScanReport) {
    let event = ScanReportAuditEvent::from(report);

    tracing::info!(
        target: "ovalscan::audit",
        event_type = event.event_type(),
        report_id = %event.report_id,
        document_digest = ?event.document_digest,
        compliant = event.compliant,
        tests_pass = event.tests.pass,
        tests_fail = event.tests.fail,
        tests_error = event.tests.error,
        tests_unknown = event.tests.unknown,
        definitions_pass = event.definitions.pass,
        definitions_fail = event.definitions.fail,
        definitions_error = event.definitions.error,
        definitions_unknown = event.definitions.unknown,
        resolution_errors = event.resolution_errors,
        non_passing_definitions = ?event.non_passing_definitions,
        duration_ms = event.duration_ms,
        "Scan report generated"
    );
}
