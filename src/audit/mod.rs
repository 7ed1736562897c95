//! Structured audit logging for compliance environments.
//!
//! This module provides functions for emitting structured audit events
//! on the `ovalscan::audit` tracing target. Events can be captured by any
//! tracing subscriber (JSON file, OpenTelemetry, etc.) so every verdict can
//! be traced back to the checks that produced it.

mod events;

pub use events::{
    emit_definition_evaluated, emit_resolution_error, emit_scan_report, emit_scan_started,
    emit_test_completed, AuditEvent, ScanReportAuditEvent,
};
