//! The main scanner implementation.

use crate::core::{
    ArcProbe, CancelSignal, DocumentDigest, DocumentSource, ScanError, ScanReport, SystemProbe,
    TestResult,
};
use crate::document::{self, Document};
use crate::executors::Executors;
use crate::manager::aggregate::ResultAggregator;
use crate::manager::config::ScanConfig;
use crate::resolver::{resolve, Check};

use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Builder for creating an `OvalScanner`.
#[derive(Debug, Default)]
pub struct OvalScannerBuilder {
    probe: Option<ArcProbe>,
    config: ScanConfig,
}

impl OvalScannerBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the probe checks run against.
    pub fn with_probe<P: SystemProbe + 'static>(mut self, probe: P) -> Self {
        self.probe = Some(Arc::new(probe));
        self
    }

    /// Sets a probe already wrapped in an Arc.
    pub fn with_arc_probe(mut self, probe: ArcProbe) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Sets the configuration.
    pub fn with_config(mut self, config: ScanConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the scanner.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::Configuration` if no probe was set.
    pub fn build(self) -> Result<OvalScanner, ScanError> {
        let probe = self
            .probe
            .ok_or_else(|| ScanError::configuration("A system probe is required"))?;

        Ok(OvalScanner {
            probe,
            config: self.config.normalized(),
        })
    }
}

/// Evaluates definitions documents against a host.
///
/// The scanner holds no per-scan state; each call resolves, executes and
/// aggregates from scratch, so one instance can serve concurrent scans.
///
/// # Example
///
/// ```rust
/// use ovalscan::core::CancelSignal;
/// use ovalscan::manager::OvalScanner;
/// use ovalscan::probes::MockProbe;
///
/// # tokio_test_block_on(async {
/// let scanner = OvalScanner::builder().with_probe(MockProbe::new()).build()?;
/// let xml = br#"<oval_definitions><definitions/></oval_definitions>"#;
/// let report = scanner.scan(xml, &CancelSignal::never()).await?;
/// assert!(report.definition_results.is_empty());
/// # Ok::<(), ovalscan::core::ScanError>(())
/// # }).unwrap();
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
/// # }
/// ```
pub struct OvalScanner {
    probe: ArcProbe,
    config: ScanConfig,
}

impl OvalScanner {
    /// Creates a new builder.
    pub fn builder() -> OvalScannerBuilder {
        OvalScannerBuilder::new()
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Returns the probe checks run against.
    pub fn probe(&self) -> &ArcProbe {
        &self.probe
    }

    /// Parses and scans a raw document.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::Parse` if the document cannot be parsed. Every
    /// other failure is captured in the report.
    pub async fn scan(&self, raw: &[u8], cancel: &CancelSignal) -> Result<ScanReport, ScanError> {
        let digest = DocumentDigest::of(raw);
        let document = document::parse(raw)?;
        Ok(run_scan_inner(&document, Some(&digest), self.probe.as_ref(), &self.config, cancel).await)
    }

    /// Reads, parses and scans a document source.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::Input` if the source cannot be read, or
    /// `ScanError::Parse` if it cannot be parsed.
    pub async fn scan_source(
        &self,
        source: &DocumentSource,
        cancel: &CancelSignal,
    ) -> Result<ScanReport, ScanError> {
        debug!(source = %source.name(), "Reading document");
        let raw = source.read().await?;
        self.scan(&raw, cancel).await
    }

    /// Scans an already parsed document.
    pub async fn scan_document(&self, document: &Document, cancel: &CancelSignal) -> ScanReport {
        run_scan_inner(document, None, self.probe.as_ref(), &self.config, cancel).await
    }
}

impl std::fmt::Debug for OvalScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OvalScanner")
            .field("probe", &self.probe.name())
            .field("config", &self.config)
            .finish()
    }
}

/// Scans a parsed document against a probe.
///
/// Checks run concurrently, at most `config.max_concurrent_checks` at a
/// time; results are collected only after every check has finished and are
/// reported in document order.
pub async fn run_scan(
    document: &Document,
    probe: &dyn SystemProbe,
    config: &ScanConfig,
    cancel: &CancelSignal,
) -> ScanReport {
    run_scan_inner(document, None, probe, config, cancel).await
}

async fn run_scan_inner(
    document: &Document,
    digest: Option<&DocumentDigest>,
    probe: &dyn SystemProbe,
    config: &ScanConfig,
    cancel: &CancelSignal,
) -> ScanReport {
    let scan_id = Uuid::new_v4().to_string();
    let started_at = Utc::now();
    let clock = std::time::Instant::now();

    let resolution = resolve(document);

    info!(
        scan_id = %scan_id,
        probe = probe.name(),
        checks = resolution.checks.len(),
        definitions = document.definitions().len(),
        "Starting scan"
    );
    crate::audit::emit_scan_started(
        &scan_id,
        digest,
        resolution.checks.len(),
        document.definitions().len(),
    );
    for error in &resolution.errors {
        crate::audit::emit_resolution_error(&scan_id, error);
    }

    let executors = Executors::new(config.absence_policy);
    let executed: Vec<TestResult> = stream::iter(&resolution.checks)
        .map(|check| run_check(&executors, probe, check, config.probe_timeout, cancel))
        .buffered(config.max_concurrent_checks.max(1))
        .collect()
        .await;

    let mut aggregator = ResultAggregator::new(document);
    for result in executed {
        crate::audit::emit_test_completed(&scan_id, &result);
        aggregator.record(result);
    }
    for error in &resolution.errors {
        aggregator.record_resolution_error(error);
    }

    let definition_results = aggregator.definition_results();
    for result in &definition_results {
        crate::audit::emit_definition_evaluated(&scan_id, result);
    }

    let report = ScanReport {
        id: scan_id,
        document_digest: digest.map(|d| d.as_hex().to_string()),
        started_at,
        completed_at: Utc::now(),
        duration: clock.elapsed(),
        test_results: aggregator.test_results(),
        definition_results,
        resolution_errors: resolution.errors,
        unresolved_criteria: resolution.unresolved_criteria,
    };

    info!(
        scan_id = %report.id,
        tests = ?report.test_counts(),
        definitions = ?report.definition_counts(),
        duration_ms = report.duration.as_millis() as u64,
        "Scan completed"
    );
    crate::audit::emit_scan_report(&report);

    report
}

/// Runs one check, turning every failure mode into a result.
async fn run_check(
    executors: &Executors,
    probe: &dyn SystemProbe,
    check: &Check,
    timeout: Duration,
    cancel: &CancelSignal,
) -> TestResult {
    if cancel.is_cancelled() {
        debug!(test_id = %check.test_id, "Check skipped, scan already cancelled");
        return TestResult::cancelled(&check.test_id);
    }

    let execution = tokio::time::timeout(timeout, executors.execute(probe, check));

    tokio::select! {
        biased;

        _ = cancel.cancelled() => {
            warn!(test_id = %check.test_id, "Check cancelled while in flight");
            TestResult::cancelled(&check.test_id)
        }

        outcome = execution => match outcome {
            Ok(Ok(result)) => {
                debug!(test_id = %check.test_id, status = %result.status, "Check completed");
                result
            }
            Ok(Err(err)) => {
                warn!(
                    test_id = %check.test_id,
                    probe = probe.name(),
                    error = %err,
                    "Probe failed, continuing with other checks"
                );
                TestResult::error(&check.test_id, err.to_string())
                    .with_detail("probe", probe.name())
            }
            Err(_) => {
                warn!(
                    test_id = %check.test_id,
                    timeout_ms = timeout.as_millis() as u64,
                    "Check timed out"
                );
                TestResult::error(
                    &check.test_id,
                    format!("check timed out after {}ms", timeout.as_millis()),
                )
                .with_detail("timeout_ms", timeout.as_millis() as u64)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FileStat, Hive, ResultStatus};
    use crate::probes::MockProbe;
    use tokio::time::Instant;

    const END_TO_END: &str = r#"<oval_definitions>
  <definitions>
    <definition id="oval:demo:def:1" class="compliance">
      <metadata><title>Feature enabled and marker present</title></metadata>
      <criteria operator="AND">
        <criterion test_ref="oval:demo:tst:1" negate="false"/>
        <criterion test_ref="oval:demo:tst:2" negate="false"/>
      </criteria>
    </definition>
  </definitions>
  <tests>
    <registry_test id="oval:demo:tst:1">
      <object object_ref="oval:demo:obj:1"/>
      <state state_ref="oval:demo:ste:1"/>
    </registry_test>
    <file_test id="oval:demo:tst:2">
      <object object_ref="oval:demo:obj:2"/>
    </file_test>
  </tests>
  <objects>
    <registry_object id="oval:demo:obj:1">
      <hive>HKEY_LOCAL_MACHINE</hive>
      <key>Software\Test</key>
      <name>Enabled</name>
    </registry_object>
    <file_object id="oval:demo:obj:2">
      <filepath>C:\marker.txt</filepath>
    </file_object>
  </objects>
  <states>
    <registry_state id="oval:demo:ste:1">
      <value operation="equals">1</value>
    </registry_state>
  </states>
</oval_definitions>"#;

    fn healthy_probe() -> MockProbe {
        MockProbe::new()
            .with_registry_value(Hive::HkeyLocalMachine, "Software\\Test", "Enabled", "1")
            .with_file("C:\\marker.txt", FileStat::new(7, 0o644))
    }

    fn scanner(probe: MockProbe) -> OvalScanner {
        OvalScanner::builder().with_probe(probe).build().unwrap()
    }

    fn statuses(report: &ScanReport) -> Vec<ResultStatus> {
        report.test_results.iter().map(|r| r.status).collect()
    }

    #[tokio::test]
    async fn test_end_to_end_scan_passes() {
        let report = scanner(healthy_probe())
            .scan(END_TO_END.as_bytes(), &CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(statuses(&report), vec![ResultStatus::Pass, ResultStatus::Pass]);
        let definition = report.definition("oval:demo:def:1").unwrap();
        assert_eq!(definition.status, ResultStatus::Pass);
        assert_eq!(definition.test_results.len(), 2);
        assert!(report.is_compliant());
        assert_eq!(
            report.document_digest.as_deref(),
            Some(DocumentDigest::of(END_TO_END.as_bytes()).as_hex())
        );
    }

    #[tokio::test]
    async fn test_end_to_end_scan_fails_on_mismatch() {
        let probe = MockProbe::new()
            .with_registry_value(Hive::HkeyLocalMachine, "Software\\Test", "Enabled", "0")
            .with_file("C:\\marker.txt", FileStat::new(7, 0o644));

        let report = scanner(probe)
            .scan(END_TO_END.as_bytes(), &CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(statuses(&report), vec![ResultStatus::Fail, ResultStatus::Pass]);
        assert_eq!(
            report.definition("oval:demo:def:1").map(|d| d.status),
            Some(ResultStatus::Fail)
        );
    }

    #[tokio::test]
    async fn test_probe_failure_is_isolated() {
        let probe = healthy_probe().with_failure("HKEY_LOCAL_MACHINE\\Software\\Test", "transport failure");

        let report = scanner(probe)
            .scan(END_TO_END.as_bytes(), &CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(statuses(&report), vec![ResultStatus::Error, ResultStatus::Pass]);
        assert!(report.test_results[0].message.contains("transport failure"));
        assert_eq!(
            report.definition("oval:demo:def:1").map(|d| d.status),
            Some(ResultStatus::Error)
        );
    }

    #[tokio::test]
    async fn test_expired_deadline_cancels_every_check() {
        let probe = healthy_probe();
        let scanner = scanner(probe);
        let cancel = CancelSignal::with_deadline(Instant::now());

        let report = tokio::time::timeout(
            Duration::from_secs(5),
            scanner.scan(END_TO_END.as_bytes(), &cancel),
        )
        .await
        .expect("cancelled scan returns without blocking")
        .unwrap();

        assert_eq!(statuses(&report), vec![ResultStatus::Error, ResultStatus::Error]);
        assert!(report
            .test_results
            .iter()
            .all(|r| r.message.starts_with("Cancelled")));
        assert_eq!(
            report.definition("oval:demo:def:1").map(|d| d.status),
            Some(ResultStatus::Error)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_in_flight_checks() {
        let probe = healthy_probe().with_latency(Duration::from_secs(60));
        let scanner = scanner(probe);
        let (handle, cancel) = CancelSignal::pair();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            handle.cancel();
        });

        let started = Instant::now();
        let report = scanner.scan(END_TO_END.as_bytes(), &cancel).await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(60));
        assert_eq!(statuses(&report), vec![ResultStatus::Error, ResultStatus::Error]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_timeout_yields_error() {
        let probe = healthy_probe().with_latency(Duration::from_secs(10));
        let scanner = OvalScanner::builder()
            .with_probe(probe)
            .with_config(ScanConfig::new().with_probe_timeout(Duration::from_secs(1)))
            .build()
            .unwrap();

        let report = scanner
            .scan(END_TO_END.as_bytes(), &CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(statuses(&report), vec![ResultStatus::Error, ResultStatus::Error]);
        assert!(report.test_results[0].message.contains("timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_is_bounded_and_order_is_stable() {
        let mut tests = String::new();
        let mut objects = String::new();
        for i in 1..=4 {
            tests.push_str(&format!(
                r#"<file_test id="t{i}"><object object_ref="o{i}"/></file_test>"#
            ));
            objects.push_str(&format!(
                r#"<file_object id="o{i}"><filepath>/f{i}</filepath></file_object>"#
            ));
        }
        let xml = format!(
            "<oval_definitions><definitions/><tests>{tests}</tests><objects>{objects}</objects></oval_definitions>"
        );

        let mut probe = MockProbe::new().with_latency(Duration::from_secs(1));
        for i in 1..=4 {
            probe = probe.with_file(format!("/f{i}"), FileStat::new(i, 0o644));
        }
        let scanner = OvalScanner::builder()
            .with_probe(probe)
            .with_config(ScanConfig::new().with_max_concurrent_checks(2))
            .build()
            .unwrap();

        let started = Instant::now();
        let report = scanner
            .scan(xml.as_bytes(), &CancelSignal::never())
            .await
            .unwrap();
        let elapsed = started.elapsed();

        assert!(elapsed >= Duration::from_secs(2));
        assert!(elapsed < Duration::from_secs(4));
        let ids: Vec<_> = report.test_results.iter().map(|r| r.test_id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t2", "t3", "t4"]);
    }

    #[tokio::test]
    async fn test_resolution_errors_do_not_abort_scan() {
        let xml = br#"<oval_definitions>
  <definitions>
    <definition id="d1" class="compliance">
      <criteria>
        <criterion test_ref="t1"/>
        <criterion test_ref="t2"/>
      </criteria>
    </definition>
    <definition id="d2" class="compliance">
      <criteria operator="OR">
        <criterion test_ref="t1"/>
        <criterion test_ref="missing"/>
      </criteria>
    </definition>
  </definitions>
  <tests>
    <file_test id="t1"><object object_ref="o1"/></file_test>
    <file_test id="t2"><object object_ref="nowhere"/></file_test>
  </tests>
  <objects>
    <file_object id="o1"><filepath>/present</filepath></file_object>
  </objects>
</oval_definitions>"#;
        let probe = MockProbe::new().with_file("/present", FileStat::new(1, 0o644));

        let report = scanner(probe).scan(xml, &CancelSignal::never()).await.unwrap();

        assert_eq!(statuses(&report), vec![ResultStatus::Pass, ResultStatus::Error]);
        assert_eq!(report.resolution_errors.len(), 1);
        assert_eq!(report.unresolved_criteria.len(), 1);
        assert_eq!(report.definition("d1").map(|d| d.status), Some(ResultStatus::Error));

        let d2 = report.definition("d2").unwrap();
        assert_eq!(d2.status, ResultStatus::Error);
        assert_eq!(d2.unresolved_refs, vec!["missing".to_string()]);
    }

    #[tokio::test]
    async fn test_registry_state_in_schema_order() {
        let xml = br#"<oval_definitions>
  <definitions>
    <definition id="d1" class="compliance">
      <criteria><criterion test_ref="t1"/></criteria>
    </definition>
  </definitions>
  <tests>
    <registry_test id="t1">
      <object object_ref="o1"/>
      <state state_ref="s1"/>
    </registry_test>
  </tests>
  <objects>
    <registry_object id="o1">
      <hive>HKEY_LOCAL_MACHINE</hive>
      <key>Software\Test</key>
      <name>Enabled</name>
    </registry_object>
  </objects>
  <states>
    <registry_state id="s1">
      <type>reg_sz</type>
      <value>
        1
      </value>
    </registry_state>
  </states>
</oval_definitions>"#;

        let report = scanner(healthy_probe()).scan(xml, &CancelSignal::never()).await.unwrap();

        assert_eq!(statuses(&report), vec![ResultStatus::Pass]);
        assert_eq!(
            report.test_results[0].detail("expected"),
            Some(&serde_json::json!("1"))
        );
        assert_eq!(report.definition("d1").map(|d| d.status), Some(ResultStatus::Pass));
    }

    #[tokio::test]
    async fn test_incomplete_items_only_affect_their_tests() {
        let xml = br#"<oval_definitions>
  <definitions>
    <definition id="d1" class="compliance">
      <criteria><criterion test_ref="t1"/></criteria>
    </definition>
  </definitions>
  <tests>
    <file_test id="t1"><object object_ref="o1"/></file_test>
    <registry_test id="t2"><object object_ref="o2"/></registry_test>
    <file_test id="t3"/>
  </tests>
  <objects>
    <file_object id="o1"><filepath>/present</filepath></file_object>
    <registry_object id="o2"><key>Software\Test</key></registry_object>
  </objects>
</oval_definitions>"#;
        let probe = MockProbe::new().with_file("/present", FileStat::new(1, 0o644));

        let report = scanner(probe).scan(xml, &CancelSignal::never()).await.unwrap();

        assert_eq!(
            statuses(&report),
            vec![ResultStatus::Pass, ResultStatus::Unknown, ResultStatus::Error]
        );
        assert!(report.test_results[1].message.contains("missing 'hive'"));
        assert_eq!(report.resolution_errors.len(), 1);
        assert_eq!(report.definition("d1").map(|d| d.status), Some(ResultStatus::Pass));
    }

    #[tokio::test]
    async fn test_unknown_branch_does_not_mask_a_passing_or() {
        let xml = br#"<oval_definitions>
  <definitions>
    <definition id="d1" class="compliance">
      <criteria operator="OR">
        <criterion test_ref="t1"/>
        <criterion test_ref="t2"/>
      </criteria>
    </definition>
  </definitions>
  <tests>
    <file_test id="t1"><object object_ref="o1"/></file_test>
    <process_test id="t2"><object object_ref="o2"/></process_test>
  </tests>
  <objects>
    <file_object id="o1"><filepath>/present</filepath></file_object>
    <process_object id="o2"><command>sshd</command></process_object>
  </objects>
</oval_definitions>"#;
        let probe = MockProbe::new().with_file("/present", FileStat::new(1, 0o644));

        let report = scanner(probe).scan(xml, &CancelSignal::never()).await.unwrap();

        assert_eq!(statuses(&report), vec![ResultStatus::Pass, ResultStatus::Unknown]);
        let d1 = report.definition("d1").unwrap();
        assert_eq!(d1.status, ResultStatus::Pass);
        assert!(d1.has_unknown);
    }

    #[tokio::test]
    async fn test_parse_error_is_fatal() {
        let err = scanner(MockProbe::new())
            .scan(b"<not-xml", &CancelSignal::never())
            .await
            .unwrap_err();
        assert!(err.is_parse_error());
    }

    #[tokio::test]
    async fn test_scan_source_reads_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(END_TO_END.as_bytes()).unwrap();

        let report = scanner(healthy_probe())
            .scan_source(&DocumentSource::from_path(file.path()), &CancelSignal::never())
            .await
            .unwrap();
        assert!(report.is_compliant());
    }

    #[tokio::test]
    async fn test_run_scan_without_scanner() {
        let document = document::parse(END_TO_END.as_bytes()).unwrap();
        let report = run_scan(
            &document,
            &healthy_probe(),
            &ScanConfig::default(),
            &CancelSignal::never(),
        )
        .await;

        assert!(report.document_digest.is_none());
        assert_eq!(report.test_counts().pass, 2);
    }

    #[test]
    fn test_builder_requires_probe() {
        let result = OvalScanner::builder().build();
        assert!(matches!(result, Err(ScanError::Configuration { .. })));
    }
}
