//! Basic scan example evaluating an embedded definitions document.
//!
//! This example shows how to:
//! - Seed a mock probe with registry values and files
//! - Build an OvalScanner with a custom configuration
//! - Scan a document and print per-test and per-definition verdicts
//!
//! Run with: cargo run --example basic_scan

use ovalscan::prelude::*;
use std::time::Duration;

const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<oval_definitions xmlns="http://oval.mitre.org/XMLSchema/oval-definitions-5"
    xmlns:win-def="http://oval.mitre.org/XMLSchema/oval-definitions-5#windows"
    xmlns:ind-def="http://oval.mitre.org/XMLSchema/oval-definitions-5#independent">
  <definitions>
    <definition id="oval:demo:def:1" version="1" class="compliance">
      <metadata>
        <title>Firewall enabled and policy marker present</title>
        <description>The domain firewall profile is on and the policy marker file exists.</description>
      </metadata>
      <criteria operator="AND">
        <criterion test_ref="oval:demo:tst:1"/>
        <criterion test_ref="oval:demo:tst:2"/>
      </criteria>
    </definition>
    <definition id="oval:demo:def:2" version="1" class="compliance">
      <metadata>
        <title>Hosts file is not writable</title>
      </metadata>
      <criteria>
        <criterion test_ref="oval:demo:tst:3"/>
      </criteria>
    </definition>
  </definitions>
  <tests>
    <win-def:registry_test id="oval:demo:tst:1" comment="firewall enabled">
      <win-def:object object_ref="oval:demo:obj:1"/>
      <win-def:state state_ref="oval:demo:ste:1"/>
    </win-def:registry_test>
    <ind-def:file_test id="oval:demo:tst:2" comment="policy marker exists">
      <ind-def:object object_ref="oval:demo:obj:2"/>
    </ind-def:file_test>
    <ind-def:file_test id="oval:demo:tst:3" comment="hosts not writable">
      <ind-def:object object_ref="oval:demo:obj:3"/>
      <ind-def:state state_ref="oval:demo:ste:3"/>
    </ind-def:file_test>
  </tests>
  <objects>
    <win-def:registry_object id="oval:demo:obj:1">
      <win-def:hive>HKEY_LOCAL_MACHINE</win-def:hive>
      <win-def:key>SYSTEM\CurrentControlSet\Services\SharedAccess\Parameters\FirewallPolicy\DomainProfile</win-def:key>
      <win-def:name>EnableFirewall</win-def:name>
    </win-def:registry_object>
    <ind-def:file_object id="oval:demo:obj:2">
      <ind-def:path>C:\ProgramData\Policy</ind-def:path>
      <ind-def:filename>marker.txt</ind-def:filename>
    </ind-def:file_object>
    <ind-def:file_object id="oval:demo:obj:3">
      <ind-def:filepath>C:\Windows\System32\drivers\etc\hosts</ind-def:filepath>
    </ind-def:file_object>
  </objects>
  <states>
    <win-def:registry_state id="oval:demo:ste:1">
      <win-def:value operation="equals" datatype="int">1</win-def:value>
    </win-def:registry_state>
    <ind-def:file_state id="oval:demo:ste:3">
      <ind-def:uwrite datatype="boolean">false</ind-def:uwrite>
    </ind-def:file_state>
  </states>
</oval_definitions>"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== Ovalscan Basic Scan Example ===\n");

    // A mock host: firewall on, marker present, hosts file writable
    let probe = MockProbe::new()
        .with_name("demo-host")
        .with_registry_value(
            Hive::HkeyLocalMachine,
            r"SYSTEM\CurrentControlSet\Services\SharedAccess\Parameters\FirewallPolicy\DomainProfile",
            "EnableFirewall",
            "0x1",
        )
        .with_file(r"C:\ProgramData\Policy\marker.txt", FileStat::new(64, 0o644))
        .with_file(r"C:\Windows\System32\drivers\etc\hosts", FileStat::new(824, 0o644));

    let config = ScanConfig::new()
        .with_max_concurrent_checks(4)
        .with_probe_timeout(Duration::from_secs(5));

    let scanner = OvalScanner::builder()
        .with_probe(probe)
        .with_config(config)
        .build()?;

    // Give the whole scan a deadline
    let cancel = CancelSignal::with_timeout(Duration::from_secs(30));
    let report = scanner
        .scan_source(
            &DocumentSource::from_bytes(DOCUMENT.as_bytes()).with_name("embedded-demo"),
            &cancel,
        )
        .await?;

    println!("Report {} ({} ms)", report.id, report.duration.as_millis());
    if let Some(digest) = &report.document_digest {
        println!("Document: blake3:{digest}");
    }

    println!("\nTests:");
    for result in &report.test_results {
        println!("  [{:>7}] {} - {}", result.status, result.test_id, result.message);
    }

    println!("\nDefinitions:");
    for definition in &report.definition_results {
        println!(
            "  [{:>7}] {} - {}",
            definition.status,
            definition.definition_id,
            definition.title.as_deref().unwrap_or("(untitled)")
        );
    }

    let counts = report.definition_counts();
    println!(
        "\n{} passed, {} failed, {} error, {} unknown",
        counts.pass, counts.fail, counts.error, counts.unknown
    );
    println!("Compliant: {}", report.is_compliant());

    Ok(())
}
