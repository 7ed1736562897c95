//! # Ovalscan
//!
//! An evaluation engine for OVAL-style security compliance definitions, with
//! pluggable host probes, bounded concurrent execution, cancellation, and
//! compliance-ready audit logging.
//!
//! ## Overview
//!
//! A definitions document connects definitions, tests, objects and states by
//! identifier. Ovalscan:
//!
//! - Parses the document into a typed model
//! - Resolves every test into an executable check, recording dangling references
//! - Runs registry and file checks through a `SystemProbe`
//! - Evaluates each definition's AND/OR/ONE/XOR criteria tree over the results
//! - Produces an ordered `ScanReport` of test and definition verdicts
//!
//! Every verdict is one of `pass`, `fail`, `error` or `unknown`. A failed
//! condition is `fail`; a probe that could not assess the condition is
//! `error`; a test type or operation the engine does not understand is
//! `unknown`. Only a malformed document aborts a scan.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ovalscan::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let probe = MockProbe::new()
//!         .with_registry_value(Hive::HkeyLocalMachine, r"Software\Test", "Enabled", "1");
//!
//!     let scanner = OvalScanner::builder()
//!         .with_probe(probe)
//!         .with_config(ScanConfig::new().with_max_concurrent_checks(4))
//!         .build()?;
//!
//!     let xml = std::fs::read("baseline.xml")?;
//!     let report = scanner.scan(&xml, &CancelSignal::never()).await?;
//!
//!     for definition in &report.definition_results {
//!         println!("{}: {}", definition.definition_id, definition.status);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `default` - Includes the native host probe
//! - `host-probe` - `HostProbe` for the local machine (registry via `winreg` on Windows)
//!
//! ## Architecture
//!
//! - **Core**: Status values, results, errors, the probe and executor traits
//! - **Document**: Typed model and parser
//! - **Resolver**: Test to object/state joins
//! - **Executors**: Registry and file checks, value comparison
//! - **Criteria**: Recursive criteria tree evaluation
//! - **Manager**: Scanner, configuration and result aggregation
//! - **Probes**: Mock and native host probes
//! - **Audit**: Structured logging for compliance

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod audit;
pub mod core;
pub mod criteria;
pub mod document;
pub mod executors;
pub mod manager;
pub mod probes;
pub mod resolver;

// Re-export commonly used types at the crate root
pub use crate::core::{
    CancelHandle, CancelSignal, DefinitionResult, DocumentSource, ParseError, ProbeError,
    ResolutionError, ResultStatus, ScanError, ScanReport, SystemProbe, TestResult,
};

pub use crate::document::{parse, Document};
pub use crate::manager::{AbsencePolicy, OvalScanner, ScanConfig};
pub use crate::resolver::{resolve, Check};

/// Prelude module for convenient imports.
///
/// ```rust
/// use ovalscan::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::{
        CancelHandle, CancelSignal, DefinitionResult, DocumentSource, FileStat, Hive, ProbeError,
        RegistryLookup, ResultStatus, ScanError, ScanReport, SystemProbe, TestResult,
    };
    pub use crate::document::{parse, Document};
    pub use crate::manager::{AbsencePolicy, OvalScanner, ScanConfig};
    pub use crate::probes::MockProbe;
    #[cfg(feature = "host-probe")]
    pub use crate::probes::HostProbe;
}
