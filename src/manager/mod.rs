//! Scan orchestration.
//!
//! The `OvalScanner` ties the pipeline together: parse, resolve, run checks
//! against a probe with bounded concurrency, then aggregate test and
//! definition results into a `ScanReport`.

pub mod aggregate;
pub mod config;
mod scanner;

pub use aggregate::ResultAggregator;
pub use config::{AbsencePolicy, ScanConfig};
pub use scanner::{run_scan, OvalScanner, OvalScannerBuilder};
