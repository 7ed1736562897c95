//! Core types and traits for the ovalscan library.
//!
//! This module provides the fundamental building blocks used throughout
//! the library:
//!
//! - [`types`] - Status values and enumerated document fields
//! - [`traits`] - The `SystemProbe` and `CheckExecutor` traits
//! - [`error`] - Structured error types
//! - [`input`] - Document input abstraction
//! - [`hasher`] - BLAKE3 document fingerprints
//! - [`result`] - Test, definition and scan result structures
//! - [`cancel`] - Deadline and cancellation signal

pub mod cancel;
pub mod error;
pub mod hasher;
pub mod input;
pub mod result;
pub mod traits;
pub mod types;

// Re-export commonly used types at the core level
pub use cancel::{CancelHandle, CancelSignal};
pub use error::{ParseError, ProbeError, ReferenceKind, ResolutionError, ScanError};
pub use hasher::DocumentDigest;
pub use input::DocumentSource;
pub use result::{DefinitionResult, ScanReport, StatusCounts, TestResult};
pub use traits::{ArcProbe, CheckExecutor, FileStat, RegistryLookup, SystemProbe};
pub use types::{CheckFamily, Datatype, Hive, Operation, ResultStatus};
