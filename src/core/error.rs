//! Error types for the ovalscan library.
//!
//! This module provides structured, typed errors for every failure class of a
//! scan. Only [`ParseError`] (wrapped by [`ScanError`]) is fatal to a scan;
//! resolution and probe failures are captured into the result stream.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The document could not be turned into a [`Document`](crate::document::Document).
///
/// A parse error is fatal: no partial results are produced.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The input bytes are not valid UTF-8.
    #[error("document is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    /// The input is not well-formed XML.
    #[error("malformed XML: {0}")]
    Xml(#[from] roxmltree::Error),

    /// The root element is not `oval_definitions`.
    #[error("unexpected root element '{found}', expected 'oval_definitions'")]
    UnexpectedRoot {
        /// Local name of the root element that was found.
        found: String,
    },

    /// The root has no `definitions` container.
    #[error("document has no 'definitions' container")]
    MissingDefinitions,

    /// A required attribute is absent.
    #[error("element '{element}' is missing required attribute '{attribute}'")]
    MissingAttribute {
        /// Element name (with id when known).
        element: String,
        /// Name of the missing attribute.
        attribute: &'static str,
    },

    /// A required child element is absent.
    #[error("'{owner}' is missing required element '{element}'")]
    MissingElement {
        /// Identifier of the owning element.
        owner: String,
        /// Name of the missing child element.
        element: &'static str,
    },

    /// Two items in the same section share an identifier.
    #[error("duplicate {kind} identifier '{id}'")]
    DuplicateId {
        /// Section the duplicate was found in.
        kind: ReferenceKind,
        /// The duplicated identifier.
        id: String,
    },
}

/// The kind of document item an identifier points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// A definition.
    Definition,
    /// A test.
    Test,
    /// An object.
    Object,
    /// A state.
    State,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Definition => write!(f, "definition"),
            Self::Test => write!(f, "test"),
            Self::Object => write!(f, "object"),
            Self::State => write!(f, "state"),
        }
    }
}

/// A test whose object or state reference does not resolve.
///
/// Resolution errors are per-test and non-fatal: the test is excluded from
/// execution and reported with status `error`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("test '{test_id}' references missing {kind} '{missing_ref}'")]
pub struct ResolutionError {
    /// Identifier of the test that failed to resolve.
    pub test_id: String,
    /// The identifier that could not be found.
    pub missing_ref: String,
    /// What kind of item the missing identifier should have named.
    pub kind: ReferenceKind,
}

impl ResolutionError {
    /// Creates a resolution error for a missing object.
    pub fn missing_object(test_id: impl Into<String>, object_ref: impl Into<String>) -> Self {
        Self {
            test_id: test_id.into(),
            missing_ref: object_ref.into(),
            kind: ReferenceKind::Object,
        }
    }

    /// Creates a resolution error for a missing state.
    pub fn missing_state(test_id: impl Into<String>, state_ref: impl Into<String>) -> Self {
        Self {
            test_id: test_id.into(),
            missing_ref: state_ref.into(),
            kind: ReferenceKind::State,
        }
    }
}

/// A host probe failed for reasons unrelated to the assessed condition.
///
/// Probe errors downgrade the affected test to status `error`; they never
/// abort the rest of the scan.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Access to the resource was denied.
    #[error("permission denied reading {resource}")]
    PermissionDenied {
        /// The resource that could not be read.
        resource: String,
    },

    /// An I/O error occurred while probing.
    #[error("I/O error reading {resource}: {source}")]
    Io {
        /// The resource being probed.
        resource: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The probe does not support this capability on this host.
    #[error("{capability} probing is not supported: {reason}")]
    Unsupported {
        /// Name of the capability, e.g. "registry".
        capability: &'static str,
        /// Why it is unsupported.
        reason: String,
    },

    /// The probe backend failed.
    #[error("probe '{probe}' failed: {message}")]
    Backend {
        /// Name of the probe.
        probe: String,
        /// Failure description.
        message: String,
    },
}

impl ProbeError {
    /// Classifies an I/O error for `resource`, splitting out permission failures.
    pub fn io(resource: impl Into<String>, source: std::io::Error) -> Self {
        let resource = resource.into();
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            Self::PermissionDenied { resource }
        } else {
            Self::Io { resource, source }
        }
    }

    /// Creates an `Unsupported` error.
    pub fn unsupported(capability: &'static str, reason: impl Into<String>) -> Self {
        Self::Unsupported {
            capability,
            reason: reason.into(),
        }
    }

    /// Creates a `Backend` error.
    pub fn backend(probe: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            probe: probe.into(),
            message: message.into(),
        }
    }
}

/// The main error type for scan entry points.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The document could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The document source could not be read.
    #[error("failed to read document '{source_name}': {source}")]
    Input {
        /// Display name of the source.
        source_name: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },
}

impl ScanError {
    /// Creates a `Configuration` error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Returns `true` if the error came from parsing the document.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::Parse(_))
    }
}

/// A specialized `Result` type for parsing.
pub type ParseResult<T> = Result<T, ParseError>;

/// A specialized `Result` type for probe operations.
pub type ProbeResult<T> = Result<T, ProbeError>;
