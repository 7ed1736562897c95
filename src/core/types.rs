//! Core types used throughout the ovalscan library.
//!
//! This module defines the closed status set reported for tests and
//! definitions, plus the enumerated fields of the document model (registry
//! hives, comparison operations, datatypes and check families). Enumerated
//! fields keep unrecognized input in an `Other`-style variant so executors can
//! report it as `unknown` instead of failing the parse.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The outcome of a test or a definition.
///
/// This is a closed set; every consumer handles exactly these four values:
/// - `Pass`: the assessed condition holds
/// - `Fail`: the resource was assessed and does not satisfy the condition
/// - `Error`: the condition could not be assessed (probe or reference failure)
/// - `Unknown`: the engine does not understand the test data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    /// The condition holds.
    Pass,
    /// The condition does not hold.
    Fail,
    /// The condition could not be assessed.
    Error,
    /// The test data is not understood by the engine.
    Unknown,
}

impl ResultStatus {
    /// Returns `true` for `Pass`.
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    /// Returns `true` for `Fail`.
    pub fn is_fail(&self) -> bool {
        matches!(self, Self::Fail)
    }

    /// Returns `true` for `Error`.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }

    /// Returns `true` for `Unknown`.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Returns `true` if the status is a verdict (`Pass` or `Fail`).
    pub fn is_conclusive(&self) -> bool {
        matches!(self, Self::Pass | Self::Fail)
    }

    /// Returns the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A Windows registry hive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Hive {
    /// `HKEY_LOCAL_MACHINE`
    HkeyLocalMachine,
    /// `HKEY_CURRENT_USER`
    HkeyCurrentUser,
    /// `HKEY_CLASSES_ROOT`
    HkeyClassesRoot,
    /// `HKEY_USERS`
    HkeyUsers,
    /// `HKEY_CURRENT_CONFIG`
    HkeyCurrentConfig,
    /// A hive name the engine does not recognize.
    Unrecognized(String),
}

impl Hive {
    /// Parses a hive name, case-insensitively, accepting short forms like `HKLM`.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "HKEY_LOCAL_MACHINE" | "HKLM" => Self::HkeyLocalMachine,
            "HKEY_CURRENT_USER" | "HKCU" => Self::HkeyCurrentUser,
            "HKEY_CLASSES_ROOT" | "HKCR" => Self::HkeyClassesRoot,
            "HKEY_USERS" | "HKU" => Self::HkeyUsers,
            "HKEY_CURRENT_CONFIG" | "HKCC" => Self::HkeyCurrentConfig,
            _ => Self::Unrecognized(name.to_string()),
        }
    }

    /// Returns `true` if the hive is one the engine can probe.
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }

    /// Returns the canonical hive name.
    pub fn as_str(&self) -> &str {
        match self {
            Self::HkeyLocalMachine => "HKEY_LOCAL_MACHINE",
            Self::HkeyCurrentUser => "HKEY_CURRENT_USER",
            Self::HkeyClassesRoot => "HKEY_CLASSES_ROOT",
            Self::HkeyUsers => "HKEY_USERS",
            Self::HkeyCurrentConfig => "HKEY_CURRENT_CONFIG",
            Self::Unrecognized(name) => name,
        }
    }
}

impl fmt::Display for Hive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A comparison operation between an observed and an expected value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Exact equality.
    #[default]
    Equals,
    /// Inequality.
    NotEqual,
    /// ASCII case-insensitive equality.
    CaseInsensitiveEquals,
    /// The expected value is a substring of the observed value.
    Contains,
    /// The observed value matches the expected wildcard pattern.
    PatternMatch,
    /// Observed > expected.
    GreaterThan,
    /// Observed >= expected.
    GreaterThanOrEqual,
    /// Observed < expected.
    LessThan,
    /// Observed <= expected.
    LessThanOrEqual,
    /// An operation name the engine does not recognize.
    Other(String),
}

impl Operation {
    /// Parses an operation name. Both OVAL spellings (`pattern match`) and
    /// snake case (`pattern_match`) are accepted.
    pub fn parse(name: &str) -> Self {
        let normalized = name.trim().to_ascii_lowercase().replace('_', " ");
        match normalized.as_str() {
            "equals" => Self::Equals,
            "not equal" => Self::NotEqual,
            "case insensitive equals" => Self::CaseInsensitiveEquals,
            "contains" => Self::Contains,
            "pattern match" => Self::PatternMatch,
            "greater than" => Self::GreaterThan,
            "greater than or equal" => Self::GreaterThanOrEqual,
            "less than" => Self::LessThan,
            "less than or equal" => Self::LessThanOrEqual,
            _ => Self::Other(name.to_string()),
        }
    }

    /// Returns `true` for ordering operations.
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            Self::GreaterThan | Self::GreaterThanOrEqual | Self::LessThan | Self::LessThanOrEqual
        )
    }

    /// Returns the operation name.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Equals => "equals",
            Self::NotEqual => "not equal",
            Self::CaseInsensitiveEquals => "case insensitive equals",
            Self::Contains => "contains",
            Self::PatternMatch => "pattern match",
            Self::GreaterThan => "greater than",
            Self::GreaterThanOrEqual => "greater than or equal",
            Self::LessThan => "less than",
            Self::LessThanOrEqual => "less than or equal",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The datatype used to interpret expected and observed values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Datatype {
    /// Plain string comparison.
    #[default]
    String,
    /// Signed integer comparison.
    Int,
    /// Dotted version comparison (`10.0.19045`).
    Version,
    /// Boolean comparison (`true`/`false`/`1`/`0`).
    Boolean,
    /// A datatype the engine does not recognize.
    Other(String),
}

impl Datatype {
    /// Parses a datatype name.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "string" => Self::String,
            "int" => Self::Int,
            "version" => Self::Version,
            "boolean" => Self::Boolean,
            _ => Self::Other(name.to_string()),
        }
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Int => write!(f, "int"),
            Self::Version => write!(f, "version"),
            Self::Boolean => write!(f, "boolean"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

/// The family of a test, taken from the test element name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckFamily {
    /// `registry_test`
    Registry,
    /// `file_test`
    File,
    /// Any other test element; reported as `unknown`.
    Unsupported(String),
}

impl CheckFamily {
    /// Maps a test element's local name to a family.
    pub fn from_element(name: &str) -> Self {
        match name {
            "registry_test" => Self::Registry,
            "file_test" => Self::File,
            other => Self::Unsupported(other.to_string()),
        }
    }
}

impl fmt::Display for CheckFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registry => write!(f, "registry"),
            Self::File => write!(f, "file"),
            Self::Unsupported(name) => write!(f, "unsupported({name})"),
        }
    }
}
