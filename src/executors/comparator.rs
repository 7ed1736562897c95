//! Value comparison shared by the executors.
//!
//! [`compare`] is the plain string comparator. [`compare_typed`] layers
//! datatype awareness on top and distinguishes "does not match" from "cannot
//! be decided", so a bad operation or an unparsable value never reads as a
//! silent `fail`.
//!
//! Pattern matching is an anchored glob compiled with `globset`: `*` matches
//! any run of characters (separators included), `?` matches exactly one,
//! `[..]` and `{a,b}` work as usual, and a regex-style `.*` is read as `*`.
//! Backslashes are literal, so Windows paths need no escaping.

use crate::core::types::{Datatype, Operation};

use globset::{GlobBuilder, GlobMatcher};
use std::cmp::Ordering;

/// Outcome of a datatype-aware comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    /// The observed value satisfies the expected one.
    Satisfied,
    /// The observed value does not satisfy the expected one.
    Unsatisfied,
    /// The comparison cannot be decided.
    Indeterminate(String),
}

impl Comparison {
    fn from_bool(matched: bool) -> Self {
        if matched {
            Self::Satisfied
        } else {
            Self::Unsatisfied
        }
    }

    /// Returns `true` for `Satisfied`.
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::Satisfied)
    }
}

/// Compares two strings.
///
/// Returns `false` for operations it does not recognize; callers that need
/// to tell that apart from a mismatch use [`compare_typed`].
///
/// # Example
///
/// ```rust
/// use ovalscan::core::Operation;
/// use ovalscan::executors::compare;
///
/// assert!(compare("Windows 10 Pro", "Pro", &Operation::Contains));
/// assert!(compare(r"C:\Windows\System32", r"*\System32", &Operation::PatternMatch));
/// ```
pub fn compare(actual: &str, expected: &str, operation: &Operation) -> bool {
    match operation {
        Operation::Equals => actual == expected,
        Operation::NotEqual => actual != expected,
        Operation::CaseInsensitiveEquals => actual.to_lowercase() == expected.to_lowercase(),
        Operation::Contains => actual.contains(expected),
        Operation::PatternMatch => pattern_match(expected, actual),
        Operation::GreaterThan => actual > expected,
        Operation::GreaterThanOrEqual => actual >= expected,
        Operation::LessThan => actual < expected,
        Operation::LessThanOrEqual => actual <= expected,
        Operation::Other(_) => false,
    }
}

/// Compares two values under a datatype.
pub fn compare_typed(
    actual: &str,
    expected: &str,
    operation: &Operation,
    datatype: &Datatype,
) -> Comparison {
    if let Operation::Other(name) = operation {
        return Comparison::Indeterminate(format!("unrecognized operation '{name}'"));
    }

    match datatype {
        Datatype::String => match operation {
            Operation::PatternMatch => match glob(expected) {
                Ok(matcher) => Comparison::from_bool(matcher.is_match(actual)),
                Err(err) => Comparison::Indeterminate(format!("invalid pattern '{expected}': {err}")),
            },
            _ => Comparison::from_bool(compare(actual, expected, operation)),
        },
        Datatype::Int => match (parse_int(actual), parse_int(expected)) {
            (Some(a), Some(e)) => order(a.cmp(&e), operation, datatype),
            _ => unparsable(actual, expected, datatype),
        },
        Datatype::Version => match (parse_version(actual), parse_version(expected)) {
            (Some(a), Some(e)) => order(compare_versions(&a, &e), operation, datatype),
            _ => unparsable(actual, expected, datatype),
        },
        Datatype::Boolean => match (parse_bool(actual), parse_bool(expected)) {
            (Some(a), Some(e)) => match operation {
                Operation::Equals => Comparison::from_bool(a == e),
                Operation::NotEqual => Comparison::from_bool(a != e),
                other => unsupported(other, datatype),
            },
            _ => unparsable(actual, expected, datatype),
        },
        Datatype::Other(name) => {
            Comparison::Indeterminate(format!("unrecognized datatype '{name}'"))
        }
    }
}

fn order(ordering: Ordering, operation: &Operation, datatype: &Datatype) -> Comparison {
    match operation {
        Operation::Equals => Comparison::from_bool(ordering == Ordering::Equal),
        Operation::NotEqual => Comparison::from_bool(ordering != Ordering::Equal),
        Operation::GreaterThan => Comparison::from_bool(ordering == Ordering::Greater),
        Operation::GreaterThanOrEqual => Comparison::from_bool(ordering != Ordering::Less),
        Operation::LessThan => Comparison::from_bool(ordering == Ordering::Less),
        Operation::LessThanOrEqual => Comparison::from_bool(ordering != Ordering::Greater),
        other => unsupported(other, datatype),
    }
}

fn unsupported(operation: &Operation, datatype: &Datatype) -> Comparison {
    Comparison::Indeterminate(format!(
        "operation '{operation}' does not apply to {datatype} values"
    ))
}

fn unparsable(actual: &str, expected: &str, datatype: &Datatype) -> Comparison {
    Comparison::Indeterminate(format!(
        "cannot compare '{actual}' with '{expected}' as {datatype}"
    ))
}

fn parse_int(value: &str) -> Option<i64> {
    let value = value.trim();
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

fn parse_version(value: &str) -> Option<Vec<u64>> {
    value
        .trim()
        .split('.')
        .map(|part| part.parse().ok())
        .collect()
}

fn compare_versions(a: &[u64], b: &[u64]) -> Ordering {
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| {
            let left = a.get(i).copied().unwrap_or(0);
            let right = b.get(i).copied().unwrap_or(0);
            left.cmp(&right)
        })
        .find(|ordering| *ordering != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// Anchored glob match of `text` against `pattern`. Invalid patterns match
/// nothing.
fn pattern_match(pattern: &str, text: &str) -> bool {
    glob(pattern).is_ok_and(|matcher| matcher.is_match(text))
}

fn glob(pattern: &str) -> Result<GlobMatcher, globset::Error> {
    let mut source = String::with_capacity(pattern.len());
    for c in pattern.replace(".*", "*").chars() {
        // `**` carries recursive-directory meaning in globset.
        if c == '*' && source.ends_with('*') {
            continue;
        }
        source.push(c);
    }
    // globset folds `\` to `/` in candidates on Windows.
    if cfg!(windows) {
        source = source.replace('\\', "/");
    }

    GlobBuilder::new(&source)
        .literal_separator(false)
        .backslash_escape(false)
        .build()
        .map(|glob| glob.compile_matcher())
}
