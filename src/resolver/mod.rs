//! Reference resolution.
//!
//! Joins every test to its object and optional state, producing one
//! executable [`Check`] per resolvable test. Tests with dangling references
//! are recorded as [`ResolutionError`]s and criteria leaves naming no test as
//! [`UnresolvedCriterion`]s; neither stops resolution of the rest of the
//! document.

use crate::core::error::ResolutionError;
use crate::core::types::CheckFamily;
use crate::document::{Document, Object, State};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

/// A fully resolved, executable test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Check {
    /// Identifier of the originating test.
    pub test_id: String,

    /// Check family, used for executor dispatch.
    pub family: CheckFamily,

    /// The resolved object.
    pub object: Object,

    /// The resolved state; `None` means an existence check.
    pub state: Option<State>,
}

impl Check {
    /// Creates a check without a state.
    pub fn new(test_id: impl Into<String>, family: CheckFamily, object: Object) -> Self {
        Self {
            test_id: test_id.into(),
            family,
            object,
            state: None,
        }
    }

    /// Attaches a state.
    pub fn with_state(mut self, state: State) -> Self {
        self.state = Some(state);
        self
    }
}

/// A criteria leaf whose test reference names no test in the document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnresolvedCriterion {
    /// Definition containing the leaf.
    pub definition_id: String,
    /// The dangling test reference.
    pub test_ref: String,
}

/// Output of [`resolve`].
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Executable checks, in document order of tests.
    pub checks: Vec<Check>,

    /// Tests that could not be resolved, in document order of tests.
    pub errors: Vec<ResolutionError>,

    /// Criteria leaves naming no test, in document order of definitions.
    pub unresolved_criteria: Vec<UnresolvedCriterion>,
}

impl Resolution {
    /// Returns `true` if the given test failed to resolve.
    pub fn is_unresolved_test(&self, test_id: &str) -> bool {
        self.errors.iter().any(|e| e.test_id == test_id)
    }
}

/// Resolves every test of a document.
///
/// Never fails: each test yields exactly one check or one resolution error.
pub fn resolve(document: &Document) -> Resolution {
    let mut resolution = Resolution::default();

    for test in document.tests() {
        let Some(object) = document.object(&test.object_ref) else {
            warn!(test_id = %test.id, object_ref = %test.object_ref, "Test references missing object");
            resolution
                .errors
                .push(ResolutionError::missing_object(&test.id, &test.object_ref));
            continue;
        };

        let state = match &test.state_ref {
            Some(state_ref) => match document.state(state_ref) {
                Some(state) => Some(state.clone()),
                None => {
                    warn!(test_id = %test.id, state_ref = %state_ref, "Test references missing state");
                    resolution
                        .errors
                        .push(ResolutionError::missing_state(&test.id, state_ref));
                    continue;
                }
            },
            None => None,
        };

        resolution.checks.push(Check {
            test_id: test.id.clone(),
            family: test.family.clone(),
            object: object.clone(),
            state,
        });
    }

    for definition in document.definitions() {
        let mut seen = HashSet::new();
        for test_ref in definition.criteria.test_refs() {
            if document.test(test_ref).is_none() && seen.insert(test_ref) {
                warn!(
                    definition_id = %definition.id,
                    test_ref = %test_ref,
                    "Criterion references missing test"
                );
                resolution.unresolved_criteria.push(UnresolvedCriterion {
                    definition_id: definition.id.clone(),
                    test_ref: test_ref.to_string(),
                });
            }
        }
    }

    debug!(
        checks = resolution.checks.len(),
        errors = resolution.errors.len(),
        unresolved_criteria = resolution.unresolved_criteria.len(),
        "Resolved document references"
    );

    resolution
}
