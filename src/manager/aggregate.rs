//! Result aggregation.
//!
//! Collects the per-test results of a scan after every check has finished,
//! fills in `error` results for tests that never became checks, and
//! evaluates each definition's criteria tree over the full set. Output order
//! is always document order, regardless of completion order.

use crate::core::{DefinitionResult, ResolutionError, TestResult};
use crate::criteria::{evaluate, ResultIndex};
use crate::document::Document;

use chrono::Utc;
use std::collections::{HashMap, HashSet};

/// Builds ordered test and definition results for one document.
#[derive(Debug)]
pub struct ResultAggregator<'a> {
    document: &'a Document,
    results: HashMap<String, TestResult>,
}

impl<'a> ResultAggregator<'a> {
    /// Creates an empty aggregator for a document.
    pub fn new(document: &'a Document) -> Self {
        Self {
            document,
            results: HashMap::with_capacity(document.tests().len()),
        }
    }

    /// Records the result of an executed check.
    pub fn record(&mut self, result: TestResult) {
        self.results.insert(result.test_id.clone(), result);
    }

    /// Records the `error` result of a test that failed to resolve.
    pub fn record_resolution_error(&mut self, error: &ResolutionError) {
        self.record(
            TestResult::error(&error.test_id, error.to_string())
                .with_detail("missing_ref", error.missing_ref.as_str())
                .with_detail("reference_kind", error.kind.to_string()),
        );
    }

    /// Returns one result per recorded test, in document order of tests.
    pub fn test_results(&self) -> Vec<TestResult> {
        self.document
            .tests()
            .iter()
            .filter_map(|test| self.results.get(&test.id).cloned())
            .collect()
    }

    /// Evaluates every definition, in document order of definitions.
    pub fn definition_results(&self) -> Vec<DefinitionResult> {
        let index: ResultIndex<'_> = self
            .results
            .iter()
            .map(|(id, result)| (id.as_str(), result))
            .collect();

        self.document
            .definitions()
            .iter()
            .map(|definition| {
                let outcome = evaluate(&definition.criteria, &index);

                let mut referenced: Vec<(usize, &TestResult)> = definition
                    .criteria
                    .test_refs()
                    .into_iter()
                    .collect::<HashSet<_>>()
                    .into_iter()
                    .filter_map(|id| {
                        let position = self.document.test_position(id)?;
                        Some((position, *index.get(id)?))
                    })
                    .collect();
                referenced.sort_by_key(|(position, _)| *position);

                let mut unresolved_refs = Vec::new();
                for missing in outcome.missing_refs.iter() {
                    if !unresolved_refs.contains(missing) {
                        unresolved_refs.push(missing.clone());
                    }
                }

                DefinitionResult {
                    definition_id: definition.id.clone(),
                    class: definition.class.clone(),
                    title: definition.metadata.title.clone(),
                    status: outcome.status(),
                    criteria_value: outcome.value,
                    has_error: outcome.has_error,
                    has_unknown: outcome.has_unknown,
                    test_results: referenced.into_iter().map(|(_, r)| r.clone()).collect(),
                    unresolved_refs,
                    evaluated_at: Utc::now(),
                }
            })
            .collect()
    }
}
